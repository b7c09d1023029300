//! # Gixt Runner
//!
//! Decides how a materialized gist is executed.
//!
//! ```text
//!   work dir ──► ManifestStrategy ──► ShebangStrategy ──► ExtensionStrategy
//!                 (gixt.json run)     (#! first line)     (.py, .sh, ...)
//!                       │                   │                   │
//!                       └───────────────────┴───────────────────┘
//!                                           ▼
//!                                      CommandPlan
//! ```
//!
//! The first strategy that yields a plan wins. Execution itself belongs to
//! the caller.

mod error;
mod manifest;
mod plan;

pub use error::{Result, RunnerError};
pub use manifest::{
    load_run_manifest, parse_run_manifest, run_manifest_schema, save_run_manifest, RunManifest,
    DEFAULT_DETAILS, DEFAULT_MANIFEST_NAME,
};
pub use plan::{
    default_strategies, plan, plan_with, rebase_run_to_dir, select_file, CommandPlan,
    ExtensionStrategy, ManifestStrategy, PlanReason, PlanRequest, RunStrategy, ShebangStrategy,
};
