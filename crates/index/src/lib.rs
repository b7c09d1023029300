//! # Gixt Index
//!
//! Local lookup tables that turn friendly names into gist ids.
//!
//! ```text
//! aliases.json ─────────────┐
//! index.json ──┬────────────┼──> resolver
//! index_descriptions.json ──┘
//! ```
//!
//! Every table is loaded whole, mutated in memory, and written back
//! atomically. There is no locking between concurrent invocations.

mod aliases;
mod error;
mod index;
mod overrides;
mod refresh;

pub use aliases::AliasTable;
pub use error::{IndexError, Result};
pub use index::{Index, IndexEntry};
pub use overrides::{normalize_description, DescriptionOverrides};
pub use refresh::{refresh_entries, RefreshOutcome};
