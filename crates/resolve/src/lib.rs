//! # Gixt Resolve
//!
//! Deterministic identifier resolution.
//!
//! ## Stages
//!
//! ```text
//! input
//!   │
//!   ├──> alias table (exact)
//!   ├──> gist id / URL (hex-like)
//!   ├──> index: owner/name
//!   ├──> index: bare name [+ description]
//!   ├──> live owner listing (opt-in)
//!   └──> hex-like fallback / Unresolved
//! ```
//!
//! Shell-script twins such as `run.sh` and `run.bat` are narrowed to the
//! host platform's variant; any other collision is reported as ambiguous.

mod error;
mod resolver;

pub use error::{Candidate, ResolveError, Result, SourceError};
pub use resolver::{
    OwnerGistSource, ResolveOptions, Resolver, DEFAULT_USER_PAGES, LIVE_PAGE_SIZE,
};
