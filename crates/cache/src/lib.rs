//! # Gixt Cache
//!
//! Materializes gist files on disk, one directory per gist version.
//!
//! ```text
//! <cache root>/
//!   └── <gist id>/
//!         └── <sha>/
//!               ├── .gixt-cache.json
//!               └── <sanitized files...>
//! ```
//!
//! A version directory that was fully written once is reused as-is until
//! an update is forced.

mod error;
mod fetch;
mod manifest;
mod materialize;
mod paths;

pub use error::{CacheError, Result};
pub use fetch::{FetchError, HttpRawFetcher, RawFetcher, RAW_FETCH_TIMEOUT};
pub use manifest::{cached_gists, latest_manifest, remove_gist, CacheManifest, CachedGist};
pub use materialize::{is_executable_name, materialize, Materialized};
pub use paths::{
    cache_dir, manifest_path, present_files, sanitize_gist_path, shorten, CACHE_MANIFEST_NAME,
};
