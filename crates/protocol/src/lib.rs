//! # Gixt Protocol
//!
//! Types shared by every gixt crate: gist documents as returned by the
//! hosting API, resolved identities, file-name and platform helpers, and the
//! atomic JSON persistence used for every on-disk document.

mod error;
mod gist;
mod identity;
mod json_io;
mod platform;

pub use error::{ProtocolError, Result};
pub use gist::{Gist, GistFile, GistOwner, GistSummary, HistoryEntry};
pub use identity::{extract_id, is_likely_gist_id, GistIdentity};
pub use json_io::{read_json_opt, unix_now_ms, write_json_atomic};
pub use platform::{
    base_name, extension, filename_matches, is_shell_script_extension, stem, Platform,
    SHELL_SCRIPT_EXTENSIONS,
};
