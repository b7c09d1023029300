use thiserror::Error;

pub type Result<T> = std::result::Result<T, CacheError>;

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("invalid file name {name:?}: {reason}")]
    InvalidFileName { name: String, reason: &'static str },

    #[error("files {first:?} and {second:?} both map to {sanitized:?}")]
    DuplicateFileName {
        sanitized: String,
        first: String,
        second: String,
    },

    #[error("invalid cache key {0:?}")]
    InvalidCacheKey(String),

    #[error("download {name} failed: {message}")]
    Download { name: String, message: String },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error(transparent)]
    Protocol(#[from] gixt_protocol::ProtocolError),
}
