use thiserror::Error;

pub type Result<T> = std::result::Result<T, RunnerError>;

#[derive(Error, Debug)]
pub enum RunnerError {
    #[error("invalid run manifest: {0}")]
    InvalidManifest(String),

    #[error("run manifest has empty run field")]
    EmptyRun,

    #[error("cannot determine how to run {file} (unknown extension)")]
    UnknownRunStrategy { file: String },

    #[error("no files in gist to run")]
    NoFiles,

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error(transparent)]
    Protocol(#[from] gixt_protocol::ProtocolError),
}
