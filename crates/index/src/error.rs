use thiserror::Error;

pub type Result<T> = std::result::Result<T, IndexError>;

#[derive(Error, Debug)]
pub enum IndexError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error(transparent)]
    Protocol(#[from] gixt_protocol::ProtocolError),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}
