use thiserror::Error;

#[derive(Error, Debug)]
pub enum RelayError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Delimiter must be non-empty")]
    EmptyDelimiter,

    #[error("Relay not started")]
    NotStarted,

    #[error("Relay already running")]
    AlreadyRunning,
}

pub type Result<T> = std::result::Result<T, RelayError>;
