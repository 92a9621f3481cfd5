use thiserror::Error;

/// All recoverable errors produced by samplefifo-core.
///
/// Contract breaches on the FIFO itself (bad chunk size, oversized
/// `read_advance`) are not represented here: those panic.
#[derive(Debug, Error)]
pub enum FifoError {
    #[error("invalid FIFO configuration: {0}")]
    InvalidConfig(String),

    #[error("writer and reader halves belong to different FIFOs")]
    MismatchedHalves,

    #[error("pump is already running")]
    AlreadyRunning,

    #[error("pump is not running")]
    NotRunning,

    #[error("pump thread failed: {0}")]
    PumpFailed(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, FifoError>;
