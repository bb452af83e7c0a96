//! Driver error types

use thiserror::Error;

/// Errors from TSDB driver operations
#[derive(Debug, Clone, Error)]
pub enum TsdbError {
    /// No stream with the requested UUID
    #[error("stream not found")]
    StreamNotFound,

    /// No point satisfies a nearest-value query
    #[error("no point in range")]
    NoPoint,

    /// The request was cancelled before completing
    #[error("request cancelled")]
    Cancelled,

    /// The database reported an error
    #[error("database error: {0}")]
    Backend(String),
}

/// Result type for driver operations
pub type Result<T> = std::result::Result<T, TsdbError>;
