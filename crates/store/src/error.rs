//! Store error types

use thiserror::Error;

/// Errors from config-store operations
#[derive(Debug, Error)]
pub enum StoreError {
    /// Snapshot file could not be read or written
    #[error("snapshot I/O error: {0}")]
    Snapshot(#[from] std::io::Error),

    /// Snapshot file contents could not be decoded
    #[error("corrupt snapshot: {0}")]
    CorruptSnapshot(#[from] serde_json::Error),

    /// The store backend rejected or failed the operation
    #[error("store backend error: {0}")]
    Backend(String),
}

/// Result type for store operations
pub type Result<T> = std::result::Result<T, StoreError>;
