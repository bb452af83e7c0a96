//! Authentication error types

use thiserror::Error;

/// Result type for auth operations
pub type Result<T> = std::result::Result<T, AuthError>;

/// Errors that can occur during authentication operations
#[derive(Debug, Error)]
pub enum AuthError {
    /// Encryption key has an invalid length
    #[error("encryption key length is invalid: must be 16, 24, or 32 bytes (got {0})")]
    InvalidEncryptKeyLength(usize),

    /// MAC key is too short
    #[error("MAC key length must be at least 16 bytes (got {0})")]
    InvalidMacKeyLength(usize),

    /// Encryption and MAC keys are identical
    #[error("the session encryption and MAC keys are the same; change them to be different")]
    IdenticalKeys,

    /// Session record failed to serialize
    #[error("could not encode login session: {0}")]
    SessionEncode(#[from] serde_json::Error),

    /// Password hashing or verification failed
    #[error("password hash error: {0}")]
    PasswordHash(String),

    /// Stored record could not be decoded
    #[error("corrupt record for '{key}': {message}")]
    CorruptRecord { key: String, message: String },

    /// Config-store operation failed
    #[error(transparent)]
    Store(#[from] plotter_store::StoreError),
}

impl AuthError {
    /// Create a CorruptRecord error
    pub fn corrupt(key: impl Into<String>, message: impl std::fmt::Display) -> Self {
        Self::CorruptRecord {
            key: key.into(),
            message: message.to_string(),
        }
    }
}
