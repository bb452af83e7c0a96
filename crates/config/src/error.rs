//! Configuration error types

use thiserror::Error;

/// Errors that can occur loading configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Config file could not be read
    #[error("could not read config file '{path}': {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Config file could not be parsed
    #[error("could not parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    /// A field value violates a constraint
    #[error("invalid configuration: {0}")]
    Invalid(String),

    /// An environment variable is malformed
    #[error("invalid environment: {0}")]
    Environment(String),
}

/// Result type for configuration operations
pub type Result<T> = std::result::Result<T, ConfigError>;
