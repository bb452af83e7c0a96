//! Plotter Config - gateway configuration
//!
//! TOML configuration with defaults for every field, plus the environment
//! variables that select the config-store deployment:
//!
//! - `CONFIG_PREFIX` — key namespace inside the config store
//! - `PATH_SEPARATOR` — collection path separator (one character)
//! - `CONFIG_STORE_ENDPOINT` — where the config store lives
//!
//! # Example
//!
//! ```toml
//! [server]
//! host = "0.0.0.0"
//! port = 8080
//!
//! [limits]
//! max_data_requests = 1024
//! max_bracket_requests = 512
//!
//! [session]
//! expiry_seconds = 86400
//! ```

mod env;
mod error;
mod logging;

pub use env::EnvOverrides;
pub use error::{ConfigError, Result};
pub use logging::{LogConfig, LogLevel};

use std::path::Path;

use serde::Deserialize;

/// HTTP server settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address
    /// Default: "0.0.0.0"
    pub host: String,

    /// Listen port
    /// Default: 8080
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: 8080,
        }
    }
}

impl ServerConfig {
    /// The address to bind, `host:port`.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Admission and timeout limits for database traffic
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Concurrent in-flight data queries
    /// Default: 1024
    pub max_data_requests: usize,

    /// Concurrent in-flight bracket queries
    /// Default: 512
    pub max_bracket_requests: usize,

    /// Deadline for one data query (seconds)
    /// Default: 60
    pub db_data_timeout_seconds: u64,

    /// Deadline for one bracket query (seconds)
    /// Default: 30
    pub db_bracket_timeout_seconds: u64,

    /// Request-body and WebSocket-message cap (bytes)
    /// Default: 16 KiB
    pub max_request_bytes: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_data_requests: 1024,
            max_bracket_requests: 512,
            db_data_timeout_seconds: 60,
            db_bracket_timeout_seconds: 30,
            max_request_bytes: 16 << 10,
        }
    }
}

/// Session settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Seconds a login session stays valid
    /// Default: 86400 (one day)
    pub expiry_seconds: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            expiry_seconds: 24 * 60 * 60,
        }
    }
}

/// Permission cache settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Bound on cached permission entries
    /// Default: 1024
    pub max_cached_permissions: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_cached_permissions: 1024,
        }
    }
}

/// Instrumentation intervals
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct InstrumentConfig {
    /// Seconds between outstanding-request log lines
    /// Default: 60
    pub waiting_log_interval_seconds: u64,

    /// Seconds between runtime-task-count log lines
    /// Default: 60
    pub task_log_interval_seconds: u64,
}

impl Default for InstrumentConfig {
    fn default() -> Self {
        Self {
            waiting_log_interval_seconds: 60,
            task_log_interval_seconds: 60,
        }
    }
}

/// Complete gateway configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub limits: LimitsConfig,
    pub session: SessionConfig,
    pub cache: CacheConfig,
    pub instrument: InstrumentConfig,
    pub log: LogConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let config: Config = toml::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Check cross-field constraints.
    pub fn validate(&self) -> Result<()> {
        if self.limits.max_data_requests == 0 {
            return Err(ConfigError::Invalid(
                "limits.max_data_requests must be at least 1".into(),
            ));
        }
        if self.limits.max_bracket_requests == 0 {
            return Err(ConfigError::Invalid(
                "limits.max_bracket_requests must be at least 1".into(),
            ));
        }
        if self.limits.max_request_bytes == 0 {
            return Err(ConfigError::Invalid(
                "limits.max_request_bytes must be at least 1".into(),
            ));
        }
        if self.limits.db_data_timeout_seconds == 0 || self.limits.db_bracket_timeout_seconds == 0
        {
            return Err(ConfigError::Invalid(
                "database timeouts must be at least 1 second".into(),
            ));
        }
        if self.instrument.waiting_log_interval_seconds == 0
            || self.instrument.task_log_interval_seconds == 0
        {
            return Err(ConfigError::Invalid(
                "instrumentation intervals must be at least 1 second".into(),
            ));
        }
        Ok(())
    }
}
