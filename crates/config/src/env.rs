//! Environment overrides
//!
//! Deployment-level settings come from the environment rather than the
//! config file so one file can serve several deployments.

use crate::error::{ConfigError, Result};

/// Environment variable naming the config-store key namespace.
pub const CONFIG_PREFIX: &str = "CONFIG_PREFIX";

/// Environment variable overriding the collection path separator.
pub const PATH_SEPARATOR: &str = "PATH_SEPARATOR";

/// Environment variable naming the config-store endpoint.
pub const CONFIG_STORE_ENDPOINT: &str = "CONFIG_STORE_ENDPOINT";

/// Settings read from the process environment.
#[derive(Debug, Clone)]
pub struct EnvOverrides {
    /// Key namespace prepended to every config-store key. Empty by default.
    pub config_prefix: String,

    /// Collection path separator. Default `/`.
    pub path_separator: char,

    /// Config-store endpoint, if set.
    pub store_endpoint: Option<String>,
}

impl EnvOverrides {
    /// Read the overrides from the environment.
    ///
    /// Fails if `PATH_SEPARATOR` is set to anything other than exactly one
    /// character.
    pub fn from_env() -> Result<Self> {
        let config_prefix = std::env::var(CONFIG_PREFIX).unwrap_or_default();

        let path_separator = match std::env::var(PATH_SEPARATOR) {
            Ok(value) => {
                let mut chars = value.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => c,
                    _ => {
                        return Err(ConfigError::Environment(format!(
                            "${} must be one character (got {:?})",
                            PATH_SEPARATOR, value
                        )))
                    }
                }
            }
            Err(_) => '/',
        };

        let store_endpoint = std::env::var(CONFIG_STORE_ENDPOINT).ok();

        Ok(Self {
            config_prefix,
            path_separator,
            store_endpoint,
        })
    }
}

impl Default for EnvOverrides {
    fn default() -> Self {
        Self {
            config_prefix: String::new(),
            path_separator: '/',
            store_endpoint: None,
        }
    }
}
