//! Config-store selection
//!
//! `CONFIG_STORE_ENDPOINT` names where the config store lives. The local
//! store implementation treats it as a snapshot path, so the server and the
//! key-management tools share state between runs.

use anyhow::Result;
use plotter_store::MemoryStore;
use tracing::info;

/// Store snapshot path used when `CONFIG_STORE_ENDPOINT` is not set.
pub const DEFAULT_STORE_PATH: &str = "mrplotter-store.json";

/// Open the config store named by the environment, falling back to the
/// default local snapshot.
pub fn open_store(endpoint: Option<&str>) -> Result<MemoryStore> {
    let path = match endpoint {
        Some(endpoint) => endpoint.to_string(),
        None => {
            info!(
                "CONFIG_STORE_ENDPOINT is not set; using {}",
                DEFAULT_STORE_PATH
            );
            DEFAULT_STORE_PATH.to_string()
        }
    };
    Ok(MemoryStore::open(&path)?)
}
