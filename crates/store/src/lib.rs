//! Plotter Store - config-store contract
//!
//! The gateway keeps all of its mutable configuration — accounts, tag
//! definitions, session keys, TLS material — in an external key/value store.
//! This crate defines the contract the rest of the system programs against,
//! plus a local implementation used by tests and single-node deployments.
//!
//! # Contract
//!
//! - `get` / `put` / `delete` on single keys
//! - `scan_prefix` over a key namespace
//! - `compare_and_put` guarded by a monotonic revision number
//! - `watch_prefix` delivering change events for a namespace
//!
//! Every write bumps a store-wide revision counter; reads report the revision
//! at which the key was last written so that read-modify-write cycles can be
//! made atomic with `compare_and_put`.
//!
//! # Example
//!
//! ```ignore
//! use plotter_store::{ConfigStore, MemoryStore};
//!
//! let store = MemoryStore::new();
//! store.put("mrplotter/tags/public", b"{}".to_vec()).await?;
//! let entry = store.get("mrplotter/tags/public").await?.unwrap();
//! assert_eq!(entry.value, b"{}");
//! ```

mod error;
mod memory;

pub use error::{Result, StoreError};
pub use memory::MemoryStore;

use async_trait::async_trait;
use tokio::sync::mpsc;

/// A key/value pair together with the revision of its last write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub key: String,
    pub value: Vec<u8>,
    /// Store revision at which this value was written.
    pub revision: i64,
}

/// A change observed by a prefix watch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchEvent {
    Put(Entry),
    Delete { key: String, revision: i64 },
}

impl WatchEvent {
    /// The key the event refers to.
    pub fn key(&self) -> &str {
        match self {
            WatchEvent::Put(entry) => &entry.key,
            WatchEvent::Delete { key, .. } => key,
        }
    }
}

/// Revision value meaning "the key must not exist yet" in `compare_and_put`.
pub const REVISION_ABSENT: i64 = 0;

/// Abstract key/value store with revisions and prefix watches.
///
/// Implementations must be safe for concurrent use; the gateway shares one
/// client across all request tasks.
#[async_trait]
pub trait ConfigStore: Send + Sync {
    /// Read a single key. `None` if the key does not exist.
    async fn get(&self, key: &str) -> Result<Option<Entry>>;

    /// Write a single key, returning the revision of the write.
    async fn put(&self, key: &str, value: Vec<u8>) -> Result<i64>;

    /// Delete a single key. Returns whether the key existed.
    async fn delete(&self, key: &str) -> Result<bool>;

    /// Read all keys starting with `prefix`, in key order.
    async fn scan_prefix(&self, prefix: &str) -> Result<Vec<Entry>>;

    /// Write `key` only if its current revision equals `expected_revision`
    /// (`REVISION_ABSENT` to require that the key does not exist). Returns
    /// whether the write was applied.
    async fn compare_and_put(
        &self,
        key: &str,
        value: Vec<u8>,
        expected_revision: i64,
    ) -> Result<bool>;

    /// Watch for changes under `prefix`.
    ///
    /// The receiver yields events for every write or delete whose key starts
    /// with `prefix`, in commit order. Dropping the receiver ends the watch.
    fn watch_prefix(&self, prefix: &str) -> mpsc::Receiver<WatchEvent>;
}
