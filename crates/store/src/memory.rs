//! Local config-store implementation
//!
//! `MemoryStore` keeps the whole keyspace in a `BTreeMap` (ordered, so prefix
//! scans are range scans) and fans watch events out through a broadcast
//! channel. An optional JSON snapshot file makes the store durable enough for
//! the auxiliary CLIs and single-node deployments to share state with the
//! server between restarts.
//!
//! Watches only observe writes made through this process; multi-node
//! deployments need a real store behind the [`ConfigStore`] trait.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, mpsc};
use tracing::warn;

use crate::error::Result;
use crate::{ConfigStore, Entry, WatchEvent, REVISION_ABSENT};

/// Capacity of the internal event fan-out. Watchers that fall further behind
/// than this lose events and are closed.
const EVENT_BUFFER: usize = 256;

#[derive(Default, Serialize, Deserialize)]
struct Snapshot {
    revision: i64,
    entries: BTreeMap<String, SnapshotEntry>,
}

#[derive(Serialize, Deserialize)]
struct SnapshotEntry {
    value: Vec<u8>,
    revision: i64,
}

struct Inner {
    entries: BTreeMap<String, (Vec<u8>, i64)>,
    revision: i64,
}

/// In-memory [`ConfigStore`] with an optional snapshot file.
pub struct MemoryStore {
    inner: RwLock<Inner>,
    events: broadcast::Sender<WatchEvent>,
    snapshot: Option<PathBuf>,
}

impl MemoryStore {
    /// Create an empty, purely in-memory store.
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_BUFFER);
        Self {
            inner: RwLock::new(Inner {
                entries: BTreeMap::new(),
                revision: 0,
            }),
            events,
            snapshot: None,
        }
    }

    /// Open a store backed by a JSON snapshot file.
    ///
    /// The file is loaded if it exists and rewritten after every mutation.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let mut store = Self::new();
        store.snapshot = Some(path.clone());

        if path.exists() {
            let raw = std::fs::read(&path)?;
            let snapshot: Snapshot = serde_json::from_slice(&raw)?;
            let mut inner = store.inner.write().expect("store lock poisoned");
            inner.revision = snapshot.revision;
            inner.entries = snapshot
                .entries
                .into_iter()
                .map(|(k, e)| (k, (e.value, e.revision)))
                .collect();
        }

        Ok(store)
    }

    fn persist(&self, inner: &Inner) -> Result<()> {
        let Some(ref path) = self.snapshot else {
            return Ok(());
        };
        let snapshot = Snapshot {
            revision: inner.revision,
            entries: inner
                .entries
                .iter()
                .map(|(k, (v, r))| {
                    (
                        k.clone(),
                        SnapshotEntry {
                            value: v.clone(),
                            revision: *r,
                        },
                    )
                })
                .collect(),
        };
        let raw = serde_json::to_vec_pretty(&snapshot)?;
        std::fs::write(path, raw)?;
        Ok(())
    }

    fn notify(&self, event: WatchEvent) {
        // send only fails when no watcher is subscribed
        let _ = self.events.send(event);
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ConfigStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<Entry>> {
        let inner = self.inner.read().expect("store lock poisoned");
        Ok(inner.entries.get(key).map(|(value, revision)| Entry {
            key: key.to_string(),
            value: value.clone(),
            revision: *revision,
        }))
    }

    async fn put(&self, key: &str, value: Vec<u8>) -> Result<i64> {
        let entry = {
            let mut inner = self.inner.write().expect("store lock poisoned");
            inner.revision += 1;
            let revision = inner.revision;
            inner
                .entries
                .insert(key.to_string(), (value.clone(), revision));
            self.persist(&inner)?;
            Entry {
                key: key.to_string(),
                value,
                revision,
            }
        };
        let revision = entry.revision;
        self.notify(WatchEvent::Put(entry));
        Ok(revision)
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        let removed = {
            let mut inner = self.inner.write().expect("store lock poisoned");
            if inner.entries.remove(key).is_none() {
                return Ok(false);
            }
            inner.revision += 1;
            self.persist(&inner)?;
            inner.revision
        };
        self.notify(WatchEvent::Delete {
            key: key.to_string(),
            revision: removed,
        });
        Ok(true)
    }

    async fn scan_prefix(&self, prefix: &str) -> Result<Vec<Entry>> {
        let inner = self.inner.read().expect("store lock poisoned");
        Ok(inner
            .entries
            .range(prefix.to_string()..)
            .take_while(|(k, _)| k.starts_with(prefix))
            .map(|(k, (value, revision))| Entry {
                key: k.clone(),
                value: value.clone(),
                revision: *revision,
            })
            .collect())
    }

    async fn compare_and_put(
        &self,
        key: &str,
        value: Vec<u8>,
        expected_revision: i64,
    ) -> Result<bool> {
        let entry = {
            let mut inner = self.inner.write().expect("store lock poisoned");
            let current = inner.entries.get(key).map(|(_, r)| *r);
            let matches = match current {
                Some(revision) => revision == expected_revision,
                None => expected_revision == REVISION_ABSENT,
            };
            if !matches {
                return Ok(false);
            }
            inner.revision += 1;
            let revision = inner.revision;
            inner
                .entries
                .insert(key.to_string(), (value.clone(), revision));
            self.persist(&inner)?;
            Entry {
                key: key.to_string(),
                value,
                revision,
            }
        };
        self.notify(WatchEvent::Put(entry));
        Ok(true)
    }

    fn watch_prefix(&self, prefix: &str) -> mpsc::Receiver<WatchEvent> {
        let (tx, rx) = mpsc::channel(EVENT_BUFFER);
        let mut events = self.events.subscribe();
        let prefix = prefix.to_string();

        tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(event) => {
                        if !event.key().starts_with(&prefix) {
                            continue;
                        }
                        if tx.send(event).await.is_err() {
                            return; // watcher dropped
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(missed)) => {
                        warn!(prefix = %prefix, missed, "store watcher lagged; closing watch");
                        return;
                    }
                    Err(broadcast::error::RecvError::Closed) => return,
                }
            }
        });

        rx
    }
}

#[cfg(test)]
#[path = "memory_test.rs"]
mod tests;
