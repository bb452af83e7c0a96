//! Cache invalidation daemon
//!
//! One task owns the watch on the tag subtree. Tag redefinitions silently
//! change permission results, so any event empties the caches outright
//! rather than trying to invalidate selectively.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::info;

use plotter_store::ConfigStore;

use crate::checker::PermissionChecker;

/// Watch the tag subtree and invalidate the permission caches on any change.
pub fn spawn_invalidation_daemon(
    store: Arc<dyn ConfigStore>,
    checker: Arc<PermissionChecker>,
    shutdown: CancellationToken,
) -> JoinHandle<()> {
    let mut events = store.watch_prefix(&checker.namespace().tags_prefix());

    tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => return,
                event = events.recv() => {
                    match event {
                        Some(event) => {
                            info!(key = event.key(), "tag definition changed; flushing permission caches");
                            checker.invalidate_all();
                        }
                        None => {
                            // Watch lost: entries cached from here on could
                            // never be invalidated.
                            checker.invalidate_all();
                            return;
                        }
                    }
                }
            }
        }
    })
}
