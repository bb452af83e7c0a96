//! Permission checker
//!
//! The decision for `(session, uuid)`:
//!
//! 1. the stream must exist (checked fresh every time, never cached);
//! 2. the effective prefix set is the session's, or the `public` tag's for
//!    unauthenticated requests;
//! 3. allow iff some effective prefix is a prefix of the stream's
//!    collection path.

use std::collections::BTreeSet;
use std::sync::Arc;

use moka::future::Cache;
use tracing::{debug, warn};
use uuid::Uuid;

use plotter_auth::{LoginSession, StoreNamespace, TagDef, PUBLIC_TAG};
use plotter_store::ConfigStore;
use plotter_tsdb::{TsdbClient, TsdbError};

/// Cached `(stream, session) → allowed` decisions.
pub struct PermissionChecker {
    tsdb: Arc<dyn TsdbClient>,
    store: Arc<dyn ConfigStore>,
    ns: StoreNamespace,
    collections: Cache<Uuid, Arc<str>>,
    tag_prefixes: Cache<String, Arc<BTreeSet<String>>>,
}

impl PermissionChecker {
    pub fn new(
        tsdb: Arc<dyn TsdbClient>,
        store: Arc<dyn ConfigStore>,
        ns: StoreNamespace,
        max_cached: u64,
    ) -> Self {
        Self {
            tsdb,
            store,
            ns,
            collections: Cache::builder().max_capacity(max_cached).build(),
            tag_prefixes: Cache::builder()
                .max_capacity(max_cached)
                .weigher(|_tag, prefixes: &Arc<BTreeSet<String>>| prefixes.len() as u32)
                .build(),
        }
    }

    /// The store namespace whose tag subtree governs these caches.
    pub fn namespace(&self) -> &StoreNamespace {
        &self.ns
    }

    /// Whether `session` (or an unauthenticated client, for `None`) may read
    /// the stream `uuid`.
    ///
    /// Denies on any backend failure; failures are not cached, so the next
    /// request retries the lookup.
    pub async fn has_permission(&self, session: Option<&LoginSession>, uuid: Uuid) -> bool {
        // Never cache existence: a stream created after a miss would
        // otherwise stay invisible until an invalidation.
        match self.tsdb.exists(uuid).await {
            Ok(true) => {}
            Ok(false) => return false,
            Err(err) => {
                warn!(%uuid, error = %err, "existence check failed; denying");
                return false;
            }
        }

        let collection = match self.collection(uuid).await {
            Ok(collection) => collection,
            Err(err) => {
                warn!(%uuid, error = %err, "collection lookup failed; denying");
                return false;
            }
        };

        match session {
            Some(session) => session
                .prefixes
                .iter()
                .any(|prefix| collection.starts_with(prefix.as_str())),
            None => {
                let prefixes = match self.tag_prefixes(PUBLIC_TAG).await {
                    Ok(prefixes) => prefixes,
                    Err(err) => {
                        warn!(error = %err, "public tag lookup failed; denying");
                        return false;
                    }
                };
                prefixes
                    .iter()
                    .any(|prefix| collection.starts_with(prefix.as_str()))
            }
        }
    }

    /// The collection path of `uuid`, through the single-flight cache.
    pub async fn collection(&self, uuid: Uuid) -> Result<Arc<str>, Arc<TsdbError>> {
        let tsdb = Arc::clone(&self.tsdb);
        self.collections
            .try_get_with(uuid, async move {
                tsdb.collection(uuid).await.map(Arc::from)
            })
            .await
    }

    /// The prefix set of `tag`, through the single-flight cache. An
    /// undefined tag resolves to the empty set (and is cached at zero cost).
    pub async fn tag_prefixes(
        &self,
        tag: &str,
    ) -> Result<Arc<BTreeSet<String>>, Arc<plotter_auth::AuthError>> {
        let store = Arc::clone(&self.store);
        let ns = self.ns.clone();
        let owned = tag.to_string();
        self.tag_prefixes
            .try_get_with(owned.clone(), async move {
                let def = TagDef::retrieve(&store, &ns, &owned).await?;
                Ok(Arc::new(def.unwrap_or_default().prefixes))
            })
            .await
    }

    /// Drop every cached entry; permission results are recomputed from the
    /// store and database afterwards.
    pub fn invalidate_all(&self) {
        debug!("invalidating permission caches");
        self.collections.invalidate_all();
        self.tag_prefixes.invalidate_all();
    }
}

#[cfg(test)]
#[path = "checker_test.rs"]
mod tests;
