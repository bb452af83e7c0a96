//! Tag definitions
//!
//! A tag bundles a set of collection-path prefixes. A user holding a tag may
//! read any stream whose collection starts with one of the tag's prefixes.
//! Two tag names are special: [`PUBLIC_TAG`] is what unauthenticated clients
//! get, and [`ALL_TAG`] grants unconditional access (realized as the empty
//! prefix, which every collection starts with).

use std::collections::BTreeSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use plotter_store::ConfigStore;

use crate::error::{AuthError, Result};
use crate::namespace::StoreNamespace;

/// Tag granted to unauthenticated sessions.
pub const PUBLIC_TAG: &str = "public";

/// Tag granting access to every stream.
pub const ALL_TAG: &str = "all";

/// A named set of collection-path prefixes.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct TagDef {
    pub prefixes: BTreeSet<String>,
}

impl TagDef {
    pub fn new(prefixes: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            prefixes: prefixes.into_iter().map(Into::into).collect(),
        }
    }

    /// Read the definition of `tag`. `None` if the tag is not defined.
    pub async fn retrieve(
        store: &Arc<dyn ConfigStore>,
        ns: &StoreNamespace,
        tag: &str,
    ) -> Result<Option<TagDef>> {
        let key = ns.tag_key(tag);
        let Some(entry) = store.get(&key).await? else {
            return Ok(None);
        };
        serde_json::from_slice(&entry.value)
            .map(Some)
            .map_err(|e| AuthError::corrupt(&key, e))
    }

    /// Write the definition of `tag`.
    pub async fn upsert(
        &self,
        store: &Arc<dyn ConfigStore>,
        ns: &StoreNamespace,
        tag: &str,
    ) -> Result<()> {
        let encoded = serde_json::to_vec(self)?;
        store.put(&ns.tag_key(tag), encoded).await?;
        Ok(())
    }

    /// Delete the definition of `tag`. Returns whether it existed.
    pub async fn delete(
        store: &Arc<dyn ConfigStore>,
        ns: &StoreNamespace,
        tag: &str,
    ) -> Result<bool> {
        store.delete(&ns.tag_key(tag)).await.map_err(Into::into)
    }
}
