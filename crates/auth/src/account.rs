//! Account records
//!
//! Accounts are created and mutated out-of-band by admin tooling; the
//! gateway itself only reads them during login and rewrites them during a
//! password change. Records are stored JSON-encoded, one key per username,
//! so usernames are unique by construction.

use std::collections::BTreeSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use plotter_store::{ConfigStore, REVISION_ABSENT};

use crate::error::{AuthError, Result};
use crate::namespace::StoreNamespace;
use crate::password;

/// One user account.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Account {
    pub username: String,
    /// Tag names granted to this user.
    pub tags: BTreeSet<String>,
    /// Argon2id hash in PHC string format.
    pub password_hash: String,

    /// Store revision this record was read at; used for the
    /// compare-and-swap update on password change. Zero for records that
    /// were never read from the store.
    #[serde(skip)]
    retrieved_revision: i64,
}

impl Account {
    /// Create a fresh account with a hashed password.
    pub fn new(username: impl Into<String>, password: &str) -> Result<Self> {
        Ok(Self {
            username: username.into(),
            tags: BTreeSet::new(),
            password_hash: password::hash_password(password)?,
            retrieved_revision: REVISION_ABSENT,
        })
    }

    /// Grant a tag to this account.
    pub fn grant_tag(&mut self, tag: impl Into<String>) {
        self.tags.insert(tag.into());
    }

    /// Replace the password hash.
    pub fn set_password(&mut self, new_password: &str) -> Result<()> {
        self.password_hash = password::hash_password(new_password)?;
        Ok(())
    }

    /// Check a candidate password against the stored hash.
    pub fn check_password(&self, candidate: &str) -> Result<bool> {
        password::verify_password(candidate, &self.password_hash)
    }

    /// Read the account for `username`. `None` if no such account exists.
    pub async fn retrieve(
        store: &Arc<dyn ConfigStore>,
        ns: &StoreNamespace,
        username: &str,
    ) -> Result<Option<Account>> {
        let key = ns.account_key(username);
        let Some(entry) = store.get(&key).await? else {
            return Ok(None);
        };
        let mut account: Account = serde_json::from_slice(&entry.value)
            .map_err(|e| AuthError::corrupt(&key, e))?;
        account.retrieved_revision = entry.revision;
        Ok(Some(account))
    }

    /// Write the account unconditionally.
    pub async fn upsert(&self, store: &Arc<dyn ConfigStore>, ns: &StoreNamespace) -> Result<()> {
        let encoded = serde_json::to_vec(self)?;
        store.put(&ns.account_key(&self.username), encoded).await?;
        Ok(())
    }

    /// Write the account only if it has not changed since it was read.
    ///
    /// Returns false when the store-side record moved on (another writer won
    /// the race); callers should re-read and retry.
    pub async fn upsert_atomic(
        &self,
        store: &Arc<dyn ConfigStore>,
        ns: &StoreNamespace,
    ) -> Result<bool> {
        let encoded = serde_json::to_vec(self)?;
        store
            .compare_and_put(
                &ns.account_key(&self.username),
                encoded,
                self.retrieved_revision,
            )
            .await
            .map_err(Into::into)
    }

    /// Delete the account for `username`. Returns whether it existed.
    pub async fn delete(
        store: &Arc<dyn ConfigStore>,
        ns: &StoreNamespace,
        username: &str,
    ) -> Result<bool> {
        store
            .delete(&ns.account_key(username))
            .await
            .map_err(Into::into)
    }
}
