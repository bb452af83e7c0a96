//! Session authenticator
//!
//! Orchestrates login, token validation, and password changes against the
//! config store. Holds the token crypto behind an `ArcSwap` so key rotations
//! swap the whole crypto state atomically while validators keep their
//! snapshot.

use std::collections::BTreeSet;
use std::sync::Arc;

use arc_swap::ArcSwap;
use chrono::Utc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use plotter_store::{ConfigStore, WatchEvent};

use crate::account::Account;
use crate::error::Result;
use crate::keys::SessionKeys;
use crate::namespace::StoreNamespace;
use crate::session::{LoginSession, TokenCrypto};
use crate::tags::{TagDef, ALL_TAG};

/// Result of a change-password request, mapped to wire status strings by the
/// protocol adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangePasswordOutcome {
    Success,
    InvalidToken,
    IncorrectPassword,
    ServerError,
    /// The account moved on between read and write; the client should retry.
    TryAgain,
}

/// Issues and validates stateless session tokens.
pub struct SessionAuthenticator {
    store: Arc<dyn ConfigStore>,
    ns: StoreNamespace,
    crypto: ArcSwap<TokenCrypto>,
    expiry_seconds: u64,
}

impl SessionAuthenticator {
    pub fn new(
        store: Arc<dyn ConfigStore>,
        ns: StoreNamespace,
        crypto: TokenCrypto,
        expiry_seconds: u64,
    ) -> Self {
        Self {
            store,
            ns,
            crypto: ArcSwap::from_pointee(crypto),
            expiry_seconds,
        }
    }

    /// Load the session keys from the store, generating and inserting a pair
    /// if none exist, and build the authenticator.
    ///
    /// Fails on invalid key lengths or identical encrypt/MAC keys; both are
    /// configuration errors the process must not start with.
    pub async fn bootstrap(
        store: Arc<dyn ConfigStore>,
        ns: StoreNamespace,
        expiry_seconds: u64,
    ) -> Result<Self> {
        let keys = match SessionKeys::retrieve(&store, &ns).await? {
            Some(keys) => {
                info!("found session keys in the config store");
                keys
            }
            None => {
                info!("session keys not in the config store; generating session keys");
                let fresh = SessionKeys::generate();
                fresh.upsert_if_absent(&store, &ns).await?;
                // Re-read rather than trusting our own bytes: another
                // instance may have won the insert race.
                match SessionKeys::retrieve(&store, &ns).await? {
                    Some(keys) => keys,
                    None => fresh,
                }
            }
        };

        let crypto = TokenCrypto::new(&keys.encrypt_key, &keys.mac_key)?;
        Ok(Self::new(store, ns, crypto, expiry_seconds))
    }

    /// Session lifetime in seconds; exposed for peripheral endpoints.
    pub fn expiry_seconds(&self) -> u64 {
        self.expiry_seconds
    }

    /// The store namespace this authenticator reads from.
    pub fn namespace(&self) -> &StoreNamespace {
        &self.ns
    }

    /// Attempt a login.
    ///
    /// `Ok(Some(token))` on success; `Ok(None)` for an unknown user or wrong
    /// password (indistinguishable to the caller); `Err` for server-side
    /// failures.
    pub async fn login(&self, username: &str, password: &str) -> Result<Option<Vec<u8>>> {
        let Some(account) = Account::retrieve(&self.store, &self.ns, username).await? else {
            return Ok(None);
        };
        if !account.check_password(password)? {
            return Ok(None);
        }

        let mut prefixes = BTreeSet::new();
        for tag in &account.tags {
            if tag == ALL_TAG {
                // The empty prefix matches every collection.
                prefixes.insert(String::new());
                continue;
            }
            if let Some(def) = TagDef::retrieve(&self.store, &self.ns, tag).await? {
                prefixes.extend(def.prefixes);
            }
        }

        let session = LoginSession {
            issued: Utc::now().timestamp(),
            user: username.to_string(),
            prefixes,
        };

        self.crypto.load().encode(&session).map(Some)
    }

    /// Validate a token and return its session if it is authentic and
    /// unexpired.
    pub fn validate(&self, token: &[u8]) -> Option<LoginSession> {
        let session = self.crypto.load().open(token)?;

        let now = Utc::now().timestamp();
        let age = now - session.issued;
        if age < 0 || age as u64 >= self.expiry_seconds {
            debug!(
                user = %session.user,
                issued = session.issued,
                now,
                "session expired"
            );
            return None;
        }

        Some(session)
    }

    /// Log off: sessions are stateless, so this only reports whether the
    /// token was still valid.
    pub fn logoff(&self, token: &[u8]) -> bool {
        self.validate(token).is_some()
    }

    /// Change the password for the account the token belongs to.
    pub async fn change_password(
        &self,
        token: &[u8],
        old_password: &str,
        new_password: &str,
    ) -> ChangePasswordOutcome {
        let Some(session) = self.validate(token) else {
            return ChangePasswordOutcome::InvalidToken;
        };

        let mut account = match Account::retrieve(&self.store, &self.ns, &session.user).await {
            Ok(Some(account)) => account,
            Ok(None) => {
                warn!(user = %session.user, "valid session for a deleted account");
                return ChangePasswordOutcome::ServerError;
            }
            Err(err) => {
                warn!(error = %err, "could not read account for password change");
                return ChangePasswordOutcome::ServerError;
            }
        };

        match account.check_password(old_password) {
            Ok(true) => {}
            Ok(false) => return ChangePasswordOutcome::IncorrectPassword,
            Err(err) => {
                warn!(error = %err, "could not verify current password");
                return ChangePasswordOutcome::ServerError;
            }
        }

        if let Err(err) = account.set_password(new_password) {
            warn!(error = %err, "could not hash new password");
            return ChangePasswordOutcome::ServerError;
        }

        match account.upsert_atomic(&self.store, &self.ns).await {
            Ok(true) => ChangePasswordOutcome::Success,
            Ok(false) => ChangePasswordOutcome::TryAgain,
            Err(err) => {
                warn!(error = %err, "could not write account for password change");
                ChangePasswordOutcome::ServerError
            }
        }
    }

    /// Watch the key subtree and swap in rotated session keys.
    ///
    /// Malformed rotations are logged and ignored; the previous keys stay in
    /// effect.
    pub fn spawn_key_watch(self: &Arc<Self>) -> JoinHandle<()> {
        let this = Arc::clone(self);
        let mut events = this.store.watch_prefix(&this.ns.keys_prefix());
        let session_key = this.ns.session_keys_key();

        tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                if event.key() != session_key {
                    continue;
                }
                if matches!(event, WatchEvent::Delete { .. }) {
                    warn!("session keys deleted from the config store; keeping previous keys");
                    continue;
                }
                match SessionKeys::retrieve(&this.store, &this.ns).await {
                    Ok(Some(keys)) => {
                        match TokenCrypto::new(&keys.encrypt_key, &keys.mac_key) {
                            Ok(crypto) => {
                                this.crypto.store(Arc::new(crypto));
                                info!("session keys rotated");
                            }
                            Err(err) => {
                                warn!(error = %err, "ignoring invalid rotated session keys");
                            }
                        }
                    }
                    Ok(None) => {
                        warn!("session keys missing after rotation event; keeping previous keys");
                    }
                    Err(err) => {
                        warn!(error = %err, "could not re-read session keys; keeping previous keys");
                    }
                }
            }
        })
    }
}

#[cfg(test)]
#[path = "authenticator_test.rs"]
mod tests;
