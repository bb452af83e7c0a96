//! Plotter Auth - accounts, tags, and stateless sessions
//!
//! Authentication for the plotting gateway. Sessions are stateless: the
//! token handed to the client *is* the session — an encrypted, MAC'ed JSON
//! record of who logged in, when, and which collection prefixes they may
//! read. Any gateway instance holding the session keys can validate any
//! token; nothing is kept server-side.
//!
//! # Token layout
//!
//! ```text
//! IV (16 bytes) || AES-CBC ciphertext || HMAC-SHA512 (64 bytes)
//! ```
//!
//! The plaintext is the canonical JSON encoding of [`LoginSession`],
//! right-padded with NUL bytes to the cipher block size. The MAC covers the
//! padded plaintext, not the ciphertext, and is verified in constant time
//! before anything else looks at the decryption result. A token whose MAC
//! verifies but whose padding or JSON is malformed can only be produced by
//! someone holding the MAC key, so it is treated as evidence of key
//! compromise.
//!
//! # Store layout
//!
//! Everything lives in the config store under a configurable namespace:
//!
//! - `<prefix>mrplotter/accounts/<username>` — JSON [`Account`]
//! - `<prefix>mrplotter/tags/<tag>` — JSON [`TagDef`]
//! - `<prefix>mrplotter/keys/session` — JSON [`SessionKeys`]
//! - `<prefix>mrplotter/keys/hardcoded` — JSON [`HardcodedTlsCertificate`]

mod account;
mod authenticator;
mod error;
mod keys;
mod namespace;
pub mod password;
mod session;
mod tags;

pub use account::Account;
pub use authenticator::{ChangePasswordOutcome, SessionAuthenticator};
pub use error::{AuthError, Result};
pub use keys::{HardcodedTlsCertificate, SessionKeys};
pub use namespace::StoreNamespace;
pub use session::{LoginSession, TokenCrypto};
pub use tags::{TagDef, ALL_TAG, PUBLIC_TAG};

/// AES block size; the token IV and padding are sized to this.
pub const BLOCK_SIZE: usize = 16;

/// HMAC-SHA512 output size.
pub const MAC_SIZE: usize = 64;
