//! Login sessions and token crypto
//!
//! A [`LoginSession`] is the record the client carries between requests,
//! sealed inside a token: `IV || AES-CBC ciphertext || HMAC-SHA512`. The MAC
//! covers the padded plaintext and is checked in constant time before any
//! decryption result is trusted.
//!
//! Tokens are padded with NUL bytes rather than PKCS#7: the plaintext is
//! JSON, which cannot contain trailing NULs, so stripping them is
//! unambiguous. A token that passes the MAC check but carries malformed
//! padding or JSON cannot have been produced by this code, so it is treated
//! as evidence that the keys have been stolen.

use std::collections::BTreeSet;

use aes::cipher::{block_padding::NoPadding, BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use hmac::{Hmac, Mac};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::Sha512;
use tracing::{error, warn};

use crate::error::{AuthError, Result};
use crate::{BLOCK_SIZE, MAC_SIZE};

type HmacSha512 = Hmac<Sha512>;

/// The client-held session record.
///
/// `BTreeSet` and `serde_json` together give a canonical byte encoding, so
/// `decode(encode(session)) == session` and equal sessions produce
/// equal-length tokens.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LoginSession {
    /// Unix seconds at which the session was issued.
    pub issued: i64,
    /// Username the session was issued to.
    pub user: String,
    /// Collection-path prefixes this session may read.
    pub prefixes: BTreeSet<String>,
}

/// AES key material, sized at construction.
#[derive(Clone)]
enum EncryptKey {
    Aes128([u8; 16]),
    Aes192([u8; 24]),
    Aes256([u8; 32]),
}

/// Seals and opens session tokens under one key pair.
///
/// Replaced wholesale (behind an `ArcSwap`) when the keys rotate; it holds
/// no other state.
pub struct TokenCrypto {
    encrypt_key: EncryptKey,
    mac_key: Vec<u8>,
}

impl TokenCrypto {
    /// Validate the key pair and build the crypto state.
    ///
    /// Fails if the encryption key is not an AES key length, the MAC key is
    /// shorter than 16 bytes, or the two keys are identical.
    pub fn new(encrypt_key: &[u8], mac_key: &[u8]) -> Result<Self> {
        let encrypt_key = match encrypt_key.len() {
            16 => EncryptKey::Aes128(encrypt_key.try_into().expect("length checked")),
            24 => EncryptKey::Aes192(encrypt_key.try_into().expect("length checked")),
            32 => EncryptKey::Aes256(encrypt_key.try_into().expect("length checked")),
            n => return Err(AuthError::InvalidEncryptKeyLength(n)),
        };
        if mac_key.len() < 16 {
            return Err(AuthError::InvalidMacKeyLength(mac_key.len()));
        }
        let enc_bytes: &[u8] = match &encrypt_key {
            EncryptKey::Aes128(k) => k,
            EncryptKey::Aes192(k) => k,
            EncryptKey::Aes256(k) => k,
        };
        if enc_bytes == mac_key {
            return Err(AuthError::IdenticalKeys);
        }
        Ok(Self {
            encrypt_key,
            mac_key: mac_key.to_vec(),
        })
    }

    fn mac(&self) -> HmacSha512 {
        HmacSha512::new_from_slice(&self.mac_key).expect("HMAC accepts any key length")
    }

    fn encrypt(&self, iv: &[u8; BLOCK_SIZE], plaintext: &[u8]) -> Vec<u8> {
        match &self.encrypt_key {
            EncryptKey::Aes128(key) => cbc::Encryptor::<aes::Aes128>::new_from_slices(key, iv)
                .expect("key and IV sizes fixed")
                .encrypt_padded_vec_mut::<NoPadding>(plaintext),
            EncryptKey::Aes192(key) => cbc::Encryptor::<aes::Aes192>::new_from_slices(key, iv)
                .expect("key and IV sizes fixed")
                .encrypt_padded_vec_mut::<NoPadding>(plaintext),
            EncryptKey::Aes256(key) => cbc::Encryptor::<aes::Aes256>::new_from_slices(key, iv)
                .expect("key and IV sizes fixed")
                .encrypt_padded_vec_mut::<NoPadding>(plaintext),
        }
    }

    fn decrypt(&self, iv: &[u8], ciphertext: &[u8]) -> Option<Vec<u8>> {
        match &self.encrypt_key {
            EncryptKey::Aes128(key) => cbc::Decryptor::<aes::Aes128>::new_from_slices(key, iv)
                .ok()?
                .decrypt_padded_vec_mut::<NoPadding>(ciphertext)
                .ok(),
            EncryptKey::Aes192(key) => cbc::Decryptor::<aes::Aes192>::new_from_slices(key, iv)
                .ok()?
                .decrypt_padded_vec_mut::<NoPadding>(ciphertext)
                .ok(),
            EncryptKey::Aes256(key) => cbc::Decryptor::<aes::Aes256>::new_from_slices(key, iv)
                .ok()?
                .decrypt_padded_vec_mut::<NoPadding>(ciphertext)
                .ok(),
        }
    }

    /// Seal a session into a token.
    pub fn encode(&self, session: &LoginSession) -> Result<Vec<u8>> {
        let mut plaintext = serde_json::to_vec(session)?;
        let padding = (BLOCK_SIZE - plaintext.len() % BLOCK_SIZE) % BLOCK_SIZE;
        plaintext.resize(plaintext.len() + padding, 0);

        let mut iv = [0u8; BLOCK_SIZE];
        rand::rngs::OsRng.fill_bytes(&mut iv);

        let ciphertext = self.encrypt(&iv, &plaintext);

        let mut mac = self.mac();
        mac.update(&plaintext);
        let tag = mac.finalize().into_bytes();

        let mut token = Vec::with_capacity(BLOCK_SIZE + ciphertext.len() + MAC_SIZE);
        token.extend_from_slice(&iv);
        token.extend_from_slice(&ciphertext);
        token.extend_from_slice(&tag);
        Ok(token)
    }

    /// Decrypt and MAC-check a token, returning the padded plaintext.
    ///
    /// `None` for anything structurally invalid or failing the MAC; those
    /// are ordinary forgeries and only worth a log line.
    fn decode_plaintext(&self, token: &[u8]) -> Option<Vec<u8>> {
        if token.len() <= BLOCK_SIZE + MAC_SIZE {
            return None;
        }
        let iv = &token[..BLOCK_SIZE];
        let ciphertext = &token[BLOCK_SIZE..token.len() - MAC_SIZE];
        let tag = &token[token.len() - MAC_SIZE..];
        if ciphertext.len() % BLOCK_SIZE != 0 {
            return None;
        }

        let plaintext = self.decrypt(iv, ciphertext)?;

        let mut mac = self.mac();
        mac.update(&plaintext);
        if mac.verify_slice(tag).is_err() {
            warn!("invalid MAC detected: someone is trying to forge a token");
            return None;
        }

        Some(plaintext)
    }

    /// Open a token into its session.
    ///
    /// Expiry is not checked here; the authenticator owns the expiry policy.
    pub fn open(&self, token: &[u8]) -> Option<LoginSession> {
        let plaintext = self.decode_plaintext(token)?;

        // Strip the NUL padding. JSON cannot end in NUL, so the boundary is
        // unambiguous.
        let content_len = plaintext
            .iter()
            .rposition(|&b| b != 0)
            .map(|i| i + 1)
            .unwrap_or(0);

        if plaintext.len() - content_len >= BLOCK_SIZE {
            error!("token with invalid padding is correctly MAC'ed");
            stolen_keys();
            return None;
        }

        match serde_json::from_slice::<Option<LoginSession>>(&plaintext[..content_len]) {
            Ok(Some(session)) => Some(session),
            Ok(None) => {
                error!("correctly MAC'ed token is null");
                stolen_keys();
                None
            }
            Err(err) => {
                error!(error = %err, "correctly MAC'ed token is invalid JSON");
                stolen_keys();
                None
            }
        }
    }
}

/// A MAC-valid but malformed token means someone other than us is producing
/// valid MACs.
fn stolen_keys() {
    error!(
        "THE MAC KEY HAS BEEN STOLEN, AND THE ENCRYPT KEY PROBABLY TOO. \
         CHANGE THE KEYS AND RESTART THIS PROGRAM."
    );
}

#[cfg(test)]
#[path = "session_test.rs"]
mod tests;
