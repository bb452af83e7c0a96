//! Password hashing and verification
//!
//! Argon2id in PHC string format. The parameters are pinned rather than
//! inherited from the argon2 crate's defaults: logins are interactive and
//! the gateway handles bursts of them next to latency-sensitive data
//! queries, so hashing uses the RFC 9106 low-memory profile (19 MiB, two
//! passes, one lane). Pinning also keeps token issuance stable across crate
//! upgrades.
//!
//! Verification reads the parameters recorded in the stored PHC string, so
//! accounts written by older admin tooling under different parameters keep
//! working until their next password change re-hashes them.

use argon2::password_hash::{
    rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString,
};
use argon2::{Algorithm, Argon2, Params, Version};

use crate::error::{AuthError, Result};

/// Memory cost in KiB (19 MiB, RFC 9106 low-memory profile).
const MEMORY_KIB: u32 = 19 * 1024;

/// Number of passes over memory.
const PASSES: u32 = 2;

/// Lanes. Login verification runs on the request task; one lane keeps a
/// burst of logins from monopolizing the worker threads.
const LANES: u32 = 1;

fn hasher() -> Argon2<'static> {
    let params = Params::new(MEMORY_KIB, PASSES, LANES, None)
        .expect("pinned Argon2 parameters are valid");
    Argon2::new(Algorithm::Argon2id, Version::V0x13, params)
}

/// Hash a password for storage in an account record.
///
/// Returns a PHC string (`$argon2id$v=19$m=19456,t=2,p=1$salt$hash`) with a
/// fresh random salt; the parameters travel inside the string.
pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    hasher()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AuthError::PasswordHash(format!("password hash failed: {}", e)))
}

/// Check a login attempt against a stored hash, in constant time with
/// respect to the candidate.
///
/// `Ok(false)` is a wrong password; `Err` means the stored record or the
/// verifier itself is broken, which callers surface as a server error
/// rather than a failed login.
pub fn verify_password(candidate: &str, stored: &str) -> Result<bool> {
    let parsed = PasswordHash::new(stored).map_err(|e| {
        AuthError::PasswordHash(format!("stored password hash is unreadable: {}", e))
    })?;

    // The verifier takes its parameters from `parsed`, not from `hasher()`,
    // so hashes written under other parameter sets still verify.
    match hasher().verify_password(candidate.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(AuthError::PasswordHash(format!(
            "password verification failed: {}",
            e
        ))),
    }
}
