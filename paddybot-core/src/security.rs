//! Hashing and token primitives
//!
//! Thin wrappers over argon2, sha2 and the OS RNG. None of this is an auth
//! protocol; handlers decide what to do with the results.

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use rand::RngCore;
use sha2::{Digest, Sha256};

/// Error returned when a password cannot be hashed or a stored hash is unreadable
#[derive(Debug, thiserror::Error)]
#[error("password hashing failed: {0}")]
pub struct HashError(String);

/// Hash a password with Argon2id and a fresh random salt.
///
/// The result is a PHC string (`$argon2id$v=19$...`) that embeds the salt
/// and parameters, so it can be verified without extra state.
pub fn hash_password(password: &str) -> Result<String, HashError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| HashError(e.to_string()))
}

/// Check a plaintext password against a stored PHC hash.
///
/// A mismatch is `Ok(false)`; only a malformed stored hash is an error.
pub fn verify_password(password: &str, hashed: &str) -> Result<bool, HashError> {
    let parsed = PasswordHash::new(hashed).map_err(|e| HashError(e.to_string()))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

/// Random URL-safe token built from `length` bytes of OS entropy.
pub fn generate_token(length: usize) -> String {
    let mut bytes = vec![0u8; length];
    rand::thread_rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Lowercase hex SHA-256 digest of a string.
pub fn hash_string(value: &str) -> String {
    hex::encode(Sha256::digest(value.as_bytes()))
}
