//! Password hashing and verification.
//!
//! Hashing is a one-way operation: argon2id with a per-hash random salt and
//! the work factor fixed at process start. There is no decode path anywhere.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Algorithm, Argon2, Params, Version,
};
use std::fmt;

/// Plaintext password wrapper. `Debug` output is redacted so the value
/// cannot leak through logging or error formatting.
#[derive(Clone)]
pub struct Password(String);

impl Password {
    pub fn new(password: String) -> Self {
        Self(password)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Password {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Password(<redacted>)")
    }
}

/// Argon2id work factor, taken from configuration once at startup.
#[derive(Debug, Clone)]
pub struct HashParams {
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

impl Default for HashParams {
    fn default() -> Self {
        // The argon2 crate's recommended defaults (19 MiB, t=2, p=1).
        Self {
            memory_kib: 19_456,
            iterations: 2,
            parallelism: 1,
        }
    }
}

fn hasher(params: &HashParams) -> Result<Argon2<'static>, anyhow::Error> {
    let params = Params::new(params.memory_kib, params.iterations, params.parallelism, None)
        .map_err(|e| anyhow::anyhow!("Invalid argon2 parameters: {}", e))?;
    Ok(Argon2::new(Algorithm::Argon2id, Version::V0x13, params))
}

/// Hash a password with the configured work factor. The salt is generated
/// per call and encoded into the returned PHC string.
pub fn hash_password(password: &Password, params: &HashParams) -> Result<String, anyhow::Error> {
    let salt = SaltString::generate(&mut OsRng);

    let hash = hasher(params)?
        .hash_password(password.as_str().as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("Failed to hash password: {}", e))?
        .to_string();

    Ok(hash)
}

/// Verify a submitted password against a stored PHC hash.
///
/// The digest comparison inside the argon2 crate is constant-time. An
/// unparseable stored hash fails closed; neither the plaintext nor the hash
/// is returned or logged on any path.
pub fn verify_password(password: &Password, stored_hash: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(stored_hash) else {
        return false;
    };

    Argon2::default()
        .verify_password(password.as_str().as_bytes(), &parsed)
        .is_ok()
}
