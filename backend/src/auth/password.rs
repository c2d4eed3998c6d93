//! Password hashing
//!
//! New hashes are produced with the configured algorithm (Argon2id by
//! default, bcrypt optionally). Verification looks at the stored hash
//! itself, so records hashed under a previous setting keep working.
//!
//! # Performance Considerations
//!
//! Both algorithms are intentionally CPU-intensive. Async callers should use
//! `hash_async` / `verify_async`, which run on the blocking thread pool.

use crate::config::{PasswordAlgorithm, PasswordConfig};
use anyhow::{bail, Result};
use argon2::{
    password_hash::{self, rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};

/// Password hashing service
///
/// Holds only the algorithm choice and cost, so cloning is free.
#[derive(Debug, Clone, Copy)]
pub struct PasswordService {
    algorithm: PasswordAlgorithm,
    bcrypt_cost: u32,
}

impl PasswordService {
    pub fn new(algorithm: PasswordAlgorithm, bcrypt_cost: u32) -> Self {
        Self {
            algorithm,
            bcrypt_cost,
        }
    }

    pub fn from_config(config: &PasswordConfig) -> Self {
        Self::new(config.algorithm, config.bcrypt_cost)
    }

    pub fn algorithm(&self) -> PasswordAlgorithm {
        self.algorithm
    }

    /// Hash a password with a fresh random salt (blocking operation)
    pub fn hash(&self, password: &str) -> Result<String> {
        match self.algorithm {
            PasswordAlgorithm::Argon2 => {
                let salt = SaltString::generate(&mut OsRng);
                let hash = Argon2::default()
                    .hash_password(password.as_bytes(), &salt)
                    .map_err(|e| anyhow::anyhow!("Failed to hash password: {}", e))?;
                Ok(hash.to_string())
            }
            PasswordAlgorithm::Bcrypt => bcrypt::hash(password, self.bcrypt_cost)
                .map_err(|e| anyhow::anyhow!("Failed to hash password: {}", e)),
        }
    }

    /// Hash a password asynchronously (non-blocking)
    pub async fn hash_async(&self, password: String) -> Result<String> {
        let service = *self;
        tokio::task::spawn_blocking(move || service.hash(&password))
            .await
            .map_err(|e| anyhow::anyhow!("Task join error: {}", e))?
    }

    /// Verify a password against a stored hash (blocking operation)
    ///
    /// Returns `Ok(false)` on mismatch and `Err` when the stored hash is
    /// unusable (unknown format, missing salt or output, bad parameters).
    pub fn verify(password: &str, hash: &str) -> Result<bool> {
        if is_bcrypt_hash(hash) {
            return bcrypt::verify(password, hash)
                .map_err(|e| anyhow::anyhow!("Invalid hash format: {}", e));
        }
        if !hash.starts_with("$argon2") {
            bail!("Unrecognised password hash format");
        }

        let parsed_hash =
            PasswordHash::new(hash).map_err(|e| anyhow::anyhow!("Invalid hash format: {}", e))?;
        // The verifier reports a missing salt or output as a plain mismatch
        if parsed_hash.salt.is_none() || parsed_hash.hash.is_none() {
            bail!("Invalid hash format: missing salt or hash output");
        }

        match Argon2::default().verify_password(password.as_bytes(), &parsed_hash) {
            Ok(()) => Ok(true),
            Err(password_hash::Error::Password) => Ok(false),
            Err(e) => Err(anyhow::anyhow!("Invalid hash format: {}", e)),
        }
    }

    /// Verify a password asynchronously (non-blocking)
    pub async fn verify_async(password: String, hash: String) -> Result<bool> {
        tokio::task::spawn_blocking(move || Self::verify(&password, &hash))
            .await
            .map_err(|e| anyhow::anyhow!("Task join error: {}", e))?
    }
}

fn is_bcrypt_hash(hash: &str) -> bool {
    ["$2a$", "$2b$", "$2x$", "$2y$"]
        .iter()
        .any(|prefix| hash.starts_with(prefix))
}
