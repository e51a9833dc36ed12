//! Credential hashing

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("Credential hashing failed: {0}")]
    Hash(String),

    #[error("Stored credential hash is malformed: {0}")]
    MalformedHash(String),
}

/// Hash/verify pair used by registration, bootstrap and login
pub trait CredentialHasher: Send + Sync {
    fn hash(&self, credential: &str) -> Result<String, CredentialError>;

    /// `Ok(false)` for a wrong credential; `Err` only for an unreadable hash
    fn verify(&self, credential: &str, hash: &str) -> Result<bool, CredentialError>;
}

/// Argon2id with default parameters and a random salt per hash
#[derive(Debug, Default, Clone, Copy)]
pub struct Argon2Hasher;

impl CredentialHasher for Argon2Hasher {
    fn hash(&self, credential: &str) -> Result<String, CredentialError> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = Argon2::default()
            .hash_password(credential.as_bytes(), &salt)
            .map_err(|e| CredentialError::Hash(e.to_string()))?;
        Ok(hash.to_string())
    }

    fn verify(&self, credential: &str, hash: &str) -> Result<bool, CredentialError> {
        let parsed_hash =
            PasswordHash::new(hash).map_err(|e| CredentialError::MalformedHash(e.to_string()))?;
        Ok(Argon2::default()
            .verify_password(credential.as_bytes(), &parsed_hash)
            .is_ok())
    }
}
