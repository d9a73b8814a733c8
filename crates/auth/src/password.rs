//! bcrypt password hashing.

use pwhash::bcrypt::{self, BcryptSetup};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PasswordError {
    #[error("password cannot be empty")]
    Empty,

    #[error("failed to hash password: {0}")]
    Hash(String),
}

/// Hash a password with the default bcrypt cost.
pub fn hash_password(password: &str) -> Result<String, PasswordError> {
    if password.is_empty() {
        return Err(PasswordError::Empty);
    }
    bcrypt::hash(password).map_err(|e| PasswordError::Hash(e.to_string()))
}

/// Hash with an explicit cost (4..=31). Low costs are for tests only.
pub fn hash_password_with_cost(password: &str, cost: u32) -> Result<String, PasswordError> {
    if password.is_empty() {
        return Err(PasswordError::Empty);
    }
    let setup = BcryptSetup {
        salt: None,
        cost: Some(cost),
        variant: None,
    };
    bcrypt::hash_with(setup, password).map_err(|e| PasswordError::Hash(e.to_string()))
}

/// Check a password against a stored bcrypt hash. Malformed hashes never verify.
pub fn verify_password(password: &str, hash: &str) -> bool {
    bcrypt::verify(password, hash)
}
