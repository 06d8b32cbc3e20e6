//! Credential hashing for the login and registration paths.
//!
//! Passwords are hashed as `password ‖ salt ‖ pepper` with Argon2id. The salt is
//! generated per registration and stored next to the user record; the pepper is a
//! process-wide secret that only lives in configuration.

pub mod sanitize;
pub mod vector;
pub mod verifier;

use thiserror::Error;

pub use sanitize::{ensure_sanitized, sanitize};
pub use vector::{CredentialVector, Pepper, Salt, MIN_PEPPER_LENGTH, MIN_SALT_LENGTH};
pub use verifier::{CredentialVerifier, PasswordHash, MIN_PASSWORD_LENGTH};

pub type CryptoResult<T> = Result<T, CryptoError>;

/// Errors produced by the common-crypto helpers.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CryptoError {
    #[error("password must be at least {min} characters")]
    PasswordTooShort { min: usize },
    #[error("password contains disallowed characters")]
    DisallowedCharacters,
    #[error("invalid salt: {0}")]
    InvalidSalt(String),
    #[error("pepper must be at least {min} characters")]
    PepperTooShort { min: usize },
    #[error("invalid hash parameters: {0}")]
    InvalidParams(String),
    #[error("stored password hash is malformed")]
    MalformedHash,
    #[error("hashing failure: {0}")]
    Hashing(String),
}

impl From<argon2::Error> for CryptoError {
    fn from(value: argon2::Error) -> Self {
        Self::Hashing(value.to_string())
    }
}
