use rand::rngs::OsRng;
use rand::RngCore;
use zeroize::Zeroizing;

use crate::{CryptoError, CryptoResult};

pub const MIN_SALT_LENGTH: usize = 32;
pub const MIN_PEPPER_LENGTH: usize = 32;

const GENERATED_SALT_BYTES: usize = MIN_SALT_LENGTH / 2;

/// Per-credential random value, stored alongside the password hash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Salt(String);

impl Salt {
    /// Generate a fresh salt of 32 lowercase hex characters.
    pub fn generate() -> Self {
        let mut bytes = [0u8; GENERATED_SALT_BYTES];
        OsRng.fill_bytes(&mut bytes);
        Self(hex::encode(bytes))
    }

    /// Accept a stored salt, checking length and charset.
    pub fn parse(value: impl Into<String>) -> CryptoResult<Self> {
        let value = value.into();
        if value.len() < MIN_SALT_LENGTH {
            return Err(CryptoError::InvalidSalt(format!(
                "expected at least {MIN_SALT_LENGTH} characters, got {}",
                value.len()
            )));
        }
        if !value.chars().all(|ch| ch.is_ascii_hexdigit()) {
            return Err(CryptoError::InvalidSalt(
                "salt must be a hex string".to_string(),
            ));
        }
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl std::fmt::Display for Salt {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Process-wide secret mixed into every password hash. Never persisted with users.
#[derive(Clone)]
pub struct Pepper(Zeroizing<String>);

impl Pepper {
    pub fn new(value: impl Into<String>) -> CryptoResult<Self> {
        let value = Zeroizing::new(value.into());
        if value.chars().count() < MIN_PEPPER_LENGTH {
            return Err(CryptoError::PepperTooShort {
                min: MIN_PEPPER_LENGTH,
            });
        }
        Ok(Self(value))
    }

    pub(crate) fn expose(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for Pepper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Pepper").field(&"***redacted***").finish()
    }
}

/// Salt and pepper pair used for one hash or verify call.
#[derive(Debug, Clone)]
pub struct CredentialVector {
    pub salt: Salt,
    pub pepper: Pepper,
}

impl CredentialVector {
    pub fn new(salt: Salt, pepper: Pepper) -> Self {
        Self { salt, pepper }
    }

    /// Builds `password ‖ salt ‖ pepper`, wiped on drop.
    pub(crate) fn material(&self, password: &str) -> Zeroizing<Vec<u8>> {
        let salt = self.salt.as_str().as_bytes();
        let pepper = self.pepper.expose().as_bytes();
        let mut buffer = Vec::with_capacity(password.len() + salt.len() + pepper.len());
        buffer.extend_from_slice(password.as_bytes());
        buffer.extend_from_slice(salt);
        buffer.extend_from_slice(pepper);
        Zeroizing::new(buffer)
    }
}
