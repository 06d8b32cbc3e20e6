use std::ops::RangeInclusive;
use std::thread;
use std::time::Duration;

use argon2::{Algorithm, Argon2, Params, Version};
use rand::Rng;
use subtle::ConstantTimeEq;
use tracing::warn;

use crate::sanitize::ensure_sanitized;
use crate::vector::CredentialVector;
use crate::{CryptoError, CryptoResult};

pub const MIN_PASSWORD_LENGTH: usize = 12;

const HASH_LENGTH: usize = 32;
const DEFAULT_DELAY_MS: RangeInclusive<u64> = 100..=500;

/// Hex-encoded Argon2id digest of `password ‖ salt ‖ pepper`.
#[derive(Clone, PartialEq, Eq)]
pub struct PasswordHash(String);

impl PasswordHash {
    /// Wrap a digest loaded from storage.
    pub fn from_stored(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }

    fn bytes(&self) -> CryptoResult<Vec<u8>> {
        let decoded = hex::decode(&self.0).map_err(|_| CryptoError::MalformedHash)?;
        if decoded.len() != HASH_LENGTH {
            return Err(CryptoError::MalformedHash);
        }
        Ok(decoded)
    }
}

impl std::fmt::Debug for PasswordHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("PasswordHash").field(&"***redacted***").finish()
    }
}

/// Hashes and verifies user passwords.
#[derive(Debug, Clone)]
pub struct CredentialVerifier {
    params: Params,
    delay_ms: RangeInclusive<u64>,
}

impl Default for CredentialVerifier {
    fn default() -> Self {
        Self {
            params: default_params(),
            delay_ms: DEFAULT_DELAY_MS,
        }
    }
}

impl CredentialVerifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use custom Argon2 costs (memory in KiB, iterations, lanes).
    pub fn with_cost(m_cost: u32, t_cost: u32, p_cost: u32) -> CryptoResult<Self> {
        let params = Params::new(m_cost, t_cost, p_cost, Some(HASH_LENGTH))
            .map_err(|err| CryptoError::InvalidParams(err.to_string()))?;
        Ok(Self {
            params,
            delay_ms: DEFAULT_DELAY_MS,
        })
    }

    /// Override the randomized post-hash delay, in milliseconds.
    pub fn with_delay_range(mut self, min_ms: u64, max_ms: u64) -> Self {
        self.delay_ms = min_ms.min(max_ms)..=min_ms.max(max_ms);
        self
    }

    pub fn delay_range(&self) -> &RangeInclusive<u64> {
        &self.delay_ms
    }

    /// Hash a new password for registration.
    ///
    /// Sleeps for a random duration from the delay range after hashing. This call
    /// blocks; run it on a blocking thread inside async code.
    pub fn hash(&self, password: &str, vector: &CredentialVector) -> CryptoResult<PasswordHash> {
        if password.chars().count() < MIN_PASSWORD_LENGTH {
            return Err(CryptoError::PasswordTooShort {
                min: MIN_PASSWORD_LENGTH,
            });
        }
        ensure_sanitized(password)?;

        let digest = self.digest(password, vector)?;
        let hash = PasswordHash(hex::encode(digest));

        let delay = rand::thread_rng().gen_range(self.delay_ms.clone());
        if delay > 0 {
            thread::sleep(Duration::from_millis(delay));
        }

        Ok(hash)
    }

    /// Check a login attempt against a stored hash in constant time.
    ///
    /// No randomized delay is applied on this path.
    pub fn verify(&self, password: &str, stored: &PasswordHash, vector: &CredentialVector) -> bool {
        let expected = match stored.bytes() {
            Ok(bytes) => bytes,
            Err(err) => {
                warn!(error = %err, "stored password hash could not be decoded");
                return false;
            }
        };

        let actual = match self.digest(password, vector) {
            Ok(bytes) => bytes,
            Err(err) => {
                warn!(error = %err, "password verification hash failed");
                return false;
            }
        };

        actual.as_slice().ct_eq(expected.as_slice()).into()
    }

    fn digest(&self, password: &str, vector: &CredentialVector) -> CryptoResult<[u8; HASH_LENGTH]> {
        let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone());
        let material = vector.material(password);
        let mut out = [0u8; HASH_LENGTH];
        argon2.hash_password_into(&material, vector.salt.as_str().as_bytes(), &mut out)?;
        Ok(out)
    }
}

fn default_params() -> Params {
    Params::new(
        Params::DEFAULT_M_COST,
        Params::DEFAULT_T_COST,
        Params::DEFAULT_P_COST,
        Some(HASH_LENGTH),
    )
    .unwrap_or(Params::DEFAULT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vector::{Pepper, Salt};

    fn fast_verifier() -> CredentialVerifier {
        CredentialVerifier::with_cost(8, 1, 1)
            .expect("params")
            .with_delay_range(0, 0)
    }

    fn vector_with_salt(salt: &str) -> CredentialVector {
        CredentialVector::new(
            Salt::parse(salt).expect("salt"),
            Pepper::new("pepper-pepper-pepper-pepper-pepper").expect("pepper"),
        )
    }

    #[test]
    fn short_password_is_rejected_before_hashing() {
        let verifier = fast_verifier();
        let vector = vector_with_salt(&"0".repeat(32));
        let err = verifier.hash("short", &vector).expect_err("too short");
        assert_eq!(
            err,
            CryptoError::PasswordTooShort {
                min: MIN_PASSWORD_LENGTH
            }
        );
    }

    #[test]
    fn hash_is_deterministic_for_same_vector() {
        let verifier = fast_verifier();
        let vector = vector_with_salt(&"ab".repeat(16));
        let first = verifier.hash("long enough password", &vector).expect("hash");
        let second = verifier.hash("long enough password", &vector).expect("hash");
        assert_eq!(first, second);
        assert_eq!(first.as_str().len(), HASH_LENGTH * 2);
    }

    #[test]
    fn malformed_stored_hash_never_verifies() {
        let verifier = fast_verifier();
        let vector = vector_with_salt(&"cd".repeat(16));
        let stored = PasswordHash::from_stored("not-hex");
        assert!(!verifier.verify("long enough password", &stored, &vector));
    }

    #[test]
    fn delay_range_is_normalised() {
        let verifier = CredentialVerifier::new().with_delay_range(50, 10);
        assert_eq!(verifier.delay_range(), &(10..=50));
        assert_eq!(CredentialVerifier::new().delay_range(), &(100..=500));
    }

    #[test]
    fn invalid_cost_is_reported() {
        let err = CredentialVerifier::with_cost(1, 0, 1).expect_err("invalid params");
        assert!(matches!(err, CryptoError::InvalidParams(_)));
    }
}
