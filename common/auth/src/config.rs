use jsonwebtoken::Algorithm;
use zeroize::Zeroizing;

use crate::error::{AuthError, AuthResult};

/// Signing algorithms a token codec may be configured with.
pub const ALLOWED_ALGORITHMS: &[Algorithm] = &[
    Algorithm::HS256,
    Algorithm::HS384,
    Algorithm::HS512,
    Algorithm::RS256,
    Algorithm::RS384,
    Algorithm::RS512,
    Algorithm::ES256,
    Algorithm::ES384,
];

pub const MIN_HMAC_KEY_LENGTH: usize = 32;

/// Process-wide token settings, loaded once at start-up.
#[derive(Clone)]
pub struct TokenConfig {
    signing_key: Zeroizing<Vec<u8>>,
    verification_key: Option<Vec<u8>>,
    algorithm: Algorithm,
    subject: String,
    audience: String,
}

impl TokenConfig {
    /// For HMAC algorithms `signing_key` is the shared secret; for RSA/ECDSA it is
    /// the private key PEM and a public key must be added with
    /// [`TokenConfig::with_verification_key`].
    pub fn new(
        signing_key: impl Into<Vec<u8>>,
        algorithm: &str,
        subject: impl Into<String>,
        audience: impl Into<String>,
    ) -> AuthResult<Self> {
        Ok(Self {
            signing_key: Zeroizing::new(signing_key.into()),
            verification_key: None,
            algorithm: parse_algorithm(algorithm)?,
            subject: subject.into(),
            audience: audience.into(),
        })
    }

    pub fn with_verification_key(mut self, pem: impl Into<Vec<u8>>) -> Self {
        self.verification_key = Some(pem.into());
        self
    }

    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    pub fn audience(&self) -> &str {
        &self.audience
    }

    pub fn is_symmetric(&self) -> bool {
        matches!(
            self.algorithm,
            Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512
        )
    }

    pub(crate) fn signing_key(&self) -> &[u8] {
        &self.signing_key
    }

    pub(crate) fn verification_key(&self) -> Option<&[u8]> {
        self.verification_key.as_deref()
    }
}

impl std::fmt::Debug for TokenConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenConfig")
            .field("signing_key", &"***redacted***")
            .field("algorithm", &self.algorithm)
            .field("subject", &self.subject)
            .field("audience", &self.audience)
            .finish()
    }
}

/// Parse an algorithm name, rejecting anything outside [`ALLOWED_ALGORITHMS`].
pub fn parse_algorithm(name: &str) -> AuthResult<Algorithm> {
    let normalized = name.trim().to_ascii_uppercase();
    let algorithm = normalized
        .parse::<Algorithm>()
        .map_err(|_| AuthError::UnsupportedAlgorithm(name.trim().to_string()))?;

    if ALLOWED_ALGORITHMS.contains(&algorithm) {
        Ok(algorithm)
    } else {
        Err(AuthError::UnsupportedAlgorithm(name.trim().to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_allowed_algorithms_case_insensitively() {
        assert_eq!(parse_algorithm("HS256").unwrap(), Algorithm::HS256);
        assert_eq!(parse_algorithm(" rs512 ").unwrap(), Algorithm::RS512);
        assert_eq!(parse_algorithm("es384").unwrap(), Algorithm::ES384);
    }

    #[test]
    fn rejects_algorithms_outside_allow_list() {
        for name in ["PS256", "EdDSA", "none", "HS1024", ""] {
            let err = parse_algorithm(name).expect_err("should reject");
            assert!(matches!(err, AuthError::UnsupportedAlgorithm(_)), "{name}");
        }
    }

    #[test]
    fn config_construction_fails_fast_on_bad_algorithm() {
        let err = TokenConfig::new("k".repeat(40), "none", "sub", "aud").expect_err("reject");
        assert!(matches!(err, AuthError::UnsupportedAlgorithm(value) if value == "none"));
    }

    #[test]
    fn debug_output_hides_key() {
        let config = TokenConfig::new("super-secret-signing-key-material!!", "HS256", "s", "a")
            .expect("config");
        let rendered = format!("{config:?}");
        assert!(!rendered.contains("super-secret"));
        assert!(config.is_symmetric());
    }

    #[test]
    fn signing_key_is_held_in_zeroizing_storage() {
        let config = TokenConfig::new("zeroized-signing-key-material-0123456789", "HS256", "s", "a")
            .expect("config");
        let stored: &Zeroizing<Vec<u8>> = &config.signing_key;
        assert_eq!(stored.as_slice(), b"zeroized-signing-key-material-0123456789");
        assert_eq!(config.signing_key(), b"zeroized-signing-key-material-0123456789");

        let cloned = config.clone();
        assert_eq!(cloned.signing_key(), config.signing_key());
    }
}
