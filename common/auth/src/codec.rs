use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{
    decode, decode_header, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use crate::claims::{RawClaims, TokenClaims};
use crate::clock::Clock;
use crate::config::{TokenConfig, MIN_HMAC_KEY_LENGTH};
use crate::error::{AuthError, AuthResult};
use crate::principal::Principal;

/// Lifetime of every issued session token.
pub const TOKEN_TTL_SECONDS: i64 = 2 * 60 * 60;

pub const MAX_HEADER_SEGMENT: usize = 512;
pub const MAX_PAYLOAD_SEGMENT: usize = 4096;
pub const MAX_SIGNATURE_SEGMENT: usize = 1024;

const MAX_TOKEN_LENGTH: usize = MAX_HEADER_SEGMENT + MAX_PAYLOAD_SEGMENT + MAX_SIGNATURE_SEGMENT + 2;

static TOKEN_SHAPE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([A-Za-z0-9_-]+)\.([A-Za-z0-9_-]+)\.([A-Za-z0-9_-]+)$")
        .expect("token shape pattern is valid")
});

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// Issues and validates signed session tokens.
pub struct TokenCodec {
    config: TokenConfig,
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    clock: Arc<dyn Clock>,
}

impl TokenCodec {
    /// Builds signing and verification keys up front so key problems surface at
    /// start-up rather than on the first request.
    pub fn new(config: TokenConfig, clock: Arc<dyn Clock>) -> AuthResult<Self> {
        let (encoding, decoding) = build_keys(&config)?;

        let mut validation = Validation::new(config.algorithm());
        // Expiry is checked against the injected clock in `decode`.
        validation.validate_exp = false;
        validation.leeway = 0;
        validation.set_audience(&[config.audience()]);
        validation.sub = Some(config.subject().to_string());
        validation.set_required_spec_claims(&["exp", "aud", "sub"]);

        Ok(Self {
            config,
            encoding,
            decoding,
            validation,
            clock,
        })
    }

    pub fn config(&self) -> &TokenConfig {
        &self.config
    }

    pub fn ttl() -> Duration {
        Duration::seconds(TOKEN_TTL_SECONDS)
    }

    pub fn issue(&self, principal: &Principal) -> AuthResult<IssuedToken> {
        let expires_at = self.clock.now() + Self::ttl();
        let claims = TokenClaims {
            nickname: &principal.name,
            scope: principal.role.scope(),
            sub: self.config.subject(),
            aud: self.config.audience(),
            exp: expires_at.timestamp(),
        };

        let header = Header::new(self.config.algorithm());
        let token = encode(&header, &claims, &self.encoding)
            .map_err(|err| AuthError::SigningFailed(err.to_string()))?;

        Ok(IssuedToken { token, expires_at })
    }

    pub fn decode(&self, token: &str) -> AuthResult<RawClaims> {
        check_structure(token)?;
        decode_header(token)?;

        let data = decode::<RawClaims>(token, &self.decoding, &self.validation)
            .map_err(signature_error)?;
        let claims = data.claims;

        if claims.exp <= self.clock.now().timestamp() {
            return Err(AuthError::ExpiredToken);
        }

        debug!(nickname = claims.nickname.as_deref().unwrap_or("-"), "verified session token");
        Ok(claims)
    }
}

/// Cheap shape check run before any cryptographic work.
pub fn check_structure(token: &str) -> AuthResult<()> {
    if token.is_empty() || token.len() > MAX_TOKEN_LENGTH {
        return Err(AuthError::MalformedToken);
    }

    let captures = TOKEN_SHAPE
        .captures(token)
        .ok_or(AuthError::MalformedToken)?;

    let limits = [MAX_HEADER_SEGMENT, MAX_PAYLOAD_SEGMENT, MAX_SIGNATURE_SEGMENT];
    for (index, limit) in limits.into_iter().enumerate() {
        let segment = captures
            .get(index + 1)
            .ok_or(AuthError::MalformedToken)?;
        if segment.as_str().len() > limit {
            return Err(AuthError::MalformedToken);
        }
    }

    Ok(())
}

// Runs after the header decoded cleanly, so bytes that fail to decode or verify
// belong to the signature segment.
fn signature_error(err: jsonwebtoken::errors::Error) -> AuthError {
    match err.kind() {
        ErrorKind::Base64(_) | ErrorKind::Crypto(_) => AuthError::InvalidSignature,
        _ => err.into(),
    }
}

fn build_keys(config: &TokenConfig) -> AuthResult<(EncodingKey, DecodingKey)> {
    let signing_key = config.signing_key();

    match config.algorithm() {
        Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512 => {
            if signing_key.len() < MIN_HMAC_KEY_LENGTH {
                return Err(AuthError::WeakSigningKey {
                    min: MIN_HMAC_KEY_LENGTH,
                });
            }
            Ok((
                EncodingKey::from_secret(signing_key),
                DecodingKey::from_secret(signing_key),
            ))
        }
        Algorithm::RS256 | Algorithm::RS384 | Algorithm::RS512 => {
            let public = require_verification_key(config)?;
            let encoding = EncodingKey::from_rsa_pem(signing_key)
                .map_err(|err| AuthError::KeyParse(format!("RSA private key: {err}")))?;
            let decoding = DecodingKey::from_rsa_pem(public)
                .map_err(|err| AuthError::KeyParse(format!("RSA public key: {err}")))?;
            Ok((encoding, decoding))
        }
        Algorithm::ES256 | Algorithm::ES384 => {
            let public = require_verification_key(config)?;
            let encoding = EncodingKey::from_ec_pem(signing_key)
                .map_err(|err| AuthError::KeyParse(format!("EC private key: {err}")))?;
            let decoding = DecodingKey::from_ec_pem(public)
                .map_err(|err| AuthError::KeyParse(format!("EC public key: {err}")))?;
            Ok((encoding, decoding))
        }
        other => Err(AuthError::UnsupportedAlgorithm(format!("{other:?}"))),
    }
}

fn require_verification_key(config: &TokenConfig) -> AuthResult<&[u8]> {
    config.verification_key().ok_or_else(|| {
        AuthError::KeyParse(format!(
            "{:?} requires a public verification key",
            config.algorithm()
        ))
    })
}
