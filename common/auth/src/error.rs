use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use common_crypto::CryptoError;
use common_http_errors::ApiError;
use thiserror::Error;

use crate::policy::ProtectedArea;

pub type AuthResult<T> = Result<T, AuthError>;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("authorization header missing")]
    MissingHeader,
    #[error("bearer token is malformed")]
    MalformedToken,
    #[error("token signature is invalid")]
    InvalidSignature,
    #[error("token has expired")]
    ExpiredToken,
    #[error("token claim '{0}' does not match this service")]
    TokenRejected(&'static str),
    #[error("token is missing claim '{0}'")]
    MissingClaim(&'static str),
    #[error("token scope '{0}' is not recognised")]
    InvalidScope(String),
    #[error("insufficient role for the {0} area")]
    InsufficientRole(ProtectedArea),
    #[error("account not found")]
    AccountNotFound,
    #[error("account is not an active manager")]
    InactiveAccount,
    #[error("user directory unavailable: {0}")]
    DirectoryUnavailable(String),
    #[error("invalid credentials")]
    CredentialsInvalid,
    #[error("password must be at least {min} characters")]
    PasswordTooShort { min: usize },
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("no authenticated principal attached to the request")]
    PrincipalMissing,
    #[error("signing algorithm '{0}' is not allowed")]
    UnsupportedAlgorithm(String),
    #[error("HMAC signing key must be at least {min} bytes")]
    WeakSigningKey { min: usize },
    #[error("failed to parse key: {0}")]
    KeyParse(String),
    #[error("failed to sign token: {0}")]
    SigningFailed(String),
    #[error("internal error: {0}")]
    Internal(String),
}

impl AuthError {
    pub fn status(&self) -> StatusCode {
        match self {
            AuthError::MissingHeader
            | AuthError::MalformedToken
            | AuthError::InvalidSignature
            | AuthError::ExpiredToken
            | AuthError::TokenRejected(_)
            | AuthError::MissingClaim(_)
            | AuthError::InvalidScope(_)
            | AuthError::AccountNotFound
            | AuthError::DirectoryUnavailable(_)
            | AuthError::CredentialsInvalid
            | AuthError::PrincipalMissing => StatusCode::UNAUTHORIZED,
            AuthError::InsufficientRole(_) | AuthError::InactiveAccount => StatusCode::FORBIDDEN,
            AuthError::PasswordTooShort { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            AuthError::InvalidArgument(_) => StatusCode::BAD_REQUEST,
            AuthError::UnsupportedAlgorithm(_)
            | AuthError::WeakSigningKey { .. }
            | AuthError::KeyParse(_)
            | AuthError::SigningFailed(_)
            | AuthError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Stable machine-readable code, also sent as `X-Error-Code`.
    pub fn code(&self) -> &'static str {
        match self {
            AuthError::MissingHeader => "AUTH_HEADER",
            AuthError::MalformedToken => "AUTH_TOKEN_MALFORMED",
            AuthError::InvalidSignature => "AUTH_TOKEN_SIGNATURE",
            AuthError::ExpiredToken => "AUTH_TOKEN_EXPIRED",
            AuthError::TokenRejected(_) => "AUTH_TOKEN_REJECTED",
            AuthError::MissingClaim(_) | AuthError::InvalidScope(_) => "AUTH_CLAIMS",
            AuthError::InsufficientRole(_) => "AUTH_ROLE",
            AuthError::AccountNotFound => "AUTH_ACCOUNT_NOT_FOUND",
            AuthError::InactiveAccount => "AUTH_ACCOUNT_INACTIVE",
            AuthError::DirectoryUnavailable(_) => "AUTH_UNAVAILABLE",
            AuthError::CredentialsInvalid => "INVALID_CREDENTIALS",
            AuthError::PasswordTooShort { .. } => "PASSWORD_TOO_SHORT",
            AuthError::InvalidArgument(_) => "INVALID_ARGUMENT",
            AuthError::PrincipalMissing => "AUTH_PRINCIPAL",
            AuthError::UnsupportedAlgorithm(_)
            | AuthError::WeakSigningKey { .. }
            | AuthError::KeyParse(_) => "AUTH_CONFIG",
            AuthError::SigningFailed(_) | AuthError::Internal(_) => "SERVER_ERROR",
        }
    }

    /// Client-facing message; never carries directory or key details.
    pub fn public_message(&self) -> String {
        match self {
            AuthError::MissingHeader => "A bearer token is required.".to_string(),
            AuthError::MalformedToken => "The bearer token is malformed.".to_string(),
            AuthError::InvalidSignature => "The bearer token could not be verified.".to_string(),
            AuthError::ExpiredToken => "The session has expired. Please log in again.".to_string(),
            AuthError::TokenRejected(_) => "The bearer token was not issued for this service.".to_string(),
            AuthError::MissingClaim(claim) => format!("The bearer token is missing the '{claim}' claim."),
            AuthError::InvalidScope(_) => "The bearer token scope is not recognised.".to_string(),
            AuthError::InsufficientRole(ProtectedArea::Manager) => {
                "Manager privileges are required for this resource.".to_string()
            }
            AuthError::InsufficientRole(ProtectedArea::Trainer) => {
                "A trainer account is required for this resource.".to_string()
            }
            AuthError::AccountNotFound => "The account could not be found.".to_string(),
            AuthError::InactiveAccount => "The manager account is not active.".to_string(),
            AuthError::DirectoryUnavailable(_) => "Unable to verify the account.".to_string(),
            AuthError::CredentialsInvalid => "Invalid credentials. Please try again.".to_string(),
            AuthError::PasswordTooShort { .. } | AuthError::InvalidArgument(_) => self.to_string(),
            AuthError::PrincipalMissing => "Authentication is required.".to_string(),
            AuthError::UnsupportedAlgorithm(_)
            | AuthError::WeakSigningKey { .. }
            | AuthError::KeyParse(_)
            | AuthError::SigningFailed(_)
            | AuthError::Internal(_) => "Unexpected server error.".to_string(),
        }
    }
}

impl From<jsonwebtoken::errors::Error> for AuthError {
    fn from(value: jsonwebtoken::errors::Error) -> Self {
        use jsonwebtoken::errors::ErrorKind;

        match value.kind() {
            ErrorKind::InvalidSignature
            | ErrorKind::InvalidAlgorithm
            | ErrorKind::InvalidAlgorithmName
            | ErrorKind::InvalidKeyFormat => Self::InvalidSignature,
            ErrorKind::ExpiredSignature => Self::ExpiredToken,
            ErrorKind::InvalidAudience => Self::TokenRejected("aud"),
            ErrorKind::InvalidSubject => Self::TokenRejected("sub"),
            ErrorKind::InvalidIssuer => Self::TokenRejected("iss"),
            ErrorKind::ImmatureSignature => Self::TokenRejected("nbf"),
            ErrorKind::MissingRequiredClaim(claim) => Self::MissingClaim(static_claim_name(claim)),
            _ => Self::MalformedToken,
        }
    }
}

impl From<CryptoError> for AuthError {
    fn from(value: CryptoError) -> Self {
        match value {
            CryptoError::PasswordTooShort { min } => Self::PasswordTooShort { min },
            CryptoError::DisallowedCharacters => {
                Self::InvalidArgument("password contains disallowed characters".to_string())
            }
            other => Self::Internal(other.to_string()),
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(value: AuthError) -> Self {
        ApiError::new(value.status(), value.code(), value.public_message())
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        ApiError::from(self).into_response()
    }
}

fn static_claim_name(claim: &str) -> &'static str {
    match claim {
        "exp" => "exp",
        "aud" => "aud",
        "sub" => "sub",
        "iss" => "iss",
        "nbf" => "nbf",
        _ => "unknown",
    }
}
