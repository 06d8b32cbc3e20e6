use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use common_auth::{AuthError, DirectoryError};
use common_crypto::CryptoError;
use common_http_errors::ApiError;
use thiserror::Error;
use tracing::error;

/// Failures surfaced by the registration and login handlers.
#[derive(Debug, Error)]
pub enum HandlerError {
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error("nickname '{0}' is already registered")]
    NicknameTaken(String),
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<CryptoError> for HandlerError {
    fn from(value: CryptoError) -> Self {
        Self::Auth(value.into())
    }
}

impl From<DirectoryError> for HandlerError {
    fn from(value: DirectoryError) -> Self {
        match value {
            DirectoryError::Conflict(nickname) => Self::NicknameTaken(nickname),
            DirectoryError::Unavailable(detail) => {
                Self::Auth(AuthError::DirectoryUnavailable(detail))
            }
        }
    }
}

impl From<tokio::task::JoinError> for HandlerError {
    fn from(value: tokio::task::JoinError) -> Self {
        Self::Internal(format!("credential task failed: {value}"))
    }
}

impl IntoResponse for HandlerError {
    fn into_response(self) -> Response {
        match self {
            HandlerError::Auth(err) => err.into_response(),
            HandlerError::NicknameTaken(_) => ApiError::new(
                StatusCode::CONFLICT,
                "NICKNAME_TAKEN",
                "That nickname is already registered.",
            )
            .into_response(),
            HandlerError::Internal(detail) => {
                error!(detail = %detail, "request failed");
                ApiError::internal("Unexpected server error.").into_response()
            }
        }
    }
}
