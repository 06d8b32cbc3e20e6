use axum::{http::{StatusCode, HeaderValue}, response::{IntoResponse, Response}, Json};
use serde::{Deserialize, Serialize};

pub const ERROR_CODE_HEADER: &str = "X-Error-Code";

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

/// Structured error response shared by every service error type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    pub status: StatusCode,
    pub code: &'static str,
    pub message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self { status, code, message: message.into() }
    }

    pub fn unauthorized(code: &'static str, message: impl Into<String>) -> Self { Self::new(StatusCode::UNAUTHORIZED, code, message) }
    pub fn forbidden(code: &'static str, message: impl Into<String>) -> Self { Self::new(StatusCode::FORBIDDEN, code, message) }
    pub fn bad_request(code: &'static str, message: impl Into<String>) -> Self { Self::new(StatusCode::BAD_REQUEST, code, message) }
    pub fn internal(message: impl Into<String>) -> Self { Self::new(StatusCode::INTERNAL_SERVER_ERROR, "SERVER_ERROR", message) }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody { code: self.code.to_string(), message: self.message };
        let mut resp = (self.status, Json(body)).into_response();
        if let Ok(val) = HeaderValue::from_str(self.code) {
            resp.headers_mut().insert(ERROR_CODE_HEADER, val);
        }
        resp
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
