use async_trait::async_trait;
use axum::extract::FromRequestParts;
use axum::http::{header::AUTHORIZATION, request::Parts, HeaderMap};

use crate::error::{AuthError, AuthResult};
use crate::mapper::ClaimsMapper;
use crate::principal::Principal;

const BEARER_PREFIX: &str = "bearer ";

/// The principal the auth pipeline attached to this request.
#[derive(Debug, Clone)]
pub struct CurrentPrincipal(pub Principal);

impl CurrentPrincipal {
    pub fn into_inner(self) -> Principal {
        self.0
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for CurrentPrincipal
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        ClaimsMapper::from_request_context(&parts.extensions).map(CurrentPrincipal)
    }
}

/// Pull the bearer token out of the `Authorization` header.
///
/// A missing header, or one using another scheme, is `MissingHeader`; a bearer
/// header whose value is unusable is `MalformedToken`.
pub fn bearer_token(headers: &HeaderMap) -> AuthResult<String> {
    let value = headers.get(AUTHORIZATION).ok_or(AuthError::MissingHeader)?;
    let raw = value
        .to_str()
        .map_err(|_| AuthError::MalformedToken)?
        .trim();

    let has_scheme = raw
        .get(..BEARER_PREFIX.len())
        .is_some_and(|scheme| scheme.eq_ignore_ascii_case(BEARER_PREFIX));
    if !has_scheme {
        return if raw.eq_ignore_ascii_case(BEARER_PREFIX.trim_end()) {
            Err(AuthError::MalformedToken)
        } else {
            Err(AuthError::MissingHeader)
        };
    }

    let token = raw[BEARER_PREFIX.len()..].trim();
    if token.is_empty() {
        return Err(AuthError::MalformedToken);
    }

    Ok(token.to_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(value: &'static str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static(value));
        headers
    }

    #[test]
    fn bearer_token_accepts_valid_token() {
        let token = bearer_token(&headers("Bearer abc.def.ghi")).expect("token");
        assert_eq!(token, "abc.def.ghi");
        let token = bearer_token(&headers("bearer abc.def.ghi")).expect("token");
        assert_eq!(token, "abc.def.ghi");
    }

    #[test]
    fn missing_header_is_reported() {
        let err = bearer_token(&HeaderMap::new()).expect_err("no header");
        assert_eq!(err, AuthError::MissingHeader);
    }

    #[test]
    fn other_scheme_counts_as_missing_bearer() {
        let err = bearer_token(&headers("Basic credentials")).expect_err("wrong scheme");
        assert_eq!(err, AuthError::MissingHeader);
    }

    #[test]
    fn empty_bearer_value_is_malformed() {
        let err = bearer_token(&headers("Bearer    ")).expect_err("empty token");
        assert_eq!(err, AuthError::MalformedToken);
    }
}
