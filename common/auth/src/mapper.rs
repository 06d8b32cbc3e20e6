use axum::http::Extensions;

use crate::claims::RawClaims;
use crate::error::{AuthError, AuthResult};
use crate::principal::{Principal, Role, SCOPE_PREFIX};

/// Marker stored in request extensions; only the pipeline can create one.
#[derive(Debug, Clone)]
pub(crate) struct AttachedPrincipal(Principal);

/// Converts verified claims into a typed [`Principal`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ClaimsMapper;

impl ClaimsMapper {
    pub fn to_principal(claims: &RawClaims) -> AuthResult<Principal> {
        let name = claims
            .nickname
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .ok_or(AuthError::MissingClaim("nickname"))?;

        let scope = claims
            .scope
            .as_deref()
            .filter(|value| !value.is_empty())
            .ok_or(AuthError::MissingClaim("scope"))?;

        let role = scope
            .strip_prefix(SCOPE_PREFIX)
            .ok_or_else(|| AuthError::InvalidScope(scope.to_string()))?
            .parse::<Role>()
            .map_err(|_| AuthError::InvalidScope(scope.to_string()))?;

        Ok(Principal::new(name, role))
    }

    /// Principal attached by the auth pipeline for this request.
    pub fn from_request_context(extensions: &Extensions) -> AuthResult<Principal> {
        extensions
            .get::<AttachedPrincipal>()
            .map(|attached| attached.0.clone())
            .ok_or(AuthError::PrincipalMissing)
    }

    pub(crate) fn attach(extensions: &mut Extensions, principal: Principal) {
        extensions.insert(AttachedPrincipal(principal));
    }
}
