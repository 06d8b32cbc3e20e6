use axum::{extract::State, http::StatusCode, Json};
use chrono::SecondsFormat;
use common_auth::{AuthError, NewAccount, Principal, Role, StoredCredentials};
use common_crypto::{ensure_sanitized, CredentialVector, Salt};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::HandlerError;
use crate::AppState;

pub const MAX_NICKNAME_LENGTH: usize = 64;

#[derive(Deserialize)]
pub struct CredentialsRequest {
    pub nickname: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RegisteredUser {
    pub nickname: String,
    pub role: Role,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    pub token_type: String,
    pub expires_at: String,
    pub nickname: String,
    pub role: Role,
}

pub async fn register_user(
    State(state): State<AppState>,
    Json(request): Json<CredentialsRequest>,
) -> Result<(StatusCode, Json<RegisteredUser>), HandlerError> {
    let CredentialsRequest { nickname, password } = request;
    let nickname = match normalize_nickname(&nickname) {
        Ok(nickname) => nickname,
        Err(err) => {
            state.record_registration_metric("rejected");
            return Err(err.into());
        }
    };

    // Skip the expensive hash when the name is obviously taken; the insert still
    // enforces uniqueness.
    if state.directory.exists(&nickname).await? {
        state.record_registration_metric("conflict");
        return Err(HandlerError::NicknameTaken(nickname));
    }

    let salt = Salt::generate();
    let vector = CredentialVector::new(salt.clone(), state.pepper.clone());
    let verifier = state.verifier.clone();
    let hashed = tokio::task::spawn_blocking(move || verifier.hash(&password, &vector)).await?;
    let hash = match hashed {
        Ok(hash) => hash,
        Err(err) => {
            state.record_registration_metric("rejected");
            return Err(err.into());
        }
    };

    let account = NewAccount {
        nickname: nickname.clone(),
        credentials: StoredCredentials {
            hash,
            salt,
            role: Role::User,
        },
    };
    if let Err(err) = state.directory.create_user(account).await {
        let err = HandlerError::from(err);
        let outcome = match err {
            HandlerError::NicknameTaken(_) => "conflict",
            _ => "directory_error",
        };
        state.record_registration_metric(outcome);
        return Err(err);
    }

    state.record_registration_metric("success");
    info!(nickname = %nickname, "registered new user");

    Ok((
        StatusCode::CREATED,
        Json(RegisteredUser {
            nickname,
            role: Role::User,
        }),
    ))
}

pub async fn login_user(
    State(state): State<AppState>,
    Json(request): Json<CredentialsRequest>,
) -> Result<Json<LoginResponse>, HandlerError> {
    let CredentialsRequest { nickname, password } = request;
    let Ok(nickname) = normalize_nickname(&nickname) else {
        state.record_login_metric("invalid_credentials");
        return Err(AuthError::CredentialsInvalid.into());
    };

    let stored = match state.directory.credentials_for(&nickname).await {
        Ok(Some(stored)) => stored,
        Ok(None) => {
            state.record_login_metric("invalid_credentials");
            warn!(nickname = %nickname, "login for unknown user");
            return Err(AuthError::CredentialsInvalid.into());
        }
        Err(err) => {
            state.record_login_metric("directory_error");
            return Err(err.into());
        }
    };

    let StoredCredentials { hash, salt, role } = stored;
    let vector = CredentialVector::new(salt, state.pepper.clone());
    let verifier = state.verifier.clone();
    let valid =
        tokio::task::spawn_blocking(move || verifier.verify(&password, &hash, &vector)).await?;
    if !valid {
        state.record_login_metric("invalid_credentials");
        warn!(nickname = %nickname, "login with wrong password");
        return Err(AuthError::CredentialsInvalid.into());
    }

    let principal = Principal::new(nickname, role);
    let issued = state.codec.issue(&principal)?;

    state.record_login_metric("success");
    info!(nickname = %principal.name, role = %principal.role, "issued session token");

    Ok(Json(LoginResponse {
        token: issued.token,
        token_type: "Bearer".to_string(),
        expires_at: issued
            .expires_at
            .to_rfc3339_opts(SecondsFormat::Secs, true),
        nickname: principal.name,
        role: principal.role,
    }))
}

/// Trim and validate a nickname from a request body.
pub fn normalize_nickname(raw: &str) -> Result<String, AuthError> {
    let nickname = raw.trim();
    if nickname.is_empty() {
        return Err(AuthError::InvalidArgument("nickname must not be empty".into()));
    }
    if nickname.chars().count() > MAX_NICKNAME_LENGTH {
        return Err(AuthError::InvalidArgument(format!(
            "nickname must be at most {MAX_NICKNAME_LENGTH} characters"
        )));
    }
    if nickname.chars().any(char::is_control) {
        return Err(AuthError::InvalidArgument(
            "nickname contains control characters".into(),
        ));
    }
    ensure_sanitized(nickname)
        .map_err(|_| AuthError::InvalidArgument("nickname contains disallowed characters".into()))?;
    Ok(nickname.to_string())
}
