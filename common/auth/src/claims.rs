use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{AuthError, AuthResult};

/// Claims as decoded from a verified token, before mapping to a [`Principal`].
///
/// [`Principal`]: crate::Principal
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RawClaims {
    #[serde(default)]
    pub nickname: Option<String>,
    #[serde(default)]
    pub scope: Option<String>,
    pub sub: String,
    pub aud: Audience,
    pub exp: i64,
}

impl RawClaims {
    pub fn expires_at(&self) -> AuthResult<DateTime<Utc>> {
        Utc.timestamp_opt(self.exp, 0)
            .single()
            .ok_or(AuthError::MalformedToken)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum Audience {
    Single(String),
    Many(Vec<String>),
}

impl Audience {
    pub fn contains(&self, audience: &str) -> bool {
        match self {
            Audience::Single(value) => value == audience,
            Audience::Many(values) => values.iter().any(|value| value == audience),
        }
    }
}

/// Wire shape of the payload segment at issuance.
#[derive(Debug, Serialize)]
pub(crate) struct TokenClaims<'a> {
    pub nickname: &'a str,
    pub scope: String,
    pub sub: &'a str,
    pub aud: &'a str,
    pub exp: i64,
}
