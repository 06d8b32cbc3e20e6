use anyhow::{anyhow, Context, Result};
use common_auth::TokenConfig;
use common_crypto::Pepper;
use std::env;
use std::net::{IpAddr, SocketAddr};

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 8090;
const DEFAULT_ALGORITHM: &str = "HS256";
const DEFAULT_SUBJECT: &str = "vocab-trainer";
const DEFAULT_AUDIENCE: &str = "vocab-trainer-clients";

#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub database_url: String,
    pub bind_addr: SocketAddr,
    pub token: TokenConfig,
    pub pepper: Pepper,
}

pub fn load_config() -> Result<ServiceConfig> {
    config_from(|key| env::var(key).ok())
}

/// Build the service configuration from any key lookup; `load_config` reads the
/// process environment.
pub fn config_from<F>(lookup: F) -> Result<ServiceConfig>
where
    F: Fn(&str) -> Option<String>,
{
    let database_url = required(&lookup, "DATABASE_URL")?;

    let host = optional(&lookup, "HOST").unwrap_or_else(|| DEFAULT_HOST.to_string());
    let ip: IpAddr = host
        .parse()
        .with_context(|| format!("Failed to parse HOST '{host}'"))?;
    let port = match optional(&lookup, "PORT") {
        Some(value) => value
            .parse::<u16>()
            .with_context(|| format!("Failed to parse PORT '{value}'"))?,
        None => DEFAULT_PORT,
    };

    let token = token_config(&lookup)?;

    let pepper = Pepper::new(required(&lookup, "PASSWORD_PEPPER")?)
        .map_err(|err| anyhow!("Invalid PASSWORD_PEPPER: {err}"))?;

    Ok(ServiceConfig {
        database_url,
        bind_addr: SocketAddr::from((ip, port)),
        token,
        pepper,
    })
}

fn token_config<F>(lookup: &F) -> Result<TokenConfig>
where
    F: Fn(&str) -> Option<String>,
{
    let algorithm_name =
        optional(lookup, "JWT_ALGORITHM").unwrap_or_else(|| DEFAULT_ALGORITHM.to_string());
    let subject = optional(lookup, "JWT_SUBJECT").unwrap_or_else(|| DEFAULT_SUBJECT.to_string());
    let audience =
        optional(lookup, "JWT_AUDIENCE").unwrap_or_else(|| DEFAULT_AUDIENCE.to_string());
    let signing_key = normalize_pem(&required(lookup, "JWT_SIGNING_KEY")?);

    let config = TokenConfig::new(signing_key, &algorithm_name, subject, audience)
        .map_err(|err| anyhow!("Invalid token configuration: {err}"))?;

    if config.is_symmetric() {
        return Ok(config);
    }

    let verification_key = optional(lookup, "JWT_VERIFICATION_KEY").ok_or_else(|| {
        anyhow!("JWT_VERIFICATION_KEY must be set for {algorithm_name}")
    })?;
    Ok(config.with_verification_key(normalize_pem(&verification_key)))
}

fn required<F>(lookup: &F, key: &str) -> Result<String>
where
    F: Fn(&str) -> Option<String>,
{
    optional(lookup, key).ok_or_else(|| anyhow!("{key} must be set"))
}

fn optional<F>(lookup: &F, key: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key).and_then(|value| {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}

// Keys passed through a single-line env var usually carry escaped newlines.
fn normalize_pem(value: &str) -> String {
    value.replace("\\n", "\n")
}
