use std::sync::Arc;

use anyhow::Context;
use common_auth::{SystemClock, TokenCodec};
use common_crypto::CredentialVerifier;
use sqlx::PgPool;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;
use vocab_service::app::{build_router, cors_layer, AppState};
use vocab_service::config::load_config;
use vocab_service::directory::PgUserDirectory;
use vocab_service::metrics::VocabMetrics;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = load_config()?;

    let db = PgPool::connect(&config.database_url)
        .await
        .context("Failed to connect to DATABASE_URL")?;
    // Ensure database schema is up to date before serving traffic
    sqlx::migrate!("./migrations").run(&db).await?;

    let codec = TokenCodec::new(config.token, Arc::new(SystemClock))
        .context("Failed to build token codec")?;
    let metrics = VocabMetrics::new()?;

    let state = AppState::new(
        Arc::new(PgUserDirectory::new(db)),
        Arc::new(codec),
        CredentialVerifier::new(),
        config.pepper,
        Arc::new(metrics),
    );
    let app = build_router(state).layer(cors_layer());

    let addr = config.bind_addr;
    info!(%addr, "starting vocab-service");
    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
