use std::sync::Arc;

use axum::{
    extract::State,
    http::{
        header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
        HeaderValue, Method,
    },
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use common_auth::{AuthPipeline, ManagerPolicy, TokenCodec, TrainerPolicy, UserDirectory};
use common_crypto::{CredentialVerifier, Pepper};
use common_http_errors::ApiError;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing::error;

use crate::metrics::VocabMetrics;
use crate::session_handlers::{manager_session, trainer_session};
use crate::user_handlers::{login_user, register_user};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub directory: Arc<dyn UserDirectory>,
    pub codec: Arc<TokenCodec>,
    pub verifier: Arc<CredentialVerifier>,
    pub pepper: Pepper,
    pub metrics: Arc<VocabMetrics>,
}

impl AppState {
    pub fn new(
        directory: Arc<dyn UserDirectory>,
        codec: Arc<TokenCodec>,
        verifier: CredentialVerifier,
        pepper: Pepper,
        metrics: Arc<VocabMetrics>,
    ) -> Self {
        Self {
            directory,
            codec,
            verifier: Arc::new(verifier),
            pepper,
            metrics,
        }
    }

    pub fn record_login_metric(&self, outcome: &str) {
        self.metrics.login_attempt(outcome);
    }

    pub fn record_registration_metric(&self, outcome: &str) {
        self.metrics.registration(outcome);
    }
}

async fn health() -> &'static str {
    "ok"
}

async fn metrics_endpoint(State(state): State<AppState>) -> Response {
    match state.metrics.render() {
        Ok(response) => response,
        Err(err) => {
            error!(error = %err, "failed to render metrics");
            ApiError::internal("Unable to render metrics.").into_response()
        }
    }
}

/// Public routes plus the trainer and manager groups, each behind its own pipeline.
pub fn build_router(state: AppState) -> Router {
    let trainer = AuthPipeline::new(
        state.codec.clone(),
        TrainerPolicy::new(state.directory.clone()),
    )
    .protect(Router::new().route("/trainer/session", get(trainer_session)));

    let manager = AuthPipeline::new(
        state.codec.clone(),
        ManagerPolicy::new(state.directory.clone()),
    )
    .protect(Router::new().route("/manager/session", get(manager_session)));

    Router::new()
        .route("/healthz", get(health))
        .route("/metrics", get(metrics_endpoint))
        .route("/register", post(register_user))
        .route("/login", post(login_user))
        .with_state(state)
        .merge(trainer)
        .merge(manager)
}

pub fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(AllowOrigin::list([
            HeaderValue::from_static("http://localhost:3000"),
            HeaderValue::from_static("http://localhost:5173"),
        ]))
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([ACCEPT, CONTENT_TYPE, AUTHORIZATION])
}
