use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::HeaderMap;
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::Router;
use tracing::{debug, error, info};

use crate::codec::TokenCodec;
use crate::error::AuthError;
use crate::extractors::bearer_token;
use crate::mapper::ClaimsMapper;
use crate::policy::AuthorizationPolicy;
use crate::principal::Principal;

/// Steps a request passes through on its way to a protected handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    Start,
    HeaderPresent,
    TokenDecoded,
    ClaimsMapped,
    RoleAuthorized,
    AccountActive,
    Forwarded,
}

/// A request that left the pipeline early: the last stage it reached, the
/// principal name if one was extracted, and the fault.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineFailure {
    pub stage: PipelineStage,
    pub principal: Option<String>,
    pub error: AuthError,
}

impl PipelineFailure {
    fn at(stage: PipelineStage, error: AuthError) -> Self {
        Self {
            stage,
            principal: None,
            error,
        }
    }

    fn for_principal(stage: PipelineStage, principal: &Principal, error: AuthError) -> Self {
        Self {
            stage,
            principal: Some(principal.name.clone()),
            error,
        }
    }
}

/// Token decode, claims mapping, and policy checks in front of one route group.
pub struct AuthPipeline<P> {
    codec: Arc<TokenCodec>,
    policy: Arc<P>,
}

impl<P> Clone for AuthPipeline<P> {
    fn clone(&self) -> Self {
        Self {
            codec: Arc::clone(&self.codec),
            policy: Arc::clone(&self.policy),
        }
    }
}

impl<P: AuthorizationPolicy> AuthPipeline<P> {
    pub fn new(codec: Arc<TokenCodec>, policy: P) -> Self {
        Self {
            codec,
            policy: Arc::new(policy),
        }
    }

    pub fn policy(&self) -> &P {
        &self.policy
    }

    /// Run every stage short of forwarding and return the verified principal.
    pub async fn authenticate(&self, headers: &HeaderMap) -> Result<Principal, PipelineFailure> {
        let token = bearer_token(headers)
            .map_err(|err| PipelineFailure::at(PipelineStage::Start, err))?;

        let claims = self
            .codec
            .decode(&token)
            .map_err(|err| PipelineFailure::at(PipelineStage::HeaderPresent, err))?;

        let principal = ClaimsMapper::to_principal(&claims)
            .map_err(|err| PipelineFailure::at(PipelineStage::TokenDecoded, err))?;

        let decision = self.policy.authorize(&principal);
        if !decision.authorized {
            return Err(PipelineFailure::for_principal(
                PipelineStage::ClaimsMapped,
                &principal,
                self.policy.unauthorized_response_kind(),
            ));
        }

        self.policy.check_active(&principal).await.map_err(|err| {
            PipelineFailure::for_principal(PipelineStage::RoleAuthorized, &principal, err)
        })?;

        info!(
            area = %self.policy.area(),
            stage = ?PipelineStage::AccountActive,
            "{}",
            self.policy.describe_success(&decision)
        );
        Ok(principal)
    }

    /// Middleware entry point; see [`AuthPipeline::protect`].
    pub async fn run(State(pipeline): State<Self>, request: Request, next: Next) -> Response {
        // The body is not `Sync`, so only the parts are borrowed across the await.
        let (mut parts, body) = request.into_parts();
        let outcome = pipeline.authenticate(&parts.headers).await;
        match outcome {
            Ok(principal) => {
                debug!(stage = ?PipelineStage::Forwarded, nickname = %principal.name, "forwarding request");
                ClaimsMapper::attach(&mut parts.extensions, principal);
                next.run(Request::from_parts(parts, body)).await
            }
            Err(failure) => pipeline.reject(failure),
        }
    }

    /// Guard every route currently registered on `router` with this pipeline.
    pub fn protect<S>(self, router: Router<S>) -> Router<S>
    where
        S: Clone + Send + Sync + 'static,
    {
        router.route_layer(middleware::from_fn_with_state(self, Self::run))
    }

    fn reject(&self, failure: PipelineFailure) -> Response {
        let area = self.policy.area();
        let summary = self.policy.describe_failure(failure.principal.as_deref());
        info!(
            area = %area,
            stage = ?failure.stage,
            code = failure.error.code(),
            "{summary}"
        );
        error!(
            area = %area,
            stage = ?failure.stage,
            nickname = failure.principal.as_deref().unwrap_or("-"),
            error = %failure.error,
            "authentication pipeline rejected request"
        );
        failure.error.into_response()
    }
}
