use std::io;
use std::sync::{Arc, Mutex};

use axum::body::Body;
use axum::http::{header::AUTHORIZATION, HeaderMap, HeaderValue, Request, StatusCode};
use axum::routing::get;
use axum::{Json, Router};
use common_auth::{
    AuthError, AuthPipeline, CurrentPrincipal, FixedClock, InMemoryUserDirectory,
    ManagerPolicy, PipelineStage, Principal, Role, TokenCodec, TokenConfig, TrainerPolicy,
    UserDirectory, TOKEN_TTL_SECONDS,
};
use common_http_errors::{ErrorBody, ERROR_CODE_HEADER};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

const T0: i64 = 1_700_000_000;

fn codec_at(seconds: i64) -> Arc<TokenCodec> {
    let config = TokenConfig::new(
        "pipeline-signing-secret-0123456789abcdef",
        "HS256",
        "vocab-trainer",
        "vocab-clients",
    )
    .expect("config");
    let clock = FixedClock::at_timestamp(seconds).expect("clock");
    Arc::new(TokenCodec::new(config, Arc::new(clock)).expect("codec"))
}

fn directory() -> Arc<InMemoryUserDirectory> {
    Arc::new(
        InMemoryUserDirectory::new()
            .with_user("mats", Role::User, true)
            .with_user("anna", Role::Manager, true)
            .with_user("olle", Role::Manager, false),
    )
}

async fn whoami(CurrentPrincipal(principal): CurrentPrincipal) -> Json<Value> {
    Json(json!({
        "nickname": principal.name,
        "role": principal.role.as_str(),
        "stage": "FORWARDED"
    }))
}

fn app(codec: Arc<TokenCodec>, directory: Arc<InMemoryUserDirectory>) -> Router {
    let shared: Arc<dyn UserDirectory> = directory;

    let trainer = AuthPipeline::new(codec.clone(), TrainerPolicy::new(shared.clone()))
        .protect(Router::new().route("/trainer/session", get(whoami)));
    let manager = AuthPipeline::new(codec, ManagerPolicy::new(shared))
        .protect(Router::new().route("/manager/session", get(whoami)));

    Router::new()
        .merge(trainer)
        .merge(manager)
        .route("/unguarded", get(whoami))
}

fn token_for(codec: &TokenCodec, name: &str, role: Role) -> String {
    codec.issue(&Principal::new(name, role)).expect("issue").token
}

async fn call(app: Router, uri: &str, authorization: Option<&str>) -> (StatusCode, HeaderMap, Value) {
    let mut builder = Request::builder().uri(uri);
    if let Some(value) = authorization {
        builder = builder.header(AUTHORIZATION, value);
    }
    let response = app
        .oneshot(builder.body(Body::empty()).expect("request"))
        .await
        .expect("router is infallible");

    let status = response.status();
    let headers = response.headers().clone();
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("body")
        .to_bytes();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("json body")
    };
    (status, headers, body)
}

fn error_code(headers: &HeaderMap, body: &Value) -> String {
    let parsed: ErrorBody = serde_json::from_value(body.clone()).expect("error body");
    assert_eq!(
        headers.get(ERROR_CODE_HEADER),
        Some(&HeaderValue::from_str(&parsed.code).expect("header value"))
    );
    parsed.code
}

#[tokio::test]
async fn trainee_token_reaches_trainer_handler() {
    let codec = codec_at(T0);
    let token = token_for(&codec, "mats", Role::User);

    let (status, _, body) = call(
        app(codec, directory()),
        "/trainer/session",
        Some(&format!("Bearer {token}")),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["nickname"], "mats");
    assert_eq!(body["role"], "user");
    assert_eq!(body["stage"], "FORWARDED");
}

#[tokio::test]
async fn manager_token_reaches_both_areas() {
    let codec = codec_at(T0);
    let token = token_for(&codec, "anna", Role::Manager);
    let header = format!("bearer {token}");

    for uri in ["/trainer/session", "/manager/session"] {
        let (status, _, body) = call(app(codec.clone(), directory()), uri, Some(&header)).await;
        assert_eq!(status, StatusCode::OK, "{uri}");
        assert_eq!(body["role"], "manager");
    }
}

#[tokio::test]
async fn trainee_token_on_manager_route_is_forbidden() {
    let codec = codec_at(T0);
    let token = token_for(&codec, "mats", Role::User);
    let directory = directory();

    let (status, headers, body) = call(
        app(codec, directory.clone()),
        "/manager/session",
        Some(&format!("Bearer {token}")),
    )
    .await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(error_code(&headers, &body), "AUTH_ROLE");
    // Role is decided from the token alone.
    assert_eq!(directory.lookup_count(), 0);
}

#[tokio::test]
async fn inactive_manager_is_forbidden() {
    let codec = codec_at(T0);
    let token = token_for(&codec, "olle", Role::Manager);

    let (status, headers, body) = call(
        app(codec, directory()),
        "/manager/session",
        Some(&format!("Bearer {token}")),
    )
    .await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(error_code(&headers, &body), "AUTH_ACCOUNT_INACTIVE");
}

#[tokio::test]
async fn deleted_trainee_is_unauthorized() {
    let codec = codec_at(T0);
    let token = token_for(&codec, "ghost", Role::User);

    let (status, headers, body) = call(
        app(codec, directory()),
        "/trainer/session",
        Some(&format!("Bearer {token}")),
    )
    .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(error_code(&headers, &body), "AUTH_ACCOUNT_NOT_FOUND");
}

#[tokio::test]
async fn malformed_token_never_touches_the_directory() {
    let codec = codec_at(T0);
    let directory = directory();

    let (status, headers, body) = call(
        app(codec, directory.clone()),
        "/trainer/session",
        Some("Bearer not-a-jwt"),
    )
    .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(error_code(&headers, &body), "AUTH_TOKEN_MALFORMED");
    assert_eq!(directory.lookup_count(), 0);
}

#[tokio::test]
async fn missing_or_foreign_scheme_header_is_unauthorized() {
    let codec = codec_at(T0);
    for header in [None, Some("Basic bWF0czpzZWNyZXQ=")] {
        let (status, headers, body) =
            call(app(codec.clone(), directory()), "/trainer/session", header).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(error_code(&headers, &body), "AUTH_HEADER");
    }
}

#[tokio::test]
async fn expired_token_is_unauthorized() {
    let token = token_for(&codec_at(T0), "mats", Role::User);
    let later = codec_at(T0 + TOKEN_TTL_SECONDS + 1);

    let (status, headers, body) = call(
        app(later, directory()),
        "/trainer/session",
        Some(&format!("Bearer {token}")),
    )
    .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(error_code(&headers, &body), "AUTH_TOKEN_EXPIRED");
}

#[tokio::test]
async fn directory_outage_rejects_without_leaking_detail() {
    let codec = codec_at(T0);
    let token = token_for(&codec, "mats", Role::User);
    let directory = directory();
    directory.set_unavailable(true);

    let (status, headers, body) = call(
        app(codec, directory),
        "/trainer/session",
        Some(&format!("Bearer {token}")),
    )
    .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(error_code(&headers, &body), "AUTH_UNAVAILABLE");
    assert!(!body["message"]
        .as_str()
        .expect("message")
        .contains("in-memory"));
}

#[tokio::test]
async fn handler_outside_pipeline_has_no_principal() {
    let codec = codec_at(T0);
    let token = token_for(&codec, "mats", Role::User);

    let (status, headers, body) = call(
        app(codec, directory()),
        "/unguarded",
        Some(&format!("Bearer {token}")),
    )
    .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(error_code(&headers, &body), "AUTH_PRINCIPAL");
}

#[tokio::test]
async fn authenticate_reports_the_last_stage_reached() {
    let codec = codec_at(T0);
    let directory = directory();
    let shared: Arc<dyn UserDirectory> = directory.clone();
    let manager = AuthPipeline::new(codec.clone(), ManagerPolicy::new(shared));

    let failure = manager
        .authenticate(&HeaderMap::new())
        .await
        .expect_err("no header");
    assert_eq!(failure.stage, PipelineStage::Start);
    assert_eq!(failure.error, AuthError::MissingHeader);
    assert_eq!(failure.principal, None);

    let mut headers = HeaderMap::new();
    headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer a.b.c"));
    let failure = manager.authenticate(&headers).await.expect_err("garbage");
    assert_eq!(failure.stage, PipelineStage::HeaderPresent);

    let token = token_for(&codec, "mats", Role::User);
    headers.insert(
        AUTHORIZATION,
        HeaderValue::from_str(&format!("Bearer {token}")).expect("header"),
    );
    let failure = manager.authenticate(&headers).await.expect_err("wrong role");
    assert_eq!(failure.stage, PipelineStage::ClaimsMapped);
    assert_eq!(failure.principal.as_deref(), Some("mats"));
    assert!(matches!(failure.error, AuthError::InsufficientRole(_)));

    let token = token_for(&codec, "olle", Role::Manager);
    headers.insert(
        AUTHORIZATION,
        HeaderValue::from_str(&format!("Bearer {token}")).expect("header"),
    );
    let failure = manager.authenticate(&headers).await.expect_err("inactive");
    assert_eq!(failure.stage, PipelineStage::RoleAuthorized);
    assert_eq!(failure.error, AuthError::InactiveAccount);

    let token = token_for(&codec, "anna", Role::Manager);
    headers.insert(
        AUTHORIZATION,
        HeaderValue::from_str(&format!("Bearer {token}")).expect("header"),
    );
    let principal = manager.authenticate(&headers).await.expect("granted");
    assert_eq!(principal, Principal::new("anna", Role::Manager));
    assert_eq!(directory.lookup_count(), 2);
}

#[derive(Clone, Default)]
struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

impl io::Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().expect("log buffer").extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl CapturedLogs {
    fn pipeline_lines(&self) -> Vec<String> {
        let bytes = self.0.lock().expect("log buffer").clone();
        String::from_utf8_lossy(&bytes)
            .lines()
            .filter(|line| line.contains("common_auth::pipeline"))
            .map(str::to_string)
            .collect()
    }
}

async fn call_capturing_logs(
    app: Router,
    uri: &str,
    authorization: Option<&str>,
) -> (StatusCode, Vec<String>) {
    let logs = CapturedLogs::default();
    let writer = logs.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(move || writer.clone())
        .with_ansi(false)
        .with_max_level(tracing::Level::INFO)
        .finish();
    let _guard = tracing::subscriber::set_default(subscriber);

    let (status, _, _) = call(app, uri, authorization).await;
    (status, logs.pipeline_lines())
}

#[tokio::test]
async fn rejection_with_known_principal_logs_summary_and_fault() {
    let codec = codec_at(T0);
    let token = token_for(&codec, "mats", Role::User);

    let (status, lines) = call_capturing_logs(
        app(codec, directory()),
        "/manager/session",
        Some(&format!("Bearer {token}")),
    )
    .await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(lines.len(), 2, "{lines:#?}");
    assert!(lines[0].contains("INFO"), "{}", lines[0]);
    assert!(lines[0].contains("manager area access denied for 'mats'"));
    assert!(lines[1].contains("ERROR"), "{}", lines[1]);
    assert!(lines[1].contains("authentication pipeline rejected request"));
    assert!(lines[1].contains("mats"));
}

#[tokio::test]
async fn rejection_before_identification_logs_distinct_summary() {
    let codec = codec_at(T0);

    let (status, lines) = call_capturing_logs(
        app(codec, directory()),
        "/trainer/session",
        Some("Bearer not-a-jwt"),
    )
    .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(lines.len(), 2, "{lines:#?}");
    assert!(lines[0].contains("INFO"), "{}", lines[0]);
    assert!(lines[0]
        .contains("trainer area access denied before a principal could be identified"));
    assert!(lines[1].contains("ERROR"), "{}", lines[1]);
    assert!(lines[1].contains("authentication pipeline rejected request"));
    assert!(lines.iter().all(|line| !line.contains("access denied for '")));
}

#[tokio::test]
async fn granted_request_logs_no_rejection() {
    let codec = codec_at(T0);
    let token = token_for(&codec, "mats", Role::User);

    let (status, lines) = call_capturing_logs(
        app(codec, directory()),
        "/trainer/session",
        Some(&format!("Bearer {token}")),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert!(lines.iter().all(|line| !line.contains("ERROR")), "{lines:#?}");
    assert!(lines
        .iter()
        .any(|line| line.contains("user 'mats' granted access to the trainer area")));
}
