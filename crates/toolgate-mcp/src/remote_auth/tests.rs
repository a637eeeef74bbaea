// crates/toolgate-mcp/src/remote_auth/tests.rs
// ============================================================================
// Module: Remote Verification Tests
// Description: Unit tests for the remote credential verifier.
// Purpose: Validate header injection and status-to-error mapping.
// Dependencies: toolgate-mcp, axum
// ============================================================================

//! ## Overview
//! Exercises the remote verifier against in-memory HTTP servers to validate
//! bearer forwarding, request id propagation, and fail-closed mappings.

// ============================================================================
// SECTION: Lint Configuration
// ============================================================================

#![allow(
    clippy::expect_used,
    clippy::unwrap_used,
    clippy::panic,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only assertions use unwrap/expect for clarity."
)]

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;
use std::sync::Mutex;
use std::time::Duration;
use std::time::Instant;

use axum::Json;
use axum::Router;
use axum::body::Body;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::http::StatusCode;
use axum::http::header::AUTHORIZATION;
use axum::http::header::LOCATION;
use axum::routing::post;
use serde_json::Value;
use serde_json::json;
use tokio::sync::oneshot;

use super::RemoteTokenVerifier;
use super::sanitize_header_value;
use crate::auth::TokenVerifier;
use crate::auth::VerifyError;

// ============================================================================
// SECTION: Fixtures
// ============================================================================

#[derive(Default)]
struct HeaderCapture {
    authorization: Option<String>,
    request_id: Option<String>,
}

struct StubState {
    status: StatusCode,
    body: Value,
    capture: Arc<Mutex<HeaderCapture>>,
}

async fn verify_handler(
    State(state): State<Arc<StubState>>,
    headers: HeaderMap,
) -> (StatusCode, Json<Value>) {
    let mut guard = state.capture.lock().expect("capture lock");
    guard.authorization =
        headers.get(AUTHORIZATION).and_then(|value| value.to_str().ok()).map(str::to_string);
    guard.request_id =
        headers.get("x-request-id").and_then(|value| value.to_str().ok()).map(str::to_string);
    (state.status, Json(state.body.clone()))
}

async fn spawn_verifier(
    status: StatusCode,
    body: Value,
) -> (String, Arc<Mutex<HeaderCapture>>, oneshot::Sender<()>) {
    let capture = Arc::new(Mutex::new(HeaderCapture::default()));
    let state = Arc::new(StubState {
        status,
        body,
        capture: Arc::clone(&capture),
    });
    let app = Router::new().route("/auth/verify", post(verify_handler)).with_state(state);
    let (base, shutdown_tx) = serve_router(app).await;
    (format!("{base}/auth/verify"), capture, shutdown_tx)
}

async fn serve_router(app: Router) -> (String, oneshot::Sender<()>) {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    let (shutdown_tx, shutdown_rx) = oneshot::channel();
    tokio::spawn(async move {
        let _ = axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown_rx.await;
            })
            .await;
    });
    (format!("http://{addr}"), shutdown_tx)
}

async fn endless_body() -> Body {
    let chunks = futures::stream::repeat_with(|| Ok::<_, std::io::Error>(vec![b' '; 64 * 1024]));
    Body::from_stream(chunks)
}

fn verifier(url: String) -> RemoteTokenVerifier {
    RemoteTokenVerifier::new(url, Duration::from_millis(250), Duration::from_millis(500))
        .expect("verifier")
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[tokio::test]
async fn ok_response_maps_username_and_permissions() {
    let body = json!({ "username": "alice", "user_id": 7, "permissions": ["math"] });
    let (url, capture, shutdown) = spawn_verifier(StatusCode::OK, body).await;
    let identity = verifier(url).verify("tok-1", Some("req-42")).await.expect("identity");
    assert_eq!(identity.subject, "alice");
    assert!(identity.permissions.contains("math"));
    {
        let guard = capture.lock().expect("capture lock");
        assert_eq!(guard.authorization.as_deref(), Some("Bearer tok-1"));
        assert_eq!(guard.request_id.as_deref(), Some("req-42"));
    }
    let _ = shutdown.send(());
}

#[tokio::test]
async fn numeric_user_id_is_fallback_subject() {
    let (url, _capture, shutdown) = spawn_verifier(StatusCode::OK, json!({ "user_id": 42 })).await;
    let identity = verifier(url).verify("tok", None).await.expect("identity");
    assert_eq!(identity.subject, "42");
    assert!(identity.permissions.is_empty());
    let _ = shutdown.send(());
}

#[tokio::test]
async fn ok_response_without_subject_rejected() {
    let (url, _capture, shutdown) =
        spawn_verifier(StatusCode::OK, json!({ "permissions": ["math"] })).await;
    let result = verifier(url).verify("tok", None).await;
    assert!(matches!(result, Err(VerifyError::Rejected(_))));
    let _ = shutdown.send(());
}

#[tokio::test]
async fn unauthorized_and_server_errors_reject() {
    for status in [StatusCode::UNAUTHORIZED, StatusCode::FORBIDDEN, StatusCode::INTERNAL_SERVER_ERROR]
    {
        let (url, _capture, shutdown) = spawn_verifier(status, json!({ "detail": "no" })).await;
        let result = verifier(url).verify("tok", None).await;
        assert!(matches!(result, Err(VerifyError::Rejected(_))), "status {status}");
        let _ = shutdown.send(());
    }
}

#[tokio::test]
async fn unreachable_service_is_unavailable() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    drop(listener);
    let result = verifier(format!("http://{addr}/auth/verify")).verify("tok", None).await;
    assert!(matches!(result, Err(VerifyError::Unavailable(_))));
}

#[tokio::test]
async fn oversized_streaming_response_is_rejected_before_timeout() {
    let app = Router::new().route("/auth/verify", post(endless_body));
    let (base, shutdown) = serve_router(app).await;
    let verifier = RemoteTokenVerifier::new(
        format!("{base}/auth/verify"),
        Duration::from_secs(1),
        Duration::from_secs(5),
    )
    .expect("verifier");
    let started = Instant::now();
    let result = verifier.verify("tok", None).await;
    assert!(started.elapsed() < Duration::from_secs(3));
    match result {
        Err(VerifyError::Rejected(reason)) => assert!(reason.contains("too large")),
        other => panic!("expected too-large rejection, got {other:?}"),
    }
    let _ = shutdown.send(());
}

#[tokio::test]
async fn redirects_are_not_followed() {
    let app = Router::new()
        .route(
            "/auth/verify",
            post(|| async { (StatusCode::TEMPORARY_REDIRECT, [(LOCATION, "/auth/other")]) }),
        )
        .route(
            "/auth/other",
            post(|| async { Json(json!({ "username": "mallory", "permissions": ["admin"] })) }),
        );
    let (base, shutdown) = serve_router(app).await;
    let result = verifier(format!("{base}/auth/verify")).verify("tok", None).await;
    assert!(matches!(result, Err(VerifyError::Rejected(_))));
    let _ = shutdown.send(());
}

#[test]
fn request_id_header_is_sanitized() {
    assert_eq!(sanitize_header_value(Some(" req-1 ")).as_deref(), Some("req-1"));
    assert_eq!(sanitize_header_value(Some("bad value")), None);
    assert_eq!(sanitize_header_value(Some(&"a".repeat(129))), None);
    assert_eq!(sanitize_header_value(None), None);
}
