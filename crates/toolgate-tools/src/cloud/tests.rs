// crates/toolgate-tools/src/cloud/tests.rs
// ============================================================================
// Module: Cloud Version Tool Tests
// Description: Unit tests against a stub about endpoint.
// Purpose: Validate data extraction and sanitized failures.
// Dependencies: toolgate-tools, axum, tokio
// ============================================================================

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

use std::time::Duration;
use std::time::Instant;

use axum::Json;
use axum::Router;
use axum::body::Body;
use axum::http::StatusCode;
use axum::http::header::LOCATION;
use axum::routing::get;
use serde_json::Value;
use serde_json::json;
use tokio::sync::oneshot;
use toolgate_mcp::Identity;
use toolgate_mcp::ToolFault;
use toolgate_mcp::ToolHandler;

use super::CloudVersionTool;
use super::extract_version;

// ============================================================================
// SECTION: Fixtures
// ============================================================================

async fn spawn_about(status: StatusCode, body: Value) -> (String, oneshot::Sender<()>) {
    let app = Router::new().route(
        "/api/about",
        get(move || {
            let body = body.clone();
            async move { (status, Json(body)) }
        }),
    );
    let (base, shutdown_tx) = serve_router(app).await;
    (format!("{base}/api/about"), shutdown_tx)
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

fn caller() -> Identity {
    Identity::new("alice", Vec::<String>::new())
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[tokio::test]
async fn returns_success_data() {
    let body = json!({ "success": { "data": { "version": "4.2.0" } } });
    let (url, _shutdown) = spawn_about(StatusCode::OK, body).await;
    let tool = CloudVersionTool::new(url, Duration::from_secs(2)).unwrap();
    let version = tool.call(&caller(), json!({})).await.unwrap();
    assert_eq!(version, json!({ "version": "4.2.0" }));
}

#[tokio::test]
async fn server_errors_are_internal_faults() {
    let (url, _shutdown) = spawn_about(StatusCode::BAD_GATEWAY, json!({})).await;
    let tool = CloudVersionTool::new(url, Duration::from_secs(2)).unwrap();
    let fault = tool.call(&caller(), json!({})).await.unwrap_err();
    assert!(matches!(fault, ToolFault::Internal(_)));
    assert_eq!(fault.public_message(), "tool execution failed");
}

#[tokio::test]
async fn unreachable_endpoint_is_internal_fault() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    let tool = CloudVersionTool::new(format!("http://{addr}/"), Duration::from_millis(500)).unwrap();
    let fault = tool.call(&caller(), json!({})).await.unwrap_err();
    assert!(matches!(fault, ToolFault::Internal(_)));
}

#[tokio::test]
async fn oversized_streaming_response_is_cut_off() {
    let app = Router::new().route(
        "/api/about",
        get(|| async {
            let chunks =
                futures::stream::repeat_with(|| Ok::<_, std::io::Error>(vec![b' '; 64 * 1024]));
            Body::from_stream(chunks)
        }),
    );
    let (base, _shutdown) = serve_router(app).await;
    let tool = CloudVersionTool::new(format!("{base}/api/about"), Duration::from_secs(5)).unwrap();
    let started = Instant::now();
    let fault = tool.call(&caller(), json!({})).await.unwrap_err();
    assert!(started.elapsed() < Duration::from_secs(3));
    let ToolFault::Internal(detail) = fault else {
        panic!("expected internal fault");
    };
    assert!(detail.contains("too large"));
}

#[tokio::test]
async fn redirects_are_not_followed() {
    let app = Router::new()
        .route("/api/about", get(|| async { (StatusCode::FOUND, [(LOCATION, "/api/moved")]) }))
        .route(
            "/api/moved",
            get(|| async { Json(json!({ "success": { "data": { "version": "9.9.9" } } })) }),
        );
    let (base, _shutdown) = serve_router(app).await;
    let tool = CloudVersionTool::new(format!("{base}/api/about"), Duration::from_secs(2)).unwrap();
    let fault = tool.call(&caller(), json!({})).await.unwrap_err();
    assert!(matches!(fault, ToolFault::Internal(_)));
}

#[test]
fn missing_data_is_user_fault() {
    assert!(matches!(extract_version(&json!({ "success": {} })), Err(ToolFault::User(_))));
    assert!(matches!(extract_version(&json!({ "success": { "data": null } })), Err(_)));
    assert_eq!(extract_version(&json!({ "success": { "data": "1.0" } })).unwrap(), json!("1.0"));
}
