// crates/toolgate-mcp/tests/common/mod.rs
// ============================================================================
// Module: Common Test Fixtures
// Description: Shared registries, validators, and servers for MCP tests.
// Purpose: Provide reusable test infrastructure for gateway and transports.
// Dependencies: toolgate-mcp, axum, tokio
// ============================================================================

//! ## Overview
//! Shared fixtures: a small math registry, static-token validators, and a
//! helper that binds a router on an ephemeral loopback port.
//!
//! Security posture: fixtures exercise the credential and permission
//! boundaries with deliberately wrong tokens and missing permissions.

#![allow(dead_code, reason = "Shared test helpers may be unused in some cases.")]
#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::unwrap_in_result,
    reason = "Test fixtures favor direct unwraps for setup clarity."
)]

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use serde_json::Value;
use serde_json::json;
use tokio::sync::oneshot;
use toolgate_mcp::AuditSink;
use toolgate_mcp::CredentialValidator;
use toolgate_mcp::FnToolHandler;
use toolgate_mcp::InMemoryAuditSink;
use toolgate_mcp::InvocationGateway;
use toolgate_mcp::StaticTokenVerifier;
use toolgate_mcp::ToolDescriptor;
use toolgate_mcp::ToolFault;
use toolgate_mcp::ToolRegistry;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Token granting the `math` permission to `alice`.
pub const ALICE_TOKEN: &str = "alice-token";
/// Token for `bob`, who holds no permissions.
pub const BOB_TOKEN: &str = "bob-token";

// ============================================================================
// SECTION: Registry
// ============================================================================

/// Schema shared by the two-operand math tools.
pub fn operands_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "a": { "type": "number" },
            "b": { "type": "number" }
        },
        "required": ["a", "b"],
        "additionalProperties": false
    })
}

/// Registry with `add` (requires `math`), `whoami`, and `explode`.
pub fn math_registry() -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    let add = FnToolHandler::shared(|caller, args: Value| async move {
        let a = args["a"].as_f64().unwrap_or_default();
        let b = args["b"].as_f64().unwrap_or_default();
        Ok(json!({ "result": a + b, "performed_by": caller.subject }))
    });
    registry
        .register(
            ToolDescriptor::new("add", "Adds two numbers", operands_schema(), add)
                .unwrap()
                .with_permission("math"),
        )
        .unwrap();
    let whoami = FnToolHandler::shared(|caller, _args: Value| async move {
        Ok(json!({ "subject": caller.subject }))
    });
    registry
        .register(
            ToolDescriptor::new("whoami", "Returns the caller", json!({ "type": "object" }), whoami)
                .unwrap(),
        )
        .unwrap();
    let explode = FnToolHandler::shared(|_caller, _args: Value| async move {
        Err::<Value, _>(ToolFault::internal("database password=hunter2 unreachable"))
    });
    registry
        .register(
            ToolDescriptor::new("explode", "Always fails", json!({ "type": "object" }), explode)
                .unwrap(),
        )
        .unwrap();
    registry
}

/// Static-token validator for `alice` and `bob`.
pub fn static_validator() -> CredentialValidator {
    let verifier = StaticTokenVerifier::new()
        .with_token(ALICE_TOKEN, "alice", ["math"], None)
        .with_token(BOB_TOKEN, "bob", Vec::<String>::new(), None);
    CredentialValidator::new(Arc::new(verifier), Duration::from_secs(2))
}

/// Gateway over [`math_registry`] writing to the provided audit sink.
pub fn math_gateway(audit: &Arc<InMemoryAuditSink>) -> InvocationGateway {
    let sink: Arc<dyn AuditSink> = Arc::clone(audit) as Arc<dyn AuditSink>;
    InvocationGateway::new(Arc::new(math_registry()), static_validator(), sink)
}

// ============================================================================
// SECTION: Servers
// ============================================================================

/// Running test server handle.
pub struct TestServer {
    /// Bound address.
    pub addr: SocketAddr,
    /// Shutdown trigger.
    shutdown: Option<oneshot::Sender<()>>,
}

impl TestServer {
    /// Returns a URL for `path` on the server.
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{path}", self.addr)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if let Some(sender) = self.shutdown.take() {
            let _ = sender.send(());
        }
    }
}

/// Serves `app` on an ephemeral loopback port.
pub async fn spawn_server(app: Router) -> TestServer {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = oneshot::channel::<()>();
    tokio::spawn(async move {
        let _ = axum::serve(listener, app)
            .with_graceful_shutdown(async {
                let _ = rx.await;
            })
            .await;
    });
    TestServer {
        addr,
        shutdown: Some(tx),
    }
}
