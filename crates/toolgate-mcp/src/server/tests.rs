// crates/toolgate-mcp/src/server/tests.rs
// ============================================================================
// Module: MCP Server Tests
// Description: Unit tests for HTTP status mapping and server construction.
// Purpose: Validate transport-level status codes and config wiring.
// Dependencies: toolgate-mcp, toolgate-config, serde_json
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

use axum::http::StatusCode;
use serde_json::json;
use toolgate_config::GatewayConfig;

use super::McpServer;
use super::McpServerError;
use super::http_status;
use crate::jsonrpc::INTERNAL_ERROR;
use crate::jsonrpc::INVALID_PARAMS;
use crate::jsonrpc::JsonRpcResponse;
use crate::jsonrpc::METHOD_NOT_FOUND;
use crate::jsonrpc::PARSE_ERROR;
use crate::jsonrpc::UNAUTHENTICATED;
use crate::registry::ToolRegistry;

// ============================================================================
// SECTION: Status Mapping
// ============================================================================

#[test]
fn success_maps_to_ok() {
    let response = JsonRpcResponse::ok(json!(1), json!({}));
    assert_eq!(http_status(&response), StatusCode::OK);
}

#[test]
fn error_codes_map_to_http_statuses() {
    let cases = [
        (UNAUTHENTICATED, StatusCode::UNAUTHORIZED),
        (METHOD_NOT_FOUND, StatusCode::NOT_FOUND),
        (INTERNAL_ERROR, StatusCode::INTERNAL_SERVER_ERROR),
        (INVALID_PARAMS, StatusCode::BAD_REQUEST),
        (PARSE_ERROR, StatusCode::BAD_REQUEST),
    ];
    for (code, expected) in cases {
        let response = JsonRpcResponse::error(json!(1), code, "x", None);
        assert_eq!(http_status(&response), expected, "code {code}");
    }
}

// ============================================================================
// SECTION: Construction
// ============================================================================

#[tokio::test]
async fn from_config_wires_server_name_and_discovery() {
    let config = GatewayConfig::from_toml_str(
        r#"
[server]
name = "unit-gateway"
public_discovery = true

[[auth.tokens]]
token = "secret-token"
subject = "alice"

[audit]
enabled = false
"#,
    )
    .unwrap();
    let server = McpServer::from_config(config, ToolRegistry::new()).unwrap();
    assert_eq!(server.dispatcher().server_name(), "unit-gateway");
    assert!(server.dispatcher().gateway().public_discovery());
}

#[tokio::test]
async fn from_config_revalidates_mutated_config() {
    let mut config = GatewayConfig::default();
    config.server.max_body_bytes = 0;
    let result = McpServer::from_config(config, ToolRegistry::new());
    assert!(matches!(result, Err(McpServerError::Config(_))));
}
