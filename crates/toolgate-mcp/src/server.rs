// crates/toolgate-mcp/src/server.rs
// ============================================================================
// Module: MCP Server
// Description: Server assembly plus the HTTP transport binding.
// Purpose: Expose the invocation gateway over HTTP or stdio.
// Dependencies: axum, subtle, tokio, toolgate-config
// ============================================================================

//! ## Overview
//! [`McpServer`] assembles the credential validator, audit pipeline, and
//! gateway from configuration, then serves the configured transport. The
//! HTTP binding exposes `POST /mcp`, `GET /health`, and `GET /`. An optional
//! gate checks a shared bearer token in constant time before the body is
//! read; oversized bodies are refused with a `MALFORMED_REQUEST` envelope.
//! Security posture: inputs are untrusted and size-limited.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::Json;
use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::extract::Request;
use axum::extract::State;
use axum::extract::rejection::BytesRejection;
use axum::http::HeaderMap;
use axum::http::StatusCode;
use axum::http::header::AUTHORIZATION;
use axum::middleware;
use axum::middleware::Next;
use axum::response::IntoResponse;
use axum::response::Response;
use axum::routing::get;
use axum::routing::post;
use bytes::Bytes;
use serde_json::Value;
use serde_json::json;
use subtle::ConstantTimeEq;
use thiserror::Error;
use toolgate_config::GatewayConfig;
use toolgate_config::ServerTransport;

use crate::audit::AuditPipeline;
use crate::auth::CredentialValidator;
use crate::auth::parse_bearer_header;
use crate::gateway::InvocationGateway;
use crate::jsonrpc::Dispatcher;
use crate::jsonrpc::INTERNAL_ERROR;
use crate::jsonrpc::INVALID_REQUEST;
use crate::jsonrpc::JsonRpcResponse;
use crate::jsonrpc::METHOD_NOT_FOUND;
use crate::jsonrpc::RequestContext;
use crate::jsonrpc::UNAUTHENTICATED;
use crate::registry::ToolRegistry;
use crate::stdio::StdioOptions;
use crate::stdio::serve_session;

// ============================================================================
// SECTION: MCP Server
// ============================================================================

/// MCP server instance.
pub struct McpServer {
    /// Server configuration.
    config: GatewayConfig,
    /// JSON-RPC dispatcher over the gateway.
    dispatcher: Dispatcher,
    /// Audit pipeline flushed on shutdown.
    audit: AuditPipeline,
}

impl McpServer {
    /// Builds a server from configuration and a populated registry. Must be
    /// called inside a Tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns [`McpServerError`] when initialization fails.
    pub fn from_config(config: GatewayConfig, registry: ToolRegistry) -> Result<Self, McpServerError> {
        config.validate().map_err(|err| McpServerError::Config(err.to_string()))?;
        let validator = CredentialValidator::from_config(&config.auth)
            .map_err(|err| McpServerError::Init(err.to_string()))?;
        let audit = AuditPipeline::from_config(&config.audit)
            .map_err(|err| McpServerError::Init(format!("audit sink: {err}")))?;
        let gateway = InvocationGateway::new(Arc::new(registry), validator, Arc::clone(&audit.sink))
            .with_public_discovery(config.server.public_discovery);
        let dispatcher = Dispatcher::new(gateway, config.server.name.clone());
        Ok(Self {
            config,
            dispatcher,
            audit,
        })
    }

    /// Returns the dispatcher.
    #[must_use]
    pub const fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Serves the configured transport until it ends or `shutdown` resolves.
    ///
    /// # Errors
    ///
    /// Returns [`McpServerError`] when the listener cannot bind or the
    /// transport fails.
    pub async fn serve_with_shutdown<F>(self, shutdown: F) -> Result<(), McpServerError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let server = &self.config.server;
        tracing::info!(
            name = %server.name,
            transport = server.transport.as_str(),
            tools = self.dispatcher.gateway().registry().len(),
            "starting toolgate server"
        );
        let result = match server.transport {
            ServerTransport::Stdio => {
                let options = StdioOptions {
                    framing: server.stdio_framing,
                    max_frame_bytes: server.max_body_bytes,
                };
                let session = serve_session(
                    self.dispatcher.clone(),
                    options,
                    tokio::io::stdin(),
                    tokio::io::stdout(),
                );
                tokio::select! {
                    result = session => result,
                    () = shutdown => Ok(()),
                }
            }
            ServerTransport::Http => {
                let addr =
                    server.bind_addr().map_err(|err| McpServerError::Config(err.to_string()))?;
                let options = HttpOptions {
                    max_body_bytes: server.max_body_bytes,
                    gate_tokens: server.http.gate_tokens.clone(),
                };
                serve_http(addr, http_router(self.dispatcher.clone(), options), shutdown).await
            }
        };
        self.shutdown().await;
        tracing::info!("toolgate server stopped");
        result
    }

    /// Flushes buffered audit records and releases the server.
    pub async fn shutdown(self) {
        self.audit.shutdown().await;
    }
}

// ============================================================================
// SECTION: HTTP Transport
// ============================================================================

/// HTTP binding options.
#[derive(Debug, Clone)]
pub struct HttpOptions {
    /// Maximum request body size.
    pub max_body_bytes: usize,
    /// Shared gate tokens; empty disables the gate.
    pub gate_tokens: Vec<String>,
}

/// Shared server state for HTTP handlers.
struct HttpState {
    /// JSON-RPC dispatcher.
    dispatcher: Dispatcher,
    /// Shared gate tokens.
    gate_tokens: Vec<String>,
}

/// Builds the HTTP router.
pub fn http_router(dispatcher: Dispatcher, options: HttpOptions) -> Router {
    let state = Arc::new(HttpState {
        dispatcher,
        gate_tokens: options.gate_tokens,
    });
    let mcp = Router::new()
        .route("/mcp", post(handle_mcp))
        .route_layer(middleware::from_fn_with_state(Arc::clone(&state), require_gate_token));
    Router::new()
        .merge(mcp)
        .route("/health", get(handle_health))
        .route("/", get(handle_info))
        .layer(DefaultBodyLimit::max(options.max_body_bytes))
        .with_state(state)
}

/// Binds and serves the router until `shutdown` resolves.
async fn serve_http<F>(addr: SocketAddr, app: Router, shutdown: F) -> Result<(), McpServerError>
where
    F: Future<Output = ()> + Send + 'static,
{
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|err| McpServerError::Transport(format!("http bind failed: {err}")))?;
    tracing::info!(%addr, "http transport listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|err| McpServerError::Transport(format!("http server failed: {err}")))
}

/// Rejects requests without a matching gate token.
async fn require_gate_token(
    State(state): State<Arc<HttpState>>,
    request: Request,
    next: Next,
) -> Response {
    if state.gate_tokens.is_empty() {
        return next.run(request).await;
    }
    let presented = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|header| parse_bearer_header(header).ok());
    let authorized = presented.is_some_and(|credential| {
        state
            .gate_tokens
            .iter()
            .fold(false, |matched, token| {
                matched | bool::from(token.as_bytes().ct_eq(credential.expose().as_bytes()))
            })
    });
    if !authorized {
        tracing::debug!("http gate rejected request");
        return (StatusCode::UNAUTHORIZED, "Unauthorized").into_response();
    }
    next.run(request).await
}

/// Handles `POST /mcp`.
async fn handle_mcp(
    State(state): State<Arc<HttpState>>,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> Response {
    let bytes = match body {
        Ok(bytes) => bytes,
        Err(rejection) => {
            let status = rejection.status();
            let message = if status == StatusCode::PAYLOAD_TOO_LARGE {
                "request body too large"
            } else {
                "unreadable request body"
            };
            let response = JsonRpcResponse::malformed(Value::Null, INVALID_REQUEST, message);
            return (status, Json(response)).into_response();
        }
    };
    // The gate consumes the Authorization header; callers then use auth_token.
    let auth_header = if state.gate_tokens.is_empty() {
        headers.get(AUTHORIZATION).and_then(|value| value.to_str().ok()).map(str::to_string)
    } else {
        None
    };
    let ctx = RequestContext::http(auth_header);
    match state.dispatcher.handle_bytes(&ctx, &bytes).await {
        Some(response) => (http_status(&response), Json(response)).into_response(),
        None => StatusCode::ACCEPTED.into_response(),
    }
}

/// Handles `GET /health`.
async fn handle_health(State(state): State<Arc<HttpState>>) -> Json<Value> {
    Json(json!({ "status": "healthy", "serverName": state.dispatcher.server_name() }))
}

/// Handles `GET /`.
async fn handle_info(State(state): State<Arc<HttpState>>) -> Json<Value> {
    let gateway = state.dispatcher.gateway();
    let mut info = json!({
        "name": state.dispatcher.server_name(),
        "description": "Authenticated MCP tool gateway",
        "endpoints": { "mcp": "POST /mcp", "health": "GET /health" },
    });
    if gateway.public_discovery() {
        let tools: Vec<&str> =
            gateway.registry().list_all().iter().map(|tool| tool.name()).collect();
        info["tools"] = json!(tools);
    }
    Json(info)
}

/// Maps a JSON-RPC response to an HTTP status.
fn http_status(response: &JsonRpcResponse) -> StatusCode {
    match response.error.as_ref().map(|error| error.code) {
        None => StatusCode::OK,
        Some(UNAUTHENTICATED) => StatusCode::UNAUTHORIZED,
        Some(METHOD_NOT_FOUND) => StatusCode::NOT_FOUND,
        Some(INTERNAL_ERROR) => StatusCode::INTERNAL_SERVER_ERROR,
        Some(_) => StatusCode::BAD_REQUEST,
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// MCP server errors.
#[derive(Debug, Error)]
pub enum McpServerError {
    /// Configuration errors.
    #[error("config error: {0}")]
    Config(String),
    /// Initialization errors.
    #[error("init error: {0}")]
    Init(String),
    /// Transport errors.
    #[error("transport error: {0}")]
    Transport(String),
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests;
