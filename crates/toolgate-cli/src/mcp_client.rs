// crates/toolgate-cli/src/mcp_client.rs
// ============================================================================
// Module: MCP Client
// Description: HTTP JSON-RPC client for Toolgate MCP endpoints.
// Purpose: Provide CLI access to `tools/list` and `tools/call` over HTTP.
// Dependencies: reqwest, serde, serde_json
// ============================================================================

//! ## Overview
//! Minimal MCP client used by `toolgate client`. One [`McpClient`] owns one
//! `reqwest::Client`, so every request of a CLI session reuses the same
//! connection pool. The caller credential is sent either as an
//! `Authorization: Bearer` header or as `params.auth_token`; the latter is
//! required when the endpoint sits behind an HTTP gate token, which occupies
//! the header.
//!
//! Security posture: server responses are untrusted; bodies are size-limited
//! and tokens never appear in `Debug` output.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::time::Duration;

use reqwest::Client;
use reqwest::header::AUTHORIZATION;
use reqwest::header::CONTENT_TYPE;
use reqwest::header::HeaderMap;
use reqwest::header::HeaderValue;
use reqwest::redirect::Policy;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Maximum MCP response body size accepted by the CLI.
pub const MAX_MCP_RESPONSE_BYTES: usize = 4 * 1024 * 1024;

/// MCP protocol version announced by `initialize`.
const CLIENT_PROTOCOL_VERSION: &str = "2024-11-05";

// ============================================================================
// SECTION: Types
// ============================================================================

/// Where the caller credential travels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenPlacement {
    /// `Authorization: Bearer <token>` header.
    Header,
    /// `params.auth_token` field of the request.
    Params,
}

/// CLI MCP client configuration.
#[derive(Clone)]
pub struct McpClientConfig {
    /// MCP endpoint URL (for example `http://127.0.0.1:8080/mcp`).
    pub endpoint: String,
    /// Request timeout.
    pub timeout: Duration,
    /// Caller credential.
    pub token: Option<String>,
    /// Credential placement.
    pub placement: TokenPlacement,
    /// HTTP gate token sent as the bearer header.
    pub gate_token: Option<String>,
}

impl std::fmt::Debug for McpClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("McpClientConfig")
            .field("endpoint", &self.endpoint)
            .field("timeout", &self.timeout)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("placement", &self.placement)
            .field("gate_token", &self.gate_token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// MCP client errors.
///
/// # Invariants
/// - String payloads are user-facing and may include untrusted server text.
#[derive(Debug, Error)]
pub enum McpClientError {
    /// Configuration error.
    #[error("mcp client config error: {0}")]
    Config(String),
    /// Transport error.
    #[error("mcp transport error: {0}")]
    Transport(String),
    /// Protocol parsing error.
    #[error("mcp protocol error: {0}")]
    Protocol(String),
    /// JSON-RPC error object returned by the server.
    #[error("mcp server error {code}: {message}")]
    Rpc {
        /// JSON-RPC error code.
        code: i64,
        /// Server message.
        message: String,
    },
    /// Response size exceeds limits.
    #[error("mcp response exceeds size limit ({actual} > {limit})")]
    ResponseTooLarge {
        /// Actual size in bytes.
        actual: usize,
        /// Maximum size in bytes.
        limit: usize,
    },
}

/// Tool entry returned by `tools/list`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolInfo {
    /// Tool name.
    pub name: String,
    /// Tool description.
    #[serde(default)]
    pub description: String,
    /// Argument schema.
    #[serde(rename = "inputSchema", default)]
    pub input_schema: Value,
}

/// Outcome of a `tools/call` request.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolCallOutcome {
    /// Response envelope (`success` plus `result` or `error`/`code`).
    pub envelope: Value,
    /// Whether the server flagged the call as an error.
    pub is_error: bool,
}

/// HTTP MCP client holding one connection pool for its lifetime.
pub struct McpClient {
    /// Shared reqwest client.
    client: Client,
    /// Client configuration.
    config: McpClientConfig,
    /// Next JSON-RPC request identifier.
    next_id: u64,
}

// ============================================================================
// SECTION: JSON-RPC Structures
// ============================================================================

/// JSON-RPC request envelope.
#[derive(Debug, Serialize)]
struct JsonRpcRequest<'a> {
    /// JSON-RPC version tag.
    jsonrpc: &'static str,
    /// Request identifier.
    id: u64,
    /// Method name to invoke.
    method: &'a str,
    /// Optional parameters payload.
    #[serde(skip_serializing_if = "Option::is_none")]
    params: Option<Value>,
}

/// JSON-RPC response envelope.
#[derive(Debug, Deserialize)]
struct JsonRpcResponse {
    /// Optional result payload.
    result: Option<Value>,
    /// Optional error payload.
    error: Option<JsonRpcError>,
}

/// JSON-RPC error payload.
#[derive(Debug, Deserialize)]
struct JsonRpcError {
    /// Error code.
    code: i64,
    /// Error message provided by the server.
    message: String,
}

/// `tools/list` result payload.
#[derive(Debug, Deserialize)]
struct ToolListResult {
    /// Tool entries returned by the server.
    tools: Vec<ToolInfo>,
}

/// `tools/call` result payload.
#[derive(Debug, Deserialize)]
struct ToolCallResult {
    /// Structured envelope.
    #[serde(rename = "structuredContent")]
    structured_content: Value,
    /// Error flag.
    #[serde(rename = "isError", default)]
    is_error: bool,
}

// ============================================================================
// SECTION: Client
// ============================================================================

impl McpClient {
    /// Creates a new MCP client.
    ///
    /// # Errors
    ///
    /// Returns [`McpClientError`] when the endpoint is empty or the HTTP
    /// client cannot be constructed.
    pub fn new(config: McpClientConfig) -> Result<Self, McpClientError> {
        if config.endpoint.trim().is_empty() {
            return Err(McpClientError::Config("endpoint is required".to_string()));
        }
        let client = Client::builder()
            .timeout(config.timeout)
            .redirect(Policy::none())
            .build()
            .map_err(|err| McpClientError::Transport(err.to_string()))?;
        Ok(Self {
            client,
            config,
            next_id: 1,
        })
    }

    /// Calls `initialize` and returns the server name.
    ///
    /// # Errors
    ///
    /// Returns [`McpClientError`] when the transport or parsing fails.
    pub async fn initialize(&mut self) -> Result<String, McpClientError> {
        let params = serde_json::json!({
            "protocolVersion": CLIENT_PROTOCOL_VERSION,
            "capabilities": {},
            "clientInfo": { "name": "toolgate-cli", "version": env!("CARGO_PKG_VERSION") },
        });
        let result = self.send_request("initialize", Some(params)).await?;
        result
            .pointer("/serverInfo/name")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| McpClientError::Protocol("missing serverInfo.name".to_string()))
    }

    /// Calls `tools/list` and returns the tool entries.
    ///
    /// # Errors
    ///
    /// Returns [`McpClientError`] when the transport or parsing fails, or the
    /// server rejects the credential.
    pub async fn list_tools(&mut self) -> Result<Vec<ToolInfo>, McpClientError> {
        let params = self.token_params(serde_json::Map::new());
        let result = self.send_request("tools/list", params).await?;
        let parsed: ToolListResult = serde_json::from_value(result).map_err(|err| {
            McpClientError::Protocol(format!("invalid tools/list payload: {err}"))
        })?;
        Ok(parsed.tools)
    }

    /// Calls `tools/call` and returns the response envelope.
    ///
    /// # Errors
    ///
    /// Returns [`McpClientError`] when the transport or parsing fails.
    /// Gateway failures (auth, permission, validation) are returned as an
    /// envelope with `is_error` set, not as an error.
    pub async fn call_tool(
        &mut self,
        tool_name: &str,
        arguments: Value,
    ) -> Result<ToolCallOutcome, McpClientError> {
        let mut params = serde_json::Map::new();
        params.insert("name".to_string(), Value::String(tool_name.to_string()));
        params.insert("arguments".to_string(), arguments);
        let result = self.send_request("tools/call", self.token_params(params)).await?;
        let parsed: ToolCallResult = serde_json::from_value(result).map_err(|err| {
            McpClientError::Protocol(format!("invalid tools/call payload for {tool_name}: {err}"))
        })?;
        Ok(ToolCallOutcome {
            envelope: parsed.structured_content,
            is_error: parsed.is_error,
        })
    }

    /// Adds `auth_token` to params when the token travels in the body.
    fn token_params(&self, mut params: serde_json::Map<String, Value>) -> Option<Value> {
        if self.config.placement == TokenPlacement::Params
            && let Some(token) = &self.config.token
        {
            params.insert("auth_token".to_string(), Value::String(token.clone()));
        }
        if params.is_empty() { None } else { Some(Value::Object(params)) }
    }

    /// Sends a JSON-RPC request and returns its result payload.
    ///
    /// # Errors
    ///
    /// Returns [`McpClientError`] when transport, status, or parsing fails.
    async fn send_request(
        &mut self,
        method: &str,
        params: Option<Value>,
    ) -> Result<Value, McpClientError> {
        let id = self.next_id;
        self.next_id = self
            .next_id
            .checked_add(1)
            .ok_or_else(|| McpClientError::Protocol("json-rpc request id overflow".to_string()))?;
        let request = JsonRpcRequest {
            jsonrpc: "2.0",
            id,
            method,
            params,
        };
        let payload = serde_json::to_vec(&request).map_err(|err| {
            McpClientError::Protocol(format!("jsonrpc serialization failed: {err}"))
        })?;
        let response = self
            .client
            .post(&self.config.endpoint)
            .headers(self.headers()?)
            .body(payload)
            .send()
            .await
            .map_err(|err| McpClientError::Transport(err.to_string()))?;
        let status = response.status();
        let body = read_response_body_with_limit(response, MAX_MCP_RESPONSE_BYTES).await?;
        // Error statuses still carry a JSON-RPC body unless a gate rejected us.
        let Ok(parsed) = serde_json::from_slice::<JsonRpcResponse>(&body) else {
            let preview = String::from_utf8_lossy(&body);
            return Err(McpClientError::Transport(format!(
                "http status {}: {}",
                status.as_u16(),
                preview.trim()
            )));
        };
        if let Some(error) = parsed.error {
            return Err(McpClientError::Rpc {
                code: error.code,
                message: error.message,
            });
        }
        parsed
            .result
            .ok_or_else(|| McpClientError::Protocol(format!("missing result in {method} response")))
    }

    /// Builds request headers.
    ///
    /// # Errors
    ///
    /// Returns [`McpClientError`] when header values are invalid.
    fn headers(&self) -> Result<HeaderMap, McpClientError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let bearer = match self.config.placement {
            TokenPlacement::Header => self.config.token.as_ref(),
            TokenPlacement::Params => self.config.gate_token.as_ref(),
        };
        if let Some(token) = bearer {
            let header = HeaderValue::from_str(&format!("Bearer {token}"))
                .map_err(|_| McpClientError::Config("invalid bearer token header".to_string()))?;
            headers.insert(AUTHORIZATION, header);
        }
        Ok(headers)
    }
}

// ============================================================================
// SECTION: HTTP Helpers
// ============================================================================

/// Reads an HTTP response body while enforcing a hard byte limit.
async fn read_response_body_with_limit(
    mut response: reqwest::Response,
    limit: usize,
) -> Result<Vec<u8>, McpClientError> {
    let mut body = Vec::new();
    while let Some(chunk) =
        response.chunk().await.map_err(|err| McpClientError::Transport(err.to_string()))?
    {
        let next_total = body.len().saturating_add(chunk.len());
        if next_total > limit {
            return Err(McpClientError::ResponseTooLarge {
                actual: next_total,
                limit,
            });
        }
        body.extend_from_slice(&chunk);
    }
    Ok(body)
}
