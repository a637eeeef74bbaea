// crates/toolgate-mcp/src/jsonrpc.rs
// ============================================================================
// Module: JSON-RPC Dispatch
// Description: MCP JSON-RPC 2.0 message handling shared by all transports.
// Purpose: Map MCP methods onto the invocation gateway.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! The dispatcher serves `initialize`, `ping`, `tools/list`, and `tools/call`
//! and ignores notifications. Credentials are taken from the transport's
//! `Authorization` header, then `params.auth_token`, then the legacy
//! `arguments.auth_token` field; the argument copy is always stripped before
//! validation, dispatch, and auditing.
//! Security posture: message bytes are untrusted; parse failures become
//! `MALFORMED_REQUEST` envelopes in `error.data`.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;
use serde_json::json;
use toolgate_config::ServerTransport;

use crate::auth::Credential;
use crate::auth::parse_bearer_header;
use crate::envelope::AUTH_FAILED_MESSAGE;
use crate::envelope::FailureCode;
use crate::envelope::InvocationResult;
use crate::gateway::InvocationGateway;
use crate::gateway::InvocationRequest;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// JSON-RPC protocol version.
pub const JSONRPC_VERSION: &str = "2.0";
/// MCP protocol revision advertised when the client does not request one.
pub const MCP_PROTOCOL_VERSION: &str = "2025-06-18";
/// Invalid JSON.
pub const PARSE_ERROR: i64 = -32700;
/// Not a valid request object.
pub const INVALID_REQUEST: i64 = -32600;
/// Unknown method.
pub const METHOD_NOT_FOUND: i64 = -32601;
/// Invalid method parameters.
pub const INVALID_PARAMS: i64 = -32602;
/// Internal error.
pub const INTERNAL_ERROR: i64 = -32603;
/// Discovery refused for an unauthenticated caller.
pub const UNAUTHENTICATED: i64 = -32001;
/// Legacy credential field inside tool arguments.
const ARGUMENT_TOKEN_FIELD: &str = "auth_token";

// ============================================================================
// SECTION: Request Context
// ============================================================================

/// Per-message transport context.
#[derive(Debug, Clone)]
pub struct RequestContext {
    /// Transport used by the caller.
    pub transport: ServerTransport,
    /// Authorization header value (HTTP).
    pub auth_header: Option<String>,
}

impl RequestContext {
    /// Builds a stdio request context.
    #[must_use]
    pub const fn stdio() -> Self {
        Self {
            transport: ServerTransport::Stdio,
            auth_header: None,
        }
    }

    /// Builds an HTTP request context.
    #[must_use]
    pub const fn http(auth_header: Option<String>) -> Self {
        Self {
            transport: ServerTransport::Http,
            auth_header,
        }
    }

    /// Returns the credential carried by the transport header, if valid.
    fn header_credential(&self) -> Option<Credential> {
        let header = self.auth_header.as_deref()?;
        match parse_bearer_header(header) {
            Ok(credential) => Some(credential),
            Err(reason) => {
                tracing::debug!(%reason, "ignoring unusable authorization header");
                None
            }
        }
    }
}

// ============================================================================
// SECTION: Wire Types
// ============================================================================

/// Incoming JSON-RPC request payload.
#[derive(Debug, Deserialize)]
pub struct JsonRpcRequest {
    /// JSON-RPC protocol version.
    pub jsonrpc: String,
    /// Request identifier; absent for notifications.
    #[serde(default)]
    pub id: Option<Value>,
    /// Method name.
    pub method: String,
    /// Optional parameters payload.
    #[serde(default)]
    pub params: Option<Value>,
}

/// JSON-RPC response envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    /// JSON-RPC protocol version.
    pub jsonrpc: String,
    /// Request identifier.
    pub id: Value,
    /// Successful result payload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    /// Error payload when the request fails.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

impl JsonRpcResponse {
    /// Builds a success response.
    #[must_use]
    pub fn ok(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            result: Some(result),
            error: None,
        }
    }

    /// Builds an error response.
    #[must_use]
    pub fn error(id: Value, code: i64, message: impl Into<String>, data: Option<Value>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            result: None,
            error: Some(JsonRpcError {
                code,
                message: message.into(),
                data,
            }),
        }
    }

    /// Builds an error response carrying a `MALFORMED_REQUEST` envelope.
    #[must_use]
    pub fn malformed(id: Value, code: i64, message: &str) -> Self {
        let envelope =
            InvocationResult::failure(FailureCode::MalformedRequest, message).to_envelope();
        Self::error(id, code, message, Some(envelope.to_value()))
    }
}

/// JSON-RPC error payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcError {
    /// Error code.
    pub code: i64,
    /// Human-readable error message.
    pub message: String,
    /// Structured error detail.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

/// Tool call parameters for JSON-RPC requests.
#[derive(Debug, Deserialize)]
struct ToolCallParams {
    /// Tool name.
    name: String,
    /// Raw JSON arguments.
    #[serde(default)]
    arguments: Value,
    /// Dedicated credential field.
    #[serde(default)]
    auth_token: Option<String>,
}

/// Tool list parameters.
#[derive(Debug, Default, Deserialize)]
struct ToolListParams {
    /// Dedicated credential field.
    #[serde(default)]
    auth_token: Option<String>,
}

/// Tool call response payload.
#[derive(Debug, Serialize)]
struct ToolCallResult {
    /// Tool output content.
    content: Vec<ToolContent>,
    /// Structured envelope.
    #[serde(rename = "structuredContent")]
    structured_content: Value,
    /// True when the envelope reports a failure.
    #[serde(rename = "isError")]
    is_error: bool,
}

/// Tool output payloads for JSON-RPC responses.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ToolContent {
    /// Text tool output.
    Text {
        /// Envelope rendered as JSON text.
        text: String,
    },
}

// ============================================================================
// SECTION: Dispatcher
// ============================================================================

/// Routes JSON-RPC messages to the invocation gateway.
#[derive(Clone)]
pub struct Dispatcher {
    /// Invocation pipeline.
    gateway: InvocationGateway,
    /// Advertised server name.
    server_name: String,
}

impl Dispatcher {
    /// Builds a dispatcher.
    #[must_use]
    pub fn new(gateway: InvocationGateway, server_name: impl Into<String>) -> Self {
        Self {
            gateway,
            server_name: server_name.into(),
        }
    }

    /// Returns the advertised server name.
    #[must_use]
    pub fn server_name(&self) -> &str {
        &self.server_name
    }

    /// Returns the gateway.
    #[must_use]
    pub const fn gateway(&self) -> &InvocationGateway {
        &self.gateway
    }

    /// Handles raw message bytes. Returns `None` for notifications.
    pub async fn handle_bytes(&self, ctx: &RequestContext, bytes: &[u8]) -> Option<JsonRpcResponse> {
        match serde_json::from_slice::<Value>(bytes) {
            Ok(value) => self.handle_value(ctx, value).await,
            Err(_) => Some(JsonRpcResponse::malformed(Value::Null, PARSE_ERROR, "parse error")),
        }
    }

    /// Handles a parsed JSON message. Returns `None` for notifications.
    pub async fn handle_value(&self, ctx: &RequestContext, value: Value) -> Option<JsonRpcResponse> {
        if value.is_array() {
            return Some(JsonRpcResponse::malformed(
                Value::Null,
                INVALID_REQUEST,
                "batch requests are not supported",
            ));
        }
        let fallback_id = value.get("id").cloned().unwrap_or(Value::Null);
        let Ok(request) = serde_json::from_value::<JsonRpcRequest>(value) else {
            return Some(JsonRpcResponse::malformed(
                fallback_id,
                INVALID_REQUEST,
                "invalid json-rpc request",
            ));
        };
        if request.jsonrpc != JSONRPC_VERSION {
            return Some(JsonRpcResponse::malformed(
                fallback_id,
                INVALID_REQUEST,
                "invalid json-rpc version",
            ));
        }
        let Some(id) = request.id.filter(|id| !id.is_null()) else {
            tracing::trace!(method = %request.method, "notification received");
            return None;
        };
        Some(self.handle_request(ctx, id, &request.method, request.params).await)
    }

    /// Dispatches a request with an identifier.
    async fn handle_request(
        &self,
        ctx: &RequestContext,
        id: Value,
        method: &str,
        params: Option<Value>,
    ) -> JsonRpcResponse {
        match method {
            "initialize" => JsonRpcResponse::ok(id, self.initialize_result(params.as_ref())),
            "ping" => JsonRpcResponse::ok(id, json!({})),
            "tools/list" => self.list_tools(ctx, id, params).await,
            "tools/call" => self.call_tool(ctx, id, params).await,
            _ => JsonRpcResponse::error(id, METHOD_NOT_FOUND, "method not found", None),
        }
    }

    /// Builds the `initialize` result.
    fn initialize_result(&self, params: Option<&Value>) -> Value {
        let protocol_version = params
            .and_then(|params| params.get("protocolVersion"))
            .and_then(Value::as_str)
            .unwrap_or(MCP_PROTOCOL_VERSION);
        json!({
            "protocolVersion": protocol_version,
            "capabilities": { "tools": { "listChanged": false } },
            "serverInfo": {
                "name": self.server_name,
                "version": env!("CARGO_PKG_VERSION"),
            },
        })
    }

    /// Handles `tools/list`.
    async fn list_tools(
        &self,
        ctx: &RequestContext,
        id: Value,
        params: Option<Value>,
    ) -> JsonRpcResponse {
        let params = match params {
            None | Some(Value::Null) => ToolListParams::default(),
            Some(value) => match serde_json::from_value::<ToolListParams>(value) {
                Ok(params) => params,
                Err(_) => return JsonRpcResponse::malformed(id, INVALID_PARAMS, "invalid list params"),
            },
        };
        let credential = ctx.header_credential().or_else(|| params.auth_token.map(Credential::new));
        let request_id = request_id_label(&id);
        match self.gateway.list_tools(credential.as_ref(), Some(&request_id)).await {
            Ok(tools) => JsonRpcResponse::ok(id, json!({ "tools": tools })),
            Err(_) => {
                let envelope =
                    InvocationResult::failure(FailureCode::AuthFailed, AUTH_FAILED_MESSAGE)
                        .to_envelope();
                JsonRpcResponse::error(
                    id,
                    UNAUTHENTICATED,
                    AUTH_FAILED_MESSAGE,
                    Some(envelope.to_value()),
                )
            }
        }
    }

    /// Handles `tools/call`.
    async fn call_tool(
        &self,
        ctx: &RequestContext,
        id: Value,
        params: Option<Value>,
    ) -> JsonRpcResponse {
        let Ok(mut call) = serde_json::from_value::<ToolCallParams>(params.unwrap_or(Value::Null))
        else {
            return JsonRpcResponse::malformed(id, INVALID_PARAMS, "invalid tool params");
        };
        let legacy_token = strip_argument_token(&mut call.arguments);
        let credential = ctx
            .header_credential()
            .or_else(|| call.auth_token.map(Credential::new))
            .or_else(|| legacy_token.map(Credential::new));
        let request = InvocationRequest::new(call.name, call.arguments)
            .with_credential(credential)
            .with_request_id(request_id_label(&id))
            .with_transport(ctx.transport.as_str());
        let result = self.gateway.invoke(request).await;
        let envelope = result.to_envelope();
        let text = match serde_json::to_string(&envelope) {
            Ok(text) => text,
            Err(_) => return JsonRpcResponse::error(id, INTERNAL_ERROR, "internal error", None),
        };
        let payload = ToolCallResult {
            content: vec![ToolContent::Text {
                text,
            }],
            structured_content: envelope.to_value(),
            is_error: !envelope.success,
        };
        match serde_json::to_value(payload) {
            Ok(value) => JsonRpcResponse::ok(id, value),
            Err(_) => JsonRpcResponse::error(id, INTERNAL_ERROR, "internal error", None),
        }
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Removes `auth_token` from object arguments, returning it when it is a string.
fn strip_argument_token(arguments: &mut Value) -> Option<String> {
    match arguments.as_object_mut()?.remove(ARGUMENT_TOKEN_FIELD)? {
        Value::String(token) => Some(token),
        _ => None,
    }
}

/// Renders a JSON-RPC id as a correlation label.
#[must_use]
pub fn request_id_label(id: &Value) -> String {
    match id {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
