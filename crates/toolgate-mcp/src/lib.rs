// crates/toolgate-mcp/src/lib.rs
// ============================================================================
// Module: Toolgate MCP
// Description: Authenticated MCP tool gateway.
// Purpose: Authenticate, authorize, validate, dispatch, and audit tool calls.
// Dependencies: toolgate-config, axum, tokio, jsonschema, reqwest
// ============================================================================

//! ## Overview
//! Toolgate MCP exposes a registry of tools to MCP clients over HTTP or
//! stdio. Every `tools/call` passes through one [`InvocationGateway`] that
//! validates the caller credential, checks permissions and argument schemas,
//! runs the handler, and appends exactly one audit record. Callers observe
//! results as a uniform envelope (`success`, `result`, `error`, `code`).
//! Security posture: every request is untrusted; pre-authentication failures
//! are indistinguishable from each other.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod audit;
pub mod auth;
pub mod envelope;
pub mod gateway;
pub mod jsonrpc;
pub mod registry;
pub mod remote_auth;
pub mod server;
pub mod stdio;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use audit::AuditOutcome;
pub use audit::AuditPipeline;
pub use audit::AuditRecord;
pub use audit::AuditSink;
pub use audit::BufferedAuditSink;
pub use audit::FileAuditSink;
pub use audit::InMemoryAuditSink;
pub use audit::NoopAuditSink;
pub use audit::StderrAuditSink;
pub use auth::Credential;
pub use auth::CredentialValidator;
pub use auth::Identity;
pub use auth::SignedClaims;
pub use auth::SignedTokenVerifier;
pub use auth::StaticTokenVerifier;
pub use auth::TokenVerifier;
pub use auth::Unauthenticated;
pub use auth::VerifyError;
pub use auth::issue_signed_token;
pub use envelope::Envelope;
pub use envelope::FailureCode;
pub use envelope::InvocationResult;
pub use gateway::InvocationGateway;
pub use gateway::InvocationRequest;
pub use jsonrpc::Dispatcher;
pub use jsonrpc::JsonRpcResponse;
pub use jsonrpc::RequestContext;
pub use registry::FnToolHandler;
pub use registry::RegistryError;
pub use registry::ToolDescriptor;
pub use registry::ToolFault;
pub use registry::ToolHandler;
pub use registry::ToolRegistry;
pub use registry::ToolSummary;
pub use remote_auth::RemoteTokenVerifier;
pub use server::HttpOptions;
pub use server::McpServer;
pub use server::McpServerError;
pub use server::http_router;
pub use stdio::StdioOptions;
pub use stdio::serve_session;
