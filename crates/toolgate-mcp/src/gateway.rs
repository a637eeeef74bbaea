// crates/toolgate-mcp/src/gateway.rs
// ============================================================================
// Module: Invocation Gateway
// Description: Authenticate, resolve, authorize, validate, dispatch, audit.
// Purpose: Turn every invocation request into one result and one audit record.
// Dependencies: futures, serde_json, tracing
// ============================================================================

//! ## Overview
//! [`InvocationGateway::invoke`] runs a fixed pipeline: credential validation,
//! tool resolution, permission check, schema validation, handler dispatch.
//! Authentication precedes resolution so unknown and known tool names are
//! indistinguishable to unauthenticated callers. An [`AuditGuard`] appends
//! exactly one record per request, including when the request future is
//! dropped mid-flight (recorded as `cancelled`).
//! Security posture: handler failures never leak internal detail; the caller
//! sees only a public message.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use serde_json::Map;
use serde_json::Value;

use crate::audit::ANONYMOUS_SUBJECT;
use crate::audit::AuditOutcome;
use crate::audit::AuditRecord;
use crate::audit::AuditSink;
use crate::auth::Credential;
use crate::auth::CredentialValidator;
use crate::auth::Identity;
use crate::auth::Unauthenticated;
use crate::envelope::AUTH_FAILED_MESSAGE;
use crate::envelope::FORBIDDEN_MESSAGE;
use crate::envelope::FailureCode;
use crate::envelope::InvocationResult;
use crate::registry::GENERIC_HANDLER_MESSAGE;
use crate::registry::ToolHandler;
use crate::registry::ToolRegistry;
use crate::registry::ToolSummary;

// ============================================================================
// SECTION: Request
// ============================================================================

/// One tool invocation as received from a transport.
#[derive(Debug, Clone)]
pub struct InvocationRequest {
    /// Requested tool name.
    pub tool_name: String,
    /// Tool arguments (`null` is treated as `{}`).
    pub arguments: Value,
    /// Bearer credential, if supplied.
    pub credential: Option<Credential>,
    /// Request identifier for correlation.
    pub request_id: Option<String>,
    /// Transport label for auditing.
    pub transport: &'static str,
}

impl InvocationRequest {
    /// Builds a request without credential or correlation data.
    #[must_use]
    pub fn new(tool_name: impl Into<String>, arguments: Value) -> Self {
        Self {
            tool_name: tool_name.into(),
            arguments,
            credential: None,
            request_id: None,
            transport: "direct",
        }
    }

    /// Returns a copy with the credential set.
    #[must_use]
    pub fn with_credential(mut self, credential: Option<Credential>) -> Self {
        self.credential = credential;
        self
    }

    /// Returns a copy with the request identifier set.
    #[must_use]
    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = Some(request_id.into());
        self
    }

    /// Returns a copy with the transport label set.
    #[must_use]
    pub const fn with_transport(mut self, transport: &'static str) -> Self {
        self.transport = transport;
        self
    }
}

// ============================================================================
// SECTION: Gateway
// ============================================================================

/// Request-parallel invocation pipeline over an immutable registry.
#[derive(Clone)]
pub struct InvocationGateway {
    /// Registered tools.
    registry: Arc<ToolRegistry>,
    /// Credential validator.
    validator: CredentialValidator,
    /// Audit destination.
    audit: Arc<dyn AuditSink>,
    /// Allow discovery without credentials.
    public_discovery: bool,
}

impl InvocationGateway {
    /// Builds a gateway.
    #[must_use]
    pub fn new(
        registry: Arc<ToolRegistry>,
        validator: CredentialValidator,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        Self {
            registry,
            validator,
            audit,
            public_discovery: false,
        }
    }

    /// Returns a copy with public discovery toggled.
    #[must_use]
    pub const fn with_public_discovery(mut self, public_discovery: bool) -> Self {
        self.public_discovery = public_discovery;
        self
    }

    /// Returns true when discovery does not require a credential.
    #[must_use]
    pub const fn public_discovery(&self) -> bool {
        self.public_discovery
    }

    /// Returns the registry.
    #[must_use]
    pub const fn registry(&self) -> &Arc<ToolRegistry> {
        &self.registry
    }

    /// Lists tools for discovery.
    ///
    /// # Errors
    ///
    /// Returns [`Unauthenticated`] when discovery is private and the
    /// credential does not validate.
    pub async fn list_tools(
        &self,
        credential: Option<&Credential>,
        request_id: Option<&str>,
    ) -> Result<Vec<ToolSummary>, Unauthenticated> {
        if !self.public_discovery {
            self.validator.validate(credential, request_id).await?;
        }
        Ok(self.registry.list_all().iter().map(|tool| tool.summary()).collect())
    }

    /// Invokes a tool. Always returns a result and always appends one audit
    /// record, even if this future is dropped before completion.
    pub async fn invoke(&self, request: InvocationRequest) -> InvocationResult {
        let InvocationRequest {
            tool_name,
            arguments,
            credential,
            request_id,
            transport,
        } = request;
        let arguments = normalize_arguments(arguments);
        let mut record = AuditRecord::new(
            ANONYMOUS_SUBJECT,
            tool_name.clone(),
            arguments.clone(),
            AuditOutcome::Cancelled,
            transport,
        );
        record.credential_fingerprint = credential.as_ref().map(Credential::fingerprint);
        record.request_id.clone_from(&request_id);
        let mut guard = AuditGuard::new(Arc::clone(&self.audit), record);

        let result = self
            .run(&tool_name, arguments, credential.as_ref(), request_id.as_deref(), &mut guard)
            .await;
        tracing::debug!(
            tool = %tool_name,
            request_id = request_id.as_deref(),
            transport,
            failure_code = result.failure_code().map(FailureCode::as_str),
            "invocation completed"
        );
        guard.finish(&result);
        result
    }

    /// Runs the pipeline steps in order.
    async fn run(
        &self,
        tool_name: &str,
        arguments: Value,
        credential: Option<&Credential>,
        request_id: Option<&str>,
        guard: &mut AuditGuard,
    ) -> InvocationResult {
        let identity = match self.validator.validate(credential, request_id).await {
            Ok(identity) => identity,
            Err(_) => return InvocationResult::failure(FailureCode::AuthFailed, AUTH_FAILED_MESSAGE),
        };
        guard.set_subject(&identity.subject);

        let Ok(descriptor) = self.registry.resolve(tool_name) else {
            return InvocationResult::failure(
                FailureCode::UnknownTool,
                format!("unknown tool: {tool_name}"),
            );
        };
        if !identity.has_all(descriptor.required_permissions()) {
            return InvocationResult::failure(FailureCode::Forbidden, FORBIDDEN_MESSAGE);
        }
        if let Err(message) = descriptor.validate_arguments(&arguments) {
            return InvocationResult::failure(FailureCode::InvalidArguments, message);
        }
        dispatch(descriptor.handler().as_ref(), tool_name, &identity, arguments).await
    }
}

/// Calls the handler, converting faults and panics to failures.
async fn dispatch(
    handler: &dyn ToolHandler,
    tool_name: &str,
    identity: &Identity,
    arguments: Value,
) -> InvocationResult {
    match AssertUnwindSafe(handler.call(identity, arguments)).catch_unwind().await {
        Ok(Ok(payload)) => InvocationResult::success(payload),
        Ok(Err(fault)) => {
            tracing::warn!(
                tool = %tool_name,
                subject = %identity.subject,
                error = %fault,
                "tool handler failed"
            );
            InvocationResult::failure(FailureCode::HandlerError, fault.public_message())
        }
        Err(_) => {
            tracing::error!(tool = %tool_name, subject = %identity.subject, "tool handler panicked");
            InvocationResult::failure(FailureCode::HandlerError, GENERIC_HANDLER_MESSAGE)
        }
    }
}

// ============================================================================
// SECTION: Audit Guard
// ============================================================================

/// Appends the pending record on completion, or as `cancelled` on drop.
struct AuditGuard {
    /// Destination sink.
    sink: Arc<dyn AuditSink>,
    /// Record not yet appended.
    record: Option<AuditRecord>,
}

impl AuditGuard {
    /// Arms the guard with a pending record.
    const fn new(sink: Arc<dyn AuditSink>, record: AuditRecord) -> Self {
        Self {
            sink,
            record: Some(record),
        }
    }

    /// Records the authenticated subject.
    fn set_subject(&mut self, subject: &str) {
        if let Some(record) = self.record.as_mut() {
            subject.clone_into(&mut record.subject);
        }
    }

    /// Appends the record with the final outcome.
    fn finish(&mut self, result: &InvocationResult) {
        if let Some(mut record) = self.record.take() {
            record.outcome = if result.is_success() {
                AuditOutcome::Success
            } else {
                AuditOutcome::Failure
            };
            record.failure_code = result.failure_code();
            self.sink.append(record);
        }
    }
}

impl Drop for AuditGuard {
    fn drop(&mut self) {
        if let Some(record) = self.record.take() {
            tracing::debug!(tool = %record.tool_name, "invocation cancelled before completion");
            self.sink.append(record);
        }
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Treats `null` arguments as an empty object.
fn normalize_arguments(arguments: Value) -> Value {
    match arguments {
        Value::Null => Value::Object(Map::new()),
        other => other,
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
