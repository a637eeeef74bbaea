// crates/toolgate-mcp/src/envelope.rs
// ============================================================================
// Module: Invocation Envelope
// Description: Uniform success/failure results returned for every invocation.
// Purpose: Give callers one stable, machine-readable result shape.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! Every invocation yields exactly one [`InvocationResult`]. On the wire it is
//! rendered as `{ "success": true, "result": ... }` or
//! `{ "success": false, "error": "...", "code": "AUTH_FAILED" }`.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Message returned for every authentication failure.
pub const AUTH_FAILED_MESSAGE: &str = "authentication failed";
/// Message returned when the caller lacks a required permission.
pub const FORBIDDEN_MESSAGE: &str = "insufficient permissions";

// ============================================================================
// SECTION: Types
// ============================================================================

/// Failure taxonomy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FailureCode {
    /// Credential missing, malformed, rejected, or unverifiable.
    AuthFailed,
    /// No tool registered under the requested name.
    UnknownTool,
    /// Arguments violate the tool's input schema.
    InvalidArguments,
    /// The handler failed or panicked.
    HandlerError,
    /// The request could not be framed or parsed.
    MalformedRequest,
    /// The caller lacks a permission the tool requires.
    Forbidden,
}

impl FailureCode {
    /// Returns the wire label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::AuthFailed => "AUTH_FAILED",
            Self::UnknownTool => "UNKNOWN_TOOL",
            Self::InvalidArguments => "INVALID_ARGUMENTS",
            Self::HandlerError => "HANDLER_ERROR",
            Self::MalformedRequest => "MALFORMED_REQUEST",
            Self::Forbidden => "FORBIDDEN",
        }
    }
}

/// Outcome of one invocation.
#[derive(Debug, Clone, PartialEq)]
pub enum InvocationResult {
    /// Handler returned a payload.
    Success {
        /// Tool output.
        payload: Value,
    },
    /// Invocation failed.
    Failure {
        /// Failure classification.
        code: FailureCode,
        /// Caller-safe message.
        message: String,
    },
}

impl InvocationResult {
    /// Builds a success result.
    #[must_use]
    pub const fn success(payload: Value) -> Self {
        Self::Success {
            payload,
        }
    }

    /// Builds a failure result.
    #[must_use]
    pub fn failure(code: FailureCode, message: impl Into<String>) -> Self {
        Self::Failure {
            code,
            message: message.into(),
        }
    }

    /// Returns true for success results.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    /// Returns the failure code, if any.
    #[must_use]
    pub const fn failure_code(&self) -> Option<FailureCode> {
        match self {
            Self::Success { .. } => None,
            Self::Failure {
                code, ..
            } => Some(*code),
        }
    }

    /// Renders the wire envelope.
    #[must_use]
    pub fn to_envelope(&self) -> Envelope {
        match self {
            Self::Success {
                payload,
            } => Envelope {
                success: true,
                result: Some(payload.clone()),
                error: None,
                code: None,
            },
            Self::Failure {
                code,
                message,
            } => Envelope {
                success: false,
                result: None,
                error: Some(message.clone()),
                code: Some(*code),
            },
        }
    }
}

/// Wire form of an [`InvocationResult`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    /// True when the handler succeeded.
    pub success: bool,
    /// Tool output on success.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    /// Caller-safe message on failure.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Failure classification.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<FailureCode>,
}

impl Envelope {
    /// Converts the envelope back into a result.
    #[must_use]
    pub fn into_result(self) -> InvocationResult {
        if self.success {
            return InvocationResult::success(self.result.unwrap_or(Value::Null));
        }
        InvocationResult::failure(
            self.code.unwrap_or(FailureCode::HandlerError),
            self.error.unwrap_or_default(),
        )
    }

    /// Serializes the envelope to a JSON value.
    #[must_use]
    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}
