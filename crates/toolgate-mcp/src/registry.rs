// crates/toolgate-mcp/src/registry.rs
// ============================================================================
// Module: Tool Registry
// Description: Named, schema-described tool descriptors and their handlers.
// Purpose: Resolve tool names to immutable descriptors shared across requests.
// Dependencies: async-trait, jsonschema, serde_json
// ============================================================================

//! ## Overview
//! Tools are registered once at startup and the registry is shared immutably
//! afterwards. Each descriptor carries a compiled JSON Schema (draft 2020-12)
//! used to validate arguments before the handler ever sees them.
//! Security posture: tool arguments are untrusted; validation happens in the
//! gateway before dispatch.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::BoxFuture;
use jsonschema::Draft;
use jsonschema::Validator;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::auth::Identity;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Maximum tool name length in characters.
pub const MAX_TOOL_NAME_LENGTH: usize = 128;
/// Public message returned when a handler fails without a caller-safe message.
pub const GENERIC_HANDLER_MESSAGE: &str = "tool execution failed";

// ============================================================================
// SECTION: Handler Trait
// ============================================================================

/// Executes a tool on behalf of an authenticated caller.
#[async_trait]
pub trait ToolHandler: Send + Sync {
    /// Runs the tool with schema-validated arguments.
    ///
    /// # Errors
    ///
    /// Returns [`ToolFault`] when the tool cannot produce a result.
    async fn call(&self, caller: &Identity, arguments: Value) -> Result<Value, ToolFault>;
}

/// Boxed closure signature used by [`FnToolHandler`].
type BoxedToolFn =
    Box<dyn Fn(Identity, Value) -> BoxFuture<'static, Result<Value, ToolFault>> + Send + Sync>;

/// Adapts an async closure into a [`ToolHandler`].
pub struct FnToolHandler {
    /// Wrapped closure.
    func: BoxedToolFn,
}

impl FnToolHandler {
    /// Wraps an async closure taking `(caller, arguments)`.
    pub fn new<F, Fut>(func: F) -> Self
    where
        F: Fn(Identity, Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, ToolFault>> + Send + 'static,
    {
        Self {
            func: Box::new(move |caller, arguments| Box::pin(func(caller, arguments))),
        }
    }

    /// Wraps an async closure and returns it as a shared handler.
    pub fn shared<F, Fut>(func: F) -> Arc<dyn ToolHandler>
    where
        F: Fn(Identity, Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, ToolFault>> + Send + 'static,
    {
        Arc::new(Self::new(func))
    }
}

#[async_trait]
impl ToolHandler for FnToolHandler {
    async fn call(&self, caller: &Identity, arguments: Value) -> Result<Value, ToolFault> {
        (self.func)(caller.clone(), arguments).await
    }
}

/// Failure raised by a tool handler.
#[derive(Debug, Error)]
pub enum ToolFault {
    /// Failure whose message is safe to return to the caller.
    #[error("{0}")]
    User(String),
    /// Internal failure; detail stays in the diagnostic log.
    #[error("internal tool error: {0}")]
    Internal(String),
}

impl ToolFault {
    /// Builds a fault with a caller-visible message.
    #[must_use]
    pub fn user(message: impl Into<String>) -> Self {
        Self::User(message.into())
    }

    /// Builds a fault whose detail must not reach the caller.
    #[must_use]
    pub fn internal(detail: impl Into<String>) -> Self {
        Self::Internal(detail.into())
    }

    /// Returns the message exposed in the invocation envelope.
    #[must_use]
    pub fn public_message(&self) -> &str {
        match self {
            Self::User(message) => message,
            Self::Internal(_) => GENERIC_HANDLER_MESSAGE,
        }
    }
}

// ============================================================================
// SECTION: Descriptors
// ============================================================================

/// A registered tool: name, description, input schema, and handler.
pub struct ToolDescriptor {
    /// Unique tool name.
    name: String,
    /// Human-readable description.
    description: String,
    /// Raw JSON Schema for the arguments object.
    input_schema: Value,
    /// Permissions the caller must hold.
    required_permissions: BTreeSet<String>,
    /// Compiled schema validator.
    validator: Validator,
    /// Tool implementation.
    handler: Arc<dyn ToolHandler>,
}

impl ToolDescriptor {
    /// Builds a descriptor and compiles its input schema.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::InvalidToolName`] for malformed names and
    /// [`RegistryError::InvalidSchema`] when the schema does not compile or
    /// does not describe an object.
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        input_schema: Value,
        handler: Arc<dyn ToolHandler>,
    ) -> Result<Self, RegistryError> {
        let name = name.into();
        validate_tool_name(&name)?;
        if !input_schema.is_object() || !schema_is_object(&input_schema) {
            return Err(RegistryError::InvalidSchema {
                name,
                reason: "input schema must describe an object".to_string(),
            });
        }
        let validator = compile_schema(&input_schema).map_err(|reason| {
            RegistryError::InvalidSchema {
                name: name.clone(),
                reason,
            }
        })?;
        Ok(Self {
            name,
            description: description.into(),
            input_schema,
            required_permissions: BTreeSet::new(),
            validator,
            handler,
        })
    }

    /// Adds a permission the caller must hold to invoke the tool.
    #[must_use]
    pub fn with_permission(mut self, permission: impl Into<String>) -> Self {
        self.required_permissions.insert(permission.into());
        self
    }

    /// Returns the tool name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the tool description.
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Returns the raw input schema.
    #[must_use]
    pub const fn input_schema(&self) -> &Value {
        &self.input_schema
    }

    /// Returns the permissions required to invoke the tool.
    #[must_use]
    pub const fn required_permissions(&self) -> &BTreeSet<String> {
        &self.required_permissions
    }

    /// Returns the tool handler.
    #[must_use]
    pub const fn handler(&self) -> &Arc<dyn ToolHandler> {
        &self.handler
    }

    /// Validates arguments against the compiled schema.
    ///
    /// # Errors
    ///
    /// Returns the first schema violation as a message.
    pub fn validate_arguments(&self, arguments: &Value) -> Result<(), String> {
        match self.validator.iter_errors(arguments).next() {
            None => Ok(()),
            Some(error) => Err(format!("invalid arguments: {error}")),
        }
    }

    /// Returns the discovery view of the descriptor.
    #[must_use]
    pub fn summary(&self) -> ToolSummary {
        ToolSummary {
            name: self.name.clone(),
            description: self.description.clone(),
            input_schema: self.input_schema.clone(),
        }
    }
}

impl fmt::Debug for ToolDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ToolDescriptor")
            .field("name", &self.name)
            .field("description", &self.description)
            .field("required_permissions", &self.required_permissions)
            .finish_non_exhaustive()
    }
}

/// Discovery entry returned by `tools/list`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolSummary {
    /// Tool name.
    pub name: String,
    /// Tool description.
    pub description: String,
    /// Tool input schema.
    #[serde(rename = "inputSchema")]
    pub input_schema: Value,
}

// ============================================================================
// SECTION: Registry
// ============================================================================

/// Insertion-ordered tool registry keyed by unique name.
#[derive(Debug, Default)]
pub struct ToolRegistry {
    /// Descriptors in registration order.
    tools: Vec<Arc<ToolDescriptor>>,
    /// Name to position in `tools`.
    index: BTreeMap<String, usize>,
}

impl ToolRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a descriptor.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::DuplicateToolName`] when the name exists.
    pub fn register(&mut self, descriptor: ToolDescriptor) -> Result<(), RegistryError> {
        if self.index.contains_key(descriptor.name()) {
            return Err(RegistryError::DuplicateToolName(descriptor.name().to_string()));
        }
        self.index.insert(descriptor.name().to_string(), self.tools.len());
        self.tools.push(Arc::new(descriptor));
        Ok(())
    }

    /// Resolves a tool by name.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::NotFound`] when no tool has that name.
    pub fn resolve(&self, name: &str) -> Result<Arc<ToolDescriptor>, RegistryError> {
        self.index
            .get(name)
            .and_then(|position| self.tools.get(*position))
            .map(Arc::clone)
            .ok_or_else(|| RegistryError::NotFound(name.to_string()))
    }

    /// Returns all descriptors in registration order.
    #[must_use]
    pub fn list_all(&self) -> &[Arc<ToolDescriptor>] {
        &self.tools
    }

    /// Returns the number of registered tools.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Returns true when no tools are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Registry construction and lookup errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    /// A tool with the same name is already registered.
    #[error("duplicate tool name: {0}")]
    DuplicateToolName(String),
    /// No tool is registered under the name.
    #[error("tool not found: {0}")]
    NotFound(String),
    /// The tool name is empty, too long, or has invalid characters.
    #[error("invalid tool name: {0}")]
    InvalidToolName(String),
    /// The input schema failed to compile.
    #[error("invalid schema for {name}: {reason}")]
    InvalidSchema {
        /// Tool name.
        name: String,
        /// Compilation failure detail.
        reason: String,
    },
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Checks tool name length and character set.
fn validate_tool_name(name: &str) -> Result<(), RegistryError> {
    let length = name.chars().count();
    if length == 0 || length > MAX_TOOL_NAME_LENGTH {
        return Err(RegistryError::InvalidToolName(name.to_string()));
    }
    if !name.chars().all(|ch| ch.is_ascii_alphanumeric() || matches!(ch, '_' | '.' | '-')) {
        return Err(RegistryError::InvalidToolName(name.to_string()));
    }
    Ok(())
}

/// Returns true if a schema represents an object.
fn schema_is_object(schema: &Value) -> bool {
    if let Some(kind) = schema.get("type").and_then(Value::as_str) {
        return kind == "object";
    }
    if let Some(kinds) = schema.get("type").and_then(Value::as_array) {
        return kinds.iter().any(|kind| kind.as_str() == Some("object"));
    }
    schema.get("properties").is_some()
}

/// Compiles a JSON schema for validation.
fn compile_schema(schema: &Value) -> Result<Validator, String> {
    jsonschema::options()
        .with_draft(Draft::Draft202012)
        .build(schema)
        .map_err(|err| err.to_string())
}

// ============================================================================
// SECTION: Tests
// ============================================================================
