// crates/toolgate-tools/src/greeting.rs
// ============================================================================
// Module: Greeting Tool
// Description: `hello_world` greeting tool.
// Purpose: Minimal tool for connectivity checks.
// Dependencies: toolgate-mcp, serde_json
// ============================================================================

use serde_json::Value;
use serde_json::json;
use toolgate_mcp::FnToolHandler;
use toolgate_mcp::RegistryError;
use toolgate_mcp::ToolDescriptor;
use toolgate_mcp::ToolFault;

use crate::args::optional_string_arg;

/// Tool name.
pub const HELLO_WORLD: &str = "hello_world";
/// Name used when the caller supplies none.
const DEFAULT_NAME: &str = "World";

/// Builds the `hello_world` descriptor.
///
/// # Errors
///
/// Returns [`RegistryError`] when the descriptor is rejected.
pub fn descriptor() -> Result<ToolDescriptor, RegistryError> {
    let schema = json!({
        "type": "object",
        "properties": { "name": { "type": "string", "maxLength": 256 } },
        "additionalProperties": false
    });
    let handler = FnToolHandler::shared(|_caller, arguments| async move { hello_world(&arguments) });
    ToolDescriptor::new(HELLO_WORLD, "Greets the named person", schema, handler)
}

/// Returns `"Hello, <name>!"`.
///
/// # Errors
///
/// Returns [`ToolFault`] when `name` is not a string.
pub fn hello_world(arguments: &Value) -> Result<Value, ToolFault> {
    let name = optional_string_arg(arguments, "name")?.unwrap_or(DEFAULT_NAME);
    Ok(Value::String(format!("Hello, {name}!")))
}
