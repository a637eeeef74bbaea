// crates/toolgate-tools/src/args.rs
// ============================================================================
// Module: Argument Helpers
// Description: Typed accessors over schema-validated tool arguments.
// Purpose: Turn residual argument shape errors into caller-safe faults.
// Dependencies: serde_json, toolgate-mcp
// ============================================================================

use serde_json::Number;
use serde_json::Value;
use toolgate_mcp::ToolFault;

/// Reads a required numeric argument.
pub fn number_arg<'a>(arguments: &'a Value, field: &str) -> Result<&'a Number, ToolFault> {
    match arguments.get(field) {
        Some(Value::Number(number)) => Ok(number),
        _ => Err(ToolFault::user(format!("{field} must be a number"))),
    }
}

/// Reads a required string argument.
pub fn required_string_arg<'a>(arguments: &'a Value, field: &str) -> Result<&'a str, ToolFault> {
    optional_string_arg(arguments, field)?
        .ok_or_else(|| ToolFault::user(format!("{field} is required")))
}

/// Reads an optional string argument; `null` counts as absent.
pub fn optional_string_arg<'a>(
    arguments: &'a Value,
    field: &str,
) -> Result<Option<&'a str>, ToolFault> {
    match arguments.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(text)) => Ok(Some(text.as_str())),
        Some(_) => Err(ToolFault::user(format!("{field} must be a string"))),
    }
}
