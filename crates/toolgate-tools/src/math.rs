// crates/toolgate-tools/src/math.rs
// ============================================================================
// Module: Math Tools
// Description: Arithmetic tools with caller attribution.
// Purpose: Provide add/subtract/multiply/divide/power/square_root/factorial.
// Dependencies: toolgate-mcp, serde_json, time
// ============================================================================

//! ## Overview
//! Every math tool returns the same report shape: `operation`, `operands`,
//! `result`, `performed_by` (the authenticated subject) and an RFC 3339
//! `timestamp`. Integer operands stay integers while the result fits in
//! `i64`; otherwise arithmetic falls back to `f64`. Non-finite results are
//! caller faults. All math tools require the `math` permission.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::num::FpCategory;
use std::sync::Arc;

use serde_json::Number;
use serde_json::Value;
use serde_json::json;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use toolgate_mcp::FnToolHandler;
use toolgate_mcp::Identity;
use toolgate_mcp::RegistryError;
use toolgate_mcp::ToolDescriptor;
use toolgate_mcp::ToolFault;
use toolgate_mcp::ToolHandler;

use crate::args::number_arg;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Permission required by every math tool.
pub const MATH_PERMISSION: &str = "math";
/// Largest input accepted by `factorial` (20! is the largest that fits `u64`).
pub const MAX_FACTORIAL_INPUT: u64 = 20;
/// Names of the math tools, in registration order.
pub const MATH_TOOLS: &[&str] = &[
    "add_numbers",
    "subtract_numbers",
    "multiply_numbers",
    "divide_numbers",
    "power",
    "square_root",
    "factorial",
];

/// Signature shared by the synchronous math operations.
type MathOp = fn(&Identity, &Value) -> Result<Value, ToolFault>;

// ============================================================================
// SECTION: Descriptors
// ============================================================================

/// Builds the descriptor for a math tool by name.
///
/// # Errors
///
/// Returns [`RegistryError`] when `name` is not a math tool.
pub fn descriptor(name: &str) -> Result<ToolDescriptor, RegistryError> {
    let (description, schema, op): (&str, Value, MathOp) = match name {
        "add_numbers" => ("Add two numbers together", pair_schema("a", "b"), add_numbers),
        "subtract_numbers" => (
            "Subtract the second number from the first",
            pair_schema("num1", "num2"),
            subtract_numbers,
        ),
        "multiply_numbers" => {
            ("Multiply two numbers", pair_schema("num1", "num2"), multiply_numbers)
        }
        "divide_numbers" => (
            "Divide the first number by the second",
            pair_schema("num1", "num2"),
            divide_numbers,
        ),
        "power" => ("Raise base to the given exponent", pair_schema("base", "exponent"), power),
        "square_root" => (
            "Square root of a non-negative number",
            json!({
                "type": "object",
                "properties": { "number": { "type": "number", "minimum": 0 } },
                "required": ["number"],
                "additionalProperties": false
            }),
            square_root,
        ),
        "factorial" => (
            "Factorial of an integer between 0 and 20",
            json!({
                "type": "object",
                "properties": {
                    "number": { "type": "integer", "minimum": 0, "maximum": MAX_FACTORIAL_INPUT }
                },
                "required": ["number"],
                "additionalProperties": false
            }),
            factorial,
        ),
        other => return Err(RegistryError::NotFound(other.to_string())),
    };
    Ok(ToolDescriptor::new(name, description, schema, handler(op))?.with_permission(MATH_PERMISSION))
}

/// Wraps a synchronous operation as a tool handler.
fn handler(op: MathOp) -> Arc<dyn ToolHandler> {
    FnToolHandler::shared(move |caller, arguments| async move { op(&caller, &arguments) })
}

/// Schema for two required numeric fields.
fn pair_schema(first: &str, second: &str) -> Value {
    json!({
        "type": "object",
        "properties": {
            first: { "type": "number" },
            second: { "type": "number" }
        },
        "required": [first, second],
        "additionalProperties": false
    })
}

// ============================================================================
// SECTION: Operations
// ============================================================================

/// `add_numbers(a, b)`.
///
/// # Errors
///
/// Returns [`ToolFault`] when an operand is missing or the sum is not finite.
pub fn add_numbers(caller: &Identity, arguments: &Value) -> Result<Value, ToolFault> {
    let a = number_arg(arguments, "a")?;
    let b = number_arg(arguments, "b")?;
    let result = combine(a, b, i64::checked_add, |x, y| x + y)?;
    report("addition", &[a, b], result, caller)
}

/// `subtract_numbers(num1, num2)`.
///
/// # Errors
///
/// Returns [`ToolFault`] when an operand is missing or the result is not finite.
pub fn subtract_numbers(caller: &Identity, arguments: &Value) -> Result<Value, ToolFault> {
    let a = number_arg(arguments, "num1")?;
    let b = number_arg(arguments, "num2")?;
    let result = combine(a, b, i64::checked_sub, |x, y| x - y)?;
    report("subtraction", &[a, b], result, caller)
}

/// `multiply_numbers(num1, num2)`.
///
/// # Errors
///
/// Returns [`ToolFault`] when an operand is missing or the product is not finite.
pub fn multiply_numbers(caller: &Identity, arguments: &Value) -> Result<Value, ToolFault> {
    let a = number_arg(arguments, "num1")?;
    let b = number_arg(arguments, "num2")?;
    let result = combine(a, b, i64::checked_mul, |x, y| x * y)?;
    report("multiplication", &[a, b], result, caller)
}

/// `divide_numbers(num1, num2)`; exact integer quotients stay integers.
///
/// # Errors
///
/// Returns [`ToolFault`] on division by zero.
pub fn divide_numbers(caller: &Identity, arguments: &Value) -> Result<Value, ToolFault> {
    let a = number_arg(arguments, "num1")?;
    let b = number_arg(arguments, "num2")?;
    if matches!(as_f64(b)?.classify(), FpCategory::Zero) {
        return Err(ToolFault::user("division by zero"));
    }
    let exact = |x: i64, y: i64| match x.checked_rem(y) {
        Some(0) => x.checked_div(y),
        _ => None,
    };
    let result = combine(a, b, exact, |x, y| x / y)?;
    report("division", &[a, b], result, caller)
}

/// `power(base, exponent)`.
///
/// # Errors
///
/// Returns [`ToolFault`] when the result is not finite.
pub fn power(caller: &Identity, arguments: &Value) -> Result<Value, ToolFault> {
    let base = number_arg(arguments, "base")?;
    let exponent = number_arg(arguments, "exponent")?;
    let integral = |x: i64, y: i64| u32::try_from(y).ok().and_then(|y| x.checked_pow(y));
    let result = combine(base, exponent, integral, f64::powf)?;
    report("power", &[base, exponent], result, caller)
}

/// `square_root(number)` for non-negative input.
///
/// # Errors
///
/// Returns [`ToolFault`] for negative input.
pub fn square_root(caller: &Identity, arguments: &Value) -> Result<Value, ToolFault> {
    let number = number_arg(arguments, "number")?;
    let value = as_f64(number)?;
    if value.is_sign_negative() && !matches!(value.classify(), FpCategory::Zero) {
        return Err(ToolFault::user("number must be non-negative"));
    }
    report("square_root", &[number], finite(value.sqrt())?, caller)
}

/// `factorial(number)` for integers in `0..=20`.
///
/// # Errors
///
/// Returns [`ToolFault`] when the input is not an integer in range.
pub fn factorial(caller: &Identity, arguments: &Value) -> Result<Value, ToolFault> {
    let number = number_arg(arguments, "number")?;
    let n = number
        .as_u64()
        .filter(|n| *n <= MAX_FACTORIAL_INPUT)
        .ok_or_else(|| ToolFault::user("number must be an integer between 0 and 20"))?;
    let result: u64 = (1..=n).product();
    report("factorial", &[number], Value::from(result), caller)
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Applies the integer operation when both operands are integers and it does
/// not overflow; otherwise applies the float operation.
fn combine(
    a: &Number,
    b: &Number,
    int_op: impl Fn(i64, i64) -> Option<i64>,
    float_op: impl Fn(f64, f64) -> f64,
) -> Result<Value, ToolFault> {
    if let (Some(x), Some(y)) = (a.as_i64(), b.as_i64())
        && let Some(result) = int_op(x, y)
    {
        return Ok(Value::from(result));
    }
    finite(float_op(as_f64(a)?, as_f64(b)?))
}

/// Converts an operand to `f64`.
fn as_f64(number: &Number) -> Result<f64, ToolFault> {
    number.as_f64().ok_or_else(|| ToolFault::user("operand is not representable"))
}

/// Rejects NaN and infinities.
fn finite(value: f64) -> Result<Value, ToolFault> {
    if value.is_finite() {
        Ok(Value::from(value))
    } else {
        Err(ToolFault::user("result is not a finite number"))
    }
}

/// Builds the attributed operation report.
fn report(
    operation: &str,
    operands: &[&Number],
    result: Value,
    caller: &Identity,
) -> Result<Value, ToolFault> {
    let timestamp = OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .map_err(|err| ToolFault::internal(format!("timestamp formatting failed: {err}")))?;
    Ok(json!({
        "operation": operation,
        "operands": operands,
        "result": result,
        "performed_by": caller.subject,
        "timestamp": timestamp,
    }))
}

// ============================================================================
// SECTION: Tests
// ============================================================================
