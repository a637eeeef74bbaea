// crates/toolgate-tools/src/energy.rs
// ============================================================================
// Module: Energy Report Tool
// Description: Energy consumption and cost report over a date range.
// Purpose: Serve `get_energy_consumption_or_cost_data`.
// Dependencies: toolgate-mcp, serde_json, time
// ============================================================================

//! ## Overview
//! Reports energy consumption (`viewBy = 0`) or cost (`viewBy = 1`) between
//! two `YYYY-MM-DD` dates. `endDate` defaults to today (UTC). The figures
//! are fixed demo values; the tool exists to exercise date validation and
//! defaulted arguments.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde_json::Value;
use serde_json::json;
use time::Date;
use time::OffsetDateTime;
use time::format_description::BorrowedFormatItem;
use time::macros::format_description;
use toolgate_mcp::FnToolHandler;
use toolgate_mcp::RegistryError;
use toolgate_mcp::ToolDescriptor;
use toolgate_mcp::ToolFault;

use crate::args::optional_string_arg;
use crate::args::required_string_arg;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Tool name.
pub const ENERGY_REPORT: &str = "get_energy_consumption_or_cost_data";
/// `YYYY-MM-DD`.
const DATE_FORMAT: &[BorrowedFormatItem<'static>] = format_description!("[year]-[month]-[day]");
/// Reported consumption for any range.
const CONSUMPTION_KWH: u32 = 200;
/// Reported cost for any range.
const COST_RUPEES: u32 = 200;

// ============================================================================
// SECTION: Tool
// ============================================================================

/// Builds the energy report descriptor.
///
/// # Errors
///
/// Returns [`RegistryError`] when the descriptor is rejected.
pub fn descriptor() -> Result<ToolDescriptor, RegistryError> {
    let schema = json!({
        "type": "object",
        "properties": {
            "startDate": {
                "type": "string",
                "pattern": "^[0-9]{4}-[0-9]{2}-[0-9]{2}$",
                "description": "First day of the range (YYYY-MM-DD)"
            },
            "endDate": {
                "type": "string",
                "pattern": "^[0-9]{4}-[0-9]{2}-[0-9]{2}$",
                "description": "Last day of the range (YYYY-MM-DD); defaults to today"
            },
            "viewBy": {
                "type": "integer",
                "minimum": 0,
                "maximum": 1,
                "description": "0 for energy consumption, 1 for energy cost"
            }
        },
        "required": ["startDate"],
        "additionalProperties": false
    });
    let handler =
        FnToolHandler::shared(|_caller, arguments| async move { energy_report(&arguments) });
    ToolDescriptor::new(
        ENERGY_REPORT,
        "Get the energy consumption or cost data for a date range",
        schema,
        handler,
    )
}

/// Produces the report for the requested range.
///
/// # Errors
///
/// Returns [`ToolFault`] for unparseable dates, an inverted range, or an
/// unknown `viewBy`.
pub fn energy_report(arguments: &Value) -> Result<Value, ToolFault> {
    let start = parse_date("startDate", required_string_arg(arguments, "startDate")?)?;
    let end = match optional_string_arg(arguments, "endDate")? {
        Some(text) => parse_date("endDate", text)?,
        None => OffsetDateTime::now_utc().date(),
    };
    if end < start {
        return Err(ToolFault::user("endDate must not be before startDate"));
    }
    let view_by = match arguments.get("viewBy") {
        None | Some(Value::Null) => 0,
        Some(value) => value.as_u64().ok_or_else(|| ToolFault::user("viewBy must be 0 or 1"))?,
    };
    let start_text = format_date(start)?;
    let end_text = format_date(end)?;
    let summary = match view_by {
        0 => format!("Energy consumption from {start_text} to {end_text} is {CONSUMPTION_KWH}kWh"),
        1 => format!("Energy cost from {start_text} to {end_text} is {COST_RUPEES} rupees"),
        _ => return Err(ToolFault::user("viewBy must be 0 or 1")),
    };
    Ok(json!({
        "startDate": start_text,
        "endDate": end_text,
        "viewBy": view_by,
        "result": summary,
    }))
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Parses a `YYYY-MM-DD` calendar date.
fn parse_date(field: &str, text: &str) -> Result<Date, ToolFault> {
    Date::parse(text, DATE_FORMAT)
        .map_err(|_| ToolFault::user(format!("{field} must be a valid YYYY-MM-DD date")))
}

/// Formats a date as `YYYY-MM-DD`.
fn format_date(date: Date) -> Result<String, ToolFault> {
    date.format(DATE_FORMAT)
        .map_err(|err| ToolFault::internal(format!("date formatting failed: {err}")))
}
