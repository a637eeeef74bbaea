// crates/toolgate-tools/src/csv.rs
// ============================================================================
// Module: CSV Summary Tool
// Description: Row and column counts for CSV files in a data directory.
// Purpose: Serve `summarize_csv_file` without escaping the data directory.
// Dependencies: toolgate-mcp, tokio, serde_json
// ============================================================================

//! ## Overview
//! `summarize_csv_file(filename)` reads `<data_dir>/<filename>` and reports
//! the number of data rows (excluding the header) and header columns.
//! Security posture: `filename` must be a bare `.csv` file name. Paths,
//! traversal segments, and symlinks resolving outside `data_dir` are
//! rejected. Files are size-limited before reading.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::Component;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use serde_json::json;
use toolgate_mcp::Identity;
use toolgate_mcp::RegistryError;
use toolgate_mcp::ToolDescriptor;
use toolgate_mcp::ToolFault;
use toolgate_mcp::ToolHandler;

use crate::args::required_string_arg;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Tool name.
pub const CSV_SUMMARY: &str = "summarize_csv_file";
/// Maximum CSV file size.
pub const MAX_CSV_BYTES: u64 = 16 * 1024 * 1024;
/// Maximum file name length.
const MAX_FILENAME_LENGTH: usize = 255;

// ============================================================================
// SECTION: Tool
// ============================================================================

/// Handler for `summarize_csv_file`.
#[derive(Debug, Clone)]
pub struct CsvSummaryTool {
    /// Directory the tool may read from.
    data_dir: PathBuf,
}

impl CsvSummaryTool {
    /// Builds the tool over `data_dir`.
    #[must_use]
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    /// Wraps the tool in its descriptor.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError`] when the descriptor is rejected.
    pub fn into_descriptor(self) -> Result<ToolDescriptor, RegistryError> {
        let schema = json!({
            "type": "object",
            "properties": {
                "filename": {
                    "type": "string",
                    "minLength": 1,
                    "maxLength": MAX_FILENAME_LENGTH,
                    "description": "Name of a .csv file in the data directory (e.g. sample.csv)"
                }
            },
            "required": ["filename"],
            "additionalProperties": false
        });
        ToolDescriptor::new(
            CSV_SUMMARY,
            "Summarize a CSV file by reporting its number of rows and columns",
            schema,
            Arc::new(self),
        )
    }

    /// Resolves `filename` inside the data directory.
    async fn resolve(&self, filename: &str) -> Result<PathBuf, ToolFault> {
        validate_filename(filename)?;
        let root = tokio::fs::canonicalize(&self.data_dir)
            .await
            .map_err(|err| ToolFault::internal(format!("data directory unavailable: {err}")))?;
        let candidate = root.join(filename);
        let resolved = tokio::fs::canonicalize(&candidate)
            .await
            .map_err(|_| ToolFault::user(format!("file not found: {filename}")))?;
        if !resolved.starts_with(&root) {
            return Err(ToolFault::user("filename must stay inside the data directory"));
        }
        Ok(resolved)
    }
}

#[async_trait]
impl ToolHandler for CsvSummaryTool {
    async fn call(&self, _caller: &Identity, arguments: Value) -> Result<Value, ToolFault> {
        let filename = required_string_arg(&arguments, "filename")?;
        let path = self.resolve(filename).await?;
        let metadata = tokio::fs::metadata(&path)
            .await
            .map_err(|_| ToolFault::user(format!("file not found: {filename}")))?;
        if !metadata.is_file() {
            return Err(ToolFault::user(format!("not a file: {filename}")));
        }
        if metadata.len() > MAX_CSV_BYTES {
            return Err(ToolFault::user("file exceeds size limit"));
        }
        let bytes = tokio::fs::read(&path)
            .await
            .map_err(|err| ToolFault::internal(format!("csv read failed: {err}")))?;
        let text =
            String::from_utf8(bytes).map_err(|_| ToolFault::user("file is not valid utf-8"))?;
        let (rows, columns) = summarize(&text);
        Ok(json!({
            "filename": filename,
            "rows": rows,
            "columns": columns,
            "summary": format!("The file '{filename}' has {rows} rows and {columns} columns."),
        }))
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Accepts only bare `.csv` file names.
fn validate_filename(filename: &str) -> Result<(), ToolFault> {
    if filename.is_empty() || filename.len() > MAX_FILENAME_LENGTH {
        return Err(ToolFault::user("filename must be 1..=255 bytes"));
    }
    let mut components = Path::new(filename).components();
    let bare = matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(name)), None) if name == filename
    );
    if !bare || filename.contains(['/', '\\']) {
        return Err(ToolFault::user("filename must be a bare file name"));
    }
    let is_csv = Path::new(filename)
        .extension()
        .is_some_and(|extension| extension.eq_ignore_ascii_case("csv"));
    if !is_csv {
        return Err(ToolFault::user("only .csv files can be summarized"));
    }
    Ok(())
}

/// Returns `(data rows, header columns)`; blank lines are ignored.
fn summarize(text: &str) -> (usize, usize) {
    let mut records = text.lines().filter(|line| !line.trim().is_empty());
    let Some(header) = records.next() else {
        return (0, 0);
    };
    (records.count(), count_fields(header))
}

/// Counts comma-separated fields, ignoring commas inside double quotes.
fn count_fields(line: &str) -> usize {
    let mut in_quotes = false;
    let mut fields = 1;
    for ch in line.chars() {
        match ch {
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => fields += 1,
            _ => {}
        }
    }
    fields
}

// ============================================================================
// SECTION: Tests
// ============================================================================
