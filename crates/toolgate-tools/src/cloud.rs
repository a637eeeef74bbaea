// crates/toolgate-tools/src/cloud.rs
// ============================================================================
// Module: Cloud Version Tool
// Description: Fetches the platform version from a configured about endpoint.
// Purpose: Serve `get_cloud_version` over a shared HTTP client.
// Dependencies: toolgate-mcp, reqwest, serde_json
// ============================================================================

//! ## Overview
//! `get_cloud_version` issues `GET <cloud_version_url>` and returns the
//! `success.data` member of the JSON response. Transport and decoding
//! failures are internal faults: the caller only sees the generic handler
//! message while the detail goes to the diagnostic log.
//! Security posture: the response is untrusted and size-limited.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use reqwest::redirect::Policy;
use serde_json::Value;
use serde_json::json;
use toolgate_mcp::Identity;
use toolgate_mcp::RegistryError;
use toolgate_mcp::ToolDescriptor;
use toolgate_mcp::ToolFault;
use toolgate_mcp::ToolHandler;

use crate::registry::ToolsError;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Tool name.
pub const CLOUD_VERSION: &str = "get_cloud_version";
/// Maximum accepted response size.
const MAX_RESPONSE_BYTES: usize = 256 * 1024;

// ============================================================================
// SECTION: Tool
// ============================================================================

/// Handler for `get_cloud_version`.
#[derive(Debug, Clone)]
pub struct CloudVersionTool {
    /// About endpoint.
    url: String,
    /// Shared HTTP client.
    client: Client,
}

impl CloudVersionTool {
    /// Builds the tool with a client bounded by `timeout`.
    ///
    /// # Errors
    ///
    /// Returns [`ToolsError::Client`] when the HTTP client cannot be built.
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, ToolsError> {
        let client = Client::builder()
            .timeout(timeout)
            .redirect(Policy::none())
            .build()
            .map_err(|err| ToolsError::Client(err.to_string()))?;
        Ok(Self {
            url: url.into(),
            client,
        })
    }

    /// Wraps the tool in its descriptor.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError`] when the descriptor is rejected.
    pub fn into_descriptor(self) -> Result<ToolDescriptor, RegistryError> {
        let schema = json!({ "type": "object", "properties": {}, "additionalProperties": false });
        ToolDescriptor::new(CLOUD_VERSION, "Get the cloud platform version", schema, Arc::new(self))
    }
}

#[async_trait]
impl ToolHandler for CloudVersionTool {
    async fn call(&self, _caller: &Identity, _arguments: Value) -> Result<Value, ToolFault> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|err| ToolFault::internal(format!("cloud version request failed: {err}")))?;
        let status = response.status();
        if !status.is_success() {
            return Err(ToolFault::internal(format!("cloud version service returned {status}")));
        }
        let body = read_body_with_limit(response, MAX_RESPONSE_BYTES).await?;
        let parsed: Value = serde_json::from_slice(&body)
            .map_err(|err| ToolFault::internal(format!("cloud version response invalid: {err}")))?;
        extract_version(&parsed)
    }
}

/// Reads the response body chunk by chunk, stopping once `limit` is exceeded.
async fn read_body_with_limit(
    mut response: reqwest::Response,
    limit: usize,
) -> Result<Vec<u8>, ToolFault> {
    let mut body = Vec::new();
    while let Some(chunk) = response
        .chunk()
        .await
        .map_err(|err| ToolFault::internal(format!("cloud version read failed: {err}")))?
    {
        if body.len().saturating_add(chunk.len()) > limit {
            return Err(ToolFault::internal("cloud version response too large"));
        }
        body.extend_from_slice(&chunk);
    }
    Ok(body)
}

/// Returns `success.data` from an about response.
fn extract_version(response: &Value) -> Result<Value, ToolFault> {
    response
        .pointer("/success/data")
        .filter(|data| !data.is_null())
        .cloned()
        .ok_or_else(|| ToolFault::user("cloud version is not available"))
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests;
