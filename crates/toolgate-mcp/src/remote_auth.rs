// crates/toolgate-mcp/src/remote_auth.rs
// ============================================================================
// Module: Remote Credential Verification
// Description: Token verification delegated to an HTTP verification service.
// Purpose: Resolve bearer tokens to identities through an external authority.
// Dependencies: reqwest, async-trait, serde
// ============================================================================

//! ## Overview
//! The remote strategy POSTs to the configured endpoint with the caller's
//! bearer token. HTTP 200 with `{username?, user_id?, permissions?}` yields an
//! identity; any other status rejects; transport errors mark the verifier
//! unavailable. Both cases fail closed at the validator.
//! Security posture: the verification service is a trust boundary; responses
//! are size-limited and parsed strictly.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use reqwest::StatusCode;
use reqwest::header::HeaderMap;
use reqwest::header::HeaderValue;
use reqwest::redirect::Policy;
use serde::Deserialize;
use serde_json::Value;

use crate::auth::AuthSetupError;
use crate::auth::Identity;
use crate::auth::TokenVerifier;
use crate::auth::VerifyError;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Maximum verification response size in bytes.
const MAX_RESPONSE_BYTES: usize = 64 * 1024;
/// Header used to propagate request identifiers.
const REQUEST_ID_HEADER: &str = "x-request-id";

// ============================================================================
// SECTION: Types
// ============================================================================

/// Verification service response body.
#[derive(Debug, Deserialize)]
struct VerificationResponse {
    /// Preferred subject.
    #[serde(default)]
    username: Option<String>,
    /// Fallback subject (string or number).
    #[serde(default)]
    user_id: Option<Value>,
    /// Granted permissions.
    #[serde(default)]
    permissions: Option<Vec<String>>,
}

/// Verifies credentials against a remote HTTP service.
#[derive(Debug)]
pub struct RemoteTokenVerifier {
    /// Verification endpoint.
    url: String,
    /// HTTP client configured with timeouts.
    client: Client,
}

impl RemoteTokenVerifier {
    /// Builds a remote verifier.
    ///
    /// # Errors
    ///
    /// Returns [`AuthSetupError::Client`] when the HTTP client cannot be built.
    pub fn new(
        url: String,
        connect_timeout: Duration,
        request_timeout: Duration,
    ) -> Result<Self, AuthSetupError> {
        let client = Client::builder()
            .connect_timeout(connect_timeout)
            .timeout(request_timeout)
            .redirect(Policy::none())
            .build()
            .map_err(|err| AuthSetupError::Client(err.to_string()))?;
        Ok(Self {
            url,
            client,
        })
    }

    /// Builds headers carrying the optional request identifier.
    fn build_headers(request_id: Option<&str>) -> HeaderMap {
        let mut headers = HeaderMap::new();
        if let Some(request_id) = sanitize_header_value(request_id)
            && let Ok(value) = HeaderValue::from_str(&request_id)
        {
            headers.insert(REQUEST_ID_HEADER, value);
        }
        headers
    }
}

#[async_trait]
impl TokenVerifier for RemoteTokenVerifier {
    fn kind(&self) -> &'static str {
        "remote"
    }

    async fn verify(&self, token: &str, request_id: Option<&str>) -> Result<Identity, VerifyError> {
        let response = self
            .client
            .post(&self.url)
            .bearer_auth(token)
            .headers(Self::build_headers(request_id))
            .send()
            .await
            .map_err(|err| VerifyError::Unavailable(err.to_string()))?;
        match response.status() {
            StatusCode::OK => {}
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                return Err(VerifyError::Rejected("verification service refused token".to_string()));
            }
            status => {
                return Err(VerifyError::Rejected(format!(
                    "verification service returned status {status}"
                )));
            }
        }
        let body = read_body_with_limit(response, MAX_RESPONSE_BYTES).await?;
        let parsed: VerificationResponse = serde_json::from_slice(&body)
            .map_err(|err| VerifyError::Rejected(format!("malformed verification response: {err}")))?;
        identity_from_response(parsed)
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Reads the response body chunk by chunk, stopping once `limit` is exceeded.
async fn read_body_with_limit(
    mut response: reqwest::Response,
    limit: usize,
) -> Result<Vec<u8>, VerifyError> {
    let mut body = Vec::new();
    while let Some(chunk) =
        response.chunk().await.map_err(|err| VerifyError::Unavailable(err.to_string()))?
    {
        if body.len().saturating_add(chunk.len()) > limit {
            return Err(VerifyError::Rejected("verification response too large".to_string()));
        }
        body.extend_from_slice(&chunk);
    }
    Ok(body)
}

/// Maps a verification response to an identity.
fn identity_from_response(response: VerificationResponse) -> Result<Identity, VerifyError> {
    let subject = response
        .username
        .filter(|name| !name.trim().is_empty())
        .or_else(|| match response.user_id {
            Some(Value::String(id)) if !id.trim().is_empty() => Some(id),
            Some(Value::Number(id)) => Some(id.to_string()),
            _ => None,
        })
        .ok_or_else(|| VerifyError::Rejected("verification response has no subject".to_string()))?;
    Ok(Identity::new(subject, response.permissions.unwrap_or_default()))
}

/// Sanitizes a header value by enforcing ASCII tchars and length bounds.
fn sanitize_header_value(value: Option<&str>) -> Option<String> {
    let value = value?.trim();
    if value.is_empty() || value.len() > 128 {
        return None;
    }
    if !value.chars().all(|ch| ch.is_ascii() && is_tchar(ch)) {
        return None;
    }
    Some(value.to_string())
}

/// Returns true when the character is a valid HTTP token character.
const fn is_tchar(ch: char) -> bool {
    ch.is_ascii_alphanumeric()
        || matches!(
            ch,
            '!' | '#'
                | '$'
                | '%'
                | '&'
                | '\''
                | '*'
                | '+'
                | '-'
                | '.'
                | '^'
                | '_'
                | '`'
                | '|'
                | '~'
        )
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests;
