// crates/toolgate-mcp/src/auth.rs
// ============================================================================
// Module: Credential Validation
// Description: Bearer credential parsing and pluggable verification strategies.
// Purpose: Derive a per-request caller identity or fail closed.
// Dependencies: async-trait, ed25519-dalek, sha2, base64, tokio
// ============================================================================

//! ## Overview
//! Every invocation carries an opaque bearer credential. The
//! [`CredentialValidator`] bounds each verification with a timeout and maps
//! every failure (missing, malformed, rejected, unavailable, timed out) to
//! [`Unauthenticated`]. The reason is logged at debug level and never reaches
//! the caller.
//! Security posture: credentials are secrets; only a SHA-256 fingerprint
//! prefix is ever logged or audited.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::fmt;
use std::fmt::Write as _;
use std::sync::Arc;
use std::time::Duration;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use ed25519_dalek::Signature;
use ed25519_dalek::Signer;
use ed25519_dalek::SigningKey;
use ed25519_dalek::VerifyingKey;
use serde::Deserialize;
use serde::Serialize;
use sha2::Digest;
use sha2::Sha256;
use thiserror::Error;
use toolgate_config::AuthConfig;
use toolgate_config::AuthMode;
use toolgate_config::ConfigError;
use toolgate_config::StaticTokenConfig;

use crate::remote_auth::RemoteTokenVerifier;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Maximum accepted credential size in bytes.
pub const MAX_CREDENTIAL_BYTES: usize = 8 * 1024;
/// Number of hex characters kept in a credential fingerprint.
const FINGERPRINT_HEX_CHARS: usize = 16;

// ============================================================================
// SECTION: Credential
// ============================================================================

/// Opaque bearer token supplied with an invocation.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    /// Wraps a raw token.
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Returns the raw token text.
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// Returns the first 16 hex characters of the token's SHA-256 digest.
    #[must_use]
    pub fn fingerprint(&self) -> String {
        let digest = Sha256::digest(self.0.as_bytes());
        let mut hex = String::with_capacity(FINGERPRINT_HEX_CHARS);
        for byte in digest.iter().take(FINGERPRINT_HEX_CHARS / 2) {
            let _ = write!(hex, "{byte:02x}");
        }
        hex
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Credential(fp:{})", self.fingerprint())
    }
}

/// Parses an `Authorization: Bearer <token>` header value.
///
/// # Errors
///
/// Returns [`Unauthenticated`] when the header is oversized or not a bearer
/// header.
pub fn parse_bearer_header(header: &str) -> Result<Credential, Unauthenticated> {
    if header.len() > MAX_CREDENTIAL_BYTES {
        return Err(Unauthenticated::Oversized);
    }
    let mut parts = header.trim().splitn(2, ' ');
    let scheme = parts.next().unwrap_or_default();
    let token = parts.next().unwrap_or_default().trim();
    if !scheme.eq_ignore_ascii_case("bearer") || token.is_empty() {
        return Err(Unauthenticated::Verify(VerifyError::Malformed(
            "invalid authorization header".to_string(),
        )));
    }
    Ok(Credential::new(token))
}

// ============================================================================
// SECTION: Identity
// ============================================================================

/// Authenticated caller identity, derived fresh for every request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Identity {
    /// Subject identifier.
    pub subject: String,
    /// Granted permissions.
    pub permissions: BTreeSet<String>,
    /// Validation time (milliseconds since epoch).
    pub validated_at_ms: u128,
}

impl Identity {
    /// Builds an identity validated now.
    pub fn new<I, P>(subject: impl Into<String>, permissions: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<String>,
    {
        Self {
            subject: subject.into(),
            permissions: permissions.into_iter().map(Into::into).collect(),
            validated_at_ms: now_millis(),
        }
    }

    /// Returns true when every required permission is held.
    #[must_use]
    pub fn has_all(&self, required: &BTreeSet<String>) -> bool {
        required.is_subset(&self.permissions)
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Verification strategy failures.
#[derive(Debug, Error)]
pub enum VerifyError {
    /// The token is structurally invalid for the strategy.
    #[error("malformed credential: {0}")]
    Malformed(String),
    /// The token is well-formed but not accepted.
    #[error("credential rejected: {0}")]
    Rejected(String),
    /// The verification backend could not be reached.
    #[error("verifier unavailable: {0}")]
    Unavailable(String),
}

/// Reasons an invocation is unauthenticated. Internal only.
#[derive(Debug, Error)]
pub enum Unauthenticated {
    /// No credential was supplied.
    #[error("missing credential")]
    Missing,
    /// Credential exceeded the size limit.
    #[error("credential too large")]
    Oversized,
    /// The strategy refused the credential.
    #[error(transparent)]
    Verify(VerifyError),
    /// Verification exceeded the configured timeout.
    #[error("credential validation timed out")]
    TimedOut,
}

/// Errors building a validator from configuration.
#[derive(Debug, Error)]
pub enum AuthSetupError {
    /// Configuration could not be interpreted.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// Public key bytes are not a valid Ed25519 point.
    #[error("invalid public key: {0}")]
    InvalidPublicKey(String),
    /// HTTP client for remote verification could not be built.
    #[error("remote verifier setup failed: {0}")]
    Client(String),
}

// ============================================================================
// SECTION: Strategy Trait
// ============================================================================

/// Pluggable credential verification strategy.
#[async_trait]
pub trait TokenVerifier: Send + Sync {
    /// Short label used in diagnostics.
    fn kind(&self) -> &'static str;

    /// Verifies a token and derives the caller identity.
    ///
    /// # Errors
    ///
    /// Returns [`VerifyError`] when the token is not accepted.
    async fn verify(&self, token: &str, request_id: Option<&str>)
    -> Result<Identity, VerifyError>;
}

// ============================================================================
// SECTION: Validator
// ============================================================================

/// Applies a verification strategy under a bounded timeout.
#[derive(Clone)]
pub struct CredentialValidator {
    /// Active strategy.
    verifier: Arc<dyn TokenVerifier>,
    /// Upper bound on one verification.
    timeout: Duration,
}

impl CredentialValidator {
    /// Builds a validator around a strategy.
    #[must_use]
    pub fn new(verifier: Arc<dyn TokenVerifier>, timeout: Duration) -> Self {
        Self {
            verifier,
            timeout,
        }
    }

    /// Builds the validator selected by configuration.
    ///
    /// # Errors
    ///
    /// Returns [`AuthSetupError`] when the strategy cannot be constructed.
    pub fn from_config(config: &AuthConfig) -> Result<Self, AuthSetupError> {
        let verifier: Arc<dyn TokenVerifier> = match config.mode {
            AuthMode::Static => {
                if config.tokens.is_empty() {
                    tracing::warn!("no static tokens configured; every invocation will fail");
                }
                Arc::new(StaticTokenVerifier::from_config(&config.tokens))
            }
            AuthMode::Signed => {
                let signed = config.signed.as_ref().ok_or_else(|| {
                    ConfigError::Invalid("auth.mode = signed requires [auth.signed]".to_string())
                })?;
                Arc::new(SignedTokenVerifier::new(
                    &signed.public_key_bytes()?,
                    signed.leeway_secs,
                )?)
            }
            AuthMode::Remote => {
                let remote = config.remote.as_ref().ok_or_else(|| {
                    ConfigError::Invalid("auth.mode = remote requires [auth.remote]".to_string())
                })?;
                Arc::new(RemoteTokenVerifier::new(
                    remote.url.clone(),
                    remote.connect_timeout(),
                    config.timeout(),
                )?)
            }
        };
        Ok(Self::new(verifier, config.timeout()))
    }

    /// Returns the configured timeout.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Validates a credential and derives the caller identity.
    ///
    /// # Errors
    ///
    /// Returns [`Unauthenticated`] for any failure, including timeouts.
    pub async fn validate(
        &self,
        credential: Option<&Credential>,
        request_id: Option<&str>,
    ) -> Result<Identity, Unauthenticated> {
        let result = self.validate_inner(credential, request_id).await;
        if let Err(reason) = &result {
            tracing::debug!(
                verifier = self.verifier.kind(),
                credential_fingerprint = credential.map(Credential::fingerprint),
                request_id,
                %reason,
                "credential validation failed"
            );
        }
        result
    }

    /// Runs the strategy without logging.
    async fn validate_inner(
        &self,
        credential: Option<&Credential>,
        request_id: Option<&str>,
    ) -> Result<Identity, Unauthenticated> {
        let credential = credential.ok_or(Unauthenticated::Missing)?;
        let token = credential.expose();
        if token.len() > MAX_CREDENTIAL_BYTES {
            return Err(Unauthenticated::Oversized);
        }
        if token.trim().is_empty() {
            return Err(Unauthenticated::Missing);
        }
        match tokio::time::timeout(self.timeout, self.verifier.verify(token, request_id)).await {
            Ok(Ok(identity)) => Ok(identity),
            Ok(Err(err)) => Err(Unauthenticated::Verify(err)),
            Err(_) => Err(Unauthenticated::TimedOut),
        }
    }
}

impl fmt::Debug for CredentialValidator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialValidator")
            .field("verifier", &self.verifier.kind())
            .field("timeout", &self.timeout)
            .finish()
    }
}

// ============================================================================
// SECTION: Static Tokens
// ============================================================================

/// Identity bound to a configured token.
#[derive(Debug, Clone)]
struct StaticEntry {
    /// Subject identifier.
    subject: String,
    /// Granted permissions.
    permissions: BTreeSet<String>,
    /// Optional expiry (seconds since epoch).
    expires_at: Option<u64>,
}

/// Configured token list matched by SHA-256 digest.
#[derive(Debug, Default)]
pub struct StaticTokenVerifier {
    /// Token digest to identity.
    entries: BTreeMap<[u8; 32], StaticEntry>,
}

impl StaticTokenVerifier {
    /// Creates an empty verifier that rejects everything.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a verifier from configured tokens.
    #[must_use]
    pub fn from_config(tokens: &[StaticTokenConfig]) -> Self {
        tokens.iter().fold(Self::new(), |verifier, entry| {
            verifier.with_token(
                &entry.token,
                entry.subject.clone(),
                entry.permissions.iter().cloned(),
                entry.expires_at,
            )
        })
    }

    /// Adds a token.
    #[must_use]
    pub fn with_token<I, P>(
        mut self,
        token: &str,
        subject: impl Into<String>,
        permissions: I,
        expires_at: Option<u64>,
    ) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<String>,
    {
        self.entries.insert(
            token_digest(token),
            StaticEntry {
                subject: subject.into(),
                permissions: permissions.into_iter().map(Into::into).collect(),
                expires_at,
            },
        );
        self
    }
}

#[async_trait]
impl TokenVerifier for StaticTokenVerifier {
    fn kind(&self) -> &'static str {
        "static"
    }

    async fn verify(
        &self,
        token: &str,
        _request_id: Option<&str>,
    ) -> Result<Identity, VerifyError> {
        let entry = self
            .entries
            .get(&token_digest(token))
            .ok_or_else(|| VerifyError::Rejected("unknown token".to_string()))?;
        if let Some(expires_at) = entry.expires_at
            && now_secs() >= expires_at
        {
            return Err(VerifyError::Rejected("token expired".to_string()));
        }
        Ok(Identity::new(entry.subject.clone(), entry.permissions.iter().cloned()))
    }
}

// ============================================================================
// SECTION: Signed Tokens
// ============================================================================

/// Claims carried by a signed token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedClaims {
    /// Subject identifier.
    pub sub: String,
    /// Granted permissions.
    #[serde(default)]
    pub permissions: Vec<String>,
    /// Expiry (seconds since epoch).
    pub exp: u64,
    /// Not-before (seconds since epoch).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nbf: Option<u64>,
}

/// Verifies `base64url(claims).base64url(signature)` tokens with Ed25519.
#[derive(Debug)]
pub struct SignedTokenVerifier {
    /// Issuer public key.
    key: VerifyingKey,
    /// Clock leeway applied to `exp` and `nbf`.
    leeway_secs: u64,
}

impl SignedTokenVerifier {
    /// Builds a verifier from raw public key bytes.
    ///
    /// # Errors
    ///
    /// Returns [`AuthSetupError::InvalidPublicKey`] when the key is invalid.
    pub fn new(public_key: &[u8; 32], leeway_secs: u64) -> Result<Self, AuthSetupError> {
        let key = VerifyingKey::from_bytes(public_key)
            .map_err(|err| AuthSetupError::InvalidPublicKey(err.to_string()))?;
        Ok(Self {
            key,
            leeway_secs,
        })
    }

    /// Checks signature and time bounds, returning the claims.
    fn check(&self, token: &str, now: u64) -> Result<SignedClaims, VerifyError> {
        let (claims_part, signature_part) = token
            .split_once('.')
            .ok_or_else(|| VerifyError::Malformed("expected claims.signature".to_string()))?;
        let signature_bytes = URL_SAFE_NO_PAD
            .decode(signature_part)
            .map_err(|_| VerifyError::Malformed("signature is not base64url".to_string()))?;
        let signature = Signature::from_slice(&signature_bytes)
            .map_err(|_| VerifyError::Malformed("signature has wrong length".to_string()))?;
        self.key
            .verify_strict(claims_part.as_bytes(), &signature)
            .map_err(|_| VerifyError::Rejected("signature mismatch".to_string()))?;
        let claims_bytes = URL_SAFE_NO_PAD
            .decode(claims_part)
            .map_err(|_| VerifyError::Malformed("claims are not base64url".to_string()))?;
        let claims: SignedClaims = serde_json::from_slice(&claims_bytes)
            .map_err(|err| VerifyError::Malformed(format!("claims: {err}")))?;
        if now > claims.exp.saturating_add(self.leeway_secs) {
            return Err(VerifyError::Rejected("token expired".to_string()));
        }
        if let Some(nbf) = claims.nbf
            && nbf > now.saturating_add(self.leeway_secs)
        {
            return Err(VerifyError::Rejected("token not yet valid".to_string()));
        }
        if claims.sub.trim().is_empty() {
            return Err(VerifyError::Malformed("empty subject".to_string()));
        }
        Ok(claims)
    }
}

#[async_trait]
impl TokenVerifier for SignedTokenVerifier {
    fn kind(&self) -> &'static str {
        "signed"
    }

    async fn verify(
        &self,
        token: &str,
        _request_id: Option<&str>,
    ) -> Result<Identity, VerifyError> {
        let claims = self.check(token, now_secs())?;
        Ok(Identity::new(claims.sub, claims.permissions))
    }
}

/// Issues a signed token for the given claims.
///
/// # Errors
///
/// Returns an error when the claims cannot be serialized.
pub fn issue_signed_token(
    key: &SigningKey,
    claims: &SignedClaims,
) -> Result<String, serde_json::Error> {
    let claims_part = URL_SAFE_NO_PAD.encode(serde_json::to_vec(claims)?);
    let signature = key.sign(claims_part.as_bytes());
    Ok(format!("{claims_part}.{}", URL_SAFE_NO_PAD.encode(signature.to_bytes())))
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// SHA-256 digest of a token.
fn token_digest(token: &str) -> [u8; 32] {
    Sha256::digest(token.as_bytes()).into()
}

/// Current time in milliseconds since the Unix epoch.
pub(crate) fn now_millis() -> u128 {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_millis()
}

/// Current time in seconds since the Unix epoch.
pub(crate) fn now_secs() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_secs()
}

// ============================================================================
// SECTION: Tests
// ============================================================================
