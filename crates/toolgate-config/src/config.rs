// crates/toolgate-config/src/config.rs
// ============================================================================
// Module: Toolgate Configuration
// Description: Configuration loading and validation for the tool gateway.
// Purpose: Provide strict, fail-closed config parsing with hard limits.
// Dependencies: serde, toml, url, base64
// ============================================================================

//! ## Overview
//! Configuration is loaded from a TOML file with strict size and path limits.
//! Missing or invalid configuration fails closed: a gateway that cannot
//! validate credentials must refuse to start rather than admit callers.
//! Security posture: config inputs are untrusted.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::env;
use std::fs;
use std::net::IpAddr;
use std::net::SocketAddr;
use std::path::Path;
use std::path::PathBuf;
use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;
use url::Url;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default configuration filename when no path is specified.
const DEFAULT_CONFIG_NAME: &str = "toolgate.toml";
/// Environment variable used to override the config path.
pub const CONFIG_ENV_VAR: &str = "TOOLGATE_CONFIG";
/// Maximum configuration file size in bytes.
pub(crate) const MAX_CONFIG_FILE_SIZE: usize = 1024 * 1024;
/// Maximum length of a single path component.
pub(crate) const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
pub(crate) const MAX_TOTAL_PATH_LENGTH: usize = 4096;
/// Maximum length of the advertised server name.
pub(crate) const MAX_SERVER_NAME_LENGTH: usize = 128;
/// Maximum number of static bearer tokens.
pub(crate) const MAX_AUTH_TOKENS: usize = 64;
/// Maximum length of a static bearer token.
pub(crate) const MAX_AUTH_TOKEN_LENGTH: usize = 256;
/// Maximum length of a token subject.
pub(crate) const MAX_SUBJECT_LENGTH: usize = 512;
/// Maximum permissions attached to a single static token.
pub(crate) const MAX_TOKEN_PERMISSIONS: usize = 64;
/// Maximum number of HTTP gate tokens.
pub(crate) const MAX_GATE_TOKENS: usize = 16;
/// Minimum credential validation timeout in milliseconds.
pub(crate) const MIN_AUTH_TIMEOUT_MS: u64 = 1;
/// Maximum credential validation timeout in milliseconds.
pub(crate) const MAX_AUTH_TIMEOUT_MS: u64 = 30_000;
/// Minimum remote auth connect timeout in milliseconds.
pub(crate) const MIN_CONNECT_TIMEOUT_MS: u64 = 1;
/// Maximum remote auth connect timeout in milliseconds.
pub(crate) const MAX_CONNECT_TIMEOUT_MS: u64 = 10_000;
/// Maximum signed-token clock leeway in seconds.
pub(crate) const MAX_LEEWAY_SECS: u64 = 300;
/// Maximum audit buffer capacity.
pub(crate) const MAX_AUDIT_BUFFER: usize = 65_536;
/// Maximum outbound tool HTTP timeout in milliseconds.
pub(crate) const MAX_TOOL_HTTP_TIMEOUT_MS: u64 = 60_000;
/// Ed25519 public key length in bytes.
pub(crate) const ED25519_PUBLIC_KEY_LEN: usize = 32;

// ============================================================================
// SECTION: Configuration Types
// ============================================================================

/// Toolgate gateway configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GatewayConfig {
    /// Server and transport configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Credential validation configuration.
    #[serde(default)]
    pub auth: AuthConfig,
    /// Audit sink configuration.
    #[serde(default)]
    pub audit: AuditConfig,
    /// Built-in tool configuration.
    #[serde(default)]
    pub tools: ToolsConfig,
    /// Diagnostic logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl GatewayConfig {
    /// Loads configuration from disk using the default resolution rules.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when loading or validation fails.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let resolved = resolve_path(path)?;
        validate_path(&resolved)?;
        let bytes = fs::read(&resolved).map_err(|err| ConfigError::Io(err.to_string()))?;
        if bytes.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::Invalid("config file exceeds size limit".to_string()));
        }
        let content = std::str::from_utf8(&bytes)
            .map_err(|_| ConfigError::Invalid("config file must be utf-8".to_string()))?;
        Self::from_toml_str(content)
    }

    /// Parses and validates configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when parsing or validation fails.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self =
            toml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration for internal consistency.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when configuration is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.server.validate()?;
        self.auth.validate()?;
        self.audit.validate()?;
        self.tools.validate()?;
        self.logging.validate()?;
        Ok(())
    }
}

/// Server configuration for MCP transports.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// Server name advertised in `initialize` and `/health`.
    #[serde(default = "default_server_name")]
    pub name: String,
    /// Transport type for MCP.
    #[serde(default)]
    pub transport: ServerTransport,
    /// Bind address for the HTTP transport.
    #[serde(default)]
    pub bind: Option<String>,
    /// Maximum request body (or stdio frame) size in bytes.
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
    /// Framing used by the stdio transport.
    #[serde(default)]
    pub stdio_framing: StdioFraming,
    /// Allow `tools/list` without a valid credential.
    #[serde(default)]
    pub public_discovery: bool,
    /// HTTP binding options.
    #[serde(default)]
    pub http: HttpConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            name: default_server_name(),
            transport: ServerTransport::Stdio,
            bind: None,
            max_body_bytes: default_max_body_bytes(),
            stdio_framing: StdioFraming::default(),
            public_discovery: false,
            http: HttpConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Validates server transport configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        let name = self.name.trim();
        if name.is_empty() || name.len() > MAX_SERVER_NAME_LENGTH {
            return Err(ConfigError::Invalid(format!(
                "server.name must be 1..={MAX_SERVER_NAME_LENGTH} characters"
            )));
        }
        if self.max_body_bytes == 0 {
            return Err(ConfigError::Invalid(
                "max_body_bytes must be greater than zero".to_string(),
            ));
        }
        self.http.validate()?;
        match self.transport {
            ServerTransport::Http => {
                self.bind_addr()?;
            }
            ServerTransport::Stdio => {
                if !self.http.gate_tokens.is_empty() {
                    return Err(ConfigError::Invalid(
                        "stdio transport does not support http gate tokens".to_string(),
                    ));
                }
            }
        }
        Ok(())
    }

    /// Returns the parsed bind address for the HTTP transport.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the bind address is missing or invalid.
    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        let bind = self.bind.as_deref().unwrap_or_default().trim();
        if bind.is_empty() {
            return Err(ConfigError::Invalid("http transport requires bind address".to_string()));
        }
        bind.parse().map_err(|_| ConfigError::Invalid("invalid bind address".to_string()))
    }
}

/// Supported MCP transport types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ServerTransport {
    /// Use stdin/stdout transport.
    #[default]
    Stdio,
    /// Use HTTP JSON-RPC transport.
    Http,
}

impl ServerTransport {
    /// Returns a stable label for logs and audit records.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Stdio => "stdio",
            Self::Http => "http",
        }
    }
}

/// Message framing for the stdio transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum StdioFraming {
    /// One JSON message per line.
    #[default]
    Ndjson,
    /// `Content-Length` header framing.
    ContentLength,
}

/// HTTP binding options.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HttpConfig {
    /// Shared bearer tokens required by the transport gate before body parsing.
    #[serde(default)]
    pub gate_tokens: Vec<String>,
}

impl HttpConfig {
    /// Validates gate token limits.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.gate_tokens.len() > MAX_GATE_TOKENS {
            return Err(ConfigError::Invalid("too many server.http.gate_tokens".to_string()));
        }
        for token in &self.gate_tokens {
            validate_token_text("server.http.gate_tokens", token)?;
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Auth Configuration
// ============================================================================

/// Credential validation strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AuthMode {
    /// Configured bearer token list.
    #[default]
    Static,
    /// Locally verified Ed25519-signed tokens.
    Signed,
    /// Remote verification service.
    Remote,
}

impl AuthMode {
    /// Returns a stable label for logs and CLI output.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Static => "static",
            Self::Signed => "signed",
            Self::Remote => "remote",
        }
    }
}

/// Credential validation configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AuthConfig {
    /// Validation strategy.
    #[serde(default)]
    pub mode: AuthMode,
    /// Upper bound on a single validation, in milliseconds.
    #[serde(default = "default_auth_timeout_ms")]
    pub timeout_ms: u64,
    /// Static tokens (static mode).
    #[serde(default)]
    pub tokens: Vec<StaticTokenConfig>,
    /// Signed token settings (signed mode).
    #[serde(default)]
    pub signed: Option<SignedAuthConfig>,
    /// Remote verification settings (remote mode).
    #[serde(default)]
    pub remote: Option<RemoteAuthConfig>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            mode: AuthMode::Static,
            timeout_ms: default_auth_timeout_ms(),
            tokens: Vec::new(),
            signed: None,
            remote: None,
        }
    }
}

impl AuthConfig {
    /// Returns the validation timeout as a [`Duration`].
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Validates auth configuration for the selected mode.
    fn validate(&self) -> Result<(), ConfigError> {
        if !(MIN_AUTH_TIMEOUT_MS..=MAX_AUTH_TIMEOUT_MS).contains(&self.timeout_ms) {
            return Err(ConfigError::Invalid(format!(
                "auth.timeout_ms must be between {MIN_AUTH_TIMEOUT_MS} and {MAX_AUTH_TIMEOUT_MS}"
            )));
        }
        if self.tokens.len() > MAX_AUTH_TOKENS {
            return Err(ConfigError::Invalid("too many auth.tokens entries".to_string()));
        }
        for token in &self.tokens {
            token.validate()?;
        }
        match self.mode {
            AuthMode::Static => Ok(()),
            AuthMode::Signed => {
                let signed = self.signed.as_ref().ok_or_else(|| {
                    ConfigError::Invalid("auth.mode = signed requires [auth.signed]".to_string())
                })?;
                signed.validate()
            }
            AuthMode::Remote => {
                let remote = self.remote.as_ref().ok_or_else(|| {
                    ConfigError::Invalid("auth.mode = remote requires [auth.remote]".to_string())
                })?;
                remote.validate()
            }
        }
    }
}

/// A statically configured bearer token.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StaticTokenConfig {
    /// Token value presented by callers.
    pub token: String,
    /// Subject the token resolves to.
    pub subject: String,
    /// Permissions granted to the subject.
    #[serde(default)]
    pub permissions: Vec<String>,
    /// Optional expiry, seconds since the Unix epoch.
    #[serde(default)]
    pub expires_at: Option<u64>,
}

impl StaticTokenConfig {
    /// Validates token and subject bounds.
    fn validate(&self) -> Result<(), ConfigError> {
        validate_token_text("auth.tokens.token", &self.token)?;
        let subject = self.subject.trim();
        if subject.is_empty() || subject.len() > MAX_SUBJECT_LENGTH {
            return Err(ConfigError::Invalid(format!(
                "auth.tokens.subject must be 1..={MAX_SUBJECT_LENGTH} characters"
            )));
        }
        if self.permissions.len() > MAX_TOKEN_PERMISSIONS {
            return Err(ConfigError::Invalid("too many auth.tokens.permissions".to_string()));
        }
        if self.permissions.iter().any(|permission| permission.trim().is_empty()) {
            return Err(ConfigError::Invalid(
                "auth.tokens.permissions entries must be non-empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Signed token verification settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SignedAuthConfig {
    /// Base64-encoded Ed25519 public key (32 bytes).
    pub public_key: String,
    /// Clock leeway applied to `exp`/`nbf` checks, in seconds.
    #[serde(default = "default_leeway_secs")]
    pub leeway_secs: u64,
}

impl SignedAuthConfig {
    /// Decodes the configured public key bytes.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the key is not base64 or not 32 bytes.
    pub fn public_key_bytes(&self) -> Result<[u8; ED25519_PUBLIC_KEY_LEN], ConfigError> {
        let decoded = STANDARD
            .decode(self.public_key.trim())
            .map_err(|_| ConfigError::Invalid("auth.signed.public_key must be base64".to_string()))?;
        decoded.try_into().map_err(|_| {
            ConfigError::Invalid(format!(
                "auth.signed.public_key must decode to {ED25519_PUBLIC_KEY_LEN} bytes"
            ))
        })
    }

    /// Validates signed token settings.
    fn validate(&self) -> Result<(), ConfigError> {
        self.public_key_bytes()?;
        if self.leeway_secs > MAX_LEEWAY_SECS {
            return Err(ConfigError::Invalid(format!(
                "auth.signed.leeway_secs must be at most {MAX_LEEWAY_SECS}"
            )));
        }
        Ok(())
    }
}

/// Remote verification service settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RemoteAuthConfig {
    /// Verification endpoint (called with `POST` and the bearer token).
    pub url: String,
    /// TCP connect timeout in milliseconds.
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
    /// Permit plain `http://` URLs for non-loopback hosts.
    #[serde(default)]
    pub allow_insecure_http: bool,
}

impl RemoteAuthConfig {
    /// Returns the connect timeout as a [`Duration`].
    #[must_use]
    pub const fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    /// Validates the verification URL and timeouts.
    fn validate(&self) -> Result<(), ConfigError> {
        if !(MIN_CONNECT_TIMEOUT_MS..=MAX_CONNECT_TIMEOUT_MS).contains(&self.connect_timeout_ms) {
            return Err(ConfigError::Invalid(format!(
                "auth.remote.connect_timeout_ms must be between {MIN_CONNECT_TIMEOUT_MS} and \
                 {MAX_CONNECT_TIMEOUT_MS}"
            )));
        }
        validate_outbound_url("auth.remote.url", &self.url, self.allow_insecure_http)
    }
}

// ============================================================================
// SECTION: Audit, Tools, Logging
// ============================================================================

/// Audit sink configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AuditConfig {
    /// Enable audit records.
    #[serde(default = "default_audit_enabled")]
    pub enabled: bool,
    /// Optional audit log path (JSON lines); stderr when unset.
    #[serde(default)]
    pub path: Option<String>,
    /// Capacity of the asynchronous audit buffer.
    #[serde(default = "default_audit_buffer_capacity")]
    pub buffer_capacity: usize,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            enabled: default_audit_enabled(),
            path: None,
            buffer_capacity: default_audit_buffer_capacity(),
        }
    }
}

impl AuditConfig {
    /// Validates audit configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if let Some(path) = &self.path {
            validate_path_string("audit.path", path)?;
        }
        if self.buffer_capacity == 0 || self.buffer_capacity > MAX_AUDIT_BUFFER {
            return Err(ConfigError::Invalid(format!(
                "audit.buffer_capacity must be between 1 and {MAX_AUDIT_BUFFER}"
            )));
        }
        Ok(())
    }
}

/// Built-in tool configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ToolsConfig {
    /// Built-in tools to register; empty registers every available tool.
    #[serde(default)]
    pub enabled: Vec<String>,
    /// Directory served by the CSV summary tool.
    #[serde(default)]
    pub data_dir: Option<String>,
    /// About endpoint queried by the cloud version tool.
    #[serde(default)]
    pub cloud_version_url: Option<String>,
    /// Timeout for outbound tool HTTP calls, in milliseconds.
    #[serde(default = "default_tool_http_timeout_ms")]
    pub http_timeout_ms: u64,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            enabled: Vec::new(),
            data_dir: None,
            cloud_version_url: None,
            http_timeout_ms: default_tool_http_timeout_ms(),
        }
    }
}

impl ToolsConfig {
    /// Returns the outbound HTTP timeout as a [`Duration`].
    #[must_use]
    pub const fn http_timeout(&self) -> Duration {
        Duration::from_millis(self.http_timeout_ms)
    }

    /// Validates tool configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.enabled.iter().any(|name| name.trim().is_empty()) {
            return Err(ConfigError::Invalid("tools.enabled entries must be non-empty".to_string()));
        }
        if let Some(dir) = &self.data_dir {
            validate_path_string("tools.data_dir", dir)?;
        }
        if let Some(url) = &self.cloud_version_url {
            validate_outbound_url("tools.cloud_version_url", url, true)?;
        }
        if self.http_timeout_ms == 0 || self.http_timeout_ms > MAX_TOOL_HTTP_TIMEOUT_MS {
            return Err(ConfigError::Invalid(format!(
                "tools.http_timeout_ms must be between 1 and {MAX_TOOL_HTTP_TIMEOUT_MS}"
            )));
        }
        Ok(())
    }
}

/// Diagnostic log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    /// Human-readable text.
    #[default]
    Text,
    /// JSON lines.
    Json,
}

/// Diagnostic logging configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Default filter directive (overridden by `RUST_LOG`).
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Output format.
    #[serde(default)]
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::Text,
        }
    }
}

impl LoggingConfig {
    /// Validates logging configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.level.trim().is_empty() {
            return Err(ConfigError::Invalid("logging.level must be non-empty".to_string()));
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration loading or validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// I/O failure while reading configuration.
    #[error("config io error: {0}")]
    Io(String),
    /// TOML parsing error.
    #[error("config parse error: {0}")]
    Parse(String),
    /// Invalid configuration data.
    #[error("invalid config: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Resolves the config path from CLI or environment defaults.
fn resolve_path(path: Option<&Path>) -> Result<PathBuf, ConfigError> {
    if let Some(path) = path {
        return Ok(path.to_path_buf());
    }
    if let Ok(env_path) = env::var(CONFIG_ENV_VAR) {
        if env_path.len() > MAX_TOTAL_PATH_LENGTH {
            return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
        }
        return Ok(PathBuf::from(env_path));
    }
    Ok(PathBuf::from(DEFAULT_CONFIG_NAME))
}

/// Validates the resolved path against security limits.
fn validate_path(path: &Path) -> Result<(), ConfigError> {
    let text = path.to_string_lossy();
    if text.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
    }
    for component in path.components() {
        let value = component.as_os_str().to_string_lossy();
        if value.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid("config path component too long".to_string()));
        }
    }
    Ok(())
}

/// Validates a path string against length constraints.
fn validate_path_string(field: &str, value: &str) -> Result<(), ConfigError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::Invalid(format!("{field} must be non-empty")));
    }
    if trimmed.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid(format!("{field} exceeds max length")));
    }
    for component in Path::new(trimmed).components() {
        let component_value = component.as_os_str().to_string_lossy();
        if component_value.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid(format!("{field} path component too long")));
        }
    }
    Ok(())
}

/// Validates bearer token text: non-empty, bounded, no whitespace.
fn validate_token_text(field: &str, value: &str) -> Result<(), ConfigError> {
    if value.is_empty() || value.len() > MAX_AUTH_TOKEN_LENGTH {
        return Err(ConfigError::Invalid(format!(
            "{field} must be 1..={MAX_AUTH_TOKEN_LENGTH} bytes"
        )));
    }
    if value.chars().any(|ch| ch.is_whitespace() || ch.is_control()) {
        return Err(ConfigError::Invalid(format!("{field} must not contain whitespace")));
    }
    Ok(())
}

/// Validates an outbound URL; plain http needs an opt-in unless loopback.
fn validate_outbound_url(field: &str, value: &str, allow_insecure: bool) -> Result<(), ConfigError> {
    let url = Url::parse(value.trim())
        .map_err(|_| ConfigError::Invalid(format!("{field} must be a valid url")))?;
    match url.scheme() {
        "https" => Ok(()),
        "http" if allow_insecure || is_loopback_host(&url) => Ok(()),
        "http" => Err(ConfigError::Invalid(format!(
            "{field} uses http for a non-loopback host; set allow_insecure_http"
        ))),
        _ => Err(ConfigError::Invalid(format!("{field} must use http or https"))),
    }
}

/// Returns true when the URL host is a loopback name or address.
fn is_loopback_host(url: &Url) -> bool {
    match url.host_str() {
        Some("localhost") => true,
        Some(host) => host
            .trim_start_matches('[')
            .trim_end_matches(']')
            .parse::<IpAddr>()
            .is_ok_and(|ip| ip.is_loopback()),
        None => false,
    }
}

/// Default server name.
fn default_server_name() -> String {
    "toolgate".to_string()
}

/// Default maximum request body size in bytes.
pub(crate) const fn default_max_body_bytes() -> usize {
    1024 * 1024
}

/// Default credential validation timeout in milliseconds.
pub(crate) const fn default_auth_timeout_ms() -> u64 {
    3_000
}

/// Default remote auth connect timeout in milliseconds.
pub(crate) const fn default_connect_timeout_ms() -> u64 {
    1_000
}

/// Default signed-token clock leeway in seconds.
pub(crate) const fn default_leeway_secs() -> u64 {
    30
}

/// Default audit enabled flag.
pub(crate) const fn default_audit_enabled() -> bool {
    true
}

/// Default audit buffer capacity.
pub(crate) const fn default_audit_buffer_capacity() -> usize {
    1_024
}

/// Default outbound tool HTTP timeout in milliseconds.
pub(crate) const fn default_tool_http_timeout_ms() -> u64 {
    5_000
}

/// Default log filter.
fn default_log_level() -> String {
    "info".to_string()
}
