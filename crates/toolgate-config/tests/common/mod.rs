// crates/toolgate-config/tests/common/mod.rs
// =============================================================================
// Module: Config Test Fixtures
// Description: Shared helpers for toolgate-config integration tests.
// Purpose: Build configs from TOML snippets and assert validation failures.
// =============================================================================

#![allow(dead_code, reason = "Each test binary uses a subset of the fixtures.")]

use toolgate_config::ConfigError;
use toolgate_config::GatewayConfig;

/// Result alias used by config tests.
pub type TestResult = Result<(), String>;

/// Parses TOML into a config without running validation.
pub fn config_from_toml(content: &str) -> Result<GatewayConfig, String> {
    toml::from_str(content).map_err(|err| err.to_string())
}

/// Returns a minimal valid stdio config with one static token.
pub fn minimal_config() -> Result<GatewayConfig, String> {
    config_from_toml(
        r#"
[server]
transport = "stdio"

[[auth.tokens]]
token = "secret-token"
subject = "alice"
permissions = ["math"]
"#,
    )
}

/// Returns a minimal valid http config.
pub fn http_config() -> Result<GatewayConfig, String> {
    config_from_toml(
        r#"
[server]
transport = "http"
bind = "127.0.0.1:8080"
"#,
    )
}

/// Assert that a validation result is an error containing a specific substring.
pub fn assert_invalid<T>(result: Result<T, ConfigError>, needle: &str) -> TestResult {
    match result {
        Err(error) => {
            let message = error.to_string();
            if message.contains(needle) {
                Ok(())
            } else {
                Err(format!("error '{message}' did not contain '{needle}'"))
            }
        }
        Ok(_) => Err("expected invalid config".to_string()),
    }
}
