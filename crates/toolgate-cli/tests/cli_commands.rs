// crates/toolgate-cli/tests/cli_commands.rs
// ============================================================================
// Module: CLI Command Tests
// Description: Integration tests that run the `toolgate` binary.
// Purpose: Ensure config checks, tool listing, and stdio serving behave end to end.
// Dependencies: toolgate-cli binary, tempfile
// ============================================================================

//! ## Overview
//! Runs the compiled binary against temporary config files. The stdio test
//! pipes JSON-RPC lines through `toolgate serve` and checks that stdout
//! carries only protocol frames.

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only output and panic-based assertions are permitted."
)]

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;
use std::process::Command;
use std::process::Output;
use std::process::Stdio;

use serde_json::Value;
use tempfile::TempDir;

// ============================================================================
// SECTION: Helpers
// ============================================================================

fn toolgate_bin() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_toolgate"))
}

fn write_config(dir: &TempDir, body: &str) -> PathBuf {
    let path = dir.path().join("toolgate.toml");
    fs::write(&path, body.trim()).expect("write config");
    path
}

fn run(dir: &Path, args: &[&str]) -> Output {
    Command::new(toolgate_bin())
        .current_dir(dir)
        .env_remove("RUST_LOG")
        .env_remove("TOOLGATE_CONFIG")
        .env_remove("TOOLGATE_TOKEN")
        .env_remove("TOOLGATE_GATE_TOKEN")
        .args(args)
        .output()
        .expect("run toolgate")
}

const STDIO_CONFIG: &str = r#"
[server]
name = "cli-stdio"
transport = "stdio"

[[auth.tokens]]
token = "alice-token"
subject = "alice"
permissions = ["math"]

[audit]
enabled = false

[tools]
enabled = ["power", "hello_world"]
"#;

// ============================================================================
// SECTION: Tests
// ============================================================================

#[test]
fn config_check_reports_valid_config() {
    let dir = TempDir::new().unwrap();
    let config = write_config(&dir, STDIO_CONFIG);
    let output = run(dir.path(), &["config", "check", "--config", config.to_str().unwrap()]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("config ok: server 'cli-stdio' over stdio with static auth"));
}

#[test]
fn config_check_rejects_invalid_config() {
    let dir = TempDir::new().unwrap();
    let config = write_config(
        &dir,
        r#"
[server]
transport = "http"
"#,
    );
    let output = run(dir.path(), &["config", "check", "--config", config.to_str().unwrap()]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("failed to load config"));
}

#[test]
fn tools_list_reports_enabled_tools_with_permissions() {
    let dir = TempDir::new().unwrap();
    let config = write_config(&dir, STDIO_CONFIG);
    let output = run(dir.path(), &["tools", "list", "--config", config.to_str().unwrap()]);
    assert!(output.status.success());
    let listing: Value = serde_json::from_slice(&output.stdout).unwrap();
    let tools = listing["tools"].as_array().unwrap();
    assert_eq!(tools.len(), 2);
    let power = tools.iter().find(|tool| tool["name"] == "power").unwrap();
    assert_eq!(power["requiredPermissions"], serde_json::json!(["math"]));
    let hello = tools.iter().find(|tool| tool["name"] == "hello_world").unwrap();
    assert_eq!(hello["requiredPermissions"], serde_json::json!([]));
}

#[test]
fn client_call_rejects_non_object_args() {
    let dir = TempDir::new().unwrap();
    let output = run(dir.path(), &["client", "call", "--tool", "power", "--args", "[1]"]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("--args must be a JSON object"));
}

#[test]
fn serve_stdio_answers_on_stdout_and_logs_to_stderr() {
    let dir = TempDir::new().unwrap();
    let config = write_config(&dir, STDIO_CONFIG);
    let mut child = Command::new(toolgate_bin())
        .current_dir(dir.path())
        .env_remove("RUST_LOG")
        .args(["serve", "--config", config.to_str().unwrap()])
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("spawn toolgate serve");
    {
        let mut stdin = child.stdin.take().unwrap();
        let frames = [
            r#"{"jsonrpc":"2.0","id":1,"method":"initialize","params":{}}"#,
            r#"{"jsonrpc":"2.0","id":2,"method":"tools/call","params":{"name":"power","arguments":{"base":2,"exponent":10},"auth_token":"alice-token"}}"#,
            r#"{"jsonrpc":"2.0","id":3,"method":"tools/call","params":{"name":"power","arguments":{"base":2,"exponent":3},"auth_token":"nope"}}"#,
        ];
        for frame in frames {
            writeln!(stdin, "{frame}").unwrap();
        }
    }
    let output = child.wait_with_output().expect("wait for toolgate serve");
    assert!(output.status.success());

    let stdout = String::from_utf8(output.stdout).unwrap();
    let mut responses: Vec<Value> =
        stdout.lines().map(|line| serde_json::from_str(line).unwrap()).collect();
    responses.sort_by_key(|response| response["id"].as_i64());
    assert_eq!(responses.len(), 3);
    assert_eq!(responses[0]["result"]["serverInfo"]["name"], "cli-stdio");
    let ok = &responses[1]["result"]["structuredContent"];
    assert_eq!(ok["success"], true);
    assert_eq!(ok["result"]["result"], 1024);
    let denied = &responses[2]["result"]["structuredContent"];
    assert_eq!(denied["code"], "AUTH_FAILED");

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("starting toolgate server"));
    assert!(!stderr.contains("alice-token"));
}
