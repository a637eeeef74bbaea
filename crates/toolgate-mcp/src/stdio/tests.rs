// crates/toolgate-mcp/src/stdio/tests.rs
// ============================================================================
// Module: Stdio Transport Tests
// Description: Unit tests for stdio framing and session behavior.
// Purpose: Validate frame limits, both framings, and cancellation.
// Dependencies: toolgate-mcp, tokio, serde_json
// ============================================================================

// ============================================================================
// SECTION: Lint Configuration
// ============================================================================

#![allow(
    clippy::expect_used,
    clippy::unwrap_used,
    clippy::panic,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only assertions use unwrap/expect for clarity."
)]

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use serde_json::json;
use tokio::io::AsyncReadExt;
use tokio::io::AsyncWriteExt;
use tokio::io::BufReader;
use tokio::sync::Notify;
use toolgate_config::StdioFraming;

use super::Frame;
use super::StdioOptions;
use super::read_content_length_frame;
use super::read_line_frame;
use super::serve_session;
use crate::audit::AuditOutcome;
use crate::audit::InMemoryAuditSink;
use crate::auth::CredentialValidator;
use crate::auth::StaticTokenVerifier;
use crate::gateway::InvocationGateway;
use crate::jsonrpc::Dispatcher;
use crate::registry::FnToolHandler;
use crate::registry::ToolDescriptor;
use crate::registry::ToolRegistry;

// ============================================================================
// SECTION: Fixtures
// ============================================================================

fn dispatcher(audit: Arc<InMemoryAuditSink>, started: Arc<Notify>) -> Dispatcher {
    let mut registry = ToolRegistry::new();
    let echo = FnToolHandler::shared(|_caller, args: Value| async move { Ok(args) });
    let slow = FnToolHandler::shared(move |_caller, _args: Value| {
        let started = Arc::clone(&started);
        async move {
            started.notify_one();
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(json!({ "done": true }))
        }
    });
    let schema = json!({ "type": "object" });
    registry.register(ToolDescriptor::new("echo", "Echo", schema.clone(), echo).unwrap()).unwrap();
    registry.register(ToolDescriptor::new("slow", "Sleeps", schema, slow).unwrap()).unwrap();
    let verifier = StaticTokenVerifier::new().with_token("good", "alice", Vec::<String>::new(), None);
    let validator = CredentialValidator::new(Arc::new(verifier), Duration::from_secs(1));
    Dispatcher::new(InvocationGateway::new(Arc::new(registry), validator, audit), "toolgate-test")
}

fn call(id: u64, tool: &str) -> String {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "method": "tools/call",
        "params": { "name": tool, "arguments": { "x": id }, "auth_token": "good" }
    })
    .to_string()
}

fn ndjson(max_frame_bytes: usize) -> StdioOptions {
    StdioOptions { framing: StdioFraming::Ndjson, max_frame_bytes }
}

async fn run_session(dispatcher: Dispatcher, options: StdioOptions, input: &str) -> Vec<u8> {
    let (server_out, mut client_out) = tokio::io::duplex(64 * 1024);
    serve_session(dispatcher, options, input.as_bytes(), server_out)
        .await
        .unwrap_or_else(|err| panic!("session failed: {err}"));
    let mut output = Vec::new();
    client_out.read_to_end(&mut output).await.unwrap();
    output
}

fn parse_lines(output: &[u8]) -> Vec<Value> {
    output
        .split(|byte| *byte == b'\n')
        .filter(|line| !line.is_empty())
        .map(|line| serde_json::from_slice(line).unwrap())
        .collect()
}

// ============================================================================
// SECTION: Framing
// ============================================================================

#[tokio::test]
async fn line_frames_skip_blank_lines() {
    let mut reader = BufReader::new(&b"\n  \n{\"a\":1}\n"[..]);
    let frame = read_line_frame(&mut reader, 64).await.unwrap();
    assert_eq!(frame, Frame::Message(b"{\"a\":1}\n".to_vec()));
    assert_eq!(read_line_frame(&mut reader, 64).await.unwrap(), Frame::Eof);
}

#[tokio::test]
async fn oversized_line_is_skipped_and_next_line_survives() {
    let input = format!("{}\n{{\"ok\":true}}\n", "x".repeat(100));
    let mut reader = BufReader::new(input.as_bytes());
    assert_eq!(read_line_frame(&mut reader, 16).await.unwrap(), Frame::Oversized);
    let frame = read_line_frame(&mut reader, 16).await.unwrap();
    assert_eq!(frame, Frame::Message(b"{\"ok\":true}\n".to_vec()));
}

#[tokio::test]
async fn line_at_exact_limit_is_accepted() {
    let input = format!("{}\n", "y".repeat(16));
    let mut reader = BufReader::new(input.as_bytes());
    let frame = read_line_frame(&mut reader, 16).await.unwrap();
    assert!(matches!(frame, Frame::Message(bytes) if bytes.len() == 17));
}

#[tokio::test]
async fn content_length_frame_reads_exact_body() {
    let input = b"Content-Length: 7\r\n\r\n{\"a\":1}Content-Length: 2\r\n\r\n{}";
    let mut reader = BufReader::new(&input[..]);
    let first = read_content_length_frame(&mut reader, 64).await.unwrap();
    assert_eq!(first, Frame::Message(b"{\"a\":1}".to_vec()));
    let second = read_content_length_frame(&mut reader, 64).await.unwrap();
    assert_eq!(second, Frame::Message(b"{}".to_vec()));
    assert_eq!(read_content_length_frame(&mut reader, 64).await.unwrap(), Frame::Eof);
}

#[tokio::test]
async fn content_length_oversized_body_is_discarded() {
    let body = "z".repeat(40);
    let input = format!("Content-Length: 40\r\n\r\n{body}Content-Length: 2\r\n\r\n{{}}");
    let mut reader = BufReader::new(input.as_bytes());
    assert_eq!(read_content_length_frame(&mut reader, 8).await.unwrap(), Frame::Oversized);
    let next = read_content_length_frame(&mut reader, 8).await.unwrap();
    assert_eq!(next, Frame::Message(b"{}".to_vec()));
}

#[tokio::test]
async fn content_length_requires_length_header() {
    let mut reader = BufReader::new(&b"Content-Type: application/json\r\n\r\n{}"[..]);
    let frame = read_content_length_frame(&mut reader, 64).await.unwrap();
    assert_eq!(frame, Frame::Invalid("missing content length"));

    let mut reader = BufReader::new(&b"Content-Length: nope\r\n\r\n"[..]);
    let frame = read_content_length_frame(&mut reader, 64).await.unwrap();
    assert_eq!(frame, Frame::Invalid("invalid content length"));
}

// ============================================================================
// SECTION: Session
// ============================================================================

#[tokio::test]
async fn session_answers_each_request_and_drains_on_eof() {
    let audit = Arc::new(InMemoryAuditSink::new());
    let dispatcher = dispatcher(Arc::clone(&audit), Arc::new(Notify::new()));
    let input = format!("{}\n{}\nnot json\n", call(1, "echo"), call(2, "echo"));
    let output = run_session(dispatcher, ndjson(4096), &input).await;
    let responses = parse_lines(&output);
    assert_eq!(responses.len(), 3);
    let ids: Vec<Value> = responses.iter().map(|response| response["id"].clone()).collect();
    assert!(ids.contains(&json!(1)));
    assert!(ids.contains(&json!(2)));
    let parse_error = responses.iter().find(|response| response["id"].is_null()).unwrap();
    assert_eq!(parse_error["error"]["code"], -32700);
    assert_eq!(audit.records().len(), 2);
}

#[tokio::test]
async fn oversized_session_frame_gets_malformed_envelope() {
    let audit = Arc::new(InMemoryAuditSink::new());
    let dispatcher = dispatcher(Arc::clone(&audit), Arc::new(Notify::new()));
    let input = format!("{}\n{}\n", "q".repeat(512), call(3, "echo"));
    let output = run_session(dispatcher, ndjson(256), &input).await;
    let responses = parse_lines(&output);
    assert_eq!(responses.len(), 2);
    let rejected = responses.iter().find(|response| response["id"].is_null()).unwrap();
    assert_eq!(rejected["error"]["code"], -32600);
    assert_eq!(rejected["error"]["data"]["code"], "MALFORMED_REQUEST");
    assert!(responses.iter().any(|response| response["id"] == 3));
}

#[tokio::test]
async fn content_length_session_frames_responses() {
    let dispatcher = dispatcher(Arc::new(InMemoryAuditSink::new()), Arc::new(Notify::new()));
    let body = call(9, "echo");
    let input = format!("Content-Length: {}\r\n\r\n{body}", body.len());
    let options = StdioOptions { framing: StdioFraming::ContentLength, max_frame_bytes: 4096 };
    let output = run_session(dispatcher, options, &input).await;
    let text = String::from_utf8(output).unwrap();
    let (header, payload) = text.split_once("\r\n\r\n").unwrap();
    assert_eq!(header, format!("Content-Length: {}", payload.len()));
    let response: Value = serde_json::from_str(payload).unwrap();
    assert_eq!(response["id"], 9);
    assert_eq!(response["result"]["isError"], false);
}

#[tokio::test]
async fn cancelled_request_is_audited_without_response() {
    let audit = Arc::new(InMemoryAuditSink::new());
    let started = Arc::new(Notify::new());
    let dispatcher = dispatcher(Arc::clone(&audit), Arc::clone(&started));
    let (mut client_in, server_in) = tokio::io::duplex(4096);
    let (server_out, mut client_out) = tokio::io::duplex(4096);
    let session = tokio::spawn(serve_session(dispatcher, ndjson(4096), server_in, server_out));

    client_in.write_all(format!("{}\n", call(7, "slow")).as_bytes()).await.unwrap();
    started.notified().await;
    let cancel = json!({
        "jsonrpc": "2.0",
        "method": "notifications/cancelled",
        "params": { "requestId": 7 }
    });
    client_in.write_all(format!("{cancel}\n{}\n", call(8, "echo")).as_bytes()).await.unwrap();
    drop(client_in);

    tokio::time::timeout(Duration::from_secs(5), session)
        .await
        .expect("session finished")
        .unwrap()
        .unwrap_or_else(|err| panic!("session failed: {err}"));
    let mut output = Vec::new();
    client_out.read_to_end(&mut output).await.unwrap();
    let responses = parse_lines(&output);
    assert_eq!(responses.len(), 1);
    assert_eq!(responses[0]["id"], 8);

    let records = audit.records();
    let cancelled = records.iter().find(|record| record.tool_name == "slow").unwrap();
    assert_eq!(cancelled.outcome, AuditOutcome::Cancelled);
    assert_eq!(cancelled.subject, "alice");
}

