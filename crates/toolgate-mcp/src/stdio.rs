// crates/toolgate-mcp/src/stdio.rs
// ============================================================================
// Module: Stdio Transport
// Description: Duplex JSON-RPC session over a byte stream pair.
// Purpose: Serve concurrent MCP requests over stdin/stdout.
// Dependencies: tokio, serde_json, toolgate-config
// ============================================================================

//! ## Overview
//! A session reads frames (newline-delimited JSON or `Content-Length`
//! framing), dispatches each request on its own task, and serializes
//! responses through a single writer task. `notifications/cancelled` aborts
//! the matching in-flight request, which is then audited as cancelled and
//! gets no response. At end of input the session waits for in-flight
//! requests to finish before returning.
//! Security posture: frames are size-limited; oversized frames are skipped
//! and answered with a `MALFORMED_REQUEST` envelope.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::HashMap;

use serde_json::Value;
use tokio::io::AsyncBufReadExt;
use tokio::io::AsyncRead;
use tokio::io::AsyncReadExt;
use tokio::io::AsyncWrite;
use tokio::io::AsyncWriteExt;
use tokio::io::BufReader;
use tokio::sync::mpsc;
use tokio::task::AbortHandle;
use tokio::task::JoinSet;
use toolgate_config::StdioFraming;

use crate::jsonrpc::Dispatcher;
use crate::jsonrpc::INVALID_REQUEST;
use crate::jsonrpc::JsonRpcResponse;
use crate::jsonrpc::PARSE_ERROR;
use crate::jsonrpc::RequestContext;
use crate::jsonrpc::request_id_label;
use crate::server::McpServerError;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Maximum size of one `Content-Length` header line.
const MAX_HEADER_LINE_BYTES: u64 = 1024;
/// Capacity of the outbound response queue.
const RESPONSE_QUEUE_CAPACITY: usize = 64;
/// Cancellation notification method.
const CANCELLED_METHOD: &str = "notifications/cancelled";

// ============================================================================
// SECTION: Types
// ============================================================================

/// Stdio session options.
#[derive(Debug, Clone, Copy)]
pub struct StdioOptions {
    /// Message framing.
    pub framing: StdioFraming,
    /// Maximum frame size in bytes.
    pub max_frame_bytes: usize,
}

/// Result of reading one frame.
#[derive(Debug, PartialEq, Eq)]
enum Frame {
    /// Complete message bytes.
    Message(Vec<u8>),
    /// Frame exceeded the size limit and was skipped.
    Oversized,
    /// Frame headers were unusable.
    Invalid(&'static str),
    /// End of input.
    Eof,
}

// ============================================================================
// SECTION: Session
// ============================================================================

/// Serves one JSON-RPC session until the reader reaches end of input.
///
/// # Errors
///
/// Returns [`McpServerError::Transport`] when reading or writing fails.
pub async fn serve_session<R, W>(
    dispatcher: Dispatcher,
    options: StdioOptions,
    reader: R,
    writer: W,
) -> Result<(), McpServerError>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let mut reader = BufReader::new(reader);
    let (responses, outbound) = mpsc::channel::<Vec<u8>>(RESPONSE_QUEUE_CAPACITY);
    let writer_task = tokio::spawn(write_loop(writer, outbound, options.framing));
    let mut tasks: JoinSet<Option<String>> = JoinSet::new();
    let mut inflight: HashMap<String, AbortHandle> = HashMap::new();

    let read_result = loop {
        reap_finished(&mut tasks, &mut inflight);
        let frame = match read_frame(&mut reader, options).await {
            Ok(frame) => frame,
            Err(err) => break Err(err),
        };
        let bytes = match frame {
            Frame::Message(bytes) => bytes,
            Frame::Eof => break Ok(()),
            Frame::Oversized => {
                queue(&responses, JsonRpcResponse::malformed(
                    Value::Null,
                    INVALID_REQUEST,
                    "frame exceeds size limit",
                ))
                .await;
                continue;
            }
            Frame::Invalid(message) => {
                queue(&responses, JsonRpcResponse::malformed(Value::Null, INVALID_REQUEST, message))
                    .await;
                continue;
            }
        };
        let Ok(value) = serde_json::from_slice::<Value>(&bytes) else {
            queue(&responses, JsonRpcResponse::malformed(Value::Null, PARSE_ERROR, "parse error"))
                .await;
            continue;
        };
        if let Some(target) = cancelled_request_id(&value) {
            if let Some(handle) = inflight.remove(&target) {
                tracing::debug!(request_id = %target, "cancelling in-flight request");
                handle.abort();
            }
            continue;
        }
        let key = value.get("id").filter(|id| !id.is_null()).map(request_id_label);
        let dispatcher = dispatcher.clone();
        let sender = responses.clone();
        let task_key = key.clone();
        let handle = tasks.spawn(async move {
            if let Some(response) = dispatcher.handle_value(&RequestContext::stdio(), value).await {
                queue(&sender, response).await;
            }
            task_key
        });
        if let Some(key) = key {
            inflight.insert(key, handle);
        }
    };

    while let Some(joined) = tasks.join_next().await {
        if let Err(err) = joined
            && err.is_panic()
        {
            tracing::error!("stdio request task panicked");
        }
    }
    drop(responses);
    let write_result = writer_task
        .await
        .map_err(|err| McpServerError::Transport(format!("stdio writer failed: {err}")))?;
    read_result.and(write_result)
}

/// Removes completed tasks from the in-flight table.
fn reap_finished(tasks: &mut JoinSet<Option<String>>, inflight: &mut HashMap<String, AbortHandle>) {
    while let Some(joined) = tasks.try_join_next_with_id() {
        if let Ok((task_id, Some(key))) = joined
            && inflight.get(&key).is_some_and(|handle| handle.id() == task_id)
        {
            inflight.remove(&key);
        }
    }
}

/// Serializes a response onto the writer queue.
async fn queue(sender: &mpsc::Sender<Vec<u8>>, response: JsonRpcResponse) {
    match serde_json::to_vec(&response) {
        Ok(payload) => {
            if sender.send(payload).await.is_err() {
                tracing::warn!("stdio writer closed; response dropped");
            }
        }
        Err(err) => tracing::error!(error = %err, "response serialization failed"),
    }
}

/// Returns the target id of a `notifications/cancelled` message.
fn cancelled_request_id(value: &Value) -> Option<String> {
    if value.get("method").and_then(Value::as_str) != Some(CANCELLED_METHOD) {
        return None;
    }
    value.get("params").and_then(|params| params.get("requestId")).map(request_id_label)
}

// ============================================================================
// SECTION: Framing
// ============================================================================

/// Reads the next frame using the configured framing.
async fn read_frame<R>(reader: &mut BufReader<R>, options: StdioOptions) -> Result<Frame, McpServerError>
where
    R: AsyncRead + Unpin,
{
    match options.framing {
        StdioFraming::Ndjson => read_line_frame(reader, options.max_frame_bytes).await,
        StdioFraming::ContentLength => read_content_length_frame(reader, options.max_frame_bytes).await,
    }
}

/// Reads one non-empty newline-delimited message.
async fn read_line_frame<R>(reader: &mut BufReader<R>, max_bytes: usize) -> Result<Frame, McpServerError>
where
    R: AsyncRead + Unpin,
{
    loop {
        let mut line = Vec::new();
        let limit = u64::try_from(max_bytes).unwrap_or(u64::MAX).saturating_add(1);
        let read = (&mut *reader)
            .take(limit)
            .read_until(b'\n', &mut line)
            .await
            .map_err(|err| McpServerError::Transport(format!("stdio read failed: {err}")))?;
        if read == 0 {
            return Ok(Frame::Eof);
        }
        let terminated = line.last() == Some(&b'\n');
        if line.len() > max_bytes && !terminated {
            discard_line(reader).await?;
            return Ok(Frame::Oversized);
        }
        if line.iter().all(u8::is_ascii_whitespace) {
            continue;
        }
        return Ok(Frame::Message(line));
    }
}

/// Consumes input up to and including the next newline.
async fn discard_line<R>(reader: &mut BufReader<R>) -> Result<(), McpServerError>
where
    R: AsyncRead + Unpin,
{
    loop {
        let buffer = reader
            .fill_buf()
            .await
            .map_err(|err| McpServerError::Transport(format!("stdio read failed: {err}")))?;
        if buffer.is_empty() {
            return Ok(());
        }
        if let Some(position) = buffer.iter().position(|byte| *byte == b'\n') {
            reader.consume(position + 1);
            return Ok(());
        }
        let length = buffer.len();
        reader.consume(length);
    }
}

/// Reads one `Content-Length` framed message.
async fn read_content_length_frame<R>(
    reader: &mut BufReader<R>,
    max_bytes: usize,
) -> Result<Frame, McpServerError>
where
    R: AsyncRead + Unpin,
{
    let mut content_length: Option<usize> = None;
    let mut saw_header = false;
    loop {
        let mut line = Vec::new();
        let read = (&mut *reader)
            .take(MAX_HEADER_LINE_BYTES)
            .read_until(b'\n', &mut line)
            .await
            .map_err(|err| McpServerError::Transport(format!("stdio read failed: {err}")))?;
        if read == 0 {
            return Ok(Frame::Eof);
        }
        let text = String::from_utf8_lossy(&line);
        let trimmed = text.trim();
        if trimmed.is_empty() {
            if saw_header {
                break;
            }
            continue;
        }
        saw_header = true;
        if let Some((name, value)) = trimmed.split_once(':')
            && name.trim().eq_ignore_ascii_case("content-length")
        {
            content_length = value.trim().parse::<usize>().ok();
            if content_length.is_none() {
                return Ok(Frame::Invalid("invalid content length"));
            }
        }
    }
    let Some(length) = content_length else {
        return Ok(Frame::Invalid("missing content length"));
    };
    if length > max_bytes {
        let skip = u64::try_from(length).unwrap_or(u64::MAX);
        tokio::io::copy(&mut (&mut *reader).take(skip), &mut tokio::io::sink())
            .await
            .map_err(|err| McpServerError::Transport(format!("stdio read failed: {err}")))?;
        return Ok(Frame::Oversized);
    }
    let mut buffer = vec![0_u8; length];
    reader
        .read_exact(&mut buffer)
        .await
        .map_err(|err| McpServerError::Transport(format!("stdio read failed: {err}")))?;
    Ok(Frame::Message(buffer))
}

/// Writes queued responses until every sender is dropped.
async fn write_loop<W>(
    mut writer: W,
    mut outbound: mpsc::Receiver<Vec<u8>>,
    framing: StdioFraming,
) -> Result<(), McpServerError>
where
    W: AsyncWrite + Unpin,
{
    while let Some(payload) = outbound.recv().await {
        write_frame(&mut writer, &payload, framing)
            .await
            .map_err(|err| McpServerError::Transport(format!("stdio write failed: {err}")))?;
    }
    Ok(())
}

/// Writes one framed payload and flushes.
async fn write_frame<W>(writer: &mut W, payload: &[u8], framing: StdioFraming) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    match framing {
        StdioFraming::Ndjson => {
            writer.write_all(payload).await?;
            writer.write_all(b"\n").await?;
        }
        StdioFraming::ContentLength => {
            let header = format!("Content-Length: {}\r\n\r\n", payload.len());
            writer.write_all(header.as_bytes()).await?;
            writer.write_all(payload).await?;
        }
    }
    writer.flush().await
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests;
