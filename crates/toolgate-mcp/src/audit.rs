// crates/toolgate-mcp/src/audit.rs
// ============================================================================
// Module: Invocation Audit Log
// Description: Append-only audit records for every tool invocation attempt.
// Purpose: Record who called what, with which arguments, and how it ended.
// Dependencies: serde, serde_json, tokio, tracing
// ============================================================================

//! ## Overview
//! Audit records are a structured channel separate from diagnostic logging.
//! Sinks never block the gateway indefinitely and never raise into it: write
//! failures are reported through `tracing` and swallowed. The buffered sink
//! decouples request handling from slow storage with a bounded queue.
//! Security posture: records carry a credential fingerprint, never the token.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs::File;
use std::fs::OpenOptions;
use std::io;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use std::sync::Mutex;

use serde::Serialize;
use serde_json::Value;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::task::JoinHandle;
use toolgate_config::AuditConfig;

use crate::auth::now_millis;
use crate::envelope::FailureCode;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Event label for invocation records.
pub const TOOL_INVOCATION_EVENT: &str = "tool_invocation";
/// Subject recorded when the caller was not authenticated.
pub const ANONYMOUS_SUBJECT: &str = "anonymous";

// ============================================================================
// SECTION: Types
// ============================================================================

/// Final state of an audited invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditOutcome {
    /// Handler returned a payload.
    Success,
    /// Invocation ended in a failure envelope.
    Failure,
    /// Invocation was abandoned before completion.
    Cancelled,
}

/// Immutable record of one invocation attempt.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuditRecord {
    /// Event identifier.
    pub event: &'static str,
    /// Event timestamp (milliseconds since epoch).
    pub timestamp_ms: u128,
    /// Caller subject, or `anonymous`.
    pub subject: String,
    /// Requested tool name.
    pub tool_name: String,
    /// Arguments as received (credential fields stripped).
    pub arguments: Value,
    /// Outcome.
    pub outcome: AuditOutcome,
    /// Failure code when the outcome is a failure.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure_code: Option<FailureCode>,
    /// SHA-256 fingerprint prefix of the presented credential.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub credential_fingerprint: Option<String>,
    /// Request identifier when provided.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    /// Transport label.
    pub transport: &'static str,
}

impl AuditRecord {
    /// Builds a record stamped with the current time.
    #[must_use]
    pub fn new(
        subject: impl Into<String>,
        tool_name: impl Into<String>,
        arguments: Value,
        outcome: AuditOutcome,
        transport: &'static str,
    ) -> Self {
        Self {
            event: TOOL_INVOCATION_EVENT,
            timestamp_ms: now_millis(),
            subject: subject.into(),
            tool_name: tool_name.into(),
            arguments,
            outcome,
            failure_code: None,
            credential_fingerprint: None,
            request_id: None,
            transport,
        }
    }
}

// ============================================================================
// SECTION: Trait
// ============================================================================

/// Append-only destination for audit records.
pub trait AuditSink: Send + Sync {
    /// Appends a record. Must not block indefinitely or panic.
    fn append(&self, record: AuditRecord);
}

// ============================================================================
// SECTION: Sinks
// ============================================================================

/// Audit sink that logs JSON lines to stderr.
pub struct StderrAuditSink;

impl AuditSink for StderrAuditSink {
    fn append(&self, record: AuditRecord) {
        write_json_line(&mut io::stderr().lock(), &record);
    }
}

/// Audit sink that logs JSON lines to a file.
pub struct FileAuditSink {
    /// File handle used for append-only logging.
    file: Mutex<File>,
}

impl FileAuditSink {
    /// Opens the audit log file in append mode.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened.
    pub fn new(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            file: Mutex::new(file),
        })
    }
}

impl AuditSink for FileAuditSink {
    fn append(&self, record: AuditRecord) {
        match self.file.lock() {
            Ok(mut file) => write_json_line(&mut *file, &record),
            Err(_) => tracing::warn!("audit file lock poisoned; record dropped"),
        }
    }
}

/// Audit sink that buffers records in memory (tests and embedding).
#[derive(Default)]
pub struct InMemoryAuditSink {
    /// Appended records.
    records: Mutex<Vec<AuditRecord>>,
}

impl InMemoryAuditSink {
    /// Creates an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a snapshot of the appended records.
    #[must_use]
    pub fn records(&self) -> Vec<AuditRecord> {
        self.records.lock().map(|records| records.clone()).unwrap_or_default()
    }
}

impl AuditSink for InMemoryAuditSink {
    fn append(&self, record: AuditRecord) {
        if let Ok(mut records) = self.records.lock() {
            records.push(record);
        }
    }
}

/// No-op audit sink.
pub struct NoopAuditSink;

impl AuditSink for NoopAuditSink {
    fn append(&self, _record: AuditRecord) {}
}

/// Bounded queue in front of a slower sink, drained by a blocking writer.
pub struct BufferedAuditSink {
    /// Queue sender; `None` after shutdown.
    sender: Mutex<Option<mpsc::Sender<AuditRecord>>>,
    /// Writer task handle; `None` after shutdown.
    writer: Mutex<Option<JoinHandle<()>>>,
}

impl BufferedAuditSink {
    /// Starts the writer. Must be called inside a Tokio runtime.
    #[must_use]
    pub fn spawn(inner: Arc<dyn AuditSink>, capacity: usize) -> Self {
        let (sender, mut receiver) = mpsc::channel::<AuditRecord>(capacity.max(1));
        let writer = tokio::task::spawn_blocking(move || {
            while let Some(record) = receiver.blocking_recv() {
                inner.append(record);
            }
        });
        Self {
            sender: Mutex::new(Some(sender)),
            writer: Mutex::new(Some(writer)),
        }
    }

    /// Closes the queue and waits for queued records to be written.
    pub async fn shutdown(&self) {
        if let Ok(mut sender) = self.sender.lock() {
            sender.take();
        }
        let writer = self.writer.lock().ok().and_then(|mut writer| writer.take());
        if let Some(writer) = writer
            && let Err(err) = writer.await
        {
            tracing::warn!(error = %err, "audit writer task failed");
        }
    }
}

impl AuditSink for BufferedAuditSink {
    fn append(&self, record: AuditRecord) {
        let Ok(sender) = self.sender.lock() else {
            tracing::warn!("audit queue lock poisoned; record dropped");
            return;
        };
        let Some(sender) = sender.as_ref() else {
            tracing::warn!(tool = %record.tool_name, "audit queue closed; record dropped");
            return;
        };
        match sender.try_send(record) {
            Ok(()) => {}
            Err(TrySendError::Full(record)) => {
                tracing::warn!(tool = %record.tool_name, "audit queue full; record dropped");
            }
            Err(TrySendError::Closed(record)) => {
                tracing::warn!(tool = %record.tool_name, "audit writer stopped; record dropped");
            }
        }
    }
}

// ============================================================================
// SECTION: Pipeline
// ============================================================================

/// Audit sink assembled from configuration.
pub struct AuditPipeline {
    /// Sink handed to the gateway.
    pub sink: Arc<dyn AuditSink>,
    /// Buffered front, when one is running.
    buffered: Option<Arc<BufferedAuditSink>>,
}

impl AuditPipeline {
    /// Builds the configured sink. Must be called inside a Tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns an error when the audit file cannot be opened.
    pub fn from_config(config: &AuditConfig) -> io::Result<Self> {
        if !config.enabled {
            return Ok(Self {
                sink: Arc::new(NoopAuditSink),
                buffered: None,
            });
        }
        let inner: Arc<dyn AuditSink> = match &config.path {
            Some(path) => Arc::new(FileAuditSink::new(Path::new(path))?),
            None => Arc::new(StderrAuditSink),
        };
        let buffered = Arc::new(BufferedAuditSink::spawn(inner, config.buffer_capacity));
        Ok(Self {
            sink: Arc::clone(&buffered) as Arc<dyn AuditSink>,
            buffered: Some(buffered),
        })
    }

    /// Flushes queued records.
    pub async fn shutdown(&self) {
        if let Some(buffered) = &self.buffered {
            buffered.shutdown().await;
        }
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Serializes a record as one JSON line, reporting failures diagnostically.
fn write_json_line(writer: &mut dyn Write, record: &AuditRecord) {
    let payload = match serde_json::to_string(record) {
        Ok(payload) => payload,
        Err(err) => {
            tracing::warn!(error = %err, "audit record serialization failed");
            return;
        }
    };
    if let Err(err) = writeln!(writer, "{payload}").and_then(|()| writer.flush()) {
        tracing::warn!(error = %err, "audit write failed");
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
