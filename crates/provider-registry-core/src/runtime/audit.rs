// crates/provider-registry-core/src/runtime/audit.rs
// ============================================================================
// Module: Provider Audit Logging
// Description: Structured audit events for registry operations.
// Purpose: Emit JSON-lines audit records through a pluggable sink.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! [`AuditInterceptor`] is an ordinary [`ProviderInterceptor`] that records
//! one [`ProviderAuditEvent`] per completed operation. Events never contain
//! configuration payloads; only the operation label, the addressed entity,
//! and the outcome are recorded.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs::OpenOptions;
use std::io;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use std::sync::Mutex;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use serde::Serialize;

use crate::runtime::interceptor::InterceptorError;
use crate::runtime::interceptor::OperationOutcome;
use crate::runtime::interceptor::ProviderInterceptor;
use crate::runtime::interceptor::ProviderOperation;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Provider registry audit event payload.
#[derive(Debug, Clone, Serialize)]
pub struct ProviderAuditEvent {
    /// Event identifier.
    pub event: &'static str,
    /// Event timestamp (milliseconds since epoch).
    pub timestamp_ms: u128,
    /// Operation label.
    pub operation: &'static str,
    /// Addressed entity, when the operation has one.
    pub target: Option<String>,
    /// `success` or `failure`.
    pub outcome: &'static str,
    /// Error kind for failed operations.
    pub error_kind: Option<&'static str>,
}

impl ProviderAuditEvent {
    /// Creates an audit event for an operation and its outcome.
    #[must_use]
    pub fn new(operation: &ProviderOperation<'_>, outcome: &OperationOutcome<'_>) -> Self {
        let timestamp_ms =
            SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_millis();
        Self {
            event: "provider_audit",
            timestamp_ms,
            operation: operation.name(),
            target: operation.target(),
            outcome: outcome.label(),
            error_kind: outcome.error_kind(),
        }
    }
}

// ============================================================================
// SECTION: Sinks
// ============================================================================

/// Audit sink for provider registry events.
pub trait ProviderAuditSink: Send + Sync {
    /// Record an audit event.
    ///
    /// # Errors
    ///
    /// Returns [`io::Error`] when the event cannot be written.
    fn record(&self, event: &ProviderAuditEvent) -> io::Result<()>;
}

/// Audit sink that logs JSON lines to stderr.
pub struct StderrAuditSink;

impl ProviderAuditSink for StderrAuditSink {
    fn record(&self, event: &ProviderAuditEvent) -> io::Result<()> {
        let payload = serde_json::to_string(event)?;
        writeln!(io::stderr(), "{payload}")
    }
}

/// Audit sink that appends JSON lines to a file.
pub struct FileAuditSink {
    /// File handle used for append-only logging.
    file: Mutex<std::fs::File>,
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

impl ProviderAuditSink for FileAuditSink {
    fn record(&self, event: &ProviderAuditEvent) -> io::Result<()> {
        let payload = serde_json::to_string(event)?;
        let mut file =
            self.file.lock().map_err(|_| io::Error::other("audit file mutex poisoned"))?;
        writeln!(file, "{payload}")?;
        file.flush()
    }
}

/// No-op audit sink.
pub struct NoopAuditSink;

impl ProviderAuditSink for NoopAuditSink {
    fn record(&self, _event: &ProviderAuditEvent) -> io::Result<()> {
        Ok(())
    }
}

// ============================================================================
// SECTION: Interceptor
// ============================================================================

/// Interceptor that writes one audit event per completed operation.
#[derive(Clone)]
pub struct AuditInterceptor {
    /// Destination sink.
    sink: Arc<dyn ProviderAuditSink>,
}

impl AuditInterceptor {
    /// Creates an audit interceptor writing to `sink`.
    #[must_use]
    pub fn new(sink: Arc<dyn ProviderAuditSink>) -> Self {
        Self {
            sink,
        }
    }
}

impl ProviderInterceptor for AuditInterceptor {
    fn name(&self) -> &str {
        "audit"
    }

    fn after(
        &self,
        operation: &ProviderOperation<'_>,
        outcome: &OperationOutcome<'_>,
    ) -> Result<(), InterceptorError> {
        let event = ProviderAuditEvent::new(operation, outcome);
        self.sink.record(&event).map_err(|err| InterceptorError::new("audit", err.to_string()))
    }
}
