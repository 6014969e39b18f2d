// brewery-api/src/audit.rs
// ============================================================================
// Module: Brewery API Audit Logging
// Description: Structured audit events for brewery request handling.
// Purpose: Emit JSON-line audit logs without a logging framework.
// Dependencies: brewery-config, brewery-core, serde, serde_json
// ============================================================================

//! ## Overview
//! Every request yields one [`ApiAuditEvent`]; every capability decision
//! yields one [`AuthAuditEvent`]. Sinks serialize events as JSON lines to
//! stderr or an append-only file. Request bodies are never logged.

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

use brewery_config::ServerAuditConfig;
use brewery_core::BreweryId;
use serde::Serialize;

use crate::auth::AuthAuditEvent;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Request outcome classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ApiOutcome {
    /// Request completed with a 2xx status.
    Ok,
    /// Request failed.
    Error,
}

/// Brewery request audit event payload.
#[derive(Debug, Clone, Serialize)]
pub struct ApiAuditEvent {
    /// Event identifier.
    pub event: &'static str,
    /// Event timestamp (milliseconds since epoch).
    pub timestamp_ms: u128,
    /// Request identifier when provided.
    pub request_id: Option<String>,
    /// Peer IP address when available.
    pub peer_ip: Option<String>,
    /// HTTP method.
    pub method: &'static str,
    /// Route template.
    pub route: &'static str,
    /// Response status code.
    pub status: u16,
    /// Request outcome.
    pub outcome: ApiOutcome,
    /// Error kind label when the request failed.
    pub error_kind: Option<&'static str>,
    /// Brewery identifier addressed by the request, if any.
    pub brewery_id: Option<BreweryId>,
    /// Caller subject when resolved.
    pub subject: Option<String>,
    /// Request body size in bytes.
    pub request_bytes: usize,
}

/// Inputs required to construct a request audit event.
pub struct ApiAuditEventParams {
    /// Request identifier when provided.
    pub request_id: Option<String>,
    /// Peer IP address if known.
    pub peer_ip: Option<String>,
    /// HTTP method.
    pub method: &'static str,
    /// Route template.
    pub route: &'static str,
    /// Response status code.
    pub status: u16,
    /// Error kind label when the request failed.
    pub error_kind: Option<&'static str>,
    /// Brewery identifier addressed by the request.
    pub brewery_id: Option<BreweryId>,
    /// Caller subject when resolved.
    pub subject: Option<String>,
    /// Request body size in bytes.
    pub request_bytes: usize,
}

impl ApiAuditEvent {
    /// Creates a new audit event with a consistent timestamp.
    #[must_use]
    pub fn new(params: ApiAuditEventParams) -> Self {
        let timestamp_ms =
            SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_millis();
        let outcome = if params.error_kind.is_none() { ApiOutcome::Ok } else { ApiOutcome::Error };
        Self {
            event: "brewery_request",
            timestamp_ms,
            request_id: params.request_id,
            peer_ip: params.peer_ip,
            method: params.method,
            route: params.route,
            status: params.status,
            outcome,
            error_kind: params.error_kind,
            brewery_id: params.brewery_id,
            subject: params.subject,
            request_bytes: params.request_bytes,
        }
    }
}

// ============================================================================
// SECTION: Trait
// ============================================================================

/// Audit sink for brewery API events.
pub trait ApiAuditSink: Send + Sync {
    /// Record a request audit event.
    fn record(&self, event: &ApiAuditEvent);

    /// Record an auth decision event.
    fn record_auth(&self, _event: &AuthAuditEvent) {}
}

/// Audit sink that logs JSON lines to stderr.
pub struct StderrAuditSink;

impl ApiAuditSink for StderrAuditSink {
    fn record(&self, event: &ApiAuditEvent) {
        write_stderr_line(event);
    }

    fn record_auth(&self, event: &AuthAuditEvent) {
        write_stderr_line(event);
    }
}

/// Audit sink that logs JSON lines to a file.
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

    /// Appends one serialized event.
    fn write_line(&self, event: &impl Serialize) {
        if let Ok(payload) = serde_json::to_string(event)
            && let Ok(mut file) = self.file.lock()
        {
            let _ = writeln!(file, "{payload}");
            let _ = file.flush();
        }
    }
}

impl ApiAuditSink for FileAuditSink {
    fn record(&self, event: &ApiAuditEvent) {
        self.write_line(event);
    }

    fn record_auth(&self, event: &AuthAuditEvent) {
        self.write_line(event);
    }
}

/// No-op audit sink.
pub struct NoopAuditSink;

impl ApiAuditSink for NoopAuditSink {
    fn record(&self, _event: &ApiAuditEvent) {}
}

/// Builds the audit sink selected by configuration.
///
/// # Errors
///
/// Returns an error when the configured audit file cannot be opened.
pub fn audit_sink_from_config(config: &ServerAuditConfig) -> io::Result<Arc<dyn ApiAuditSink>> {
    if !config.enabled {
        return Ok(Arc::new(NoopAuditSink));
    }
    match &config.path {
        Some(path) => Ok(Arc::new(FileAuditSink::new(path)?)),
        None => Ok(Arc::new(StderrAuditSink)),
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Writes one serialized event to stderr.
fn write_stderr_line(event: &impl Serialize) {
    if let Ok(payload) = serde_json::to_string(event) {
        let _ = writeln!(io::stderr(), "{payload}");
    }
}
