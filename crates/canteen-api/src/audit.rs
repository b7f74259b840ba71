// crates/canteen-api/src/audit.rs
// ============================================================================
// Module: API Audit Logging
// Description: Structured audit events for HTTP request handling.
// Purpose: Emit JSON-line audit records without a logging framework.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! Audit events are flat JSON objects written one per line. Sinks decide
//! where the lines go: stderr, an append-only file, or nowhere. Events never
//! carry request bodies, tokens, or passwords.

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

use canteen_config::ServerAuditConfig;
use serde::Serialize;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Completed HTTP request event.
#[derive(Debug, Clone, Serialize)]
pub struct RequestAuditEvent {
    /// Event identifier.
    pub event: &'static str,
    /// Event timestamp (milliseconds since epoch).
    pub timestamp_ms: u128,
    /// HTTP method.
    pub method: String,
    /// Request path without the query string.
    pub path: String,
    /// Response status code.
    pub status: u16,
    /// Handling latency in milliseconds.
    pub latency_ms: u128,
    /// Token subject when a valid bearer token was presented.
    pub subject: Option<String>,
    /// Peer IP address when available.
    pub peer_ip: Option<String>,
}

/// Authentication or authorization decision event.
#[derive(Debug, Clone, Serialize)]
pub struct AuthDecisionEvent {
    /// Event identifier.
    pub event: &'static str,
    /// Event timestamp (milliseconds since epoch).
    pub timestamp_ms: u128,
    /// Whether access was granted.
    pub allowed: bool,
    /// Decision reason label.
    pub reason: &'static str,
    /// Route class (`user` or `admin`).
    pub route_class: &'static str,
    /// Request path without the query string.
    pub path: String,
    /// Subject when known.
    pub subject: Option<String>,
}

/// Internal service failure event.
#[derive(Debug, Clone, Serialize)]
pub struct ServiceErrorEvent {
    /// Event identifier.
    pub event: &'static str,
    /// Event timestamp (milliseconds since epoch).
    pub timestamp_ms: u128,
    /// Request path without the query string.
    pub path: String,
    /// Response status code; zero when the failure did not shape a response.
    pub status: u16,
    /// Error detail withheld from the client.
    pub detail: String,
}

/// Security posture event.
#[derive(Debug, Clone, Serialize)]
pub struct SecurityAuditEvent {
    /// Event identifier.
    pub event: &'static str,
    /// Event timestamp (milliseconds since epoch).
    pub timestamp_ms: u128,
    /// Security event kind.
    pub kind: &'static str,
    /// Human-readable message.
    pub message: String,
}

impl RequestAuditEvent {
    /// Creates a request event stamped with the current time.
    #[must_use]
    pub fn new(
        method: String,
        path: String,
        status: u16,
        latency_ms: u128,
        subject: Option<String>,
        peer_ip: Option<String>,
    ) -> Self {
        Self {
            event: "http_request",
            timestamp_ms: now_ms(),
            method,
            path,
            status,
            latency_ms,
            subject,
            peer_ip,
        }
    }
}

impl AuthDecisionEvent {
    /// Creates an auth decision event stamped with the current time.
    #[must_use]
    pub fn new(
        allowed: bool,
        reason: &'static str,
        route_class: &'static str,
        path: String,
        subject: Option<String>,
    ) -> Self {
        Self {
            event: "auth_decision",
            timestamp_ms: now_ms(),
            allowed,
            reason,
            route_class,
            path,
            subject,
        }
    }
}

impl ServiceErrorEvent {
    /// Creates a service error event stamped with the current time.
    #[must_use]
    pub fn new(path: String, status: u16, detail: String) -> Self {
        Self {
            event: "service_error",
            timestamp_ms: now_ms(),
            path,
            status,
            detail,
        }
    }

    /// Creates an event for a best-effort cleanup step that failed after the
    /// request outcome was settled.
    #[must_use]
    pub fn cleanup(path: String, detail: String) -> Self {
        Self::new(path, 0, detail)
    }
}

impl SecurityAuditEvent {
    /// Creates a security event stamped with the current time.
    #[must_use]
    pub fn new(kind: &'static str, message: impl Into<String>) -> Self {
        Self {
            event: "security_audit",
            timestamp_ms: now_ms(),
            kind,
            message: message.into(),
        }
    }
}

// ============================================================================
// SECTION: Trait
// ============================================================================

/// Audit sink for API events.
pub trait ApiAuditSink: Send + Sync {
    /// Record a completed request.
    fn record_request(&self, event: &RequestAuditEvent);

    /// Record an auth decision.
    fn record_auth(&self, _event: &AuthDecisionEvent) {}

    /// Record an internal service error.
    fn record_error(&self, _event: &ServiceErrorEvent) {}

    /// Record a security posture event.
    fn record_security(&self, _event: &SecurityAuditEvent) {}
}

/// Audit sink that logs JSON lines to stderr.
pub struct StderrAuditSink;

impl StderrAuditSink {
    /// Writes one serialized event to stderr.
    fn emit(event: &impl Serialize) {
        if let Ok(payload) = serde_json::to_string(event) {
            let _ = writeln!(io::stderr(), "{payload}");
        }
    }
}

impl ApiAuditSink for StderrAuditSink {
    fn record_request(&self, event: &RequestAuditEvent) {
        Self::emit(event);
    }

    fn record_auth(&self, event: &AuthDecisionEvent) {
        Self::emit(event);
    }

    fn record_error(&self, event: &ServiceErrorEvent) {
        Self::emit(event);
    }

    fn record_security(&self, event: &SecurityAuditEvent) {
        Self::emit(event);
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

    /// Appends one serialized event and flushes.
    fn emit(&self, event: &impl Serialize) {
        if let Ok(payload) = serde_json::to_string(event)
            && let Ok(mut file) = self.file.lock()
        {
            let _ = writeln!(file, "{payload}");
            let _ = file.flush();
        }
    }
}

impl ApiAuditSink for FileAuditSink {
    fn record_request(&self, event: &RequestAuditEvent) {
        self.emit(event);
    }

    fn record_auth(&self, event: &AuthDecisionEvent) {
        self.emit(event);
    }

    fn record_error(&self, event: &ServiceErrorEvent) {
        self.emit(event);
    }

    fn record_security(&self, event: &SecurityAuditEvent) {
        self.emit(event);
    }
}

/// No-op audit sink.
pub struct NoopAuditSink;

impl ApiAuditSink for NoopAuditSink {
    fn record_request(&self, _event: &RequestAuditEvent) {}
}

/// Builds the sink selected by `[server.audit]`.
///
/// # Errors
///
/// Returns an error when the audit file cannot be opened.
pub fn sink_from_config(config: &ServerAuditConfig) -> io::Result<Arc<dyn ApiAuditSink>> {
    if !config.enabled {
        return Ok(Arc::new(NoopAuditSink));
    }
    match &config.path {
        Some(path) => Ok(Arc::new(FileAuditSink::new(Path::new(path))?)),
        None => Ok(Arc::new(StderrAuditSink)),
    }
}

/// Milliseconds since the unix epoch.
fn now_ms() -> u128 {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_millis()
}

// ============================================================================
// SECTION: Tests
// ============================================================================
