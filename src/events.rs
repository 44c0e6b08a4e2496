//! Session and transfer notifications.
//!
//! [`ArtifactTransport`](crate::transport::ArtifactTransport) reports the
//! connection lifecycle and every transfer to a pair of sinks.  Hosts plug
//! their own sinks in; [`TracingEvents`] just logs.

use std::fmt;
use tracing::{debug, info, trace, warn};

/// Connection lifecycle notifications, in firing order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    Opening,
    LoggedIn,
    Opened,
    Disconnecting,
    LoggedOff,
    Disconnected,
}

impl fmt::Display for SessionEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionEvent::Opening => "opening",
            SessionEvent::LoggedIn => "logged in",
            SessionEvent::Opened => "opened",
            SessionEvent::Disconnecting => "disconnecting",
            SessionEvent::LoggedOff => "logged off",
            SessionEvent::Disconnected => "disconnected",
        };
        f.write_str(name)
    }
}

/// Direction of a transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestKind {
    Get,
    Put,
}

impl fmt::Display for RequestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestKind::Get => f.write_str("GET"),
            RequestKind::Put => f.write_str("PUT"),
        }
    }
}

/// What happened to a transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferEventKind {
    Initiated,
    Started,
    /// `bytes` more bytes moved.
    Progress { bytes: usize },
    Completed,
    /// The transfer ended with an error of kind `code`.
    Failed { code: &'static str, message: String },
}

/// One transfer notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferEvent {
    /// Logical path of the artifact.
    pub resource: String,
    pub request: RequestKind,
    pub kind: TransferEventKind,
}

impl TransferEvent {
    pub fn new(resource: &str, request: RequestKind, kind: TransferEventKind) -> Self {
        Self {
            resource: resource.to_string(),
            request,
            kind,
        }
    }
}

/// Receives connection lifecycle notifications.
pub trait SessionEventSink {
    fn fire_session_event(&mut self, event: SessionEvent);
}

/// Receives transfer notifications.
pub trait TransferEventSink {
    fn fire_transfer_event(&mut self, event: TransferEvent);
}

/// Logs every event through `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingEvents;

impl SessionEventSink for TracingEvents {
    fn fire_session_event(&mut self, event: SessionEvent) {
        debug!("Session {}", event);
    }
}

impl TransferEventSink for TracingEvents {
    fn fire_transfer_event(&mut self, event: TransferEvent) {
        let TransferEvent {
            resource,
            request,
            kind,
        } = event;
        match kind {
            TransferEventKind::Initiated => debug!("{} initiated: {}", request, resource),
            TransferEventKind::Started => info!("{} started: {}", request, resource),
            TransferEventKind::Progress { bytes } => {
                trace!("{} progress: {} +{} bytes", request, resource, bytes)
            }
            TransferEventKind::Completed => info!("{} completed: {}", request, resource),
            TransferEventKind::Failed { code, message } => {
                warn!("{} failed: {} ({}): {}", request, resource, code, message)
            }
        }
    }
}
