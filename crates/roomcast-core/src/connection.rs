//! Connection identity and the room-side view of a participant.

use roomcast_protocol::ServerFrame;
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::sync::mpsc;
use tracing::trace;

/// Per-connection outbound frame queue.
///
/// Sends never block, so room state is never held across a network write;
/// the transport drains the queue at its own pace.
pub type Outbound = mpsc::UnboundedSender<ServerFrame>;

/// A unique connection identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConnectionId(String);

impl ConnectionId {
    /// Create a connection ID from an existing string.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generate a fresh connection ID.
    #[must_use]
    pub fn generate() -> Self {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos();
        Self(format!("conn_{timestamp:x}"))
    }

    /// View the ID as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ConnectionId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for ConnectionId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// A room's handle to one participant.
///
/// The room never owns the socket; it holds the participant's display name
/// and the outbound queue used for delivery.
#[derive(Debug)]
pub struct Member {
    id: ConnectionId,
    name: String,
    outbound: Outbound,
}

impl Member {
    /// Create a member from its identity and outbound queue.
    #[must_use]
    pub fn new(id: ConnectionId, name: impl Into<String>, outbound: Outbound) -> Self {
        Self {
            id,
            name: name.into(),
            outbound,
        }
    }

    /// Get the connection ID.
    #[must_use]
    pub fn id(&self) -> &ConnectionId {
        &self.id
    }

    /// Get the display name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Check if the outbound queue still has a live receiver.
    #[must_use]
    pub fn is_open(&self) -> bool {
        !self.outbound.is_closed()
    }

    /// Queue a frame for delivery, best-effort.
    ///
    /// A member whose transport has already gone away is skipped silently;
    /// returns `true` if the frame was queued.
    pub fn send(&self, frame: ServerFrame) -> bool {
        if !self.is_open() {
            trace!(connection = %self.id, kind = frame.kind(), "Skipping closed connection");
            return false;
        }
        self.outbound.send(frame).is_ok()
    }
}
