//! Frame types for the Roomcast protocol.
//!
//! One JSON object per WebSocket text frame, discriminated by a `type` field.
//! Inbound and outbound directions use separate enums: the server tolerates
//! unknown inbound kinds (they map to [`ClientFrame::Unknown`]) while
//! outbound frames are always one of the shapes listed here.

use serde::{Deserialize, Serialize};

/// A chat message as stored in room history and relayed to peers.
///
/// `from` is a snapshot of the sender's display name at send time; `ts` is
/// the server timestamp (milliseconds since the Unix epoch) assigned when
/// the room accepted the message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Message identifier, client-supplied or server-generated.
    pub id: String,
    /// Sender display name at send time.
    pub from: String,
    /// Message body.
    pub text: String,
    /// Server timestamp in milliseconds since the Unix epoch.
    pub ts: u64,
}

/// Frames received from clients.
///
/// Unknown fields are ignored on every variant; unknown `type` tags decode
/// to [`ClientFrame::Unknown`]. Frames that are not well-formed JSON, or
/// that are missing a required field (`message` without a string `text`),
/// fail to decode entirely and are dropped by the session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ClientFrame {
    /// Send a chat message to the room.
    #[serde(rename = "message")]
    Message {
        /// Optional client-chosen message id.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        id: Option<String>,
        /// Message body.
        text: String,
    },

    /// Report the sender's typing state to the room.
    #[serde(rename = "typing")]
    Typing {
        /// Whether the sender is currently typing.
        #[serde(default, rename = "isTyping")]
        is_typing: bool,
    },

    /// Application-level liveness check; answered with a `pong`.
    #[serde(rename = "ping")]
    Ping,

    /// Any unrecognized frame kind; ignored by the server.
    #[serde(other)]
    Unknown,
}

impl ClientFrame {
    /// The wire tag of this frame, for logging.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            ClientFrame::Message { .. } => "message",
            ClientFrame::Typing { .. } => "typing",
            ClientFrame::Ping => "ping",
            ClientFrame::Unknown => "unknown",
        }
    }
}

/// Frames sent to clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ServerFrame {
    /// Join acknowledgment: normalized identity plus catch-up history.
    ///
    /// Always the first frame a member receives; `history` is a snapshot
    /// taken at admission, never duplicated by the live broadcast path.
    #[serde(rename = "init")]
    Init {
        /// Normalized room id.
        room: String,
        /// Normalized display name.
        name: String,
        /// Participant count including the new member.
        participants: usize,
        /// Recent messages, oldest first.
        history: Vec<ChatMessage>,
    },

    /// Another participant joined the room.
    #[serde(rename = "peer-joined")]
    PeerJoined {
        /// Display name of the new participant.
        name: String,
        /// Updated participant count.
        participants: usize,
    },

    /// A participant left the room.
    #[serde(rename = "peer-left")]
    PeerLeft {
        /// Display name of the departed participant.
        name: String,
        /// Updated participant count.
        participants: usize,
    },

    /// A chat message from another participant.
    #[serde(rename = "message")]
    Message(ChatMessage),

    /// Acknowledgment of the sender's own message; the sender never
    /// receives its own text back as a `message` frame.
    #[serde(rename = "message-ack")]
    MessageAck {
        /// Id of the accepted message.
        id: String,
        /// Server timestamp assigned to the message.
        ts: u64,
    },

    /// Typing state of another participant. Transient, never stored.
    #[serde(rename = "typing")]
    Typing {
        /// Display name of the typing participant.
        from: String,
        /// Whether that participant is currently typing.
        #[serde(rename = "isTyping")]
        is_typing: bool,
    },

    /// Reply to a `ping`, carrying the current server timestamp.
    #[serde(rename = "pong")]
    Pong {
        /// Milliseconds since the Unix epoch.
        ts: u64,
    },

    /// Terminal error notice, sent before the server closes the connection.
    #[serde(rename = "error")]
    Error {
        /// Human-readable reason.
        message: String,
    },
}

impl ServerFrame {
    /// Create a new Init frame.
    #[must_use]
    pub fn init(
        room: impl Into<String>,
        name: impl Into<String>,
        participants: usize,
        history: Vec<ChatMessage>,
    ) -> Self {
        ServerFrame::Init {
            room: room.into(),
            name: name.into(),
            participants,
            history,
        }
    }

    /// Create a new PeerJoined frame.
    #[must_use]
    pub fn peer_joined(name: impl Into<String>, participants: usize) -> Self {
        ServerFrame::PeerJoined {
            name: name.into(),
            participants,
        }
    }

    /// Create a new PeerLeft frame.
    #[must_use]
    pub fn peer_left(name: impl Into<String>, participants: usize) -> Self {
        ServerFrame::PeerLeft {
            name: name.into(),
            participants,
        }
    }

    /// Create a new Message frame.
    #[must_use]
    pub fn message(message: ChatMessage) -> Self {
        ServerFrame::Message(message)
    }

    /// Create the acknowledgment for an accepted message.
    #[must_use]
    pub fn ack(message: &ChatMessage) -> Self {
        ServerFrame::MessageAck {
            id: message.id.clone(),
            ts: message.ts,
        }
    }

    /// Create a new Typing frame.
    #[must_use]
    pub fn typing(from: impl Into<String>, is_typing: bool) -> Self {
        ServerFrame::Typing {
            from: from.into(),
            is_typing,
        }
    }

    /// Create a Pong frame stamped with the server clock.
    #[must_use]
    pub fn pong(ts: u64) -> Self {
        ServerFrame::Pong { ts }
    }

    /// Create an Error frame with a human-readable reason.
    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        ServerFrame::Error {
            message: message.into(),
        }
    }

    /// The wire tag of this frame, for logging.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            ServerFrame::Init { .. } => "init",
            ServerFrame::PeerJoined { .. } => "peer-joined",
            ServerFrame::PeerLeft { .. } => "peer-left",
            ServerFrame::Message(_) => "message",
            ServerFrame::MessageAck { .. } => "message-ack",
            ServerFrame::Typing { .. } => "typing",
            ServerFrame::Pong { .. } => "pong",
            ServerFrame::Error { .. } => "error",
        }
    }
}
