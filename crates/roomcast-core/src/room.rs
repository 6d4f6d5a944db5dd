//! Room state: bounded membership, bounded history, broadcast fan-out.

use crate::connection::{ConnectionId, Member};
use crate::message::compose_message;
use roomcast_protocol::{ChatMessage, ServerFrame};
use std::collections::{HashMap, VecDeque};
use thiserror::Error;
use tracing::{debug, trace};

/// Bounds applied to every room.
#[derive(Debug, Clone)]
pub struct RelayLimits {
    /// Maximum participants per room.
    pub capacity: usize,
    /// Maximum retained history entries per room.
    pub history_limit: usize,
    /// Maximum display name length in characters.
    pub max_name_length: usize,
    /// Maximum message text length in characters.
    pub max_text_length: usize,
}

impl Default for RelayLimits {
    fn default() -> Self {
        Self {
            capacity: 2,
            history_limit: 100,
            max_name_length: 32,
            max_text_length: 2000,
        }
    }
}

/// Room errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RoomError {
    /// The room is at capacity; terminal for the joining connection.
    #[error("Room is full ({capacity} participants max).")]
    Full { capacity: usize },
}

/// What a successful admission hands back to the joiner.
#[derive(Debug, Clone)]
pub struct Admission {
    /// Participant count including the new member.
    pub participants: usize,
    /// History snapshot at admission time, oldest first. A copy, not a
    /// live view; messages accepted afterwards do not appear in it.
    pub history: Vec<ChatMessage>,
}

/// What a departure leaves behind, for logging and bookkeeping.
#[derive(Debug, Clone)]
pub struct Departure {
    /// Display name of the member that left.
    pub name: String,
    /// Participants remaining after the departure.
    pub remaining: usize,
}

/// A named room: the broadcast domain for a bounded set of participants.
#[derive(Debug)]
pub struct Room {
    /// Room identifier.
    id: String,
    /// Current participants keyed by connection.
    members: HashMap<ConnectionId, Member>,
    /// Retained chat messages, oldest first.
    history: VecDeque<ChatMessage>,
    /// Bounds for this room.
    limits: RelayLimits,
    /// Set once the last member leaves; a retired room admits nobody.
    retired: bool,
}

impl Room {
    /// Create an empty room.
    #[must_use]
    pub fn new(id: impl Into<String>, limits: RelayLimits) -> Self {
        Self {
            id: id.into(),
            members: HashMap::new(),
            history: VecDeque::new(),
            limits,
            retired: false,
        }
    }

    /// Get the room id.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Get the number of participants.
    #[must_use]
    pub fn participant_count(&self) -> usize {
        self.members.len()
    }

    /// Check if the room has no participants.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Check if the room has been retired.
    #[must_use]
    pub fn is_retired(&self) -> bool {
        self.retired
    }

    /// Admit a member, announcing it to the existing participants.
    ///
    /// Existing members receive a `peer-joined` frame; the joiner receives
    /// nothing here. Capacity is checked before any state changes, so a
    /// rejected connection leaves no trace.
    ///
    /// # Errors
    ///
    /// Returns [`RoomError::Full`] when the room is at capacity.
    pub fn admit(&mut self, member: Member) -> Result<Admission, RoomError> {
        if self.members.len() >= self.limits.capacity {
            return Err(RoomError::Full {
                capacity: self.limits.capacity,
            });
        }

        let id = member.id().clone();
        let name = member.name().to_string();
        self.members.insert(id.clone(), member);
        let participants = self.members.len();

        self.broadcast_except(&id, ServerFrame::peer_joined(name.as_str(), participants));
        debug!(room = %self.id, connection = %id, name = %name, participants, "Member joined");

        Ok(Admission {
            participants,
            history: self.history.iter().cloned().collect(),
        })
    }

    /// Accept a chat message from `sender` and relay it to everyone else.
    ///
    /// The message is stamped with the sender's display name, an id, and a
    /// timestamp, appended to history (evicting the oldest entry past the
    /// limit), then fanned out to all members except the sender. Returns
    /// the stored message so the caller can acknowledge it, or `None` when
    /// the sender is not a participant.
    pub fn broadcast_message(
        &mut self,
        sender: &ConnectionId,
        client_id: Option<String>,
        text: &str,
    ) -> Option<ChatMessage> {
        let from = self.members.get(sender)?.name().to_string();
        let message = compose_message(from, client_id, text, self.limits.max_text_length);

        self.history.push_back(message.clone());
        if self.history.len() > self.limits.history_limit {
            self.history.pop_front();
        }

        trace!(room = %self.id, id = %message.id, "Relaying message");
        self.broadcast_except(sender, ServerFrame::message(message.clone()));
        Some(message)
    }

    /// Relay a typing indicator from `sender` to everyone else.
    ///
    /// Typing state is transient: it is never stored and unknown senders
    /// are ignored.
    pub fn broadcast_typing(&self, sender: &ConnectionId, is_typing: bool) {
        if let Some(member) = self.members.get(sender) {
            self.broadcast_except(sender, ServerFrame::typing(member.name(), is_typing));
        }
    }

    /// Deliver a frame to a single member, best-effort.
    ///
    /// Returns `true` if the frame was queued.
    pub fn send_to(&self, target: &ConnectionId, frame: ServerFrame) -> bool {
        match self.members.get(target) {
            Some(member) => member.send(frame),
            None => false,
        }
    }

    /// Remove a member, announcing the departure to those remaining.
    ///
    /// The room retires itself when the last member leaves; a retired room
    /// is a husk waiting for the registry to reclaim it. Returns `None`
    /// when the connection was not a participant.
    pub fn leave(&mut self, connection: &ConnectionId) -> Option<Departure> {
        let member = self.members.remove(connection)?;
        let remaining = self.members.len();

        let frame = ServerFrame::peer_left(member.name(), remaining);
        for peer in self.members.values() {
            peer.send(frame.clone());
        }

        if remaining == 0 {
            self.retired = true;
        }
        debug!(room = %self.id, connection = %connection, remaining, "Member left");

        Some(Departure {
            name: member.name().to_string(),
            remaining,
        })
    }

    /// Send a frame to every member except `excluded`.
    fn broadcast_except(&self, excluded: &ConnectionId, frame: ServerFrame) {
        for member in self.members.values() {
            if member.id() == excluded {
                continue;
            }
            member.send(frame.clone());
        }
    }
}
