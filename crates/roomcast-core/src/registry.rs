//! Process-wide room registry.
//!
//! Rooms are created lazily on first join and reclaimed once empty. Each
//! map entry is locked for the duration of one operation, so admissions,
//! broadcasts, and departures touching the same room never interleave;
//! delivery itself goes through per-connection queues and happens outside
//! any lock.

use crate::connection::{ConnectionId, Member};
use crate::room::{Admission, Departure, RelayLimits, Room, RoomError};
use dashmap::DashMap;
use roomcast_protocol::{ChatMessage, ServerFrame};
use tracing::{debug, warn};

/// Registry of all active rooms.
#[derive(Debug)]
pub struct RoomRegistry {
    /// Room id to room state.
    rooms: DashMap<String, Room>,
    /// Bounds applied to every room created here.
    limits: RelayLimits,
}

/// Registry statistics.
#[derive(Debug, Clone)]
pub struct RegistryStats {
    /// Number of active rooms.
    pub room_count: usize,
    /// Total participants across all rooms.
    pub participant_count: usize,
}

impl RoomRegistry {
    /// Create a registry with default limits.
    #[must_use]
    pub fn new() -> Self {
        Self::with_limits(RelayLimits::default())
    }

    /// Create a registry with specific limits.
    #[must_use]
    pub fn with_limits(limits: RelayLimits) -> Self {
        Self {
            rooms: DashMap::new(),
            limits,
        }
    }

    /// Get the limits applied to rooms created here.
    #[must_use]
    pub fn limits(&self) -> &RelayLimits {
        &self.limits
    }

    /// Admit a member into a room, creating the room if needed.
    ///
    /// On success the joiner's `init` frame is queued before the room lock
    /// is released, so no live broadcast can reach the joiner ahead of it.
    /// Existing members see `peer-joined` from the admission itself.
    ///
    /// # Errors
    ///
    /// Returns [`RoomError::Full`] when the room is at capacity; the
    /// member is dropped and the room is left untouched.
    pub fn join(&self, room_id: &str, member: Member) -> Result<Admission, RoomError> {
        loop {
            let mut room = self
                .rooms
                .entry(room_id.to_string())
                .or_insert_with(|| {
                    debug!(room = %room_id, "Creating room");
                    Room::new(room_id, self.limits.clone())
                });

            // A raced teardown leaves a retired husk behind. Reclaim it
            // and retry against a fresh room.
            if room.is_retired() {
                drop(room);
                self.rooms.remove_if(room_id, |_, r| r.is_retired());
                continue;
            }

            let id = member.id().clone();
            let name = member.name().to_string();
            match room.admit(member) {
                Ok(admission) => {
                    room.send_to(
                        &id,
                        ServerFrame::init(
                            room_id,
                            name,
                            admission.participants,
                            admission.history.clone(),
                        ),
                    );
                    return Ok(admission);
                }
                Err(err) => {
                    let reclaim = room.is_empty();
                    drop(room);
                    if reclaim {
                        self.remove_if_empty(room_id);
                    }
                    return Err(err);
                }
            }
        }
    }

    /// Relay a chat message within a room.
    ///
    /// Returns the stored message for acknowledgement, or `None` when the
    /// room does not exist or the sender is not a participant.
    pub fn broadcast_message(
        &self,
        room_id: &str,
        sender: &ConnectionId,
        client_id: Option<String>,
        text: &str,
    ) -> Option<ChatMessage> {
        match self.rooms.get_mut(room_id) {
            Some(mut room) => room.broadcast_message(sender, client_id, text),
            None => {
                warn!(room = %room_id, connection = %sender, "Message for unknown room");
                None
            }
        }
    }

    /// Relay a typing indicator within a room.
    pub fn broadcast_typing(&self, room_id: &str, sender: &ConnectionId, is_typing: bool) {
        if let Some(room) = self.rooms.get(room_id) {
            room.broadcast_typing(sender, is_typing);
        }
    }

    /// Remove a connection from a room.
    ///
    /// Remaining members are notified inside the room lock. The emptied
    /// room retires itself; reclaiming the map entry is a separate
    /// [`remove_if_empty`](Self::remove_if_empty) call.
    pub fn leave(&self, room_id: &str, connection: &ConnectionId) -> Option<Departure> {
        let mut room = self.rooms.get_mut(room_id)?;
        room.leave(connection)
    }

    /// Drop a room if it has no participants.
    ///
    /// Returns `true` if the room was removed. Safe to call at any time;
    /// the check runs under the entry lock.
    pub fn remove_if_empty(&self, room_id: &str) -> bool {
        let removed = self
            .rooms
            .remove_if(room_id, |_, room| room.is_empty())
            .is_some();
        if removed {
            debug!(room = %room_id, "Removed empty room");
        }
        removed
    }

    /// Check whether a room currently exists.
    #[must_use]
    pub fn room_exists(&self, room_id: &str) -> bool {
        self.rooms.contains_key(room_id)
    }

    /// Get the participant count of a room, zero when absent.
    #[must_use]
    pub fn participant_count(&self, room_id: &str) -> usize {
        self.rooms
            .get(room_id)
            .map_or(0, |room| room.participant_count())
    }

    /// Get registry statistics.
    #[must_use]
    pub fn stats(&self) -> RegistryStats {
        let participant_count = self
            .rooms
            .iter()
            .map(|entry| entry.value().participant_count())
            .sum();
        RegistryStats {
            room_count: self.rooms.len(),
            participant_count,
        }
    }
}

impl Default for RoomRegistry {
    fn default() -> Self {
        Self::new()
    }
}
