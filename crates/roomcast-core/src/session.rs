//! Per-connection relay controller.
//!
//! A [`Session`] drives one participant's lifecycle against the registry:
//! admission, frame dispatch, teardown. The transport feeds it raw text
//! frames and close events; it never touches the socket itself, so the
//! whole state machine is testable without one.

use crate::connection::{ConnectionId, Member, Outbound};
use crate::identity::{normalize_display_name, normalize_room_id};
use crate::message::unix_millis;
use crate::registry::RoomRegistry;
use crate::room::RoomError;
use roomcast_protocol::{codec, ClientFrame, ServerFrame};
use std::sync::Arc;
use tracing::{debug, trace};

/// Raw join context handed over by the transport, before normalization.
#[derive(Debug, Clone, Default)]
pub struct JoinRequest {
    /// Requested room id.
    pub room: Option<String>,
    /// Requested display name.
    pub name: Option<String>,
}

/// Lifecycle phase of a session. Strictly forward; a closed session stays
/// closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// Join request received, admission pending.
    Connecting,
    /// Admitted; frames are dispatched.
    Joined,
    /// Teardown in progress.
    Leaving,
    /// Terminal.
    Closed,
}

/// Inputs that drive the session state machine.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// A decoded inbound frame.
    Frame(ClientFrame),
    /// The transport observed a clean close.
    Closed,
    /// The transport observed an error. Handled exactly like a close.
    Errored,
}

/// State for one connected participant.
#[derive(Debug)]
pub struct Session {
    id: ConnectionId,
    registry: Arc<RoomRegistry>,
    outbound: Outbound,
    room_id: String,
    name: String,
    phase: SessionPhase,
}

impl Session {
    /// Admit a new connection into its requested room.
    ///
    /// The join request is normalized (trimmed, defaulted, name capped)
    /// before admission. On success the joiner's `init` frame is already
    /// queued on `outbound`. On rejection an `error` frame is queued
    /// instead and the connection is terminal.
    ///
    /// # Errors
    ///
    /// Returns [`RoomError::Full`] when the requested room is at capacity.
    pub fn connect(
        registry: Arc<RoomRegistry>,
        request: JoinRequest,
        outbound: Outbound,
    ) -> Result<Self, RoomError> {
        let limits = registry.limits();
        let room_id = normalize_room_id(request.room.as_deref());
        let name = normalize_display_name(request.name.as_deref(), limits.max_name_length);

        let mut session = Self {
            id: ConnectionId::generate(),
            registry,
            outbound,
            room_id,
            name,
            phase: SessionPhase::Connecting,
        };

        let member = Member::new(
            session.id.clone(),
            session.name.clone(),
            session.outbound.clone(),
        );
        match session.registry.join(&session.room_id, member) {
            Ok(admission) => {
                debug!(
                    connection = %session.id,
                    room = %session.room_id,
                    name = %session.name,
                    participants = admission.participants,
                    "Session joined"
                );
                session.phase = SessionPhase::Joined;
                Ok(session)
            }
            Err(err) => {
                debug!(
                    connection = %session.id,
                    room = %session.room_id,
                    error = %err,
                    "Session rejected"
                );
                session.outbound.send(ServerFrame::error(err.to_string())).ok();
                session.phase = SessionPhase::Closed;
                Err(err)
            }
        }
    }

    /// Get the connection ID.
    #[must_use]
    pub fn id(&self) -> &ConnectionId {
        &self.id
    }

    /// Get the room this session joined.
    #[must_use]
    pub fn room(&self) -> &str {
        &self.room_id
    }

    /// Get the normalized display name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the current lifecycle phase.
    #[must_use]
    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    /// Feed one raw text frame from the transport.
    ///
    /// Malformed input is dropped without an error to the peer.
    pub fn handle_text(&mut self, raw: &str) {
        match codec::decode(raw) {
            Ok(frame) => self.handle_event(SessionEvent::Frame(frame)),
            Err(err) => {
                trace!(connection = %self.id, error = %err, "Dropping malformed frame");
            }
        }
    }

    /// Advance the state machine by one event.
    ///
    /// Events arriving outside the `Joined` phase are ignored, which makes
    /// duplicate close notifications harmless.
    pub fn handle_event(&mut self, event: SessionEvent) {
        match (self.phase, event) {
            (SessionPhase::Joined, SessionEvent::Frame(frame)) => self.dispatch(frame),
            (SessionPhase::Joined, SessionEvent::Closed | SessionEvent::Errored) => {
                self.shutdown();
            }
            (phase, event) => {
                trace!(connection = %self.id, ?phase, ?event, "Event ignored");
            }
        }
    }

    fn dispatch(&mut self, frame: ClientFrame) {
        trace!(connection = %self.id, kind = frame.kind(), "Frame received");
        match frame {
            ClientFrame::Message { id, text } => {
                if let Some(message) =
                    self.registry
                        .broadcast_message(&self.room_id, &self.id, id, &text)
                {
                    self.outbound.send(ServerFrame::ack(&message)).ok();
                }
            }
            ClientFrame::Typing { is_typing } => {
                self.registry
                    .broadcast_typing(&self.room_id, &self.id, is_typing);
            }
            ClientFrame::Ping => {
                self.outbound.send(ServerFrame::pong(unix_millis())).ok();
            }
            ClientFrame::Unknown => {
                trace!(connection = %self.id, "Ignoring unknown frame type");
            }
        }
    }

    fn shutdown(&mut self) {
        self.phase = SessionPhase::Leaving;
        if let Some(departure) = self.registry.leave(&self.room_id, &self.id) {
            debug!(
                connection = %self.id,
                room = %self.room_id,
                name = %departure.name,
                remaining = departure.remaining,
                "Session left room"
            );
        }
        self.registry.remove_if_empty(&self.room_id);
        self.phase = SessionPhase::Closed;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use roomcast_protocol::ChatMessage;
    use tokio::sync::mpsc::{error::TryRecvError, unbounded_channel, UnboundedReceiver};

    fn request(room: &str, name: &str) -> JoinRequest {
        JoinRequest {
            room: Some(room.to_string()),
            name: Some(name.to_string()),
        }
    }

    fn connect(
        registry: &Arc<RoomRegistry>,
        room: &str,
        name: &str,
    ) -> (Session, UnboundedReceiver<ServerFrame>) {
        let (tx, rx) = unbounded_channel();
        let session = Session::connect(registry.clone(), request(room, name), tx).unwrap();
        (session, rx)
    }

    fn chat_message(frame: ServerFrame) -> ChatMessage {
        match frame {
            ServerFrame::Message(msg) => msg,
            other => panic!("expected chat message, got {other:?}"),
        }
    }

    #[test]
    fn test_connect_queues_init_and_joins() {
        let registry = Arc::new(RoomRegistry::new());
        let (session, mut rx) = connect(&registry, "alpha", "Al");

        assert_eq!(session.phase(), SessionPhase::Joined);
        assert_eq!(session.room(), "alpha");
        assert_eq!(session.name(), "Al");
        assert_eq!(
            rx.try_recv().unwrap(),
            ServerFrame::init("alpha", "Al", 1, vec![])
        );
    }

    #[test]
    fn test_connect_normalizes_request() {
        let registry = Arc::new(RoomRegistry::new());
        let (tx, mut rx) = unbounded_channel();
        let session = Session::connect(registry, JoinRequest::default(), tx).unwrap();

        assert_eq!(session.room(), "default");
        assert_eq!(session.name(), "Anonymous");
        assert_eq!(
            rx.try_recv().unwrap(),
            ServerFrame::init("default", "Anonymous", 1, vec![])
        );
    }

    #[test]
    fn test_connect_truncates_long_name() {
        let registry = Arc::new(RoomRegistry::new());
        let long = "n".repeat(40);
        let (session, _rx) = connect(&registry, "alpha", &long);
        assert_eq!(session.name(), "n".repeat(32));
    }

    #[test]
    fn test_rejected_connect_sends_error_and_closes() {
        let registry = Arc::new(RoomRegistry::new());
        let (_al, _al_rx) = connect(&registry, "alpha", "Al");
        let (_bo, _bo_rx) = connect(&registry, "alpha", "Bo");

        let (tx, mut cy_rx) = unbounded_channel();
        let err = Session::connect(registry.clone(), request("alpha", "Cy"), tx).unwrap_err();
        assert_eq!(err, RoomError::Full { capacity: 2 });

        assert_eq!(
            cy_rx.try_recv().unwrap(),
            ServerFrame::error("Room is full (2 participants max).")
        );
        // All queue handles are gone; the transport sees a closed channel
        // after flushing the rejection.
        assert_eq!(cy_rx.try_recv(), Err(TryRecvError::Disconnected));
        assert_eq!(registry.participant_count("alpha"), 2);
    }

    #[test]
    fn test_message_is_relayed_and_acked() {
        let registry = Arc::new(RoomRegistry::new());
        let (mut al, mut al_rx) = connect(&registry, "alpha", "Al");
        let (_bo, mut bo_rx) = connect(&registry, "alpha", "Bo");
        al_rx.try_recv().unwrap(); // init
        al_rx.try_recv().unwrap(); // peer-joined
        bo_rx.try_recv().unwrap(); // init

        al.handle_text(r#"{"type":"message","id":"c-1","text":"hi Bo"}"#);

        let relayed = match bo_rx.try_recv().unwrap() {
            ServerFrame::Message(msg) => msg,
            other => panic!("expected chat message, got {other:?}"),
        };
        assert_eq!(relayed.id, "c-1");
        assert_eq!(relayed.from, "Al");
        assert_eq!(relayed.text, "hi Bo");

        // The sender receives only the ack, carrying the same id and
        // timestamp as the relayed message.
        assert_eq!(
            al_rx.try_recv().unwrap(),
            ServerFrame::MessageAck {
                id: relayed.id.clone(),
                ts: relayed.ts,
            }
        );
        assert!(al_rx.try_recv().is_err());
    }

    #[test]
    fn test_typing_is_relayed_without_ack() {
        let registry = Arc::new(RoomRegistry::new());
        let (mut al, mut al_rx) = connect(&registry, "alpha", "Al");
        let (_bo, mut bo_rx) = connect(&registry, "alpha", "Bo");
        al_rx.try_recv().unwrap(); // init
        al_rx.try_recv().unwrap(); // peer-joined
        bo_rx.try_recv().unwrap(); // init

        al.handle_text(r#"{"type":"typing","isTyping":true}"#);
        assert_eq!(bo_rx.try_recv().unwrap(), ServerFrame::typing("Al", true));
        assert!(al_rx.try_recv().is_err());

        al.handle_text(r#"{"type":"typing","isTyping":false}"#);
        assert_eq!(bo_rx.try_recv().unwrap(), ServerFrame::typing("Al", false));
    }

    #[test]
    fn test_ping_answered_with_pong() {
        let registry = Arc::new(RoomRegistry::new());
        let (mut al, mut al_rx) = connect(&registry, "alpha", "Al");
        al_rx.try_recv().unwrap(); // init

        al.handle_text(r#"{"type":"ping"}"#);
        match al_rx.try_recv().unwrap() {
            ServerFrame::Pong { ts } => assert!(ts > 0),
            other => panic!("expected pong, got {other:?}"),
        }
    }

    #[test]
    fn test_malformed_and_unknown_frames_dropped() {
        let registry = Arc::new(RoomRegistry::new());
        let (mut al, mut al_rx) = connect(&registry, "alpha", "Al");
        let (_bo, mut bo_rx) = connect(&registry, "alpha", "Bo");
        al_rx.try_recv().unwrap(); // init
        al_rx.try_recv().unwrap(); // peer-joined
        bo_rx.try_recv().unwrap(); // init

        al.handle_text("not json at all");
        al.handle_text(r#"{"type":"upgrade-to-admin"}"#);
        al.handle_text(r#"{"type":"message"}"#); // no text field
        al.handle_text(r#"{"type":"message","text":7}"#);

        assert!(al_rx.try_recv().is_err());
        assert!(bo_rx.try_recv().is_err());
        assert_eq!(al.phase(), SessionPhase::Joined);
    }

    #[test]
    fn test_close_leaves_room_and_reclaims_it() {
        let registry = Arc::new(RoomRegistry::new());
        let (mut al, _al_rx) = connect(&registry, "alpha", "Al");

        al.handle_event(SessionEvent::Closed);
        assert_eq!(al.phase(), SessionPhase::Closed);
        assert!(!registry.room_exists("alpha"));
    }

    #[test]
    fn test_error_treated_like_close() {
        let registry = Arc::new(RoomRegistry::new());
        let (mut al, _al_rx) = connect(&registry, "alpha", "Al");

        al.handle_event(SessionEvent::Errored);
        assert_eq!(al.phase(), SessionPhase::Closed);
        assert!(!registry.room_exists("alpha"));
    }

    #[test]
    fn test_events_after_close_are_ignored() {
        let registry = Arc::new(RoomRegistry::new());
        let (mut al, mut al_rx) = connect(&registry, "alpha", "Al");
        al_rx.try_recv().unwrap(); // init

        al.handle_event(SessionEvent::Closed);
        al.handle_event(SessionEvent::Closed);
        al.handle_text(r#"{"type":"message","text":"too late"}"#);
        al.handle_text(r#"{"type":"ping"}"#);

        assert_eq!(al.phase(), SessionPhase::Closed);
        assert!(al_rx.try_recv().is_err());
        assert!(!registry.room_exists("alpha"));
    }

    #[test]
    fn test_two_participant_conversation() {
        let registry = Arc::new(RoomRegistry::new());

        // Al joins an empty room, Bo follows.
        let (mut al, mut al_rx) = connect(&registry, "alpha", "Al");
        let (mut bo, mut bo_rx) = connect(&registry, "alpha", "Bo");

        assert_eq!(
            al_rx.try_recv().unwrap(),
            ServerFrame::init("alpha", "Al", 1, vec![])
        );
        assert_eq!(al_rx.try_recv().unwrap(), ServerFrame::peer_joined("Bo", 2));
        assert_eq!(
            bo_rx.try_recv().unwrap(),
            ServerFrame::init("alpha", "Bo", 2, vec![])
        );

        // A third participant bounces off the full room.
        let (tx, mut cy_rx) = unbounded_channel();
        Session::connect(registry.clone(), request("alpha", "Cy"), tx).unwrap_err();
        assert_eq!(
            cy_rx.try_recv().unwrap(),
            ServerFrame::error("Room is full (2 participants max).")
        );
        assert!(al_rx.try_recv().is_err());
        assert!(bo_rx.try_recv().is_err());

        // A short exchange. A sender's own ack is queued during its send,
        // so it sits ahead of the peer's reply.
        al.handle_text(r#"{"type":"message","text":"hi Bo"}"#);
        bo.handle_text(r#"{"type":"message","text":"hi Al"}"#);

        let to_bo = chat_message(bo_rx.try_recv().unwrap());
        assert_eq!(to_bo.from, "Al");
        assert_eq!(to_bo.text, "hi Bo");
        assert_eq!(
            al_rx.try_recv().unwrap(),
            ServerFrame::MessageAck {
                id: to_bo.id.clone(),
                ts: to_bo.ts,
            }
        );

        let to_al = chat_message(al_rx.try_recv().unwrap());
        assert_eq!(to_al.from, "Bo");
        assert_eq!(to_al.text, "hi Al");
        assert_eq!(
            bo_rx.try_recv().unwrap(),
            ServerFrame::MessageAck {
                id: to_al.id.clone(),
                ts: to_al.ts,
            }
        );

        // Bo disconnects; Al is told and the room survives.
        bo.handle_event(SessionEvent::Closed);
        assert_eq!(al_rx.try_recv().unwrap(), ServerFrame::peer_left("Bo", 1));
        assert!(registry.room_exists("alpha"));

        // A newcomer now gets the room's history replayed.
        let (mut cy2, mut cy2_rx) = connect(&registry, "alpha", "Cy");
        assert_eq!(al_rx.try_recv().unwrap(), ServerFrame::peer_joined("Cy", 2));
        match cy2_rx.try_recv().unwrap() {
            ServerFrame::Init { history, .. } => {
                let texts: Vec<&str> = history.iter().map(|m| m.text.as_str()).collect();
                assert_eq!(texts, ["hi Bo", "hi Al"]);
            }
            other => panic!("expected init, got {other:?}"),
        }

        // Everyone out; the room is reclaimed.
        cy2.handle_event(SessionEvent::Closed);
        assert_eq!(al_rx.try_recv().unwrap(), ServerFrame::peer_left("Cy", 1));
        al.handle_event(SessionEvent::Closed);
        assert!(!registry.room_exists("alpha"));
    }
}
