//! # roomcast-core
//!
//! Room lifecycle, membership, and relay semantics for Roomcast.
//!
//! The building blocks, from the outside in:
//!
//! - **Room** - Bounded-membership broadcast domain with message history
//! - **RoomRegistry** - Process-wide room table, created lazily, reclaimed
//!   when empty
//! - **Session** - Per-connection state machine from admission to teardown
//! - **Member** - A room's handle to one participant
//!
//! ## How a frame flows
//!
//! ```text
//! ┌─────────────┐     ┌──────────────┐     ┌─────────────┐
//! │   Session   │────▶│ RoomRegistry │────▶│    Room     │
//! └─────────────┘     └──────────────┘     └─────────────┘
//!        ▲                                        │
//!        │                                        ▼
//!   transport                              outbound queues
//! ```
//!
//! Rooms never touch sockets. Every delivery goes through a member's
//! outbound queue, so room state is held only for the queueing itself.

pub mod connection;
pub mod identity;
pub mod message;
pub mod registry;
pub mod room;
pub mod session;

pub use connection::{ConnectionId, Member, Outbound};
pub use registry::{RegistryStats, RoomRegistry};
pub use room::{Admission, Departure, RelayLimits, Room, RoomError};
pub use session::{JoinRequest, Session, SessionEvent, SessionPhase};
