//! # roomcast-protocol
//!
//! Wire protocol definitions for the Roomcast relay.
//!
//! Frames are JSON objects, one per WebSocket text frame, discriminated by
//! a `type` field. Inbound and outbound directions are separate enums.
//!
//! ## Frame kinds
//!
//! - Inbound: `message`, `typing`, `ping` (anything else is tolerated and
//!   ignored)
//! - Outbound: `init`, `peer-joined`, `peer-left`, `message`, `message-ack`,
//!   `typing`, `pong`, `error`
//!
//! ## Round trip
//!
//! ```rust
//! use roomcast_protocol::{codec, ClientFrame, ServerFrame};
//!
//! let inbound = codec::decode(r#"{"type":"message","text":"hi"}"#).unwrap();
//! assert!(matches!(inbound, ClientFrame::Message { .. }));
//!
//! let outbound = codec::encode(&ServerFrame::pong(1_700_000_000_000)).unwrap();
//! assert_eq!(outbound, r#"{"type":"pong","ts":1700000000000}"#);
//! ```

pub mod codec;
pub mod frames;

pub use codec::{decode, encode, ProtocolError};
pub use frames::{ChatMessage, ClientFrame, ServerFrame};
