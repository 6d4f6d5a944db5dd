//! JSON codec for Roomcast frames.
//!
//! Each WebSocket text frame carries exactly one JSON object, so no
//! length-prefixing or stream reassembly is needed here; oversize protection
//! is the transport's job (it caps the message size before the text reaches
//! the codec).

use thiserror::Error;

use crate::frames::{ClientFrame, ServerFrame};

/// Failures while crossing the wire boundary in either direction.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// Inbound text was not a well-formed frame.
    #[error("malformed frame: {0}")]
    Malformed(#[source] serde_json::Error),

    /// Outbound frame could not be serialized.
    #[error("frame encoding failed: {0}")]
    Encode(#[source] serde_json::Error),
}

/// Decode a single inbound text frame.
///
/// Unrecognized `type` tags decode to [`ClientFrame::Unknown`]; extra fields
/// are ignored. Structurally invalid input (bad JSON, missing required
/// fields, wrong field types) is an error; callers drop such frames.
///
/// # Errors
///
/// Returns [`ProtocolError::Malformed`] if the text is not a valid frame.
pub fn decode(text: &str) -> Result<ClientFrame, ProtocolError> {
    serde_json::from_str(text).map_err(ProtocolError::Malformed)
}

/// Encode a single outbound frame as JSON text.
///
/// # Errors
///
/// Returns [`ProtocolError::Encode`] if serialization fails.
pub fn encode(frame: &ServerFrame) -> Result<String, ProtocolError> {
    serde_json::to_string(frame).map_err(ProtocolError::Encode)
}
