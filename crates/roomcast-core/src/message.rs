//! Message construction helpers.

use crate::identity::truncate_chars;
use roomcast_protocol::ChatMessage;
use std::time::{SystemTime, UNIX_EPOCH};

/// Current time as Unix milliseconds.
#[must_use]
pub fn unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

/// Generate a message ID from the current timestamp plus randomness.
///
/// Unique enough for ack correlation and client-side dedup, nothing more.
#[must_use]
pub fn generate_message_id() -> String {
    format!("m_{}_{}", unix_millis(), rand::random::<u32>() % 10_000)
}

/// Build the stored form of an accepted message.
///
/// Keeps the client's id when it supplied a non-empty one, otherwise
/// generates one. Text is capped at `max_chars` characters and the
/// timestamp records acceptance time.
#[must_use]
pub fn compose_message(
    from: impl Into<String>,
    client_id: Option<String>,
    text: &str,
    max_chars: usize,
) -> ChatMessage {
    ChatMessage {
        id: client_id
            .filter(|id| !id.is_empty())
            .unwrap_or_else(generate_message_id),
        from: from.into(),
        text: truncate_chars(text, max_chars).to_string(),
        ts: unix_millis(),
    }
}
