//! Join-context normalization.
//!
//! Room ids and display names arrive as free-form query input. Both are
//! trimmed, blank values fall back to defaults, and display names are
//! capped at a character bound.

/// Room id used when a join request does not name one.
pub const DEFAULT_ROOM_ID: &str = "default";

/// Display name used when a join request does not carry one.
pub const DEFAULT_DISPLAY_NAME: &str = "Anonymous";

/// Normalize a requested room id: trim whitespace, default when blank.
#[must_use]
pub fn normalize_room_id(requested: Option<&str>) -> String {
    match requested.map(str::trim) {
        Some(room) if !room.is_empty() => room.to_string(),
        _ => DEFAULT_ROOM_ID.to_string(),
    }
}

/// Normalize a display name: trim whitespace, default when blank, then cap
/// at `max_chars` characters.
#[must_use]
pub fn normalize_display_name(requested: Option<&str>, max_chars: usize) -> String {
    let name = match requested.map(str::trim) {
        Some(name) if !name.is_empty() => name,
        _ => DEFAULT_DISPLAY_NAME,
    };
    truncate_chars(name, max_chars).to_string()
}

/// Cut `s` after `max_chars` characters, always on a character boundary.
#[must_use]
pub fn truncate_chars(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_room_id_trimmed() {
        assert_eq!(normalize_room_id(Some("  alpha  ")), "alpha");
        assert_eq!(normalize_room_id(Some("alpha")), "alpha");
    }

    #[test]
    fn test_room_id_defaults_when_blank() {
        assert_eq!(normalize_room_id(None), "default");
        assert_eq!(normalize_room_id(Some("")), "default");
        assert_eq!(normalize_room_id(Some("   ")), "default");
    }

    #[test]
    fn test_display_name_trimmed_and_defaulted() {
        assert_eq!(normalize_display_name(Some("  Al  "), 32), "Al");
        assert_eq!(normalize_display_name(None, 32), "Anonymous");
        assert_eq!(normalize_display_name(Some("   "), 32), "Anonymous");
    }

    #[test]
    fn test_display_name_truncated_to_char_limit() {
        let long = "x".repeat(40);
        assert_eq!(normalize_display_name(Some(&long), 32), "x".repeat(32));
    }

    #[test]
    fn test_truncate_chars_respects_boundaries() {
        assert_eq!(truncate_chars("hello", 10), "hello");
        assert_eq!(truncate_chars("hello", 3), "hel");
        // Multi-byte characters count as one each and are never split.
        assert_eq!(truncate_chars("ααββ", 3), "ααβ");
        assert_eq!(truncate_chars("日本語テスト", 2), "日本");
    }
}
