//! Identifier validation for community submissions.
//!
//! Submission endpoints are publicly reachable, so everything is validated
//! before it is allowed anywhere near a query.

/// Video identifiers are exactly 11 characters from the id alphabet.
const VIDEO_ID_LEN: usize = 11;

/// Channel identifiers are `UC` followed by 22 id characters.
const CHANNEL_ID_LEN: usize = 24;

/// Playlist identifiers are not pattern-validated upstream; we only bound
/// them and restrict the alphabet.
const MAX_PLAYLIST_ID_LEN: usize = 128;

fn is_id_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '-'
}

/// Check a candidate video identifier (`[A-Za-z0-9_-]{11}`).
pub fn is_video_id(s: &str) -> bool {
    s.len() == VIDEO_ID_LEN && s.chars().all(is_id_char)
}

/// Check a candidate channel identifier (`UC[A-Za-z0-9_-]{22}`).
pub fn is_channel_id(s: &str) -> bool {
    s.len() == CHANNEL_ID_LEN && s.starts_with("UC") && s.chars().all(is_id_char)
}

/// Check a candidate playlist identifier (non-empty, bounded, id alphabet).
pub fn is_playlist_id(s: &str) -> bool {
    !s.is_empty() && s.len() <= MAX_PLAYLIST_ID_LEN && s.chars().all(is_id_char)
}
