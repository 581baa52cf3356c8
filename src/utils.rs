//! Utility functions for formatting.

use std::time::{SystemTime, UNIX_EPOCH};

use crate::constants;

/// Truncates a string to a maximum number of characters.
///
/// If the string exceeds `max_chars`, it is truncated and "..." is appended.
pub fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() > max_chars {
        let mut t: String = s.chars().take(max_chars.saturating_sub(3)).collect();
        t.push_str("...");
        t
    } else {
        s.to_string()
    }
}

/// Formats a `SystemTime` as `HH:MM:SS` (UTC).
pub fn format_clock(time: SystemTime) -> String {
    let secs = time
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| d.as_secs() % 86_400);
    format!(
        "{:02}:{:02}:{:02}",
        secs / 3600,
        (secs % 3600) / 60,
        secs % 60
    )
}

/// Latency label: `N ms`, or `- ms` when unknown.
pub fn format_ping(ping_ms: Option<u64>) -> String {
    ping_ms.map_or_else(|| constants::MSG_NO_PING.to_string(), |ms| format!("{ms} ms"))
}

/// Replaces every character with a bullet.
pub fn mask(secret: &str) -> String {
    "•".repeat(secret.chars().count())
}
