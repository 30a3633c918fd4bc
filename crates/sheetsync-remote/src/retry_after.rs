//! `Retry-After` header parsing
//!
//! The header carries either a number of seconds or an HTTP-date. Both forms
//! are capped at one hour so a misbehaving server cannot park the engine.

use std::time::Duration;

use tracing::warn;

/// Longest wait accepted from a server
pub const MAX_RETRY_AFTER: Duration = Duration::from_secs(3600);

/// Parses a `Retry-After` header value into a Duration
///
/// # Arguments
/// * `value` - Raw header value (`"30"` or `"Wed, 21 Oct 2026 07:28:00 GMT"`)
///
/// # Returns
/// The wait, capped at [`MAX_RETRY_AFTER`], or `None` if the value is neither
/// form. A date in the past yields a zero wait.
pub fn parse_retry_after(value: &str) -> Option<Duration> {
    let value = value.trim();

    if let Ok(seconds) = value.parse::<u64>() {
        return Some(Duration::from_secs(seconds).min(MAX_RETRY_AFTER));
    }

    if let Ok(date) = chrono::DateTime::parse_from_rfc2822(value) {
        let remaining = date.with_timezone(&chrono::Utc) - chrono::Utc::now();
        let seconds = u64::try_from(remaining.num_seconds()).unwrap_or(0);
        return Some(Duration::from_secs(seconds).min(MAX_RETRY_AFTER));
    }

    warn!(value, "Could not parse Retry-After header, ignoring it");
    None
}
