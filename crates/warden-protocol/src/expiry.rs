//! Expiry math.
//!
//! All absolute times are epoch milliseconds. Servers send `expires_in` as
//! whole seconds. Callers capture `now` once and pass it to every function
//! involved in one decision, so a single scheduling pass never compares
//! against two different clocks.

use std::time::Duration;

use chrono::Utc;

/// Current wall-clock time in epoch milliseconds.
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// Converts a relative `expires_in` (seconds) into an absolute
/// `expires_at` (epoch ms). `None` in, `None` out.
pub fn absolutize_expiration(expires_in: Option<i64>, now: i64) -> Option<i64> {
    expires_in.map(|secs| now.saturating_add(secs.saturating_mul(1000)))
}

/// `true` once `expires_at` lies strictly in the past.
pub fn is_expired(expires_at: i64, now: i64) -> bool {
    expires_at < now
}

/// How long to wait before refreshing a token that expires at `deadline`,
/// refreshing `offset` early. Non-positive delays collapse to zero.
pub fn refresh_delay(deadline: i64, offset: Duration, now: i64) -> Duration {
    let offset_ms = i64::try_from(offset.as_millis()).unwrap_or(i64::MAX);
    let remaining = deadline.saturating_sub(offset_ms).saturating_sub(now);
    if remaining <= 0 {
        Duration::ZERO
    } else {
        Duration::from_millis(remaining as u64)
    }
}
