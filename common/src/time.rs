//! Key timestamps.

use chrono::{DateTime, Duration, Utc};

/// Expiration time for a key created at `created` that is valid for
/// `seconds`. Zero means the key does not expire.
pub fn expiration(created: DateTime<Utc>, seconds: u64) -> Option<DateTime<Utc>> {
    if seconds == 0 {
        return None;
    }
    let seconds = i64::try_from(seconds).ok()?;
    created.checked_add_signed(Duration::try_seconds(seconds)?)
}

/// Whether `expires` lies before `now`.
pub fn is_expired(expires: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
    expires.map_or(false, |expires| expires <= now)
}

/// Calendar date as shown in key listings.
pub fn format_date(time: DateTime<Utc>) -> String {
    time.format("%Y-%m-%d").to_string()
}
