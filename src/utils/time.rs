use std::time::{SystemTime, UNIX_EPOCH};

/// Current unix time in seconds; a clock before the epoch reads as 0
pub fn unix_time() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// `unix_time() + seconds`, saturating
pub fn unix_time_plus(seconds: u64) -> u64 {
    unix_time().saturating_add(seconds)
}
