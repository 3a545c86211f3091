use std::time::{SystemTime, UNIX_EPOCH};

/// Current Unix time in seconds.
pub fn now_sec() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}
