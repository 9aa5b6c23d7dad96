use std::time::{SystemTime, UNIX_EPOCH};

pub fn now_secs() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

/// Wall-clock label used in on-screen processing logs.
pub fn local_clock_label() -> String {
    chrono::Local::now().format("%H:%M:%S").to_string()
}
