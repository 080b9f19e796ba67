//! Time helpers for the login flow
//!
//! - `format_time_remaining` renders a whole-second duration in Thai for display
//! - `delay` is the sleep the login flow awaits between failed attempts

/// Format a number of seconds as "X นาที Y วินาที"
///
/// Durations under a minute only show seconds, whole minutes omit the
/// seconds part.
pub fn format_time_remaining(seconds: u64) -> String {
    if seconds < 60 {
        return format!("{} วินาที", seconds);
    }

    let minutes = seconds / 60;
    let remaining_seconds = seconds % 60;

    if remaining_seconds == 0 {
        return format!("{} นาที", minutes);
    }

    format!("{} นาที {} วินาที", minutes, remaining_seconds)
}

/// Sleep for `ms` milliseconds
pub async fn delay(ms: u64) {
    tokio::time::sleep(std::time::Duration::from_millis(ms)).await;
}
