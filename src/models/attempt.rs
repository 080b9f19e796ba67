//! Attempt tracking models

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Failed attempt state for a single client
///
/// A client with no record is in the clean state; a record never holds
/// zero attempts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttemptRecord {
    /// Consecutive failed attempts since the last reset
    pub attempts: u32,
    /// Timestamp of the most recent failure
    pub last_attempt_at: DateTime<Utc>,
    /// End of the lockout, set when the attempt threshold is crossed
    pub lockout_until: Option<DateTime<Utc>>,
}

impl AttemptRecord {
    /// Check whether the last failure is older than the rolling window
    pub fn is_stale(&self, now: DateTime<Utc>, window: Duration) -> bool {
        now.signed_duration_since(self.last_attempt_at) > window
    }
}

/// Result of a lockout check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitStatus {
    pub limited: bool,
    /// Whole seconds until the lockout ends, rounded up
    pub retry_after_secs: Option<u64>,
}

impl RateLimitStatus {
    pub fn allowed() -> Self {
        Self {
            limited: false,
            retry_after_secs: None,
        }
    }

    pub fn locked(retry_after_secs: u64) -> Self {
        Self {
            limited: true,
            retry_after_secs: Some(retry_after_secs),
        }
    }
}

/// Advice returned after recording a failed attempt
///
/// The limiter never sleeps itself; the caller honours `delay_ms`
/// when `should_delay` is set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedAttemptOutcome {
    pub should_delay: bool,
    pub delay_ms: u64,
    pub attempts_remaining: u32,
    pub locked_out: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    #[test]
    fn test_stale_only_after_window_is_exceeded() {
        let record = AttemptRecord {
            attempts: 1,
            last_attempt_at: at(0),
            lockout_until: None,
        };
        let window = Duration::hours(1);

        assert!(!record.is_stale(at(3600), window));
        assert!(record.is_stale(at(3601), window));
    }
}
