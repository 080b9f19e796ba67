//! Rate limiter for login attempts
//!
//! Slows down brute force guessing by:
//! - Tracking consecutive failed attempts per client
//! - Suggesting an exponential backoff delay between retries
//! - Locking the client out once the attempt threshold is reached
//!
//! The limiter is advisory: it never blocks anything itself, the login
//! flow is expected to honour its answers. State lives in memory only and
//! is lost when the process exits.

use crate::config::RateLimitConfig;
use crate::models::{AttemptRecord, FailedAttemptOutcome, RateLimitStatus};
use crate::services::client_identity::ClientEnvironment;
use crate::services::clock::{Clock, SystemClock};
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

/// Compute the backoff delay for the given attempt number
///
/// `base_ms * 2^(attempt - 1)`, capped at `max_ms`. Attempt 0 is treated
/// as the first attempt.
pub fn backoff_delay_ms(attempt: u32, base_ms: u64, max_ms: u64) -> u64 {
    let exponent = attempt.saturating_sub(1);
    2u64.checked_pow(exponent)
        .and_then(|factor| base_ms.checked_mul(factor))
        .map_or(max_ms, |delay| delay.min(max_ms))
}

/// Login attempt rate limiter
pub struct LoginRateLimiter {
    /// Failed attempt state by client identifier
    attempts: Mutex<HashMap<String, AttemptRecord>>,
    config: RateLimitConfig,
    clock: Arc<dyn Clock>,
    /// Signals used when the caller passes no identifier
    environment: ClientEnvironment,
}

impl std::fmt::Debug for LoginRateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginRateLimiter")
            .field("tracked_clients", &self.lock().len())
            .field("config", &self.config)
            .finish()
    }
}

impl LoginRateLimiter {
    /// Create a rate limiter with the default policy and the system clock
    pub fn new() -> Self {
        Self::with_config(RateLimitConfig::default())
    }

    /// Create a rate limiter with a custom policy
    pub fn with_config(config: RateLimitConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Create a rate limiter reading time from `clock`
    pub fn with_clock(config: RateLimitConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            attempts: Mutex::new(HashMap::new()),
            config,
            clock,
            environment: ClientEnvironment::detect(),
        }
    }

    /// Replace the environment the default client identifier is derived from
    pub fn with_environment(mut self, environment: ClientEnvironment) -> Self {
        self.environment = environment;
        self
    }

    pub fn config(&self) -> &RateLimitConfig {
        &self.config
    }

    /// Check if the client is currently locked out
    ///
    /// An expired lockout is removed here, so the client starts clean.
    pub fn is_rate_limited(&self, identifier: Option<&str>) -> RateLimitStatus {
        let client_id = self.resolve(identifier);
        let now = self.clock.now();
        let mut attempts = self.lock();

        let Some(lockout_until) = attempts.get(&client_id).map(|r| r.lockout_until) else {
            return RateLimitStatus::allowed();
        };

        match lockout_until {
            Some(until) if now < until => RateLimitStatus::locked(ceil_secs(until - now)),
            Some(_) => {
                attempts.remove(&client_id);
                tracing::debug!("Lockout expired for client {}", client_id);
                RateLimitStatus::allowed()
            }
            None => RateLimitStatus::allowed(),
        }
    }

    /// Record a failed authentication attempt
    pub fn record_failed_attempt(&self, identifier: Option<&str>) -> FailedAttemptOutcome {
        let client_id = self.resolve(identifier);
        let now = self.clock.now();
        let mut attempts = self.lock();

        // Failures older than the rolling window are forgiven
        let previous = attempts
            .get(&client_id)
            .filter(|record| !record.is_stale(now, self.config.attempt_window()))
            .map_or(0, |record| record.attempts);

        let mut record = AttemptRecord {
            attempts: previous.saturating_add(1),
            last_attempt_at: now,
            lockout_until: None,
        };

        let delay_ms = backoff_delay_ms(
            record.attempts,
            self.config.base_delay_ms,
            self.config.max_delay_ms,
        );

        if record.attempts >= self.config.max_attempts {
            record.lockout_until = Some(add_or_max(now, self.config.lockout_duration()));
            tracing::warn!(
                "Client {} locked out after {} failed attempts",
                client_id,
                record.attempts
            );
            attempts.insert(client_id, record);

            return FailedAttemptOutcome {
                should_delay: true,
                delay_ms,
                attempts_remaining: 0,
                locked_out: true,
            };
        }

        let attempts_remaining = self.config.max_attempts - record.attempts;
        let should_delay = record.attempts > 1;
        tracing::debug!(
            "Failed attempt {} for client {}, {} remaining",
            record.attempts,
            client_id,
            attempts_remaining
        );
        attempts.insert(client_id, record);

        FailedAttemptOutcome {
            should_delay,
            delay_ms,
            attempts_remaining,
            locked_out: false,
        }
    }

    /// Record a successful authentication (clears failed attempts)
    pub fn record_successful_attempt(&self, identifier: Option<&str>) {
        let client_id = self.resolve(identifier);
        if self.lock().remove(&client_id).is_some() {
            tracing::debug!("Cleared failed attempts for client {}", client_id);
        }
    }

    /// Get the current failed attempt count
    pub fn attempt_count(&self, identifier: Option<&str>) -> u32 {
        let client_id = self.resolve(identifier);
        self.lock().get(&client_id).map_or(0, |record| record.attempts)
    }

    /// Clear all rate limit data
    pub fn clear(&self) {
        self.lock().clear();
    }

    fn resolve(&self, identifier: Option<&str>) -> String {
        match identifier {
            Some(id) if !id.is_empty() => id.to_string(),
            _ => self.environment.client_id().to_string(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, AttemptRecord>> {
        // A panic while holding the lock cannot leave a record half-written
        self.attempts.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Default for LoginRateLimiter {
    fn default() -> Self {
        Self::new()
    }
}

// Any sub-second remainder, down to a nanosecond, counts as a full second
fn ceil_secs(remaining: Duration) -> u64 {
    let whole = remaining.num_seconds().max(0);
    if remaining > Duration::seconds(whole) {
        whole as u64 + 1
    } else {
        whole as u64
    }
}

fn add_or_max(now: DateTime<Utc>, by: Duration) -> DateTime<Utc> {
    now.checked_add_signed(by).unwrap_or(DateTime::<Utc>::MAX_UTC)
}
