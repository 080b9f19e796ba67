//! Login flow
//!
//! Wraps an identity provider with the login rate limiter:
//! 1. Validate the form input (invalid input never counts as an attempt)
//! 2. Refuse locked-out clients before the provider is contacted
//! 3. On rejection, record the failure and hand back the suggested backoff
//! 4. On success, clear the client's failure history
//!
//! The flow returns as soon as a rejection is recorded. The caller shows
//! the remaining-attempts notice first, then awaits
//! [`LoginError::wait_before_retry`] before allowing another attempt.

use crate::models::{AuthenticatedUser, LoginInput};
use crate::services::auth_error::{ProviderError, SafeError};
use crate::services::rate_limiter::LoginRateLimiter;
use crate::services::time_format::{delay, format_time_remaining};
use crate::services::validation::{validate_login, ValidationError};
use async_trait::async_trait;
use std::sync::Arc;

/// External identity provider
#[async_trait]
pub trait Authenticator: Send + Sync {
    /// Sign in with email and password
    async fn sign_in(&self, input: &LoginInput) -> Result<AuthenticatedUser, ProviderError>;
}

/// Error types for login attempts
#[derive(Debug, thiserror::Error)]
pub enum LoginError {
    /// Form input is invalid
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Client is locked out, nothing was sent to the provider
    #[error("Rate limited, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    /// This failure crossed the attempt threshold
    #[error("Locked out for {lockout_secs}s: {error}")]
    LockedOut { lockout_secs: u64, error: SafeError },

    /// Credentials were rejected
    #[error("Authentication failed: {error}")]
    Authentication {
        error: SafeError,
        attempts_remaining: u32,
        /// Backoff to wait before the next attempt, if any
        retry_delay_ms: Option<u64>,
    },

    /// Provider could not be reached; not counted as a failed attempt
    #[error("Provider unavailable: {0}")]
    Unavailable(SafeError),
}

impl LoginError {
    /// Message for the login page
    pub fn user_message(&self) -> String {
        match self {
            LoginError::Validation(e) => SafeError::from_validation(e).user_message,
            LoginError::RateLimited { retry_after_secs } => {
                format!("กรุณารอ {} ก่อนลองใหม่", format_time_remaining(*retry_after_secs))
            }
            LoginError::LockedOut { lockout_secs, .. } => format!(
                "บัญชีถูกล็อกชั่วคราว {} เนื่องจากพยายาม login ผิดหลายครั้ง",
                format_time_remaining(*lockout_secs)
            ),
            LoginError::Authentication { error, .. } | LoginError::Unavailable(error) => {
                error.user_message.clone()
            }
        }
    }

    /// Remaining-attempts notice, shown once the client is being slowed down
    pub fn attempts_notice(&self) -> Option<String> {
        match self {
            LoginError::Authentication {
                attempts_remaining,
                retry_delay_ms: Some(_),
                ..
            } => Some(format!("เหลือโอกาส {} ครั้ง", attempts_remaining)),
            _ => None,
        }
    }

    /// Safe error for display, if the failure carries one
    pub fn safe_error(&self) -> Option<SafeError> {
        match self {
            LoginError::Validation(e) => Some(SafeError::from_validation(e)),
            LoginError::RateLimited { .. } => None,
            LoginError::LockedOut { error, .. }
            | LoginError::Authentication { error, .. }
            | LoginError::Unavailable(error) => Some(error.clone()),
        }
    }

    /// Sleep for the suggested backoff; returns at once when there is none
    pub async fn wait_before_retry(&self) {
        if let LoginError::Authentication {
            retry_delay_ms: Some(ms),
            ..
        } = self
        {
            delay(*ms).await;
        }
    }
}

/// Login flow guarded by a rate limiter
pub struct LoginFlow {
    limiter: Arc<LoginRateLimiter>,
    authenticator: Arc<dyn Authenticator>,
}

impl LoginFlow {
    pub fn new(limiter: Arc<LoginRateLimiter>, authenticator: Arc<dyn Authenticator>) -> Self {
        Self {
            limiter,
            authenticator,
        }
    }

    pub fn limiter(&self) -> &Arc<LoginRateLimiter> {
        &self.limiter
    }

    /// Attempt a login
    ///
    /// `identifier` scopes the rate limit; `None` uses the identity derived
    /// from the limiter's client environment.
    pub async fn login(
        &self,
        email: &str,
        password: &str,
        identifier: Option<&str>,
    ) -> Result<AuthenticatedUser, LoginError> {
        let input = validate_login(email, password)?;

        let status = self.limiter.is_rate_limited(identifier);
        if status.limited {
            return Err(LoginError::RateLimited {
                retry_after_secs: status.retry_after_secs.unwrap_or_default(),
            });
        }

        let error = match self.authenticator.sign_in(&input).await {
            Ok(user) => {
                self.limiter.record_successful_attempt(identifier);
                tracing::info!("User {} logged in", user.email);
                return Ok(user);
            }
            Err(error) => error,
        };

        let safe = SafeError::from_provider(&error);
        if matches!(error, ProviderError::Network(_)) {
            return Err(LoginError::Unavailable(safe));
        }

        let outcome = self.limiter.record_failed_attempt(identifier);
        if outcome.locked_out {
            return Err(LoginError::LockedOut {
                lockout_secs: self.limiter.config().lockout_duration_secs,
                error: safe,
            });
        }

        Err(LoginError::Authentication {
            error: safe,
            attempts_remaining: outcome.attempts_remaining,
            retry_delay_ms: outcome.should_delay.then_some(outcome.delay_ms),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RateLimitConfig;
    use crate::services::auth_error::ErrorCode;
    use crate::services::clock::ManualClock;
    use chrono::{Duration, Utc};
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Provider accepting a single account
    struct StaticAuthenticator {
        email: &'static str,
        password: &'static str,
        offline: bool,
        calls: AtomicUsize,
    }

    impl StaticAuthenticator {
        fn new() -> Self {
            Self {
                email: "somchai@example.com",
                password: "correct-horse",
                offline: false,
                calls: AtomicUsize::new(0),
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Authenticator for StaticAuthenticator {
        async fn sign_in(&self, input: &LoginInput) -> Result<AuthenticatedUser, ProviderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.offline {
                return Err(ProviderError::Network("Failed to fetch".to_string()));
            }
            if input.email == self.email && input.password == self.password {
                Ok(AuthenticatedUser {
                    id: "user-1".to_string(),
                    email: input.email.clone(),
                })
            } else {
                Err(ProviderError::Rejected("Invalid login credentials".to_string()))
            }
        }
    }

    fn setup(authenticator: StaticAuthenticator) -> (Arc<ManualClock>, Arc<StaticAuthenticator>, LoginFlow) {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let limiter = Arc::new(LoginRateLimiter::with_clock(
            RateLimitConfig::default(),
            clock.clone(),
        ));
        let authenticator = Arc::new(authenticator);
        let flow = LoginFlow::new(limiter, authenticator.clone());
        (clock, authenticator, flow)
    }

    #[tokio::test(start_paused = true)]
    async fn test_successful_login_clears_failures() {
        let (_clock, _auth, flow) = setup(StaticAuthenticator::new());

        let _ = flow.login("somchai@example.com", "wrong", Some("c1")).await;
        let _ = flow.login("somchai@example.com", "wrong", Some("c1")).await;
        assert_eq!(flow.limiter().attempt_count(Some("c1")), 2);

        let user = flow
            .login("Somchai@Example.com", "correct-horse", Some("c1"))
            .await
            .unwrap();

        assert_eq!(user.email, "somchai@example.com");
        assert_eq!(flow.limiter().attempt_count(Some("c1")), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_failure_is_not_delayed() {
        let (_clock, _auth, flow) = setup(StaticAuthenticator::new());

        let start = tokio::time::Instant::now();
        let err = flow.login("somchai@example.com", "wrong", Some("c1")).await.unwrap_err();

        assert!(start.elapsed() < std::time::Duration::from_millis(1));
        match &err {
            LoginError::Authentication {
                error,
                attempts_remaining,
                retry_delay_ms,
            } => {
                assert_eq!(error.code, ErrorCode::AuthError);
                assert_eq!(error.user_message, "Invalid email or password");
                assert_eq!(*attempts_remaining, 4);
                assert_eq!(*retry_delay_ms, None);
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(err.attempts_notice(), None);

        // Nothing to wait for after the first failure
        err.wait_before_retry().await;
        assert!(start.elapsed() < std::time::Duration::from_millis(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_second_failure_returns_notice_before_backoff() {
        let (_clock, _auth, flow) = setup(StaticAuthenticator::new());

        let _ = flow.login("somchai@example.com", "wrong", Some("c1")).await;
        let start = tokio::time::Instant::now();
        let err = flow.login("somchai@example.com", "wrong", Some("c1")).await.unwrap_err();

        // The notice is available before any waiting happens
        assert!(start.elapsed() < std::time::Duration::from_millis(1));
        assert_eq!(err.attempts_notice().as_deref(), Some("เหลือโอกาส 3 ครั้ง"));
        assert!(matches!(
            err,
            LoginError::Authentication { retry_delay_ms: Some(4000), .. }
        ));

        err.wait_before_retry().await;
        assert!(start.elapsed() >= std::time::Duration::from_millis(4000));
    }

    #[tokio::test(start_paused = true)]
    async fn test_fifth_failure_locks_out_and_blocks_provider() {
        let (clock, auth, flow) = setup(StaticAuthenticator::new());

        for _ in 0..4 {
            let _ = flow.login("somchai@example.com", "wrong", Some("c1")).await;
        }
        let err = flow.login("somchai@example.com", "wrong", Some("c1")).await.unwrap_err();
        assert!(matches!(err, LoginError::LockedOut { lockout_secs: 900, .. }));
        assert_eq!(
            err.user_message(),
            "บัญชีถูกล็อกชั่วคราว 15 นาที เนื่องจากพยายาม login ผิดหลายครั้ง"
        );
        assert_eq!(auth.calls(), 5);

        // Even the right password is refused without contacting the provider
        clock.advance(Duration::seconds(30));
        let err = flow
            .login("somchai@example.com", "correct-horse", Some("c1"))
            .await
            .unwrap_err();
        assert!(matches!(err, LoginError::RateLimited { retry_after_secs: 870 }));
        assert_eq!(err.user_message(), "กรุณารอ 14 นาที 30 วินาที ก่อนลองใหม่");
        assert_eq!(auth.calls(), 5);

        clock.advance(Duration::minutes(15));
        assert!(flow
            .login("somchai@example.com", "correct-horse", Some("c1"))
            .await
            .is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_invalid_input_is_not_counted() {
        let (_clock, auth, flow) = setup(StaticAuthenticator::new());

        let err = flow.login("not-an-email", "pw", Some("c1")).await.unwrap_err();

        assert!(matches!(err, LoginError::Validation(ValidationError::InvalidEmail)));
        assert_eq!(err.user_message(), "Invalid email format");
        assert_eq!(err.safe_error().map(|e| e.code), Some(ErrorCode::ValidationError));
        assert_eq!(auth.calls(), 0);
        assert_eq!(flow.limiter().attempt_count(Some("c1")), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_network_failure_is_not_counted() {
        let mut authenticator = StaticAuthenticator::new();
        authenticator.offline = true;
        let (_clock, _auth, flow) = setup(authenticator);

        let err = flow.login("somchai@example.com", "pw", Some("c1")).await.unwrap_err();

        match err {
            LoginError::Unavailable(safe) => assert_eq!(safe.code, ErrorCode::NetworkError),
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(flow.limiter().attempt_count(Some("c1")), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_default_identifier_is_shared_between_calls() {
        let (_clock, _auth, flow) = setup(StaticAuthenticator::new());

        let _ = flow.login("somchai@example.com", "wrong", None).await;
        let _ = flow.login("other@example.com", "wrong", None).await;

        assert_eq!(flow.limiter().attempt_count(None), 2);
    }
}
