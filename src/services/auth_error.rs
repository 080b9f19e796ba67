//! Safe authentication error handling
//!
//! Identity provider messages are never shown to users verbatim. They are
//! mapped to a fixed set of user-facing messages, and the raw message is
//! only logged.

use crate::services::validation::ValidationError;
use once_cell::sync::Lazy;
use std::collections::HashMap;

/// Error reported by the identity provider
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProviderError {
    /// The provider answered and refused the sign-in
    #[error("Provider rejected sign-in: {0}")]
    Rejected(String),

    /// The provider could not be reached
    #[error("Network error: {0}")]
    Network(String),
}

/// Category of a [`SafeError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    AuthError,
    ValidationError,
    NetworkError,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::AuthError => "AUTH_ERROR",
            ErrorCode::ValidationError => "VALIDATION_ERROR",
            ErrorCode::NetworkError => "NETWORK_ERROR",
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error carrying only a message that is safe to display
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("[{code}] {user_message}")]
pub struct SafeError {
    pub code: ErrorCode,
    pub user_message: String,
}

const AUTH_FALLBACK: &str = "Authentication failed. Please try again.";
const NETWORK_MESSAGE: &str =
    "Connection failed. Please check your internet connection and try again.";

static AUTH_MESSAGES: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        ("Invalid login credentials", "Invalid email or password"),
        ("Email not confirmed", "Please check your email and confirm your account"),
        ("Too many requests", "Too many attempts. Please try again later"),
        ("User already registered", "An account with this email already exists"),
        ("Signup disabled", "Registration is currently disabled"),
        ("Email rate limit exceeded", "Too many emails sent. Please try again later"),
        (
            "Password should be at least 6 characters",
            "Password must be at least 6 characters long",
        ),
        (
            "Unable to validate email address: invalid format",
            "Please enter a valid email address",
        ),
        ("Database error saving new user", "Registration failed. Please try again"),
        ("User not found", "Invalid email or password"),
        ("Invalid email", "Please enter a valid email address"),
        ("Weak password", "Password is too weak. Please choose a stronger password"),
    ])
});

impl SafeError {
    pub fn new(code: ErrorCode, user_message: impl Into<String>) -> Self {
        Self {
            code,
            user_message: user_message.into(),
        }
    }

    /// Map an identity provider error to a safe message
    pub fn from_provider(error: &ProviderError) -> Self {
        tracing::warn!("Authentication provider error: {}", error);

        match error {
            ProviderError::Rejected(message) => {
                let user_message = AUTH_MESSAGES
                    .get(message.as_str())
                    .copied()
                    .unwrap_or(AUTH_FALLBACK);
                Self::new(ErrorCode::AuthError, user_message)
            }
            ProviderError::Network(_) => Self::new(ErrorCode::NetworkError, NETWORK_MESSAGE),
        }
    }

    /// Wrap a form validation failure; its message is already user-facing
    pub fn from_validation(error: &ValidationError) -> Self {
        Self::new(ErrorCode::ValidationError, error.to_string())
    }
}
