//! Login input validation

use crate::models::LoginInput;
use once_cell::sync::Lazy;
use regex::Regex;

/// Maximum email length accepted by the login form
const MAX_EMAIL_LENGTH: usize = 254;

static EMAIL_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern is valid"));

/// Validation failure, with the message shown next to the field
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Email is required")]
    EmailRequired,

    #[error("Invalid email format")]
    InvalidEmail,

    #[error("Email too long")]
    EmailTooLong,

    #[error("Password is required")]
    PasswordRequired,
}

/// Validate and normalize login form input
///
/// The email is trimmed and lowercased. The password is passed through
/// untouched; only its presence is checked.
pub fn validate_login(email: &str, password: &str) -> Result<LoginInput, ValidationError> {
    let email = email.trim().to_lowercase();

    if email.is_empty() {
        return Err(ValidationError::EmailRequired);
    }
    if email.chars().count() > MAX_EMAIL_LENGTH {
        return Err(ValidationError::EmailTooLong);
    }
    if !EMAIL_REGEX.is_match(&email) {
        return Err(ValidationError::InvalidEmail);
    }
    if password.is_empty() {
        return Err(ValidationError::PasswordRequired);
    }

    Ok(LoginInput::new(email, password))
}
