//! Services layer - Login guard logic
//!
//! This module contains the login guard services:
//! - The rate limiter and the clock it reads time from
//! - Client identity derivation
//! - Input validation and safe error mapping
//! - The login flow tying them to an identity provider

pub mod auth_error;
pub mod client_identity;
pub mod clock;
pub mod login;
pub mod rate_limiter;
pub mod time_format;
pub mod validation;

pub use auth_error::{ErrorCode, ProviderError, SafeError};
pub use client_identity::{ClientEnvironment, ClientIdentity};
pub use clock::{Clock, ManualClock, SystemClock};
pub use login::{Authenticator, LoginError, LoginFlow};
pub use rate_limiter::{backoff_delay_ms, LoginRateLimiter};
pub use time_format::{delay, format_time_remaining};
pub use validation::{validate_login, ValidationError};
