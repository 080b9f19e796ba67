//! Data models
//!
//! This module contains the data structures shared by the login guard:
//! - Per-client attempt state and the limiter's advisory results
//! - Login credentials and the authenticated user returned by the provider

mod attempt;
mod credentials;

pub use attempt::{AttemptRecord, FailedAttemptOutcome, RateLimitStatus};
pub use credentials::{AuthenticatedUser, LoginInput};
