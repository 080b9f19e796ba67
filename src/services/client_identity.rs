//! Client identity derivation
//!
//! A client identifier approximates a browser session from a handful of
//! environment signals. It is best-effort only: two people sharing the
//! same environment get the same identifier, and nothing here survives a
//! restart of the process that owns the limiter.

use serde::{Deserialize, Serialize};

/// Environment signals a client identifier is derived from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientEnvironment {
    pub user_agent: String,
    pub screen_width: u32,
    pub screen_height: u32,
    pub timezone: String,
}

impl ClientEnvironment {
    pub fn new(
        user_agent: impl Into<String>,
        screen_width: u32,
        screen_height: u32,
        timezone: impl Into<String>,
    ) -> Self {
        Self {
            user_agent: user_agent.into(),
            screen_width,
            screen_height,
            timezone: timezone.into(),
        }
    }

    /// Collect signals for the current process
    ///
    /// Uses the crate name/version and platform as user agent, the
    /// terminal size from `COLUMNS`/`LINES` as screen and `TZ` as timezone.
    pub fn detect() -> Self {
        let user_agent = format!(
            "{}/{} ({}; {})",
            env!("CARGO_PKG_NAME"),
            env!("CARGO_PKG_VERSION"),
            std::env::consts::OS,
            std::env::consts::ARCH
        );
        let dimension = |key: &str| {
            std::env::var(key)
                .ok()
                .and_then(|v| v.trim().parse::<u32>().ok())
                .unwrap_or(0)
        };
        let timezone = std::env::var("TZ")
            .ok()
            .filter(|tz| !tz.trim().is_empty())
            .unwrap_or_else(|| "UTC".to_string());

        Self::new(user_agent, dimension("COLUMNS"), dimension("LINES"), timezone)
    }

    /// Derive the client identifier for these signals
    pub fn client_id(&self) -> ClientIdentity {
        let data = format!(
            "{}-{}x{}-{}",
            self.user_agent, self.screen_width, self.screen_height, self.timezone
        );
        ClientIdentity(format!("{:x}", md5::compute(data)))
    }
}

/// Derived key scoping rate-limit state
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClientIdentity(String);

impl ClientIdentity {
    /// Use an explicit identifier, e.g. a username or an IP address
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ClientIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
