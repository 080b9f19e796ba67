//! Configuration management
//!
//! This module handles loading and parsing the login guard policy.
//! Configuration can be loaded from:
//! - a YAML file (usually `guard.yml`)
//! - Environment variables (override file settings)
//!
//! Missing optional values are filled with the defaults of the login page:
//! 5 attempts, 2 second base delay, 15 minute lockout.

use chrono::Duration;
use serde::{Deserialize, Serialize};

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Rate limiting policy for login attempts
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
}

/// Rate limiting policy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Failed attempts before the client is locked out
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Delay after the first failure, doubled on each further failure
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
    /// Upper bound for the backoff delay
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
    /// How long a lockout lasts
    #[serde(default = "default_lockout_duration_secs")]
    pub lockout_duration_secs: u64,
    /// Inactivity after which accumulated failures are forgiven
    #[serde(default = "default_attempt_window_secs")]
    pub attempt_window_secs: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            lockout_duration_secs: default_lockout_duration_secs(),
            attempt_window_secs: default_attempt_window_secs(),
        }
    }
}

fn default_max_attempts() -> u32 {
    5
}

fn default_base_delay_ms() -> u64 {
    2000
}

fn default_max_delay_ms() -> u64 {
    30_000
}

fn default_lockout_duration_secs() -> u64 {
    15 * 60 // 15 minutes
}

fn default_attempt_window_secs() -> u64 {
    60 * 60 // 1 hour
}

impl RateLimitConfig {
    /// Lockout duration as a chrono duration
    pub fn lockout_duration(&self) -> Duration {
        Duration::seconds(clamp_secs(self.lockout_duration_secs))
    }

    /// Rolling window as a chrono duration
    pub fn attempt_window(&self) -> Duration {
        Duration::seconds(clamp_secs(self.attempt_window_secs))
    }
}

// chrono panics on durations beyond i64::MAX milliseconds
fn clamp_secs(secs: u64) -> i64 {
    secs.min((i64::MAX / 1000) as u64) as i64
}

/// Error type for configuration parsing
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    FileRead {
        path: String,
        source: std::io::Error,
    },
    #[error("Failed to parse config file '{path}': {message}")]
    ParseError {
        path: String,
        message: String,
    },
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

impl Config {
    /// Load configuration from file
    ///
    /// If the file doesn't exist, returns default configuration.
    /// If the file exists but is invalid YAML, returns an error with details.
    pub fn load(path: &std::path::Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
            path: path.display().to_string(),
            source: e,
        })?;

        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        let config: Config = serde_yaml::from_str(&content).map_err(|e| {
            ConfigError::ParseError {
                path: path.display().to_string(),
                message: format_yaml_error(&e),
            }
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from file with environment variable overrides
    ///
    /// Environment variables follow the pattern:
    /// - BPL_RATE_LIMIT_MAX_ATTEMPTS
    /// - BPL_RATE_LIMIT_BASE_DELAY_MS
    /// - BPL_RATE_LIMIT_MAX_DELAY_MS
    /// - BPL_RATE_LIMIT_LOCKOUT_SECS
    /// - BPL_RATE_LIMIT_WINDOW_SECS
    pub fn load_with_env(path: &std::path::Path) -> anyhow::Result<Self> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Check that the policy can actually be enforced
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.rate_limit.max_attempts == 0 {
            return Err(ConfigError::ValidationError(
                "rate_limit.max_attempts must be at least 1".to_string(),
            ));
        }
        if self.rate_limit.attempt_window_secs == 0 {
            return Err(ConfigError::ValidationError(
                "rate_limit.attempt_window_secs must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Apply environment variable overrides to the configuration
    fn apply_env_overrides(&mut self) {
        if let Some(v) = env_parse::<u32>("BPL_RATE_LIMIT_MAX_ATTEMPTS") {
            self.rate_limit.max_attempts = v;
        }
        if let Some(v) = env_parse::<u64>("BPL_RATE_LIMIT_BASE_DELAY_MS") {
            self.rate_limit.base_delay_ms = v;
        }
        if let Some(v) = env_parse::<u64>("BPL_RATE_LIMIT_MAX_DELAY_MS") {
            self.rate_limit.max_delay_ms = v;
        }
        if let Some(v) = env_parse::<u64>("BPL_RATE_LIMIT_LOCKOUT_SECS") {
            self.rate_limit.lockout_duration_secs = v;
        }
        if let Some(v) = env_parse::<u64>("BPL_RATE_LIMIT_WINDOW_SECS") {
            self.rate_limit.attempt_window_secs = v;
        }
    }
}

/// Read and parse an environment variable, ignoring invalid values
fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    let raw = std::env::var(key).ok()?;
    match raw.trim().parse::<T>() {
        Ok(v) => Some(v),
        Err(_) => {
            tracing::warn!("Ignoring invalid value for {}: {:?}", key, raw);
            None
        }
    }
}

/// Format YAML parsing error with location and context
fn format_yaml_error(e: &serde_yaml::Error) -> String {
    if let Some(location) = e.location() {
        format!(
            "at line {}, column {}: {}",
            location.line(),
            location.column(),
            e
        )
    } else {
        e.to_string()
    }
}

// Shared mutex for all config tests that modify environment variables.
#[cfg(test)]
static CONFIG_ENV_MUTEX: std::sync::Mutex<()> = std::sync::Mutex::new(());

#[cfg(test)]
const ENV_KEYS: [&str; 5] = [
    "BPL_RATE_LIMIT_MAX_ATTEMPTS",
    "BPL_RATE_LIMIT_BASE_DELAY_MS",
    "BPL_RATE_LIMIT_MAX_DELAY_MS",
    "BPL_RATE_LIMIT_LOCKOUT_SECS",
    "BPL_RATE_LIMIT_WINDOW_SECS",
];
