//! Application configuration module
//!
//! Provides the transport-independent configuration of the messaging engine:
//! where the portal backend lives and how often the active conversation is
//! polled.

use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Default server URL
pub const DEFAULT_SERVER_URL: &str = "http://127.0.0.1:3000";

/// Default polling cadence for the active conversation
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// What the synchronizer does to its schedule after failed fetches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailureBackoff {
    /// Keep polling on the fixed interval.
    #[default]
    None,
    /// Double the delay per consecutive failure, capped at `max`.
    Exponential {
        /// Upper bound for the delay between failed polls
        max: Duration,
    },
}

/// Application configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    /// Server URL
    pub server_url: String,
    /// Fixed interval between polls of the active conversation
    pub poll_interval: Duration,
    /// Backoff policy applied after failed polls
    pub failure_backoff: FailureBackoff,
    /// Optional per-request timeout; the transport's own limits apply when unset
    pub request_timeout: Option<Duration>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server_url: DEFAULT_SERVER_URL.to_string(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            failure_backoff: FailureBackoff::None,
            request_timeout: None,
        }
    }
}

impl AppConfig {
    /// Create a new AppConfigBuilder
    pub fn builder() -> AppConfigBuilder {
        AppConfigBuilder::default()
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        let url = Url::parse(&self.server_url)
            .map_err(|e| ConfigError::InvalidUrl(format!("{}: {}", self.server_url, e)))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ConfigError::InvalidUrl(format!(
                "{}: scheme must be http or https",
                self.server_url
            )));
        }
        if self.poll_interval.is_zero() {
            return Err(ConfigError::InvalidInterval("poll_interval"));
        }
        if let FailureBackoff::Exponential { max } = self.failure_backoff {
            if max < self.poll_interval {
                return Err(ConfigError::InvalidInterval("failure_backoff.max"));
            }
        }
        Ok(())
    }
}

/// Builder for AppConfig
#[derive(Debug, Default)]
pub struct AppConfigBuilder {
    server_url: Option<String>,
    poll_interval: Option<Duration>,
    failure_backoff: Option<FailureBackoff>,
    request_timeout: Option<Duration>,
}

impl AppConfigBuilder {
    /// Set the server URL
    pub fn server_url(mut self, url: impl Into<String>) -> Self {
        self.server_url = Some(url.into());
        self
    }

    /// Set the polling interval
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = Some(interval);
        self
    }

    /// Set the failure backoff policy
    pub fn failure_backoff(mut self, backoff: FailureBackoff) -> Self {
        self.failure_backoff = Some(backoff);
        self
    }

    /// Set a per-request timeout
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    /// Build the configuration
    pub fn build(self) -> Result<AppConfig, ConfigError> {
        let defaults = AppConfig::default();
        let config = AppConfig {
            server_url: self
                .server_url
                .map(|url| url.trim().trim_end_matches('/').to_string())
                .unwrap_or(defaults.server_url),
            poll_interval: self.poll_interval.unwrap_or(defaults.poll_interval),
            failure_backoff: self.failure_backoff.unwrap_or(defaults.failure_backoff),
            request_timeout: self.request_timeout,
        };
        config.validate()?;
        Ok(config)
    }
}

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid URL: {0}")]
    InvalidUrl(String),
    #[error("missing value: {0}")]
    MissingValue(&'static str),
    #[error("invalid value for {field}: {message}")]
    InvalidValue { field: &'static str, message: String },
    #[error("interval must be positive and consistent: {0}")]
    InvalidInterval(&'static str),
    #[error("failed to read config file: {0}")]
    Read(#[from] std::io::Error),
    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
}
