use crate::shared::config::{AppConfig, AppConfigBuilder, ConfigError, FailureBackoff};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable holding the backend base URL
pub const ENV_API_URL: &str = "PORTAL_API_URL";
/// Environment variable holding the bearer token
pub const ENV_API_TOKEN: &str = "PORTAL_API_TOKEN";
/// Environment variable overriding the poll interval, in seconds
pub const ENV_POLL_INTERVAL: &str = "PORTAL_POLL_INTERVAL_SECS";
/// Environment variable enabling failure backoff, capped at this many seconds
pub const ENV_BACKOFF_MAX: &str = "PORTAL_BACKOFF_MAX_SECS";

/// On-disk form of the client configuration
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    server_url: Option<String>,
    token: Option<String>,
    poll_interval_secs: Option<u64>,
    backoff_max_secs: Option<u64>,
    request_timeout_secs: Option<u64>,
}

/// Client configuration: the shared [`AppConfig`] plus the session token.
#[derive(Debug, Clone)]
pub struct Config {
    app: AppConfig,
    token: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            app: AppConfig::default(),
            token: None,
        }
    }
}

impl Config {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_builder(builder: AppConfigBuilder) -> Result<Self, ConfigError> {
        Ok(Self {
            app: builder.build()?,
            token: None,
        })
    }

    /// Read configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        Self::default().overlay(lookup)
    }

    /// Apply environment-style overrides on top of this configuration.
    pub fn overlay<F>(self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut builder = AppConfig::builder()
            .server_url(self.app.server_url.clone())
            .poll_interval(self.app.poll_interval)
            .failure_backoff(self.app.failure_backoff);
        if let Some(timeout) = self.app.request_timeout {
            builder = builder.request_timeout(timeout);
        }

        if let Some(url) = lookup(ENV_API_URL).filter(|v| !v.trim().is_empty()) {
            builder = builder.server_url(url);
        }
        if let Some(raw) = lookup(ENV_POLL_INTERVAL) {
            builder = builder.poll_interval(Duration::from_secs(parse_secs(ENV_POLL_INTERVAL, &raw)?));
        }
        if let Some(raw) = lookup(ENV_BACKOFF_MAX) {
            builder = builder.failure_backoff(FailureBackoff::Exponential {
                max: Duration::from_secs(parse_secs(ENV_BACKOFF_MAX, &raw)?),
            });
        }

        let token = lookup(ENV_API_TOKEN)
            .filter(|t| !t.trim().is_empty())
            .or(self.token);

        Ok(Self {
            app: builder.build()?,
            token,
        })
    }

    /// Parse a TOML configuration document.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let file: ConfigFile = toml::from_str(text)?;

        let mut builder = AppConfig::builder();
        if let Some(url) = file.server_url {
            builder = builder.server_url(url);
        }
        if let Some(secs) = file.poll_interval_secs {
            builder = builder.poll_interval(Duration::from_secs(secs));
        }
        if let Some(secs) = file.backoff_max_secs {
            builder = builder.failure_backoff(FailureBackoff::Exponential {
                max: Duration::from_secs(secs),
            });
        }
        if let Some(secs) = file.request_timeout_secs {
            builder = builder.request_timeout(Duration::from_secs(secs));
        }

        Ok(Self {
            app: builder.build()?,
            token: file.token.filter(|t| !t.trim().is_empty()),
        })
    }

    /// Load a TOML configuration file.
    pub fn load_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// `<config dir>/maternity-messaging/config.toml`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("maternity-messaging").join("config.toml"))
    }

    /// Load the default file when present, then apply environment overrides.
    pub fn load() -> Result<Self, ConfigError> {
        let base = match Self::default_path() {
            Some(path) if path.is_file() => {
                tracing::debug!(path = %path.display(), "loading config file");
                Self::load_file(&path)?
            }
            _ => Self::default(),
        };
        base.overlay(|key| std::env::var(key).ok())
    }

    pub fn app(&self) -> &AppConfig {
        &self.app
    }

    /// Set the bearer token
    pub fn set_token(&mut self, token: Option<String>) {
        self.token = token;
    }

    /// Get the bearer token
    pub fn get_token(&self) -> Option<&String> {
        self.token.as_ref()
    }

    /// Clear the token (logout)
    pub fn clear_token(&mut self) {
        self.token = None;
    }

    /// Get the full URL for an API endpoint
    pub fn api_url(&self, path: &str) -> String {
        format!("{}/{}", self.server_url(), path.trim_start_matches('/'))
    }

    pub fn server_url(&self) -> &str {
        &self.app.server_url
    }

    pub fn poll_interval(&self) -> Duration {
        self.app.poll_interval
    }

    pub fn failure_backoff(&self) -> FailureBackoff {
        self.app.failure_backoff
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.app.request_timeout
    }
}

fn parse_secs(field: &'static str, raw: &str) -> Result<u64, ConfigError> {
    raw.trim()
        .parse::<u64>()
        .map_err(|e| ConfigError::InvalidValue {
            field,
            message: e.to_string(),
        })
}
