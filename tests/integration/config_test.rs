//! Configuration loading tests
//!
//! File-based loading goes through tempfile; environment tests mutate the
//! process environment and therefore run serially.

use std::io::Write;
use std::time::Duration;

use maternity_messaging::client::config::{
    ENV_API_TOKEN, ENV_API_URL, ENV_BACKOFF_MAX, ENV_POLL_INTERVAL,
};
use maternity_messaging::client::Config;
use maternity_messaging::shared::{ConfigError, FailureBackoff};
use serial_test::serial;
use tempfile::NamedTempFile;

const ALL_VARS: [&str; 4] = [ENV_API_URL, ENV_API_TOKEN, ENV_POLL_INTERVAL, ENV_BACKOFF_MAX];

fn clear_env() {
    for var in ALL_VARS {
        std::env::remove_var(var);
    }
}

#[test]
fn test_load_file() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(
        file,
        r#"
server_url = "https://portal.example.org/api/"
token = "abc"
poll_interval_secs = 10
backoff_max_secs = 60
request_timeout_secs = 15
"#
    )
    .unwrap();

    let config = crate::assert_ok!(Config::load_file(file.path()));
    assert_eq!(config.server_url(), "https://portal.example.org/api");
    assert_eq!(config.get_token().map(String::as_str), Some("abc"));
    assert_eq!(config.poll_interval(), Duration::from_secs(10));
    assert_eq!(
        config.failure_backoff(),
        FailureBackoff::Exponential {
            max: Duration::from_secs(60)
        }
    );
    assert_eq!(config.request_timeout(), Some(Duration::from_secs(15)));
    assert_eq!(config.api_url("/messages"), "https://portal.example.org/api/messages");
}

#[test]
fn test_load_missing_file_is_read_error() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("nope.toml");
    crate::assert_err!(Config::load_file(&missing), ConfigError::Read(_));
}

#[test]
fn test_load_file_with_bad_url() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, r#"server_url = "ftp://portal.example.org""#).unwrap();
    crate::assert_err!(Config::load_file(file.path()), ConfigError::InvalidUrl(_));
}

#[test]
#[serial]
fn test_from_env_defaults() {
    clear_env();
    let config = crate::assert_ok!(Config::from_env());
    assert_eq!(config.poll_interval(), Duration::from_secs(5));
    assert_eq!(config.failure_backoff(), FailureBackoff::None);
    assert!(config.get_token().is_none());
}

#[test]
#[serial]
fn test_from_env_overrides() {
    clear_env();
    std::env::set_var(ENV_API_URL, "http://10.0.0.5:8080");
    std::env::set_var(ENV_API_TOKEN, "jwt-from-env");
    std::env::set_var(ENV_POLL_INTERVAL, "2");

    let config = Config::from_env();
    clear_env();

    let config = crate::assert_ok!(config);
    assert_eq!(config.server_url(), "http://10.0.0.5:8080");
    assert_eq!(config.get_token().map(String::as_str), Some("jwt-from-env"));
    assert_eq!(config.poll_interval(), Duration::from_secs(2));
}

#[test]
#[serial]
fn test_from_env_rejects_zero_interval() {
    clear_env();
    std::env::set_var(ENV_POLL_INTERVAL, "0");
    let result = Config::from_env();
    clear_env();
    crate::assert_err!(result, ConfigError::InvalidInterval(_));
}
