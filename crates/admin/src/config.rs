//! Admin configuration loaded from environment variables.

use std::str::FromStr;
use std::time::Duration;

use domain::BusConfig;
use thiserror::Error;

/// A configuration variable was set to a value that cannot be used.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid value {value:?} for {key}: {reason}")]
pub struct ConfigError {
    pub key: &'static str,
    pub value: String,
    pub reason: String,
}

/// Admin process configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `ADMIN_MAX_RETRIES`: conflict retries per dispatch (default: `3`)
/// - `ADMIN_RETRY_BACKOFF_MS`: base retry pause in ms (default: `5`)
/// - `ADMIN_DISPATCH_TIMEOUT_MS`: deadline per dispatch in ms (default: `5000`)
/// - `RUST_LOG`: tracing filter directive (default: `"info"`)
/// - `ADMIN_LOG_JSON`: emit JSON log lines (default: `false`)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminConfig {
    pub max_retries: u32,
    pub retry_backoff: Duration,
    pub dispatch_timeout: Duration,
    pub log_level: String,
    pub log_json: bool,
}

impl AdminConfig {
    /// Loads configuration from environment variables, falling back to
    /// defaults for unset ones.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads configuration through `lookup` instead of the process
    /// environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        Ok(Self {
            max_retries: parse(&lookup, "ADMIN_MAX_RETRIES")?.unwrap_or(defaults.max_retries),
            retry_backoff: parse(&lookup, "ADMIN_RETRY_BACKOFF_MS")?
                .map_or(defaults.retry_backoff, Duration::from_millis),
            dispatch_timeout: match parse::<u64>(&lookup, "ADMIN_DISPATCH_TIMEOUT_MS")? {
                Some(0) => {
                    return Err(ConfigError {
                        key: "ADMIN_DISPATCH_TIMEOUT_MS",
                        value: "0".to_string(),
                        reason: "must be greater than zero".to_string(),
                    });
                }
                Some(ms) => Duration::from_millis(ms),
                None => defaults.dispatch_timeout,
            },
            log_level: lookup("RUST_LOG").unwrap_or(defaults.log_level),
            log_json: parse_flag(&lookup, "ADMIN_LOG_JSON")?.unwrap_or(defaults.log_json),
        })
    }

    /// The command bus settings carried by this configuration.
    pub fn bus_config(&self) -> BusConfig {
        BusConfig {
            max_retries: self.max_retries,
            retry_backoff: self.retry_backoff,
            dispatch_timeout: self.dispatch_timeout,
        }
    }
}

impl Default for AdminConfig {
    fn default() -> Self {
        let bus = BusConfig::default();
        Self {
            max_retries: bus.max_retries,
            retry_backoff: bus.retry_backoff,
            dispatch_timeout: bus.dispatch_timeout,
            log_level: "info".to_string(),
            log_json: false,
        }
    }
}

fn parse<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    lookup(key)
        .map(|value| {
            value.trim().parse().map_err(|e: T::Err| ConfigError {
                key,
                reason: e.to_string(),
                value,
            })
        })
        .transpose()
}

fn parse_flag(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
) -> Result<Option<bool>, ConfigError> {
    lookup(key)
        .map(|value| match value.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" | "" => Ok(false),
            _ => Err(ConfigError {
                key,
                value,
                reason: "expected a boolean".to_string(),
            }),
        })
        .transpose()
}
