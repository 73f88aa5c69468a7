//! Authly API configuration.
//!
//! Configuration is loaded from environment variables with defaults matching
//! a local Better Auth deployment.

use crate::auth::jwks::{KeySetCacheConfig, DEFAULT_RETRY_INTERVAL};
use common::config::{LogFormat, ObservabilityConfig};
use common::jwt::{DEFAULT_CLOCK_SKEW, MAX_CLOCK_SKEW};
use std::collections::HashMap;
use std::env;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Default HTTP bind address.
pub const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0:8080";

/// Default Better Auth base URL.
pub const DEFAULT_BETTER_AUTH_URL: &str = "http://localhost:3000";

/// JWKS path below the Better Auth base URL.
pub const JWKS_PATH: &str = "/api/auth/jwks";

/// Default JWKS refresh interval in seconds.
pub const DEFAULT_JWKS_REFRESH_INTERVAL_SECONDS: u64 = 300;

/// Default JWKS fetch timeout in seconds.
pub const DEFAULT_JWKS_FETCH_TIMEOUT_SECONDS: u64 = 10;

/// Default key set age, in seconds, after which a lookup triggers a refresh.
pub const DEFAULT_JWKS_MAX_STALENESS_SECONDS: u64 = 900;

/// Default filter directives when `RUST_LOG` is unset.
pub const DEFAULT_LOG_FILTER: &str = "authly_api=info,tower_http=info";

const REFRESH_INTERVAL_RANGE: (u64, u64) = (10, 86_400);
const FETCH_TIMEOUT_RANGE: (u64, u64) = (1, 60);

/// Authly API configuration.
#[derive(Clone)]
pub struct Config {
    /// Server bind address (default: "0.0.0.0:8080").
    pub bind_address: String,

    /// Better Auth base URL, without trailing slash.
    pub better_auth_url: String,

    /// JWKS discovery URL (default: `<better_auth_url>/api/auth/jwks`).
    pub jwks_url: String,

    /// Clock skew tolerance for `exp`, `nbf` and `iat`.
    pub jwt_clock_skew: Duration,

    /// Interval between background JWKS refreshes.
    pub jwks_refresh_interval: Duration,

    /// Bound on a single JWKS fetch.
    pub jwks_fetch_timeout: Duration,

    /// Key set age after which a lookup triggers an early refresh.
    pub jwks_max_staleness: Duration,

    /// Logging setup.
    pub observability: ObservabilityConfig,

    /// Time to keep serving in-flight requests after a shutdown signal.
    pub shutdown_drain: Duration,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("bind_address", &self.bind_address)
            .field("better_auth_url", &self.better_auth_url)
            .field("jwks_url", &self.jwks_url)
            .field("jwt_clock_skew_seconds", &self.jwt_clock_skew.as_secs())
            .field(
                "jwks_refresh_interval_seconds",
                &self.jwks_refresh_interval.as_secs(),
            )
            .field(
                "jwks_fetch_timeout_seconds",
                &self.jwks_fetch_timeout.as_secs(),
            )
            .field(
                "jwks_max_staleness_seconds",
                &self.jwks_max_staleness.as_secs(),
            )
            .field("log_format", &self.observability.log_format)
            .field("shutdown_drain_seconds", &self.shutdown_drain.as_secs())
            .finish()
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid JWKS URL: {0}")]
    InvalidJwksUrl(String),

    #[error("Invalid JWT clock skew configuration: {0}")]
    InvalidJwtClockSkew(String),

    #[error("Invalid JWKS refresh configuration: {0}")]
    InvalidJwksRefresh(String),

    #[error("Invalid log format: {0}")]
    InvalidLogFormat(String),

    #[error("Invalid shutdown drain configuration: {0}")]
    InvalidShutdownDrain(String),
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&env::vars().collect())
    }

    /// Load configuration from a HashMap (for testing).
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let bind_address = vars
            .get("BIND_ADDRESS")
            .cloned()
            .unwrap_or_else(|| DEFAULT_BIND_ADDRESS.to_string());

        let better_auth_url = vars
            .get("BETTER_AUTH_URL")
            .map(|url| url.trim_end_matches('/').to_string())
            .filter(|url| !url.is_empty())
            .unwrap_or_else(|| DEFAULT_BETTER_AUTH_URL.to_string());

        let jwks_url = vars
            .get("JWKS_URL")
            .cloned()
            .unwrap_or_else(|| format!("{better_auth_url}{JWKS_PATH}"));
        validate_http_url(&jwks_url)?;

        let jwt_clock_skew = match vars.get("JWT_CLOCK_SKEW_SECONDS") {
            Some(value_str) => {
                let value: u64 = value_str.parse().map_err(|e| {
                    ConfigError::InvalidJwtClockSkew(format!(
                        "JWT_CLOCK_SKEW_SECONDS must be a non-negative integer, got '{value_str}': {e}"
                    ))
                })?;

                if value > MAX_CLOCK_SKEW.as_secs() {
                    return Err(ConfigError::InvalidJwtClockSkew(format!(
                        "JWT_CLOCK_SKEW_SECONDS must not exceed {} seconds, got {value}",
                        MAX_CLOCK_SKEW.as_secs()
                    )));
                }

                Duration::from_secs(value)
            }
            None => DEFAULT_CLOCK_SKEW,
        };

        let jwks_refresh_interval = parse_seconds_in_range(
            vars,
            "JWKS_REFRESH_INTERVAL_SECONDS",
            DEFAULT_JWKS_REFRESH_INTERVAL_SECONDS,
            REFRESH_INTERVAL_RANGE,
        )?;

        let jwks_fetch_timeout = parse_seconds_in_range(
            vars,
            "JWKS_FETCH_TIMEOUT_SECONDS",
            DEFAULT_JWKS_FETCH_TIMEOUT_SECONDS,
            FETCH_TIMEOUT_RANGE,
        )?;

        let jwks_max_staleness = match vars.get("JWKS_MAX_STALENESS_SECONDS") {
            Some(value_str) => {
                let value: u64 = value_str.parse().map_err(|e| {
                    ConfigError::InvalidJwksRefresh(format!(
                        "JWKS_MAX_STALENESS_SECONDS must be a valid integer, got '{value_str}': {e}"
                    ))
                })?;
                Duration::from_secs(value)
            }
            None => Duration::from_secs(DEFAULT_JWKS_MAX_STALENESS_SECONDS)
                .max(jwks_refresh_interval),
        };

        if jwks_max_staleness < jwks_refresh_interval {
            return Err(ConfigError::InvalidJwksRefresh(format!(
                "JWKS_MAX_STALENESS_SECONDS ({}) must be at least the refresh interval ({})",
                jwks_max_staleness.as_secs(),
                jwks_refresh_interval.as_secs()
            )));
        }

        let log_format = match vars.get("LOG_FORMAT") {
            Some(value) => value
                .parse::<LogFormat>()
                .map_err(ConfigError::InvalidLogFormat)?,
            None => LogFormat::default(),
        };

        let shutdown_drain = match vars.get("SHUTDOWN_DRAIN_SECONDS") {
            Some(value_str) => Duration::from_secs(value_str.parse().map_err(|e| {
                ConfigError::InvalidShutdownDrain(format!(
                    "SHUTDOWN_DRAIN_SECONDS must be a non-negative integer, got '{value_str}': {e}"
                ))
            })?),
            None => Duration::ZERO,
        };

        Ok(Config {
            bind_address,
            better_auth_url,
            jwks_url,
            jwt_clock_skew,
            jwks_refresh_interval,
            jwks_fetch_timeout,
            jwks_max_staleness,
            observability: ObservabilityConfig {
                log_format,
                default_filter: DEFAULT_LOG_FILTER.to_string(),
            },
            shutdown_drain,
        })
    }

    /// Key cache tuning derived from this configuration.
    pub fn key_set_cache_config(&self) -> KeySetCacheConfig {
        KeySetCacheConfig {
            refresh_interval: self.jwks_refresh_interval,
            retry_interval: DEFAULT_RETRY_INTERVAL,
            fetch_timeout: self.jwks_fetch_timeout,
            max_staleness: self.jwks_max_staleness,
        }
    }
}

fn validate_http_url(url: &str) -> Result<(), ConfigError> {
    let parsed = reqwest::Url::parse(url)
        .map_err(|e| ConfigError::InvalidJwksUrl(format!("'{url}' is not a valid URL: {e}")))?;

    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidJwksUrl(format!(
            "'{url}' must use http or https"
        )));
    }

    Ok(())
}

fn parse_seconds_in_range(
    vars: &HashMap<String, String>,
    name: &str,
    default: u64,
    (min, max): (u64, u64),
) -> Result<Duration, ConfigError> {
    let Some(value_str) = vars.get(name) else {
        return Ok(Duration::from_secs(default));
    };

    let value: u64 = value_str.parse().map_err(|e| {
        ConfigError::InvalidJwksRefresh(format!(
            "{name} must be a valid integer, got '{value_str}': {e}"
        ))
    })?;

    if !(min..=max).contains(&value) {
        return Err(ConfigError::InvalidJwksRefresh(format!(
            "{name} must be between {min} and {max} seconds, got {value}"
        )));
    }

    Ok(Duration::from_secs(value))
}
