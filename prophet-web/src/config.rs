//! Client configuration
//!
//! Where the backend lives and how long to wait for it. Read from the
//! environment (a `.env` file is loaded by the binary before this runs).

use std::time::Duration;

use prophet_web_sdk::{ClientError, Result};

pub const DEFAULT_API_BASE: &str = "http://localhost:8000";
pub const API_URL_VAR: &str = "PROPHET_API_URL";
pub const REQUEST_TIMEOUT_VAR: &str = "PROPHET_REQUEST_TIMEOUT_SECS";

/// Configuration for talking to the forecasting backend
///
/// # Examples
///
/// ```
/// use prophet_web::config::ClientConfig;
///
/// let config = ClientConfig::default().with_api_base("https://forecast.example.com/");
/// assert_eq!(config.endpoint("/api/plan"), "https://forecast.example.com/api/plan");
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    /// Base URL of the backend, without trailing slash
    pub api_base: String,
    /// Timeout for the plan and run requests (not the event stream)
    pub request_timeout: Duration,
    /// Timeout for establishing any connection, including the event stream
    pub connect_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            request_timeout: Duration::from_secs(120),
            connect_timeout: Duration::from_secs(10),
        }
    }
}

impl ClientConfig {
    /// Build from the process environment
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(base) = lookup(API_URL_VAR).filter(|v| !v.trim().is_empty()) {
            config = config.with_api_base(base.trim());
        }
        if let Some(raw) = lookup(REQUEST_TIMEOUT_VAR) {
            let secs: u64 = raw.trim().parse().map_err(|_| {
                ClientError::InvalidConfig(format!(
                    "{} must be a whole number of seconds, got '{}'",
                    REQUEST_TIMEOUT_VAR, raw
                ))
            })?;
            config.request_timeout = Duration::from_secs(secs);
        }

        config.validate()?;
        Ok(config)
    }

    /// Replace the base URL, stripping trailing slashes
    pub fn with_api_base(mut self, base: impl Into<String>) -> Self {
        self.api_base = base.into().trim_end_matches('/').to_string();
        self
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.api_base.starts_with("http://") || self.api_base.starts_with("https://")) {
            return Err(ClientError::InvalidConfig(format!(
                "API base must be an http(s) URL, got '{}'",
                self.api_base
            )));
        }
        if self.request_timeout.is_zero() {
            return Err(ClientError::InvalidConfig(
                "request timeout must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Full URL of an API path
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.api_base, path.trim_start_matches('/'))
    }
}
