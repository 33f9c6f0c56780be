//! Client-wide settings and their environment variables.

use std::time::Duration;

use crate::errors::ConfigError;

pub const BASE_URL_VAR: &str = "APP_REST_BASE_URL";
pub const DEBUG_VAR: &str = "APP_REST_DEBUG";
pub const TIMEOUT_VAR: &str = "APP_REST_TIMEOUT_SECS";
pub const USER_AGENT_VAR: &str = "APP_REST_USER_AGENT";

pub const DEFAULT_USER_AGENT: &str = concat!("app_rest_client/", env!("CARGO_PKG_VERSION"));

/// Settings shared by every request a [`crate::RestClient`] makes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClientConfig {
    pub base_url: String,
    /// Send wire traces to the log for every request.
    pub debug: bool,
    /// Default per-request timeout. `None` leaves it to the transport.
    pub timeout: Option<Duration>,
    pub user_agent: String,
}

impl ClientConfig {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.to_string(),
            debug: false,
            timeout: None,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }

    /// Reads settings from `APP_REST_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(env_var)
    }

    /// Fills debug, timeout and user agent from the environment, keeping
    /// the base URL already set.
    pub fn with_env(self) -> Result<Self, ConfigError> {
        self.apply_lookup(env_var)
    }

    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let base_url = lookup(BASE_URL_VAR)
            .filter(|v| !v.trim().is_empty())
            .ok_or(ConfigError::MissingBaseUrl(BASE_URL_VAR))?;
        Self::new(base_url.trim()).apply_lookup(&lookup)
    }

    fn apply_lookup(mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        self.debug = lookup(DEBUG_VAR).is_some_and(|v| parse_flag(&v));
        if let Some(secs) = lookup(TIMEOUT_VAR) {
            let secs = secs
                .trim()
                .parse::<u64>()
                .map_err(|_| ConfigError::InvalidTimeout(secs.clone()))?;
            self.timeout = Some(Duration::from_secs(secs));
        }
        if let Some(user_agent) = lookup(USER_AGENT_VAR).filter(|v| !v.is_empty()) {
            self.user_agent = user_agent;
        }
        Ok(self)
    }
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok()
}

/// Truthy values for boolean environment variables.
pub fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}
