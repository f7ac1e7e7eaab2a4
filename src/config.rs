//! Environment-driven client configuration.

use crate::{Error, Result};
use std::time::Duration;

/// Environment variable holding the API base URL.
pub const BASE_URL_ENV: &str = "API_BASE_URL";

/// Environment variable holding the request timeout in whole seconds.
pub const TIMEOUT_ENV: &str = "API_TIMEOUT_SECS";

/// Environment variable holding the route to navigate to after a 401.
pub const LOGIN_ROUTE_ENV: &str = "API_LOGIN_ROUTE";

/// Base URL used when [`BASE_URL_ENV`] is unset.
pub const DEFAULT_BASE_URL: &str = "http://localhost:8000/api/v1";

/// Login route used when [`LOGIN_ROUTE_ENV`] is unset.
pub const DEFAULT_LOGIN_ROUTE: &str = "/auth/login";

/// Settings resolved once at process start.
///
/// # Examples
///
/// ```
/// use apifetch::ClientConfig;
///
/// let config = ClientConfig::from_lookup(|key| match key {
///     "API_BASE_URL" => Some("https://api.example.com/v1".to_string()),
///     _ => None,
/// })
/// .unwrap();
///
/// assert_eq!(config.base_url, "https://api.example.com/v1");
/// assert_eq!(config.login_route, "/auth/login");
/// assert!(config.timeout.is_none());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Prefix for every relative request path.
    pub base_url: String,

    /// Per-request timeout, if any.
    pub timeout: Option<Duration>,

    /// Route the UI is sent to when the session is rejected.
    pub login_route: String,
}

impl ClientConfig {
    /// Reads the configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns an error if [`TIMEOUT_ENV`] is set but is not a whole number of seconds.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads the configuration through an arbitrary key lookup.
    ///
    /// Empty values are treated as unset.
    ///
    /// # Errors
    ///
    /// Returns an error if [`TIMEOUT_ENV`] is set but is not a whole number of seconds.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        let get_or = |key: &str, default: &str| {
            get(key).unwrap_or_else(|| {
                tracing::debug!("{key} not set, using default: {default}");
                default.to_string()
            })
        };

        let timeout = match get(TIMEOUT_ENV) {
            Some(raw) => {
                let secs = raw.trim().parse::<u64>().map_err(|e| {
                    Error::ConfigurationError(format!("Invalid {}={:?}: {}", TIMEOUT_ENV, raw, e))
                })?;
                Some(Duration::from_secs(secs))
            }
            None => None,
        };

        Ok(Self {
            base_url: get_or(BASE_URL_ENV, DEFAULT_BASE_URL),
            timeout,
            login_route: get_or(LOGIN_ROUTE_ENV, DEFAULT_LOGIN_ROUTE),
        })
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: None,
            login_route: DEFAULT_LOGIN_ROUTE.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_unset() {
        let config = ClientConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, ClientConfig::default());
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
    }

    #[test]
    fn test_reads_all_settings() {
        let config = ClientConfig::from_lookup(lookup(&[
            (BASE_URL_ENV, "https://api.example.com/v2"),
            (TIMEOUT_ENV, " 15 "),
            (LOGIN_ROUTE_ENV, "/signin"),
        ]))
        .unwrap();

        assert_eq!(config.base_url, "https://api.example.com/v2");
        assert_eq!(config.timeout, Some(Duration::from_secs(15)));
        assert_eq!(config.login_route, "/signin");
    }

    #[test]
    fn test_empty_values_are_unset() {
        let config =
            ClientConfig::from_lookup(lookup(&[(BASE_URL_ENV, ""), (TIMEOUT_ENV, "  ")])).unwrap();
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert!(config.timeout.is_none());
    }

    #[test]
    fn test_invalid_timeout_is_rejected() {
        let result = ClientConfig::from_lookup(lookup(&[(TIMEOUT_ENV, "soon")]));
        assert!(matches!(result, Err(Error::ConfigurationError(msg)) if msg.contains(TIMEOUT_ENV)));
    }
}
