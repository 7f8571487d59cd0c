//! Configuration types for the SearchClient.

use std::env;
use std::time::Duration;

use tracing::warn;
use url::Url;

use crate::errors::SearchIndexError;

/// Default environment prefix for physical index names.
pub const DEFAULT_INDEX_PREFIX: &str = "dev";

/// Default number of connection attempts.
pub const DEFAULT_MAX_RETRIES: u32 = 5;

/// Default transport request timeout in seconds.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 60;

/// Default pause between connection attempts in seconds.
pub const DEFAULT_RETRY_INTERVAL_SECS: u64 = 2;

/// Default number of documents per bulk request.
pub const DEFAULT_BULK_BATCH_SIZE: usize = 500;

/// Basic-auth credentials for the search engine.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

/// Configuration for the SearchClient.
///
/// Host and port are optional here so that a process can start and build its
/// client before the engine is configured; the client reports their absence as
/// a `ConfigurationError` when it first tries to connect.
#[derive(Debug, Clone)]
pub struct SearchClientConfig {
    /// Search engine host name.
    pub host: Option<String>,
    /// Search engine port.
    pub port: Option<u16>,
    /// URL scheme, `http` or `https`.
    pub scheme: String,
    /// Optional basic-auth credentials.
    pub credentials: Option<Credentials>,
    /// Environment prefix for physical index names (`{prefix}_{name}`).
    pub index_prefix: String,
    /// Number of connection attempts before giving up.
    pub max_retries: u32,
    /// Timeout applied to every request on the transport.
    pub request_timeout: Duration,
    /// Pause between connection attempts.
    pub retry_interval: Duration,
    /// Maximum number of documents sent in a single bulk request.
    pub bulk_batch_size: usize,
}

impl Default for SearchClientConfig {
    fn default() -> Self {
        Self {
            host: None,
            port: None,
            scheme: "http".to_string(),
            credentials: None,
            index_prefix: DEFAULT_INDEX_PREFIX.to_string(),
            max_retries: DEFAULT_MAX_RETRIES,
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            retry_interval: Duration::from_secs(DEFAULT_RETRY_INTERVAL_SECS),
            bulk_batch_size: DEFAULT_BULK_BATCH_SIZE,
        }
    }
}

impl SearchClientConfig {
    /// Create a config pointing at the given host and port with default tuning.
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: Some(host.into()),
            port: Some(port),
            ..Default::default()
        }
    }

    /// Read the configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `OPENSEARCH_HOST`: Search engine host (required to connect)
    /// - `OPENSEARCH_PORT`: Search engine port (required to connect)
    /// - `OPENSEARCH_SCHEME`: `http` or `https` (default: http)
    /// - `OPENSEARCH_USER` / `OPENSEARCH_PASSWORD`: Basic auth, both or neither
    /// - `INDEX_PREFIX`: Environment prefix for index names (default: dev)
    /// - `OPENSEARCH_MAX_RETRIES`: Connection attempts (default: 5)
    /// - `OPENSEARCH_REQUEST_TIMEOUT_SECS`: Request timeout (default: 60)
    /// - `OPENSEARCH_RETRY_INTERVAL_SECS`: Pause between attempts (default: 2)
    /// - `BULK_BATCH_SIZE`: Documents per bulk request (default: 500)
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup.
    ///
    /// Unparseable numeric values fall back to their defaults with a warning.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let port = non_empty("OPENSEARCH_PORT").and_then(|v| match v.trim().parse::<u16>() {
            Ok(port) => Some(port),
            Err(_) => {
                warn!(value = %v, "Invalid OPENSEARCH_PORT, ignoring");
                None
            }
        });

        let credentials = match (non_empty("OPENSEARCH_USER"), non_empty("OPENSEARCH_PASSWORD")) {
            (Some(username), Some(password)) => Some(Credentials { username, password }),
            (None, None) => None,
            _ => {
                warn!("Only one of OPENSEARCH_USER / OPENSEARCH_PASSWORD is set, connecting without authentication");
                None
            }
        };

        Self {
            host: non_empty("OPENSEARCH_HOST").map(|h| h.trim().to_string()),
            port,
            scheme: non_empty("OPENSEARCH_SCHEME")
                .map(|s| s.trim().to_lowercase())
                .unwrap_or(defaults.scheme),
            credentials,
            index_prefix: non_empty("INDEX_PREFIX").unwrap_or(defaults.index_prefix),
            max_retries: parse_or("OPENSEARCH_MAX_RETRIES", &non_empty, defaults.max_retries),
            request_timeout: Duration::from_secs(parse_or(
                "OPENSEARCH_REQUEST_TIMEOUT_SECS",
                &non_empty,
                DEFAULT_REQUEST_TIMEOUT_SECS,
            )),
            retry_interval: Duration::from_secs(parse_or(
                "OPENSEARCH_RETRY_INTERVAL_SECS",
                &non_empty,
                DEFAULT_RETRY_INTERVAL_SECS,
            )),
            bulk_batch_size: parse_or("BULK_BATCH_SIZE", &non_empty, defaults.bulk_batch_size)
                .max(1),
        }
    }

    /// Set basic-auth credentials.
    pub fn with_credentials(
        mut self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.credentials = Some(Credentials {
            username: username.into(),
            password: password.into(),
        });
        self
    }

    /// Set the environment prefix for index names.
    pub fn with_index_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.index_prefix = prefix.into();
        self
    }

    /// Set the connection retry budget.
    pub fn with_retry(mut self, max_retries: u32, retry_interval: Duration) -> Self {
        self.max_retries = max_retries;
        self.retry_interval = retry_interval;
        self
    }

    /// Set the number of documents per bulk request.
    pub fn with_bulk_batch_size(mut self, bulk_batch_size: usize) -> Self {
        self.bulk_batch_size = bulk_batch_size.max(1);
        self
    }

    /// Build the engine endpoint URL.
    ///
    /// # Returns
    ///
    /// * `Ok(Url)` - e.g. `http://localhost:9200/`
    /// * `Err(SearchIndexError::ConfigurationError)` - If host or port is missing or invalid
    pub fn endpoint(&self) -> Result<Url, SearchIndexError> {
        let host = self
            .host
            .as_deref()
            .ok_or_else(|| SearchIndexError::configuration("search engine host is not configured"))?;
        let port = self
            .port
            .ok_or_else(|| SearchIndexError::configuration("search engine port is not configured"))?;

        Url::parse(&format!("{}://{}:{}", self.scheme, host, port)).map_err(|e| {
            SearchIndexError::configuration(format!("invalid search engine address: {}", e))
        })
    }
}

fn parse_or<T, F>(key: &str, lookup: &F, default: T) -> T
where
    T: std::str::FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) => raw.trim().parse::<T>().unwrap_or_else(|_| {
            warn!(key = %key, value = %raw, "Invalid numeric setting, using default");
            default
        }),
        None => default,
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
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_without_environment() {
        let config = SearchClientConfig::from_lookup(lookup(&[]));

        assert!(config.host.is_none());
        assert!(config.port.is_none());
        assert_eq!(config.index_prefix, "dev");
        assert_eq!(config.max_retries, 5);
        assert_eq!(config.request_timeout, Duration::from_secs(60));
        assert_eq!(config.bulk_batch_size, 500);
        assert!(config.credentials.is_none());
    }

    #[test]
    fn test_full_environment() {
        let config = SearchClientConfig::from_lookup(lookup(&[
            ("OPENSEARCH_HOST", "search.internal"),
            ("OPENSEARCH_PORT", "9201"),
            ("OPENSEARCH_USER", "elastic"),
            ("OPENSEARCH_PASSWORD", "secret"),
            ("INDEX_PREFIX", "prod"),
            ("OPENSEARCH_MAX_RETRIES", "3"),
            ("OPENSEARCH_REQUEST_TIMEOUT_SECS", "10"),
            ("BULK_BATCH_SIZE", "100"),
        ]));

        assert_eq!(config.host.as_deref(), Some("search.internal"));
        assert_eq!(config.port, Some(9201));
        assert_eq!(config.index_prefix, "prod");
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.request_timeout, Duration::from_secs(10));
        assert_eq!(config.bulk_batch_size, 100);
        assert_eq!(config.credentials.unwrap().username, "elastic");
    }

    #[test]
    fn test_partial_credentials_are_ignored() {
        let config = SearchClientConfig::from_lookup(lookup(&[("OPENSEARCH_USER", "elastic")]));
        assert!(config.credentials.is_none());
    }

    #[test]
    fn test_invalid_numbers_fall_back_to_defaults() {
        let config = SearchClientConfig::from_lookup(lookup(&[
            ("OPENSEARCH_PORT", "not-a-port"),
            ("OPENSEARCH_MAX_RETRIES", "many"),
        ]));
        assert!(config.port.is_none());
        assert_eq!(config.max_retries, DEFAULT_MAX_RETRIES);
    }

    #[test]
    fn test_endpoint() {
        let url = SearchClientConfig::new("localhost", 9200).endpoint().unwrap();
        assert_eq!(url.as_str(), "http://localhost:9200/");
    }

    #[test]
    fn test_endpoint_requires_host_and_port() {
        let missing_host = SearchClientConfig {
            port: Some(9200),
            ..Default::default()
        };
        assert!(matches!(
            missing_host.endpoint(),
            Err(SearchIndexError::ConfigurationError(_))
        ));

        let missing_port = SearchClientConfig {
            host: Some("localhost".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            missing_port.endpoint(),
            Err(SearchIndexError::ConfigurationError(_))
        ));
    }

    #[test]
    fn test_credentials_debug_hides_password() {
        let config = SearchClientConfig::new("localhost", 9200).with_credentials("elastic", "s3cr3t");
        let debug = format!("{:?}", config);
        assert!(!debug.contains("s3cr3t"));
    }
}
