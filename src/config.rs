//! Configuration Module
//!
//! Loads cache and fetcher options from environment variables.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use crate::cache::CacheConfig;
use crate::fetch::RetryConfig;

/// Runtime configuration.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Byte budget for cached payloads
    pub max_storage_size: u64,
    /// Retries after the first attempt
    pub max_retries: u32,
    /// Backoff before the first retry, in milliseconds
    pub base_delay_ms: u64,
    /// Upper bound for any single backoff, in milliseconds
    pub max_delay_ms: u64,
    /// Prefix prepended to every request endpoint
    pub api_base_url: String,
    /// Directory holding the file-backed cache
    pub cache_dir: PathBuf,
    /// Per-request timeout applied by the HTTP client
    pub request_timeout_secs: u64,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `CACHE_MAX_STORAGE_SIZE` - Byte budget (default: 5 MiB)
    /// - `FETCH_MAX_RETRIES` - Retry count (default: 3)
    /// - `FETCH_BASE_DELAY_MS` - Initial backoff (default: 1000)
    /// - `FETCH_MAX_DELAY_MS` - Backoff ceiling (default: 10000)
    /// - `API_BASE_URL` - Endpoint prefix (default: http://127.0.0.1:3000/api)
    /// - `CACHE_DIR` - Cache directory (default: .cache)
    /// - `REQUEST_TIMEOUT_SECS` - HTTP client timeout (default: 30)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            max_storage_size: parse_var("CACHE_MAX_STORAGE_SIZE")
                .unwrap_or(defaults.max_storage_size),
            max_retries: parse_var("FETCH_MAX_RETRIES").unwrap_or(defaults.max_retries),
            base_delay_ms: parse_var("FETCH_BASE_DELAY_MS").unwrap_or(defaults.base_delay_ms),
            max_delay_ms: parse_var("FETCH_MAX_DELAY_MS").unwrap_or(defaults.max_delay_ms),
            api_base_url: env::var("API_BASE_URL").unwrap_or(defaults.api_base_url),
            cache_dir: env::var("CACHE_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.cache_dir),
            request_timeout_secs: parse_var("REQUEST_TIMEOUT_SECS")
                .unwrap_or(defaults.request_timeout_secs),
        }
    }

    /// Options for the bounded cache.
    pub fn cache(&self) -> CacheConfig {
        CacheConfig {
            max_storage_size: self.max_storage_size,
            ..CacheConfig::default()
        }
    }

    /// Options for the retry schedule.
    pub fn retry(&self) -> RetryConfig {
        RetryConfig {
            max_retries: self.max_retries,
            base_delay_ms: self.base_delay_ms,
            max_delay_ms: self.max_delay_ms,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_storage_size: 5 * 1024 * 1024,
            max_retries: 3,
            base_delay_ms: 1000,
            max_delay_ms: 10_000,
            api_base_url: "http://127.0.0.1:3000/api".to_string(),
            cache_dir: PathBuf::from(".cache"),
            request_timeout_secs: 30,
        }
    }
}

fn parse_var<T: FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.max_storage_size, 5_242_880);
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.base_delay_ms, 1000);
        assert_eq!(config.max_delay_ms, 10_000);
        assert_eq!(config.request_timeout_secs, 30);
    }

    #[test]
    fn test_config_from_env_defaults() {
        // Clear any existing env vars to test defaults
        env::remove_var("CACHE_MAX_STORAGE_SIZE");
        env::remove_var("FETCH_MAX_RETRIES");
        env::remove_var("FETCH_BASE_DELAY_MS");
        env::remove_var("FETCH_MAX_DELAY_MS");

        let config = Config::from_env();
        assert_eq!(config.max_storage_size, 5_242_880);
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.base_delay_ms, 1000);
        assert_eq!(config.max_delay_ms, 10_000);
    }

    #[test]
    fn test_config_component_views() {
        let config = Config {
            max_storage_size: 1024,
            max_retries: 5,
            base_delay_ms: 10,
            max_delay_ms: 80,
            ..Config::default()
        };

        assert_eq!(config.cache().max_storage_size, 1024);
        let retry = config.retry();
        assert_eq!(retry.max_retries, 5);
        assert_eq!(retry.base_delay_ms, 10);
        assert_eq!(retry.max_delay_ms, 80);
    }
}
