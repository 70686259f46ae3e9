//! Sieve client configuration.

use std::time::Duration;

use crate::backend::SieveCredentials;

/// Default API host.
pub const DEFAULT_BASE_URL: &str = "https://mango.sievedata.com";

/// Configuration for the Sieve HTTP client.
#[derive(Debug, Clone)]
pub struct SieveConfig {
    /// Base URL of the API (no trailing slash)
    pub base_url: String,
    /// API key, when provided by the environment
    pub api_key: Option<String>,
    /// Request timeout
    pub timeout: Duration,
    /// Backend function that downloads and trims the source video
    pub downloader_function: String,
}

impl Default for SieveConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: None,
            timeout: Duration::from_secs(30),
            downloader_function: "sieve/youtube-downloader".to_string(),
        }
    }
}

impl SieveConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            base_url: std::env::var("SIEVE_BASE_URL")
                .map(|s| s.trim_end_matches('/').to_string())
                .unwrap_or(defaults.base_url),
            api_key: std::env::var("SIEVE_API_KEY")
                .ok()
                .filter(|s| !s.trim().is_empty()),
            timeout: Duration::from_secs(
                std::env::var("SIEVE_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(30),
            ),
            downloader_function: std::env::var("SIEVE_DOWNLOADER_FUNCTION")
                .unwrap_or(defaults.downloader_function),
        }
    }

    /// Point the client at another host (used by tests).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Credentials from the configured key (empty when unset).
    pub fn credentials(&self) -> SieveCredentials {
        SieveCredentials::new(self.api_key.clone().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = SieveConfig::default();
        assert_eq!(config.base_url, "https://mango.sievedata.com");
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert!(config.credentials().is_empty());
    }

    #[test]
    fn test_with_base_url_strips_trailing_slash() {
        let config = SieveConfig::default()
            .with_base_url("http://127.0.0.1:9000/")
            .with_api_key("k");
        assert_eq!(config.base_url, "http://127.0.0.1:9000");
        assert_eq!(config.credentials().api_key(), "k");
    }
}
