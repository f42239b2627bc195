use std::time::Duration;

use url::Url;

use crate::error::ConfigError;

#[derive(Clone, Debug)]
pub struct Config {
    /// Scheme and authority of the scoring backend.
    pub api_base: String,
    /// Path prefix shared by every endpoint.
    pub api_prefix: String,
    /// Per-request timeout applied by the HTTP client.
    pub request_timeout_ms: u64,
    /// Capacity of the channel carrying backend responses to the controller.
    pub event_channel_capacity: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base: "http://localhost:8000".to_string(),
            api_prefix: "/api".to_string(),
            request_timeout_ms: 30_000,
            event_channel_capacity: 64,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            api_base: std::env::var("API_BASE").unwrap_or(defaults.api_base),
            api_prefix: std::env::var("API_PREFIX").unwrap_or(defaults.api_prefix),
            request_timeout_ms: std::env::var("REQUEST_TIMEOUT_MS").ok().and_then(|v| v.parse().ok()).unwrap_or(defaults.request_timeout_ms),
            event_channel_capacity: std::env::var("EVENT_CHANNEL_CAP").ok().and_then(|v| v.parse().ok()).unwrap_or(defaults.event_channel_capacity),
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// Base url plus prefix, always ending in `/` so endpoint paths join
    /// underneath it.
    pub fn api_root(&self) -> Result<Url, ConfigError> {
        let mut root = Url::parse(self.api_base.trim()).map_err(|source| ConfigError::InvalidBaseUrl {
            value: self.api_base.clone(),
            source,
        })?;
        if root.cannot_be_a_base() {
            return Err(ConfigError::NotABase(self.api_base.clone()));
        }

        let mut path = root.path().trim_end_matches('/').to_string();
        let prefix = self.api_prefix.trim_matches('/');
        if !prefix.is_empty() {
            path.push('/');
            path.push_str(prefix);
        }
        path.push('/');
        root.set_path(&path);
        Ok(root)
    }
}
