//! Client configuration.

use crate::error::{FeatureError, Result};
use crate::fetcher::FlagFetcher;
use chrono::{DateTime, Utc};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use toggletown_http_client::HttpClientConfig;

/// Production API endpoint.
pub const DEFAULT_API_URL: &str = "https://api.toggletown.com";

/// Default time between background refreshes.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(30);

/// Default age after which the cached catalog counts as stale.
pub const DEFAULT_MAX_STALE_AGE: Duration = Duration::from_secs(5 * 60);

/// Environment variable names read by [`ClientConfig::from_env`].
pub mod env_vars {
    pub const API_KEY: &str = "TOGGLETOWN_API_KEY";
    pub const API_URL: &str = "TOGGLETOWN_API_URL";
    pub const POLL_INTERVAL_SECS: &str = "TOGGLETOWN_POLL_INTERVAL_SECS";
    pub const MAX_STALE_SECS: &str = "TOGGLETOWN_MAX_STALE_SECS";
}

/// Invoked with the error of every failed background refresh.
pub type ErrorCallback = Arc<dyn Fn(&FeatureError) + Send + Sync>;

/// Invoked once per stale episode with the last successful refresh time and
/// the catalog's age.
pub type StaleCallback = Arc<dyn Fn(DateTime<Utc>, Duration) + Send + Sync>;

/// Client configuration.
#[derive(Clone)]
pub struct ClientConfig {
    /// Base URL of the ToggleTown API.
    pub base_url: String,
    /// Time between background refreshes.
    pub poll_interval: Duration,
    /// Age after which the cached catalog is reported stale.
    pub max_stale_age: Duration,
    pub on_error: Option<ErrorCallback>,
    pub on_stale: Option<StaleCallback>,
    /// Transport settings for the default HTTP fetcher.
    pub http: HttpClientConfig,
    /// Custom catalog source; replaces the HTTP fetcher when set.
    pub fetcher: Option<Arc<dyn FlagFetcher>>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_URL.to_string(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            max_stale_age: DEFAULT_MAX_STALE_AGE,
            on_error: None,
            on_stale: None,
            http: HttpClientConfig::default(),
            fetcher: None,
        }
    }
}

impl ClientConfig {
    /// Create a new configuration builder.
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder::default()
    }

    /// Load configuration from the environment, reading `.env` if present.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut builder = Self::builder();

        if let Some(url) = lookup(env_vars::API_URL) {
            builder = builder.base_url(url);
        }
        if let Some(secs) = lookup(env_vars::POLL_INTERVAL_SECS) {
            builder = builder.poll_interval(parse_secs(env_vars::POLL_INTERVAL_SECS, &secs)?);
        }
        if let Some(secs) = lookup(env_vars::MAX_STALE_SECS) {
            builder = builder.max_stale_age(parse_secs(env_vars::MAX_STALE_SECS, &secs)?);
        }

        Ok(builder.build())
    }
}

fn parse_secs(name: &str, raw: &str) -> Result<Duration> {
    raw.trim()
        .parse::<u64>()
        .map(Duration::from_secs)
        .map_err(|_| FeatureError::Config(format!("{name} must be a whole number of seconds, got {raw:?}")))
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("base_url", &self.base_url)
            .field("poll_interval", &self.poll_interval)
            .field("max_stale_age", &self.max_stale_age)
            .field("on_error", &self.on_error.is_some())
            .field("on_stale", &self.on_stale.is_some())
            .field("http", &self.http)
            .field("fetcher", &self.fetcher.as_ref().map(|_| "custom"))
            .finish()
    }
}

/// Builder for client configuration.
#[derive(Debug, Default)]
pub struct ClientConfigBuilder {
    config: ClientConfig,
}

impl ClientConfigBuilder {
    /// Set the API base URL. Empty strings are ignored.
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        let url = url.into();
        if !url.is_empty() {
            self.config.base_url = url;
        }
        self
    }

    /// Set the refresh interval. A zero interval keeps the default.
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        if !interval.is_zero() {
            self.config.poll_interval = interval;
        }
        self
    }

    pub fn max_stale_age(mut self, age: Duration) -> Self {
        self.config.max_stale_age = age;
        self
    }

    pub fn on_error<F>(mut self, callback: F) -> Self
    where
        F: Fn(&FeatureError) + Send + Sync + 'static,
    {
        self.config.on_error = Some(Arc::new(callback));
        self
    }

    pub fn on_stale<F>(mut self, callback: F) -> Self
    where
        F: Fn(DateTime<Utc>, Duration) + Send + Sync + 'static,
    {
        self.config.on_stale = Some(Arc::new(callback));
        self
    }

    /// Set transport options for the default HTTP fetcher.
    pub fn http(mut self, http: HttpClientConfig) -> Self {
        self.config.http = http;
        self
    }

    /// Shortcut for the HTTP request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.http.timeout = timeout;
        self
    }

    /// Use a custom catalog source instead of HTTP.
    pub fn fetcher(mut self, fetcher: Arc<dyn FlagFetcher>) -> Self {
        self.config.fetcher = Some(fetcher);
        self
    }

    /// Build the configuration.
    pub fn build(self) -> ClientConfig {
        self.config
    }
}
