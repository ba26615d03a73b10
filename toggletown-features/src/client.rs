//! The SDK client: initialization, background refresh, and typed flag lookups.

use crate::cache::{CacheStatus, FlagCache};
use crate::config::{ClientConfig, env_vars};
use crate::context::EvaluationContext;
use crate::error::{FeatureError, Result};
use crate::fetcher::{FlagFetcher, HttpFetcher};
use crate::flag::FlagCatalog;
use crate::poller::{PollCallbacks, Poller};
use crate::value::Value;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Mutex;
use toggletown_http_client::HttpClient;
use tracing::{debug, error, info};

/// ToggleTown feature flag client.
///
/// Flags are evaluated locally against the last catalog downloaded; no lookup
/// ever waits on the network. Lookups never fail either: a missing flag or a
/// value of the wrong type yields the caller's default.
///
/// ```no_run
/// use toggletown_features::{ClientConfig, EvaluationContext, ToggleTownClient};
///
/// # async fn run() -> toggletown_features::Result<()> {
/// let client = ToggleTownClient::new("tt_live_your_api_key", ClientConfig::default())?;
/// client.initialize().await?;
///
/// let context = EvaluationContext::new()
///     .with_user_id("user-123")
///     .with_attribute("plan", "pro");
/// if client.get_boolean("new-feature", false, &context) {
///     // ...
/// }
///
/// client.close().await;
/// # Ok(())
/// # }
/// ```
pub struct ToggleTownClient {
    fetcher: Arc<dyn FlagFetcher>,
    cache: Arc<FlagCache>,
    config: ClientConfig,
    initialized: AtomicBool,
    // Serializes initialize/close; held only by lifecycle calls, never by lookups.
    poller: Mutex<Option<Poller>>,
}

impl ToggleTownClient {
    /// Create a client that fetches from the ToggleTown API, or from
    /// `config.fetcher` when one is set.
    pub fn new(api_key: impl Into<String>, config: ClientConfig) -> Result<Self> {
        let fetcher = match &config.fetcher {
            Some(fetcher) => fetcher.clone(),
            None => {
                let http = HttpClient::new(config.http.clone())
                    .map_err(|e| FeatureError::Config(e.to_string()))?;
                Arc::new(HttpFetcher::new(http, &config.base_url, api_key)) as Arc<dyn FlagFetcher>
            }
        };
        Ok(Self::with_fetcher(fetcher, config))
    }

    /// Create a client backed by a custom catalog source.
    pub fn with_fetcher(fetcher: Arc<dyn FlagFetcher>, config: ClientConfig) -> Self {
        Self {
            fetcher,
            cache: Arc::new(FlagCache::new(config.max_stale_age)),
            config,
            initialized: AtomicBool::new(false),
            poller: Mutex::new(None),
        }
    }

    /// Create a client from `TOGGLETOWN_*` environment variables.
    pub fn from_env() -> Result<Self> {
        let config = ClientConfig::from_env()?;
        let api_key = std::env::var(env_vars::API_KEY)
            .ok()
            .filter(|k| !k.is_empty())
            .ok_or_else(|| FeatureError::Config(format!("{} is not set", env_vars::API_KEY)))?;
        Self::new(api_key, config)
    }

    /// Load the flag catalog and start background refresh.
    ///
    /// The first fetch must succeed; on failure the error is returned, the
    /// client stays uninitialized and no poller is started. Calling this on
    /// an initialized client is a no-op.
    pub async fn initialize(&self) -> Result<()> {
        let mut poller = self.poller.lock().await;
        if self.is_initialized() {
            return Ok(());
        }

        info!(base_url = %self.config.base_url, "Initializing ToggleTown client");
        let flags = self.fetcher.fetch().await.map_err(|e| {
            error!(error = %e, "Initial flag fetch failed");
            FeatureError::Initialization(e)
        })?;

        let count = flags.len();
        self.cache.replace(flags);
        self.initialized.store(true, Ordering::SeqCst);

        *poller = Some(Poller::start(
            self.fetcher.clone(),
            self.cache.clone(),
            self.config.poll_interval,
            PollCallbacks {
                on_error: self.config.on_error.clone(),
                on_stale: self.config.on_stale.clone(),
            },
        ));

        info!(flags = count, "ToggleTown client initialized");
        Ok(())
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::SeqCst)
    }

    /// Stop background refresh, waiting for any in-flight refresh to finish.
    ///
    /// The last catalog stays available for lookups.
    pub async fn close(&self) {
        let poller = self.poller.lock().await.take();
        if let Some(poller) = poller {
            poller.stop().await;
        }
    }

    /// Whether the background poller is currently running.
    pub async fn is_polling(&self) -> bool {
        self.poller
            .lock()
            .await
            .as_ref()
            .is_some_and(Poller::is_running)
    }

    /// Resolve a flag to its raw value, or `None` if the flag is unknown.
    pub fn get_value(&self, key: &str, context: &EvaluationContext) -> Option<Value> {
        // Clone out under the read lock, evaluate without it.
        let flag = self.cache.get(key)?;
        Some(flag.evaluate(context))
    }

    pub fn get_boolean(&self, key: &str, default: bool, context: &EvaluationContext) -> bool {
        self.typed(key, context, "boolean", |v| v.as_bool())
            .unwrap_or(default)
    }

    pub fn get_string(&self, key: &str, default: &str, context: &EvaluationContext) -> String {
        self.typed(key, context, "string", |v| v.as_str().map(str::to_string))
            .unwrap_or_else(|| default.to_string())
    }

    pub fn get_number(&self, key: &str, default: f64, context: &EvaluationContext) -> f64 {
        self.typed(key, context, "number", |v| v.as_number())
            .unwrap_or(default)
    }

    /// Resolve a JSON flag into `T`.
    ///
    /// A null result or one that does not deserialize into `T` yields
    /// `default`.
    pub fn get_json<T: DeserializeOwned>(
        &self,
        key: &str,
        default: T,
        context: &EvaluationContext,
    ) -> T {
        self.typed(key, context, "json", |v| {
            if v.is_null() {
                return None;
            }
            serde_json::from_value(serde_json::Value::from(v.clone())).ok()
        })
        .unwrap_or(default)
    }

    fn typed<T>(
        &self,
        key: &str,
        context: &EvaluationContext,
        expected: &'static str,
        extract: impl FnOnce(&Value) -> Option<T>,
    ) -> Option<T> {
        let Some(value) = self.get_value(key, context) else {
            debug!(flag = key, "Unknown flag, serving caller default");
            return None;
        };

        let extracted = extract(&value);
        if extracted.is_none() {
            debug!(flag = key, expected, resolved = %value, "Flag type mismatch, serving caller default");
        }
        extracted
    }

    /// Copy of every cached flag definition.
    pub fn all_flags(&self) -> FlagCatalog {
        self.cache.snapshot()
    }

    /// Freshness of the cached catalog.
    pub fn status(&self) -> CacheStatus {
        self.cache.status()
    }

    pub fn is_stale(&self) -> bool {
        self.cache.is_stale()
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }
}

impl std::fmt::Debug for ToggleTownClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToggleTownClient")
            .field("config", &self.config)
            .field("initialized", &self.is_initialized())
            .field("flags", &self.cache.len())
            .finish()
    }
}
