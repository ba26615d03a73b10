//! ToggleTown feature flags for Rust
//!
//! Client-side flag evaluation: the catalog is downloaded once, refreshed in
//! the background, and every lookup is resolved locally against it.
//!
//! # Features
//!
//! - 🎯 **Targeting Rules** - Attribute-based overrides with per-rule rollouts
//! - 🎲 **Deterministic Rollout** - Stable SHA-256 user bucketing
//! - 🔄 **Background Refresh** - Polling with last-known-good fallback
//! - ⏰ **Staleness Alarms** - One notification per stale episode
//!
//! # Quick Start
//!
//! ```no_run
//! use toggletown_features::*;
//!
//! # async fn run() -> toggletown_features::Result<()> {
//! let client = ToggleTownClient::new("tt_live_your_api_key", ClientConfig::default())?;
//! client.initialize().await?;
//!
//! let context = EvaluationContext::new().with_user_id("user-123");
//! if client.get_boolean("new-ui", false, &context) {
//!     // Show new UI
//! }
//!
//! client.close().await;
//! # Ok(())
//! # }
//! ```
//!
//! # Local Evaluation
//!
//! ```
//! use toggletown_features::*;
//!
//! let flag = FlagConfig::string("banner", "standard")
//!     .with_rule(Rule::new("email", Operator::Contains, "@company.com").with_roll_value("internal"));
//!
//! let staff = EvaluationContext::new().with_attribute("email", "ana@company.com");
//! assert_eq!(flag.evaluate(&staff), Value::from("internal"));
//!
//! let guest = EvaluationContext::new().with_attribute("email", "guest@example.com");
//! assert_eq!(flag.evaluate(&guest), Value::from("standard"));
//! ```
//!
//! # Configuration
//!
//! ```
//! use std::time::Duration;
//! use toggletown_features::ClientConfig;
//!
//! let config = ClientConfig::builder()
//!     .base_url("https://flags.example.com")
//!     .poll_interval(Duration::from_secs(15))
//!     .max_stale_age(Duration::from_secs(120))
//!     .on_stale(|last_updated_at, age| {
//!         eprintln!("flags stale since {last_updated_at} ({age:?})");
//!     })
//!     .build();
//! ```

pub mod cache;
pub mod client;
pub mod config;
pub mod context;
pub mod error;
pub mod fetcher;
pub mod flag;
pub mod logging;
pub mod poller;
pub mod rollout;
pub mod rule;
pub mod value;

pub use cache::{CacheState, CacheStatus, FlagCache, StaleAlarm};
pub use client::ToggleTownClient;
pub use config::{
    ClientConfig, ClientConfigBuilder, DEFAULT_API_URL, DEFAULT_MAX_STALE_AGE,
    DEFAULT_POLL_INTERVAL, ErrorCallback, StaleCallback,
};
pub use context::EvaluationContext;
pub use error::{FeatureError, FetchError, Result};
pub use fetcher::{FlagFetcher, FlagsResponse, HttpFetcher};
pub use flag::{FlagCatalog, FlagConfig, FlagType};
pub use poller::{PollCallbacks, Poller};
pub use rollout::{bucket, in_rollout, user_bucket};
pub use rule::{Operator, Rule};
pub use value::Value;

/// Prelude for common imports.
///
/// ```
/// use toggletown_features::prelude::*;
/// ```
pub mod prelude {
    pub use crate::client::ToggleTownClient;
    pub use crate::config::ClientConfig;
    pub use crate::context::EvaluationContext;
    pub use crate::error::{FeatureError, Result};
    pub use crate::flag::{FlagConfig, FlagType};
    pub use crate::rule::{Operator, Rule};
    pub use crate::value::Value;
}
