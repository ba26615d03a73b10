//! Logging setup.
//!
//! The SDK emits `tracing` events under the `toggletown_features` target.
//! Applications that already install a subscriber need nothing from this
//! module; [`init`] is a convenience for those that don't.
//!
//! # Environment Variables
//!
//! - `TOGGLETOWN_DEBUG=1` - Force debug level
//! - `TOGGLETOWN_LOG_LEVEL=trace|debug|info|warn|error` - Filter directive
//!   (falls back to `RUST_LOG`, then `info`)
//! - `TOGGLETOWN_LOG_FORMAT=json|pretty|compact` - Output format (default `compact`)

use std::env;
use tracing_subscriber::EnvFilter;

/// Output format for log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Pretty,
    Compact,
    Json,
}

impl Format {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "pretty" => Some(Format::Pretty),
            "compact" => Some(Format::Compact),
            "json" => Some(Format::Json),
            _ => None,
        }
    }
}

/// Logging settings resolved from the environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogConfig {
    /// `EnvFilter` directive string.
    pub filter: String,
    pub format: Format,
}

impl LogConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let debug = lookup("TOGGLETOWN_DEBUG")
            .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
            .unwrap_or(false);

        let filter = if debug {
            "debug".to_string()
        } else {
            lookup("TOGGLETOWN_LOG_LEVEL")
                .or_else(|| lookup("RUST_LOG"))
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| "info".to_string())
        };

        let format = lookup("TOGGLETOWN_LOG_FORMAT")
            .and_then(|s| Format::parse(&s))
            .unwrap_or(Format::Compact);

        Self { filter, format }
    }
}

/// Install a global `tracing` subscriber configured from the environment.
///
/// Returns `false` if a global subscriber was already set.
pub fn init() -> bool {
    init_with(LogConfig::from_env())
}

pub fn init_with(config: LogConfig) -> bool {
    let filter = EnvFilter::try_new(&config.filter).unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    let result = match config.format {
        Format::Pretty => builder.pretty().try_init(),
        Format::Compact => builder.compact().try_init(),
        Format::Json => builder.json().try_init(),
    };
    result.is_ok()
}
