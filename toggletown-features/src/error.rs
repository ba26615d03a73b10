//! Error types for flag fetching and client lifecycle.
//!
//! Evaluation itself has no error type: lookups that cannot be satisfied fall
//! back to the caller's default.

use thiserror::Error;
use toggletown_http_client::HttpClientError;

/// Result type for client operations.
pub type Result<T> = std::result::Result<T, FeatureError>;

/// Failure to download or decode a flag catalog.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The request never produced a response.
    #[error("failed to fetch flags: {0}")]
    Transport(String),

    /// The service answered with a non-2xx status.
    #[error("API returned status {status}: {body}")]
    Status { status: u16, body: String },

    /// The response body was not a valid flag catalog.
    #[error("failed to decode flags response: {0}")]
    Decode(String),
}

impl From<HttpClientError> for FetchError {
    fn from(err: HttpClientError) -> Self {
        match err {
            HttpClientError::Response { status, message } => Self::Status {
                status,
                body: message,
            },
            HttpClientError::Json(message) => Self::Decode(message),
            other => Self::Transport(other.to_string()),
        }
    }
}

/// SDK client errors.
#[derive(Debug, Error)]
pub enum FeatureError {
    /// The mandatory first fetch failed; the client stays uninitialized.
    #[error("initialization failed: {0}")]
    Initialization(#[source] FetchError),

    /// A background refresh failed; the previous catalog is still served.
    #[error("flag refresh failed: {0}")]
    Refresh(#[source] FetchError),

    /// Invalid client configuration.
    #[error("configuration error: {0}")]
    Config(String),
}

impl FeatureError {
    /// The underlying fetch failure, if any.
    pub fn fetch_error(&self) -> Option<&FetchError> {
        match self {
            Self::Initialization(e) | Self::Refresh(e) => Some(e),
            Self::Config(_) => None,
        }
    }
}
