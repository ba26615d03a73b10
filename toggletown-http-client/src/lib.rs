//! # ToggleTown HTTP Client
//!
//! The transport the ToggleTown SDK uses to download flag catalogs. It is a
//! small wrapper over `reqwest` with a configurable timeout, default headers,
//! and a buffered [`Response`] that decodes JSON bodies.
//!
//! Requests are sent exactly once. A failed request is reported to the caller
//! and never retried here; the SDK's poller simply waits for its next tick.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use toggletown_http_client::{HttpClient, HttpClientConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = HttpClient::new(HttpClientConfig::default())?;
//!
//!     let response = client
//!         .get("https://api.toggletown.com/api/v1/sdk/flags")
//!         .header("X-API-Key", "tt_live_example")
//!         .send()
//!         .await?
//!         .error_for_status()?;
//!
//!     println!("Status: {}", response.status());
//!     Ok(())
//! }
//! ```

mod client;
mod config;
mod error;
mod request;
mod response;

pub use client::HttpClient;
pub use config::{HttpClientConfig, HttpClientConfigBuilder};
pub use error::{HttpClientError, Result};
pub use request::RequestBuilder;
pub use response::Response;

// Re-export common types
pub use bytes::Bytes;
pub use http::{HeaderMap, HeaderValue, Method, StatusCode, header};
pub use url::Url;

/// Prelude for common imports.
///
/// ```
/// use toggletown_http_client::prelude::*;
/// ```
pub mod prelude {
    pub use crate::client::HttpClient;
    pub use crate::config::{HttpClientConfig, HttpClientConfigBuilder};
    pub use crate::error::{HttpClientError, Result};
    pub use crate::request::RequestBuilder;
    pub use crate::response::Response;
    pub use http::{HeaderMap, HeaderValue, Method, StatusCode, header};
}
