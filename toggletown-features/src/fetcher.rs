//! Flag catalog retrieval.

use crate::error::FetchError;
use crate::flag::FlagCatalog;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use toggletown_http_client::HttpClient;

/// Path of the SDK catalog endpoint, relative to the API base URL.
pub const FLAGS_PATH: &str = "/api/v1/sdk/flags";

/// Header carrying the SDK key.
pub const API_KEY_HEADER: &str = "X-API-Key";

/// Body returned by the catalog endpoint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FlagsResponse {
    pub flags: FlagCatalog,
}

/// Source of flag catalogs.
///
/// The client calls this once during initialization and then on every poll.
/// Implementations perform a single attempt; the poller owns the schedule.
#[async_trait]
pub trait FlagFetcher: Send + Sync {
    async fn fetch(&self) -> Result<FlagCatalog, FetchError>;
}

/// Fetches the catalog from the ToggleTown API over HTTP.
#[derive(Clone)]
pub struct HttpFetcher {
    client: HttpClient,
    url: String,
    api_key: String,
}

impl HttpFetcher {
    pub fn new(client: HttpClient, base_url: &str, api_key: impl Into<String>) -> Self {
        Self {
            client,
            url: format!("{}{}", base_url.trim_end_matches('/'), FLAGS_PATH),
            api_key: api_key.into(),
        }
    }

    /// Full catalog URL.
    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl FlagFetcher for HttpFetcher {
    async fn fetch(&self) -> Result<FlagCatalog, FetchError> {
        let response = self
            .client
            .get(&self.url)
            .header(API_KEY_HEADER, &self.api_key)
            .send()
            .await?
            .error_for_status()?;

        let body: FlagsResponse = response.json()?;
        Ok(body.flags)
    }
}

impl std::fmt::Debug for HttpFetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpFetcher")
            .field("url", &self.url)
            .field("api_key", &"<redacted>")
            .finish()
    }
}
