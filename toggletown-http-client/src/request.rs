//! Request builder.

use crate::{HttpClient, HttpClientError, Response, Result};
use http::{HeaderMap, HeaderName, HeaderValue, Method};
use std::time::Duration;

/// HTTP request builder.
pub struct RequestBuilder<'a> {
    client: &'a HttpClient,
    method: Method,
    url: String,
    headers: HeaderMap,
    query: Vec<(String, String)>,
    timeout: Option<Duration>,
}

impl<'a> RequestBuilder<'a> {
    /// Create a new request builder.
    pub(crate) fn new(client: &'a HttpClient, method: Method, url: String) -> Self {
        Self {
            client,
            method,
            url,
            headers: HeaderMap::new(),
            query: Vec::new(),
            timeout: None,
        }
    }

    /// Add a header to the request.
    ///
    /// Names or values that are not valid HTTP header text are dropped.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        let name = name.into();
        let value = value.into();
        if let (Ok(name), Ok(value)) = (
            HeaderName::try_from(name.as_str()),
            HeaderValue::try_from(value.as_str()),
        ) {
            self.headers.insert(name, value);
        } else {
            tracing::warn!(header = %name, "Dropping invalid request header");
        }
        self
    }

    /// Add a query parameter.
    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    /// Set a custom timeout for this request.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Build the URL with query parameters.
    fn build_url(&self) -> Result<url::Url> {
        let mut url =
            url::Url::parse(&self.url).map_err(|e| HttpClientError::InvalidUrl(e.to_string()))?;

        if !self.query.is_empty() {
            let mut query_pairs = url.query_pairs_mut();
            for (key, value) in &self.query {
                query_pairs.append_pair(key, value);
            }
        }

        Ok(url)
    }

    /// Send the request.
    pub async fn send(self) -> Result<Response> {
        let url = self.build_url()?;

        let mut request = self.client.inner().request(self.method.clone(), url);

        for (name, value) in &self.client.config().default_headers {
            request = request.header(name.as_str(), value.as_str());
        }

        // Request-specific headers win over defaults
        for (name, value) in &self.headers {
            request = request.header(name, value);
        }

        if let Some(timeout) = self.timeout {
            request = request.timeout(timeout);
        }

        self.client.execute(request.build()?).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::HttpClientConfig;

    #[test]
    fn test_build_url_with_query() {
        let client = HttpClient::new(HttpClientConfig::default()).unwrap();
        let builder = client
            .get("https://api.toggletown.com/api/v1/sdk/flags")
            .query("env", "prod");

        let url = builder.build_url().unwrap();
        assert_eq!(url.path(), "/api/v1/sdk/flags");
        assert_eq!(url.query(), Some("env=prod"));
    }

    #[test]
    fn test_invalid_url() {
        let client = HttpClient::new(HttpClientConfig::default()).unwrap();
        let err = client.get("not a url").build_url().unwrap_err();
        assert!(matches!(err, HttpClientError::InvalidUrl(_)));
    }

    #[test]
    fn test_invalid_header_is_dropped() {
        let client = HttpClient::new(HttpClientConfig::default()).unwrap();
        let builder = client.get("https://example.com").header("bad header", "x");
        assert!(builder.headers.is_empty());
    }
}
