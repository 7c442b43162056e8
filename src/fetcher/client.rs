//! Blocking HTTP client for the YouTube Data API with configurable base URL, User-Agent, and timeout.

use std::time::Duration;

/// Public API root. Overridable so tests can point at a local mock server.
pub const DEFAULT_API_BASE_URL: &str = "https://www.googleapis.com/youtube/v3";
const DEFAULT_USER_AGENT: &str = concat!("ytcomments/", env!("CARGO_PKG_VERSION"));
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Blocking HTTP client bound to one API base URL.
#[derive(Debug, Clone)]
pub struct ApiClient {
    inner: reqwest::blocking::Client,
    base_url: String,
}

impl ApiClient {
    /// Build a client with default base URL, User-Agent, and timeout.
    pub fn new() -> Result<Self, reqwest::Error> {
        Self::builder().build()
    }

    /// Builder for custom base URL, User-Agent, and/or timeout.
    pub fn builder() -> ApiClientBuilder {
        ApiClientBuilder::default()
    }

    /// Full URL of an endpoint under the base URL, without query string.
    pub fn endpoint(&self, name: &str) -> String {
        format!("{}/{}", self.base_url, name.trim_start_matches('/'))
    }

    /// Perform a GET request with the given query parameters.
    pub fn get(
        &self,
        url: &str,
        query: &[(&str, &str)],
    ) -> Result<reqwest::blocking::Response, reqwest::Error> {
        self.inner.get(url).query(query).send()
    }
}

/// Builder for ApiClient.
#[derive(Debug)]
pub struct ApiClientBuilder {
    base_url: String,
    user_agent: Option<String>,
    timeout_secs: u64,
}

impl Default for ApiClientBuilder {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_BASE_URL.to_string(),
            user_agent: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl ApiClientBuilder {
    /// Set the API root (e.g. `http://127.0.0.1:8080`). Trailing slashes are ignored.
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    /// Set a custom User-Agent.
    pub fn user_agent(mut self, ua: impl Into<String>) -> Self {
        self.user_agent = Some(ua.into());
        self
    }

    /// Set request timeout in seconds. Default 30.
    pub fn timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    pub fn build(self) -> Result<ApiClient, reqwest::Error> {
        let user_agent = self
            .user_agent
            .unwrap_or_else(|| DEFAULT_USER_AGENT.to_string());
        let inner = reqwest::blocking::Client::builder()
            .user_agent(user_agent)
            .timeout(Duration::from_secs(self.timeout_secs))
            .build()?;
        Ok(ApiClient {
            inner,
            base_url: self.base_url,
        })
    }
}
