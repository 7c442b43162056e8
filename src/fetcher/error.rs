//! Shared error type for the comment fetcher.

use thiserror::Error;

/// Fetch error: configuration, HTTP, and response decoding.
///
/// URLs carried here never include the query string, so the API key does not leak into logs.
#[derive(Debug, Error)]
pub enum FetchError {
    // Configuration
    #[error("YOUTUBE_API_KEY environment variable not set.")]
    MissingApiKey,

    // HTTP and network
    #[error("Network error: could not reach {url}: {source}")]
    Network {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("HTTP {status} when fetching {url}{}", message_suffix(.message))]
    HttpStatus {
        status: u16,
        url: String,
        /// Error message from the API's JSON error body, when present.
        message: Option<String>,
    },

    #[error("Failed to read response body: {source}")]
    BodyRead {
        #[source]
        source: reqwest::Error,
    },

    // Parsing
    #[error("Could not decode comment page: {source}")]
    Decode {
        #[source]
        source: serde_json::Error,
    },
}

fn message_suffix(message: &Option<String>) -> String {
    match message {
        Some(m) => format!(": {}", m),
        None => String::new(),
    }
}

impl FetchError {
    /// True for failures that happen before any request is sent.
    pub fn is_configuration(&self) -> bool {
        matches!(self, FetchError::MissingApiKey)
    }
}
