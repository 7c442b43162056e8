//! Canonical comment record.
//!
//! The fetcher normalizes API snippets into this shape; the writer consumes it.

use serde::{Deserialize, Serialize};

/// One top-level comment.
///
/// `published_at` is kept verbatim as returned by the API (ISO-8601), never reparsed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    /// Author display name.
    pub author: String,
    /// Display text. Plain text is requested, but the API may still return markup.
    pub text: String,
    pub published_at: String,
}

impl Comment {
    pub fn new(
        author: impl Into<String>,
        text: impl Into<String>,
        published_at: impl Into<String>,
    ) -> Self {
        Self {
            author: author.into(),
            text: text.into(),
            published_at: published_at.into(),
        }
    }
}
