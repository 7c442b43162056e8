//! Wire types for the `commentThreads` list endpoint. Only the fields we keep are modeled.

use crate::model::Comment;
use serde::Deserialize;

/// One page of `commentThreads.list`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentThreadListResponse {
    #[serde(default)]
    pub items: Vec<CommentThread>,
    pub next_page_token: Option<String>,
}

impl CommentThreadListResponse {
    /// Continuation token, treating an empty string as absent.
    pub fn next_page_token(&self) -> Option<&str> {
        self.next_page_token.as_deref().filter(|t| !t.is_empty())
    }
}

#[derive(Debug, Deserialize)]
pub struct CommentThread {
    pub snippet: ThreadSnippet,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThreadSnippet {
    pub top_level_comment: TopLevelComment,
}

#[derive(Debug, Deserialize)]
pub struct TopLevelComment {
    pub snippet: CommentSnippet,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentSnippet {
    pub author_display_name: String,
    pub text_display: String,
    pub published_at: String,
}

impl From<CommentThread> for Comment {
    fn from(thread: CommentThread) -> Self {
        let s = thread.snippet.top_level_comment.snippet;
        Comment {
            author: s.author_display_name,
            text: s.text_display,
            published_at: s.published_at,
        }
    }
}

/// Google API error body: `{"error": {"code": 403, "message": "..."}}`.
#[derive(Debug, Deserialize)]
pub(crate) struct ApiErrorResponse {
    pub error: ApiErrorBody,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ApiErrorBody {
    #[serde(default)]
    pub message: Option<String>,
}

/// Extract the human-readable message from an API error body, if it has one.
pub(crate) fn api_error_message(body: &str) -> Option<String> {
    serde_json::from_str::<ApiErrorResponse>(body)
        .ok()
        .and_then(|r| r.error.message)
        .filter(|m| !m.trim().is_empty())
}
