//! ytcomments: CLI fetcher for YouTube top-level comments, outputting Markdown, CSV, and JSON.

pub mod cli;
pub mod config;
pub mod fetcher;
pub mod logging;
pub mod model;
pub mod resume;
pub mod video_id;
pub mod writer;

// Re-exports for CLI and consumers.
pub use fetcher::{
    fetch_comments, ApiClient, ApiClientBuilder, CommentSink, CommentSource, FetchError,
    FetchReport,
};
pub use model::Comment;
pub use resume::current_comment_count;
pub use video_id::extract_video_id;
pub use writer::{save_comments, CommentWriter, JsonLayout, OutputPaths, WriteError};
