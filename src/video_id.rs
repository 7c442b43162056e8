//! Video identifier extraction from watch, short, and embed URLs.

use once_cell::sync::Lazy;
use regex::Regex;

/// Matches the 11-character token following `v=` or a path separator.
static VIDEO_ID_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?:v=|/)([0-9A-Za-z_-]{11})").expect("valid video id regex"));

/// Extract the video identifier from a URL-like string.
///
/// Returns the first 11-character segment after `v=` or `/`, or `None` when nothing matches.
/// No further validation is done: the token is returned exactly as captured.
pub fn extract_video_id(url: &str) -> Option<String> {
    VIDEO_ID_RE
        .captures(url)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}
