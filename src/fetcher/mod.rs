//! Paginated comment fetching. Page source trait, batch sink trait, shared client, and the fetch loop.

mod api;
mod client;
mod error;

pub use api::{CommentThread, CommentThreadListResponse};
pub use client::{ApiClient, ApiClientBuilder, DEFAULT_API_BASE_URL};
pub use error::FetchError;

use crate::model::Comment;
use crate::writer::WriteError;
use tracing::{debug, error, info};

/// Page size requested from the API (its maximum for commentThreads).
pub const PAGE_SIZE: u32 = 100;
/// Records held in memory before a flush.
pub const BATCH_SIZE: usize = 100;

const COMMENT_THREADS: &str = "commentThreads";

/// Source of comment pages. Implemented by [ApiClient]; tests substitute scripted pages.
pub trait CommentSource {
    /// Fetch one page. `page_token` is `None` for the first page.
    fn fetch_page(
        &self,
        video_id: &str,
        api_key: &str,
        page_token: Option<&str>,
    ) -> Result<CommentThreadListResponse, FetchError>;
}

/// Destination for flushed batches. Owns the running total of saved records.
pub trait CommentSink {
    /// Number of records already saved; the next record is numbered `saved_total() + 1`.
    fn saved_total(&self) -> u64;

    /// Persist one batch. Returns the new running total. On error the total must not advance.
    fn flush(&mut self, batch: &[Comment]) -> Result<u64, WriteError>;
}

/// Outcome of a completed fetch run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchReport {
    /// Pages received.
    pub pages: u32,
    /// Comments received across all pages.
    pub fetched: u64,
    /// Flush attempts, successful or not.
    pub flushes: u32,
    /// Flushes that failed; their batches were dropped.
    pub failed_flushes: u32,
    /// Running total after the last successful flush (includes the resume offset).
    pub saved_total: u64,
}

/// Show only the first and last few characters of an API key.
pub fn mask_api_key(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    if chars.len() <= 8 {
        return "*".repeat(chars.len());
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{}...{}", head, tail)
}

/// Check response status and decode the body as a comment page.
fn check_response(
    response: reqwest::blocking::Response,
    url: &str,
) -> Result<CommentThreadListResponse, FetchError> {
    let status = response.status();
    let body = response
        .text()
        .map_err(|e| FetchError::BodyRead {
            source: e.without_url(),
        })?;
    if !status.is_success() {
        return Err(FetchError::HttpStatus {
            status: status.as_u16(),
            url: url.to_string(),
            message: api::api_error_message(&body),
        });
    }
    serde_json::from_str(&body).map_err(|e| FetchError::Decode { source: e })
}

impl CommentSource for ApiClient {
    fn fetch_page(
        &self,
        video_id: &str,
        api_key: &str,
        page_token: Option<&str>,
    ) -> Result<CommentThreadListResponse, FetchError> {
        let url = self.endpoint(COMMENT_THREADS);
        let max_results = PAGE_SIZE.to_string();
        let mut query: Vec<(&str, &str)> = vec![
            ("part", "snippet"),
            ("videoId", video_id),
            ("maxResults", max_results.as_str()),
            ("textFormat", "plainText"),
        ];
        if let Some(token) = page_token {
            query.push(("pageToken", token));
        }
        query.push(("key", api_key));

        debug!(url = %url, page_token = ?page_token, "requesting comment page");
        // reqwest errors carry the full URL, key included; strip it.
        let response = self.get(&url, &query).map_err(|e| FetchError::Network {
            url: url.clone(),
            source: e.without_url(),
        })?;
        check_response(response, &url)
    }
}

fn flush_batch(sink: &mut dyn CommentSink, batch: &mut Vec<Comment>, report: &mut FetchReport) {
    report.flushes += 1;
    match sink.flush(batch) {
        Ok(total) => {
            debug!(saved = batch.len(), total, "flushed batch");
            report.saved_total = total;
        }
        Err(e) => {
            report.failed_flushes += 1;
            error!("Comments could not be saved: {}", e);
        }
    }
    batch.clear();
}

/// Fetch every top-level comment of `video_id`, flushing to `sink` in batches of [BATCH_SIZE].
///
/// A missing or empty `api_key` fails with [FetchError::MissingApiKey] before any request.
/// Any transport or decode failure aborts the loop: batches already flushed stay persisted,
/// the in-flight batch is lost. `progress` is called after each page with (pages, fetched).
pub fn fetch_comments(
    source: &dyn CommentSource,
    video_id: &str,
    api_key: Option<&str>,
    sink: &mut dyn CommentSink,
    progress: Option<&dyn Fn(u32, u64)>,
) -> Result<FetchReport, FetchError> {
    let api_key = match api_key.map(str::trim).filter(|k| !k.is_empty()) {
        Some(k) => k,
        None => {
            error!("{}", FetchError::MissingApiKey);
            return Err(FetchError::MissingApiKey);
        }
    };
    info!(video_id, api_key = %mask_api_key(api_key), "fetching comments");

    let mut report = FetchReport {
        saved_total: sink.saved_total(),
        ..FetchReport::default()
    };
    let mut batch: Vec<Comment> = Vec::with_capacity(BATCH_SIZE);
    let mut page_token: Option<String> = None;

    loop {
        let page = match source.fetch_page(video_id, api_key, page_token.as_deref()) {
            Ok(p) => p,
            Err(e) => {
                error!(
                    lost = batch.len(),
                    saved = report.saved_total,
                    "An HTTP error occurred: {}",
                    e
                );
                return Err(e);
            }
        };
        report.pages += 1;
        page_token = page.next_page_token().map(String::from);

        for thread in page.items {
            batch.push(Comment::from(thread));
            report.fetched += 1;
            if batch.len() == BATCH_SIZE {
                flush_batch(sink, &mut batch, &mut report);
            }
        }
        if let Some(p) = progress {
            p(report.pages, report.fetched);
        }

        if page_token.is_none() {
            break;
        }
    }

    if !batch.is_empty() {
        flush_batch(sink, &mut batch, &mut report);
    }
    info!(
        pages = report.pages,
        flushes = report.flushes,
        saved_total = report.saved_total,
        "fetch finished"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::{Cell, RefCell};
    use std::collections::VecDeque;

    fn thread(n: u64) -> CommentThread {
        let json = serde_json::json!({
            "snippet": {"topLevelComment": {"snippet": {
                "authorDisplayName": format!("user{}", n),
                "textDisplay": format!("comment {}", n),
                "publishedAt": "2024-05-06T07:08:09Z"
            }}}
        });
        serde_json::from_value(json).expect("valid thread")
    }

    /// Pages of the given sizes; every page but the last carries a token.
    fn pages(sizes: &[u64]) -> VecDeque<Result<CommentThreadListResponse, FetchError>> {
        let mut n = 0;
        sizes
            .iter()
            .enumerate()
            .map(|(i, &size)| {
                let items = (0..size)
                    .map(|_| {
                        n += 1;
                        thread(n)
                    })
                    .collect();
                let next_page_token = (i + 1 < sizes.len()).then(|| format!("token{}", i + 1));
                Ok(CommentThreadListResponse {
                    items,
                    next_page_token,
                })
            })
            .collect()
    }

    struct ScriptedSource {
        pages: RefCell<VecDeque<Result<CommentThreadListResponse, FetchError>>>,
        tokens_seen: RefCell<Vec<Option<String>>>,
        calls: Cell<u32>,
    }

    impl ScriptedSource {
        fn new(pages: VecDeque<Result<CommentThreadListResponse, FetchError>>) -> Self {
            Self {
                pages: RefCell::new(pages),
                tokens_seen: RefCell::new(Vec::new()),
                calls: Cell::new(0),
            }
        }
    }

    impl CommentSource for ScriptedSource {
        fn fetch_page(
            &self,
            _video_id: &str,
            _api_key: &str,
            page_token: Option<&str>,
        ) -> Result<CommentThreadListResponse, FetchError> {
            self.calls.set(self.calls.get() + 1);
            self.tokens_seen
                .borrow_mut()
                .push(page_token.map(String::from));
            self.pages
                .borrow_mut()
                .pop_front()
                .unwrap_or_else(|| Ok(CommentThreadListResponse::default()))
        }
    }

    #[derive(Default)]
    struct RecordingSink {
        total: u64,
        batches: Vec<Vec<Comment>>,
        fail_on: Option<usize>,
    }

    impl CommentSink for RecordingSink {
        fn saved_total(&self) -> u64 {
            self.total
        }

        fn flush(&mut self, batch: &[Comment]) -> Result<u64, WriteError> {
            let attempt = self.batches.len();
            self.batches.push(batch.to_vec());
            if self.fail_on == Some(attempt) {
                return Err(WriteError::Io {
                    path: "comments.md".into(),
                    source: std::io::Error::new(std::io::ErrorKind::Other, "disk full"),
                });
            }
            self.total += batch.len() as u64;
            Ok(self.total)
        }
    }

    #[test]
    fn missing_api_key_makes_no_requests() {
        let source = ScriptedSource::new(pages(&[3]));
        let mut sink = RecordingSink::default();
        let result = fetch_comments(&source, "dQw4w9WgXcQ", None, &mut sink, None);
        assert!(matches!(result, Err(FetchError::MissingApiKey)));
        assert_eq!(source.calls.get(), 0);
        assert!(sink.batches.is_empty());

        let result = fetch_comments(&source, "dQw4w9WgXcQ", Some("  "), &mut sink, None);
        assert!(matches!(result, Err(FetchError::MissingApiKey)));
        assert_eq!(source.calls.get(), 0);
    }

    #[test]
    fn flush_count_is_ceil_of_total_over_batch_size() -> Result<(), FetchError> {
        for sizes in [
            vec![0],
            vec![37],
            vec![100],
            vec![100, 37],
            vec![60, 60, 60],
            vec![100, 100, 100, 1],
            vec![99, 1, 0, 50],
        ] {
            let total: u64 = sizes.iter().sum();
            let source = ScriptedSource::new(pages(&sizes));
            let mut sink = RecordingSink::default();
            let report = fetch_comments(&source, "dQw4w9WgXcQ", Some("key"), &mut sink, None)?;
            let expected = total.div_ceil(BATCH_SIZE as u64) as u32;
            assert_eq!(report.flushes, expected, "sizes {:?}", sizes);
            assert_eq!(report.pages as usize, sizes.len());
            assert_eq!(report.fetched, total);
            assert_eq!(report.saved_total, total);
            assert!(sink.batches.iter().all(|b| b.len() <= BATCH_SIZE));
        }
        Ok(())
    }

    #[test]
    fn records_flush_in_arrival_order() -> Result<(), FetchError> {
        let source = ScriptedSource::new(pages(&[60, 60, 60]));
        let mut sink = RecordingSink::default();
        fetch_comments(&source, "dQw4w9WgXcQ", Some("key"), &mut sink, None)?;
        let sizes: Vec<usize> = sink.batches.iter().map(Vec::len).collect();
        assert_eq!(sizes, vec![100, 80]);
        let authors: Vec<String> = sink.batches.concat().into_iter().map(|c| c.author).collect();
        let expected: Vec<String> = (1..=180).map(|n| format!("user{}", n)).collect();
        assert_eq!(authors, expected);
        Ok(())
    }

    #[test]
    fn follows_continuation_tokens() -> Result<(), FetchError> {
        let source = ScriptedSource::new(pages(&[1, 1, 1]));
        let mut sink = RecordingSink::default();
        fetch_comments(&source, "dQw4w9WgXcQ", Some("key"), &mut sink, None)?;
        assert_eq!(
            *source.tokens_seen.borrow(),
            vec![None, Some("token1".to_string()), Some("token2".to_string())]
        );
        Ok(())
    }

    #[test]
    fn running_total_continues_from_sink() -> Result<(), FetchError> {
        let source = ScriptedSource::new(pages(&[100, 37]));
        let mut sink = RecordingSink {
            total: 250,
            ..RecordingSink::default()
        };
        let report = fetch_comments(&source, "dQw4w9WgXcQ", Some("key"), &mut sink, None)?;
        assert_eq!(report.saved_total, 387);
        assert_eq!(report.fetched, 137);
        Ok(())
    }

    #[test]
    fn transport_error_keeps_flushed_batches_and_drops_in_flight() {
        let mut script = pages(&[100, 50, 10]);
        script[2] = Err(FetchError::HttpStatus {
            status: 500,
            url: "http://localhost/commentThreads".into(),
            message: None,
        });
        let source = ScriptedSource::new(script);
        let mut sink = RecordingSink::default();
        let result = fetch_comments(&source, "dQw4w9WgXcQ", Some("key"), &mut sink, None);
        assert!(matches!(
            result,
            Err(FetchError::HttpStatus { status: 500, .. })
        ));
        assert_eq!(sink.batches.len(), 1);
        assert_eq!(sink.total, 100);
        assert_eq!(source.calls.get(), 3);
    }

    #[test]
    fn failed_flush_does_not_advance_total_and_run_continues() -> Result<(), FetchError> {
        let source = ScriptedSource::new(pages(&[100, 100, 5]));
        let mut sink = RecordingSink {
            fail_on: Some(0),
            ..RecordingSink::default()
        };
        let report = fetch_comments(&source, "dQw4w9WgXcQ", Some("key"), &mut sink, None)?;
        assert_eq!(report.flushes, 3);
        assert_eq!(report.failed_flushes, 1);
        assert_eq!(report.fetched, 205);
        assert_eq!(report.saved_total, 105);
        assert_eq!(sink.total, 105);
        Ok(())
    }

    #[test]
    fn progress_reports_each_page() -> Result<(), FetchError> {
        let source = ScriptedSource::new(pages(&[100, 20]));
        let mut sink = RecordingSink::default();
        let seen = RefCell::new(Vec::new());
        let cb = |pages: u32, fetched: u64| seen.borrow_mut().push((pages, fetched));
        fetch_comments(&source, "dQw4w9WgXcQ", Some("key"), &mut sink, Some(&cb))?;
        assert_eq!(*seen.borrow(), vec![(1, 100), (2, 120)]);
        Ok(())
    }

    #[test]
    fn mask_api_key_hides_middle() {
        assert_eq!(mask_api_key("AIzaSyA1234567890abcd"), "AIza...abcd");
        assert_eq!(mask_api_key("short"), "*****");
        assert_eq!(mask_api_key(""), "");
    }
}
