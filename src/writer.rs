//! Append-only output writers: Markdown, CSV, and JSON.
//! Each flush appends one batch of comments to all three files of a run.

use crate::fetcher::CommentSink;
use crate::model::Comment;
use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// CSV header row, written once per run.
pub const CSV_HEADER: [&str; 4] = ["Index", "Author", "Comment", "Published At"];

/// How batches are laid out in the `.json` file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum JsonLayout {
    /// Append one `{"comments": [...]}` object per flush. The file is a sequence of
    /// objects, not a single JSON document.
    #[default]
    Concatenated,
    /// Keep a single `{"comments": [...]}` document and merge each batch into it.
    Array,
}

/// Errors from the output writers. The running total is never advanced on error.
#[derive(Debug, Error)]
pub enum WriteError {
    #[error("Failed to write output: {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write CSV: {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("Failed to write JSON: {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// The three output files of one video on one day.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputPaths {
    pub markdown: PathBuf,
    pub csv: PathBuf,
    pub json: PathBuf,
}

impl OutputPaths {
    /// `{dir}/comments_{video_id}_{YYYYMMDD}.{md,csv,json}`.
    pub fn new(dir: &Path, video_id: &str, date: NaiveDate) -> Self {
        let stem = file_stem(video_id, date);
        Self {
            markdown: dir.join(format!("{}.md", stem)),
            csv: dir.join(format!("{}.csv", stem)),
            json: dir.join(format!("{}.json", stem)),
        }
    }

    /// Paths for the current local date.
    pub fn for_today(dir: &Path, video_id: &str) -> Self {
        Self::new(dir, video_id, Local::now().date_naive())
    }

    pub fn iter(&self) -> impl Iterator<Item = &Path> {
        [
            self.markdown.as_path(),
            self.csv.as_path(),
            self.json.as_path(),
        ]
        .into_iter()
    }
}

pub fn file_stem(video_id: &str, date: NaiveDate) -> String {
    format!("comments_{}_{}", video_id, date.format("%Y%m%d"))
}

fn open_append(path: &Path) -> Result<File, WriteError> {
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| WriteError::Io {
            path: path.to_path_buf(),
            source: e,
        })
}

fn io_err(path: &Path) -> impl Fn(std::io::Error) -> WriteError + '_ {
    move |e| WriteError::Io {
        path: path.to_path_buf(),
        source: e,
    }
}

/// Markdown line for record number `n`.
pub fn markdown_line(n: u64, comment: &Comment) -> String {
    format!(
        "{}. **{}**: {} (Published at: {})",
        n, comment.author, comment.text, comment.published_at
    )
}

fn append_markdown(
    file: File,
    path: &Path,
    comments: &[Comment],
    start_index: u64,
) -> Result<(), WriteError> {
    let mut f = BufWriter::new(file);
    for (n, c) in (start_index + 1..).zip(comments) {
        writeln!(f, "{}", markdown_line(n, c)).map_err(io_err(path))?;
    }
    f.flush().map_err(io_err(path))
}

fn append_csv(
    file: File,
    path: &Path,
    comments: &[Comment],
    start_index: u64,
) -> Result<(), WriteError> {
    let csv_err = |e: csv::Error| WriteError::Csv {
        path: path.to_path_buf(),
        source: e,
    };
    let mut w = csv::WriterBuilder::new()
        .has_headers(false)
        .terminator(csv::Terminator::CRLF)
        .from_writer(file);
    if start_index == 0 {
        w.write_record(CSV_HEADER).map_err(csv_err)?;
    }
    for (n, c) in (start_index + 1..).zip(comments) {
        w.write_record([
            n.to_string().as_str(),
            c.author.as_str(),
            c.text.as_str(),
            c.published_at.as_str(),
        ])
        .map_err(csv_err)?;
    }
    w.flush().map_err(io_err(path))
}

#[derive(Serialize)]
struct JsonBatch<'a> {
    comments: &'a [Comment],
}

#[derive(Deserialize)]
struct JsonDocument {
    comments: Vec<Comment>,
}

/// JSON target opened or parsed ahead of the Markdown and CSV appends.
enum PendingJson {
    Append(File),
    Merge(Vec<Comment>),
}

impl PendingJson {
    fn prepare(path: &Path, layout: JsonLayout) -> Result<Self, WriteError> {
        match layout {
            JsonLayout::Concatenated => Ok(PendingJson::Append(open_append(path)?)),
            JsonLayout::Array => Ok(PendingJson::Merge(read_json_document(path)?)),
        }
    }

    fn write(self, path: &Path, comments: &[Comment]) -> Result<(), WriteError> {
        match self {
            PendingJson::Append(file) => append_json_object(file, path, comments),
            PendingJson::Merge(existing) => merge_json_array(path, existing, comments),
        }
    }
}

/// Pretty-print with 4-space indentation; non-ASCII is written verbatim.
fn write_pretty<W: Write>(writer: W, batch: &JsonBatch<'_>) -> Result<(), serde_json::Error> {
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut ser = serde_json::Serializer::with_formatter(writer, formatter);
    batch.serialize(&mut ser)
}

fn json_err(path: &Path) -> impl Fn(serde_json::Error) -> WriteError + '_ {
    move |e| WriteError::Json {
        path: path.to_path_buf(),
        source: e,
    }
}

fn append_json_object(file: File, path: &Path, comments: &[Comment]) -> Result<(), WriteError> {
    let mut f = BufWriter::new(file);
    write_pretty(&mut f, &JsonBatch { comments }).map_err(json_err(path))?;
    writeln!(f).map_err(io_err(path))?;
    f.flush().map_err(io_err(path))
}

/// Comments of an existing single-document file. Missing or blank files hold none.
fn read_json_document(path: &Path) -> Result<Vec<Comment>, WriteError> {
    match std::fs::read_to_string(path) {
        Ok(s) if !s.trim().is_empty() => Ok(serde_json::from_str::<JsonDocument>(&s)
            .map_err(json_err(path))?
            .comments),
        Ok(_) => Ok(Vec::new()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
        Err(e) => Err(io_err(path)(e)),
    }
}

fn merge_json_array(
    path: &Path,
    mut all: Vec<Comment>,
    comments: &[Comment],
) -> Result<(), WriteError> {
    all.extend_from_slice(comments);

    // Write next to the target, then rename, so a failed write leaves the old document intact.
    let tmp = path.with_extension("json.tmp");
    let mut f = BufWriter::new(File::create(&tmp).map_err(io_err(&tmp))?);
    write_pretty(&mut f, &JsonBatch { comments: &all }).map_err(json_err(&tmp))?;
    writeln!(f).map_err(io_err(&tmp))?;
    f.flush().map_err(io_err(&tmp))?;
    drop(f);
    std::fs::rename(&tmp, path).map_err(io_err(path))
}

/// Append one batch to the Markdown, CSV, and JSON files.
///
/// Records are numbered from `start_index + 1`. The CSV header is written only when
/// `start_index` is 0. Returns `start_index + comments.len()`.
///
/// All three files are opened (and an `Array` document parsed) before anything is written,
/// so an unusable output file fails the flush without touching the others.
pub fn save_comments(
    paths: &OutputPaths,
    comments: &[Comment],
    start_index: u64,
    layout: JsonLayout,
) -> Result<u64, WriteError> {
    let json = PendingJson::prepare(&paths.json, layout)?;
    let markdown = open_append(&paths.markdown)?;
    let csv = open_append(&paths.csv)?;

    append_markdown(markdown, &paths.markdown, comments, start_index)?;
    append_csv(csv, &paths.csv, comments, start_index)?;
    json.write(&paths.json, comments)?;

    let total = start_index + comments.len() as u64;
    debug!(start_index, total, "saved batch");
    Ok(total)
}

/// Writer for one run: the output paths, JSON layout, and running total.
#[derive(Debug)]
pub struct CommentWriter {
    paths: OutputPaths,
    layout: JsonLayout,
    total: u64,
}

impl CommentWriter {
    /// `start_total` is the resume offset; 0 starts a fresh run (and writes the CSV header).
    pub fn new(paths: OutputPaths, layout: JsonLayout, start_total: u64) -> Self {
        Self {
            paths,
            layout,
            total: start_total,
        }
    }

    pub fn paths(&self) -> &OutputPaths {
        &self.paths
    }

    pub fn total(&self) -> u64 {
        self.total
    }
}

impl CommentSink for CommentWriter {
    fn saved_total(&self) -> u64 {
        self.total
    }

    fn flush(&mut self, batch: &[Comment]) -> Result<u64, WriteError> {
        self.total = save_comments(&self.paths, batch, self.total, self.layout)?;
        Ok(self.total)
    }
}
