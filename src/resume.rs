//! Resume offset: how many comments earlier runs already saved for this video today.

use crate::writer::{OutputPaths, CSV_HEADER};
use std::fs::File;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error)]
enum ResumeError {
    #[error("Cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Cannot parse {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
}

/// Running total to resume numbering from.
///
/// Counts CSV data rows (the header is excluded, multi-line comments count once). Falls back to
/// counting Markdown lines when only the Markdown file exists. Missing files give 0; any other
/// failure gives 0 and logs a warning.
pub fn current_comment_count(paths: &OutputPaths) -> u64 {
    match saved_count(paths) {
        Ok(n) => n,
        Err(e) => {
            warn!("Current comment count could not be retrieved: {}", e);
            0
        }
    }
}

fn saved_count(paths: &OutputPaths) -> Result<u64, ResumeError> {
    if let Some(n) = count_csv_records(&paths.csv)? {
        return Ok(n);
    }
    Ok(count_markdown_lines(&paths.markdown)?.unwrap_or(0))
}

fn open_existing(path: &Path) -> Result<Option<File>, ResumeError> {
    match File::open(path) {
        Ok(f) => Ok(Some(f)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(ResumeError::Io {
            path: path.to_path_buf(),
            source: e,
        }),
    }
}

fn count_csv_records(path: &Path) -> Result<Option<u64>, ResumeError> {
    let Some(file) = open_existing(path)? else {
        return Ok(None);
    };
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(file);
    let mut count = 0u64;
    for record in rdr.records() {
        let record = record.map_err(|e| ResumeError::Csv {
            path: path.to_path_buf(),
            source: e,
        })?;
        // Absent when the first run resumed from Markdown; repeated when a first flush was retried.
        if record.iter().eq(CSV_HEADER) {
            continue;
        }
        count += 1;
    }
    Ok(Some(count))
}

fn count_markdown_lines(path: &Path) -> Result<Option<u64>, ResumeError> {
    match std::fs::read_to_string(path) {
        Ok(s) => Ok(Some(s.lines().count() as u64)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(ResumeError::Io {
            path: path.to_path_buf(),
            source: e,
        }),
    }
}
