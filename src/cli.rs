//! CLI parsing and orchestration. Reads the URL (argument or prompt), resolves config, fetches
//! comments into the Markdown/CSV/JSON triad, and maps input errors to exit codes.
//!
//! Fetch failures (missing API key, HTTP errors) are logged and do not fail the process:
//! whatever was flushed before the failure stays on disk.

use crate::config::{self, API_KEY_ENV};
use crate::fetcher::{fetch_comments, ApiClient, FetchError, FetchReport};
use crate::resume::current_comment_count;
use crate::video_id::extract_video_id;
use crate::writer::{CommentWriter, JsonLayout, OutputPaths};
use clap::Parser;
use std::cell::RefCell;
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::info;

const URL_PROMPT: &str = "🚀 Enter YouTube URL: ";

/// CLI error carrying exit code and message.
#[derive(Debug, Error)]
pub enum CliRunError {
    #[error("{0}")]
    InvalidInput(String),

    #[error("{0}")]
    Config(String),
}

impl CliRunError {
    pub fn exit_code(&self) -> i32 {
        match self {
            CliRunError::InvalidInput(_) => 1,
            CliRunError::Config(_) => 2,
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "ytcomments")]
#[command(about = "Fetch all top-level comments of a YouTube video into Markdown, CSV, and JSON")]
#[command(
    after_help = "The API key is read from YOUTUBE_API_KEY (a .env file in the current directory is loaded first). Config file keys (output_dir, user_agent, timeout_secs, api_base_url, json_layout) are read from ./ytcomments.toml or the user config dir. CLI flags override config."
)]
pub struct Args {
    /// Video URL (watch, youtu.be, shorts, or embed). Prompted for when omitted.
    pub url: Option<String>,

    /// Directory for the output files. Default: current directory.
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// JSON layout: concatenated (one object per flush, default) or array (single document).
    #[arg(long, value_parser = parse_json_layout)]
    pub json_layout: Option<JsonLayout>,

    /// HTTP User-Agent (overrides config).
    #[arg(long)]
    pub user_agent: Option<String>,

    /// Request timeout in seconds (overrides config; default 30).
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Suppress progress output (warnings and errors only).
    #[arg(short, long)]
    pub quiet: bool,

    /// Debug logging and verbose error chain.
    #[arg(long)]
    pub verbose: bool,
}

/// What a run produced. `error` is set when the fetch stopped early or never started.
#[derive(Debug)]
pub struct RunSummary {
    pub paths: OutputPaths,
    /// Records saved for this video today, including earlier runs.
    pub saved_total: u64,
    pub report: Option<FetchReport>,
    pub error: Option<FetchError>,
}

fn parse_json_layout(s: &str) -> Result<JsonLayout, String> {
    match s.to_lowercase().as_str() {
        "concatenated" | "concat" => Ok(JsonLayout::Concatenated),
        "array" => Ok(JsonLayout::Array),
        _ => Err(format!(
            "Invalid json layout: '{}'. Use concatenated or array.",
            s
        )),
    }
}

/// Print the prompt and read one line. Returns the trimmed input.
fn prompt_for_url<R: BufRead, W: Write>(mut input: R, mut output: W) -> std::io::Result<String> {
    write!(output, "{}", URL_PROMPT)?;
    output.flush()?;
    let mut line = String::new();
    input.read_line(&mut line)?;
    Ok(line.trim().to_string())
}

/// Ensure the output directory exists.
fn validate_output_dir(dir: &Path) -> Result<(), CliRunError> {
    if !dir.as_os_str().is_empty() && !dir.is_dir() {
        return Err(CliRunError::InvalidInput(format!(
            "Cannot write output: {}: directory does not exist.",
            dir.display()
        )));
    }
    Ok(())
}

/// Entry point for the CLI. Err only for input/config problems; fetch failures are in the summary.
pub fn run(args: &Args) -> Result<RunSummary, CliRunError> {
    let url = match &args.url {
        Some(u) => u.trim().to_string(),
        None => {
            let stdin = std::io::stdin();
            prompt_for_url(stdin.lock(), std::io::stdout()).map_err(|e| {
                CliRunError::InvalidInput(format!("Could not read URL from stdin: {}", e))
            })?
        }
    };

    let video_id = extract_video_id(&url).ok_or_else(|| {
        CliRunError::InvalidInput(format!(
            "🚨 Invalid YouTube URL provided: '{}'. Example: https://www.youtube.com/watch?v=dQw4w9WgXcQ",
            url
        ))
    })?;
    info!(video_id = %video_id, "extracted video id");

    let config = config::load_config().map_err(CliRunError::Config)?;

    let output_dir: PathBuf = args
        .output
        .clone()
        .or_else(|| config.as_ref().and_then(|c| c.output_dir.clone()))
        .unwrap_or_else(|| PathBuf::from("."));
    validate_output_dir(&output_dir)?;

    let json_layout = match args.json_layout {
        Some(l) => l,
        None => match config.as_ref().and_then(|c| c.json_layout.as_deref()) {
            Some(s) => parse_json_layout(s).map_err(CliRunError::Config)?,
            None => JsonLayout::default(),
        },
    };

    let mut builder = ApiClient::builder();
    if let Some(base) = config.as_ref().and_then(|c| c.api_base_url.clone()) {
        builder = builder.base_url(base);
    }
    if let Some(t) = args
        .timeout
        .or_else(|| config.as_ref().and_then(|c| c.timeout_secs))
    {
        builder = builder.timeout_secs(t);
    }
    if let Some(ua) = args
        .user_agent
        .clone()
        .or_else(|| config.as_ref().and_then(|c| c.user_agent.clone()))
    {
        builder = builder.user_agent(ua);
    }
    let client = builder
        .build()
        .map_err(|e| CliRunError::Config(format!("Failed to create HTTP client: {}", e)))?;

    let api_key = config::api_key_from_env();

    let paths = OutputPaths::for_today(&output_dir, &video_id);
    let start_total = current_comment_count(&paths);
    if start_total > 0 {
        info!(
            "Resuming at comment {} from existing {}",
            start_total + 1,
            paths.csv.display()
        );
    }
    let mut writer = CommentWriter::new(paths, json_layout, start_total);

    let progress_state: RefCell<Option<indicatif::ProgressBar>> = RefCell::new(None);
    let progress_cb = |pages: u32, fetched: u64| {
        let mut state = progress_state.borrow_mut();
        let pb = state.get_or_insert_with(|| {
            let bar = indicatif::ProgressBar::new_spinner();
            if let Ok(style) = indicatif::ProgressStyle::default_spinner()
                .template("{spinner} {msg} ({elapsed})")
            {
                bar.set_style(style.tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏ "));
            }
            bar.enable_steady_tick(Duration::from_millis(80));
            bar
        });
        pb.set_message(format!("Fetched {} comments ({} pages)", fetched, pages));
    };
    let progress: Option<&dyn Fn(u32, u64)> = if args.quiet { None } else { Some(&progress_cb) };

    let result = fetch_comments(
        &client,
        &video_id,
        api_key.as_deref(),
        &mut writer,
        progress,
    );

    if let Some(pb) = progress_state.borrow_mut().take() {
        pb.disable_steady_tick();
        pb.finish_and_clear();
    }

    let (report, error) = match result {
        Ok(r) => (Some(r), None),
        Err(e) => (None, Some(e)),
    };
    let summary = RunSummary {
        saved_total: writer.total(),
        paths: writer.paths().clone(),
        report,
        error,
    };

    if !args.quiet {
        // The fetch error itself was already logged by the fetcher.
        let _ = print_summary(std::io::stderr().lock(), &summary);
    }
    Ok(summary)
}

/// End-of-run summary: total line, unsaved batches, key hint, and the files written.
fn print_summary<W: Write>(mut out: W, summary: &RunSummary) -> std::io::Result<()> {
    if summary.error.as_ref().is_some_and(FetchError::is_configuration) {
        writeln!(
            out,
            "Set {} in the environment or in a .env file in the current directory.",
            API_KEY_ENV
        )?;
    }
    writeln!(out, "Total {} comments fetched.", summary.saved_total)?;
    if let Some(report) = summary.report.as_ref().filter(|r| r.failed_flushes > 0) {
        writeln!(
            out,
            "{} of {} batches could not be saved.",
            report.failed_flushes, report.flushes
        )?;
    }
    if summary.saved_total > 0 {
        for p in summary.paths.iter() {
            writeln!(out, "Wrote {}", p.display())?;
        }
    }
    Ok(())
}
