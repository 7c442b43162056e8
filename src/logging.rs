//! Tracing subscriber for the CLI: compact lines on stderr, filtered by RUST_LOG or the flags.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Directive used when RUST_LOG is unset.
pub fn default_directive(verbose: bool, quiet: bool) -> &'static str {
    if verbose {
        "ytcomments=debug,info"
    } else if quiet {
        "ytcomments=warn"
    } else {
        "ytcomments=info"
    }
}

/// Install the stderr logger. RUST_LOG takes precedence over the flags.
pub fn init_cli_logger(verbose: bool, quiet: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(verbose, quiet)));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_thread_ids(false)
                .with_file(false)
                .with_line_number(false)
                .compact(),
        )
        .init();
}
