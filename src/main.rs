fn main() {
    use clap::Parser;
    use std::error::Error;
    let dotenv = dotenvy::dotenv();
    let args = ytcomments::cli::Args::parse();
    ytcomments::logging::init_cli_logger(args.verbose, args.quiet);
    if let Some(e) = ytcomments::config::dotenv_problem(dotenv) {
        tracing::warn!("Ignoring .env: {}", e);
    }
    match ytcomments::cli::run(&args) {
        Ok(summary) => {
            if args.verbose {
                if let Some(e) = summary.error {
                    let mut source = e.source();
                    while let Some(s) = source {
                        eprintln!("  cause: {}", s);
                        source = s.source();
                    }
                }
            }
        }
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(e.exit_code());
        }
    }
}
