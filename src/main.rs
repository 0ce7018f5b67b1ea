//! plaid-cli binary entry point.

use clap::Parser;
use plaid_cli::cli::errors::format_error_help;
use plaid_cli::cli::Cli;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();

    if let Err(e) = plaid_cli::cli::run(cli).await {
        eprintln!("Error: {}", format_error_help(&e));
        std::process::exit(1);
    }
}
