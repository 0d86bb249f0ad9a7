use clap::Parser;
use netrecon::cli::{Cli, Completion};
use netrecon::output::print_error;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "netrecon=debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    match cli.execute().await {
        Ok(Completion::Finished) => ExitCode::SUCCESS,
        Ok(Completion::Interrupted) => {
            tracing::info!("operation cancelled by user");
            ExitCode::from(130)
        }
        Err(e) => {
            tracing::debug!(error = ?e, "scan failed");
            print_error(&format!("{e:#}"));
            ExitCode::FAILURE
        }
    }
}
