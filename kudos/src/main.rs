use std::process::ExitCode;

use clap::Parser;
use kudos::cli::{self, Cli};
use kudos::logging;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Keep the guard alive so buffered log lines are flushed on exit
    let _guard = match logging::default_logs_dir().and_then(|dir| logging::init_logging(&dir)) {
        Ok((log_path, guard)) => {
            tracing::info!(log_path = %log_path.display(), "Starting kudos");
            Some(guard)
        }
        Err(e) => {
            eprintln!("Logging disabled: {e}");
            None
        }
    };

    match cli::run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) if cli::session_expired(&e) => {
            tracing::info!(error = %e, "Session expired");
            eprintln!("Your session has expired. Run `kudos login` to sign in again.");
            ExitCode::FAILURE
        }
        Err(e) => {
            tracing::error!(error = %e, "Command failed");
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}
