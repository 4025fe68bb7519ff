//! jobgate: run a job while holding a host-wide single-instance lock.
//!
//! This is the main entry point for the `jobgate` CLI. It parses arguments,
//! installs logging, dispatches to the appropriate command handler, and
//! maps the outcome to a process exit code.

mod cli;
mod commands;
pub mod config;
pub mod error;
pub mod exit_codes;
pub mod fs;
pub mod job;
pub mod lock;
mod logging;
mod signals;

use cli::Cli;
use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse_args();

    if let Err(err) = logging::init_logging(cli.log_level) {
        eprintln!("Warning: {}", err);
    }

    match commands::dispatch(cli.command).await {
        Ok(code) => ExitCode::from(code as u8),
        Err(err) => {
            eprintln!("Error: {}", err);
            ExitCode::from(err.exit_code() as u8)
        }
    }
}
