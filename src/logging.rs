//! Logging setup using `tracing` + `tracing-subscriber`.
//!
//! Priority for determining the filter:
//! 1. `--log-level` CLI flag (if provided)
//! 2. `JOBGATE_LOG` environment variable (e.g. "info", "jobgate=debug")
//! 3. default to `info`
//!
//! Logs go to stderr so stdout stays free for command output.

use crate::cli::LogLevel;
use crate::error::{JobgateError, Result};
use tracing_subscriber::EnvFilter;

/// Environment variable consulted when no `--log-level` is given.
pub const LOG_ENV: &str = "JOBGATE_LOG";

/// Install the global subscriber. Call once at startup.
pub fn init_logging(cli_level: Option<LogLevel>) -> Result<()> {
    let filter = match cli_level {
        Some(level) => EnvFilter::new(level.as_str()),
        None => EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("info")),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init()
        .map_err(|e| JobgateError::Internal(format!("failed to initialise logging: {}", e)))
}
