//! Command implementations for jobgate.
//!
//! This module routes CLI commands to their implementations and owns the
//! only place where the process environment is read for configuration.

mod lock;
mod run;

#[cfg(test)]
mod tests;

use crate::cli::{Command, LockAction, LockCommand, TargetArgs};
use crate::config::{Config, ConfigOverrides};
use crate::error::Result;
use std::path::PathBuf;

/// Dispatch a command and return the process exit code.
pub async fn dispatch(command: Command) -> Result<i32> {
    match command {
        Command::Run(args) => run::cmd_run(args).await,
        Command::Lock(lock_cmd) => dispatch_lock(lock_cmd),
    }
}

fn dispatch_lock(lock_cmd: LockCommand) -> Result<i32> {
    match lock_cmd.action {
        LockAction::Status(args) => lock::cmd_lock_status(args),
        LockAction::Clear(args) => lock::cmd_lock_clear(args),
    }
}

/// Build the validated configuration: defaults, then the config file,
/// then `JOBGATE_*` variables, then flags.
pub(crate) fn load_config(target: &TargetArgs, overrides: &ConfigOverrides) -> Result<Config> {
    let mut config = match &target.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };
    config.apply_env(|key| std::env::var(key).ok())?;
    config.apply_overrides(overrides);
    config.validate()?;
    Ok(config)
}

/// Runtime directory used when none is configured.
pub(crate) fn default_runtime_dir() -> PathBuf {
    std::env::temp_dir().join("jobgate")
}
