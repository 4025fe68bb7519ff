//! CLI argument parsing for jobgate.
//!
//! Uses clap derive macros for declarative argument definitions.
//! This module defines the command structure; actual implementations
//! are in the `commands` module.

use crate::config::ConfigOverrides;
use crate::lock::LockStrategy;
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// jobgate: run a named job with at most one live instance per host.
///
/// Exit codes: 0 success or graceful cancellation, 1 job failure,
/// 2 another instance holds the lock, 3 configuration error.
#[derive(Parser, Debug)]
#[command(name = "jobgate")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Logging level. Falls back to `JOBGATE_LOG`, then `info`.
    #[arg(long, global = true, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

/// Available commands for jobgate.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Acquire the instance lock and run the job.
    ///
    /// Ctrl-C or SIGTERM cancels the job gracefully; the lock is released
    /// and a completion marker is written on every outcome.
    Run(RunArgs),

    /// Inspect or clear instance locks.
    Lock(LockCommand),
}

/// Options that identify the job and where its locks live.
#[derive(Args, Debug, Clone, Default)]
pub struct TargetArgs {
    /// YAML config file.
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Instance name (the lock identity).
    #[arg(short, long)]
    pub name: Option<String>,

    /// Lock file path, overriding `<runtime-dir>/<name>.lock`.
    #[arg(long, value_name = "PATH")]
    pub lock_file: Option<PathBuf>,

    /// Directory for lock objects.
    #[arg(long, value_name = "DIR")]
    pub runtime_dir: Option<PathBuf>,
}

/// Arguments for the `run` command.
#[derive(Args, Debug, Clone, Default)]
pub struct RunArgs {
    #[command(flatten)]
    pub target: TargetArgs,

    /// Lock strategy (mutex or file_lock).
    #[arg(short, long, value_parser = parse_strategy)]
    pub strategy: Option<LockStrategy>,

    /// Work duration in seconds.
    #[arg(short, long, allow_negative_numbers = true, value_name = "SECONDS")]
    pub duration: Option<i64>,

    /// Directory that receives completion markers.
    #[arg(long, value_name = "DIR")]
    pub marker_dir: Option<PathBuf>,
}

impl RunArgs {
    pub fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            lock_strategy: self.strategy,
            job_duration_seconds: self.duration,
            marker_dir: self.marker_dir.clone(),
            ..self.target.overrides()
        }
    }
}

impl TargetArgs {
    pub fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            instance_name: self.name.clone(),
            lock_file: self.lock_file.clone(),
            runtime_dir: self.runtime_dir.clone(),
            ..ConfigOverrides::default()
        }
    }
}

/// Lock subcommands.
#[derive(Parser, Debug)]
pub struct LockCommand {
    #[command(subcommand)]
    pub action: LockAction,
}

#[derive(Subcommand, Debug)]
pub enum LockAction {
    /// Show whether the instance's mutex and lock file are held.
    ///
    /// Exits 0 when both are free, 2 when either is held.
    Status(TargetArgs),

    /// Delete a dangling lock file left by a dead holder.
    Clear(LockClearArgs),
}

/// Arguments for `lock clear`.
#[derive(Args, Debug)]
pub struct LockClearArgs {
    #[command(flatten)]
    pub target: TargetArgs,

    /// Required: confirms the holder is known to be gone.
    #[arg(long)]
    pub force: bool,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

fn parse_strategy(s: &str) -> Result<LockStrategy, String> {
    s.parse()
}
