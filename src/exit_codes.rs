//! Exit code constants for the jobgate CLI.
//!
//! - 0: Success (job completed, or cancelled through a graceful shutdown)
//! - 1: Unexpected error (job failed while executing)
//! - 2: Lock not acquired (another instance is running)
//! - 3: Configuration error detected before the job ran

/// Job completed, or was cancelled by a requested shutdown.
pub const SUCCESS: i32 = 0;

/// Unexpected error while executing the job.
pub const UNEXPECTED_ERROR: i32 = 1;

/// The instance lock is held by another live process.
pub const LOCK_NOT_ACQUIRED: i32 = 2;

/// Invalid configuration or an unusable lock environment.
pub const CONFIG_ERROR: i32 = 3;
