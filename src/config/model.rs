//! The configuration model for jobgate.

use crate::lock::LockStrategy;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Job and lock configuration, usually read from a YAML file.
///
/// Unknown fields are ignored and every field has a default, so an empty
/// document is a valid configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    // =========================================================================
    // Job identity and work
    // =========================================================================
    /// Logical job name; the lock identity is derived from it.
    #[serde(default = "default_instance_name")]
    pub instance_name: String,

    /// Requested work duration in seconds. Must not be negative.
    #[serde(default = "default_job_duration_seconds")]
    pub job_duration_seconds: i64,

    /// Durations above this many seconds are accepted with a warning.
    #[serde(default = "default_duration_warn_seconds")]
    pub duration_warn_seconds: u64,

    /// Interval between cancellation checks, in milliseconds (1..=1000).
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Seconds between progress observations.
    #[serde(default = "default_progress_interval_seconds")]
    pub progress_interval_seconds: u64,

    /// Runs shorter than this many seconds report no progress.
    #[serde(default = "default_progress_min_duration_seconds")]
    pub progress_min_duration_seconds: u64,

    // =========================================================================
    // Lock settings
    // =========================================================================
    /// Exclusivity mechanism.
    #[serde(default)]
    pub lock_strategy: LockStrategy,

    /// Explicit lock file path (overrides `<runtime_dir>/<name>.lock`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lock_file: Option<PathBuf>,

    /// Directory for lock objects. Defaults to `<temp dir>/jobgate`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub runtime_dir: Option<PathBuf>,

    /// Directory for mutex files. Defaults to `runtime_dir`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mutex_dir: Option<PathBuf>,

    /// Owner recorded in lock holder metadata. Defaults to the login user.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,

    /// Minutes after which a held lock file is reported as possibly hung.
    #[serde(default = "default_stale_lock_minutes")]
    pub stale_lock_minutes: u32,

    // =========================================================================
    // Output
    // =========================================================================
    /// Directory that receives completion markers.
    #[serde(default = "default_marker_dir")]
    pub marker_dir: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            instance_name: default_instance_name(),
            job_duration_seconds: default_job_duration_seconds(),
            duration_warn_seconds: default_duration_warn_seconds(),
            poll_interval_ms: default_poll_interval_ms(),
            progress_interval_seconds: default_progress_interval_seconds(),
            progress_min_duration_seconds: default_progress_min_duration_seconds(),
            lock_strategy: LockStrategy::default(),
            lock_file: None,
            runtime_dir: None,
            mutex_dir: None,
            owner: None,
            stale_lock_minutes: default_stale_lock_minutes(),
            marker_dir: default_marker_dir(),
        }
    }
}

pub(crate) fn default_instance_name() -> String {
    "jobgate".to_string()
}

pub(crate) fn default_job_duration_seconds() -> i64 {
    30
}

pub(crate) fn default_duration_warn_seconds() -> u64 {
    60 * 60
}

pub(crate) fn default_poll_interval_ms() -> u64 {
    1000
}

pub(crate) fn default_progress_interval_seconds() -> u64 {
    5
}

pub(crate) fn default_progress_min_duration_seconds() -> u64 {
    10
}

pub(crate) fn default_stale_lock_minutes() -> u32 {
    60
}

pub(crate) fn default_marker_dir() -> PathBuf {
    PathBuf::from("markers")
}
