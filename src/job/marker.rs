//! Completion markers: one small JSON record per finished run.
//!
//! Files are named `<instance>-<id>.<status>.json` with status `success`,
//! `cancelled` or `error`. Writing is best-effort: a failed write is logged
//! and never changes the run's status.

use super::run::{JobRun, JobStatus};
use crate::error::{JobgateError, Result};
use crate::fs::{atomic_write_file, safe_file_stem};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use tracing::{debug, warn};

/// Status recorded in a marker file name and body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarkerStatus {
    Success,
    Cancelled,
    Error,
}

impl From<JobStatus> for MarkerStatus {
    fn from(status: JobStatus) -> Self {
        match status {
            JobStatus::Success => MarkerStatus::Success,
            JobStatus::Cancelled => MarkerStatus::Cancelled,
            JobStatus::Failed => MarkerStatus::Error,
        }
    }
}

impl fmt::Display for MarkerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MarkerStatus::Success => write!(f, "success"),
            MarkerStatus::Cancelled => write!(f, "cancelled"),
            MarkerStatus::Error => write!(f, "error"),
        }
    }
}

/// Persisted record of one run's outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionMarker {
    pub id: String,
    pub instance: String,
    pub status: MarkerStatus,
    /// When the marker was produced (UTC).
    pub timestamp: DateTime<Utc>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub duration_ms: u64,
    pub host: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub error: Option<String>,
}

impl CompletionMarker {
    pub fn from_run(run: &JobRun, host: &str) -> Self {
        Self {
            id: run.id().to_string(),
            instance: run.instance().to_string(),
            status: run.status().into(),
            timestamp: Utc::now(),
            started_at: run.started_at(),
            finished_at: run.finished_at(),
            duration_ms: u64::try_from(run.duration().as_millis()).unwrap_or(u64::MAX),
            host: host.to_string(),
            error: run.error().map(ToString::to_string),
        }
    }

    pub fn file_name(&self) -> String {
        format!(
            "{}-{}.{}.json",
            safe_file_stem(&self.instance),
            self.id,
            self.status
        )
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| JobgateError::Internal(format!("failed to serialize marker: {}", e)))
    }
}

/// Writes completion markers into one directory.
#[derive(Debug, Clone)]
pub struct MarkerWriter {
    dir: PathBuf,
    host: String,
}

impl MarkerWriter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        let host = hostname::get()
            .map(|h| h.to_string_lossy().to_string())
            .unwrap_or_else(|_| "unknown".to_string());
        Self {
            dir: dir.into(),
            host,
        }
    }

    /// Write the marker, propagating any failure.
    pub fn try_write(&self, run: &JobRun) -> Result<PathBuf> {
        let marker = CompletionMarker::from_run(run, &self.host);
        let path = self.dir.join(marker.file_name());
        atomic_write_file(&path, &marker.to_json()?)?;
        Ok(path)
    }

    /// Best-effort write: failures are logged and swallowed.
    pub fn write(&self, run: &JobRun) -> Option<PathBuf> {
        match self.try_write(run) {
            Ok(path) => {
                debug!(job_id = %run.id(), path = %path.display(), "completion marker written");
                Some(path)
            }
            Err(e) => {
                warn!(
                    job_id = %run.id(),
                    dir = %self.dir.display(),
                    error = %e,
                    "failed to write completion marker"
                );
                None
            }
        }
    }
}
