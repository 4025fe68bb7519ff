//! The record of one job execution.

use crate::exit_codes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use uuid::Uuid;

/// Per-execution identifier used to correlate logs and the completion marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct JobId(Uuid);

impl JobId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.simple())
    }
}

/// Terminal classification of a run. Exactly one holds at completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Success,
    Cancelled,
    Failed,
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobStatus::Success => write!(f, "success"),
            JobStatus::Cancelled => write!(f, "cancelled"),
            JobStatus::Failed => write!(f, "failed"),
        }
    }
}

/// Why a run failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Invalid input detected before any work began.
    Configuration,
    /// Error raised by the work loop itself.
    Execution,
}

/// Structured cause of a failed run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobFailure {
    pub kind: FailureKind,
    pub message: String,
}

impl JobFailure {
    pub fn configuration(message: impl Into<String>) -> Self {
        Self {
            kind: FailureKind::Configuration,
            message: message.into(),
        }
    }

    pub fn execution(message: impl Into<String>) -> Self {
        Self {
            kind: FailureKind::Execution,
            message: message.into(),
        }
    }
}

impl fmt::Display for JobFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            FailureKind::Configuration => write!(f, "configuration error: {}", self.message),
            FailureKind::Execution => write!(f, "execution error: {}", self.message),
        }
    }
}

/// How the work loop ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Completed,
    Cancelled,
    Failed(JobFailure),
}

/// A finalized job run. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobRun {
    id: JobId,
    instance: String,
    started_at: DateTime<Utc>,
    finished_at: DateTime<Utc>,
    duration: Duration,
    status: JobStatus,
    error: Option<JobFailure>,
}

impl JobRun {
    /// Build the terminal record. `error` is present iff the outcome failed.
    pub fn finish(
        id: JobId,
        instance: impl Into<String>,
        started_at: DateTime<Utc>,
        duration: Duration,
        outcome: Outcome,
    ) -> Self {
        let (status, error) = match outcome {
            Outcome::Completed => (JobStatus::Success, None),
            Outcome::Cancelled => (JobStatus::Cancelled, None),
            Outcome::Failed(failure) => (JobStatus::Failed, Some(failure)),
        };
        let finished_at = started_at
            + chrono::Duration::from_std(duration).unwrap_or_else(|_| chrono::Duration::zero());

        Self {
            id,
            instance: instance.into(),
            started_at,
            finished_at,
            duration,
            status,
            error,
        }
    }

    pub fn id(&self) -> JobId {
        self.id
    }

    pub fn instance(&self) -> &str {
        &self.instance
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn finished_at(&self) -> DateTime<Utc> {
        self.finished_at
    }

    /// Wall-clock time of the run, recorded for every outcome.
    pub fn duration(&self) -> Duration {
        self.duration
    }

    pub fn status(&self) -> JobStatus {
        self.status
    }

    pub fn error(&self) -> Option<&JobFailure> {
        self.error.as_ref()
    }

    /// Process exit code for this run.
    ///
    /// Cancellation is a requested graceful stop and exits like success.
    pub fn exit_code(&self) -> i32 {
        match (self.status, &self.error) {
            (JobStatus::Success | JobStatus::Cancelled, _) => exit_codes::SUCCESS,
            (JobStatus::Failed, Some(failure)) if failure.kind == FailureKind::Configuration => {
                exit_codes::CONFIG_ERROR
            }
            (JobStatus::Failed, _) => exit_codes::UNEXPECTED_ERROR,
        }
    }
}
