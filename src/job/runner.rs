//! Drives one cancellable unit of work to a terminal outcome.

use super::cancel::CancelToken;
use super::marker::MarkerWriter;
use super::progress::{Progress, ProgressSink, TracingProgressSink};
use super::run::{JobFailure, JobId, JobRun, Outcome};
use chrono::Utc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{info, warn};

/// Upper bound on how long the run loop waits between cancellation checks.
pub const MAX_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Inputs of one job run, resolved by the configuration layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobSettings {
    /// Instance name, recorded in logs and the marker.
    pub instance: String,

    /// Requested work duration. Negative values are rejected, never clamped.
    pub duration_seconds: i64,

    /// Cancellation polling interval, capped at `MAX_POLL_INTERVAL`.
    pub poll_interval: Duration,

    /// Time between progress observations.
    pub progress_interval: Duration,

    /// Runs shorter than this report no progress.
    pub progress_min_duration: Duration,

    /// Durations above this are accepted with a warning.
    pub duration_warn_threshold: Duration,
}

impl JobSettings {
    pub fn new(instance: impl Into<String>, duration_seconds: i64) -> Self {
        Self {
            instance: instance.into(),
            duration_seconds,
            poll_interval: MAX_POLL_INTERVAL,
            progress_interval: Duration::from_secs(5),
            progress_min_duration: Duration::from_secs(10),
            duration_warn_threshold: Duration::from_secs(60 * 60),
        }
    }

    /// Validated work duration.
    pub fn duration(&self) -> Result<Duration, JobFailure> {
        u64::try_from(self.duration_seconds)
            .map(Duration::from_secs)
            .map_err(|_| {
                JobFailure::configuration(format!(
                    "job duration must not be negative (got {}s)",
                    self.duration_seconds
                ))
            })
    }
}

/// Executes a single job run.
///
/// `run` consumes the runner, so one runner can never execute twice. The
/// lifecycle is `Idle` (constructed) → `Running` → terminal `JobRun`.
pub struct JobRunner<S = TracingProgressSink> {
    settings: JobSettings,
    markers: MarkerWriter,
    sink: S,
}

impl JobRunner<TracingProgressSink> {
    pub fn new(settings: JobSettings, markers: MarkerWriter) -> Self {
        Self::with_sink(settings, markers, TracingProgressSink)
    }
}

impl<S: ProgressSink> JobRunner<S> {
    pub fn with_sink(settings: JobSettings, markers: MarkerWriter, sink: S) -> Self {
        Self {
            settings,
            markers,
            sink,
        }
    }

    /// Run the job until it completes, is cancelled, or fails.
    ///
    /// A completion marker is attempted before returning, whatever the
    /// outcome. Invalid settings produce a `Failed` run without entering the
    /// work loop.
    pub async fn run(mut self, cancel: CancelToken) -> JobRun {
        let id = JobId::new();
        let started_at = Utc::now();
        let clock = Instant::now();

        let outcome = match self.settings.duration() {
            Ok(total) => {
                if total > self.settings.duration_warn_threshold {
                    warn!(
                        job_id = %id,
                        duration_secs = total.as_secs(),
                        "job duration is unusually long"
                    );
                }
                info!(
                    job_id = %id,
                    instance = %self.settings.instance,
                    duration_secs = total.as_secs(),
                    "job started"
                );
                self.work(&id, total, &cancel).await
            }
            Err(failure) => {
                warn!(job_id = %id, error = %failure, "job rejected before start");
                Outcome::Failed(failure)
            }
        };

        let run = JobRun::finish(
            id,
            self.settings.instance.as_str(),
            started_at,
            clock.elapsed(),
            outcome,
        );

        match run.error() {
            Some(failure) => warn!(
                job_id = %run.id(),
                status = %run.status(),
                elapsed_ms = run.duration().as_millis() as u64,
                error = %failure,
                "job finished"
            ),
            None => info!(
                job_id = %run.id(),
                status = %run.status(),
                elapsed_ms = run.duration().as_millis() as u64,
                "job finished"
            ),
        }

        self.markers.write(&run);
        run
    }

    async fn work(&mut self, id: &JobId, total: Duration, cancel: &CancelToken) -> Outcome {
        let poll = self
            .settings
            .poll_interval
            .clamp(Duration::from_millis(1), MAX_POLL_INTERVAL);
        let report_progress =
            total >= self.settings.progress_min_duration && !self.settings.progress_interval.is_zero();

        let started = Instant::now();
        // None when the duration is past what the clock can represent.
        let deadline = started.checked_add(total);
        let mut next_report = started.checked_add(self.settings.progress_interval);

        loop {
            if cancel.is_cancelled() {
                return Outcome::Cancelled;
            }
            let now = Instant::now();
            let step = match deadline {
                Some(deadline) if now >= deadline => return Outcome::Completed,
                Some(deadline) => poll.min(deadline - now),
                None => poll,
            };

            tokio::select! {
                _ = tokio::time::sleep(step) => {}
                _ = cancel.cancelled() => return Outcome::Cancelled,
            }

            let now = Instant::now();
            let due = next_report.is_some_and(|at| now >= at);
            let before_deadline = deadline.is_none_or(|d| now < d);
            if report_progress && due && before_deadline {
                let progress = Progress::new(now - started, total);
                if let Err(e) = self.sink.report(id, &progress) {
                    return Outcome::Failed(JobFailure::execution(format!(
                        "progress reporting failed: {}",
                        e
                    )));
                }
                while let Some(at) = next_report
                    && at <= now
                {
                    next_report = at.checked_add(self.settings.progress_interval);
                }
            }
        }
    }
}
