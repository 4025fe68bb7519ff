//! Progress observations emitted while a job runs.

use super::run::JobId;
use crate::error::Result;
use std::time::Duration;
use tracing::info;

/// Elapsed versus total time of a running job.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Progress {
    pub elapsed: Duration,
    pub total: Duration,
}

impl Progress {
    pub fn new(elapsed: Duration, total: Duration) -> Self {
        Self { elapsed, total }
    }

    /// Percent complete, capped at 100.
    pub fn percent(&self) -> f64 {
        if self.total.is_zero() {
            return 100.0;
        }
        (self.elapsed.as_secs_f64() / self.total.as_secs_f64() * 100.0).min(100.0)
    }
}

/// Receives progress observations.
///
/// Reporting is observational only. An error returned here is treated as
/// an execution failure of the job.
pub trait ProgressSink: Send {
    fn report(&mut self, job: &JobId, progress: &Progress) -> Result<()>;
}

/// Logs progress through `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingProgressSink;

impl ProgressSink for TracingProgressSink {
    fn report(&mut self, job: &JobId, progress: &Progress) -> Result<()> {
        info!(
            job_id = %job,
            percent = format_args!("{:.0}", progress.percent()),
            elapsed_secs = progress.elapsed.as_secs(),
            total_secs = progress.total.as_secs(),
            "job progress"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percent_is_proportional_and_capped() {
        let half = Progress::new(Duration::from_secs(5), Duration::from_secs(10));
        assert!((half.percent() - 50.0).abs() < f64::EPSILON);

        let over = Progress::new(Duration::from_secs(12), Duration::from_secs(10));
        assert!((over.percent() - 100.0).abs() < f64::EPSILON);

        let empty = Progress::new(Duration::ZERO, Duration::ZERO);
        assert!((empty.percent() - 100.0).abs() < f64::EPSILON);
    }
}
