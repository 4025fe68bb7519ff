//! Implementation of the `jobgate run` command.
//!
//! 1. Resolve configuration (errors exit 3 before any lock is touched)
//! 2. Try to acquire the instance lock (held elsewhere: exit 2)
//! 3. Run the job with a token cancelled by SIGINT/SIGTERM
//! 4. Release the lock once the run and its marker are finished
//! 5. Exit with the code derived from the run status

use super::{default_runtime_dir, load_config};
use crate::cli::RunArgs;
use crate::config::JobConfig;
use crate::error::Result;
use crate::exit_codes;
use crate::job::{CancelToken, JobRunner, MarkerWriter, cancel_pair};
use crate::lock::{Acquisition, InstanceLock};
use crate::signals;
use tracing::warn;

pub(super) async fn cmd_run(args: RunArgs) -> Result<i32> {
    let config = load_config(&args.target, &args.overrides())?;
    let job = config.resolve(&default_runtime_dir());

    let (source, token) = cancel_pair();
    let listener = signals::spawn_shutdown_listener(source);
    let result = execute(&job, token).await;
    listener.abort();
    result
}

/// Acquire, run, release. Returns the process exit code.
///
/// The lock is released only after the run loop has ended and its marker
/// has been attempted. If this future is dropped or unwinds, the lock is
/// released when `InstanceLock` drops.
pub(super) async fn execute(job: &JobConfig, cancel: CancelToken) -> Result<i32> {
    let markers = MarkerWriter::new(&job.marker_dir);

    // Invalid settings never take the lock; the runner still records the
    // rejection in an error marker.
    if let Err(failure) = job.job.duration() {
        warn!(instance = %job.instance_name, error = %failure, "job rejected before locking");
        let run = JobRunner::new(job.job.clone(), markers).run(cancel).await;
        return Ok(run.exit_code());
    }

    let mut lock = InstanceLock::new(&job.instance_name, job.lock_strategy, job.lock.clone())?;

    if let Acquisition::NotAcquired { reason } = lock.try_acquire()? {
        let holder = reason
            .holder
            .as_ref()
            .map(|h| format!(" (pid {} on {})", h.pid, h.host))
            .unwrap_or_default();
        warn!(
            instance = %job.instance_name,
            "another instance is already running{}; exiting",
            holder
        );
        return Ok(exit_codes::LOCK_NOT_ACQUIRED);
    }

    let runner = JobRunner::new(job.job.clone(), markers);
    let run = runner.run(cancel).await;
    lock.release();

    println!(
        "{}: {} after {:.1}s (job {})",
        run.instance(),
        run.status(),
        run.duration().as_secs_f64(),
        run.id()
    );

    Ok(run.exit_code())
}
