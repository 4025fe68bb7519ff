//! Cancellable job execution.
//!
//! A `JobRunner` executes one interruptible unit of work: a wait loop that
//! checks its `CancelToken` at least once a second, reports progress for
//! long runs, and classifies the result as success, cancelled or failed.
//! Every terminal outcome leaves a completion marker behind (best-effort).

mod cancel;
mod marker;
mod progress;
mod run;
mod runner;


pub use cancel::{CancelSource, CancelToken, cancel_pair};
pub use marker::{CompletionMarker, MarkerStatus, MarkerWriter};
pub use progress::{Progress, ProgressSink, TracingProgressSink};
pub use run::{FailureKind, JobFailure, JobId, JobRun, JobStatus, Outcome};
pub use runner::{JobRunner, JobSettings, MAX_POLL_INTERVAL};
