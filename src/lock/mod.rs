//! Host-scoped instance locking.
//!
//! An instance lock guarantees that at most one process on the host runs a
//! given named job at a time. Two interchangeable strategies exist:
//!
//! - **Mutex**: an exclusive kernel lock on `jobgate-<hash>.mutex`, where the
//!   hash is derived from the instance name. The OS releases it when the
//!   holder dies; the next acquirer reports that as a recovery.
//! - **FileLock**: an exclusively created `<name>.lock` file carrying the
//!   holder's PID, hostname and acquisition time, kept open under a kernel
//!   lock and deleted on release. A file left by a dead holder is reclaimed
//!   as a recovery. A file whose holder is alive but old is reported as
//!   stale and never removed automatically.
//!
//! Whichever strategy is asked for, an acquirer also checks the other
//! strategy's lock object, so two processes can never hold the same name
//! through different strategies. Acquisition never waits. If the mutex
//! mechanism itself fails, the same attempt falls back to the lock file.
//!
//! # Lock Metadata
//!
//! Both lock objects contain JSON:
//! - `instance`, `strategy`
//! - `pid`, `host`, `owner` (`<owner>@HOST`)
//! - `acquired_at`: RFC3339 timestamp

mod file_lock;
mod flock;
mod inspect;
mod instance;
mod metadata;
mod mutex;
mod types;


pub use inspect::{LockStatus, SlotStatus, clear_lock_file, inspect_lock};
pub use instance::InstanceLock;
pub use metadata::{HolderRecord, format_age};
pub use types::{
    AcquireOrigin, Acquisition, Contention, DEFAULT_STALE_AFTER, LockSettings, LockState,
    LockStrategy, mutex_id,
};
