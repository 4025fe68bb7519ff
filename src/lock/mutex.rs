//! Host-wide named mutex backed by a kernel file lock.
//!
//! The mutex is an exclusive `flock`/`LockFileEx` lock on a file whose name
//! is derived from the instance name. The OS drops the lock when the holding
//! process exits for any reason, so a dead holder never blocks a new one.
//!
//! A clean release truncates the holder record before unlocking. Finding a
//! record after winning the lock therefore means the previous holder died
//! while holding it. The file itself is never deleted: unlinking a locked
//! file lets a concurrent opener lock a different inode.

use super::flock::{self, PreviousHolder, Probe};
use super::metadata::HolderRecord;
use super::types::{AcquireOrigin, Contention, LockStrategy};
use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// An acquired mutex. Dropping the file closes it and releases the lock.
#[derive(Debug)]
pub(super) struct MutexHandle {
    file: File,
    path: PathBuf,
}

pub(super) enum MutexAttempt {
    Acquired(MutexHandle, AcquireOrigin),
    Contended(Contention),
}

impl MutexHandle {
    pub(super) fn path(&self) -> &Path {
        &self.path
    }

    /// Clear the holder record, then unlock.
    pub(super) fn release(self) {
        if let Err(e) = self.file.set_len(0) {
            warn!(path = %self.path.display(), error = %e, "failed to clear mutex holder record");
        }
        if let Err(e) = flock::unlock(&self.file) {
            warn!(path = %self.path.display(), error = %e, "failed to unlock mutex");
        }
    }
}

/// Try to take the mutex at `path` without waiting.
///
/// `conflict` runs once the kernel lock is ours and before the holder
/// record is touched; a holder it reports wins and the mutex is unlocked
/// again. Any `Err` is a failure of the mechanism itself (unsupported
/// filesystem, unwritable directory, ...), never contention.
pub(super) fn try_acquire<F>(
    path: &Path,
    record: &HolderRecord,
    conflict: F,
) -> io::Result<MutexAttempt>
where
    F: FnOnce() -> Option<Contention>,
{
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)?;
    }

    let (mut file, created) = match OpenOptions::new()
        .read(true)
        .write(true)
        .create_new(true)
        .open(path)
    {
        Ok(file) => (file, true),
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
            (OpenOptions::new().read(true).write(true).open(path)?, false)
        }
        Err(e) => return Err(e),
    };

    if !flock::try_lock(&file)? {
        let holder = match flock::read_previous(&mut file) {
            Ok(PreviousHolder::Record(record)) => Some(record),
            _ => None,
        };
        return Ok(MutexAttempt::Contended(contention(path, holder)));
    }

    if let Some(other) = conflict() {
        flock::unlock(&file)?;
        return Ok(MutexAttempt::Contended(other));
    }

    let origin = match flock::read_previous(&mut file)? {
        PreviousHolder::Record(previous) => AcquireOrigin::Recovered {
            previous: Some(previous),
        },
        PreviousHolder::Garbled => AcquireOrigin::Recovered { previous: None },
        PreviousHolder::Clean if created => AcquireOrigin::Created,
        PreviousHolder::Clean => AcquireOrigin::Existing,
    };

    flock::write_record(&mut file, record)?;

    Ok(MutexAttempt::Acquired(
        MutexHandle {
            file,
            path: path.to_path_buf(),
        },
        origin,
    ))
}

/// Read the holder record of the mutex at `path` without locking it.
pub(super) fn peek_holder(path: &Path) -> Option<HolderRecord> {
    let content = fs::read_to_string(path).ok()?;
    HolderRecord::parse(&content)
}

/// The live holder of the mutex at `path`, if any.
///
/// A mutex that cannot be probed counts as free: that is the situation in
/// which acquirers fall back to the lock file.
pub(super) fn live_holder(path: &Path) -> Option<Contention> {
    match flock::probe(path) {
        Ok(Probe::Held) => Some(contention(path, peek_holder(path))),
        Ok(Probe::Missing) | Ok(Probe::Free) => None,
        Err(e) => {
            debug!(path = %path.display(), error = %e, "mutex could not be probed");
            None
        }
    }
}

fn contention(path: &Path, holder: Option<HolderRecord>) -> Contention {
    Contention {
        strategy: LockStrategy::Mutex,
        path: path.to_path_buf(),
        holder,
        age: None,
        stale: false,
    }
}
