//! Exclusive lock file strategy.
//!
//! The lock file is created with `create_new` semantics and kept open under
//! an exclusive kernel lock for as long as it is held. It carries the holder
//! record and is deleted on release. A holder that dies leaves the file
//! behind but not the kernel lock, so the next acquirer can tell a dead
//! holder (lock free: recovered) from a live or hung one (lock held:
//! contended, with a stale warning once the file is old).

use super::flock::{self, PreviousHolder, Probe};
use super::metadata::HolderRecord;
use super::types::{AcquireOrigin, Contention, LockStrategy};
use crate::error::{JobgateError, Result};
use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tracing::warn;

/// An acquired lock file. `release` deletes it, then unlocks it.
#[derive(Debug)]
pub(super) struct FileLockHandle {
    file: File,
    path: PathBuf,
}

pub(super) enum FileAttempt {
    Acquired(FileLockHandle, AcquireOrigin),
    Contended(Contention),
}

impl FileLockHandle {
    pub(super) fn path(&self) -> &Path {
        &self.path
    }

    pub(super) fn release(self) {
        match fs::remove_file(&self.path) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                warn!(path = %self.path.display(), "lock file vanished before release");
            }
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "failed to delete lock file");
            }
        }
        if let Err(e) = flock::unlock(&self.file) {
            warn!(path = %self.path.display(), error = %e, "failed to unlock lock file");
        }
    }
}

/// Try to take the lock file at `path` without waiting.
///
/// `conflict` runs once the kernel lock is ours and before the holder
/// record is touched; a holder it reports wins. Errors other than
/// contention mean no lock file can be used at all and surface as
/// `JobgateError::Environment`.
pub(super) fn try_acquire<F>(
    path: &Path,
    record: &HolderRecord,
    stale_after: Duration,
    conflict: F,
) -> Result<FileAttempt>
where
    F: Fn() -> Option<Contention>,
{
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
        && !parent.exists()
    {
        fs::create_dir_all(parent).map_err(|e| {
            JobgateError::Environment(format!(
                "failed to create lock directory '{}': {}",
                parent.display(),
                e
            ))
        })?;
    }

    // A holder may release between our failed create and the open of its
    // file; a couple of retries cover that without ever waiting.
    for _ in 0..3 {
        match OpenOptions::new()
            .read(true)
            .write(true)
            .create_new(true)
            .open(path)
        {
            Ok(file) => return claim_created(file, path, record, stale_after, &conflict),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                let file = match OpenOptions::new().read(true).write(true).open(path) {
                    Ok(file) => file,
                    Err(e) if e.kind() == io::ErrorKind::NotFound => continue,
                    Err(e) => return Err(environment("open", path, e)),
                };
                if let Some(attempt) = claim_existing(file, path, record, stale_after, &conflict)? {
                    return Ok(attempt);
                }
            }
            Err(e) => return Err(environment("create", path, e)),
        }
    }

    Ok(FileAttempt::Contended(unknown_holder(path)))
}

fn claim_created(
    mut file: File,
    path: &Path,
    record: &HolderRecord,
    stale_after: Duration,
    conflict: &dyn Fn() -> Option<Contention>,
) -> Result<FileAttempt> {
    match flock::try_lock(&file) {
        Ok(true) => {}
        // Another acquirer or a probe locked the fresh file first.
        Ok(false) => return Ok(FileAttempt::Contended(contention(path, stale_after))),
        Err(e) => {
            let _ = fs::remove_file(path);
            return Err(environment("lock", path, e));
        }
    }

    if let Some(other) = conflict() {
        let _ = fs::remove_file(path);
        let _ = flock::unlock(&file);
        return Ok(FileAttempt::Contended(other));
    }

    if let Err(e) = flock::write_record(&mut file, record) {
        let _ = fs::remove_file(path);
        return Err(environment("write", path, e));
    }

    Ok(FileAttempt::Acquired(
        FileLockHandle {
            file,
            path: path.to_path_buf(),
        },
        AcquireOrigin::Created,
    ))
}

/// Claim a lock file left by a dead holder. `None` means the file was
/// released and unlinked under us and the caller should retry.
fn claim_existing(
    mut file: File,
    path: &Path,
    record: &HolderRecord,
    stale_after: Duration,
    conflict: &dyn Fn() -> Option<Contention>,
) -> Result<Option<FileAttempt>> {
    let locked = flock::try_lock(&file).map_err(|e| environment("lock", path, e))?;
    if !locked {
        return Ok(Some(FileAttempt::Contended(contention(path, stale_after))));
    }
    if !flock::still_linked(&file, path).map_err(|e| environment("inspect", path, e))? {
        return Ok(None);
    }
    if let Some(other) = conflict() {
        let _ = flock::unlock(&file);
        return Ok(Some(FileAttempt::Contended(other)));
    }

    let previous = match flock::read_previous(&mut file) {
        Ok(PreviousHolder::Record(previous)) => Some(previous),
        _ => None,
    };
    flock::write_record(&mut file, record).map_err(|e| environment("write", path, e))?;

    Ok(Some(FileAttempt::Acquired(
        FileLockHandle {
            file,
            path: path.to_path_buf(),
        },
        AcquireOrigin::Recovered { previous },
    )))
}

/// The live holder of the lock file at `path`, if any.
///
/// A file whose kernel lock is free belongs to a dead holder and does not
/// count. A file that cannot be probed is treated as held.
pub(super) fn live_holder(path: &Path, stale_after: Duration) -> Option<Contention> {
    match flock::probe(path) {
        Ok(Probe::Missing) | Ok(Probe::Free) => None,
        Ok(Probe::Held) | Err(_) => Some(contention(path, stale_after)),
    }
}

/// Describe the lock file at `path`, or `None` if there is none.
pub(super) fn inspect(path: &Path, stale_after: Duration) -> Option<Contention> {
    let metadata = fs::metadata(path).ok()?;
    let age = metadata
        .modified()
        .ok()
        .and_then(|modified| SystemTime::now().duration_since(modified).ok());
    let holder = HolderRecord::from_file(path).ok().flatten();

    Some(Contention {
        strategy: LockStrategy::FileLock,
        path: path.to_path_buf(),
        holder,
        age,
        stale: age.is_some_and(|age| age > stale_after),
    })
}

fn contention(path: &Path, stale_after: Duration) -> Contention {
    inspect(path, stale_after).unwrap_or_else(|| unknown_holder(path))
}

fn unknown_holder(path: &Path) -> Contention {
    Contention {
        strategy: LockStrategy::FileLock,
        path: path.to_path_buf(),
        holder: None,
        age: None,
        stale: false,
    }
}

fn environment(action: &str, path: &Path, e: io::Error) -> JobgateError {
    JobgateError::Environment(format!(
        "failed to {} lock file '{}': {}",
        action,
        path.display(),
        e
    ))
}
