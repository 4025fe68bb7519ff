//! Read-only lock diagnostics and operator-driven lock file clearing.

use super::file_lock;
use super::flock::{self, Probe};
use super::metadata::{HolderRecord, format_age};
use super::mutex;
use super::types::LockSettings;
use crate::error::{JobgateError, Result};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

/// State of one lock object on disk.
#[derive(Debug, Clone)]
pub struct SlotStatus {
    pub path: PathBuf,
    pub held: bool,
    pub holder: Option<HolderRecord>,
    pub age: Option<Duration>,
    pub stale: bool,
    /// A free lock object still carrying a holder record (its holder died).
    pub abandoned: bool,
}

impl SlotStatus {
    fn free(path: PathBuf) -> Self {
        Self {
            path,
            held: false,
            holder: None,
            age: None,
            stale: false,
            abandoned: false,
        }
    }
}

impl std::fmt::Display for SlotStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if !self.held {
            write!(f, "free ({})", self.path.display())?;
            if self.abandoned {
                write!(f, ", previous holder exited without releasing")?;
            }
            return Ok(());
        }
        write!(f, "held ({})", self.path.display())?;
        if let Some(holder) = &self.holder {
            write!(
                f,
                " by {} pid {}, acquired {} ago",
                holder.owner,
                holder.pid,
                holder.age_string()
            )?;
        }
        if let Some(age) = self.age {
            write!(f, ", modified {} ago", format_age(age))?;
        }
        if self.stale {
            write!(f, ", STALE")?;
        }
        Ok(())
    }
}

/// Status of both lock objects for one instance name.
#[derive(Debug, Clone)]
pub struct LockStatus {
    pub name: String,
    pub mutex: SlotStatus,
    pub file: SlotStatus,
}

impl LockStatus {
    pub fn is_held(&self) -> bool {
        self.mutex.held || self.file.held
    }
}

/// Inspect the mutex and the lock file for `name`.
///
/// Each lock object is probed by briefly taking and dropping its kernel
/// lock, so a concurrent acquirer may see contention during the probe.
pub fn inspect_lock(name: &str, settings: &LockSettings) -> Result<LockStatus> {
    let mutex_path = settings.mutex_path(name);
    let mutex = match flock::probe(&mutex_path) {
        Ok(Probe::Missing) => SlotStatus::free(mutex_path),
        Ok(Probe::Free) => SlotStatus {
            abandoned: mutex::peek_holder(&mutex_path).is_some(),
            ..SlotStatus::free(mutex_path)
        },
        Ok(Probe::Held) => SlotStatus {
            held: true,
            holder: mutex::peek_holder(&mutex_path),
            ..SlotStatus::free(mutex_path)
        },
        Err(e) => {
            return Err(JobgateError::Io(format!(
                "failed to probe mutex file '{}': {}",
                mutex_path.display(),
                e
            )));
        }
    };

    let file_path = settings.lock_file_path(name);
    let probe = flock::probe(&file_path);
    let file = match file_lock::inspect(&file_path, settings.stale_after) {
        None => SlotStatus::free(file_path),
        Some(found) if matches!(probe, Ok(Probe::Free)) => SlotStatus {
            path: found.path,
            held: false,
            holder: found.holder,
            age: found.age,
            stale: false,
            abandoned: true,
        },
        Some(found) => SlotStatus {
            path: found.path,
            held: true,
            holder: found.holder,
            age: found.age,
            stale: found.stale,
            abandoned: false,
        },
    };

    Ok(LockStatus {
        name: name.to_string(),
        mutex,
        file,
    })
}

/// Delete the lock file for `name`.
///
/// This is the only way a lock file held by a live process is ever broken;
/// acquisition only reclaims files whose holder has died. Returns the
/// holder record of the removed file, or `None` when there was nothing to
/// clear.
pub fn clear_lock_file(name: &str, settings: &LockSettings) -> Result<Option<SlotStatus>> {
    let path = settings.lock_file_path(name);
    let Some(contention) = file_lock::inspect(&path, settings.stale_after) else {
        return Ok(None);
    };

    fs::remove_file(&path).map_err(|e| {
        JobgateError::Io(format!(
            "failed to clear lock file '{}': {}",
            path.display(),
            e
        ))
    })?;

    Ok(Some(SlotStatus {
        path,
        held: true,
        holder: contention.holder,
        age: contention.age,
        stale: contention.stale,
        abandoned: false,
    }))
}
