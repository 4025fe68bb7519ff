//! The instance lock: strategy selection, fallback, and scoped release.

use super::file_lock::{self, FileAttempt, FileLockHandle};
use super::metadata::{HolderRecord, format_age};
use super::mutex::{self, MutexAttempt, MutexHandle};
use super::types::{AcquireOrigin, Acquisition, Contention, LockSettings, LockState, LockStrategy};
use crate::error::{JobgateError, Result};
use std::path::Path;
use tracing::{debug, info, warn};

/// The OS resource behind a held lock. Exactly one variant is live.
#[derive(Debug)]
enum LockHandle {
    Mutex(MutexHandle),
    File(FileLockHandle),
}

impl LockHandle {
    fn strategy(&self) -> LockStrategy {
        match self {
            LockHandle::Mutex(_) => LockStrategy::Mutex,
            LockHandle::File(_) => LockStrategy::FileLock,
        }
    }

    fn path(&self) -> &Path {
        match self {
            LockHandle::Mutex(handle) => handle.path(),
            LockHandle::File(handle) => handle.path(),
        }
    }

    fn release(self) {
        match self {
            LockHandle::Mutex(handle) => handle.release(),
            LockHandle::File(handle) => handle.release(),
        }
    }
}

/// Host-scoped exclusive lock for one named job.
///
/// The handle is owned by this value and never shared. Dropping it releases
/// the lock, so every exit path of the caller gives the lock back.
///
/// ```ignore
/// let mut lock = InstanceLock::new("nightly", LockStrategy::Mutex, settings)?;
/// if lock.try_acquire()?.is_acquired() {
///     // run the job
/// }
/// lock.release();
/// ```
#[derive(Debug)]
pub struct InstanceLock {
    name: String,
    strategy: LockStrategy,
    settings: LockSettings,
    state: LockState,
    handle: Option<LockHandle>,
    acquisition: Option<Acquisition>,
}

impl InstanceLock {
    /// Create an unlocked instance lock. Fails only for an empty name.
    pub fn new(
        name: impl Into<String>,
        strategy: LockStrategy,
        settings: LockSettings,
    ) -> Result<Self> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(JobgateError::Config(
                "instance name must not be empty".to_string(),
            ));
        }
        Ok(Self {
            name,
            strategy,
            settings,
            state: LockState::Unlocked,
            handle: None,
            acquisition: None,
        })
    }

    /// The strategy that was asked for.
    #[cfg(test)]
    pub fn strategy(&self) -> LockStrategy {
        self.strategy
    }

    pub fn state(&self) -> LockState {
        self.state
    }

    /// The strategy actually holding the lock, if held.
    #[cfg(test)]
    pub fn held_strategy(&self) -> Option<LockStrategy> {
        self.handle.as_ref().map(LockHandle::strategy)
    }

    /// Attempt to take the lock without waiting.
    ///
    /// Returns `NotAcquired` when another live process holds it through
    /// either strategy. A mutex
    /// failure unrelated to contention falls back to the lock file for this
    /// same attempt. Only an unusable environment for the lock file is an
    /// error.
    pub fn try_acquire(&mut self) -> Result<Acquisition> {
        if self.handle.is_some()
            && let Some(acquisition) = &self.acquisition
        {
            debug!(instance = %self.name, "instance lock already held by this handle");
            return Ok(acquisition.clone());
        }

        let acquisition = match self.strategy {
            LockStrategy::Mutex => match self.acquire_mutex() {
                Ok(acquisition) => acquisition,
                Err(e) => {
                    warn!(
                        instance = %self.name,
                        error = %e,
                        "mutex strategy unavailable, falling back to file lock"
                    );
                    self.acquire_file()?
                }
            },
            LockStrategy::FileLock => self.acquire_file()?,
        };

        match &acquisition {
            Acquisition::Acquired { strategy, origin } => {
                self.state = LockState::Held;
                self.log_acquired(*strategy, origin);
            }
            Acquisition::NotAcquired { reason } => self.log_contention(reason),
        }

        self.acquisition = Some(acquisition.clone());
        Ok(acquisition)
    }

    /// Release the lock. Safe to call any number of times, including after
    /// a refused acquisition.
    pub fn release(&mut self) {
        let Some(handle) = self.handle.take() else {
            return;
        };
        let strategy = handle.strategy();
        let path = handle.path().to_path_buf();
        handle.release();
        self.state = LockState::Released;
        self.acquisition = None;
        info!(
            instance = %self.name,
            strategy = %strategy,
            path = %path.display(),
            "released instance lock"
        );
    }

    fn acquire_mutex(&mut self) -> std::io::Result<Acquisition> {
        let path = self.settings.mutex_path(&self.name);
        let lock_file = self.settings.lock_file_path(&self.name);
        let stale_after = self.settings.stale_after;
        let record = self.holder_record(LockStrategy::Mutex);

        // A live lock file holder blocks the mutex too.
        let conflict = || file_lock::live_holder(&lock_file, stale_after);

        Ok(match mutex::try_acquire(&path, &record, conflict)? {
            MutexAttempt::Acquired(handle, origin) => {
                self.handle = Some(LockHandle::Mutex(handle));
                Acquisition::Acquired {
                    strategy: LockStrategy::Mutex,
                    origin,
                }
            }
            MutexAttempt::Contended(reason) => Acquisition::NotAcquired { reason },
        })
    }

    fn acquire_file(&mut self) -> Result<Acquisition> {
        let path = self.settings.lock_file_path(&self.name);
        let mutex_path = self.settings.mutex_path(&self.name);
        let record = self.holder_record(LockStrategy::FileLock);

        let conflict = || mutex::live_holder(&mutex_path);

        Ok(
            match file_lock::try_acquire(&path, &record, self.settings.stale_after, conflict)? {
                FileAttempt::Acquired(handle, origin) => {
                    self.handle = Some(LockHandle::File(handle));
                    Acquisition::Acquired {
                        strategy: LockStrategy::FileLock,
                        origin,
                    }
                }
                FileAttempt::Contended(reason) => Acquisition::NotAcquired { reason },
            },
        )
    }

    fn holder_record(&self, strategy: LockStrategy) -> HolderRecord {
        HolderRecord::current(&self.name, strategy, &self.settings.owner)
    }

    fn log_acquired(&self, strategy: LockStrategy, origin: &AcquireOrigin) {
        let path = self
            .handle
            .as_ref()
            .map(|h| h.path().display().to_string())
            .unwrap_or_default();

        match origin {
            AcquireOrigin::Recovered { previous } => {
                let previous_pid = previous.as_ref().map(|p| p.pid);
                let previous_host = previous.as_ref().map(|p| p.host.as_str());
                info!(
                    instance = %self.name,
                    strategy = %strategy,
                    path = %path,
                    previous_pid = ?previous_pid,
                    previous_host = ?previous_host,
                    "recovered abandoned instance lock; previous holder exited without releasing"
                );
            }
            AcquireOrigin::Created | AcquireOrigin::Existing => {
                info!(
                    instance = %self.name,
                    strategy = %strategy,
                    path = %path,
                    created = matches!(origin, AcquireOrigin::Created),
                    "acquired instance lock"
                );
            }
        }
    }

    fn log_contention(&self, reason: &Contention) {
        let holder = reason
            .holder
            .as_ref()
            .map(|h| format!("pid {} on {}", h.pid, h.host))
            .unwrap_or_else(|| "unknown holder".to_string());

        if reason.stale {
            let age = reason.age.map(format_age).unwrap_or_default();
            warn!(
                instance = %self.name,
                path = %reason.path.display(),
                age = %age,
                holder = %holder,
                "lock file is older than the stale threshold; the other instance may be hung"
            );
        }

        info!(
            instance = %self.name,
            strategy = %reason.strategy,
            holder = %holder,
            "instance lock held by another process"
        );
    }
}

impl Drop for InstanceLock {
    fn drop(&mut self) {
        self.release();
    }
}
