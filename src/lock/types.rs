//! Lock strategy, state and acquisition result types.

use super::metadata::HolderRecord;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

/// Default age after which a held lock file is reported as possibly hung.
pub const DEFAULT_STALE_AFTER: Duration = Duration::from_secs(60 * 60);

/// Exclusivity mechanism used for an instance lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LockStrategy {
    /// Kernel-held exclusive lock on a hashed, host-wide name. Released by
    /// the OS when the holder dies.
    #[default]
    Mutex,
    /// Exclusively created lock file, deleted on release.
    FileLock,
}

impl LockStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            LockStrategy::Mutex => "mutex",
            LockStrategy::FileLock => "file_lock",
        }
    }
}

impl fmt::Display for LockStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LockStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mutex" => Ok(Self::Mutex),
            "file_lock" | "file-lock" | "filelock" | "file" => Ok(Self::FileLock),
            other => Err(format!(
                "unknown lock strategy '{}' (expected 'mutex' or 'file_lock')",
                other
            )),
        }
    }
}

/// Lifecycle state of an `InstanceLock`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockState {
    /// Never acquired (or every attempt so far was refused).
    Unlocked,
    /// Exclusively held by this instance. The only state in which a job may run.
    Held,
    /// Held earlier and released since.
    Released,
}

/// How a successful acquisition came about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AcquireOrigin {
    /// The lock object did not exist and was created by this call.
    Created,
    /// The lock object existed and was free.
    Existing,
    /// The previous holder terminated without releasing.
    Recovered { previous: Option<HolderRecord> },
}

/// Details about a lock held by someone else.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Contention {
    /// Strategy whose lock object was found held.
    pub strategy: LockStrategy,

    /// The lock object on disk.
    pub path: PathBuf,

    /// Holder metadata, when it could be read.
    pub holder: Option<HolderRecord>,

    /// Time since the lock object was last modified, when known.
    pub age: Option<Duration>,

    /// Whether `age` exceeds the configured staleness threshold.
    pub stale: bool,
}

/// Outcome of a non-blocking acquisition attempt.
///
/// Contention is a normal negative result, never an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Acquisition {
    Acquired {
        /// Strategy that actually holds the lock (differs from the requested
        /// one after a fallback).
        strategy: LockStrategy,
        origin: AcquireOrigin,
    },
    NotAcquired { reason: Contention },
}

impl Acquisition {
    pub fn is_acquired(&self) -> bool {
        matches!(self, Acquisition::Acquired { .. })
    }
}

/// Where lock objects live and how they are judged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockSettings {
    /// Directory for derived lock files.
    pub runtime_dir: PathBuf,

    /// Directory for mutex files. Defaults to `runtime_dir`.
    pub mutex_dir: Option<PathBuf>,

    /// Explicit lock file path, overriding the derived one.
    pub lock_file: Option<PathBuf>,

    /// Lock file age after which contention is reported as possibly hung.
    pub stale_after: Duration,

    /// Who is taking the lock, recorded as `<owner>@<host>`.
    pub owner: String,
}

impl LockSettings {
    pub fn new(runtime_dir: impl Into<PathBuf>) -> Self {
        Self {
            runtime_dir: runtime_dir.into(),
            mutex_dir: None,
            lock_file: None,
            stale_after: DEFAULT_STALE_AFTER,
            owner: "unknown".to_string(),
        }
    }

    pub fn with_lock_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.lock_file = Some(path.into());
        self
    }

    pub fn with_mutex_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.mutex_dir = Some(path.into());
        self
    }

    pub fn with_stale_after(mut self, stale_after: Duration) -> Self {
        self.stale_after = stale_after;
        self
    }

    pub fn with_owner(mut self, owner: impl Into<String>) -> Self {
        self.owner = owner.into();
        self
    }

    fn mutex_dir(&self) -> &Path {
        self.mutex_dir.as_deref().unwrap_or(&self.runtime_dir)
    }

    /// Path of the mutex file for `name`.
    pub fn mutex_path(&self, name: &str) -> PathBuf {
        self.mutex_dir().join(format!("{}.mutex", mutex_id(name)))
    }

    /// Path of the lock file for `name`, honouring the override.
    pub fn lock_file_path(&self, name: &str) -> PathBuf {
        match &self.lock_file {
            Some(path) => path.clone(),
            None => self
                .runtime_dir
                .join(format!("{}.lock", crate::fs::safe_file_stem(name))),
        }
    }
}

/// Deterministic host-wide identifier for an instance name.
///
/// The same name always maps to the same identifier, so separate runs of
/// the same job contend for the same lock.
pub fn mutex_id(name: &str) -> String {
    let hash = blake3::hash(name.as_bytes());
    format!("jobgate-{}", &hash.to_hex().as_str()[..32])
}
