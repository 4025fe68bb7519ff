//! Holder metadata stored inside lock objects.

use super::types::LockStrategy;
use crate::error::{JobgateError, Result};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Who holds a lock, written into the lock object for diagnosability.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HolderRecord {
    /// Instance name the lock was taken for.
    pub instance: String,

    /// Strategy that took the lock.
    pub strategy: LockStrategy,

    /// Process ID of the holder.
    pub pid: u32,

    /// Hostname of the holder.
    pub host: String,

    /// Owner string (`user@HOST`).
    pub owner: String,

    /// When the lock was acquired (RFC3339, UTC).
    pub acquired_at: DateTime<Utc>,
}

impl HolderRecord {
    /// Describe the current process as a lock holder acting for `owner`.
    pub fn current(instance: &str, strategy: LockStrategy, owner: &str) -> Self {
        let host = hostname_string();
        Self {
            instance: instance.to_string(),
            strategy,
            pid: std::process::id(),
            owner: format!("{}@{}", owner, host),
            host,
            acquired_at: Utc::now(),
        }
    }

    /// Parse a record, returning `None` for empty or unreadable content.
    pub fn parse(content: &str) -> Option<Self> {
        let trimmed = content.trim();
        if trimmed.is_empty() {
            return None;
        }
        serde_json::from_str(trimmed).ok()
    }

    /// Read a record from a lock file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Option<Self>> {
        let content = fs::read_to_string(path.as_ref()).map_err(|e| {
            JobgateError::Io(format!(
                "failed to read lock file '{}': {}",
                path.as_ref().display(),
                e
            ))
        })?;
        Ok(Self::parse(&content))
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| JobgateError::Internal(format!("failed to serialize lock holder: {}", e)))
    }

    pub fn age(&self) -> Duration {
        Utc::now().signed_duration_since(self.acquired_at)
    }

    /// Human-readable age, e.g. `2h 5m`.
    pub fn age_string(&self) -> String {
        match self.age().to_std() {
            Ok(age) => format_age(age),
            Err(_) => "0m".to_string(),
        }
    }
}

/// Format a duration the way lock diagnostics print ages.
pub fn format_age(age: std::time::Duration) -> String {
    let minutes = age.as_secs() / 60;
    let hours = minutes / 60;
    let days = hours / 24;

    if days > 0 {
        format!("{}d {}h", days, hours % 24)
    } else if hours > 0 {
        format!("{}h {}m", hours, minutes % 60)
    } else {
        format!("{}m", minutes)
    }
}

fn hostname_string() -> String {
    hostname::get()
        .map(|h| h.to_string_lossy().to_string())
        .unwrap_or_else(|_| "unknown".to_string())
}
