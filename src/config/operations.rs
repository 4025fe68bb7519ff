//! Config loading, layering, validation and resolution.

use super::model::Config;
use crate::error::{JobgateError, Result};
use crate::job::{JobSettings, MAX_POLL_INTERVAL};
use crate::lock::{LockSettings, LockStrategy};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variables consulted by `Config::apply_env`.
pub const ENV_INSTANCE_NAME: &str = "JOBGATE_INSTANCE_NAME";
pub const ENV_LOCK_STRATEGY: &str = "JOBGATE_LOCK_STRATEGY";
pub const ENV_DURATION_SECONDS: &str = "JOBGATE_DURATION_SECONDS";
pub const ENV_LOCK_FILE: &str = "JOBGATE_LOCK_FILE";
pub const ENV_MARKER_DIR: &str = "JOBGATE_MARKER_DIR";

/// Login user variables, consulted when no owner is configured.
const USER_VARS: [&str; 2] = ["USER", "USERNAME"];

/// Values given explicitly on the command line. `None` keeps the layer below.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigOverrides {
    pub instance_name: Option<String>,
    pub lock_strategy: Option<LockStrategy>,
    pub job_duration_seconds: Option<i64>,
    pub lock_file: Option<PathBuf>,
    pub runtime_dir: Option<PathBuf>,
    pub marker_dir: Option<PathBuf>,
}

/// Fully resolved configuration handed to the lock and job layers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobConfig {
    pub instance_name: String,
    pub lock_strategy: LockStrategy,
    pub lock: LockSettings,
    pub job: JobSettings,
    pub marker_dir: PathBuf,
}

impl Config {
    /// Load config from a YAML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let content = std::fs::read_to_string(path).map_err(|e| {
            JobgateError::Config(format!(
                "failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;

        Self::from_yaml(&content)
    }

    /// Parse config from a YAML string. Unknown fields are ignored.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(yaml)
            .map_err(|e| JobgateError::Config(format!("failed to parse config YAML: {}", e)))
    }

    #[cfg(test)]
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self)
            .map_err(|e| JobgateError::Internal(format!("failed to serialize config to YAML: {}", e)))
    }

    /// Apply `JOBGATE_*` variables through `lookup`.
    ///
    /// The lookup is injected so the caller decides where the environment
    /// comes from.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(name) = lookup(ENV_INSTANCE_NAME) {
            self.instance_name = name;
        }
        if let Some(strategy) = lookup(ENV_LOCK_STRATEGY) {
            self.lock_strategy = strategy.parse().map_err(|e| {
                JobgateError::Config(format!("{}: {}", ENV_LOCK_STRATEGY, e))
            })?;
        }
        if let Some(duration) = lookup(ENV_DURATION_SECONDS) {
            self.job_duration_seconds = duration.trim().parse().map_err(|_| {
                JobgateError::Config(format!(
                    "{}: '{}' is not a whole number of seconds",
                    ENV_DURATION_SECONDS, duration
                ))
            })?;
        }
        if let Some(path) = lookup(ENV_LOCK_FILE).filter(|p| !p.trim().is_empty()) {
            self.lock_file = Some(PathBuf::from(path));
        }
        if let Some(path) = lookup(ENV_MARKER_DIR).filter(|p| !p.trim().is_empty()) {
            self.marker_dir = PathBuf::from(path);
        }
        if self.owner.is_none() {
            self.owner = USER_VARS
                .iter()
                .find_map(|key| lookup(key).filter(|user| !user.trim().is_empty()));
        }
        Ok(())
    }

    /// Apply command-line overrides.
    pub fn apply_overrides(&mut self, overrides: &ConfigOverrides) {
        if let Some(name) = &overrides.instance_name {
            self.instance_name = name.clone();
        }
        if let Some(strategy) = overrides.lock_strategy {
            self.lock_strategy = strategy;
        }
        if let Some(duration) = overrides.job_duration_seconds {
            self.job_duration_seconds = duration;
        }
        if let Some(path) = &overrides.lock_file {
            self.lock_file = Some(path.clone());
        }
        if let Some(path) = &overrides.runtime_dir {
            self.runtime_dir = Some(path.clone());
        }
        if let Some(path) = &overrides.marker_dir {
            self.marker_dir = path.clone();
        }
    }

    /// Validate config values.
    ///
    /// Validation rules:
    /// - `instance_name` must not be blank
    /// - `job_duration_seconds` must not be negative
    /// - `poll_interval_ms` must be within 1..=1000
    /// - `progress_interval_seconds` and `stale_lock_minutes` must be positive
    pub fn validate(&self) -> Result<()> {
        if self.instance_name.trim().is_empty() {
            return Err(JobgateError::Config(
                "instance_name must not be empty".to_string(),
            ));
        }

        if self.job_duration_seconds < 0 {
            return Err(JobgateError::Config(format!(
                "job_duration_seconds must not be negative (got {})",
                self.job_duration_seconds
            )));
        }

        let max_poll_ms = MAX_POLL_INTERVAL.as_millis() as u64;
        if self.poll_interval_ms == 0 || self.poll_interval_ms > max_poll_ms {
            return Err(JobgateError::Config(format!(
                "poll_interval_ms must be between 1 and {} (got {})",
                max_poll_ms, self.poll_interval_ms
            )));
        }

        if self.progress_interval_seconds == 0 {
            return Err(JobgateError::Config(
                "progress_interval_seconds must be greater than 0".to_string(),
            ));
        }

        if self.stale_lock_minutes == 0 {
            return Err(JobgateError::Config(
                "stale_lock_minutes must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }

    /// Lock settings, with `default_runtime_dir` used when none is configured.
    pub fn lock_settings(&self, default_runtime_dir: &Path) -> LockSettings {
        let runtime_dir = self
            .runtime_dir
            .clone()
            .unwrap_or_else(|| default_runtime_dir.to_path_buf());

        let mut settings = LockSettings::new(runtime_dir)
            .with_stale_after(Duration::from_secs(u64::from(self.stale_lock_minutes) * 60));
        if let Some(path) = &self.lock_file {
            settings = settings.with_lock_file(path);
        }
        if let Some(path) = &self.mutex_dir {
            settings = settings.with_mutex_dir(path);
        }
        if let Some(owner) = &self.owner {
            settings = settings.with_owner(owner);
        }
        settings
    }

    /// Produce the immutable configuration consumed by the core.
    pub fn resolve(&self, default_runtime_dir: &Path) -> JobConfig {
        let job = JobSettings {
            instance: self.instance_name.clone(),
            duration_seconds: self.job_duration_seconds,
            poll_interval: Duration::from_millis(self.poll_interval_ms),
            progress_interval: Duration::from_secs(self.progress_interval_seconds),
            progress_min_duration: Duration::from_secs(self.progress_min_duration_seconds),
            duration_warn_threshold: Duration::from_secs(self.duration_warn_seconds),
        };

        JobConfig {
            instance_name: self.instance_name.clone(),
            lock_strategy: self.lock_strategy,
            lock: self.lock_settings(default_runtime_dir),
            job,
            marker_dir: self.marker_dir.clone(),
        }
    }
}
