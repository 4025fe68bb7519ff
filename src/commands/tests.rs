//! End-to-end tests for the command layer.

use super::*;
use crate::cli::{LockClearArgs, RunArgs, TargetArgs};
use crate::config::JobConfig;
use crate::error::JobgateError;
use crate::exit_codes;
use crate::job::{CancelToken, JobSettings, cancel_pair};
use crate::lock::{Acquisition, InstanceLock, LockSettings, LockStrategy};
use serial_test::serial;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tempfile::TempDir;

fn job_config(temp: &TempDir, name: &str, duration_seconds: i64) -> JobConfig {
    JobConfig {
        instance_name: name.to_string(),
        lock_strategy: LockStrategy::Mutex,
        lock: LockSettings::new(temp.path().join("run")),
        job: JobSettings::new(name, duration_seconds),
        marker_dir: temp.path().join("markers"),
    }
}

fn marker_names(dir: &Path) -> Vec<String> {
    match fs::read_dir(dir) {
        Ok(entries) => entries
            .filter_map(|e| e.ok())
            .map(|e| e.file_name().to_string_lossy().to_string())
            .collect(),
        Err(_) => Vec::new(),
    }
}

fn target(temp: &TempDir, name: &str) -> TargetArgs {
    TargetArgs {
        config: None,
        name: Some(name.to_string()),
        lock_file: None,
        runtime_dir: Some(temp.path().join("run")),
    }
}

#[tokio::test]
async fn test_cancelled_run_exits_zero_and_frees_the_lock() {
    let temp = TempDir::new().unwrap();
    let job = job_config(&temp, "nightly", 60);

    let (source, token) = cancel_pair();
    let canceller = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(1)).await;
        source.cancel();
        source
    });

    let started = Instant::now();
    let code = run::execute(&job, token).await.unwrap();
    let _source = canceller.await.unwrap();

    assert_eq!(code, exit_codes::SUCCESS);
    assert!(started.elapsed() < Duration::from_secs(3));

    let markers = marker_names(&job.marker_dir);
    assert_eq!(markers.len(), 1);
    assert!(markers[0].starts_with("nightly-"));
    assert!(markers[0].ends_with(".cancelled.json"));

    let mut again = InstanceLock::new("nightly", LockStrategy::Mutex, job.lock.clone()).unwrap();
    assert!(again.try_acquire().unwrap().is_acquired());
}

#[tokio::test]
async fn test_completed_run_writes_success_marker() {
    let temp = TempDir::new().unwrap();
    let job = job_config(&temp, "hourly", 0);

    let code = run::execute(&job, CancelToken::never()).await.unwrap();

    assert_eq!(code, exit_codes::SUCCESS);
    let markers = marker_names(&job.marker_dir);
    assert_eq!(markers.len(), 1);
    assert!(markers[0].ends_with(".success.json"));
}

#[tokio::test]
async fn test_contended_lock_exits_two_without_running() {
    let temp = TempDir::new().unwrap();
    let job = job_config(&temp, "nightly", 0);

    let mut holder = InstanceLock::new("nightly", LockStrategy::Mutex, job.lock.clone()).unwrap();
    assert!(matches!(
        holder.try_acquire().unwrap(),
        Acquisition::Acquired { .. }
    ));

    let code = run::execute(&job, CancelToken::never()).await.unwrap();

    assert_eq!(code, exit_codes::LOCK_NOT_ACQUIRED);
    assert!(marker_names(&job.marker_dir).is_empty());
    holder.release();
}

#[tokio::test]
async fn test_file_lock_contention_exits_two() {
    let temp = TempDir::new().unwrap();
    let mut job = job_config(&temp, "nightly", 0);
    job.lock_strategy = LockStrategy::FileLock;

    let mut holder =
        InstanceLock::new("nightly", LockStrategy::FileLock, job.lock.clone()).unwrap();
    assert!(holder.try_acquire().unwrap().is_acquired());

    let code = run::execute(&job, CancelToken::never()).await.unwrap();
    assert_eq!(code, exit_codes::LOCK_NOT_ACQUIRED);
}

#[tokio::test]
async fn test_negative_duration_exits_three_with_error_marker() {
    let temp = TempDir::new().unwrap();
    let job = job_config(&temp, "nightly", -5);

    let code = run::execute(&job, CancelToken::never()).await.unwrap();

    assert_eq!(code, exit_codes::CONFIG_ERROR);
    let markers = marker_names(&job.marker_dir);
    assert_eq!(markers.len(), 1);
    assert!(markers[0].ends_with(".error.json"));
    // No lock object was ever created.
    assert!(!job.lock.runtime_dir.exists());
}

#[tokio::test]
async fn test_negative_duration_is_rejected_even_while_lock_is_held() {
    let temp = TempDir::new().unwrap();
    let job = job_config(&temp, "nightly", -5);

    let mut holder = InstanceLock::new("nightly", LockStrategy::Mutex, job.lock.clone()).unwrap();
    assert!(holder.try_acquire().unwrap().is_acquired());

    let code = run::execute(&job, CancelToken::never()).await.unwrap();
    assert_eq!(code, exit_codes::CONFIG_ERROR);
    holder.release();
}

#[tokio::test]
async fn test_unusable_lock_location_is_environment_error() {
    let temp = TempDir::new().unwrap();
    let blocker = temp.path().join("not-a-dir");
    fs::write(&blocker, "x").unwrap();

    let mut job = job_config(&temp, "nightly", 0);
    job.lock_strategy = LockStrategy::FileLock;
    job.lock = job.lock.with_lock_file(blocker.join("nightly.lock"));

    let err = run::execute(&job, CancelToken::never()).await.unwrap_err();

    assert!(matches!(err, JobgateError::Environment(_)));
    assert_eq!(err.exit_code(), exit_codes::CONFIG_ERROR);
}

#[test]
#[serial]
fn test_load_config_layers_file_then_flags() {
    let temp = TempDir::new().unwrap();
    let config_path = temp.path().join("jobgate.yaml");
    fs::write(
        &config_path,
        "instance_name: from-file\njob_duration_seconds: 12\nstale_lock_minutes: 5\n",
    )
    .unwrap();

    let args = RunArgs {
        target: TargetArgs {
            config: Some(config_path),
            name: Some("from-flag".to_string()),
            lock_file: None,
            runtime_dir: None,
        },
        strategy: None,
        duration: None,
        marker_dir: None,
    };

    let config = load_config(&args.target, &args.overrides()).unwrap();
    assert_eq!(config.instance_name, "from-flag");
    assert_eq!(config.job_duration_seconds, 12);
    assert_eq!(config.stale_lock_minutes, 5);
}

struct EnvGuard(&'static [&'static str]);

impl Drop for EnvGuard {
    fn drop(&mut self) {
        for key in self.0 {
            // SAFETY: callers are #[serial], so no other test touches the environment.
            unsafe { std::env::remove_var(key) };
        }
    }
}

#[test]
#[serial]
fn test_load_config_env_sits_between_file_and_flags() {
    let temp = TempDir::new().unwrap();
    let config_path = temp.path().join("jobgate.yaml");
    fs::write(
        &config_path,
        "instance_name: from-file\njob_duration_seconds: 12\nlock_strategy: mutex\n",
    )
    .unwrap();

    let _guard = EnvGuard(&[
        crate::config::ENV_DURATION_SECONDS,
        crate::config::ENV_LOCK_STRATEGY,
    ]);
    // SAFETY: this test is #[serial].
    unsafe {
        std::env::set_var(crate::config::ENV_DURATION_SECONDS, "45");
        std::env::set_var(crate::config::ENV_LOCK_STRATEGY, "file_lock");
    }

    let args = RunArgs {
        target: TargetArgs {
            config: Some(config_path),
            name: None,
            lock_file: None,
            runtime_dir: None,
        },
        strategy: Some(LockStrategy::Mutex),
        duration: None,
        marker_dir: None,
    };

    let config = load_config(&args.target, &args.overrides()).unwrap();
    assert_eq!(config.instance_name, "from-file");
    assert_eq!(config.job_duration_seconds, 45);
    assert_eq!(config.lock_strategy, LockStrategy::Mutex);
}

#[test]
#[serial]
fn test_load_config_rejects_negative_duration_flag() {
    let temp = TempDir::new().unwrap();
    let args = RunArgs {
        target: target(&temp, "nightly"),
        strategy: None,
        duration: Some(-1),
        marker_dir: None,
    };

    let err = load_config(&args.target, &args.overrides()).unwrap_err();
    assert!(matches!(err, JobgateError::Config(_)));
}

#[test]
#[serial]
fn test_load_config_missing_file_is_config_error() {
    let temp = TempDir::new().unwrap();
    let mut args = target(&temp, "nightly");
    args.config = Some(temp.path().join("missing.yaml"));

    let err = load_config(&args, &args.overrides()).unwrap_err();
    assert!(matches!(err, JobgateError::Config(_)));
}

#[test]
#[serial]
fn test_lock_status_reports_free_and_held() {
    let temp = TempDir::new().unwrap();

    let code = lock::cmd_lock_status(target(&temp, "nightly")).unwrap();
    assert_eq!(code, exit_codes::SUCCESS);

    let settings = LockSettings::new(temp.path().join("run"));
    let mut holder = InstanceLock::new("nightly", LockStrategy::FileLock, settings).unwrap();
    assert!(holder.try_acquire().unwrap().is_acquired());

    let code = lock::cmd_lock_status(target(&temp, "nightly")).unwrap();
    assert_eq!(code, exit_codes::LOCK_NOT_ACQUIRED);
}

#[test]
#[serial]
fn test_lock_clear_requires_force() {
    let temp = TempDir::new().unwrap();
    let settings = LockSettings::new(temp.path().join("run"));
    let lock_path: PathBuf = settings.lock_file_path("nightly");
    fs::create_dir_all(lock_path.parent().unwrap()).unwrap();
    fs::write(&lock_path, "{}").unwrap();

    let err = lock::cmd_lock_clear(LockClearArgs {
        target: target(&temp, "nightly"),
        force: false,
    })
    .unwrap_err();
    assert!(matches!(err, JobgateError::Config(_)));
    assert!(lock_path.exists());

    let code = lock::cmd_lock_clear(LockClearArgs {
        target: target(&temp, "nightly"),
        force: true,
    })
    .unwrap();
    assert_eq!(code, exit_codes::SUCCESS);
    assert!(!lock_path.exists());
}

#[test]
fn test_default_runtime_dir_is_under_temp() {
    assert!(default_runtime_dir().starts_with(std::env::temp_dir()));
}
