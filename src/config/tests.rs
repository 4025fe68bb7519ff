//! Tests for config functionality.

use super::*;
use crate::error::JobgateError;
use crate::lock::LockStrategy;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::TempDir;

fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    move |key| map.get(key).cloned()
}

#[test]
fn test_default_config() {
    let config = Config::default();

    assert_eq!(config.instance_name, "jobgate");
    assert_eq!(config.job_duration_seconds, 30);
    assert_eq!(config.lock_strategy, LockStrategy::Mutex);
    assert_eq!(config.poll_interval_ms, 1000);
    assert_eq!(config.progress_interval_seconds, 5);
    assert_eq!(config.progress_min_duration_seconds, 10);
    assert_eq!(config.stale_lock_minutes, 60);
    assert_eq!(config.duration_warn_seconds, 3600);
    assert_eq!(config.marker_dir, PathBuf::from("markers"));
    assert!(config.lock_file.is_none());
    assert!(config.validate().is_ok());
}

#[test]
fn test_parse_minimal_yaml() {
    let config = Config::from_yaml("").unwrap();
    assert_eq!(config, Config::default());
}

#[test]
fn test_parse_partial_yaml() {
    let yaml = r#"
instance_name: nightly
lock_strategy: file_lock
job_duration_seconds: 60
some_future_key: ignored
"#;
    let config = Config::from_yaml(yaml).unwrap();

    assert_eq!(config.instance_name, "nightly");
    assert_eq!(config.lock_strategy, LockStrategy::FileLock);
    assert_eq!(config.job_duration_seconds, 60);
    assert_eq!(config.stale_lock_minutes, 60);
}

#[test]
fn test_parse_invalid_yaml() {
    let result = Config::from_yaml("lock_strategy: [not, a, strategy]");
    assert!(matches!(result, Err(JobgateError::Config(_))));
}

#[test]
fn test_yaml_roundtrip_keeps_values() {
    let config = Config {
        instance_name: "nightly".to_string(),
        lock_file: Some(PathBuf::from("/var/run/nightly.lock")),
        ..Config::default()
    };
    let parsed = Config::from_yaml(&config.to_yaml().unwrap()).unwrap();
    assert_eq!(parsed, config);
}

#[test]
fn test_load_from_file() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("jobgate.yaml");
    std::fs::write(&path, "instance_name: from-file\n").unwrap();

    let config = Config::load(&path).unwrap();
    assert_eq!(config.instance_name, "from-file");

    let missing = Config::load(temp.path().join("missing.yaml"));
    assert!(matches!(missing, Err(JobgateError::Config(_))));
}

#[test]
fn test_env_overrides_file_values() {
    let mut config = Config::from_yaml("instance_name: from-file\n").unwrap();
    config
        .apply_env(env(&[
            (ENV_INSTANCE_NAME, "from-env"),
            (ENV_LOCK_STRATEGY, "file_lock"),
            (ENV_DURATION_SECONDS, "45"),
            (ENV_LOCK_FILE, "/tmp/env.lock"),
            (ENV_MARKER_DIR, "/tmp/markers"),
        ]))
        .unwrap();

    assert_eq!(config.instance_name, "from-env");
    assert_eq!(config.lock_strategy, LockStrategy::FileLock);
    assert_eq!(config.job_duration_seconds, 45);
    assert_eq!(config.lock_file, Some(PathBuf::from("/tmp/env.lock")));
    assert_eq!(config.marker_dir, PathBuf::from("/tmp/markers"));
}

#[test]
fn test_invalid_env_values_are_config_errors() {
    let mut config = Config::default();
    let result = config.apply_env(env(&[(ENV_DURATION_SECONDS, "soon")]));
    assert!(matches!(result, Err(JobgateError::Config(_))));

    let result = config.apply_env(env(&[(ENV_LOCK_STRATEGY, "semaphore")]));
    assert!(matches!(result, Err(JobgateError::Config(_))));
}

#[test]
fn test_cli_overrides_win_over_env() {
    let mut config = Config::default();
    config
        .apply_env(env(&[
            (ENV_INSTANCE_NAME, "from-env"),
            (ENV_DURATION_SECONDS, "45"),
        ]))
        .unwrap();
    config.apply_overrides(&ConfigOverrides {
        instance_name: Some("from-cli".to_string()),
        lock_strategy: Some(LockStrategy::FileLock),
        ..ConfigOverrides::default()
    });

    assert_eq!(config.instance_name, "from-cli");
    assert_eq!(config.lock_strategy, LockStrategy::FileLock);
    assert_eq!(config.job_duration_seconds, 45);
}

#[test]
fn test_validation_rejects_bad_values() {
    let cases = [
        Config {
            instance_name: "   ".to_string(),
            ..Config::default()
        },
        Config {
            job_duration_seconds: -1,
            ..Config::default()
        },
        Config {
            poll_interval_ms: 0,
            ..Config::default()
        },
        Config {
            poll_interval_ms: 1500,
            ..Config::default()
        },
        Config {
            progress_interval_seconds: 0,
            ..Config::default()
        },
        Config {
            stale_lock_minutes: 0,
            ..Config::default()
        },
    ];

    for config in cases {
        let err = config.validate().unwrap_err();
        assert!(matches!(err, JobgateError::Config(_)), "{:?}", config);
    }
}

#[test]
fn test_resolve_builds_core_settings() {
    let config = Config {
        instance_name: "nightly".to_string(),
        job_duration_seconds: 60,
        poll_interval_ms: 250,
        stale_lock_minutes: 5,
        mutex_dir: Some(PathBuf::from("/run/mutexes")),
        ..Config::default()
    };

    let resolved = config.resolve(Path::new("/tmp/jobgate"));

    assert_eq!(resolved.instance_name, "nightly");
    assert_eq!(resolved.lock.runtime_dir, PathBuf::from("/tmp/jobgate"));
    assert_eq!(resolved.lock.stale_after, Duration::from_secs(300));
    assert_eq!(
        resolved.lock.lock_file_path("nightly"),
        PathBuf::from("/tmp/jobgate/nightly.lock")
    );
    assert!(resolved.lock.mutex_path("nightly").starts_with("/run/mutexes"));
    assert_eq!(resolved.job.duration_seconds, 60);
    assert_eq!(resolved.job.poll_interval, Duration::from_millis(250));
    assert_eq!(resolved.job.instance, "nightly");
}

#[test]
fn test_resolve_prefers_configured_paths() {
    let config = Config {
        runtime_dir: Some(PathBuf::from("/srv/locks")),
        lock_file: Some(PathBuf::from("/srv/custom.lock")),
        ..Config::default()
    };

    let resolved = config.resolve(Path::new("/tmp/jobgate"));

    assert_eq!(resolved.lock.runtime_dir, PathBuf::from("/srv/locks"));
    assert_eq!(
        resolved.lock.lock_file_path("anything"),
        PathBuf::from("/srv/custom.lock")
    );
}

#[test]
fn test_owner_comes_from_login_user_unless_configured() {
    let mut config = Config::default();
    config
        .apply_env(env(&[("USERNAME", "svc-batch")]))
        .unwrap();
    assert_eq!(config.owner.as_deref(), Some("svc-batch"));
    let settings = config.lock_settings(Path::new("/tmp/jobgate"));
    assert_eq!(settings.owner, "svc-batch");

    let mut config = Config::from_yaml("owner: ops\n").unwrap();
    config.apply_env(env(&[("USER", "alice")])).unwrap();
    assert_eq!(config.owner.as_deref(), Some("ops"));

    let mut config = Config::default();
    config.apply_env(env(&[])).unwrap();
    assert_eq!(config.owner, None);
    assert_eq!(
        config.lock_settings(Path::new("/tmp/jobgate")).owner,
        "unknown"
    );
}
