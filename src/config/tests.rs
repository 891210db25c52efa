//! Tests for config functionality.

use crate::config::{LockConfig, SemaphoreConfig};
use crate::flags::LockFlags;
use crate::locks::{OpenMode, SlotSelection};
use std::path::PathBuf;
use std::time::Duration;
use tempfile::TempDir;

#[test]
fn test_default_config() {
    let config = LockConfig::default();

    assert_eq!(config.timeout_secs, 5.0);
    assert_eq!(config.check_interval_secs, 0.25);
    assert!(!config.fail_when_locked);
    assert!(!config.shared);
    assert!(!config.blocking);
    assert_eq!(config.mode, OpenMode::Append);
    assert_eq!(config.semaphore.pattern, "{name}.{number}.lock");
    assert!(config.semaphore.fail_when_locked);
    assert!(config.semaphore.directory.is_none());
    assert_eq!(config.semaphore.selection(), SlotSelection::Sequential);
}

#[test]
fn test_parse_minimal_yaml() {
    let config = LockConfig::from_yaml("").unwrap();
    assert_eq!(config, LockConfig::default());
}

#[test]
fn test_parse_partial_yaml() {
    let yaml = r#"
timeout_secs: 10
mode: write
"#;
    let config = LockConfig::from_yaml(yaml).unwrap();

    // Specified values should be used
    assert_eq!(config.timeout(), Duration::from_secs(10));
    assert_eq!(config.mode, OpenMode::Write);

    // Unspecified values should use defaults
    assert_eq!(config.check_interval(), Duration::from_millis(250));
    assert!(config.semaphore.fail_when_locked);
}

#[test]
fn test_parse_full_yaml() {
    let yaml = r#"
timeout_secs: 2.5
check_interval_secs: 0.5
fail_when_locked: true
shared: true
blocking: false
mode: append
semaphore:
  directory: /var/lock/jobs
  pattern: "{name}-{number}.lck"
  fail_when_locked: false
  randomized: true
"#;
    let config = LockConfig::from_yaml(yaml).unwrap();

    assert_eq!(config.timeout(), Duration::from_millis(2500));
    assert_eq!(config.check_interval(), Duration::from_millis(500));
    assert!(config.fail_when_locked);
    assert!(config.flags().is_shared());
    assert_eq!(
        config.semaphore,
        SemaphoreConfig {
            directory: Some(PathBuf::from("/var/lock/jobs")),
            pattern: "{name}-{number}.lck".to_string(),
            fail_when_locked: false,
            randomized: true,
        }
    );
    assert_eq!(config.semaphore.selection(), SlotSelection::Randomized);
}

#[test]
fn test_unknown_fields_ignored() {
    let yaml = r#"
timeout_secs: 1
future_option: whatever
semaphore:
  also_new: 3
"#;
    let config = LockConfig::from_yaml(yaml).unwrap();
    assert_eq!(config.timeout(), Duration::from_secs(1));
}

#[test]
fn test_flags_from_config() {
    let mut config = LockConfig::default();
    assert_eq!(config.flags(), LockFlags::EXCLUSIVE | LockFlags::NON_BLOCKING);

    config.shared = true;
    config.blocking = true;
    assert_eq!(config.flags(), LockFlags::SHARED);
}

#[test]
fn test_negative_timeout_rejected() {
    let err = LockConfig::from_yaml("timeout_secs: -1").unwrap_err();
    assert!(err.to_string().contains("timeout_secs"));
}

#[test]
fn test_zero_check_interval_rejected() {
    let err = LockConfig::from_yaml("check_interval_secs: 0").unwrap_err();
    assert!(err.to_string().contains("check_interval_secs"));
}

#[test]
fn test_pattern_without_number_rejected() {
    let yaml = "semaphore:\n  pattern: \"{name}.lock\"\n";
    let err = LockConfig::from_yaml(yaml).unwrap_err();
    assert!(err.to_string().contains("{number}"));
}

#[test]
fn test_invalid_mode_rejected() {
    assert!(LockConfig::from_yaml("mode: read").is_err());
}

#[test]
fn test_out_of_range_values_fall_back_to_defaults() {
    let config = LockConfig {
        timeout_secs: f64::NAN,
        check_interval_secs: 0.0,
        ..LockConfig::default()
    };
    assert_eq!(config.timeout(), Duration::from_secs(5));
    assert_eq!(config.check_interval(), Duration::from_millis(250));
}

#[test]
fn test_yaml_roundtrip_and_load() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("portalock.yaml");
    let mut config = LockConfig::default();
    config.timeout_secs = 7.0;
    config.semaphore.randomized = true;

    std::fs::write(&path, config.to_yaml().unwrap()).unwrap();
    let loaded = LockConfig::load(&path).unwrap();
    assert_eq!(loaded, config);
}

#[test]
fn test_load_missing_file_fails() {
    let temp_dir = TempDir::new().unwrap();
    let err = LockConfig::load(temp_dir.path().join("nope.yaml")).unwrap_err();
    assert!(err.to_string().contains("failed to read config file"));
}
