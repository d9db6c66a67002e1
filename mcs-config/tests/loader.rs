use std::{fs, time::Duration};

use mcs_config::{ConfigLoadError, ConfigLoader, EnvConfig};
use mcs_model::{OverflowPolicy, ServiceMode};
use tempfile::TempDir;

fn write_config(dir: &TempDir, contents: &str) -> std::path::PathBuf {
    let path = dir.path().join("mcs.toml");
    fs::write(&path, contents).expect("write config");
    path
}

#[test]
fn loads_full_file_configuration() {
    let dir = TempDir::new().expect("tempdir");
    let path = write_config(
        &dir,
        r#"
        [server]
        host = "127.0.0.1"
        port = 8100

        [service]
        version = "2.1.0"
        mode = "mock"

        [lifecycle]
        call_timeout_ms = 1500
        rollback_on_start_failure = true

        [notifications]
        queue_capacity = 8
        overflow = "disconnect"

        [sequences]
        step_interval_ms = 25

        [[sequences.definitions]]
        id = "wafer-align"
        name = "Wafer alignment"
        steps = 4

        [[sequences.definitions]]
        id = "purge"
        name = "Chamber purge"
        "#,
    );

    let load = ConfigLoader::new()
        .with_config_path(&path)
        .with_env(EnvConfig::default())
        .load()
        .expect("config loads");
    let config = load.config;

    assert_eq!(config.server.bind_address(), "127.0.0.1:8100");
    assert_eq!(config.service.version, "2.1.0");
    assert_eq!(config.service.mode, ServiceMode::Mock);
    assert_eq!(
        config.lifecycle.call_timeout,
        Some(Duration::from_millis(1500))
    );
    assert!(config.lifecycle.rollback_on_start_failure);
    assert_eq!(config.notifications.queue_capacity, 8);
    assert_eq!(config.notifications.overflow, OverflowPolicy::Disconnect);
    assert_eq!(config.sequences.step_interval, Duration::from_millis(25));
    assert_eq!(config.sequences.definitions.len(), 2);
    assert_eq!(config.sequences.definitions[1].steps, 1);
    assert_eq!(config.metadata.config_path.as_deref(), Some(path.as_path()));
    assert!(load.warnings.is_empty());
}

#[test]
fn explicit_missing_file_is_an_error() {
    let dir = TempDir::new().expect("tempdir");
    let err = ConfigLoader::new()
        .with_config_path(dir.path().join("absent.toml"))
        .with_env(EnvConfig::default())
        .load()
        .expect_err("missing config");
    assert!(matches!(err, ConfigLoadError::MissingConfig { .. }));
}

#[test]
fn malformed_toml_reports_parse_error() {
    let dir = TempDir::new().expect("tempdir");
    let path = write_config(&dir, "[server\nport = 1");
    let err = ConfigLoader::new()
        .with_config_path(&path)
        .with_env(EnvConfig::default())
        .load()
        .expect_err("parse failure");
    assert!(matches!(err, ConfigLoadError::Parse { .. }));
}

#[test]
fn duplicate_sequence_ids_are_rejected() {
    let dir = TempDir::new().expect("tempdir");
    let path = write_config(
        &dir,
        r#"
        [[sequences.definitions]]
        id = "purge"
        name = "Purge A"

        [[sequences.definitions]]
        id = "purge"
        name = "Purge B"
        "#,
    );
    let err = ConfigLoader::new()
        .with_config_path(&path)
        .with_env(EnvConfig::default())
        .load()
        .expect_err("duplicate ids");
    assert!(matches!(err, ConfigLoadError::GuardRail(_)));
}

#[test]
fn zero_queue_capacity_is_rejected() {
    let dir = TempDir::new().expect("tempdir");
    let path = write_config(&dir, "[notifications]\nqueue_capacity = 0\n");
    let err = ConfigLoader::new()
        .with_config_path(&path)
        .with_env(EnvConfig::default())
        .load()
        .expect_err("zero capacity");
    assert!(matches!(err, ConfigLoadError::GuardRail(_)));
}

#[test]
fn env_config_path_is_used_when_no_explicit_path() {
    let dir = TempDir::new().expect("tempdir");
    let path = write_config(&dir, "[server]\nport = 8200\n");
    let env = EnvConfig {
        config_path: Some(path.clone()),
        ..EnvConfig::default()
    };
    let load = ConfigLoader::new().with_env(env).load().expect("loads");
    assert_eq!(load.config.server.port, 8200);
}
