use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use mcs_model::SequenceDefinition;

/// Raw configuration as defined in a TOML file.
#[derive(Debug, Default, Clone, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct FileConfig {
    #[serde(default)]
    pub server: FileServerConfig,
    #[serde(default)]
    pub service: FileServiceConfig,
    #[serde(default)]
    pub lifecycle: FileLifecycleConfig,
    #[serde(default)]
    pub notifications: FileNotificationConfig,
    #[serde(default)]
    pub sequences: FileSequenceConfig,
    #[serde(default)]
    pub catalogs: FileCatalogConfig,
    #[serde(default)]
    pub logging: FileLoggingConfig,
}

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct FileServerConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
}

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct FileServiceConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,
}

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct FileLifecycleConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub call_timeout_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rollback_on_start_failure: Option<bool>,
}

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct FileNotificationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub queue_capacity: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub overflow: Option<String>,
}

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct FileSequenceConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub step_interval_ms: Option<u64>,
    #[serde(default)]
    pub definitions: Vec<SequenceDefinition>,
}

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct FileCatalogConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pattern_dir: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parameter_dir: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema_dir: Option<PathBuf>,
}

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct FileLoggingConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,
}

/// Environment-derived configuration values.
#[derive(Debug, Default, Clone)]
pub struct EnvConfig {
    pub config_path: Option<PathBuf>,
    pub server_host: Option<String>,
    pub server_port: Option<u16>,
    pub service_version: Option<String>,
    pub mode: Option<String>,
    pub log_level: Option<String>,
    pub call_timeout_ms: Option<u64>,
    pub rollback_on_start_failure: Option<bool>,
    pub status_queue_capacity: Option<usize>,
    pub status_overflow: Option<String>,
    pub step_interval_ms: Option<u64>,
    pub pattern_dir: Option<PathBuf>,
    pub parameter_dir: Option<PathBuf>,
    pub schema_dir: Option<PathBuf>,
}

impl EnvConfig {
    pub fn gather() -> Self {
        Self {
            config_path: std::env::var("MCS_CONFIG_PATH").ok().map(PathBuf::from),
            server_host: std::env::var("PROCESS_HOST").ok(),
            server_port: std::env::var("PROCESS_PORT")
                .ok()
                .and_then(|s| s.parse().ok()),
            service_version: std::env::var("MCS_SERVICE_VERSION").ok(),
            mode: std::env::var("MCS_MODE").ok(),
            log_level: std::env::var("MCS_LOG_LEVEL").ok(),
            call_timeout_ms: std::env::var("MCS_LIFECYCLE_TIMEOUT_MS")
                .ok()
                .and_then(|s| s.parse().ok()),
            rollback_on_start_failure: parse_bool_var(
                "MCS_ROLLBACK_ON_START_FAILURE",
            ),
            status_queue_capacity: std::env::var("MCS_STATUS_QUEUE_CAPACITY")
                .ok()
                .and_then(|s| s.parse().ok()),
            status_overflow: std::env::var("MCS_STATUS_OVERFLOW").ok(),
            step_interval_ms: std::env::var("MCS_SEQUENCE_STEP_INTERVAL_MS")
                .ok()
                .and_then(|s| s.parse().ok()),
            pattern_dir: std::env::var("MCS_PATTERN_DIR").ok().map(PathBuf::from),
            parameter_dir: std::env::var("MCS_PARAMETER_DIR")
                .ok()
                .map(PathBuf::from),
            schema_dir: std::env::var("MCS_SCHEMA_DIR").ok().map(PathBuf::from),
        }
    }
}

fn parse_bool_var(name: &str) -> Option<bool> {
    std::env::var(name).ok().and_then(|raw| {
        match raw.to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Some(true),
            "0" | "false" | "no" | "off" => Some(false),
            _ => None,
        }
    })
}
