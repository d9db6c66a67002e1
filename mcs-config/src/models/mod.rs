pub mod sources;

use std::{path::PathBuf, time::Duration};

use mcs_model::{OverflowPolicy, SequenceDefinition, ServiceMode};

#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub service: ServiceConfig,
    pub lifecycle: LifecycleConfig,
    pub notifications: NotificationConfig,
    pub sequences: SequenceConfig,
    pub catalogs: CatalogConfig,
    pub logging: LoggingConfig,
    pub metadata: ConfigMetadata,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub name: String,
    pub version: String,
    pub mode: ServiceMode,
}

/// How the supervisor treats slow or failing sub-service lifecycle calls.
#[derive(Debug, Clone)]
pub struct LifecycleConfig {
    /// `None` disables the per-call timeout.
    pub call_timeout: Option<Duration>,
    pub rollback_on_start_failure: bool,
}

#[derive(Debug, Clone)]
pub struct NotificationConfig {
    pub queue_capacity: usize,
    pub overflow: OverflowPolicy,
}

#[derive(Debug, Clone)]
pub struct SequenceConfig {
    pub step_interval: Duration,
    pub definitions: Vec<SequenceDefinition>,
}

/// Optional directories backing the pattern, parameter and schema catalogs.
#[derive(Debug, Clone, Default)]
pub struct CatalogConfig {
    pub pattern_dir: Option<PathBuf>,
    pub parameter_dir: Option<PathBuf>,
    pub schema_dir: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub level: String,
}

#[derive(Debug, Clone, Default)]
pub struct ConfigMetadata {
    pub config_path: Option<PathBuf>,
    pub env_file_loaded: bool,
}
