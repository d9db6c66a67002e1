pub mod error;

use std::{
    fs,
    path::{Path, PathBuf},
    str::FromStr,
    time::Duration,
};

use mcs_model::{OverflowPolicy, ServiceMode};

use self::error::ConfigLoadError;
use crate::{
    constants::{
        DEFAULT_CALL_TIMEOUT_MS, DEFAULT_CONFIG_LOCATIONS, DEFAULT_HOST,
        DEFAULT_LOG_LEVEL, DEFAULT_PORT, DEFAULT_SERVICE_NAME,
        DEFAULT_STATUS_QUEUE_CAPACITY, DEFAULT_STEP_INTERVAL_MS,
    },
    models::{
        CatalogConfig, Config, ConfigMetadata, LifecycleConfig, LoggingConfig,
        NotificationConfig, SequenceConfig, ServerConfig, ServiceConfig,
        sources::{EnvConfig, FileConfig},
    },
    validation::{self, ConfigWarnings},
};

#[derive(Debug, Default, Clone)]
struct ConfigLoaderOptions {
    config_path: Option<PathBuf>,
    env_file: Option<PathBuf>,
    /// Use these values instead of reading `.env` and the process
    /// environment.
    env: Option<EnvConfig>,
}

#[derive(Debug, Default)]
pub struct ConfigLoader {
    options: ConfigLoaderOptions,
}

#[derive(Debug)]
pub struct ConfigLoad {
    pub config: Config,
    pub warnings: ConfigWarnings,
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.options.config_path = Some(path.into());
        self
    }

    pub fn with_env_file<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.options.env_file = Some(path.into());
        self
    }

    pub fn with_env(mut self, env: EnvConfig) -> Self {
        self.options.env = Some(env);
        self
    }

    pub fn load(&self) -> Result<ConfigLoad, ConfigLoadError> {
        let (env_config, env_file_loaded) = match &self.options.env {
            Some(env) => (env.clone(), false),
            None => {
                let loaded = load_env_file(self.options.env_file.as_deref())?;
                (EnvConfig::gather(), loaded)
            }
        };

        let (file_config, config_path) = self.load_file_config(&env_config)?;

        let (config, mut warnings) = compose_config(
            file_config,
            env_config,
            ConfigMetadata {
                config_path,
                env_file_loaded,
            },
        )?;
        warnings.extend(validation::apply_guard_rails(&config)?);

        Ok(ConfigLoad { config, warnings })
    }

    fn load_file_config(
        &self,
        env_config: &EnvConfig,
    ) -> Result<(Option<FileConfig>, Option<PathBuf>), ConfigLoadError> {
        let (path, explicit) = if let Some(path) = &self.options.config_path {
            (Some(path.clone()), true)
        } else if let Some(path) = &env_config.config_path {
            (Some(path.clone()), true)
        } else {
            let found = DEFAULT_CONFIG_LOCATIONS
                .iter()
                .map(PathBuf::from)
                .find(|candidate| candidate.exists());
            (found, false)
        };

        let Some(path) = path else {
            return Ok((None, None));
        };

        if !path.exists() {
            if explicit {
                return Err(ConfigLoadError::MissingConfig { path });
            }
            return Ok((None, None));
        }

        let contents =
            fs::read_to_string(&path).map_err(|err| ConfigLoadError::Io {
                path: path.clone(),
                source: err,
            })?;
        let file_config: FileConfig =
            toml::from_str(&contents).map_err(|err| ConfigLoadError::Parse {
                path: path.clone(),
                source: err,
            })?;

        Ok((Some(file_config), Some(path)))
    }
}

fn load_env_file(path: Option<&Path>) -> Result<bool, ConfigLoadError> {
    let result = match path {
        Some(path) => dotenvy::from_path(path),
        None => dotenvy::dotenv().map(|_| ()),
    };
    match result {
        Ok(()) => Ok(true),
        Err(dotenvy::Error::Io(_)) => Ok(false),
        Err(err) => Err(err.into()),
    }
}

/// Merges file and environment values, environment first, falling back to
/// built-in defaults.
pub fn compose_config(
    file_config: Option<FileConfig>,
    env: EnvConfig,
    metadata: ConfigMetadata,
) -> Result<(Config, ConfigWarnings), ConfigLoadError> {
    let mut warnings = ConfigWarnings::default();

    if metadata.config_path.is_none() {
        warnings.push_with_hint(
            "No mcs.toml detected; using environment variables and defaults",
            "Pass --config or set MCS_CONFIG_PATH to load sequence definitions",
        );
    }

    let FileConfig {
        server: file_server,
        service: file_service,
        lifecycle: file_lifecycle,
        notifications: file_notifications,
        sequences: file_sequences,
        catalogs: file_catalogs,
        logging: file_logging,
    } = file_config.unwrap_or_default();

    let server = ServerConfig {
        host: env
            .server_host
            .or(file_server.host)
            .unwrap_or_else(|| DEFAULT_HOST.to_string()),
        port: env.server_port.or(file_server.port).unwrap_or(DEFAULT_PORT),
    };

    let mode = match env.mode.or(file_service.mode) {
        Some(raw) => parse_field::<ServiceMode>("service.mode", &raw)?,
        None => ServiceMode::default(),
    };
    let service = ServiceConfig {
        name: file_service
            .name
            .unwrap_or_else(|| DEFAULT_SERVICE_NAME.to_string()),
        version: env
            .service_version
            .or(file_service.version)
            .unwrap_or_else(|| env!("CARGO_PKG_VERSION").to_string()),
        mode,
    };

    let timeout_ms = env
        .call_timeout_ms
        .or(file_lifecycle.call_timeout_ms)
        .unwrap_or(DEFAULT_CALL_TIMEOUT_MS);
    let lifecycle = LifecycleConfig {
        call_timeout: (timeout_ms > 0).then(|| Duration::from_millis(timeout_ms)),
        rollback_on_start_failure: env
            .rollback_on_start_failure
            .or(file_lifecycle.rollback_on_start_failure)
            .unwrap_or(false),
    };

    let overflow = match env.status_overflow.or(file_notifications.overflow) {
        Some(raw) => {
            parse_field::<OverflowPolicy>("notifications.overflow", &raw)?
        }
        None => OverflowPolicy::default(),
    };
    let notifications = NotificationConfig {
        queue_capacity: env
            .status_queue_capacity
            .or(file_notifications.queue_capacity)
            .unwrap_or(DEFAULT_STATUS_QUEUE_CAPACITY),
        overflow,
    };

    let sequences = SequenceConfig {
        step_interval: Duration::from_millis(
            env.step_interval_ms
                .or(file_sequences.step_interval_ms)
                .unwrap_or(DEFAULT_STEP_INTERVAL_MS),
        ),
        definitions: file_sequences.definitions,
    };

    let catalogs = CatalogConfig {
        pattern_dir: env.pattern_dir.or(file_catalogs.pattern_dir),
        parameter_dir: env.parameter_dir.or(file_catalogs.parameter_dir),
        schema_dir: env.schema_dir.or(file_catalogs.schema_dir),
    };

    let logging = LoggingConfig {
        level: env
            .log_level
            .or(file_logging.level)
            .unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string()),
    };

    Ok((
        Config {
            server,
            service,
            lifecycle,
            notifications,
            sequences,
            catalogs,
            logging,
            metadata,
        },
        warnings,
    ))
}

fn parse_field<T>(
    field: &'static str,
    raw: &str,
) -> Result<T, ConfigLoadError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.parse::<T>()
        .map_err(|err| ConfigLoadError::InvalidValue {
            field,
            message: err.to_string(),
        })
}
