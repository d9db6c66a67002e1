//! Configuration library for the MCS process service.
//!
//! Resolves settings from a TOML file, an optional `.env` file and process
//! environment variables, in that order of increasing precedence. The server
//! binary applies its CLI flags on top of the result.

pub mod constants;
pub mod loader;
pub mod models;
pub mod validation;

pub use loader::{ConfigLoad, ConfigLoader, error::ConfigLoadError};
pub use models::sources::{EnvConfig, FileConfig};
pub use models::{
    CatalogConfig, Config, ConfigMetadata, LifecycleConfig, LoggingConfig,
    NotificationConfig, SequenceConfig, ServerConfig, ServiceConfig,
};
pub use validation::{ConfigWarning, ConfigWarnings};
