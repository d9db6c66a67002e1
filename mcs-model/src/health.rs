//! Health report shapes shared by every sub-service and the process
//! supervisor.
//!
//! [`ComponentHealth`] is the per-component vocabulary (`ok`, `warning`,
//! `error`) and may nest further components. [`ServiceHealth`] is the coarser
//! top-level report (`ok` or `error`) returned by `GET /process/health`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{ModelError, ServiceMode};

/// Free-form diagnostic payload attached to a component report.
pub type HealthDetails = serde_json::Map<String, serde_json::Value>;

/// Component level status. Variant order doubles as precedence:
/// `Error` dominates `Warning`, which dominates `Ok`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    Ok,
    Warning,
    Error,
}

impl HealthStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            HealthStatus::Ok => "ok",
            HealthStatus::Warning => "warning",
            HealthStatus::Error => "error",
        }
    }

    /// Returns the more severe of the two statuses.
    pub fn worst(self, other: HealthStatus) -> HealthStatus {
        self.max(other)
    }

    /// Folds any number of statuses; an empty input is `Ok`.
    pub fn fold<I>(statuses: I) -> HealthStatus
    where
        I: IntoIterator<Item = HealthStatus>,
    {
        statuses.into_iter().fold(HealthStatus::Ok, HealthStatus::worst)
    }
}

/// Top level status of a service. There is no warning at this level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceStatus {
    Ok,
    Error,
}

impl From<HealthStatus> for ServiceStatus {
    fn from(status: HealthStatus) -> Self {
        match status {
            HealthStatus::Error => ServiceStatus::Error,
            HealthStatus::Ok | HealthStatus::Warning => ServiceStatus::Ok,
        }
    }
}

/// Health of a single component.
///
/// `error` is present exactly when `status` is [`HealthStatus::Error`]. The
/// constructors uphold this and deserialization rejects reports that break
/// it. Nested components are owned values, so a component can never contain
/// itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawComponentHealth")]
pub struct ComponentHealth {
    status: HealthStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<HealthDetails>,
    #[serde(skip_serializing_if = "Option::is_none")]
    components: Option<BTreeMap<String, ComponentHealth>>,
}

impl ComponentHealth {
    pub fn ok() -> Self {
        Self::with_status(HealthStatus::Ok, None)
    }

    pub fn warning() -> Self {
        Self::with_status(HealthStatus::Warning, None)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::with_status(HealthStatus::Error, Some(message.into()))
    }

    fn with_status(status: HealthStatus, error: Option<String>) -> Self {
        Self {
            status,
            error,
            details: None,
            components: None,
        }
    }

    pub fn with_detail(
        mut self,
        key: impl Into<String>,
        value: impl Into<serde_json::Value>,
    ) -> Self {
        self.details
            .get_or_insert_with(HealthDetails::new)
            .insert(key.into(), value.into());
        self
    }

    pub fn with_component(
        mut self,
        name: impl Into<String>,
        component: ComponentHealth,
    ) -> Self {
        self.components
            .get_or_insert_with(BTreeMap::new)
            .insert(name.into(), component);
        self
    }

    pub fn status(&self) -> HealthStatus {
        self.status
    }

    pub fn error_message(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn details(&self) -> Option<&HealthDetails> {
        self.details.as_ref()
    }

    pub fn detail(&self, key: &str) -> Option<&serde_json::Value> {
        self.details.as_ref().and_then(|details| details.get(key))
    }

    pub fn components(&self) -> Option<&BTreeMap<String, ComponentHealth>> {
        self.components.as_ref()
    }

    pub fn component(&self, name: &str) -> Option<&ComponentHealth> {
        self.components
            .as_ref()
            .and_then(|components| components.get(name))
    }

    pub fn is_error(&self) -> bool {
        self.status == HealthStatus::Error
    }

    /// Worst status found in this component or any nested component.
    pub fn rolled_up_status(&self) -> HealthStatus {
        let nested = self
            .components
            .iter()
            .flat_map(|components| components.values())
            .map(ComponentHealth::rolled_up_status);
        HealthStatus::fold(nested).worst(self.status)
    }
}

#[derive(Deserialize)]
struct RawComponentHealth {
    status: HealthStatus,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    details: Option<HealthDetails>,
    #[serde(default)]
    components: Option<BTreeMap<String, ComponentHealth>>,
}

impl TryFrom<RawComponentHealth> for ComponentHealth {
    type Error = ModelError;

    fn try_from(raw: RawComponentHealth) -> Result<Self, Self::Error> {
        match (raw.status, raw.error.is_some()) {
            (HealthStatus::Error, false) => {
                return Err(ModelError::InconsistentHealth(
                    "status is error but no error message was given".into(),
                ));
            }
            (status, true) if status != HealthStatus::Error => {
                return Err(ModelError::InconsistentHealth(format!(
                    "status is {} but an error message was given",
                    status.as_str()
                )));
            }
            _ => {}
        }

        Ok(Self {
            status: raw.status,
            error: raw.error,
            details: raw.details,
            components: raw.components,
        })
    }
}

/// Composite health of a service and all of its registered sub-services.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceHealth {
    pub status: ServiceStatus,
    pub service: String,
    pub version: String,
    pub is_running: bool,
    pub uptime: f64,
    #[serde(default)]
    pub mode: ServiceMode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub components: BTreeMap<String, ComponentHealth>,
}

pub const COMPONENT_ERROR_SUMMARY: &str = "One or more components in error state";

impl ServiceHealth {
    /// Builds a report from per-component results. The top-level status is
    /// `error` when any component reports `error`, otherwise `ok`.
    pub fn from_components(
        service: impl Into<String>,
        version: impl Into<String>,
        mode: ServiceMode,
        is_running: bool,
        uptime: f64,
        components: BTreeMap<String, ComponentHealth>,
    ) -> Self {
        let folded =
            HealthStatus::fold(components.values().map(ComponentHealth::status));
        let status = ServiceStatus::from(folded);
        let error = match status {
            ServiceStatus::Error => Some(COMPONENT_ERROR_SUMMARY.to_string()),
            ServiceStatus::Ok => None,
        };

        Self {
            status,
            service: service.into(),
            version: version.into(),
            is_running,
            uptime: uptime.max(0.0),
            mode,
            error,
            components,
        }
    }

    /// Report used when health could not be collected at all: every
    /// component is marked `error` with the same cause.
    pub fn total_failure<I, S>(
        service: impl Into<String>,
        version: impl Into<String>,
        mode: ServiceMode,
        component_names: I,
        error: impl Into<String>,
    ) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let error = error.into();
        let components = component_names
            .into_iter()
            .map(|name| (name.into(), ComponentHealth::error(error.clone())))
            .collect();

        Self {
            status: ServiceStatus::Error,
            service: service.into(),
            version: version.into(),
            is_running: false,
            uptime: 0.0,
            mode,
            error: Some(error),
            components,
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status == ServiceStatus::Ok
    }
}
