use std::collections::HashSet;

use thiserror::Error;

use super::models::Config;

#[derive(Debug, Error)]
pub enum ConfigGuardRailError {
    #[error("status queue capacity must be at least 1")]
    ZeroQueueCapacity,
    #[error("sequence id '{id}' is defined more than once")]
    DuplicateSequence { id: String },
    #[error("sequence definitions require a non-empty id")]
    EmptySequenceId,
}

#[derive(Debug, Clone)]
pub struct ConfigWarning {
    pub message: String,
    pub hint: Option<String>,
}

#[derive(Debug, Default, Clone)]
pub struct ConfigWarnings {
    pub items: Vec<ConfigWarning>,
}

impl ConfigWarnings {
    pub fn push<S: Into<String>>(&mut self, message: S) {
        self.items.push(ConfigWarning {
            message: message.into(),
            hint: None,
        });
    }

    pub fn push_with_hint<S: Into<String>, H: Into<String>>(
        &mut self,
        message: S,
        hint: H,
    ) {
        self.items.push(ConfigWarning {
            message: message.into(),
            hint: Some(hint.into()),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn extend(&mut self, other: ConfigWarnings) {
        self.items.extend(other.items);
    }
}

pub fn apply_guard_rails(
    config: &Config,
) -> Result<ConfigWarnings, ConfigGuardRailError> {
    let mut warnings = ConfigWarnings::default();

    if config.notifications.queue_capacity == 0 {
        return Err(ConfigGuardRailError::ZeroQueueCapacity);
    }

    let mut seen = HashSet::new();
    for definition in &config.sequences.definitions {
        if definition.id.trim().is_empty() {
            return Err(ConfigGuardRailError::EmptySequenceId);
        }
        if !seen.insert(definition.id.as_str()) {
            return Err(ConfigGuardRailError::DuplicateSequence {
                id: definition.id.clone(),
            });
        }
    }

    if config.sequences.definitions.is_empty() {
        warnings.push_with_hint(
            "No sequences configured; sequence control endpoints will return 404",
            "Add [[sequences.definitions]] entries to the configuration file",
        );
    }

    if config.sequences.step_interval.is_zero() {
        warnings.push(
            "sequences.step_interval_ms is 0; simulated runs complete immediately",
        );
    }

    if config.lifecycle.call_timeout.is_none() {
        warnings.push_with_hint(
            "Lifecycle call timeout disabled; a hung sub-service blocks start and stop",
            "Set lifecycle.call_timeout_ms to a positive value",
        );
    }

    Ok(warnings)
}
