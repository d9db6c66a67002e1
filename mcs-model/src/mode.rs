use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::ModelError;

/// Operating mode reported alongside service health.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum ServiceMode {
    #[default]
    Normal,
    Mock,
    Simulation,
}

impl ServiceMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceMode::Normal => "normal",
            ServiceMode::Mock => "mock",
            ServiceMode::Simulation => "simulation",
        }
    }
}

impl fmt::Display for ServiceMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ServiceMode {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "normal" => Ok(ServiceMode::Normal),
            "mock" => Ok(ServiceMode::Mock),
            "simulation" | "sim" => Ok(ServiceMode::Simulation),
            _ => Err(ModelError::InvalidMode(s.to_string())),
        }
    }
}
