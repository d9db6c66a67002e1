use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::ModelError;

/// What the status hub does when a subscriber's queue is full.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum OverflowPolicy {
    /// Drop the event for that subscriber only and count it.
    #[default]
    DropNewest,
    /// Tear the lagging subscriber down.
    Disconnect,
}

impl OverflowPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            OverflowPolicy::DropNewest => "drop_newest",
            OverflowPolicy::Disconnect => "disconnect",
        }
    }
}

impl fmt::Display for OverflowPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OverflowPolicy {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "drop_newest" | "drop" => Ok(OverflowPolicy::DropNewest),
            "disconnect" => Ok(OverflowPolicy::Disconnect),
            _ => Err(ModelError::InvalidOverflowPolicy(s.to_string())),
        }
    }
}
