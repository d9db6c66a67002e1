use std::fmt::{self, Display};

/// Errors produced by model constructors and validation routines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelError {
    InconsistentHealth(String),
    InvalidMode(String),
    InvalidOverflowPolicy(String),
}

impl Display for ModelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelError::InconsistentHealth(msg) => {
                write!(f, "inconsistent health report: {msg}")
            }
            ModelError::InvalidMode(value) => write!(
                f,
                "invalid service mode '{value}' (expected normal, mock or simulation)"
            ),
            ModelError::InvalidOverflowPolicy(value) => write!(
                f,
                "invalid overflow policy '{value}' (expected drop_newest or disconnect)"
            ),
        }
    }
}

impl std::error::Error for ModelError {}
