use std::{fmt, time::Duration};

use thiserror::Error;

/// Lifecycle call a sub-service was executing when it failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleOp {
    Initialize,
    Start,
    Stop,
    Health,
}

impl LifecycleOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            LifecycleOp::Initialize => "initialize",
            LifecycleOp::Start => "start",
            LifecycleOp::Stop => "stop",
            LifecycleOp::Health => "health",
        }
    }
}

impl fmt::Display for LifecycleOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug)]
pub enum ProcessError {
    #[error("{service} service failed to initialize: {message}")]
    Initialization {
        service: String,
        message: String,
    },

    #[error("{service} service failed to start: {message}")]
    Startup { service: String, message: String },

    #[error("Service unavailable: {message}")]
    ServiceUnavailable {
        message: String,
        cause: Option<Box<ProcessError>>,
    },

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("{service} service {operation} timed out after {limit:?}")]
    Timeout {
        service: String,
        operation: LifecycleOp,
        limit: Duration,
    },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ProcessError {
    pub fn unavailable(message: impl Into<String>) -> Self {
        ProcessError::ServiceUnavailable {
            message: message.into(),
            cause: None,
        }
    }

    /// Wraps a sub-service failure raised during an ordered lifecycle pass,
    /// recording how far the pass got.
    pub fn lifecycle_failure(
        operation: LifecycleOp,
        step: usize,
        total: usize,
        service: &str,
        err: ProcessError,
    ) -> Self {
        ProcessError::ServiceUnavailable {
            message: format!(
                "failed to {operation} process service at {service} (step {step} of {total}): {err}"
            ),
            cause: Some(Box::new(err)),
        }
    }

    pub fn is_service_unavailable(&self) -> bool {
        matches!(self, ProcessError::ServiceUnavailable { .. })
    }

    /// Underlying sub-service error for wrapped lifecycle failures.
    pub fn cause(&self) -> Option<&ProcessError> {
        match self {
            ProcessError::ServiceUnavailable { cause, .. } => cause.as_deref(),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, ProcessError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lifecycle_failure_keeps_cause_and_position() {
        let err = ProcessError::lifecycle_failure(
            LifecycleOp::Start,
            3,
            4,
            "sequence",
            ProcessError::Startup {
                service: "sequence".into(),
                message: "executor offline".into(),
            },
        );

        assert!(err.is_service_unavailable());
        assert!(err.to_string().contains("step 3 of 4"));
        assert!(matches!(err.cause(), Some(ProcessError::Startup { .. })));
    }
}
