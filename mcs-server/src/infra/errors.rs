use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::fmt;

use mcs_core::ProcessError;

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub message: String,
}

impl AppError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(StatusCode::CONFLICT, message)
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new(StatusCode::SERVICE_UNAVAILABLE, message)
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(StatusCode::GATEWAY_TIMEOUT, message)
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for AppError {}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "error": {
                "message": self.message,
                "status": self.status.as_u16(),
            }
        }));

        (self.status, body).into_response()
    }
}

impl From<ProcessError> for AppError {
    fn from(err: ProcessError) -> Self {
        match err {
            ProcessError::NotFound(msg) => Self::not_found(msg),
            ProcessError::Conflict(msg) => Self::conflict(msg),
            ProcessError::Validation(msg) => Self::bad_request(msg),
            ProcessError::Timeout { .. } => Self::timeout(err.to_string()),
            ProcessError::ServiceUnavailable { .. }
            | ProcessError::Initialization { .. }
            | ProcessError::Startup { .. } => Self::unavailable(err.to_string()),
            ProcessError::Internal(msg) => {
                tracing::error!(error = %msg, "process operation failed");
                Self::internal(msg)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn process_errors_map_to_http_statuses() {
        let cases = [
            (ProcessError::NotFound("S9".into()), StatusCode::NOT_FOUND),
            (ProcessError::Conflict("S1".into()), StatusCode::CONFLICT),
            (
                ProcessError::Validation("bad".into()),
                StatusCode::BAD_REQUEST,
            ),
            (
                ProcessError::unavailable("not running"),
                StatusCode::SERVICE_UNAVAILABLE,
            ),
            (
                ProcessError::Timeout {
                    service: "schema".into(),
                    operation: mcs_core::LifecycleOp::Health,
                    limit: Duration::from_secs(1),
                },
                StatusCode::GATEWAY_TIMEOUT,
            ),
            (
                ProcessError::Internal("boom".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (err, expected) in cases {
            assert_eq!(AppError::from(err).status, expected);
        }
    }

    #[test]
    fn response_body_carries_message_and_status() {
        let response = AppError::conflict("sequence S1 is already running")
            .into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }
}
