use std::{fmt, sync::Arc};

use mcs_core::ProcessSupervisor;

use crate::infra::errors::{AppError, AppResult};

/// Shared handler state. The supervisor is absent when the process service
/// could not be assembled at startup; every process route then answers 503.
#[derive(Clone)]
pub struct AppState {
    supervisor: Option<Arc<ProcessSupervisor>>,
}

impl fmt::Debug for AppState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppState")
            .field("has_supervisor", &self.supervisor.is_some())
            .finish_non_exhaustive()
    }
}

impl AppState {
    pub fn new(supervisor: Arc<ProcessSupervisor>) -> Self {
        Self {
            supervisor: Some(supervisor),
        }
    }

    pub fn without_supervisor() -> Self {
        Self { supervisor: None }
    }

    pub fn supervisor(&self) -> AppResult<&Arc<ProcessSupervisor>> {
        self.supervisor.as_ref().ok_or_else(|| {
            AppError::unavailable("process service not initialized")
        })
    }
}
