//! Lifecycle contract shared by every sub-service the supervisor owns.

use std::{
    future::Future,
    sync::atomic::{AtomicBool, Ordering},
    time::Duration,
};

use async_trait::async_trait;
use mcs_model::ComponentHealth;

use crate::error::{LifecycleOp, ProcessError, Result};

/// An independently startable unit managed by the process supervisor.
///
/// `health` never fails; internal problems are reported as a component in
/// `error` state.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SubService: Send + Sync {
    fn name(&self) -> &'static str;

    /// Prepares internal state. Fails with
    /// [`ProcessError::Initialization`] when a required resource is
    /// unreachable.
    async fn initialize(&self) -> Result<()>;

    /// Fails with [`ProcessError::Startup`] when already running or never
    /// initialized.
    async fn start(&self) -> Result<()>;

    /// Safe to call when not running.
    async fn stop(&self) -> Result<()>;

    async fn health(&self) -> ComponentHealth;

    fn is_running(&self) -> bool;
}

/// Initialized/running flags with the start preconditions every sub-service
/// enforces.
#[derive(Debug, Default)]
pub struct LifecycleState {
    initialized: AtomicBool,
    running: AtomicBool,
}

impl LifecycleState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mark_initialized(&self) {
        self.initialized.store(true, Ordering::Release);
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::Acquire)
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Flips the service to running, or explains why it cannot start.
    pub fn try_start(&self, service: &str) -> Result<()> {
        if !self.is_initialized() {
            return Err(ProcessError::Startup {
                service: service.to_string(),
                message: "start called before initialize".into(),
            });
        }
        self.running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map(|_| ())
            .map_err(|_| ProcessError::Startup {
                service: service.to_string(),
                message: "already running".into(),
            })
    }

    /// Returns `true` if the service was running.
    pub fn mark_stopped(&self) -> bool {
        self.running.swap(false, Ordering::AcqRel)
    }
}

/// How the supervisor bounds and recovers from sub-service lifecycle calls.
#[derive(Debug, Clone, Default)]
pub struct LifecyclePolicy {
    /// Deadline applied to each initialize/start/stop/health call. `None`
    /// waits indefinitely.
    pub call_timeout: Option<Duration>,
    /// Stop already started sub-services, in reverse order, when a later
    /// one fails to start.
    pub rollback_on_start_failure: bool,
}

impl LifecyclePolicy {
    pub fn with_timeout(mut self, limit: Duration) -> Self {
        self.call_timeout = Some(limit);
        self
    }

    pub fn with_rollback(mut self, enabled: bool) -> Self {
        self.rollback_on_start_failure = enabled;
        self
    }

    /// Runs a lifecycle call under the configured deadline.
    pub async fn run<F>(
        &self,
        service: &str,
        operation: LifecycleOp,
        call: F,
    ) -> Result<()>
    where
        F: Future<Output = Result<()>>,
    {
        match self.call_timeout {
            Some(limit) => tokio::time::timeout(limit, call)
                .await
                .unwrap_or_else(|_| {
                    Err(ProcessError::Timeout {
                        service: service.to_string(),
                        operation,
                        limit,
                    })
                }),
            None => call.await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn start_requires_initialize_and_is_not_reentrant() {
        let state = LifecycleState::new();
        assert!(matches!(
            state.try_start("pattern"),
            Err(ProcessError::Startup { .. })
        ));

        state.mark_initialized();
        assert!(state.try_start("pattern").is_ok());
        assert!(state.is_running());
        assert!(matches!(
            state.try_start("pattern"),
            Err(ProcessError::Startup { .. })
        ));

        assert!(state.mark_stopped());
        assert!(!state.mark_stopped());
        assert!(state.try_start("pattern").is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn slow_call_times_out() {
        let policy =
            LifecyclePolicy::default().with_timeout(Duration::from_millis(50));
        let result = policy
            .run("schema", LifecycleOp::Start, async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok(())
            })
            .await;

        assert!(matches!(
            result,
            Err(ProcessError::Timeout {
                operation: LifecycleOp::Start,
                ..
            })
        ));
    }
}
