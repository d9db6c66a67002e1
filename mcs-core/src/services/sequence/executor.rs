use std::{fmt, sync::Arc, time::Duration};

use async_trait::async_trait;
use mcs_model::{SequenceDefinition, SequenceState};
use parking_lot::Mutex;

use super::SequenceRecord;
use crate::notify::SequenceStatusHub;

/// Runs a started sequence to completion.
///
/// Returning `Err` marks the run failed with that message. A stop cancels
/// the returned future, so implementations need no cancellation handling of
/// their own.
#[async_trait]
pub trait SequenceExecutor: Send + Sync {
    async fn execute(
        &self,
        definition: &SequenceDefinition,
        progress: &ProgressReporter,
    ) -> std::result::Result<(), String>;
}

/// Executor used when no hardware backend is attached: advances one step per
/// interval and always completes.
#[derive(Debug, Clone)]
pub struct SimulatedExecutor {
    step_interval: Duration,
}

impl SimulatedExecutor {
    pub fn new(step_interval: Duration) -> Self {
        Self { step_interval }
    }
}

#[async_trait]
impl SequenceExecutor for SimulatedExecutor {
    async fn execute(
        &self,
        definition: &SequenceDefinition,
        progress: &ProgressReporter,
    ) -> std::result::Result<(), String> {
        for step in 1..=definition.steps {
            tokio::time::sleep(self.step_interval).await;
            if !progress.advance(step) {
                break;
            }
        }
        Ok(())
    }
}

/// Progress handle scoped to one run of one sequence. Updates from a run
/// that was stopped or superseded are ignored.
#[derive(Clone)]
pub struct ProgressReporter {
    record: Arc<Mutex<SequenceRecord>>,
    hub: SequenceStatusHub,
    run: u64,
}

impl fmt::Debug for ProgressReporter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProgressReporter")
            .field("run", &self.run)
            .field("is_current", &self.is_current())
            .finish()
    }
}

impl ProgressReporter {
    pub(super) fn new(
        record: Arc<Mutex<SequenceRecord>>,
        hub: SequenceStatusHub,
        run: u64,
    ) -> Self {
        Self { record, hub, run }
    }

    /// `true` while this run is the sequence's active run.
    pub fn is_current(&self) -> bool {
        let record = self.record.lock();
        record.run == self.run && record.status.is_running()
    }

    /// Records that `step` has completed and notifies subscribers. Returns
    /// `false` when the run is no longer current.
    pub fn advance(&self, step: u32) -> bool {
        let mut record = self.record.lock();
        if record.run != self.run || !record.status.is_running() {
            return false;
        }
        record.status.set_step(step);
        record.touch();
        self.hub.publish(&record.status);
        true
    }

    pub(super) fn finish(&self, outcome: std::result::Result<(), String>) {
        let mut record = self.record.lock();
        if record.run != self.run || !record.status.is_running() {
            return;
        }
        let (state, error) = match outcome {
            Ok(()) => (SequenceState::Completed, None),
            Err(message) => (SequenceState::Failed, Some(message)),
        };
        record.cancel = None;
        if record.transition(state, error) {
            self.hub.publish(&record.status);
        }
    }
}
