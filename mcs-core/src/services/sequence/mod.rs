//! Sequence sub-service: owns the per-sequence state machine
//! (`idle -> running -> completed | failed | stopped`, re-entrant from any
//! terminal state) and publishes every transition to the status hub.

mod executor;

pub use executor::{ProgressReporter, SequenceExecutor, SimulatedExecutor};

use std::{
    any::type_name_of_val,
    collections::{HashMap, HashSet},
    fmt,
    sync::Arc,
};

use async_trait::async_trait;
use chrono::Utc;
use mcs_model::{
    ComponentHealth, SequenceDefinition, SequenceState, SequenceStatus,
};
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::{
    error::{ProcessError, Result},
    lifecycle::{LifecycleState, SubService},
    notify::{SequenceStatusHub, StatusSink, Subscription},
};

pub(crate) const SERVICE_NAME: &str = "sequence";

#[derive(Debug)]
pub(crate) struct SequenceRecord {
    status: SequenceStatus,
    /// Generation of the latest run; late results from older runs are
    /// discarded.
    run: u64,
    cancel: Option<CancellationToken>,
}

impl SequenceRecord {
    fn new(definition: &SequenceDefinition) -> Self {
        Self {
            status: SequenceStatus::idle(&definition.id, definition.steps),
            run: 0,
            cancel: None,
        }
    }

    fn touch(&mut self) {
        self.status.revision += 1;
        self.status.updated_at = Utc::now();
    }

    /// Applies a state change if the state machine allows it.
    fn transition(&mut self, next: SequenceState, error: Option<String>) -> bool {
        if !self.status.state.can_transition_to(next) {
            return false;
        }
        let now = Utc::now();
        match next {
            SequenceState::Running => {
                self.status.started_at = Some(now);
                self.status.finished_at = None;
                self.status.set_step(0);
            }
            SequenceState::Completed => {
                let total = self.status.total_steps;
                self.status.set_step(total);
                self.status.finished_at = Some(now);
            }
            SequenceState::Failed | SequenceState::Stopped => {
                self.status.finished_at = Some(now);
            }
            SequenceState::Idle => {}
        }
        self.status.state = next;
        self.status.error = error;
        self.touch();
        true
    }
}

pub struct SequenceService {
    state: LifecycleState,
    hub: SequenceStatusHub,
    executor: Arc<dyn SequenceExecutor>,
    definitions: Vec<SequenceDefinition>,
    records: HashMap<String, Arc<Mutex<SequenceRecord>>>,
}

impl fmt::Debug for SequenceService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SequenceService")
            .field("state", &self.state)
            .field("hub", &self.hub)
            .field("executor_type", &type_name_of_val(self.executor.as_ref()))
            .field("sequence_count", &self.definitions.len())
            .finish()
    }
}

impl SequenceService {
    /// Fails with [`ProcessError::Validation`] on duplicate sequence ids.
    pub fn new(
        definitions: Vec<SequenceDefinition>,
        hub: SequenceStatusHub,
        executor: Arc<dyn SequenceExecutor>,
    ) -> Result<Self> {
        let mut seen = HashSet::new();
        let mut records = HashMap::with_capacity(definitions.len());
        for definition in &definitions {
            if !seen.insert(definition.id.as_str()) {
                return Err(ProcessError::Validation(format!(
                    "duplicate sequence id '{}'",
                    definition.id
                )));
            }
            records.insert(
                definition.id.clone(),
                Arc::new(Mutex::new(SequenceRecord::new(definition))),
            );
        }

        Ok(Self {
            state: LifecycleState::new(),
            hub,
            executor,
            definitions,
            records,
        })
    }

    pub fn hub(&self) -> &SequenceStatusHub {
        &self.hub
    }

    pub fn list_sequences(&self) -> Vec<SequenceDefinition> {
        self.definitions.clone()
    }

    pub fn get_sequence(&self, sequence_id: &str) -> Result<SequenceDefinition> {
        self.definition(sequence_id).cloned()
    }

    pub fn get_sequence_status(&self, sequence_id: &str) -> Result<SequenceStatus> {
        Ok(self.record(sequence_id)?.lock().status.clone())
    }

    /// Starts a run. Fails with [`ProcessError::Conflict`] when the sequence
    /// is already running.
    pub fn start_sequence(&self, sequence_id: &str) -> Result<SequenceStatus> {
        self.ensure_running()?;
        let definition = self.definition(sequence_id)?.clone();
        let record = Arc::clone(self.record(sequence_id)?);

        let (status, run, cancel) = {
            let mut guard = record.lock();
            if guard.status.is_running() {
                return Err(ProcessError::Conflict(format!(
                    "sequence '{sequence_id}' is already running"
                )));
            }
            guard.run += 1;
            let cancel = CancellationToken::new();
            guard.cancel = Some(cancel.clone());
            guard.transition(SequenceState::Running, None);
            self.hub.publish(&guard.status);
            (guard.status.clone(), guard.run, cancel)
        };

        let reporter = ProgressReporter::new(record, self.hub.clone(), run);
        let executor = Arc::clone(&self.executor);
        tokio::spawn(async move {
            let outcome = tokio::select! {
                _ = cancel.cancelled() => return,
                outcome = executor.execute(&definition, &reporter) => outcome,
            };
            if let Err(message) = &outcome {
                warn!(sequence_id = %definition.id, run, error = %message, "sequence run failed");
            }
            reporter.finish(outcome);
        });

        info!(sequence_id, run, "sequence started");
        Ok(status)
    }

    /// Stops the active run. Stopping a sequence that is not running returns
    /// its current status without emitting an event.
    pub fn stop_sequence(&self, sequence_id: &str) -> Result<SequenceStatus> {
        self.ensure_running()?;
        let record = self.record(sequence_id)?;
        let mut guard = record.lock();
        if guard.status.is_running() {
            if let Some(cancel) = guard.cancel.take() {
                cancel.cancel();
            }
            guard.transition(SequenceState::Stopped, None);
            self.hub.publish(&guard.status);
            info!(sequence_id, run = guard.run, "sequence stopped");
        }
        Ok(guard.status.clone())
    }

    /// Registers a status listener for a known sequence.
    pub fn subscribe<S: StatusSink>(
        &self,
        sequence_id: &str,
        sink: S,
    ) -> Result<Subscription> {
        self.definition(sequence_id)?;
        Ok(self.hub.subscribe(sequence_id, sink))
    }

    fn ensure_running(&self) -> Result<()> {
        if self.state.is_running() {
            Ok(())
        } else {
            Err(ProcessError::unavailable("sequence service is not running"))
        }
    }

    fn definition(&self, sequence_id: &str) -> Result<&SequenceDefinition> {
        self.definitions
            .iter()
            .find(|definition| definition.id == sequence_id)
            .ok_or_else(|| unknown_sequence(sequence_id))
    }

    fn record(&self, sequence_id: &str) -> Result<&Arc<Mutex<SequenceRecord>>> {
        self.records
            .get(sequence_id)
            .ok_or_else(|| unknown_sequence(sequence_id))
    }

    fn running_count(&self) -> usize {
        self.records
            .values()
            .filter(|record| record.lock().status.is_running())
            .count()
    }
}

fn unknown_sequence(sequence_id: &str) -> ProcessError {
    ProcessError::NotFound(format!("sequence '{sequence_id}'"))
}

#[async_trait]
impl SubService for SequenceService {
    fn name(&self) -> &'static str {
        SERVICE_NAME
    }

    async fn initialize(&self) -> Result<()> {
        self.state.mark_initialized();
        debug!(sequences = self.definitions.len(), "sequence service initialized");
        Ok(())
    }

    async fn start(&self) -> Result<()> {
        self.state.try_start(SERVICE_NAME)?;
        info!(sequences = self.definitions.len(), "sequence service started");
        Ok(())
    }

    async fn stop(&self) -> Result<()> {
        if !self.state.mark_stopped() {
            return Ok(());
        }
        for record in self.records.values() {
            let mut guard = record.lock();
            if let Some(cancel) = guard.cancel.take() {
                cancel.cancel();
            }
            if guard.transition(SequenceState::Stopped, None) {
                self.hub.publish(&guard.status);
            }
        }
        self.hub.close_all();
        info!("sequence service stopped");
        Ok(())
    }

    async fn health(&self) -> ComponentHealth {
        let hub = self.hub.health();
        if !self.state.is_initialized() {
            return ComponentHealth::warning()
                .with_detail("reason", "not initialized")
                .with_component("status_hub", hub);
        }
        if !self.state.is_running() {
            return ComponentHealth::warning()
                .with_detail("reason", "not running")
                .with_component("status_hub", hub);
        }
        ComponentHealth::ok()
            .with_detail("sequences", self.definitions.len() as u64)
            .with_detail("running", self.running_count() as u64)
            .with_component("status_hub", hub)
    }

    fn is_running(&self) -> bool {
        self.state.is_running()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use mcs_model::OverflowPolicy;
    use tokio::sync::mpsc;

    use super::*;

    struct FailingExecutor;

    #[async_trait]
    impl SequenceExecutor for FailingExecutor {
        async fn execute(
            &self,
            _definition: &SequenceDefinition,
            progress: &ProgressReporter,
        ) -> std::result::Result<(), String> {
            progress.advance(1);
            Err("pressure out of range".into())
        }
    }

    fn definitions() -> Vec<SequenceDefinition> {
        vec![
            SequenceDefinition::new("S1", "Wafer alignment", 2),
            SequenceDefinition::new("S2", "Chamber purge", 1),
        ]
    }

    async fn running_service(executor: Arc<dyn SequenceExecutor>) -> SequenceService {
        let hub = SequenceStatusHub::new(32, OverflowPolicy::DropNewest);
        let service = SequenceService::new(definitions(), hub, executor)
            .expect("valid definitions");
        service.initialize().await.expect("initialize");
        service.start().await.expect("start");
        service
    }

    async fn next_state(
        rx: &mut mpsc::UnboundedReceiver<SequenceStatus>,
    ) -> SequenceStatus {
        tokio::time::timeout(Duration::from_secs(2), rx.recv())
            .await
            .expect("status in time")
            .expect("subscription open")
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let hub = SequenceStatusHub::new(4, OverflowPolicy::DropNewest);
        let result = SequenceService::new(
            vec![
                SequenceDefinition::new("S1", "a", 1),
                SequenceDefinition::new("S1", "b", 1),
            ],
            hub,
            Arc::new(SimulatedExecutor::new(Duration::ZERO)),
        );
        assert!(matches!(result, Err(ProcessError::Validation(_))));
    }

    #[tokio::test]
    async fn run_emits_ordered_transitions_until_completed() {
        let service = running_service(Arc::new(SimulatedExecutor::new(
            Duration::from_millis(5),
        )))
        .await;
        let (tx, mut rx) = mpsc::unbounded_channel();
        let _sub = service.subscribe("S1", tx).expect("subscribe");

        service.start_sequence("S1").expect("start");

        let mut observed = Vec::new();
        loop {
            let status = next_state(&mut rx).await;
            observed.push((status.state, status.current_step, status.revision));
            if status.state.is_terminal() {
                break;
            }
        }

        let states: Vec<_> = observed.iter().map(|(state, _, _)| *state).collect();
        assert_eq!(states.first(), Some(&SequenceState::Running));
        assert_eq!(states.last(), Some(&SequenceState::Completed));
        assert!(observed.windows(2).all(|pair| pair[0].2 < pair[1].2));

        let status = service.get_sequence_status("S1").expect("status");
        assert_eq!(status.state, SequenceState::Completed);
        assert_eq!(status.progress, 1.0);
        assert!(status.finished_at.is_some());
    }

    #[tokio::test]
    async fn starting_a_running_sequence_conflicts() {
        let service = running_service(Arc::new(SimulatedExecutor::new(
            Duration::from_secs(60),
        )))
        .await;

        service.start_sequence("S1").expect("first start");
        assert!(matches!(
            service.start_sequence("S1"),
            Err(ProcessError::Conflict(_))
        ));
        assert!(matches!(
            service.start_sequence("missing"),
            Err(ProcessError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn stop_cancels_run_and_restart_is_allowed() {
        let service = running_service(Arc::new(SimulatedExecutor::new(
            Duration::from_secs(60),
        )))
        .await;
        let (tx, mut rx) = mpsc::unbounded_channel();
        let _sub = service.subscribe("S1", tx).expect("subscribe");

        service.start_sequence("S1").expect("start");
        let stopped = service.stop_sequence("S1").expect("stop");
        assert_eq!(stopped.state, SequenceState::Stopped);

        let again = service.stop_sequence("S1").expect("second stop");
        assert_eq!(again.revision, stopped.revision);

        let restarted = service.start_sequence("S1").expect("restart");
        assert_eq!(restarted.state, SequenceState::Running);

        assert_eq!(next_state(&mut rx).await.state, SequenceState::Running);
        assert_eq!(next_state(&mut rx).await.state, SequenceState::Stopped);
        assert_eq!(next_state(&mut rx).await.state, SequenceState::Running);
    }

    #[tokio::test]
    async fn executor_error_marks_run_failed() {
        let service = running_service(Arc::new(FailingExecutor)).await;
        let (tx, mut rx) = mpsc::unbounded_channel();
        let _sub = service.subscribe("S2", tx).expect("subscribe");

        service.start_sequence("S2").expect("start");

        assert_eq!(next_state(&mut rx).await.state, SequenceState::Running);
        assert_eq!(next_state(&mut rx).await.current_step, 1);
        let failed = next_state(&mut rx).await;
        assert_eq!(failed.state, SequenceState::Failed);
        assert_eq!(failed.error.as_deref(), Some("pressure out of range"));
    }

    #[tokio::test]
    async fn control_requires_running_service() {
        let hub = SequenceStatusHub::new(4, OverflowPolicy::DropNewest);
        let service = SequenceService::new(
            definitions(),
            hub,
            Arc::new(SimulatedExecutor::new(Duration::ZERO)),
        )
        .expect("valid definitions");

        assert!(matches!(
            service.start_sequence("S1"),
            Err(ProcessError::ServiceUnavailable { .. })
        ));
        assert_eq!(
            service.get_sequence_status("S1").expect("status").state,
            SequenceState::Idle
        );
    }

    #[tokio::test]
    async fn service_stop_marks_runs_stopped_and_closes_subscribers() {
        let service = running_service(Arc::new(SimulatedExecutor::new(
            Duration::from_secs(60),
        )))
        .await;
        let (tx, mut rx) = mpsc::unbounded_channel::<SequenceStatus>();
        let sub = service.subscribe("S1", tx).expect("subscribe");
        service.start_sequence("S1").expect("start");
        assert_eq!(next_state(&mut rx).await.state, SequenceState::Running);

        service.stop().await.expect("stop");

        assert!(!service.is_running());
        assert_eq!(next_state(&mut rx).await.state, SequenceState::Stopped);
        let after = tokio::time::timeout(Duration::from_secs(2), rx.recv())
            .await
            .expect("subscription ends");
        assert!(after.is_none());
        assert!(!sub.is_active());
        assert_eq!(
            service.get_sequence_status("S1").expect("status").state,
            SequenceState::Stopped
        );
        assert_eq!(
            service.get_sequence_status("S2").expect("status").state,
            SequenceState::Idle
        );
    }
}
