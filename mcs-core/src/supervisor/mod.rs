//! Process supervisor: the single owner of the sub-services.
//!
//! `initialize` and `start` walk the sub-services in registration order and
//! abort on the first failure. `stop` walks them in reverse, attempts every
//! running one and reports the first failure afterwards. Lifecycle calls are
//! serialized; `health` runs alongside them and reports whatever state it
//! observes.

mod builder;

pub use builder::ProcessSupervisorBuilder;

use std::{
    any::Any,
    collections::{BTreeMap, HashMap},
    fmt,
    panic::AssertUnwindSafe,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::Instant,
};

use futures::{FutureExt, future::join_all};
use mcs_model::{
    ComponentHealth, SequenceDefinition, SequenceStatus, ServiceHealth,
    ServiceMode,
};
use parking_lot::RwLock;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use crate::{
    error::{LifecycleOp, ProcessError, Result},
    lifecycle::{LifecyclePolicy, SubService},
    notify::{StatusSink, Subscription},
    services::{CatalogKind, CatalogService, SequenceService},
};

pub struct ProcessSupervisor {
    service_name: String,
    version: String,
    mode: ServiceMode,
    policy: LifecyclePolicy,
    services: Vec<Arc<dyn SubService>>,
    catalogs: HashMap<CatalogKind, Arc<CatalogService>>,
    sequences: Option<Arc<SequenceService>>,
    lifecycle_lock: Mutex<()>,
    running: AtomicBool,
    started_at: RwLock<Option<Instant>>,
}

impl fmt::Debug for ProcessSupervisor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProcessSupervisor")
            .field("service_name", &self.service_name)
            .field("version", &self.version)
            .field("mode", &self.mode)
            .field("policy", &self.policy)
            .field("services", &self.service_names())
            .field("is_running", &self.is_running())
            .field("lifecycle_busy", &self.lifecycle_lock.try_lock().is_err())
            .finish()
    }
}

impl ProcessSupervisor {
    pub fn builder(
        service_name: impl Into<String>,
        version: impl Into<String>,
    ) -> ProcessSupervisorBuilder {
        ProcessSupervisorBuilder::new(service_name.into(), version.into())
    }

    pub fn service_name(&self) -> &str {
        &self.service_name
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn mode(&self) -> ServiceMode {
        self.mode
    }

    /// Sub-service names in lifecycle order.
    pub fn service_names(&self) -> Vec<&'static str> {
        self.services.iter().map(|service| service.name()).collect()
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Seconds since the last successful `start`, or `0.0` when stopped.
    pub fn uptime(&self) -> f64 {
        if !self.is_running() {
            return 0.0;
        }
        let started_at = *self.started_at.read();
        started_at
            .map(|started| started.elapsed().as_secs_f64())
            .unwrap_or(0.0)
    }

    /// Initializes every sub-service in order, stopping at the first
    /// failure. Sub-services already initialized stay initialized.
    pub async fn initialize(&self) -> Result<()> {
        let _guard = self.lifecycle_lock.lock().await;
        let total = self.services.len();

        for (index, service) in self.services.iter().enumerate() {
            let name = service.name();
            let result = self
                .policy
                .run(name, LifecycleOp::Initialize, service.initialize())
                .await;
            if let Err(err) = result {
                error!(service = name, error = %err, "sub-service failed to initialize");
                return Err(ProcessError::lifecycle_failure(
                    LifecycleOp::Initialize,
                    index + 1,
                    total,
                    name,
                    err,
                ));
            }
            debug!(service = name, "sub-service initialized");
        }

        info!(service = %self.service_name, sub_services = total, "process service initialized");
        Ok(())
    }

    /// Starts every sub-service in order. A second call without an
    /// intervening `stop` fails with [`ProcessError::Startup`] and changes
    /// nothing.
    pub async fn start(&self) -> Result<()> {
        let _guard = self.lifecycle_lock.lock().await;
        if self.is_running() {
            return Err(ProcessError::Startup {
                service: self.service_name.clone(),
                message: "already running".into(),
            });
        }

        let total = self.services.len();
        let mut started: Vec<&Arc<dyn SubService>> = Vec::with_capacity(total);
        for (index, service) in self.services.iter().enumerate() {
            let name = service.name();
            let result = self
                .policy
                .run(name, LifecycleOp::Start, service.start())
                .await;
            match result {
                Ok(()) => {
                    debug!(service = name, "sub-service started");
                    started.push(service);
                }
                Err(err) => {
                    error!(service = name, error = %err, "sub-service failed to start");
                    if self.policy.rollback_on_start_failure {
                        self.roll_back(&started).await;
                    }
                    return Err(ProcessError::lifecycle_failure(
                        LifecycleOp::Start,
                        index + 1,
                        total,
                        name,
                        err,
                    ));
                }
            }
        }

        *self.started_at.write() = Some(Instant::now());
        self.running.store(true, Ordering::Release);
        info!(
            service = %self.service_name,
            version = %self.version,
            mode = %self.mode,
            "process service started"
        );
        Ok(())
    }

    async fn roll_back(&self, started: &[&Arc<dyn SubService>]) {
        for service in started.iter().rev() {
            let name = service.name();
            let result = self
                .policy
                .run(name, LifecycleOp::Stop, service.stop())
                .await;
            match result {
                Ok(()) => debug!(service = name, "rolled back sub-service start"),
                Err(err) => {
                    warn!(service = name, error = %err, "rollback stop failed")
                }
            }
        }
    }

    /// Stops every running sub-service, continuing past failures. State is
    /// cleared even when a stop fails; the first failure is returned after
    /// all stops were attempted.
    pub async fn stop(&self) -> Result<()> {
        let _guard = self.lifecycle_lock.lock().await;
        let mut first_error: Option<(&'static str, ProcessError)> = None;

        for service in self.services.iter().rev() {
            let name = service.name();
            if !service.is_running() {
                continue;
            }
            let result = self
                .policy
                .run(name, LifecycleOp::Stop, service.stop())
                .await;
            match result {
                Ok(()) => debug!(service = name, "sub-service stopped"),
                Err(err) => {
                    error!(service = name, error = %err, "sub-service failed to stop");
                    if first_error.is_none() {
                        first_error = Some((name, err));
                    }
                }
            }
        }

        let was_running = self.running.swap(false, Ordering::AcqRel);
        *self.started_at.write() = None;
        if was_running {
            info!(service = %self.service_name, "process service stopped");
        }

        match first_error {
            None => Ok(()),
            Some((name, err)) => Err(ProcessError::ServiceUnavailable {
                message: format!(
                    "failed to stop process service at {name}: {err}"
                ),
                cause: Some(Box::new(err)),
            }),
        }
    }

    pub async fn shutdown(&self) -> Result<()> {
        self.stop().await
    }

    /// Composite health. Never fails: a panic while collecting reports
    /// yields a report with every component in error.
    pub async fn health(&self) -> ServiceHealth {
        let collected = AssertUnwindSafe(self.collect_component_health())
            .catch_unwind()
            .await;

        match collected {
            Ok(components) => ServiceHealth::from_components(
                self.service_name.clone(),
                self.version.clone(),
                self.mode,
                self.is_running(),
                self.uptime(),
                components,
            ),
            Err(panic) => {
                let cause = panic_message(panic.as_ref());
                error!(service = %self.service_name, cause = %cause, "health aggregation panicked");
                ServiceHealth::total_failure(
                    self.service_name.clone(),
                    self.version.clone(),
                    self.mode,
                    self.service_names(),
                    format!("health aggregation failed: {cause}"),
                )
            }
        }
    }

    async fn collect_component_health(
        &self,
    ) -> BTreeMap<String, ComponentHealth> {
        let probes = self.services.iter().map(|service| async move {
            let name = service.name();
            let report = match self.policy.call_timeout {
                Some(limit) => {
                    match tokio::time::timeout(limit, service.health()).await {
                        Ok(report) => report,
                        Err(_) => {
                            warn!(service = name, ?limit, "health check timed out");
                            ComponentHealth::error("health check timed out")
                        }
                    }
                }
                None => service.health().await,
            };
            (name.to_string(), report)
        });

        join_all(probes).await.into_iter().collect()
    }

    fn ensure_running(&self) -> Result<()> {
        if self.is_running() {
            Ok(())
        } else {
            Err(ProcessError::unavailable("process service is not running"))
        }
    }

    fn sequence_service(&self) -> Result<&Arc<SequenceService>> {
        self.ensure_running()?;
        self.sequences.as_ref().ok_or_else(|| {
            ProcessError::unavailable("sequence service is not registered")
        })
    }

    pub fn start_sequence(&self, sequence_id: &str) -> Result<SequenceStatus> {
        self.sequence_service()?.start_sequence(sequence_id)
    }

    pub fn stop_sequence(&self, sequence_id: &str) -> Result<SequenceStatus> {
        self.sequence_service()?.stop_sequence(sequence_id)
    }

    pub fn sequence_status(&self, sequence_id: &str) -> Result<SequenceStatus> {
        self.sequence_service()?.get_sequence_status(sequence_id)
    }

    pub fn list_sequences(&self) -> Result<Vec<SequenceDefinition>> {
        Ok(self.sequence_service()?.list_sequences())
    }

    pub fn get_sequence(&self, sequence_id: &str) -> Result<SequenceDefinition> {
        self.sequence_service()?.get_sequence(sequence_id)
    }

    /// Registers a status listener. Refused with
    /// [`ProcessError::ServiceUnavailable`] unless the supervisor is running.
    pub fn subscribe_sequence<S: StatusSink>(
        &self,
        sequence_id: &str,
        sink: S,
    ) -> Result<Subscription> {
        self.sequence_service()?.subscribe(sequence_id, sink)
    }

    pub fn subscriber_count(&self, sequence_id: &str) -> usize {
        self.sequences
            .as_ref()
            .map(|sequences| sequences.hub().subscriber_count(sequence_id))
            .unwrap_or(0)
    }

    fn catalog(&self, kind: CatalogKind) -> Result<&Arc<CatalogService>> {
        self.ensure_running()?;
        self.catalogs.get(&kind).ok_or_else(|| {
            ProcessError::unavailable(format!("{kind} service is not registered"))
        })
    }

    pub fn catalog_entries(&self, kind: CatalogKind) -> Result<Vec<String>> {
        Ok(self.catalog(kind)?.list())
    }

    pub fn catalog_entry(&self, kind: CatalogKind, name: &str) -> Result<String> {
        self.catalog(kind)?.get(name)
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&'static str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
