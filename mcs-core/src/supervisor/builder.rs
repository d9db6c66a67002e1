use std::{
    collections::{HashMap, HashSet},
    fmt,
    sync::{Arc, atomic::AtomicBool},
};

use mcs_model::ServiceMode;
use parking_lot::RwLock;
use tokio::sync::Mutex;

use super::ProcessSupervisor;
use crate::{
    error::{ProcessError, Result},
    lifecycle::{LifecyclePolicy, SubService},
    services::{CatalogKind, CatalogService, SequenceService},
};

/// Collects sub-services in lifecycle order. Registration order is the order
/// used by `initialize` and `start`.
pub struct ProcessSupervisorBuilder {
    service_name: String,
    version: String,
    mode: ServiceMode,
    policy: LifecyclePolicy,
    services: Vec<Arc<dyn SubService>>,
    catalogs: HashMap<CatalogKind, Arc<CatalogService>>,
    sequences: Option<Arc<SequenceService>>,
}

impl fmt::Debug for ProcessSupervisorBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> =
            self.services.iter().map(|service| service.name()).collect();
        f.debug_struct("ProcessSupervisorBuilder")
            .field("service_name", &self.service_name)
            .field("version", &self.version)
            .field("mode", &self.mode)
            .field("policy", &self.policy)
            .field("services", &names)
            .finish()
    }
}

impl ProcessSupervisorBuilder {
    pub(super) fn new(service_name: String, version: String) -> Self {
        Self {
            service_name,
            version,
            mode: ServiceMode::default(),
            policy: LifecyclePolicy::default(),
            services: Vec::new(),
            catalogs: HashMap::new(),
            sequences: None,
        }
    }

    pub fn mode(mut self, mode: ServiceMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn policy(mut self, policy: LifecyclePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Registers a catalog sub-service and exposes its entries through the
    /// supervisor.
    pub fn catalog(mut self, catalog: Arc<CatalogService>) -> Self {
        self.catalogs.insert(catalog.kind(), Arc::clone(&catalog));
        self.services.push(catalog);
        self
    }

    /// Registers the sequence sub-service backing the sequence control
    /// surface.
    pub fn sequences(mut self, sequences: Arc<SequenceService>) -> Self {
        self.sequences = Some(Arc::clone(&sequences));
        self.services.push(sequences);
        self
    }

    pub fn service(mut self, service: Arc<dyn SubService>) -> Self {
        self.services.push(service);
        self
    }

    /// Fails with [`ProcessError::Validation`] when two sub-services share a
    /// name.
    pub fn build(self) -> Result<ProcessSupervisor> {
        let mut names = HashSet::new();
        for service in &self.services {
            if !names.insert(service.name()) {
                return Err(ProcessError::Validation(format!(
                    "sub-service '{}' registered more than once",
                    service.name()
                )));
            }
        }

        Ok(ProcessSupervisor {
            service_name: self.service_name,
            version: self.version,
            mode: self.mode,
            policy: self.policy,
            services: self.services,
            catalogs: self.catalogs,
            sequences: self.sequences,
            lifecycle_lock: Mutex::new(()),
            running: AtomicBool::new(false),
            started_at: RwLock::new(None),
        })
    }
}
