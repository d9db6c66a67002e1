use std::sync::Arc;

use mcs_config::Config;
use mcs_core::{
    CatalogKind, CatalogService, LifecyclePolicy, ProcessSupervisor, Result,
    SequenceService, SequenceStatusHub, SimulatedExecutor,
};
use tracing::info;

/// Assembles the supervisor from configuration. Sub-services register in
/// lifecycle order: pattern, parameter, sequence, schema.
pub fn build_supervisor(config: &Config) -> Result<Arc<ProcessSupervisor>> {
    let hub = SequenceStatusHub::new(
        config.notifications.queue_capacity,
        config.notifications.overflow,
    );
    let executor = Arc::new(SimulatedExecutor::new(config.sequences.step_interval));
    let sequences = SequenceService::new(
        config.sequences.definitions.clone(),
        hub,
        executor,
    )?;

    let policy = LifecyclePolicy {
        call_timeout: config.lifecycle.call_timeout,
        rollback_on_start_failure: config.lifecycle.rollback_on_start_failure,
    };

    let catalogs = &config.catalogs;
    let supervisor = ProcessSupervisor::builder(
        config.service.name.clone(),
        config.service.version.clone(),
    )
    .mode(config.service.mode)
    .policy(policy)
    .catalog(Arc::new(CatalogService::new(
        CatalogKind::Pattern,
        catalogs.pattern_dir.clone(),
    )))
    .catalog(Arc::new(CatalogService::new(
        CatalogKind::Parameter,
        catalogs.parameter_dir.clone(),
    )))
    .sequences(Arc::new(sequences))
    .catalog(Arc::new(CatalogService::new(
        CatalogKind::Schema,
        catalogs.schema_dir.clone(),
    )))
    .build()?;

    info!(
        service = %supervisor.service_name(),
        mode = %supervisor.mode(),
        sub_services = ?supervisor.service_names(),
        "process supervisor assembled"
    );
    Ok(Arc::new(supervisor))
}
