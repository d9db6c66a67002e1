//! Lifecycle supervision and sequence status fan-out for the MCS process
//! service.
//!
//! [`ProcessSupervisor`] owns the pattern, parameter, sequence and schema
//! sub-services, drives their lifecycle and folds their health into one
//! [`mcs_model::ServiceHealth`]. [`SequenceStatusHub`] delivers sequence
//! state transitions to any number of independent subscribers.

pub mod error;
pub mod lifecycle;
pub mod notify;
pub mod services;
pub mod supervisor;

pub use error::{LifecycleOp, ProcessError, Result};
pub use lifecycle::{LifecyclePolicy, LifecycleState, SubService};
pub use notify::{
    SequenceStatusHub, SinkClosed, StatusSink, Subscription, SubscriptionId,
};
pub use services::{
    CatalogKind, CatalogService, ProgressReporter, SequenceExecutor,
    SequenceService, SimulatedExecutor,
};
pub use supervisor::{ProcessSupervisor, ProcessSupervisorBuilder};
