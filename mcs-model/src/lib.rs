//! Core data model definitions shared across MCS crates.

pub use ::chrono;

pub mod api;
pub mod error;
pub mod health;
pub mod mode;
pub mod notification;
pub mod sequence;

pub use api::{
    CatalogEntryResponse, CatalogListResponse, SequenceListResponse,
    SequenceResponse, StatusResponse,
};
pub use error::ModelError;
pub use health::{ComponentHealth, HealthDetails, HealthStatus, ServiceHealth, ServiceStatus};
pub use mode::ServiceMode;
pub use notification::OverflowPolicy;
pub use sequence::{
    SequenceDefinition, SequenceState, SequenceStatus, SequenceStreamMessage,
};
