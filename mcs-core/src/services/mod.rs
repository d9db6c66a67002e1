pub mod catalog;
pub mod sequence;

pub use catalog::{CatalogKind, CatalogService};
pub use sequence::{
    ProgressReporter, SequenceExecutor, SequenceService, SimulatedExecutor,
};
