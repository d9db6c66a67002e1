//! Response bodies for the process REST surface.

use serde::{Deserialize, Serialize};

use crate::{SequenceDefinition, SequenceStatus};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SequenceListResponse {
    pub sequences: Vec<SequenceDefinition>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SequenceResponse {
    pub sequence: SequenceDefinition,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusResponse {
    pub status: SequenceStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogListResponse {
    pub catalog: String,
    pub entries: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntryResponse {
    pub catalog: String,
    pub name: String,
}
