use std::{
    collections::BTreeSet,
    fmt,
    path::{Path, PathBuf},
};

use async_trait::async_trait;
use mcs_model::ComponentHealth;
use parking_lot::RwLock;
use tracing::{debug, info};

use crate::{
    error::{ProcessError, Result},
    lifecycle::{LifecycleState, SubService},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CatalogKind {
    Pattern,
    Parameter,
    Schema,
}

impl CatalogKind {
    pub const ALL: [CatalogKind; 3] =
        [CatalogKind::Pattern, CatalogKind::Parameter, CatalogKind::Schema];

    /// Sub-service name used in health reports.
    pub fn name(&self) -> &'static str {
        match self {
            CatalogKind::Pattern => "pattern",
            CatalogKind::Parameter => "parameter",
            CatalogKind::Schema => "schema",
        }
    }

    /// Collection name; each catalog is served under `/process/{plural}`.
    pub fn plural(&self) -> &'static str {
        match self {
            CatalogKind::Pattern => "patterns",
            CatalogKind::Parameter => "parameters",
            CatalogKind::Schema => "schemas",
        }
    }
}

impl fmt::Display for CatalogKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Named entries of one kind, optionally indexed from a directory whose file
/// stems become entry names.
#[derive(Debug)]
pub struct CatalogService {
    kind: CatalogKind,
    source: Option<PathBuf>,
    entries: RwLock<BTreeSet<String>>,
    state: LifecycleState,
}

impl CatalogService {
    pub fn new(kind: CatalogKind, source: Option<PathBuf>) -> Self {
        Self {
            kind,
            source,
            entries: RwLock::new(BTreeSet::new()),
            state: LifecycleState::new(),
        }
    }

    /// Catalog without a backing directory, seeded with `entries`.
    pub fn in_memory<I, S>(kind: CatalogKind, entries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let service = Self::new(kind, None);
        service
            .entries
            .write()
            .extend(entries.into_iter().map(Into::into));
        service
    }

    pub fn kind(&self) -> CatalogKind {
        self.kind
    }

    pub fn list(&self) -> Vec<String> {
        self.entries.read().iter().cloned().collect()
    }

    pub fn get(&self, name: &str) -> Result<String> {
        self.entries.read().get(name).cloned().ok_or_else(|| {
            ProcessError::NotFound(format!("{} '{name}'", self.kind))
        })
    }

    async fn index(&self, dir: &Path) -> Result<BTreeSet<String>> {
        let init_error = |message: String| ProcessError::Initialization {
            service: self.kind.name().to_string(),
            message,
        };

        if !is_dir(dir).await {
            return Err(init_error(format!(
                "catalog directory {} is not reachable",
                dir.display()
            )));
        }

        let mut reader = tokio::fs::read_dir(dir).await.map_err(|err| {
            init_error(format!("failed to read {}: {err}", dir.display()))
        })?;

        let mut names = BTreeSet::new();
        while let Some(entry) = reader.next_entry().await.map_err(|err| {
            init_error(format!("failed to read {}: {err}", dir.display()))
        })? {
            let is_file = entry
                .file_type()
                .await
                .map(|kind| kind.is_file())
                .unwrap_or(false);
            if !is_file {
                continue;
            }
            let path = entry.path();
            if let Some(stem) = path.file_stem().and_then(|stem| stem.to_str()) {
                names.insert(stem.to_string());
            }
        }
        Ok(names)
    }
}

async fn is_dir(path: &Path) -> bool {
    tokio::fs::metadata(path)
        .await
        .map(|meta| meta.is_dir())
        .unwrap_or(false)
}

#[async_trait]
impl SubService for CatalogService {
    fn name(&self) -> &'static str {
        self.kind.name()
    }

    async fn initialize(&self) -> Result<()> {
        if let Some(dir) = &self.source {
            let names = self.index(dir).await?;
            debug!(catalog = %self.kind, entries = names.len(), dir = %dir.display(), "catalog indexed");
            *self.entries.write() = names;
        }
        self.state.mark_initialized();
        Ok(())
    }

    async fn start(&self) -> Result<()> {
        self.state.try_start(self.kind.name())?;
        info!(catalog = %self.kind, "catalog service started");
        Ok(())
    }

    async fn stop(&self) -> Result<()> {
        if self.state.mark_stopped() {
            info!(catalog = %self.kind, "catalog service stopped");
        }
        Ok(())
    }

    async fn health(&self) -> ComponentHealth {
        if !self.state.is_initialized() {
            return ComponentHealth::warning()
                .with_detail("reason", "not initialized");
        }
        if !self.state.is_running() {
            return ComponentHealth::warning().with_detail("reason", "not running");
        }

        let entries = self.entries.read().len() as u64;
        let Some(dir) = &self.source else {
            return ComponentHealth::ok().with_detail("entries", entries);
        };
        if !is_dir(dir).await {
            return ComponentHealth::error(format!(
                "catalog directory {} is unreachable",
                dir.display()
            ))
            .with_detail("entries", entries);
        }
        ComponentHealth::ok()
            .with_detail("entries", entries)
            .with_detail("source", dir.display().to_string())
    }

    fn is_running(&self) -> bool {
        self.state.is_running()
    }
}
