//! Shared command setup: settings, store, dispatchers.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::catalog::StepCatalog;
use crate::config::{load_settings, Settings, StoreBackendKind};
use crate::dispatch::{SpoolDispatcher, TaskDispatcher};
use crate::error::{ProvflowError, Result};
use crate::handler::HandlerRegistry;
use crate::orchestrator::Orchestrator;
use crate::store::{FileBackend, KvBackend, MemoryBackend, WorkflowStore};

/// Everything a command needs to reach the store and the workers.
#[derive(Debug, Clone)]
pub struct CommandContext {
    settings: Settings,
    catalog: Arc<StepCatalog>,
}

impl CommandContext {
    pub fn new(settings: Settings) -> Self {
        Self {
            settings,
            catalog: Arc::new(StepCatalog::standard()),
        }
    }

    /// Load settings from `config` (or `provflow.yml` in `work_dir`) and
    /// apply a data directory override.
    pub fn load(
        work_dir: &Path,
        config: Option<&Path>,
        data_dir: Option<&Path>,
    ) -> Result<Self> {
        let config = config.map(|path| work_dir.join(path));
        let mut settings = load_settings(work_dir, config.as_deref())?;
        if let Some(dir) = data_dir {
            settings.data_dir = dir.to_path_buf();
        }
        if settings.data_dir.is_relative() {
            settings.data_dir = work_dir.join(&settings.data_dir);
        }
        Ok(Self::new(settings))
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn catalog(&self) -> Arc<StepCatalog> {
        Arc::clone(&self.catalog)
    }

    pub fn data_dir(&self) -> &PathBuf {
        &self.settings.data_dir
    }

    /// Open the workflow store configured in the settings.
    pub fn store(&self) -> WorkflowStore {
        let backend: Arc<dyn KvBackend> = match self.settings.store.backend {
            StoreBackendKind::File => Arc::new(FileBackend::new(self.settings.store_dir())),
            StoreBackendKind::Memory => Arc::new(MemoryBackend::new()),
        };
        WorkflowStore::new(backend, self.catalog()).with_retention(self.settings.store.retention())
    }

    pub fn spool(&self) -> SpoolDispatcher {
        SpoolDispatcher::new(self.settings.spool_dir())
    }

    /// Simulated handlers for every catalog task.
    pub fn registry(&self) -> HandlerRegistry {
        let worker = &self.settings.worker;
        HandlerRegistry::simulated(&self.catalog, &worker.failures, worker.step_delay())
    }

    /// Orchestrator that queues steps in the spool for `provflow worker`.
    pub fn spool_orchestrator(&self) -> Orchestrator {
        self.orchestrator(Arc::new(self.spool()))
    }

    pub fn orchestrator(&self, dispatcher: Arc<dyn TaskDispatcher>) -> Orchestrator {
        Orchestrator::new(self.catalog(), self.store(), dispatcher)
    }

    /// Validate a raw step index from the command line.
    pub fn step_index(&self, raw: i64) -> Result<usize> {
        usize::try_from(raw)
            .ok()
            .filter(|i| *i < self.catalog.len())
            .ok_or(ProvflowError::InvalidIndex {
                index: raw,
                total: self.catalog.len(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn data_dir_override_wins() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("provflow.yml"), "data_dir: from-file\n").unwrap();
        let override_dir = temp.path().join("override");

        let ctx = CommandContext::load(temp.path(), None, Some(&override_dir)).unwrap();
        assert_eq!(ctx.data_dir(), &override_dir);
    }

    #[test]
    fn relative_data_dir_is_anchored_to_work_dir() {
        let temp = TempDir::new().unwrap();
        let ctx = CommandContext::load(temp.path(), None, None).unwrap();
        assert_eq!(ctx.data_dir(), &temp.path().join(".provflow"));
    }

    #[test]
    fn step_index_bounds() {
        let ctx = CommandContext::new(Settings::default());
        assert_eq!(ctx.step_index(4).unwrap(), 4);
        assert!(matches!(
            ctx.step_index(-1),
            Err(ProvflowError::InvalidIndex { index: -1, total: 5 })
        ));
        assert!(matches!(
            ctx.step_index(5),
            Err(ProvflowError::InvalidIndex { index: 5, .. })
        ));
    }

    #[test]
    fn store_is_shared_through_data_dir() {
        let temp = TempDir::new().unwrap();
        let ctx = CommandContext::load(temp.path(), None, None).unwrap();

        let rec = ctx.store().create("srv-001", "Ubuntu 20.04").unwrap();
        assert!(ctx.store().get(&rec.workflow_id).is_ok());
    }
}
