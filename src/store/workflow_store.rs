//! Workflow record storage.

use chrono::Duration;
use std::sync::Arc;

use crate::catalog::StepCatalog;
use crate::error::{ProvflowError, Result};
use crate::workflow::{CorrelationId, StepStatus, WorkflowId, WorkflowRecord};

use super::backend::{Expect, KvBackend, StoredEntry};

/// Records are evicted this long after their last write.
pub const DEFAULT_RETENTION_HOURS: i64 = 24;

/// How many times [`WorkflowStore::mutate`] re-reads after losing a race.
pub const MAX_CONFLICT_RETRIES: usize = 16;

const KEY_PREFIX: &str = "workflow:";

/// What a [`WorkflowStore::mutate`] closure decided to do with the record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Change<T> {
    /// Persist the modified record.
    Commit(T),
    /// Leave the stored record as it was.
    Discard(T),
}

/// Durable CRUD over workflow records with bounded retention.
pub struct WorkflowStore {
    backend: Arc<dyn KvBackend>,
    catalog: Arc<StepCatalog>,
    retention: Duration,
}

impl WorkflowStore {
    /// Create a store with the default 24 hour retention.
    pub fn new(backend: Arc<dyn KvBackend>, catalog: Arc<StepCatalog>) -> Self {
        Self {
            backend,
            catalog,
            retention: Duration::hours(DEFAULT_RETENTION_HOURS),
        }
    }

    /// Override the retention window.
    pub fn with_retention(mut self, retention: Duration) -> Self {
        self.retention = retention;
        self
    }

    /// The catalog every record is built from.
    pub fn catalog(&self) -> &StepCatalog {
        &self.catalog
    }

    /// The retention window applied on every write.
    pub fn retention(&self) -> Duration {
        self.retention
    }

    /// Allocate a new id and persist a pending record for it.
    pub fn create(&self, target_id: &str, config: &str) -> Result<WorkflowRecord> {
        let mut record = WorkflowRecord::new(WorkflowId::new(), target_id, config, &self.catalog);
        record.revision = 1;
        let entry = self.encode(&record)?;
        self.backend.put(entry, Expect::Absent)?;

        tracing::info!(
            workflow_id = %record.workflow_id,
            target = target_id,
            "Created workflow"
        );
        Ok(record)
    }

    /// Load a record; `NotFound` if absent or expired.
    pub fn get(&self, id: &WorkflowId) -> Result<WorkflowRecord> {
        let entry = self
            .backend
            .get(&id.store_key())?
            .ok_or_else(|| ProvflowError::NotFound {
                workflow_id: id.to_string(),
            })?;

        let mut record: WorkflowRecord = serde_json::from_str(&entry.body)?;
        record.revision = entry.revision;
        Ok(record)
    }

    /// Persist a full record and refresh its TTL.
    ///
    /// The write only succeeds if the stored revision still equals
    /// `record.revision`; on success the record carries its new revision.
    pub fn save(&self, record: &mut WorkflowRecord) -> Result<()> {
        let expected = record.revision;
        record.touch();
        record.revision = expected + 1;

        let entry = match self.encode(record) {
            Ok(entry) => entry,
            Err(e) => {
                record.revision = expected;
                return Err(e);
            }
        };
        if let Err(e) = self.backend.put(entry, Expect::Revision(expected)) {
            record.revision = expected;
            return Err(e);
        }
        Ok(())
    }

    /// Run one read-modify-write transaction against a record.
    ///
    /// `apply` may run several times: when another writer commits first, the
    /// record is re-read and `apply` reapplied to the fresh copy.
    pub fn mutate<T>(
        &self,
        id: &WorkflowId,
        mut apply: impl FnMut(&mut WorkflowRecord) -> Result<Change<T>>,
    ) -> Result<(WorkflowRecord, T)> {
        for attempt in 0..MAX_CONFLICT_RETRIES {
            let mut record = self.get(id)?;
            match apply(&mut record)? {
                Change::Discard(value) => return Ok((record, value)),
                Change::Commit(value) => match self.save(&mut record) {
                    Ok(()) => return Ok((record, value)),
                    Err(ProvflowError::Conflict { .. }) => {
                        tracing::debug!(
                            workflow_id = %id,
                            attempt,
                            "Revision conflict, re-reading record"
                        );
                    }
                    Err(e) => return Err(e),
                },
            }
        }

        Err(ProvflowError::Conflict {
            key: id.store_key(),
        })
    }

    /// Set a step's status and correlation id.
    pub fn update_step_status(
        &self,
        id: &WorkflowId,
        step_index: usize,
        status: StepStatus,
        correlation_id: Option<CorrelationId>,
    ) -> Result<WorkflowRecord> {
        let (record, ()) = self.mutate(id, |record| {
            record.set_step_status(step_index, status, correlation_id.clone())?;
            Ok(Change::Commit(()))
        })?;
        Ok(record)
    }

    /// Mark a step completed with its result.
    pub fn complete_step(
        &self,
        id: &WorkflowId,
        step_index: usize,
        result: &str,
    ) -> Result<WorkflowRecord> {
        let (record, ()) = self.mutate(id, |record| {
            record.complete_step(step_index, Some(result.to_string()))?;
            Ok(Change::Commit(()))
        })?;
        Ok(record)
    }

    /// Mark a step and its run failed.
    pub fn fail_step(&self, id: &WorkflowId, step_index: usize, error: &str) -> Result<WorkflowRecord> {
        let (record, ()) = self.mutate(id, |record| {
            record.fail_step(step_index, error)?;
            Ok(Change::Commit(()))
        })?;
        Ok(record)
    }

    /// All live records, newest first.
    pub fn list(&self) -> Result<Vec<WorkflowRecord>> {
        let mut records = Vec::new();
        for key in self.backend.keys(KEY_PREFIX)? {
            let id = WorkflowId::from_string(&key[KEY_PREFIX.len()..]);
            match self.get(&id) {
                Ok(record) => records.push(record),
                // Expired between listing and reading.
                Err(ProvflowError::NotFound { .. }) => {}
                Err(e) => return Err(e),
            }
        }
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(records)
    }

    /// Remove a record.
    pub fn delete(&self, id: &WorkflowId) -> Result<bool> {
        self.backend.delete(&id.store_key())
    }

    /// Evict records past their retention window.
    pub fn purge_expired(&self) -> Result<usize> {
        self.backend.purge_expired()
    }

    fn encode(&self, record: &WorkflowRecord) -> Result<StoredEntry> {
        let body = serde_json::to_string(record)?;
        Ok(StoredEntry::new(
            record.workflow_id.store_key(),
            record.revision,
            body,
            self.retention,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{FileBackend, MemoryBackend};
    use crate::workflow::WorkflowStatus;

    fn store() -> WorkflowStore {
        WorkflowStore::new(
            Arc::new(MemoryBackend::new()),
            Arc::new(StepCatalog::standard()),
        )
    }

    #[test]
    fn create_persists_pending_record() {
        let store = store();
        let rec = store.create("srv-001", "Ubuntu 20.04").unwrap();

        assert_eq!(rec.total_steps, 5);
        assert_eq!(rec.status, WorkflowStatus::Pending);
        assert_eq!(rec.revision, 1);

        let loaded = store.get(&rec.workflow_id).unwrap();
        assert_eq!(loaded, rec);
    }

    #[test]
    fn get_unknown_is_not_found() {
        let store = store();
        let err = store.get(&WorkflowId::from_string("wf_nope")).unwrap_err();
        assert!(matches!(err, ProvflowError::NotFound { .. }));
    }

    #[test]
    fn expired_record_is_not_found() {
        let store = store().with_retention(Duration::zero());
        let rec = store.create("srv-001", "Ubuntu 20.04").unwrap();

        let err = store.get(&rec.workflow_id).unwrap_err();
        assert!(matches!(err, ProvflowError::NotFound { .. }));
        assert_eq!(store.purge_expired().unwrap(), 1);
    }

    #[test]
    fn save_bumps_revision_and_rejects_stale_copies() {
        let store = store();
        let mut first = store.create("srv-001", "Ubuntu 20.04").unwrap();
        let mut second = first.clone();

        first.config = "Debian 12".into();
        store.save(&mut first).unwrap();
        assert_eq!(first.revision, 2);

        second.config = "Rocky 9".into();
        let err = store.save(&mut second).unwrap_err();
        assert!(matches!(err, ProvflowError::Conflict { .. }));
        assert_eq!(second.revision, 1);
        assert_eq!(store.get(&first.workflow_id).unwrap().config, "Debian 12");
    }

    #[test]
    fn save_never_moves_updated_at_backwards() {
        let store = store();
        let mut rec = store.create("srv-001", "Ubuntu 20.04").unwrap();
        let before = rec.updated_at;

        store.save(&mut rec).unwrap();

        assert!(rec.updated_at >= before);
    }

    #[test]
    fn update_step_status_running_moves_current_step() {
        let store = store();
        let rec = store.create("srv-001", "Ubuntu 20.04").unwrap();

        let rec = store
            .update_step_status(
                &rec.workflow_id,
                2,
                StepStatus::Running,
                Some(CorrelationId::new("c-2")),
            )
            .unwrap();

        assert_eq!(rec.current_step, 2);
        assert_eq!(rec.status, WorkflowStatus::Running);
        assert!(rec.step(2).unwrap().started_at.is_some());
    }

    #[test]
    fn update_step_status_rejects_bad_index_without_writing() {
        let store = store();
        let rec = store.create("srv-001", "Ubuntu 20.04").unwrap();

        let err = store
            .update_step_status(&rec.workflow_id, 5, StepStatus::Running, None)
            .unwrap_err();

        assert!(matches!(err, ProvflowError::InvalidIndex { index: 5, .. }));
        assert_eq!(store.get(&rec.workflow_id).unwrap().revision, 1);
    }

    #[test]
    fn complete_last_step_completes_record() {
        let store = store();
        let rec = store.create("srv-001", "Ubuntu 20.04").unwrap();

        let rec = store.complete_step(&rec.workflow_id, 4, "registered").unwrap();

        assert_eq!(rec.status, WorkflowStatus::Completed);
        assert!(rec.completed_at.is_some());
        assert_eq!(rec.step(4).unwrap().result.as_deref(), Some("registered"));
    }

    #[test]
    fn fail_step_records_error() {
        let store = store();
        let rec = store.create("srv-001", "Ubuntu 20.04").unwrap();

        let rec = store.fail_step(&rec.workflow_id, 1, "hardware fault").unwrap();

        assert_eq!(rec.status, WorkflowStatus::Failed);
        assert_eq!(rec.last_error.as_deref(), Some("hardware fault"));
    }

    #[test]
    fn mutate_discard_does_not_write() {
        let store = store();
        let rec = store.create("srv-001", "Ubuntu 20.04").unwrap();

        let (loaded, value) = store
            .mutate(&rec.workflow_id, |r| {
                r.config = "changed".into();
                Ok(Change::Discard(42))
            })
            .unwrap();

        assert_eq!(value, 42);
        assert_eq!(loaded.revision, 1);
        assert_eq!(store.get(&rec.workflow_id).unwrap().config, "Ubuntu 20.04");
    }

    #[test]
    fn mutate_reapplies_after_conflict() {
        let store = store();
        let rec = store.create("srv-001", "Ubuntu 20.04").unwrap();
        let id = rec.workflow_id.clone();
        let mut calls = 0;

        let (saved, ()) = store
            .mutate(&id, |r| {
                calls += 1;
                if calls == 1 {
                    // Another writer commits between our read and our write.
                    let mut other = store.get(&id).unwrap();
                    other.target_id = "srv-002".into();
                    store.save(&mut other).unwrap();
                }
                r.config = "Debian 12".into();
                Ok(Change::Commit(()))
            })
            .unwrap();

        assert_eq!(calls, 2);
        assert_eq!(saved.revision, 3);
        let loaded = store.get(&id).unwrap();
        assert_eq!(loaded.target_id, "srv-002");
        assert_eq!(loaded.config, "Debian 12");
    }

    #[test]
    fn list_returns_newest_first() {
        let store = store();
        let a = store.create("srv-a", "Ubuntu").unwrap();
        std::thread::sleep(std::time::Duration::from_millis(5));
        let b = store.create("srv-b", "Ubuntu").unwrap();

        let ids: Vec<_> = store
            .list()
            .unwrap()
            .into_iter()
            .map(|r| r.workflow_id)
            .collect();
        assert_eq!(ids, vec![b.workflow_id, a.workflow_id]);
    }

    #[test]
    fn file_backed_store_survives_reopen() {
        let temp = tempfile::TempDir::new().unwrap();
        let catalog = Arc::new(StepCatalog::standard());
        let rec = {
            let store = WorkflowStore::new(Arc::new(FileBackend::new(temp.path())), catalog.clone());
            store.create("srv-001", "Ubuntu 20.04").unwrap()
        };

        let reopened = WorkflowStore::new(Arc::new(FileBackend::new(temp.path())), catalog);
        assert_eq!(reopened.get(&rec.workflow_id).unwrap(), rec);
    }

    #[test]
    fn delete_removes_record() {
        let store = store();
        let rec = store.create("srv-001", "Ubuntu 20.04").unwrap();

        assert!(store.delete(&rec.workflow_id).unwrap());
        assert!(store.get(&rec.workflow_id).is_err());
    }
}
