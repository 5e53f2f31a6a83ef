//! The orchestrator proper.

use std::sync::mpsc::{Receiver, RecvTimeoutError};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::catalog::{StepCatalog, StepDefinition};
use crate::dispatch::{TaskArgs, TaskDispatcher, TaskSubmission};
use crate::error::{ProvflowError, Result};
use crate::handler::{StepEvent, StepOutcome};
use crate::store::{Change, WorkflowStore};
use crate::workflow::{CorrelationId, WorkflowId, WorkflowRecord, WorkflowStatus};

use super::callback::{classify, CallbackOutcome};
use super::locks::KeyLocks;

/// Drives workflow records through the step catalog.
pub struct Orchestrator {
    catalog: Arc<StepCatalog>,
    store: WorkflowStore,
    dispatcher: Arc<dyn TaskDispatcher>,
    locks: KeyLocks,
}

impl Orchestrator {
    pub fn new(
        catalog: Arc<StepCatalog>,
        store: WorkflowStore,
        dispatcher: Arc<dyn TaskDispatcher>,
    ) -> Self {
        Self {
            catalog,
            store,
            dispatcher,
            locks: KeyLocks::new(),
        }
    }

    pub fn catalog(&self) -> &StepCatalog {
        &self.catalog
    }

    pub fn store(&self) -> &WorkflowStore {
        &self.store
    }

    /// The ordered step definitions every workflow runs.
    pub fn list_catalog(&self) -> &[StepDefinition] {
        self.catalog.steps()
    }

    /// Persist a new pending workflow. Nothing is dispatched.
    pub fn create_workflow(&self, target_id: &str, config: &str) -> Result<WorkflowRecord> {
        self.store.create(target_id, config)
    }

    /// Dispatch the first step of a pending workflow.
    pub fn start_workflow(&self, id: &WorkflowId) -> Result<WorkflowRecord> {
        self.locks.with_lock(id.as_str(), || {
            let record = self.store.get(id)?;
            if record.status == WorkflowStatus::Completed
                || record.current_step >= record.total_steps
            {
                return Err(ProvflowError::AlreadyCompleted {
                    workflow_id: id.to_string(),
                });
            }
            if record.status != WorkflowStatus::Pending {
                return Err(ProvflowError::InvalidState {
                    workflow_id: id.to_string(),
                    status: record.status,
                    operation: "start".to_string(),
                });
            }

            tracing::info!(workflow_id = %id, target = %record.target_id, "Starting workflow");
            self.dispatch_current_step(&record)
        })
    }

    /// Report that a step finished successfully.
    ///
    /// Without a correlation id the outcome is accepted only for the running
    /// current step. Prefer [`apply_event`](Self::apply_event) or
    /// [`report`](Self::report) when the dispatch correlation id is known.
    pub fn on_step_completed(
        &self,
        id: &WorkflowId,
        step_index: usize,
        result: &str,
    ) -> Result<CallbackOutcome> {
        self.report(
            id,
            step_index,
            None,
            StepOutcome::Completed {
                result: result.to_string(),
            },
        )
    }

    /// Report that a step failed after its retry budget was spent.
    pub fn on_step_failed(
        &self,
        id: &WorkflowId,
        step_index: usize,
        error: &str,
    ) -> Result<CallbackOutcome> {
        self.report(
            id,
            step_index,
            None,
            StepOutcome::Failed {
                error: error.to_string(),
            },
        )
    }

    /// Apply an outcome published by a worker.
    pub fn apply_event(&self, event: StepEvent) -> Result<CallbackOutcome> {
        self.report(
            &event.workflow_id,
            event.step_index,
            Some(&event.correlation_id),
            event.outcome,
        )
    }

    /// Apply a step outcome, optionally tied to a dispatch attempt.
    ///
    /// Completing a step that is not the last dispatches the next one.
    /// Outcomes from superseded attempts and repeats of an already recorded
    /// outcome leave the record untouched.
    pub fn report(
        &self,
        id: &WorkflowId,
        step_index: usize,
        correlation_id: Option<&CorrelationId>,
        outcome: StepOutcome,
    ) -> Result<CallbackOutcome> {
        self.locks.with_lock(id.as_str(), || {
            let (record, verdict) = self.store.mutate(id, |record| {
                let index = record.check_index(step_index as i64)?;
                let verdict = classify(record, index, correlation_id);
                if !verdict.is_applied() {
                    return Ok(Change::Discard(verdict));
                }

                match &outcome {
                    StepOutcome::Completed { result } => {
                        record.complete_step(index, Some(result.clone()))?;
                        record.advance_past(index)?;
                    }
                    StepOutcome::Failed { error } => record.fail_step(index, error.as_str())?,
                }
                Ok(Change::Commit(verdict))
            })?;

            match verdict {
                CallbackOutcome::Applied => self.after_applied(&record, step_index, &outcome)?,
                CallbackOutcome::Duplicate => tracing::info!(
                    workflow_id = %id,
                    step = step_index,
                    "Ignoring repeated outcome for finished step"
                ),
                CallbackOutcome::Stale => tracing::warn!(
                    workflow_id = %id,
                    step = step_index,
                    correlation_id = correlation_id.map(CorrelationId::as_str).unwrap_or("-"),
                    "Ignoring outcome from a superseded attempt"
                ),
            }
            Ok(verdict)
        })
    }

    fn after_applied(
        &self,
        record: &WorkflowRecord,
        step_index: usize,
        outcome: &StepOutcome,
    ) -> Result<()> {
        let id = &record.workflow_id;
        match outcome {
            StepOutcome::Failed { error } => {
                tracing::error!(workflow_id = %id, step = step_index, "Step failed: {}", error);
            }
            StepOutcome::Completed { .. } if record.status == WorkflowStatus::Completed => {
                tracing::info!(workflow_id = %id, "Workflow completed");
            }
            StepOutcome::Completed { .. } => {
                tracing::info!(workflow_id = %id, step = step_index, "Step completed");
                if let Err(e) = self.dispatch_current_step(record) {
                    tracing::error!(
                        workflow_id = %id,
                        step = record.current_step,
                        "Run stalled; retry from step {} once the dispatcher recovers",
                        record.current_step
                    );
                    return Err(e);
                }
            }
        }
        Ok(())
    }

    /// Reset steps `step_index..` to pending and dispatch `step_index`.
    ///
    /// Steps before `step_index` keep their recorded outcomes. Outcomes that
    /// later arrive for the reset attempts are treated as stale.
    pub fn retry_from_step(&self, id: &WorkflowId, step_index: usize) -> Result<WorkflowRecord> {
        self.locks.with_lock(id.as_str(), || {
            let (record, index) = self.store.mutate(id, |record| {
                let index = record.check_index(step_index as i64)?;
                record.reset_from(index)?;
                Ok(Change::Commit(index))
            })?;

            tracing::info!(workflow_id = %id, step = index, "Retrying workflow from step");
            self.dispatch_current_step(&record)
        })
    }

    /// Current record for a workflow.
    pub fn get_status(&self, id: &WorkflowId) -> Result<WorkflowRecord> {
        self.store.get(id)
    }

    /// All live workflows, newest first.
    pub fn list_workflows(&self) -> Result<Vec<WorkflowRecord>> {
        self.store.list()
    }

    /// Evict records past their retention window.
    pub fn purge_expired(&self) -> Result<usize> {
        let removed = self.store.purge_expired()?;
        if removed > 0 {
            tracing::info!(removed, "Purged expired workflows");
        }
        Ok(removed)
    }

    /// Apply events from `events` until the workflow is no longer running.
    ///
    /// Events for other workflows are applied along the way. Fails with
    /// `Timeout` when nothing brings the run to rest within `timeout`.
    pub fn run_until_rest(
        &self,
        id: &WorkflowId,
        events: &Receiver<StepEvent>,
        timeout: Duration,
    ) -> Result<WorkflowRecord> {
        let deadline = Instant::now() + timeout;
        loop {
            let record = self.store.get(id)?;
            if record.status.is_at_rest() {
                return Ok(record);
            }

            let remaining = deadline.saturating_duration_since(Instant::now());
            let event = match events.recv_timeout(remaining) {
                Ok(event) => event,
                Err(RecvTimeoutError::Timeout) => {
                    return Err(ProvflowError::Timeout {
                        workflow_id: id.to_string(),
                    })
                }
                Err(RecvTimeoutError::Disconnected) => {
                    return Err(ProvflowError::Other(anyhow::anyhow!(
                        "step event channel closed while workflow {} was running",
                        id
                    )))
                }
            };

            let event_workflow = event.workflow_id.clone();
            match self.apply_event(event) {
                Ok(_) => {}
                Err(e) if &event_workflow == id => return Err(e),
                Err(e) => {
                    tracing::error!(workflow_id = %event_workflow, "Failed to apply step event: {}", e)
                }
            }
        }
    }

    /// Apply every event already queued on `events` without blocking.
    ///
    /// Returns how many events were applied.
    pub fn drain_events(&self, events: &Receiver<StepEvent>) -> usize {
        let mut applied = 0;
        while let Ok(event) = events.try_recv() {
            let event_workflow = event.workflow_id.clone();
            match self.apply_event(event) {
                Ok(CallbackOutcome::Applied) => applied += 1,
                Ok(_) => {}
                Err(e) => {
                    tracing::error!(workflow_id = %event_workflow, "Failed to apply step event: {}", e)
                }
            }
        }
        applied
    }

    /// Submit the record's current step and record it as running.
    ///
    /// A rejected submission leaves the record exactly as it was. The running
    /// write only lands if the stored record is still the revision the task
    /// was submitted from; otherwise another writer got there first and the
    /// submitted attempt is left unrecorded, so its outcome reads as stale.
    fn dispatch_current_step(&self, record: &WorkflowRecord) -> Result<WorkflowRecord> {
        let index = record.current_step;
        let base_revision = record.revision;
        let def = self
            .catalog
            .get(index)
            .ok_or_else(|| ProvflowError::AlreadyCompleted {
                workflow_id: record.workflow_id.to_string(),
            })?;

        let submission = TaskSubmission {
            task_name: def.task_name.clone(),
            args: TaskArgs {
                workflow_id: record.workflow_id.clone(),
                target_id: record.target_id.clone(),
                config: record.config.clone(),
                step_index: index,
            },
            retry_budget: def.retry_budget,
        };

        let correlation_id = match self.dispatcher.submit(&submission) {
            Ok(correlation_id) => correlation_id,
            Err(e) => {
                tracing::error!(
                    workflow_id = %record.workflow_id,
                    step = index,
                    task = %def.task_name,
                    "Dispatch rejected: {}",
                    e
                );
                return Err(e);
            }
        };

        tracing::info!(
            workflow_id = %record.workflow_id,
            step = index,
            task = %def.task_name,
            correlation_id = %correlation_id,
            "Dispatched step"
        );
        let (current, recorded) = self.store.mutate(&record.workflow_id, |current| {
            if current.revision != base_revision || !current.awaits_dispatch(index) {
                return Ok(Change::Discard(false));
            }
            current.mark_step_running(index, Some(correlation_id.clone()))?;
            Ok(Change::Commit(true))
        })?;

        if !recorded {
            tracing::warn!(
                workflow_id = %record.workflow_id,
                step = index,
                correlation_id = %correlation_id,
                "Record changed while dispatching; leaving the submitted attempt unrecorded"
            );
        }
        Ok(current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::MockDispatcher;
    use crate::store::MemoryBackend;
    use crate::workflow::StepStatus;

    fn orchestrator() -> (Orchestrator, Arc<MockDispatcher>) {
        let catalog = Arc::new(StepCatalog::standard());
        let store = WorkflowStore::new(Arc::new(MemoryBackend::new()), catalog.clone());
        let dispatcher = Arc::new(MockDispatcher::new());
        (
            Orchestrator::new(catalog, store, dispatcher.clone()),
            dispatcher,
        )
    }

    #[test]
    fn start_dispatches_first_step() {
        let (orch, dispatcher) = orchestrator();
        let rec = orch.create_workflow("srv-001", "Ubuntu 20.04").unwrap();

        let rec = orch.start_workflow(&rec.workflow_id).unwrap();

        assert_eq!(rec.status, WorkflowStatus::Running);
        assert_eq!(rec.step(0).unwrap().status, StepStatus::Running);
        let (corr, submission) = dispatcher.last().unwrap();
        assert_eq!(submission.task_name, "reinstall_os");
        assert_eq!(submission.retry_budget, 3);
        assert_eq!(rec.step(0).unwrap().correlation_id, Some(corr));
    }

    #[test]
    fn start_twice_is_invalid_state() {
        let (orch, dispatcher) = orchestrator();
        let rec = orch.create_workflow("srv-001", "Ubuntu 20.04").unwrap();
        orch.start_workflow(&rec.workflow_id).unwrap();

        let err = orch.start_workflow(&rec.workflow_id).unwrap_err();

        assert!(matches!(err, ProvflowError::InvalidState { .. }));
        assert_eq!(dispatcher.count(), 1);
    }

    #[test]
    fn completion_advances_and_dispatches_next() {
        let (orch, dispatcher) = orchestrator();
        let id = orch.create_workflow("srv-001", "Ubuntu 20.04").unwrap().workflow_id;
        orch.start_workflow(&id).unwrap();

        let verdict = orch.on_step_completed(&id, 0, "os ready").unwrap();

        assert_eq!(verdict, CallbackOutcome::Applied);
        let rec = orch.get_status(&id).unwrap();
        assert_eq!(rec.current_step, 1);
        assert_eq!(rec.step(1).unwrap().status, StepStatus::Running);
        assert_eq!(dispatcher.last().unwrap().1.task_name, "install_base_env");
    }

    #[test]
    fn stale_correlation_is_ignored() {
        let (orch, _dispatcher) = orchestrator();
        let id = orch.create_workflow("srv-001", "Ubuntu 20.04").unwrap().workflow_id;
        orch.start_workflow(&id).unwrap();
        let before = orch.get_status(&id).unwrap();

        let verdict = orch
            .report(
                &id,
                0,
                Some(&CorrelationId::new("someone-else")),
                StepOutcome::Completed { result: "x".into() },
            )
            .unwrap();

        assert_eq!(verdict, CallbackOutcome::Stale);
        assert_eq!(orch.get_status(&id).unwrap(), before);
    }

    #[test]
    fn out_of_range_callback_is_invalid_index() {
        let (orch, _dispatcher) = orchestrator();
        let id = orch.create_workflow("srv-001", "Ubuntu 20.04").unwrap().workflow_id;
        orch.start_workflow(&id).unwrap();

        let err = orch.on_step_completed(&id, 5, "x").unwrap_err();
        assert!(matches!(err, ProvflowError::InvalidIndex { index: 5, .. }));
    }

    #[test]
    fn locks_are_released_after_operations() {
        let (orch, _dispatcher) = orchestrator();
        let id = orch.create_workflow("srv-001", "Ubuntu 20.04").unwrap().workflow_id;
        orch.start_workflow(&id).unwrap();
        orch.on_step_failed(&id, 0, "boom").unwrap();

        assert!(orch.locks.is_empty());
    }
}
