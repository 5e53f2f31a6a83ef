//! Spool worker: executes tasks queued by a [`SpoolDispatcher`].
//!
//! The worker runs in its own process. For each spooled task it checks the
//! stored record first, so a task whose attempt was superseded by a retry
//! is dropped without running.

use std::time::Duration;

use crate::catalog::StepCatalog;
use crate::dispatch::{run_with_budget, SpoolDispatcher, SpooledTask};
use crate::error::{ProvflowError, Result};
use crate::handler::{HandlerRegistry, StepEvent, StepOutcome};
use crate::orchestrator::{CallbackOutcome, Orchestrator};
use crate::workflow::{StepStatus, WorkflowRecord};

/// What one pass over the spool did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WorkerReport {
    /// Tasks run and reported.
    pub executed: usize,
    /// Tasks left in the spool because their dispatch is not recorded yet.
    pub deferred: usize,
    /// Tasks discarded without running.
    pub dropped: usize,
}

impl WorkerReport {
    fn absorb(&mut self, other: WorkerReport) {
        self.executed += other.executed;
        self.deferred += other.deferred;
        self.dropped += other.dropped;
    }
}

enum Disposition {
    Execute,
    Defer,
    Drop(&'static str),
}

fn disposition(
    catalog: &StepCatalog,
    record: &WorkflowRecord,
    task: &SpooledTask,
) -> Disposition {
    let index = task.submission.args.step_index;
    let Some(step) = record.step(index) else {
        return Disposition::Drop("step index out of range");
    };
    if catalog.position(&task.submission.task_name) != Some(index) {
        return Disposition::Drop("task does not match the catalog step");
    }

    match (&step.correlation_id, step.status) {
        (Some(id), StepStatus::Running) if *id == task.correlation_id => Disposition::Execute,
        // Submitted but the running write has not landed yet.
        (None, StepStatus::Pending) if index == record.current_step => Disposition::Defer,
        _ => Disposition::Drop("attempt superseded"),
    }
}

/// Drains a spool directory through local step handlers.
pub struct SpoolWorker {
    spool: SpoolDispatcher,
    registry: HandlerRegistry,
    retry_backoff: Duration,
}

impl SpoolWorker {
    pub fn new(spool: SpoolDispatcher, registry: HandlerRegistry) -> Self {
        Self {
            spool,
            registry,
            retry_backoff: Duration::ZERO,
        }
    }

    /// Pause between attempts of a failing handler.
    pub fn with_retry_backoff(mut self, backoff: Duration) -> Self {
        self.retry_backoff = backoff;
        self
    }

    /// Process every task currently in the spool once.
    pub fn run_once(&self, orchestrator: &Orchestrator) -> Result<WorkerReport> {
        let mut report = WorkerReport::default();
        for task in self.spool.pending()? {
            let record = match orchestrator.get_status(&task.submission.args.workflow_id) {
                Ok(record) => record,
                Err(ProvflowError::NotFound { .. }) => {
                    self.drop_task(&task, "workflow not found")?;
                    report.dropped += 1;
                    continue;
                }
                Err(e) => return Err(e),
            };

            match disposition(orchestrator.catalog(), &record, &task) {
                Disposition::Execute => {
                    self.execute(orchestrator, &task)?;
                    report.executed += 1;
                }
                Disposition::Defer => report.deferred += 1,
                Disposition::Drop(reason) => {
                    self.drop_task(&task, reason)?;
                    report.dropped += 1;
                }
            }
        }
        Ok(report)
    }

    /// Keep passing over the spool until it is empty or a pass makes no
    /// progress (only deferred tasks remain).
    pub fn run_until_idle(&self, orchestrator: &Orchestrator) -> Result<WorkerReport> {
        let mut total = WorkerReport::default();
        loop {
            let pass = self.run_once(orchestrator)?;
            total.absorb(pass);
            if pass.executed == 0 && pass.dropped == 0 {
                total.deferred = pass.deferred;
                return Ok(total);
            }
        }
    }

    fn execute(&self, orchestrator: &Orchestrator, task: &SpooledTask) -> Result<()> {
        let submission = &task.submission;
        let outcome = match self.registry.get(&submission.task_name) {
            Some(handler) => run_with_budget(
                handler.as_ref(),
                &submission.args,
                submission.retry_budget,
                self.retry_backoff,
            ),
            None => StepOutcome::Failed {
                error: format!("no handler bound to task '{}'", submission.task_name),
            },
        };

        let event = StepEvent::new(&submission.args, task.correlation_id.clone(), outcome);
        // Ack first: applying a completion spools the next step, and a crash
        // after applying must not run this one again.
        self.spool.ack(task)?;
        match orchestrator.apply_event(event)? {
            CallbackOutcome::Applied => {}
            other => tracing::debug!(
                correlation_id = %task.correlation_id,
                "Spooled outcome was {}",
                other
            ),
        }
        Ok(())
    }

    fn drop_task(&self, task: &SpooledTask, reason: &str) -> Result<()> {
        tracing::info!(
            workflow_id = %task.submission.args.workflow_id,
            step = task.submission.args.step_index,
            correlation_id = %task.correlation_id,
            "Dropping spooled task: {}",
            reason
        );
        self.spool.ack(task)?;
        Ok(())
    }
}
