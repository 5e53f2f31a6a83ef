//! Task dispatch.
//!
//! The orchestrator hands each step to a [`TaskDispatcher`] and gets back a
//! [`CorrelationId`]; execution happens elsewhere. This module provides:
//! - [`LocalDispatcher`] - in-process worker threads publishing [`StepEvent`]s
//! - [`SpoolDispatcher`] - a directory of queued tasks drained by a worker
//! - [`MockDispatcher`] - records submissions for tests
//!
//! A step's retry budget is spent here, in [`run_with_budget`]; the
//! orchestrator only ever sees one terminal outcome per dispatch.
//!
//! [`StepEvent`]: crate::handler::StepEvent

mod local;
mod mock;
mod spool;

pub use local::LocalDispatcher;
pub use mock::MockDispatcher;
pub use spool::{SpoolDispatcher, SpooledTask};

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::Result;
use crate::handler::{StepHandler, StepOutcome};
use crate::workflow::{CorrelationId, WorkflowId};

/// Arguments every step task receives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskArgs {
    pub workflow_id: WorkflowId,
    pub target_id: String,
    pub config: String,
    pub step_index: usize,
}

/// A unit of work handed to a dispatcher.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskSubmission {
    /// Task to run, from the step catalog.
    pub task_name: String,
    pub args: TaskArgs,
    /// Extra delivery attempts the dispatcher may spend on failures.
    pub retry_budget: u32,
}

/// Accepts step tasks for out-of-band execution.
pub trait TaskDispatcher: Send + Sync {
    /// Queue a task, returning the id that its outcome will carry.
    ///
    /// Fails with `ProvflowError::Dispatch` when the task was not accepted.
    fn submit(&self, task: &TaskSubmission) -> Result<CorrelationId>;
}

/// Run a handler until it succeeds or the retry budget is spent.
///
/// Makes at most `retry_budget + 1` attempts and returns the single terminal
/// outcome.
pub fn run_with_budget(
    handler: &dyn StepHandler,
    args: &TaskArgs,
    retry_budget: u32,
    backoff: Duration,
) -> StepOutcome {
    let mut attempt = 0;
    loop {
        attempt += 1;
        match handler.execute(args) {
            Ok(result) => return StepOutcome::Completed { result },
            Err(e) if attempt <= retry_budget => {
                tracing::warn!(
                    workflow_id = %args.workflow_id,
                    step = args.step_index,
                    attempt,
                    "Step attempt failed, retrying: {:#}",
                    e
                );
                if !backoff.is_zero() {
                    std::thread::sleep(backoff);
                }
            }
            Err(e) => {
                return StepOutcome::Failed {
                    error: format!("{:#}", e),
                }
            }
        }
    }
}
