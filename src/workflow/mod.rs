//! Workflow run data model.
//!
//! A [`WorkflowRecord`] is the persisted state of one pipeline run: header
//! fields plus one [`StepResult`] per catalog entry. All state transitions
//! are methods on the record so the store and the orchestrator apply the
//! exact same rules.

mod id;
mod record;
mod status;

pub use id::{CorrelationId, WorkflowId};
pub use record::{StepResult, WorkflowRecord};
pub use status::{StepStatus, WorkflowStatus};
