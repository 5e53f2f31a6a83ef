//! Matching step outcomes against the attempt they belong to.

use serde::Serialize;
use std::fmt;

use crate::workflow::{CorrelationId, StepStatus, WorkflowRecord};

/// What happened to a reported step outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CallbackOutcome {
    /// The outcome was recorded and the pipeline moved on.
    Applied,
    /// The same attempt already reported; nothing changed.
    Duplicate,
    /// The outcome belongs to a superseded attempt; nothing changed.
    Stale,
}

impl CallbackOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, Self::Applied)
    }
}

impl fmt::Display for CallbackOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Applied => "applied",
            Self::Duplicate => "duplicate",
            Self::Stale => "stale",
        })
    }
}

/// Decide whether an outcome for `index` may be applied to `record`.
///
/// With a correlation id the outcome must come from the attempt recorded at
/// dispatch. Without one, only the running current step accepts it.
pub(crate) fn classify(
    record: &WorkflowRecord,
    index: usize,
    correlation_id: Option<&CorrelationId>,
) -> CallbackOutcome {
    let Some(step) = record.step(index) else {
        return CallbackOutcome::Stale;
    };

    let same_attempt = match correlation_id {
        Some(id) => step.correlation_id.as_ref() == Some(id),
        None => true,
    };
    if !same_attempt {
        return CallbackOutcome::Stale;
    }

    match step.status {
        StepStatus::Running if index == record.current_step => CallbackOutcome::Applied,
        StepStatus::Completed | StepStatus::Failed => CallbackOutcome::Duplicate,
        _ => CallbackOutcome::Stale,
    }
}
