//! Recording dispatcher for tests.
//!
//! # Example
//!
//! ```
//! use provflow::dispatch::{MockDispatcher, TaskArgs, TaskDispatcher, TaskSubmission};
//! use provflow::workflow::WorkflowId;
//!
//! let dispatcher = MockDispatcher::new();
//! let task = TaskSubmission {
//!     task_name: "reinstall_os".into(),
//!     args: TaskArgs {
//!         workflow_id: WorkflowId::from_string("wf_1"),
//!         target_id: "srv-001".into(),
//!         config: "Ubuntu 20.04".into(),
//!         step_index: 0,
//!     },
//!     retry_budget: 3,
//! };
//!
//! let corr = dispatcher.submit(&task).unwrap();
//! assert_eq!(dispatcher.submissions()[0].0, corr);
//!
//! dispatcher.fail_with("broker unavailable");
//! assert!(dispatcher.submit(&task).is_err());
//! ```

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use crate::error::{ProvflowError, Result};
use crate::workflow::CorrelationId;

use super::{TaskDispatcher, TaskSubmission};

/// Dispatcher that records submissions instead of running them.
#[derive(Debug, Default)]
pub struct MockDispatcher {
    submissions: Mutex<Vec<(CorrelationId, TaskSubmission)>>,
    failure: Mutex<Option<String>>,
    counter: AtomicU64,
}

impl MockDispatcher {
    /// Create a dispatcher that accepts everything.
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject every following submission with `message`.
    pub fn fail_with(&self, message: &str) {
        if let Ok(mut failure) = self.failure.lock() {
            *failure = Some(message.to_string());
        }
    }

    /// Accept submissions again.
    pub fn succeed(&self) {
        if let Ok(mut failure) = self.failure.lock() {
            *failure = None;
        }
    }

    /// Accepted submissions in order.
    pub fn submissions(&self) -> Vec<(CorrelationId, TaskSubmission)> {
        self.submissions
            .lock()
            .map(|s| s.clone())
            .unwrap_or_default()
    }

    /// Most recent accepted submission.
    pub fn last(&self) -> Option<(CorrelationId, TaskSubmission)> {
        self.submissions().pop()
    }

    /// Number of accepted submissions.
    pub fn count(&self) -> usize {
        self.submissions.lock().map(|s| s.len()).unwrap_or(0)
    }
}

impl TaskDispatcher for MockDispatcher {
    fn submit(&self, task: &TaskSubmission) -> Result<CorrelationId> {
        let failure = self.failure.lock().ok().and_then(|f| f.clone());
        if let Some(message) = failure {
            return Err(ProvflowError::Dispatch {
                task: task.task_name.clone(),
                message,
            });
        }

        let n = self.counter.fetch_add(1, Ordering::SeqCst) + 1;
        let correlation_id = CorrelationId::new(format!("mock-{}", n));
        if let Ok(mut submissions) = self.submissions.lock() {
            submissions.push((correlation_id.clone(), task.clone()));
        }
        Ok(correlation_id)
    }
}
