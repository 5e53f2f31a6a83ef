//! Step definition type.

use serde::{Deserialize, Serialize};

/// One entry of the step catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepDefinition {
    /// Human-readable step name.
    pub name: String,
    /// Name of the task the dispatcher runs for this step.
    pub task_name: String,
    /// Delivery retries granted to the dispatcher (not used by the orchestrator).
    pub retry_budget: u32,
    /// What the step does.
    pub description: String,
}

impl StepDefinition {
    /// Create a new step definition.
    pub fn new(
        name: impl Into<String>,
        task_name: impl Into<String>,
        retry_budget: u32,
        description: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            task_name: task_name.into(),
            retry_budget,
            description: description.into(),
        }
    }
}
