//! Step handlers and the events they produce.
//!
//! A [`StepHandler`] performs one step's work inside a worker. Its outcome
//! never reaches the orchestrator through shared global state: the worker
//! wraps it in a [`StepEvent`] (tagged with the dispatch correlation id) and
//! hands it to whoever consumes events, usually
//! [`Orchestrator::apply_event`](crate::orchestrator::Orchestrator::apply_event).

mod simulated;

pub use simulated::SimulatedHandler;

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use crate::catalog::StepCatalog;
use crate::dispatch::TaskArgs;
use crate::workflow::{CorrelationId, WorkflowId};

/// Code that performs one step of the pipeline.
pub trait StepHandler: Send + Sync {
    /// Run the step. The returned string becomes the step's result payload;
    /// an error's message becomes the step's error.
    fn execute(&self, args: &TaskArgs) -> anyhow::Result<String>;
}

impl<F> StepHandler for F
where
    F: Fn(&TaskArgs) -> anyhow::Result<String> + Send + Sync,
{
    fn execute(&self, args: &TaskArgs) -> anyhow::Result<String> {
        self(args)
    }
}

/// Terminal outcome of one dispatch attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "lowercase")]
pub enum StepOutcome {
    Completed { result: String },
    Failed { error: String },
}

/// Outcome report published by a worker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepEvent {
    pub workflow_id: WorkflowId,
    pub step_index: usize,
    pub correlation_id: CorrelationId,
    #[serde(flatten)]
    pub outcome: StepOutcome,
}

impl StepEvent {
    /// Build an event for the task a worker just ran.
    pub fn new(args: &TaskArgs, correlation_id: CorrelationId, outcome: StepOutcome) -> Self {
        Self {
            workflow_id: args.workflow_id.clone(),
            step_index: args.step_index,
            correlation_id,
            outcome,
        }
    }
}

/// Task name to handler bindings.
#[derive(Clone, Default)]
pub struct HandlerRegistry {
    handlers: HashMap<String, Arc<dyn StepHandler>>,
}

impl HandlerRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind every catalog task to a simulated handler.
    ///
    /// Tasks named in `failures` fail with the given message.
    pub fn simulated(
        catalog: &StepCatalog,
        failures: &HashMap<String, String>,
        delay: Duration,
    ) -> Self {
        let mut registry = Self::new();
        for def in catalog.iter() {
            let mut handler = SimulatedHandler::new(&def.name).with_delay(delay);
            if let Some(message) = failures.get(&def.task_name) {
                handler = handler.failing_with(message);
            }
            registry.register(&def.task_name, handler);
        }
        registry
    }

    /// Bind a handler to a task name, replacing any previous binding.
    pub fn register(&mut self, task_name: &str, handler: impl StepHandler + 'static) {
        self.handlers
            .insert(task_name.to_string(), Arc::new(handler));
    }

    /// Handler bound to a task name.
    pub fn get(&self, task_name: &str) -> Option<Arc<dyn StepHandler>> {
        self.handlers.get(task_name).cloned()
    }

    pub fn contains(&self, task_name: &str) -> bool {
        self.handlers.contains_key(task_name)
    }

    /// Bound task names, sorted.
    pub fn task_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.handlers.keys().map(String::as_str).collect();
        names.sort();
        names
    }
}

impl std::fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerRegistry")
            .field("tasks", &self.task_names())
            .finish()
    }
}
