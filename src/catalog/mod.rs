//! Step catalog.
//!
//! The catalog is the ordered, immutable list of steps every workflow run
//! walks through. It is built once at startup and shared by reference; its
//! length is the `total_steps` of every run.

mod definition;

pub use definition::StepDefinition;

use serde::Serialize;

/// Ordered list of step definitions shared by all workflow runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct StepCatalog {
    steps: Vec<StepDefinition>,
}

impl StepCatalog {
    /// Build a catalog from an ordered list of definitions.
    pub fn new(steps: Vec<StepDefinition>) -> Self {
        Self { steps }
    }

    /// The standard server provisioning pipeline.
    pub fn standard() -> Self {
        Self::new(vec![
            StepDefinition::new(
                "Reinstall OS",
                "reinstall_os",
                3,
                "Wipe the target and install the requested operating system",
            ),
            StepDefinition::new(
                "Install base environment",
                "install_base_env",
                3,
                "Install base packages, users and system tooling",
            ),
            StepDefinition::new(
                "Install Docker environment",
                "install_docker_env",
                3,
                "Install and configure the container runtime",
            ),
            StepDefinition::new(
                "Configure network",
                "configure_network",
                2,
                "Apply network interfaces, routes and DNS settings",
            ),
            StepDefinition::new(
                "Register to inventory",
                "register_to_inventory",
                5,
                "Record the provisioned server in the asset inventory",
            ),
        ])
    }

    /// Number of steps (`total_steps` for every run).
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Whether the catalog has no steps.
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Index of the final step, if any.
    pub fn last_index(&self) -> Option<usize> {
        self.steps.len().checked_sub(1)
    }

    /// Get the definition at a position.
    pub fn get(&self, index: usize) -> Option<&StepDefinition> {
        self.steps.get(index)
    }

    /// All definitions in pipeline order.
    pub fn steps(&self) -> &[StepDefinition] {
        &self.steps
    }

    /// Iterate definitions in pipeline order.
    pub fn iter(&self) -> impl Iterator<Item = &StepDefinition> {
        self.steps.iter()
    }

    /// Position of the step bound to a task name.
    pub fn position(&self, task_name: &str) -> Option<usize> {
        self.steps.iter().position(|s| s.task_name == task_name)
    }
}

impl Default for StepCatalog {
    fn default() -> Self {
        Self::standard()
    }
}
