//! Simulated provisioning handler.

use std::time::Duration;

use crate::dispatch::TaskArgs;

use super::StepHandler;

/// Stand-in for a real provisioning step: logs, optionally sleeps, and
/// either succeeds or fails with a fixed message.
#[derive(Debug, Clone)]
pub struct SimulatedHandler {
    step_name: String,
    delay: Duration,
    failure: Option<String>,
}

impl SimulatedHandler {
    /// A handler that always succeeds.
    pub fn new(step_name: impl Into<String>) -> Self {
        Self {
            step_name: step_name.into(),
            delay: Duration::ZERO,
            failure: None,
        }
    }

    /// Pretend the work takes this long.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Always fail with `message`.
    pub fn failing_with(mut self, message: impl Into<String>) -> Self {
        self.failure = Some(message.into());
        self
    }
}

impl StepHandler for SimulatedHandler {
    fn execute(&self, args: &TaskArgs) -> anyhow::Result<String> {
        tracing::info!(
            workflow_id = %args.workflow_id,
            step = args.step_index,
            target = %args.target_id,
            "Running {}",
            self.step_name
        );

        if !self.delay.is_zero() {
            std::thread::sleep(self.delay);
        }

        if let Some(message) = &self.failure {
            anyhow::bail!("{}", message);
        }

        Ok(format!(
            "{} finished on {} ({})",
            self.step_name, args.target_id, args.config
        ))
    }
}
