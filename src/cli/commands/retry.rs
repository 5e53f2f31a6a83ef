//! Retry command implementation.
//!
//! The `provflow retry` command resets a workflow from a step and dispatches
//! that step again.

use crate::cli::args::RetryArgs;
use crate::error::Result;
use crate::ui::UserInterface;
use crate::workflow::WorkflowId;

use super::context::CommandContext;
use super::dispatcher::{Command, CommandResult};

/// The retry command implementation.
pub struct RetryCommand {
    context: CommandContext,
    args: RetryArgs,
}

impl RetryCommand {
    pub fn new(context: CommandContext, args: RetryArgs) -> Self {
        Self { context, args }
    }
}

impl Command for RetryCommand {
    fn execute(&self, ui: &mut dyn UserInterface) -> Result<CommandResult> {
        let index = self.context.step_index(self.args.step)?;
        let orchestrator = self.context.spool_orchestrator();

        let record = orchestrator.retry_from_step(&WorkflowId::from_string(&self.args.id), index)?;

        let step = record.current().map(|s| s.step_name.as_str()).unwrap_or("-");
        ui.success(&format!(
            "Retrying {} from step {} ('{}')",
            record.workflow_id, index, step
        ));
        Ok(CommandResult::success())
    }
}
