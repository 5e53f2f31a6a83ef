//! Start command implementation.

use crate::cli::args::StartArgs;
use crate::error::Result;
use crate::ui::UserInterface;
use crate::workflow::WorkflowId;

use super::context::CommandContext;
use super::dispatcher::{Command, CommandResult};

/// The start command implementation.
pub struct StartCommand {
    context: CommandContext,
    args: StartArgs,
}

impl StartCommand {
    pub fn new(context: CommandContext, args: StartArgs) -> Self {
        Self { context, args }
    }
}

impl Command for StartCommand {
    fn execute(&self, ui: &mut dyn UserInterface) -> Result<CommandResult> {
        let orchestrator = self.context.spool_orchestrator();
        let record = orchestrator.start_workflow(&WorkflowId::from_string(&self.args.id))?;

        let step = record.current().map(|s| s.step_name.as_str()).unwrap_or("-");
        ui.success(&format!("Started {} at step '{}'", record.workflow_id, step));
        Ok(CommandResult::success())
    }
}
