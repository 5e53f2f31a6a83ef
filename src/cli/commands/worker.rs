//! Worker command implementation.
//!
//! The `provflow worker` command executes tasks spooled by `create --start`,
//! `start`, `retry` and by completions that dispatch the next step.

use crate::cli::args::WorkerArgs;
use crate::error::Result;
use crate::ui::UserInterface;
use crate::worker::SpoolWorker;

use super::context::CommandContext;
use super::dispatcher::{Command, CommandResult};

/// The worker command implementation.
pub struct WorkerCommand {
    context: CommandContext,
    args: WorkerArgs,
}

impl WorkerCommand {
    pub fn new(context: CommandContext, args: WorkerArgs) -> Self {
        Self { context, args }
    }
}

impl Command for WorkerCommand {
    fn execute(&self, ui: &mut dyn UserInterface) -> Result<CommandResult> {
        let orchestrator = self.context.spool_orchestrator();
        let worker = SpoolWorker::new(self.context.spool(), self.context.registry())
            .with_retry_backoff(self.context.settings().worker.retry_backoff());

        let report = if self.args.once {
            worker.run_once(&orchestrator)?
        } else {
            worker.run_until_idle(&orchestrator)?
        };

        ui.success(&format!(
            "Executed {} task(s), dropped {} superseded",
            report.executed, report.dropped
        ));
        if report.deferred > 0 {
            ui.warning(&format!(
                "{} task(s) left in the spool waiting for their dispatch to be recorded",
                report.deferred
            ));
        }
        Ok(CommandResult::success())
    }
}
