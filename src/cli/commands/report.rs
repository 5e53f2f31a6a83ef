//! Complete and fail command implementations.
//!
//! These commands deliver step outcomes from outside the process, the way an
//! external task runner would report back.

use crate::cli::args::ReportArgs;
use crate::error::Result;
use crate::handler::StepOutcome;
use crate::orchestrator::CallbackOutcome;
use crate::ui::UserInterface;
use crate::workflow::{CorrelationId, WorkflowId};

use super::context::CommandContext;
use super::dispatcher::{Command, CommandResult};

/// Which outcome a report command delivers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportKind {
    Completed,
    Failed,
}

/// The complete/fail command implementation.
pub struct ReportCommand {
    context: CommandContext,
    kind: ReportKind,
    args: ReportArgs,
}

impl ReportCommand {
    pub fn new(context: CommandContext, kind: ReportKind, args: ReportArgs) -> Self {
        Self {
            context,
            kind,
            args,
        }
    }

    fn outcome(&self) -> StepOutcome {
        match self.kind {
            ReportKind::Completed => StepOutcome::Completed {
                result: self.args.message.clone(),
            },
            ReportKind::Failed => StepOutcome::Failed {
                error: self.args.message.clone(),
            },
        }
    }
}

impl Command for ReportCommand {
    fn execute(&self, ui: &mut dyn UserInterface) -> Result<CommandResult> {
        let index = self.context.step_index(self.args.step)?;
        let id = WorkflowId::from_string(&self.args.id);
        let correlation = self.args.correlation.as_deref().map(CorrelationId::from);
        let orchestrator = self.context.spool_orchestrator();

        let verdict = orchestrator.report(&id, index, correlation.as_ref(), self.outcome())?;

        match verdict {
            CallbackOutcome::Applied => {
                let record = orchestrator.get_status(&id)?;
                ui.success(&format!(
                    "Recorded step {} as {}; workflow is {}",
                    index,
                    match self.kind {
                        ReportKind::Completed => "completed",
                        ReportKind::Failed => "failed",
                    },
                    record.status
                ));
                Ok(CommandResult::success())
            }
            CallbackOutcome::Duplicate => {
                ui.warning(&format!("Step {} already reported; nothing changed", index));
                Ok(CommandResult::success())
            }
            CallbackOutcome::Stale => {
                ui.warning(&format!(
                    "Step {} is not awaiting this outcome; report ignored",
                    index
                ));
                Ok(CommandResult::failure(1))
            }
        }
    }
}
