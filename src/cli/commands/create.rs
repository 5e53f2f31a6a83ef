//! Create command implementation.
//!
//! The `provflow create` command persists a pending workflow and, with
//! `--start`, dispatches its first step to the spool.

use crate::cli::args::CreateArgs;
use crate::error::Result;
use crate::ui::UserInterface;

use super::context::CommandContext;
use super::dispatcher::{Command, CommandResult};
use super::display;

/// The create command implementation.
pub struct CreateCommand {
    context: CommandContext,
    args: CreateArgs,
}

impl CreateCommand {
    pub fn new(context: CommandContext, args: CreateArgs) -> Self {
        Self { context, args }
    }
}

impl Command for CreateCommand {
    fn execute(&self, ui: &mut dyn UserInterface) -> Result<CommandResult> {
        let orchestrator = self.context.spool_orchestrator();
        let mut record = orchestrator.create_workflow(&self.args.target, &self.args.config)?;

        if self.args.start {
            record = orchestrator.start_workflow(&record.workflow_id)?;
        }

        if self.args.json {
            display::print_json(ui, &record)?;
        } else {
            ui.data(record.workflow_id.as_str());
            if self.args.start {
                ui.success(&format!(
                    "Created and started workflow for {}; run `provflow worker` to execute steps",
                    record.target_id
                ));
            } else {
                ui.success(&format!("Created workflow for {}", record.target_id));
            }
        }
        Ok(CommandResult::success())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ui::MockUI;
    use crate::workflow::{StepStatus, WorkflowId, WorkflowStatus};
    use tempfile::TempDir;

    fn args(start: bool) -> CreateArgs {
        CreateArgs {
            target: "srv-001".into(),
            config: "Ubuntu 20.04".into(),
            start,
            json: false,
        }
    }

    #[test]
    fn prints_id_of_pending_workflow() {
        let temp = TempDir::new().unwrap();
        let ctx = CommandContext::load(temp.path(), None, None).unwrap();
        let mut ui = MockUI::new();

        CreateCommand::new(ctx.clone(), args(false))
            .execute(&mut ui)
            .unwrap();

        let id = WorkflowId::from_string(ui.data_lines()[0].clone());
        let rec = ctx.store().get(&id).unwrap();
        assert_eq!(rec.status, WorkflowStatus::Pending);
        assert!(ctx.spool().pending().unwrap().is_empty());
    }

    #[test]
    fn start_flag_spools_first_step() {
        let temp = TempDir::new().unwrap();
        let ctx = CommandContext::load(temp.path(), None, None).unwrap();
        let mut ui = MockUI::new();

        CreateCommand::new(ctx.clone(), args(true))
            .execute(&mut ui)
            .unwrap();

        let id = WorkflowId::from_string(ui.data_lines()[0].clone());
        let rec = ctx.store().get(&id).unwrap();
        assert_eq!(rec.step(0).unwrap().status, StepStatus::Running);
        let pending = ctx.spool().pending().unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].submission.task_name, "reinstall_os");
    }
}
