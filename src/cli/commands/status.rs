//! Status command implementation.
//!
//! The `provflow status` command shows one workflow record.

use crate::cli::args::StatusArgs;
use crate::error::Result;
use crate::ui::UserInterface;
use crate::workflow::WorkflowId;

use super::context::CommandContext;
use super::dispatcher::{Command, CommandResult};
use super::display;

/// The status command implementation.
pub struct StatusCommand {
    context: CommandContext,
    args: StatusArgs,
}

impl StatusCommand {
    pub fn new(context: CommandContext, args: StatusArgs) -> Self {
        Self { context, args }
    }
}

impl Command for StatusCommand {
    fn execute(&self, ui: &mut dyn UserInterface) -> Result<CommandResult> {
        let record = self
            .context
            .store()
            .get(&WorkflowId::from_string(&self.args.id))?;

        if self.args.json {
            display::print_json(ui, &record)?;
        } else {
            display::show_record(ui, &record);
        }
        Ok(CommandResult::success())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ui::MockUI;
    use tempfile::TempDir;

    #[test]
    fn json_status_round_trips_record() {
        let temp = TempDir::new().unwrap();
        let ctx = CommandContext::load(temp.path(), None, None).unwrap();
        let rec = ctx.store().create("srv-001", "Ubuntu 20.04").unwrap();
        let mut ui = MockUI::new();

        StatusCommand::new(
            ctx,
            StatusArgs {
                id: rec.workflow_id.to_string(),
                json: true,
            },
        )
        .execute(&mut ui)
        .unwrap();

        let parsed: crate::workflow::WorkflowRecord =
            serde_json::from_str(&ui.data_text()).unwrap();
        assert_eq!(parsed, rec);
    }

    #[test]
    fn text_status_shows_target() {
        let temp = TempDir::new().unwrap();
        let ctx = CommandContext::load(temp.path(), None, None).unwrap();
        let rec = ctx.store().create("srv-042", "Rocky 9").unwrap();
        let mut ui = MockUI::new();

        StatusCommand::new(
            ctx,
            StatusArgs {
                id: rec.workflow_id.to_string(),
                json: false,
            },
        )
        .execute(&mut ui)
        .unwrap();

        assert!(ui.data_text().contains("srv-042"));
        assert!(ui.data_text().contains("○ pending"));
    }
}
