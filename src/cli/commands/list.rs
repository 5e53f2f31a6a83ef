//! List command implementation.

use crate::cli::args::ListArgs;
use crate::error::Result;
use crate::ui::UserInterface;

use super::context::CommandContext;
use super::dispatcher::{Command, CommandResult};
use super::display;

/// The list command implementation.
pub struct ListCommand {
    context: CommandContext,
    args: ListArgs,
}

impl ListCommand {
    pub fn new(context: CommandContext, args: ListArgs) -> Self {
        Self { context, args }
    }
}

impl Command for ListCommand {
    fn execute(&self, ui: &mut dyn UserInterface) -> Result<CommandResult> {
        let records = self.context.store().list()?;

        if self.args.json {
            display::print_json(ui, &records)?;
            return Ok(CommandResult::success());
        }

        if records.is_empty() {
            ui.message("No workflows.");
        } else {
            let table = display::workflow_table(&*ui, &records);
            ui.data(&table.render());
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
    fn empty_store_says_so() {
        let temp = TempDir::new().unwrap();
        let ctx = CommandContext::load(temp.path(), None, None).unwrap();
        let mut ui = MockUI::new();

        ListCommand::new(ctx, ListArgs::default())
            .execute(&mut ui)
            .unwrap();

        assert!(ui.has_message("No workflows"));
        assert!(ui.data_lines().is_empty());
    }

    #[test]
    fn lists_each_workflow() {
        let temp = TempDir::new().unwrap();
        let ctx = CommandContext::load(temp.path(), None, None).unwrap();
        ctx.store().create("srv-a", "Ubuntu").unwrap();
        ctx.store().create("srv-b", "Debian").unwrap();
        let mut ui = MockUI::new();

        ListCommand::new(ctx, ListArgs { json: true })
            .execute(&mut ui)
            .unwrap();

        let value: serde_json::Value = serde_json::from_str(&ui.data_text()).unwrap();
        assert_eq!(value.as_array().unwrap().len(), 2);
    }
}
