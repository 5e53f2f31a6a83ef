//! Steps command implementation.
//!
//! The `provflow steps` command lists the step catalog.

use crate::cli::args::StepsArgs;
use crate::error::Result;
use crate::ui::UserInterface;

use super::context::CommandContext;
use super::dispatcher::{Command, CommandResult};
use super::display;

/// The steps command implementation.
pub struct StepsCommand {
    context: CommandContext,
    args: StepsArgs,
}

impl StepsCommand {
    pub fn new(context: CommandContext, args: StepsArgs) -> Self {
        Self { context, args }
    }
}

impl Command for StepsCommand {
    fn execute(&self, ui: &mut dyn UserInterface) -> Result<CommandResult> {
        let catalog = self.context.catalog();

        if self.args.json {
            display::print_json(ui, catalog.steps())?;
        } else {
            ui.show_header("Step catalog");
            ui.data(&display::catalog_table(catalog.steps()).render());
        }
        Ok(CommandResult::success())
    }
}
