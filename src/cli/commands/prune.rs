//! Prune command implementation.

use crate::error::Result;
use crate::ui::UserInterface;

use super::context::CommandContext;
use super::dispatcher::{Command, CommandResult};

/// The prune command implementation.
pub struct PruneCommand {
    context: CommandContext,
}

impl PruneCommand {
    pub fn new(context: CommandContext) -> Self {
        Self { context }
    }
}

impl Command for PruneCommand {
    fn execute(&self, ui: &mut dyn UserInterface) -> Result<CommandResult> {
        let removed = self.context.store().purge_expired()?;
        let noun = if removed == 1 { "workflow" } else { "workflows" };
        ui.success(&format!("Removed {} expired {}", removed, noun));
        Ok(CommandResult::success())
    }
}
