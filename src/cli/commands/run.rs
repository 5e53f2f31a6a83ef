//! Run command implementation.
//!
//! The `provflow run` command drives one workflow from creation to rest in
//! this process: steps execute on a local worker pool and their events are
//! applied as they arrive.

use std::sync::Arc;
use std::time::Duration;

use crate::cli::args::RunArgs;
use crate::dispatch::LocalDispatcher;
use crate::error::Result;
use crate::ui::UserInterface;
use crate::workflow::WorkflowStatus;

use super::context::CommandContext;
use super::dispatcher::{Command, CommandResult};
use super::display;

/// The run command implementation.
pub struct RunCommand {
    context: CommandContext,
    args: RunArgs,
}

impl RunCommand {
    pub fn new(context: CommandContext, args: RunArgs) -> Self {
        Self { context, args }
    }
}

impl Command for RunCommand {
    fn execute(&self, ui: &mut dyn UserInterface) -> Result<CommandResult> {
        let worker = &self.context.settings().worker;
        let (dispatcher, events) =
            LocalDispatcher::new(self.context.registry(), worker.threads, worker.retry_backoff());
        let dispatcher = Arc::new(dispatcher);
        let orchestrator = self.context.orchestrator(dispatcher.clone());

        let record = orchestrator.create_workflow(&self.args.target, &self.args.config)?;
        let id = record.workflow_id;
        ui.show_header(&format!("Provisioning {} ({})", self.args.target, self.args.config));

        orchestrator.start_workflow(&id)?;
        let record =
            orchestrator.run_until_rest(&id, &events, Duration::from_secs(self.args.timeout))?;
        dispatcher.shutdown();

        if self.args.json {
            display::print_json(ui, &record)?;
        } else {
            display::show_record(ui, &record);
        }

        if record.status == WorkflowStatus::Completed {
            ui.success(&format!("Workflow {} completed", id));
            Ok(CommandResult::success())
        } else {
            ui.error(&format!(
                "Workflow {} failed at step {}: {}",
                id,
                record.current_step,
                record.last_error.as_deref().unwrap_or("unknown error")
            ));
            ui.message(&format!(
                "Retry with: provflow retry {} {}",
                id, record.current_step
            ));
            Ok(CommandResult::failure(1))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Settings, StoreBackendKind};
    use crate::ui::MockUI;

    fn settings() -> Settings {
        let mut settings = Settings::default();
        settings.store.backend = StoreBackendKind::Memory;
        settings
    }

    fn args() -> RunArgs {
        RunArgs {
            target: "srv-001".into(),
            config: "Ubuntu 20.04".into(),
            timeout: 30,
            json: false,
        }
    }

    #[test]
    fn runs_every_step_to_completion() {
        let mut ui = MockUI::new();

        let result = RunCommand::new(CommandContext::new(settings()), args())
            .execute(&mut ui)
            .unwrap();

        assert!(result.success);
        assert!(ui.has_success("completed"));
        assert_eq!(ui.data_text().matches("✓ completed").count(), 5);
    }

    #[test]
    fn configured_failure_stops_the_run() {
        let mut settings = settings();
        settings
            .worker
            .failures
            .insert("install_docker_env".into(), "registry unreachable".into());
        let mut ui = MockUI::new();

        let result = RunCommand::new(CommandContext::new(settings), args())
            .execute(&mut ui)
            .unwrap();

        assert_eq!(result.exit_code, 1);
        assert!(ui.has_error("registry unreachable"));
        assert!(ui.has_message("provflow retry"));
        assert!(ui.data_text().contains("○ pending"));
    }
}
