//! Command dispatching.
//!
//! This module provides the core command infrastructure:
//! - [`Command`] trait for implementing commands
//! - [`CommandResult`] for uniform result reporting
//! - [`CommandDispatcher`] for routing CLI subcommands

use std::path::{Path, PathBuf};

use crate::cli::args::{Cli, Commands};
use crate::error::Result;
use crate::ui::UserInterface;

use super::context::CommandContext;
use super::report::ReportKind;

/// Trait for command implementations.
///
/// Each CLI subcommand implements this trait to provide its execution logic.
pub trait Command {
    /// Execute the command.
    ///
    /// # Arguments
    ///
    /// * `ui` - User interface for displaying output
    ///
    /// # Returns
    ///
    /// A [`CommandResult`] indicating success/failure and exit code.
    fn execute(&self, ui: &mut dyn UserInterface) -> Result<CommandResult>;
}

/// Result of command execution.
#[derive(Debug)]
pub struct CommandResult {
    /// Whether the command succeeded.
    pub success: bool,

    /// Exit code to use (0 for success, non-zero for failure).
    pub exit_code: i32,
}

impl CommandResult {
    /// Create a successful result.
    pub fn success() -> Self {
        Self {
            success: true,
            exit_code: 0,
        }
    }

    /// Create a failure result.
    pub fn failure(exit_code: i32) -> Self {
        Self {
            success: false,
            exit_code,
        }
    }
}

/// Dispatches CLI commands to their implementations.
pub struct CommandDispatcher {
    work_dir: PathBuf,
}

impl CommandDispatcher {
    /// Create a new dispatcher resolving relative paths against `work_dir`.
    pub fn new(work_dir: PathBuf) -> Self {
        Self { work_dir }
    }

    /// Get the working directory.
    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    fn context(&self, cli: &Cli) -> Result<CommandContext> {
        CommandContext::load(
            &self.work_dir,
            cli.config.as_deref(),
            cli.data_dir.as_deref(),
        )
    }

    /// Dispatch and execute a command.
    ///
    /// Routes the CLI subcommand to the appropriate command implementation
    /// and executes it.
    pub fn dispatch(&self, cli: &Cli, ui: &mut dyn UserInterface) -> Result<CommandResult> {
        if let Commands::Completions(args) = &cli.command {
            return super::completions::CompletionsCommand::new(args.clone()).execute(ui);
        }

        let ctx = self.context(cli)?;
        match &cli.command {
            Commands::Steps(args) => super::steps::StepsCommand::new(ctx, args.clone()).execute(ui),
            Commands::Create(args) => {
                super::create::CreateCommand::new(ctx, args.clone()).execute(ui)
            }
            Commands::Start(args) => super::start::StartCommand::new(ctx, args.clone()).execute(ui),
            Commands::Status(args) => {
                super::status::StatusCommand::new(ctx, args.clone()).execute(ui)
            }
            Commands::List(args) => super::list::ListCommand::new(ctx, args.clone()).execute(ui),
            Commands::Retry(args) => super::retry::RetryCommand::new(ctx, args.clone()).execute(ui),
            Commands::Complete(args) => {
                super::report::ReportCommand::new(ctx, ReportKind::Completed, args.clone())
                    .execute(ui)
            }
            Commands::Fail(args) => {
                super::report::ReportCommand::new(ctx, ReportKind::Failed, args.clone())
                    .execute(ui)
            }
            Commands::Worker(args) => {
                super::worker::WorkerCommand::new(ctx, args.clone()).execute(ui)
            }
            Commands::Run(args) => super::run::RunCommand::new(ctx, args.clone()).execute(ui),
            Commands::Prune => super::prune::PruneCommand::new(ctx).execute(ui),
            Commands::Completions(args) => {
                super::completions::CompletionsCommand::new(args.clone()).execute(ui)
            }
        }
    }
}
