//! CLI argument definitions.
//!
//! This module defines all CLI arguments using clap's derive macros.
//! The main entry point is the [`Cli`] struct.

use clap::{Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

/// Provflow - multi-step provisioning workflows.
#[derive(Debug, Parser)]
#[command(name = "provflow")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to config file (overrides ./provflow.yml)
    #[arg(id = "config_file", short, long = "config", value_name = "CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Directory for workflow records and the task spool
    #[arg(long, global = true, env = "PROVFLOW_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Print command output and errors only
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// List the step catalog
    Steps(StepsArgs),

    /// Create a workflow for a target
    Create(CreateArgs),

    /// Dispatch the first step of a pending workflow
    Start(StartArgs),

    /// Show one workflow
    Status(StatusArgs),

    /// List live workflows
    List(ListArgs),

    /// Reset a workflow from a step and dispatch it again
    Retry(RetryArgs),

    /// Report that a step completed
    Complete(ReportArgs),

    /// Report that a step failed
    Fail(ReportArgs),

    /// Execute spooled step tasks
    Worker(WorkerArgs),

    /// Create, start, and run a workflow to the end in this process
    Run(RunArgs),

    /// Remove workflows past their retention window
    Prune,

    /// Generate shell completions
    Completions(CompletionsArgs),
}

/// Arguments for the `steps` command.
#[derive(Debug, Clone, Default, clap::Args)]
pub struct StepsArgs {
    /// Print the catalog as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `create` command.
#[derive(Debug, Clone, Default, clap::Args)]
pub struct CreateArgs {
    /// Resource to provision (e.g. a server id)
    pub target: String,

    /// Run configuration (e.g. the OS to install)
    pub config: String,

    /// Dispatch the first step right away
    #[arg(long)]
    pub start: bool,

    /// Print the record as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `start` command.
#[derive(Debug, Clone, Default, clap::Args)]
pub struct StartArgs {
    /// Workflow id
    pub id: String,
}

/// Arguments for the `status` command.
#[derive(Debug, Clone, Default, clap::Args)]
pub struct StatusArgs {
    /// Workflow id
    pub id: String,

    /// Print the record as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `list` command.
#[derive(Debug, Clone, Default, clap::Args)]
pub struct ListArgs {
    /// Print the records as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `retry` command.
#[derive(Debug, Clone, Default, clap::Args)]
pub struct RetryArgs {
    /// Workflow id
    pub id: String,

    /// Step index to resume from (0-based)
    #[arg(allow_negative_numbers = true)]
    pub step: i64,
}

/// Arguments for the `complete` and `fail` commands.
#[derive(Debug, Clone, Default, clap::Args)]
pub struct ReportArgs {
    /// Workflow id
    pub id: String,

    /// Step index (0-based)
    #[arg(allow_negative_numbers = true)]
    pub step: i64,

    /// Result payload or error message
    pub message: String,

    /// Correlation id of the dispatch attempt being reported
    #[arg(long)]
    pub correlation: Option<String>,
}

/// Arguments for the `worker` command.
#[derive(Debug, Clone, Default, clap::Args)]
pub struct WorkerArgs {
    /// Make a single pass over the spool
    #[arg(long)]
    pub once: bool,
}

/// Arguments for the `run` command.
#[derive(Debug, Clone, clap::Args)]
pub struct RunArgs {
    /// Resource to provision (e.g. a server id)
    pub target: String,

    /// Run configuration (e.g. the OS to install)
    pub config: String,

    /// Give up waiting after this many seconds
    #[arg(long, default_value_t = 300)]
    pub timeout: u64,

    /// Print the final record as JSON
    #[arg(long)]
    pub json: bool,
}

impl Default for RunArgs {
    fn default() -> Self {
        Self {
            target: String::new(),
            config: String::new(),
            timeout: 300,
            json: false,
        }
    }
}

/// Arguments for the `completions` command.
#[derive(Debug, Clone, clap::Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: Shell,
}
