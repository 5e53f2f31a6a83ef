//! CLI command implementations.
//!
//! Each command implements the [`Command`] trait, which provides a uniform
//! interface for executing commands and reporting results.
//!
//! # Architecture
//!
//! Commands are dispatched via [`CommandDispatcher`], which loads settings
//! once into a [`CommandContext`] and routes CLI subcommands to their
//! implementations. Commands that dispatch steps queue them in the spool;
//! `worker` executes them and `run` does everything in one process.

pub mod completions;
pub mod context;
pub mod create;
pub mod dispatcher;
pub mod display;
pub mod list;
pub mod prune;
pub mod report;
pub mod retry;
pub mod run;
pub mod start;
pub mod status;
pub mod steps;
pub mod worker;

pub use context::CommandContext;
pub use dispatcher::{Command, CommandDispatcher, CommandResult};
