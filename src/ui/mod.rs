//! Terminal output.
//!
//! This module provides:
//! - [`UserInterface`] trait for UI abstraction
//! - [`TerminalUI`] writing styled output to stdout
//! - [`MockUI`] capturing output for tests
//! - [`Table`] for column-aligned listings
//!
//! # Example
//!
//! ```
//! use provflow::ui::{MockUI, UserInterface};
//!
//! let mut ui = MockUI::new();
//! ui.success("Workflow completed");
//! assert!(ui.has_success("completed"));
//! ```

pub mod mock;
pub mod output;
pub mod table;
pub mod terminal;
pub mod theme;

pub use mock::MockUI;
pub use output::OutputMode;
pub use table::Table;
pub use terminal::TerminalUI;
pub use theme::{should_use_colors, ProvflowTheme};

/// Trait for user interface interactions.
///
/// This trait allows mocking the UI in tests.
pub trait UserInterface {
    /// Get the current output mode.
    fn output_mode(&self) -> OutputMode;

    /// Display a message to the user.
    fn message(&mut self, msg: &str);

    /// Display a success message.
    fn success(&mut self, msg: &str);

    /// Display a warning message.
    fn warning(&mut self, msg: &str);

    /// Display an error message. Shown in every mode.
    fn error(&mut self, msg: &str);

    /// Show a header/banner.
    fn show_header(&mut self, title: &str);

    /// Print command output (tables, JSON, ids). Shown in every mode.
    fn data(&mut self, text: &str);

    /// Theme used to style status words.
    fn theme(&self) -> &ProvflowTheme;
}
