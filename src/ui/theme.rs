//! Visual theme and styling.

use console::Style;

use crate::workflow::{StepStatus, WorkflowStatus};

/// Provflow's visual theme.
#[derive(Debug, Clone)]
pub struct ProvflowTheme {
    /// Style for success messages (green).
    pub success: Style,
    /// Style for warning messages (orange).
    pub warning: Style,
    /// Style for error messages (red bold).
    pub error: Style,
    /// Style for running elements (cyan).
    pub info: Style,
    /// Style for dim/secondary text.
    pub dim: Style,
    /// Style for highlighted/important text (bold).
    pub highlight: Style,
    /// Style for headers (cyan bold).
    pub header: Style,
    /// Style for key labels in key-value displays (bold).
    pub key: Style,
}

impl Default for ProvflowTheme {
    fn default() -> Self {
        Self::new()
    }
}

impl ProvflowTheme {
    /// Create the default colored theme.
    pub fn new() -> Self {
        Self {
            success: Style::new().green(),
            warning: Style::new().color256(208),
            error: Style::new().red().bold(),
            info: Style::new().cyan(),
            dim: Style::new().dim(),
            highlight: Style::new().bold(),
            header: Style::new().bold().cyan(),
            key: Style::new().bold(),
        }
    }

    /// Create a theme without colors (for non-TTY or --no-color).
    pub fn plain() -> Self {
        Self {
            success: Style::new(),
            warning: Style::new(),
            error: Style::new(),
            info: Style::new(),
            dim: Style::new(),
            highlight: Style::new(),
            header: Style::new(),
            key: Style::new(),
        }
    }

    pub fn format_success(&self, msg: &str) -> String {
        format!("{}", self.success.apply_to(format!("✓ {}", msg)))
    }

    pub fn format_warning(&self, msg: &str) -> String {
        format!("{}", self.warning.apply_to(format!("⚠ {}", msg)))
    }

    pub fn format_error(&self, msg: &str) -> String {
        format!("{}", self.error.apply_to(format!("✗ {}", msg)))
    }

    pub fn format_header(&self, title: &str) -> String {
        format!("{}", self.header.apply_to(title))
    }

    /// Icon and status word for a step.
    pub fn step_status(&self, status: StepStatus) -> String {
        let (icon, style) = match status {
            StepStatus::Pending => ("○", &self.dim),
            StepStatus::Running => ("◆", &self.info),
            StepStatus::Completed => ("✓", &self.success),
            StepStatus::Failed => ("✗", &self.error),
        };
        format!("{}", style.apply_to(format!("{} {}", icon, status)))
    }

    /// Status word for a workflow.
    pub fn workflow_status(&self, status: WorkflowStatus) -> String {
        let style = match status {
            WorkflowStatus::Pending | WorkflowStatus::Paused => &self.dim,
            WorkflowStatus::Running => &self.info,
            WorkflowStatus::Completed => &self.success,
            WorkflowStatus::Failed => &self.error,
        };
        format!("{}", style.apply_to(status))
    }
}

/// Check if colors should be enabled.
pub fn should_use_colors() -> bool {
    // Check NO_COLOR env var (https://no-color.org/)
    if std::env::var("NO_COLOR").is_ok() {
        return false;
    }

    console::Term::stdout().is_term()
}
