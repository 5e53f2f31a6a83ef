//! Shared rendering for workflow records and the step catalog.
//!
//! These helpers are used by `status`, `list`, `run`, and any other command
//! that prints records, so every command shows them the same way.

use serde::Serialize;

use crate::catalog::StepDefinition;
use crate::error::Result;
use crate::ui::{Table, UserInterface};
use crate::workflow::WorkflowRecord;

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S UTC";

/// Print any serializable value as pretty JSON.
pub fn print_json<T: Serialize + ?Sized>(ui: &mut dyn UserInterface, value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    ui.data(&json);
    Ok(())
}

/// Render the step catalog as a table.
pub fn catalog_table(steps: &[StepDefinition]) -> Table {
    let mut table = Table::new(&["#", "STEP", "TASK", "RETRIES"]);
    for (i, def) in steps.iter().enumerate() {
        table.add_row(vec![
            i.to_string(),
            def.name.clone(),
            def.task_name.clone(),
            def.retry_budget.to_string(),
        ]);
    }
    table
}

/// Render one line per workflow.
pub fn workflow_table(ui: &dyn UserInterface, records: &[WorkflowRecord]) -> Table {
    let theme = ui.theme();
    let mut table = Table::new(&["ID", "TARGET", "CONFIG", "STATUS", "STEP", "UPDATED"]);
    for record in records {
        table.add_row(vec![
            record.workflow_id.to_string(),
            record.target_id.clone(),
            record.config.clone(),
            theme.workflow_status(record.status),
            progress(record),
            record.updated_at.format(TIME_FORMAT).to_string(),
        ]);
    }
    table
}

/// "current/total" using 1-based step numbers.
pub fn progress(record: &WorkflowRecord) -> String {
    let shown = (record.current_step + 1).min(record.total_steps);
    format!("{}/{}", shown, record.total_steps)
}

/// Print a record header and its step table.
pub fn show_record(ui: &mut dyn UserInterface, record: &WorkflowRecord) {
    let mut lines = vec![
        format!("Workflow:  {}", record.workflow_id),
        format!("Target:    {}", record.target_id),
        format!("Config:    {}", record.config),
        format!("Status:    {}", ui.theme().workflow_status(record.status)),
        format!("Step:      {}", progress(record)),
        format!("Created:   {}", record.created_at.format(TIME_FORMAT)),
        format!("Updated:   {}", record.updated_at.format(TIME_FORMAT)),
    ];
    if let Some(completed) = record.completed_at {
        lines.push(format!("Completed: {}", completed.format(TIME_FORMAT)));
    }
    if let Some(error) = &record.last_error {
        lines.push(format!("Error:     {}", error));
    }

    let mut table = Table::new(&["#", "STEP", "STATUS", "ATTEMPTS", "DETAIL"]);
    for step in &record.step_results {
        let detail = step
            .error
            .as_deref()
            .or(step.result.as_deref())
            .unwrap_or("");
        table.add_row(vec![
            step.step_index.to_string(),
            step.step_name.clone(),
            ui.theme().step_status(step.status),
            step.attempts.to_string(),
            detail.to_string(),
        ]);
    }

    ui.data(&lines.join("\n"));
    ui.data("");
    ui.data(&table.render());
}
