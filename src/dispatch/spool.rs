//! Directory spool dispatcher.
//!
//! Each submission becomes one JSON file in the spool directory. A separate
//! process (the `worker` command) lists pending tasks, runs them, reports
//! the outcome and acknowledges the file.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{ProvflowError, Result};
use crate::workflow::CorrelationId;

use super::{TaskDispatcher, TaskSubmission};

/// A task waiting in the spool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpooledTask {
    pub correlation_id: CorrelationId,
    pub submission: TaskSubmission,
    pub enqueued_at: DateTime<Utc>,
}

/// File-queue dispatcher.
#[derive(Debug, Clone)]
pub struct SpoolDispatcher {
    dir: PathBuf,
}

impl SpoolDispatcher {
    /// Create a spool rooted at `dir`. The directory is created lazily.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Get the spool directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn task_path(&self, correlation_id: &CorrelationId) -> PathBuf {
        self.dir.join(format!("{}.json", correlation_id))
    }

    /// Pending tasks, oldest first.
    pub fn pending(&self) -> Result<Vec<SpooledTask>> {
        if !self.dir.exists() {
            return Ok(Vec::new());
        }

        let mut tasks = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.extension().is_some_and(|e| e == "json") {
                let json = fs::read_to_string(&path)?;
                match serde_json::from_str::<SpooledTask>(&json) {
                    Ok(task) => tasks.push(task),
                    Err(e) => tracing::warn!("Skipping unreadable spool file {:?}: {}", path, e),
                }
            }
        }

        tasks.sort_by(|a, b| a.enqueued_at.cmp(&b.enqueued_at));
        Ok(tasks)
    }

    /// Remove a task from the spool. Returns whether it was still there.
    pub fn ack(&self, task: &SpooledTask) -> Result<bool> {
        match fs::remove_file(self.task_path(&task.correlation_id)) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

impl TaskDispatcher for SpoolDispatcher {
    fn submit(&self, task: &TaskSubmission) -> Result<CorrelationId> {
        let dispatch_error = |e: &dyn std::fmt::Display| ProvflowError::Dispatch {
            task: task.task_name.clone(),
            message: e.to_string(),
        };

        fs::create_dir_all(&self.dir).map_err(|e| dispatch_error(&e))?;

        let spooled = SpooledTask {
            correlation_id: CorrelationId::generate("spool"),
            submission: task.clone(),
            enqueued_at: Utc::now(),
        };
        let json = serde_json::to_string_pretty(&spooled).map_err(|e| dispatch_error(&e))?;

        let path = self.task_path(&spooled.correlation_id);
        let temp_path = path.with_extension("json.tmp");
        fs::write(&temp_path, json)
            .and_then(|_| fs::rename(&temp_path, &path))
            .map_err(|e| dispatch_error(&e))?;

        tracing::debug!(
            task = %task.task_name,
            correlation_id = %spooled.correlation_id,
            "Spooled task"
        );
        Ok(spooled.correlation_id)
    }
}
