//! Configuration schema.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use crate::store::DEFAULT_RETENTION_HOURS;

/// Top-level settings file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Directory holding the workflow store and the task spool.
    pub data_dir: PathBuf,

    pub store: StoreSettings,

    pub worker: WorkerSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(".provflow"),
            store: StoreSettings::default(),
            worker: WorkerSettings::default(),
        }
    }
}

impl Settings {
    /// Directory of the file-backed workflow store.
    pub fn store_dir(&self) -> PathBuf {
        self.data_dir.join("workflows")
    }

    /// Directory of the task spool.
    pub fn spool_dir(&self) -> PathBuf {
        self.data_dir.join("spool")
    }
}

/// Which key-value backend holds workflow records.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackendKind {
    /// JSON files under `data_dir`, shared between processes.
    #[default]
    File,
    /// Process memory; records vanish when the process exits.
    Memory,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreSettings {
    pub backend: StoreBackendKind,

    /// Hours a record lives after its last write.
    pub retention_hours: i64,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            backend: StoreBackendKind::File,
            retention_hours: DEFAULT_RETENTION_HOURS,
        }
    }
}

impl StoreSettings {
    pub fn retention(&self) -> chrono::Duration {
        chrono::Duration::hours(self.retention_hours)
    }
}

/// Step execution settings for the local worker pool and the spool worker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerSettings {
    /// Worker threads for in-process runs.
    pub threads: usize,

    /// Simulated work time per step, in milliseconds.
    pub step_delay_ms: u64,

    /// Pause between attempts of a failing step, in milliseconds.
    pub retry_backoff_ms: u64,

    /// Simulated failures: task name to error message.
    #[serde(skip_serializing_if = "HashMap::is_empty")]
    pub failures: HashMap<String, String>,
}

impl Default for WorkerSettings {
    fn default() -> Self {
        Self {
            threads: 2,
            step_delay_ms: 0,
            retry_backoff_ms: 0,
            failures: HashMap::new(),
        }
    }
}

impl WorkerSettings {
    pub fn step_delay(&self) -> Duration {
        Duration::from_millis(self.step_delay_ms)
    }

    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }
}
