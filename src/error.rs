//! Error types for provflow operations.
//!
//! This module defines [`ProvflowError`], the primary error type used throughout
//! the crate, and a [`Result`] type alias for convenience.
//!
//! # Error Handling Strategy
//!
//! - Store and dispatcher failures surface to the immediate caller unchanged
//! - The orchestrator never retries on its own; retry is `retry_from_step`
//! - Step handlers report failures as `anyhow::Error`, which become step errors
//! - Use `ProvflowError::Other` for unexpected errors

use std::path::PathBuf;
use thiserror::Error;

use crate::workflow::WorkflowStatus;

/// Core error type for provflow operations.
#[derive(Debug, Error)]
pub enum ProvflowError {
    /// Workflow id is unknown or its record has expired.
    #[error("Workflow not found: {workflow_id}")]
    NotFound { workflow_id: String },

    /// Step index outside `[0, total)`.
    #[error("Invalid step index {index} (workflow has {total} steps)")]
    InvalidIndex { index: i64, total: usize },

    /// Start or dispatch requested past the last step.
    #[error("Workflow {workflow_id} has already completed")]
    AlreadyCompleted { workflow_id: String },

    /// Operation not allowed from the workflow's current status.
    #[error("Cannot {operation} workflow {workflow_id} while it is {status}")]
    InvalidState {
        workflow_id: String,
        status: WorkflowStatus,
        operation: String,
    },

    /// Task submission to the dispatcher failed.
    #[error("Failed to dispatch task '{task}': {message}")]
    Dispatch { task: String, message: String },

    /// Storage backend failure.
    #[error("Persistence error: {message}")]
    Persistence { message: String },

    /// Record could not be encoded or decoded.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Concurrent writers kept winning the compare-and-swap.
    #[error("Concurrent modification of '{key}', giving up after repeated conflicts")]
    Conflict { key: String },

    /// Event pump gave up waiting for a run to come to rest.
    #[error("Timed out waiting for workflow {workflow_id}")]
    Timeout { workflow_id: String },

    /// Configuration file not found at the requested location.
    #[error("Configuration not found: {path}")]
    ConfigNotFound { path: PathBuf },

    /// Failed to parse configuration file.
    #[error("Failed to parse config at {path}: {message}")]
    ConfigParseError { path: PathBuf, message: String },

    /// IO error wrapper.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic wrapped error for anyhow interop.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ProvflowError {
    /// Build a persistence error from any displayable backend failure.
    pub fn persistence(message: impl std::fmt::Display) -> Self {
        Self::Persistence {
            message: message.to_string(),
        }
    }
}

/// Result type alias for provflow operations.
pub type Result<T> = std::result::Result<T, ProvflowError>;
