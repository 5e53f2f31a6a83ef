//! Provflow - multi-step provisioning workflow orchestration.
//!
//! Provflow drives a target resource through a fixed, ordered catalog of
//! long-running steps (reinstall OS, install base environment, install
//! Docker, configure network, register to inventory). Each run is a
//! persisted workflow record; steps execute out of band and report back,
//! and a failed run can be resumed from any step.
//!
//! # Modules
//!
//! - [`catalog`] - The ordered step catalog
//! - [`workflow`] - Workflow records, step results, and their transitions
//! - [`store`] - Key-value backends and the TTL-bounded workflow store
//! - [`dispatch`] - Task dispatchers (local pool, spool directory, mock)
//! - [`handler`] - Step handlers and the events they publish
//! - [`orchestrator`] - The state machine tying it all together
//! - [`worker`] - Spool worker executing dispatched steps
//! - [`config`] - Settings file loading
//! - [`cli`] - Command-line interface and argument parsing
//! - [`ui`] - Terminal output
//! - [`error`] - Error types and result aliases
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use provflow::catalog::StepCatalog;
//! use provflow::dispatch::MockDispatcher;
//! use provflow::orchestrator::{CallbackOutcome, Orchestrator};
//! use provflow::store::{MemoryBackend, WorkflowStore};
//! use provflow::workflow::WorkflowStatus;
//!
//! let catalog = Arc::new(StepCatalog::standard());
//! let store = WorkflowStore::new(Arc::new(MemoryBackend::new()), catalog.clone());
//! let orchestrator = Orchestrator::new(catalog, store, Arc::new(MockDispatcher::new()));
//!
//! let id = orchestrator.create_workflow("srv-001", "Ubuntu 20.04").unwrap().workflow_id;
//! orchestrator.start_workflow(&id).unwrap();
//! for step in 0..5 {
//!     let outcome = orchestrator.on_step_completed(&id, step, "ok").unwrap();
//!     assert_eq!(outcome, CallbackOutcome::Applied);
//! }
//!
//! assert_eq!(orchestrator.get_status(&id).unwrap().status, WorkflowStatus::Completed);
//! ```

pub mod catalog;
pub mod cli;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod handler;
pub mod orchestrator;
pub mod store;
pub mod ui;
pub mod worker;
pub mod workflow;

pub use error::{ProvflowError, Result};
