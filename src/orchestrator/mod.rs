//! Pipeline state machine.
//!
//! The [`Orchestrator`] is a passive coordinator: API calls (create, start,
//! retry) and step outcomes (callbacks or [`StepEvent`]s) drive it, and it
//! never blocks on step execution.
//!
//! # Workflow states
//!
//! ```text
//! pending --start--> running --last step completed--> completed
//!                       |
//!                       +--any step failed--> failed --retry_from_step--> running
//! ```
//!
//! `paused` exists in the data model but nothing transitions into it.
//!
//! # Concurrency
//!
//! Operations on one workflow id run one at a time inside this process
//! ([`KeyLocks`]); writers in other processes are caught by the store's
//! revision check. Outcomes that do not belong to the step's current
//! dispatch attempt are discarded, see [`CallbackOutcome`].
//!
//! [`StepEvent`]: crate::handler::StepEvent

mod callback;
mod coordinator;
mod locks;

pub use callback::CallbackOutcome;
pub use coordinator::Orchestrator;
pub use locks::KeyLocks;
