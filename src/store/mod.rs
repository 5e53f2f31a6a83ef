//! Durable workflow storage.
//!
//! This module provides:
//! - [`KvBackend`] - the key-value engine interface (compare-and-swap + TTL)
//! - [`MemoryBackend`] and [`FileBackend`] - reference backends
//! - [`WorkflowStore`] - CRUD and transactional updates over workflow records
//!
//! Every read-modify-write goes through [`WorkflowStore::mutate`], which
//! retries the whole cycle when another writer bumped the record's revision
//! in the meantime.

pub mod backend;
pub mod file;
pub mod memory;
pub mod workflow_store;

pub use backend::{Expect, KvBackend, StoredEntry};
pub use file::FileBackend;
pub use memory::MemoryBackend;
pub use workflow_store::{Change, WorkflowStore, DEFAULT_RETENTION_HOURS, MAX_CONFLICT_RETRIES};
