//! Configuration loading for provflow.
//!
//! Settings come from a single YAML file:
//! - Schema definitions in [`schema`]
//! - File discovery and loading in [`loader`]
//!
//! # Example
//!
//! ```
//! use provflow::config::{load_settings, StoreBackendKind};
//! use tempfile::TempDir;
//! use std::fs;
//!
//! let temp = TempDir::new().unwrap();
//! let path = temp.path().join("provflow.yml");
//! fs::write(&path, "store:\n  backend: memory\n").unwrap();
//!
//! let settings = load_settings(temp.path(), Some(&path)).unwrap();
//! assert_eq!(settings.store.backend, StoreBackendKind::Memory);
//! assert_eq!(settings.store.retention_hours, 24);
//! ```
//!
//! # File Location
//!
//! 1. The path passed with `--config` (must exist)
//! 2. `provflow.yml` in the working directory, if present
//! 3. Built-in defaults

pub mod loader;
pub mod schema;

pub use loader::{find_config_file, load_settings, parse_settings, CONFIG_FILE_NAME};
pub use schema::{Settings, StoreBackendKind, StoreSettings, WorkerSettings};
