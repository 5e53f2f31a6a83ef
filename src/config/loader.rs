//! Configuration file discovery and loading.

use std::fs;
use std::path::{Path, PathBuf};

use crate::config::schema::Settings;
use crate::error::{ProvflowError, Result};

/// File looked up in the working directory when no path is given.
pub const CONFIG_FILE_NAME: &str = "provflow.yml";

/// Find `provflow.yml` in `dir`, if present.
pub fn find_config_file(dir: &Path) -> Option<PathBuf> {
    let path = dir.join(CONFIG_FILE_NAME);
    if path.is_file() {
        Some(path)
    } else {
        None
    }
}

/// Parse YAML content into settings.
///
/// An empty document yields the defaults.
pub fn parse_settings(content: &str, source_path: &Path) -> Result<Settings> {
    if content.trim().is_empty() {
        return Ok(Settings::default());
    }
    serde_yaml::from_str(content).map_err(|e| ProvflowError::ConfigParseError {
        path: source_path.to_path_buf(),
        message: e.to_string(),
    })
}

/// Load settings with an optional path override.
///
/// An explicit path must exist. Without one, `provflow.yml` in `dir` is used
/// when present and the defaults otherwise.
///
/// # Errors
///
/// Returns `ConfigNotFound` if the explicit file doesn't exist.
/// Returns `ConfigParseError` if the YAML is invalid.
pub fn load_settings(dir: &Path, config_override: Option<&Path>) -> Result<Settings> {
    let path = match config_override {
        Some(path) => path.to_path_buf(),
        None => match find_config_file(dir) {
            Some(path) => path,
            None => {
                tracing::debug!("No {} found, using defaults", CONFIG_FILE_NAME);
                return Ok(Settings::default());
            }
        },
    };

    let content = fs::read_to_string(&path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            ProvflowError::ConfigNotFound { path: path.clone() }
        } else {
            ProvflowError::Io(e)
        }
    })?;

    tracing::debug!("Loaded settings from {:?}", path);
    parse_settings(&content, &path)
}
