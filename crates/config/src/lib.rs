//! Configuration loading for maillog
//!
//! Shared helpers for the maillog config directory (~/.config/maillog/),
//! which holds the Google credentials file, the OAuth token cache and the
//! sync state file.
//!
//! Call [`ensure_config_dir`] at application startup to bootstrap the
//! directory.

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};

/// Get the maillog config directory (~/.config/maillog/)
pub fn config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("maillog"))
}

/// Get the path to a file within the maillog config directory
pub fn config_path(filename: &str) -> Option<PathBuf> {
    config_dir().map(|p| p.join(filename))
}

/// Ensure the maillog config directory exists, creating it if needed
pub fn ensure_config_dir() -> Result<PathBuf> {
    let dir = config_dir().context("Could not determine config directory")?;
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("Failed to create config directory: {}", dir.display()))?;
    Ok(dir)
}

/// Check if a file exists in the maillog config directory
pub fn config_exists(filename: &str) -> bool {
    config_path(filename).is_some_and(|p| p.exists())
}

/// Load and parse a JSON file from the maillog config directory
pub fn load_json<T: DeserializeOwned>(filename: &str) -> Result<T> {
    let path = config_path(filename).context("Could not determine config directory")?;
    load_json_file(&path)
}

/// Load and parse a JSON file from an arbitrary path
pub fn load_json_file<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}
