//! Durable sync cursor persistence
//!
//! The cursor is the watermark timestamp of the latest successfully synced
//! message, stored as a one-field JSON file. An absent or corrupt file means
//! "no prior cursor" and never fails the run.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Stored cursor file contents
#[derive(Debug, Serialize, Deserialize)]
struct StoredCursor {
    last_processed_rfc3339: String,
}

/// File-backed store for the sync watermark
///
/// Single-process use only; no concurrent-writer protection is needed for a
/// one-shot batch tool.
pub struct CursorStore {
    path: PathBuf,
}

impl CursorStore {
    /// Create a store backed by `path`
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The file this store reads and writes
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the persisted cursor
    ///
    /// Returns `None` when the file is absent, unreadable or corrupt; a
    /// broken state file degrades to a fresh 7-day window, not a failed run.
    pub fn load(&self) -> Option<DateTime<Utc>> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(_) => {
                debug!("no cursor file at {}", self.path.display());
                return None;
            }
        };

        let stored: StoredCursor = match serde_json::from_str(&content) {
            Ok(stored) => stored,
            Err(e) => {
                warn!(
                    "cursor file {} is corrupt ({}); treating as absent",
                    self.path.display(),
                    e
                );
                return None;
            }
        };

        match DateTime::parse_from_rfc3339(&stored.last_processed_rfc3339) {
            Ok(ts) => Some(ts.with_timezone(&Utc)),
            Err(e) => {
                warn!(
                    "cursor file {} holds an invalid timestamp ({}); treating as absent",
                    self.path.display(),
                    e
                );
                None
            }
        }
    }

    /// Persist a new cursor value, creating missing parent directories
    pub fn save(&self, timestamp: DateTime<Utc>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create state directory: {}", parent.display())
            })?;
        }

        let stored = StoredCursor {
            last_processed_rfc3339: timestamp.to_rfc3339(),
        };
        let content = serde_json::to_string_pretty(&stored)?;
        fs::write(&self.path, content)
            .with_context(|| format!("Failed to write cursor file: {}", self.path.display()))?;

        Ok(())
    }
}
