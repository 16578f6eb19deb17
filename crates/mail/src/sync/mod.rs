//! Sync engine for one mail logging pass
//!
//! Defines the seams between the orchestrator and its collaborators, and
//! the sequential run itself.

mod run;

pub use run::{SyncStats, run_sync};

use anyhow::Result;
use chrono::{DateTime, Utc};

use crate::gmail::api::GmailMessage;
use crate::models::{EmailRecord, MessageId};

/// Source of unread messages
///
/// Implemented by the Gmail client and by in-memory doubles in tests.
pub trait MessageSource {
    /// Fetch unread messages newer than `after`
    ///
    /// Fail-open: implementations return an empty list on remote errors;
    /// callers must tolerate under-delivery.
    fn fetch_unread(&self, after: Option<DateTime<Utc>>) -> Vec<GmailMessage>;

    /// Mark one message read
    fn mark_read(&self, id: &MessageId) -> Result<()>;
}

/// Destination accepting one row per email
///
/// Implemented by the Sheets client and by in-memory doubles in tests.
pub trait RowSink {
    /// Ensure the canonical header row exists (idempotent)
    fn ensure_header(&self) -> Result<()>;

    /// Check the lookback window for an exact (sender, subject, date) match
    ///
    /// Fail-open: read errors report `false`.
    fn is_duplicate(&self, sender: &str, subject: &str, date_str: &str) -> bool;

    /// Append one row; on failure nothing is written
    fn append_row(&self, record: &EmailRecord) -> Result<()>;
}
