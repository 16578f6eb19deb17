//! One sequential sync pass

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use log::{info, warn};

use super::{MessageSource, RowSink};
use crate::gmail::decode_message;
use crate::models::MessageId;
use crate::state::CursorStore;

/// Statistics from a sync run
#[derive(Debug, Default, Clone)]
pub struct SyncStats {
    /// Number of unread messages fetched from the source
    pub fetched: usize,
    /// Number of rows appended to the sink
    pub appended: usize,
    /// Number of messages skipped as duplicates
    pub duplicates: usize,
    /// Number of messages left unread after a failed append
    pub failures: usize,
    /// Duration of the run
    pub duration_ms: u64,
}

/// Run one full sync pass: fetch, decode, dedupe, append, mark read, then
/// advance the cursor
///
/// Strictly sequential, single pass. A single message's failure never
/// aborts the run: a failed append leaves that message unread for the next
/// run, and the cursor only advances over messages that were written.
pub fn run_sync(
    source: &dyn MessageSource,
    sink: &dyn RowSink,
    cursor: &CursorStore,
) -> Result<SyncStats> {
    let start = std::time::Instant::now();
    let mut stats = SyncStats::default();

    // 1. Header bootstrap. A failed check is logged and tolerated; the
    //    sheet still accepts appends without it.
    if let Err(e) = sink.ensure_header() {
        warn!("header check failed: {:#}", e);
    }

    // 2. Fetch everything unread since the last cursor.
    let last = cursor.load();
    let messages = source.fetch_unread(last);
    stats.fetched = messages.len();

    if messages.is_empty() {
        info!("no new unread messages");
        stats.duration_ms = start.elapsed().as_millis() as u64;
        return Ok(stats);
    }

    // 3. Process in source order.
    let mut latest_written: Option<DateTime<Utc>> = None;

    for message in &messages {
        let id = MessageId::new(&message.id);
        let record = decode_message(message);
        let date_str = record.date_string();

        if sink.is_duplicate(&record.sender, &record.subject, &date_str) {
            info!("skipping duplicate: {}", record.subject);
            // Still mark as read to clean the inbox
            if let Err(e) = source.mark_read(&id) {
                warn!("failed to mark {} read: {:#}", id.as_str(), e);
            }
            stats.duplicates += 1;
            continue;
        }

        match sink.append_row(&record) {
            Ok(()) => {
                if let Err(e) = source.mark_read(&id) {
                    // The row is written; the duplicate filter catches the
                    // re-append when this message resurfaces unread.
                    warn!("failed to mark {} read: {:#}", id.as_str(), e);
                }
                latest_written = Some(match latest_written {
                    Some(prev) => prev.max(record.received_at),
                    None => record.received_at,
                });
                stats.appended += 1;
            }
            Err(e) => {
                warn!(
                    "append failed for {}: {:#}; leaving unread",
                    id.as_str(),
                    e
                );
                stats.failures += 1;
            }
        }
    }

    // 4. Advance the cursor only over successful writes, and never backwards.
    if let Some(mut newest) = latest_written {
        if let Some(prev) = last {
            newest = newest.max(prev);
        }
        cursor
            .save(newest)
            .context("Failed to persist sync cursor")?;
        info!("cursor advanced to {}", newest.to_rfc3339());
    }

    stats.duration_ms = start.elapsed().as_millis() as u64;
    Ok(stats)
}
