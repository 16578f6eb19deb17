//! End-to-end sync scenarios over in-memory collaborators
//!
//! These tests drive `run_sync` with in-memory source/sink doubles and a
//! tempdir-backed cursor store, covering the cursor, duplicate and
//! partial-failure laws.

use std::cell::RefCell;

use anyhow::Result;
use base64::prelude::*;
use chrono::{DateTime, TimeZone, Utc};
use mail::gmail::api::{GmailMessage, Header, MessageBody, MessagePayload};
use mail::models::{EmailRecord, MessageId};
use mail::state::CursorStore;
use mail::sync::{MessageSource, RowSink, run_sync};
use tempfile::TempDir;

const HEADER_ROW: [&str; 4] = ["From", "Subject", "Date", "Content"];

/// Build a full unread message fixture
fn make_message(id: &str, from: &str, subject: &str, date: &str, body: &str) -> GmailMessage {
    GmailMessage {
        id: id.to_string(),
        payload: Some(MessagePayload {
            mime_type: Some("text/plain".to_string()),
            headers: Some(vec![
                Header {
                    name: "From".to_string(),
                    value: from.to_string(),
                },
                Header {
                    name: "Subject".to_string(),
                    value: subject.to_string(),
                },
                Header {
                    name: "Date".to_string(),
                    value: date.to_string(),
                },
            ]),
            body: Some(MessageBody {
                size: Some(body.len() as u32),
                data: Some(BASE64_URL_SAFE_NO_PAD.encode(body.as_bytes())),
            }),
            parts: None,
        }),
    }
}

/// In-memory message source
struct FakeSource {
    messages: Vec<GmailMessage>,
    marked_read: RefCell<Vec<String>>,
    fail_mark_read: bool,
}

impl FakeSource {
    fn new(messages: Vec<GmailMessage>) -> Self {
        Self {
            messages,
            marked_read: RefCell::new(Vec::new()),
            fail_mark_read: false,
        }
    }

    fn read_ids(&self) -> Vec<String> {
        self.marked_read.borrow().clone()
    }
}

impl MessageSource for FakeSource {
    fn fetch_unread(&self, _after: Option<DateTime<Utc>>) -> Vec<GmailMessage> {
        self.messages.clone()
    }

    fn mark_read(&self, id: &MessageId) -> Result<()> {
        if self.fail_mark_read {
            anyhow::bail!("simulated mark-read failure");
        }
        self.marked_read.borrow_mut().push(id.as_str().to_string());
        Ok(())
    }
}

/// In-memory row sink
struct FakeSink {
    header: RefCell<Option<Vec<String>>>,
    header_writes: RefCell<usize>,
    rows: RefCell<Vec<Vec<String>>>,
    fail_append: bool,
}

impl FakeSink {
    fn new() -> Self {
        Self {
            header: RefCell::new(None),
            header_writes: RefCell::new(0),
            rows: RefCell::new(Vec::new()),
            fail_append: false,
        }
    }

    fn failing() -> Self {
        Self {
            fail_append: true,
            ..Self::new()
        }
    }

    fn row_count(&self) -> usize {
        self.rows.borrow().len()
    }
}

impl RowSink for FakeSink {
    fn ensure_header(&self) -> Result<()> {
        let expected: Vec<String> = HEADER_ROW.iter().map(|s| s.to_string()).collect();
        let mut header = self.header.borrow_mut();
        if header.as_ref() != Some(&expected) {
            *header = Some(expected);
            *self.header_writes.borrow_mut() += 1;
        }
        Ok(())
    }

    fn is_duplicate(&self, sender: &str, subject: &str, date_str: &str) -> bool {
        self.rows
            .borrow()
            .iter()
            .any(|row| row[0] == sender && row[1] == subject && row[2] == date_str)
    }

    fn append_row(&self, record: &EmailRecord) -> Result<()> {
        if self.fail_append {
            anyhow::bail!("simulated append failure");
        }
        self.rows.borrow_mut().push(vec![
            record.sender.clone(),
            record.subject.clone(),
            record.date_string(),
            record.body.clone(),
        ]);
        Ok(())
    }
}

fn cursor_in(dir: &TempDir) -> CursorStore {
    CursorStore::new(dir.path().join("sync-state.json"))
}

#[test]
fn test_single_message_appends_marks_read_and_advances_cursor() {
    let dir = TempDir::new().unwrap();
    let cursor = cursor_in(&dir);

    let source = FakeSource::new(vec![make_message(
        "m1",
        "Alice <alice@example.com>",
        "Weekly report",
        "Tue, 1 Jul 2025 10:00:00 +0000",
        "All good.",
    )]);
    let sink = FakeSink::new();

    let stats = run_sync(&source, &sink, &cursor).unwrap();

    assert_eq!(stats.fetched, 1);
    assert_eq!(stats.appended, 1);
    assert_eq!(stats.duplicates, 0);
    assert_eq!(stats.failures, 0);

    let rows = sink.rows.borrow();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0][0], "alice@example.com");
    assert_eq!(rows[0][1], "Weekly report");
    assert_eq!(rows[0][2], "2025-07-01 10:00:00");
    assert_eq!(rows[0][3], "All good.");

    assert_eq!(source.read_ids(), vec!["m1"]);
    assert_eq!(
        cursor.load(),
        Some(Utc.with_ymd_and_hms(2025, 7, 1, 10, 0, 0).unwrap())
    );
}

#[test]
fn test_duplicate_is_skipped_but_still_marked_read() {
    let dir = TempDir::new().unwrap();
    let cursor = cursor_in(&dir);

    let date = "Tue, 1 Jul 2025 10:00:00 +0000";
    let source = FakeSource::new(vec![
        make_message("m1", "alice@example.com", "Ping", date, "first copy"),
        make_message("m2", "alice@example.com", "Ping", date, "second copy"),
    ]);
    let sink = FakeSink::new();

    let stats = run_sync(&source, &sink, &cursor).unwrap();

    assert_eq!(stats.fetched, 2);
    assert_eq!(stats.appended, 1);
    assert_eq!(stats.duplicates, 1);
    assert_eq!(sink.row_count(), 1);

    // Both messages end up read, including the skipped duplicate
    assert_eq!(source.read_ids(), vec!["m1", "m2"]);

    // Cursor advanced once, to the shared date
    assert_eq!(
        cursor.load(),
        Some(Utc.with_ymd_and_hms(2025, 7, 1, 10, 0, 0).unwrap())
    );
}

#[test]
fn test_failed_append_leaves_message_unread_and_cursor_untouched() {
    let dir = TempDir::new().unwrap();
    let cursor = cursor_in(&dir);

    let source = FakeSource::new(vec![make_message(
        "m1",
        "alice@example.com",
        "Doomed",
        "Tue, 1 Jul 2025 10:00:00 +0000",
        "never arrives",
    )]);
    let sink = FakeSink::failing();

    let stats = run_sync(&source, &sink, &cursor).unwrap();

    assert_eq!(stats.fetched, 1);
    assert_eq!(stats.appended, 0);
    assert_eq!(stats.failures, 1);
    assert_eq!(sink.row_count(), 0);
    assert!(source.read_ids().is_empty());

    // No cursor file was ever written
    assert_eq!(cursor.load(), None);
    assert!(!cursor.path().exists());
}

#[test]
fn test_partial_failure_still_advances_over_written_messages() {
    let dir = TempDir::new().unwrap();
    let cursor = cursor_in(&dir);

    // Sink that rejects one specific subject
    struct PickySink {
        inner: FakeSink,
    }

    impl RowSink for PickySink {
        fn ensure_header(&self) -> Result<()> {
            self.inner.ensure_header()
        }

        fn is_duplicate(&self, sender: &str, subject: &str, date_str: &str) -> bool {
            self.inner.is_duplicate(sender, subject, date_str)
        }

        fn append_row(&self, record: &EmailRecord) -> Result<()> {
            if record.subject == "Rejected" {
                anyhow::bail!("simulated append failure");
            }
            self.inner.append_row(record)
        }
    }

    let source = FakeSource::new(vec![
        make_message(
            "m1",
            "a@example.com",
            "Accepted",
            "Tue, 1 Jul 2025 10:00:00 +0000",
            "ok",
        ),
        make_message(
            "m2",
            "b@example.com",
            "Rejected",
            "Wed, 2 Jul 2025 10:00:00 +0000",
            "no",
        ),
    ]);
    let sink = PickySink {
        inner: FakeSink::new(),
    };

    let stats = run_sync(&source, &sink, &cursor).unwrap();

    assert_eq!(stats.appended, 1);
    assert_eq!(stats.failures, 1);
    assert_eq!(source.read_ids(), vec!["m1"]);

    // Cursor reflects the written message only, not the failed one
    assert_eq!(
        cursor.load(),
        Some(Utc.with_ymd_and_hms(2025, 7, 1, 10, 0, 0).unwrap())
    );
}

#[test]
fn test_cursor_never_regresses() {
    let dir = TempDir::new().unwrap();
    let cursor = cursor_in(&dir);

    // A prior run already advanced past this message's date
    let prior = Utc.with_ymd_and_hms(2025, 7, 5, 0, 0, 0).unwrap();
    cursor.save(prior).unwrap();

    let source = FakeSource::new(vec![make_message(
        "m1",
        "late@example.com",
        "Straggler",
        "Tue, 1 Jul 2025 10:00:00 +0000",
        "arrived late",
    )]);
    let sink = FakeSink::new();

    let stats = run_sync(&source, &sink, &cursor).unwrap();

    assert_eq!(stats.appended, 1);
    assert_eq!(cursor.load(), Some(prior));
}

#[test]
fn test_empty_fetch_terminates_cleanly() {
    let dir = TempDir::new().unwrap();
    let cursor = cursor_in(&dir);

    let source = FakeSource::new(Vec::new());
    let sink = FakeSink::new();

    let stats = run_sync(&source, &sink, &cursor).unwrap();

    assert_eq!(stats.fetched, 0);
    assert_eq!(stats.appended, 0);
    assert_eq!(sink.row_count(), 0);
    assert_eq!(cursor.load(), None);
}

#[test]
fn test_ensure_header_is_idempotent() {
    let sink = FakeSink::new();

    sink.ensure_header().unwrap();
    sink.ensure_header().unwrap();

    let expected: Vec<String> = HEADER_ROW.iter().map(|s| s.to_string()).collect();
    assert_eq!(sink.header.borrow().as_ref(), Some(&expected));
    assert_eq!(*sink.header_writes.borrow(), 1);
}

#[test]
fn test_mark_read_failure_does_not_undo_append() {
    let dir = TempDir::new().unwrap();
    let cursor = cursor_in(&dir);

    let mut source = FakeSource::new(vec![make_message(
        "m1",
        "alice@example.com",
        "Sticky",
        "Tue, 1 Jul 2025 10:00:00 +0000",
        "written anyway",
    )]);
    source.fail_mark_read = true;
    let sink = FakeSink::new();

    let stats = run_sync(&source, &sink, &cursor).unwrap();

    // Appended and counted despite the failed mark-read; the message will
    // resurface unread and be caught by the duplicate filter next run.
    assert_eq!(stats.appended, 1);
    assert_eq!(sink.row_count(), 1);
    assert_eq!(
        cursor.load(),
        Some(Utc.with_ymd_and_hms(2025, 7, 1, 10, 0, 0).unwrap())
    );

    // And the duplicate law holds for the resurfaced copy
    let resurfaced = make_message(
        "m1",
        "alice@example.com",
        "Sticky",
        "Tue, 1 Jul 2025 10:00:00 +0000",
        "written anyway",
    );
    let source2 = FakeSource::new(vec![resurfaced]);
    let stats2 = run_sync(&source2, &sink, &cursor).unwrap();
    assert_eq!(stats2.duplicates, 1);
    assert_eq!(stats2.appended, 0);
    assert_eq!(sink.row_count(), 1);
    assert_eq!(source2.read_ids(), vec!["m1"]);
}
