//! Mail crate - Gmail-to-Sheets logging core
//!
//! This crate provides the pieces of a one-shot mail logging run:
//! - Domain model (EmailRecord)
//! - Gmail API client, OAuth authentication and message decoding
//! - Google Sheets sink with header bootstrap and duplicate filtering
//! - Durable sync cursor persistence
//! - Sequential sync orchestrator
//!
//! This crate has no CLI dependencies; the `maillog` app wires it together.

pub mod auth;
pub mod config;
pub mod gmail;
pub mod models;
pub mod sheets;
pub mod state;
pub mod sync;

pub use auth::GoogleAuth;
pub use config::{GoogleCredentials, SyncSettings};
pub use gmail::{GmailClient, decode_message};
pub use models::{EmailRecord, MessageId, SHEET_DATE_FORMAT};
pub use sheets::{SheetNotFoundError, SheetsClient};
pub use state::CursorStore;
pub use sync::{MessageSource, RowSink, SyncStats, run_sync};
