//! Domain models

mod record;

pub use record::{EmailRecord, MessageId, SHEET_DATE_FORMAT};
