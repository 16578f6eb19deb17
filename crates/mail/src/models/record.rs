//! Flat email record produced by the decoder

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Date format used in the sheet's Date column
pub const SHEET_DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Unique identifier for a message (Gmail message ID)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageId(pub String);

impl MessageId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for MessageId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for MessageId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// One decoded email, ready to be appended as a sheet row
///
/// Produced by [`crate::gmail::decode_message`]; every field carries a
/// defined fallback, so a record exists for any input message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmailRecord {
    /// Sender address (bare address when the From header had one in brackets)
    pub sender: String,
    /// Decoded subject line
    pub subject: String,
    /// Parsed Date header, or the decode time when unparseable
    pub received_at: DateTime<Utc>,
    /// Plain-text body (untruncated; the sink applies the length limit)
    pub body: String,
}

impl EmailRecord {
    /// The Date column value for this record
    pub fn date_string(&self) -> String {
        self.received_at.format(SHEET_DATE_FORMAT).to_string()
    }
}
