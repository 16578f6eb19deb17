//! Google Sheets API HTTP client
//!
//! Range-based read/update/append against one fixed spreadsheet and sheet
//! name, with the four-column {From, Subject, Date, Content} layout.
//! Uses synchronous HTTP (ureq); each call blocks the run.

use anyhow::{Context, Result};
use log::{debug, info, warn};

use super::api::{AppendResponse, ValueRange};
use crate::auth::GoogleAuth;
use crate::config::SyncSettings;
use crate::models::EmailRecord;
use crate::sync::RowSink;

/// Canonical header row of the target sheet
pub const HEADER_ROW: [&str; 4] = ["From", "Subject", "Date", "Content"];

/// Marker appended when a body is cut at the length limit
const TRUNCATION_MARKER: &str = "… [truncated]";

/// Error indicating the spreadsheet or sheet name does not exist
#[derive(Debug, thiserror::Error)]
#[error("Spreadsheet or sheet not found; check spreadsheet_id and sheet_name in settings")]
pub struct SheetNotFoundError;

/// Truncate a body to `limit` characters, marking the cut
pub fn truncate_body(body: &str, limit: usize) -> String {
    if body.chars().count() <= limit {
        return body.to_string();
    }
    let mut truncated: String = body.chars().take(limit).collect();
    truncated.push_str(TRUNCATION_MARKER);
    truncated
}

/// Sheets API client appending email rows to one sheet
pub struct SheetsClient {
    auth: GoogleAuth,
    spreadsheet_id: String,
    sheet_name: String,
    lookback_rows: usize,
    max_body_chars: usize,
}

impl SheetsClient {
    /// Sheets API base URL
    const BASE_URL: &'static str = "https://sheets.googleapis.com/v4/spreadsheets";

    /// Create a new Sheets client
    pub fn new(auth: GoogleAuth, settings: &SyncSettings) -> Self {
        Self {
            auth,
            spreadsheet_id: settings.spreadsheet_id.clone(),
            sheet_name: settings.sheet_name.clone(),
            lookback_rows: settings.lookback_rows,
            max_body_chars: settings.max_body_chars,
        }
    }

    /// URL for a values call on `range`, plus an optional method suffix and
    /// query string
    fn values_url(&self, range: &str, suffix: &str) -> String {
        format!(
            "{}/{}/values/{}{}",
            Self::BASE_URL,
            self.spreadsheet_id,
            urlencoding::encode(range),
            suffix
        )
    }

    /// Read a range of cell values
    fn get_values(&self, range: &str) -> Result<ValueRange> {
        let access_token = self.auth.access_token()?;
        let url = self.values_url(range, "");

        let response = ureq::get(&url)
            .header("Authorization", &format!("Bearer {}", access_token))
            .call();

        match response {
            Ok(mut resp) => {
                let values: ValueRange = resp
                    .body_mut()
                    .read_json()
                    .context("Failed to parse values response")?;
                Ok(values)
            }
            Err(ureq::Error::StatusCode(404)) => Err(SheetNotFoundError.into()),
            Err(e) => Err(e).context("Failed to send values request"),
        }
    }

    /// Ensure the sheet starts with the canonical header row
    ///
    /// Reads the first row and writes the header only when it is missing or
    /// mismatched; calling twice in a row leaves exactly one header.
    pub fn ensure_header(&self) -> Result<()> {
        let range = format!("{}!A1:D1", self.sheet_name);
        let current = self.get_values(&range)?;

        let matches = current
            .values
            .as_ref()
            .and_then(|rows| rows.first())
            .is_some_and(|row| row.iter().map(String::as_str).eq(HEADER_ROW));

        if matches {
            debug!("header row already present");
            return Ok(());
        }

        let access_token = self.auth.access_token()?;
        let url = self.values_url(&range, "?valueInputOption=RAW");
        let body = ValueRange {
            values: Some(vec![HEADER_ROW.iter().map(|s| s.to_string()).collect()]),
            ..Default::default()
        };

        ureq::put(&url)
            .header("Authorization", &format!("Bearer {}", access_token))
            .send_json(&body)
            .context("Failed to write header row")?;

        info!("header row written");
        Ok(())
    }

    /// Check recent rows for an exact (sender, subject, date) match
    ///
    /// Fail-open: a read error is logged and reported as "not a duplicate";
    /// a possible duplicate row is preferred over losing data.
    pub fn is_duplicate(&self, sender: &str, subject: &str, date_str: &str) -> bool {
        let rows = match self.recent_rows() {
            Ok(rows) => rows,
            Err(e) => {
                warn!("duplicate check failed: {:#}; proceeding anyway", e);
                return false;
            }
        };

        for row in &rows {
            if row.len() < 3 {
                continue;
            }
            if row[0] == sender && row[1] == subject && row[2] == date_str {
                info!("duplicate found: {} | {} | {}", subject, sender, date_str);
                return true;
            }
        }

        false
    }

    /// Read the lookback window of recent rows (skipping the header)
    fn recent_rows(&self) -> Result<Vec<Vec<String>>> {
        let range = format!("{}!A2:D{}", self.sheet_name, self.lookback_rows + 10);
        let values = self.get_values(&range)?;
        Ok(values.values.unwrap_or_default())
    }

    /// Append one email row
    ///
    /// The body is truncated to the configured limit with a trailing marker.
    /// On failure nothing is written; the caller must not mark the source
    /// message read nor advance the cursor.
    pub fn append(&self, record: &EmailRecord) -> Result<()> {
        let access_token = self.auth.access_token()?;

        let range = format!("{}!A:D", self.sheet_name);
        let url = self.values_url(
            &range,
            ":append?valueInputOption=RAW&insertDataOption=INSERT_ROWS",
        );

        let date_str = record.date_string();
        let body = ValueRange {
            values: Some(vec![vec![
                record.sender.clone(),
                record.subject.clone(),
                date_str.clone(),
                truncate_body(&record.body, self.max_body_chars),
            ]]),
            ..Default::default()
        };

        let mut response = ureq::post(&url)
            .header("Authorization", &format!("Bearer {}", access_token))
            .send_json(&body)
            .context("Failed to append row")?;

        let appended: AppendResponse = response
            .body_mut()
            .read_json()
            .context("Failed to parse append response")?;

        let rows = appended
            .updates
            .and_then(|u| u.updated_rows)
            .unwrap_or_default();
        debug!("append wrote {} row(s)", rows);

        info!("added: {} | {} | {}", date_str, record.sender, record.subject);
        Ok(())
    }
}

impl RowSink for SheetsClient {
    fn ensure_header(&self) -> Result<()> {
        SheetsClient::ensure_header(self)
    }

    fn is_duplicate(&self, sender: &str, subject: &str, date_str: &str) -> bool {
        SheetsClient::is_duplicate(self, sender, subject, date_str)
    }

    fn append_row(&self, record: &EmailRecord) -> Result<()> {
        SheetsClient::append(self, record)
    }
}
