//! Google Sheets sink
//!
//! This module provides:
//! - Header row bootstrap for the target sheet
//! - Bounded duplicate detection over recent rows
//! - Single-row append with body truncation

mod client;

pub use client::{HEADER_ROW, SheetNotFoundError, SheetsClient, truncate_body};

/// Sheets API value types
pub mod api {
    use serde::{Deserialize, Serialize};

    /// A range of cell values (request and response body)
    #[derive(Debug, Default, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct ValueRange {
        #[serde(skip_serializing_if = "Option::is_none")]
        pub range: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        pub major_dimension: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        pub values: Option<Vec<Vec<String>>>,
    }

    /// Response from values.append
    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct AppendResponse {
        pub updates: Option<AppendUpdates>,
    }

    /// Update summary inside an append response
    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct AppendUpdates {
        pub updated_rows: Option<u32>,
    }
}
