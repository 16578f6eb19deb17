//! Gmail message decoding
//!
//! Converts one Gmail API message into a flat [`EmailRecord`]. Decoding is
//! total: every branch has a terminal fallback, so a single malformed
//! message can never abort a run. The signature carries no error channel.

use base64::prelude::*;
use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};

use super::api::{GmailMessage, MessagePart, MessagePayload};
use crate::models::{EmailRecord, SHEET_DATE_FORMAT};

/// Sender fallback when the From header is absent
pub const UNKNOWN_SENDER: &str = "Unknown Sender";

/// Subject fallback when the Subject header is absent or blank
pub const NO_SUBJECT: &str = "(No Subject)";

/// Body fallback when no readable part exists
pub const NO_CONTENT: &str = "(No readable body content)";

/// Column width used when flattening HTML bodies to text
const HTML_WRAP_COLS: usize = 80;

/// Decode a Gmail API message into an [`EmailRecord`]
///
/// Never fails: missing or malformed headers and bodies map to the
/// documented fallback values, and an unparseable Date header maps to the
/// current time.
pub fn decode_message(message: &GmailMessage) -> EmailRecord {
    let payload = message.payload.as_ref();

    let sender = payload
        .and_then(|p| extract_header(p, "From"))
        .map(|v| sender_address(&v))
        .unwrap_or_else(|| UNKNOWN_SENDER.to_string());

    let subject = payload
        .and_then(|p| extract_header(p, "Subject"))
        .map(|v| decode_encoded_words(&v))
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| NO_SUBJECT.to_string());

    let received_at = payload
        .and_then(|p| extract_header(p, "Date"))
        .and_then(|v| parse_date(&v))
        .unwrap_or_else(Utc::now);

    let body = payload
        .and_then(extract_body)
        .unwrap_or_else(|| NO_CONTENT.to_string());

    EmailRecord {
        sender,
        subject,
        received_at,
        body,
    }
}

/// Extract a header value by name (case-insensitive)
fn extract_header(payload: &MessagePayload, name: &str) -> Option<String> {
    payload.headers.as_ref()?.iter().find_map(|h| {
        if h.name.eq_ignore_ascii_case(name) {
            Some(h.value.clone())
        } else {
            None
        }
    })
}

/// Reduce a From header to the bare address
///
/// "Name <addr>" yields the bracketed addr; anything else is returned
/// trimmed as-is.
fn sender_address(value: &str) -> String {
    if let Some(start) = value.find('<') {
        let rest = &value[start + 1..];
        if let Some(end) = rest.find('>') {
            return rest[..end].trim().to_string();
        }
    }
    value.trim().to_string()
}

/// Decode RFC 2047 encoded words in a header value
///
/// mailparse expects a full "Key: value" header line, so one is synthesized
/// around the raw value.
fn decode_encoded_words(raw: &str) -> String {
    let mut line = b"Subject: ".to_vec();
    line.extend_from_slice(raw.as_bytes());
    line.extend_from_slice(b"\r\n");

    match mailparse::parse_header(&line) {
        Ok((header, _)) => header.get_value(),
        Err(_) => raw.to_string(),
    }
}

/// Parse a free-form Date header
///
/// Tries RFC 2822 (with Gmail's trailing "(UTC)"-style comment stripped),
/// then RFC 3339, then the sheet date format itself.
fn parse_date(value: &str) -> Option<DateTime<Utc>> {
    let trimmed = match value.find(" (") {
        Some(idx) => value[..idx].trim(),
        None => value.trim(),
    };

    if let Ok(dt) = DateTime::parse_from_rfc2822(trimmed) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, SHEET_DATE_FORMAT) {
        return Some(Utc.from_utc_datetime(&naive));
    }

    None
}

/// Extract the best-effort plain-text body from a message payload
fn extract_body(payload: &MessagePayload) -> Option<String> {
    if let Some(parts) = &payload.parts {
        return find_text_in_parts(parts);
    }

    // Flat non-multipart payload
    if let Some(body) = &payload.body
        && let Some(data) = &body.data
    {
        let text = decode_base64_body(data)?;
        if payload
            .mime_type
            .as_ref()
            .is_some_and(|m| m.starts_with("text/html"))
        {
            return Some(html_to_text(&text));
        }
        return Some(text);
    }

    None
}

/// Search message parts for readable text
///
/// Preference order: first text/plain part, else first text/html part
/// converted to text, else recurse into nested multiparts.
fn find_text_in_parts(parts: &[MessagePart]) -> Option<String> {
    for part in parts {
        if part
            .mime_type
            .as_ref()
            .is_some_and(|m| m.starts_with("text/plain"))
            && let Some(body) = &part.body
            && let Some(data) = &body.data
            && let Some(text) = decode_base64_body(data)
        {
            return Some(text);
        }
    }

    for part in parts {
        if part
            .mime_type
            .as_ref()
            .is_some_and(|m| m.starts_with("text/html"))
            && let Some(body) = &part.body
            && let Some(data) = &body.data
            && let Some(html) = decode_base64_body(data)
        {
            return Some(html_to_text(&html));
        }
    }

    for part in parts {
        if let Some(nested) = &part.parts
            && let Some(text) = find_text_in_parts(nested)
        {
            return Some(text);
        }
    }

    None
}

/// Convert an HTML body to plain text, block text joined with newlines
fn html_to_text(html: &str) -> String {
    html2text::from_read(html.as_bytes(), HTML_WRAP_COLS).unwrap_or_else(|_| html.to_string())
}

/// Decode base64-encoded body data
///
/// Gmail uses URL-safe base64 but padding can vary, so multiple decoders
/// are tried in order.
fn decode_base64_body(data: &str) -> Option<String> {
    use base64::engine::general_purpose::{STANDARD, STANDARD_NO_PAD, URL_SAFE};

    let decoders: &[&base64::engine::GeneralPurpose] =
        &[&BASE64_URL_SAFE_NO_PAD, &URL_SAFE, &STANDARD, &STANDARD_NO_PAD];

    for decoder in decoders {
        if let Ok(decoded) = decoder.decode(data) {
            if let Ok(s) = String::from_utf8(decoded) {
                return Some(s);
            }
        }
    }

    None
}
