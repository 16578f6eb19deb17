//! Gmail API HTTP client
//!
//! Lists unread messages matching the configured query, fetches each in
//! full, and marks messages read by removing the UNREAD label.
//! Uses synchronous HTTP (ureq); each call blocks the run.

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use log::{debug, warn};

use super::api::{GmailMessage, ListMessagesResponse, ModifyMessageRequest};
use crate::auth::GoogleAuth;
use crate::config::SyncSettings;
use crate::models::MessageId;
use crate::sync::MessageSource;

/// Compute the epoch-seconds `after:` bound for the unread query
///
/// With a cursor, the bound is the cursor's own instant; without one, the
/// window defaults to the 7 days before `now`.
pub fn after_bound(cursor: Option<DateTime<Utc>>, now: DateTime<Utc>) -> i64 {
    match cursor {
        Some(ts) => ts.timestamp(),
        None => (now - Duration::days(7)).timestamp(),
    }
}

/// Gmail API client for fetching unread messages
pub struct GmailClient {
    auth: GoogleAuth,
    query_base: String,
}

impl GmailClient {
    /// Gmail API base URL
    const BASE_URL: &'static str = "https://gmail.googleapis.com/gmail/v1";

    /// Create a new Gmail client
    pub fn new(auth: GoogleAuth, settings: &SyncSettings) -> Self {
        Self {
            auth,
            query_base: settings.query_base.clone(),
        }
    }

    /// Fetch all unread messages newer than the cursor
    ///
    /// Fail-open: any remote error during the fetch step is logged and the
    /// whole step yields an empty list. Callers must tolerate
    /// under-delivery; unread messages resurface on the next run.
    pub fn fetch_unread(&self, after: Option<DateTime<Utc>>) -> Vec<GmailMessage> {
        match self.try_fetch_unread(after) {
            Ok(messages) => messages,
            Err(e) => {
                warn!("fetching unread messages failed: {:#}", e);
                Vec::new()
            }
        }
    }

    fn try_fetch_unread(&self, after: Option<DateTime<Utc>>) -> Result<Vec<GmailMessage>> {
        let query = format!(
            "{} after:{}",
            self.query_base,
            after_bound(after, Utc::now())
        );
        debug!("fetching messages with query: {:?}", query);

        let mut messages = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let page = self.list_messages(&query, page_token.as_deref())?;

            if let Some(refs) = page.messages {
                for msg_ref in refs {
                    messages.push(self.get_message(&MessageId::new(&msg_ref.id))?);
                }
            }

            match page.next_page_token {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        debug!("found {} unread messages", messages.len());
        Ok(messages)
    }

    /// List one page of message IDs matching the query
    fn list_messages(
        &self,
        query: &str,
        page_token: Option<&str>,
    ) -> Result<ListMessagesResponse> {
        let access_token = self.auth.access_token()?;

        let mut url = format!(
            "{}/users/me/messages?q={}",
            Self::BASE_URL,
            urlencoding::encode(query)
        );

        if let Some(token) = page_token {
            url.push_str(&format!("&pageToken={}", token));
        }

        let mut response = ureq::get(&url)
            .header("Authorization", &format!("Bearer {}", access_token))
            .call()
            .context("Failed to send list messages request")?;

        let list: ListMessagesResponse = response
            .body_mut()
            .read_json()
            .context("Failed to parse list messages response")?;

        Ok(list)
    }

    /// Get full message details (headers + body) by ID
    pub fn get_message(&self, id: &MessageId) -> Result<GmailMessage> {
        let access_token = self.auth.access_token()?;

        let url = format!(
            "{}/users/me/messages/{}?format=full",
            Self::BASE_URL,
            id.as_str()
        );

        let mut response = ureq::get(&url)
            .header("Authorization", &format!("Bearer {}", access_token))
            .call()
            .context("Failed to send get message request")?;

        let message: GmailMessage = response
            .body_mut()
            .read_json()
            .context("Failed to parse message response")?;

        Ok(message)
    }

    /// Mark a message read (remove the UNREAD label)
    pub fn mark_read(&self, id: &MessageId) -> Result<()> {
        let access_token = self.auth.access_token()?;

        let url = format!(
            "{}/users/me/messages/{}/modify",
            Self::BASE_URL,
            id.as_str()
        );

        let request = ModifyMessageRequest {
            add_label_ids: None,
            remove_label_ids: Some(vec!["UNREAD".to_string()]),
        };

        ureq::post(&url)
            .header("Authorization", &format!("Bearer {}", access_token))
            .send_json(&request)
            .context("Failed to send modify message request")?;

        debug!("marked as read: {}", id.as_str());
        Ok(())
    }
}

impl MessageSource for GmailClient {
    fn fetch_unread(&self, after: Option<DateTime<Utc>>) -> Vec<GmailMessage> {
        GmailClient::fetch_unread(self, after)
    }

    fn mark_read(&self, id: &MessageId) -> Result<()> {
        GmailClient::mark_read(self, id)
    }
}
