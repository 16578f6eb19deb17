//! Configuration loading for mail services
//!
//! Two pieces of configuration live in the maillog config directory:
//! - `google-credentials.json`: OAuth client credentials in the Google
//!   Cloud Console format (input, never generated)
//! - `settings.json`: optional overrides for the sync run (spreadsheet id,
//!   sheet name, query base, lookback window, body limit)

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Credentials filename in the maillog config directory
const CREDENTIALS_FILE: &str = "google-credentials.json";

/// Settings filename in the maillog config directory
const SETTINGS_FILE: &str = "settings.json";

/// OAuth token cache filename
const TOKEN_FILE: &str = "google-tokens.json";

/// Sync cursor state filename
const STATE_FILE: &str = "sync-state.json";

/// Path of the OAuth token cache (~/.config/maillog/google-tokens.json)
pub fn token_path() -> Option<PathBuf> {
    config::config_path(TOKEN_FILE)
}

/// Path of the sync cursor file (~/.config/maillog/sync-state.json)
pub fn state_path() -> Option<PathBuf> {
    config::config_path(STATE_FILE)
}

/// OAuth credentials for Google API access
#[derive(Debug, Clone)]
pub struct GoogleCredentials {
    pub client_id: String,
    pub client_secret: String,
}

/// Google Cloud Console credential file format (installed app)
#[derive(Deserialize)]
struct GoogleCredentialFile {
    installed: Option<InstalledCredentials>,
    web: Option<InstalledCredentials>,
}

#[derive(Deserialize)]
struct InstalledCredentials {
    client_id: String,
    client_secret: String,
}

impl GoogleCredentials {
    /// Load credentials using the following priority:
    /// 1. JSON file (~/.config/maillog/google-credentials.json)
    /// 2. Runtime environment variables
    pub fn load() -> Result<Self> {
        if config::config_exists(CREDENTIALS_FILE) {
            let creds: GoogleCredentialFile = config::load_json(CREDENTIALS_FILE)?;
            return Self::from_credential_file(creds);
        }

        Self::from_env()
    }

    /// Load credentials from a specific JSON file
    pub fn from_file(path: &Path) -> Result<Self> {
        let creds: GoogleCredentialFile = config::load_json_file(path)?;
        Self::from_credential_file(creds)
    }

    /// Parse credentials from a JSON string (Google Cloud Console format)
    pub fn from_json(json: &str) -> Result<Self> {
        let creds: GoogleCredentialFile =
            serde_json::from_str(json).context("Failed to parse credentials JSON")?;
        Self::from_credential_file(creds)
    }

    /// Load credentials from environment variables
    pub fn from_env() -> Result<Self> {
        let client_id = std::env::var("GOOGLE_CLIENT_ID")
            .context("GOOGLE_CLIENT_ID environment variable not set")?;
        let client_secret = std::env::var("GOOGLE_CLIENT_SECRET")
            .context("GOOGLE_CLIENT_SECRET environment variable not set")?;

        Ok(Self {
            client_id,
            client_secret,
        })
    }

    /// Parse credentials from a GoogleCredentialFile
    fn from_credential_file(creds: GoogleCredentialFile) -> Result<Self> {
        // Support both "installed" (desktop) and "web" credential types
        let installed = creds
            .installed
            .or(creds.web)
            .context("Credentials file missing 'installed' or 'web' section")?;

        Ok(Self {
            client_id: installed.client_id,
            client_secret: installed.client_secret,
        })
    }
}

/// Settings for one sync run
///
/// Every field has a default; only `spreadsheet_id` must be provided, either
/// in `settings.json` or programmatically.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SyncSettings {
    /// Target spreadsheet identifier (required)
    pub spreadsheet_id: String,
    /// Sheet (tab) name inside the spreadsheet
    pub sheet_name: String,
    /// Base Gmail query; the time bound is appended per run
    pub query_base: String,
    /// Recent-row window scanned for duplicates
    pub lookback_rows: usize,
    /// Body length limit (characters) applied on append
    pub max_body_chars: usize,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            spreadsheet_id: String::new(),
            sheet_name: "Emails".to_string(),
            query_base: "in:inbox is:unread".to_string(),
            lookback_rows: 100,
            max_body_chars: 30_000,
        }
    }
}

impl SyncSettings {
    /// Load settings from ~/.config/maillog/settings.json, falling back to
    /// defaults when the file is absent
    pub fn load() -> Result<Self> {
        if config::config_exists(SETTINGS_FILE) {
            return config::load_json(SETTINGS_FILE);
        }
        Ok(Self::default())
    }

    /// Check that required fields are present
    pub fn validate(&self) -> Result<()> {
        anyhow::ensure!(
            !self.spreadsheet_id.is_empty(),
            "spreadsheet_id is not set; add it to {}",
            config::config_path(SETTINGS_FILE)
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| SETTINGS_FILE.to_string())
        );
        Ok(())
    }
}
