//! maillog: log unread Gmail messages to a Google Sheet
//!
//! Single entry point, no flags: runs one full sync pass and exits.

use anyhow::{Context, Result};
use log::info;

use mail::{
    CursorStore, GmailClient, GoogleAuth, GoogleCredentials, SheetsClient, SyncSettings, run_sync,
};

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    info!("starting mail-to-sheet sync");

    config::ensure_config_dir().context("Could not prepare the config directory")?;

    let settings = SyncSettings::load()?;
    settings.validate()?;

    // A working credential is required; failure here aborts the run.
    let credentials =
        GoogleCredentials::load().context("Google OAuth client credentials are required")?;
    let token_path = mail::config::token_path().context("Could not determine token path")?;
    let auth = GoogleAuth::new(&credentials, token_path);
    auth.authenticate().context("Google authorization failed")?;

    let gmail = GmailClient::new(auth.clone(), &settings);
    let sheets = SheetsClient::new(auth, &settings);
    let state_path = mail::config::state_path().context("Could not determine state path")?;
    let cursor = CursorStore::new(state_path);

    let stats = run_sync(&gmail, &sheets, &cursor)?;

    info!(
        "sync complete: {} fetched, {} appended, {} duplicates, {} failures in {} ms",
        stats.fetched, stats.appended, stats.duplicates, stats.failures, stats.duration_ms
    );
    Ok(())
}
