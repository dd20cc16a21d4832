//! Process configuration read from the environment once at startup.
//!
//! A `.env` file is honored when present (loaded in `main`); every value can
//! also come from the real environment, which is what deployments use.

use anyhow::{Context, Result};
use std::time::Duration;

/// Which remote media store receives uploads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    Drive,
    Photos,
}

#[derive(Debug, Clone)]
pub struct Config {
    /// Discord bot token (`Bot ...` auth scheme).
    pub discord_token: String,
    /// Upload destination backend.
    pub backend: Backend,
    /// OAuth client id/secret for the Google APIs.
    pub oauth_client_id: String,
    pub oauth_client_secret: String,
    /// Path to the stored OAuth token JSON (refresh token + last access token).
    pub token_path: String,
    /// Optional Drive folder id that channel folders are created under.
    pub drive_root: Option<String>,
    /// Upload fan-out width override (0 = backend default).
    pub upload_width: usize,
    /// Pause between upload batches override, milliseconds (backend default if unset).
    pub upload_pause: Option<Duration>,
    /// Watch-mode poll interval.
    pub poll_interval: Duration,
}

impl Config {
    /// Read configuration from the environment. Only the values the selected
    /// command actually needs are validated here; command setup fails later
    /// with context if something required is missing remotely.
    pub fn from_env() -> Result<Self> {
        let discord_token = std::env::var("DISCORD_TOKEN")
            .context("DISCORD_TOKEN is not set. Create a bot token and export it (or put it in .env).")?;

        let backend = match std::env::var("CHANVAULT_BACKEND").as_deref() {
            Ok("photos") => Backend::Photos,
            Ok("drive") | Err(_) => Backend::Drive,
            Ok(other) => {
                anyhow::bail!("CHANVAULT_BACKEND must be \"drive\" or \"photos\", got \"{}\"", other)
            }
        };

        let oauth_client_id = std::env::var("GOOGLE_OAUTH_CLIENT_ID").unwrap_or_default();
        let oauth_client_secret = std::env::var("GOOGLE_OAUTH_CLIENT_SECRET").unwrap_or_default();
        let token_path = std::env::var("GOOGLE_TOKEN_PATH")
            .unwrap_or_else(|_| "./data/google-token.json".to_string());
        let drive_root = std::env::var("GOOGLE_DRIVE_ROOT").ok().filter(|s| !s.is_empty());

        let upload_width = std::env::var("CHANVAULT_UPLOAD_WIDTH")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(0);
        let upload_pause = std::env::var("CHANVAULT_UPLOAD_PAUSE_MS")
            .ok()
            .and_then(|s| s.parse().ok())
            .map(Duration::from_millis);
        let poll_interval = std::env::var("CHANVAULT_POLL_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .map(Duration::from_secs)
            .unwrap_or(Duration::from_secs(30));

        Ok(Config {
            discord_token,
            backend,
            oauth_client_id,
            oauth_client_secret,
            token_path,
            drive_root,
            upload_width,
            upload_pause,
            poll_interval,
        })
    }
}
