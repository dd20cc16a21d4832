//! OAuth2 bearer tokens for the Google APIs.
//!
//! The stored token file carries the refresh token obtained during the
//! one-time interactive consent (performed outside this process). Access
//! tokens are refreshed lazily when missing or within a minute of expiry,
//! and the file is rewritten after each refresh.

use super::{VaultError, VaultResult};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tokio::sync::Mutex;

const TOKEN_ENDPOINT: &str = "https://oauth2.googleapis.com/token";

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
struct StoredToken {
    #[serde(default)]
    access_token: String,
    refresh_token: Option<String>,
    expires_at: Option<DateTime<Utc>>,
}

#[derive(Deserialize)]
struct RefreshResponse {
    access_token: String,
    expires_in: i64,
}

pub struct TokenSource {
    http: reqwest::Client,
    client_id: String,
    client_secret: String,
    token_path: PathBuf,
    state: Mutex<StoredToken>,
}

impl TokenSource {
    pub fn new(
        http: reqwest::Client,
        client_id: &str,
        client_secret: &str,
        token_path: &str,
    ) -> VaultResult<Self> {
        let path = PathBuf::from(token_path);
        let state = match std::fs::read_to_string(&path) {
            Ok(raw) => serde_json::from_str(&raw).map_err(|e| {
                VaultError::Auth(format!("token file {} is malformed: {}", path.display(), e))
            })?,
            Err(_) => StoredToken::default(),
        };
        Ok(TokenSource {
            http,
            client_id: client_id.to_string(),
            client_secret: client_secret.to_string(),
            token_path: path,
            state: Mutex::new(state),
        })
    }

    /// Current access token, refreshing through the token endpoint if the
    /// stored one is missing or about to expire.
    pub async fn access_token(&self) -> VaultResult<String> {
        let mut state = self.state.lock().await;

        let fresh_enough = !state.access_token.is_empty()
            && state
                .expires_at
                .map(|t| t - Duration::seconds(60) > Utc::now())
                .unwrap_or(false);
        if fresh_enough {
            return Ok(state.access_token.clone());
        }

        let refresh_token = state.refresh_token.clone().ok_or_else(|| {
            VaultError::Auth(format!(
                "no refresh token in {}; run the one-time Google consent flow first",
                self.token_path.display()
            ))
        })?;

        log::debug!("Refreshing Google access token");
        let resp = self
            .http
            .post(TOKEN_ENDPOINT)
            .form(&[
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("refresh_token", refresh_token.as_str()),
                ("grant_type", "refresh_token"),
            ])
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(VaultError::Auth(format!(
                "token refresh failed: {} - {}",
                status, body
            )));
        }

        let refreshed: RefreshResponse = resp.json().await?;
        state.access_token = refreshed.access_token.clone();
        state.expires_at = Some(Utc::now() + Duration::seconds(refreshed.expires_in));

        // Best-effort rewrite; a failed write just means another refresh later
        if let Some(parent) = self.token_path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }
        match serde_json::to_string_pretty(&*state) {
            Ok(json) => {
                if let Err(e) = std::fs::write(&self.token_path, json) {
                    log::warn!(
                        "Failed to persist refreshed token to {}: {}",
                        self.token_path.display(),
                        e
                    );
                }
            }
            Err(e) => log::warn!("Failed to serialize refreshed token: {}", e),
        }

        Ok(refreshed.access_token)
    }
}
