//! Google Photos backend: one album per channel.
//!
//! The Photos API rejects concurrent writes against one album with quota
//! errors, so the default policy is strictly serial with a pause between
//! uploads. Uploading is two-step: raw bytes buy an upload token, then
//! `mediaItems:batchCreate` attaches the item to the album.

use super::auth::TokenSource;
use super::{MediaStore, UploadPolicy, VaultError, VaultResult};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

const API_BASE: &str = "https://photoslibrary.googleapis.com/v1";

/// Photos API hard limit per media item.
const MAX_UPLOAD_BYTES: usize = 200 * 1024 * 1024;

pub struct PhotosVault {
    http: reqwest::Client,
    tokens: TokenSource,
    width: usize,
    pause: Duration,
}

#[derive(Deserialize)]
struct AlbumList {
    #[serde(default)]
    albums: Vec<Album>,
}

#[derive(Deserialize)]
struct Album {
    id: String,
    #[serde(default)]
    title: String,
}

#[derive(Deserialize)]
struct BatchCreateResponse {
    #[serde(rename = "newMediaItemResults", default)]
    results: Vec<MediaItemResult>,
}

#[derive(Deserialize)]
struct MediaItemResult {
    status: Option<ItemStatus>,
    #[serde(rename = "mediaItem")]
    media_item: Option<MediaItem>,
}

#[derive(Deserialize)]
struct ItemStatus {
    #[serde(default)]
    message: String,
}

#[derive(Deserialize)]
struct MediaItem {
    #[serde(rename = "productUrl")]
    product_url: Option<String>,
}

impl PhotosVault {
    pub fn new(
        http: reqwest::Client,
        tokens: TokenSource,
        width_override: usize,
        pause_override: Option<Duration>,
    ) -> Self {
        PhotosVault {
            http,
            tokens,
            width: if width_override > 0 { width_override } else { 1 },
            pause: pause_override.unwrap_or(Duration::from_millis(500)),
        }
    }

    async fn bearer(&self) -> VaultResult<String> {
        self.tokens.access_token().await
    }

    async fn api_error(resp: reqwest::Response) -> VaultError {
        let status = resp.status();
        let body = resp.text().await.unwrap_or_default();
        if status == reqwest::StatusCode::UNAUTHORIZED {
            return VaultError::Auth(format!("{} - {}", status, body));
        }
        VaultError::Api(format!("{} - {}", status, body))
    }

    /// Album-referencing calls: 400/403/404 on the album id all mean the
    /// cached id should be considered gone.
    fn is_stale_album(status: reqwest::StatusCode) -> bool {
        matches!(
            status,
            reqwest::StatusCode::BAD_REQUEST
                | reqwest::StatusCode::FORBIDDEN
                | reqwest::StatusCode::NOT_FOUND
        )
    }
}

#[async_trait]
impl MediaStore for PhotosVault {
    fn name(&self) -> &'static str {
        "Google Photos"
    }

    fn upload_policy(&self) -> UploadPolicy {
        UploadPolicy {
            width: self.width,
            pause: self.pause,
        }
    }

    async fn find_by_name(&self, name: &str) -> VaultResult<Option<String>> {
        let token = self.bearer().await?;
        let resp = self
            .http
            .get(format!("{}/albums", API_BASE))
            .bearer_auth(&token)
            .query(&[("pageSize", "50")])
            .send()
            .await?;

        if resp.status() == reqwest::StatusCode::FORBIDDEN {
            // The append-only scope cannot list albums
            log::warn!("Photos album listing forbidden; skipping search for \"{}\"", name);
            return Ok(None);
        }
        if !resp.status().is_success() {
            return Err(Self::api_error(resp).await);
        }

        let list: AlbumList = resp.json().await?;
        Ok(list.albums.into_iter().find(|a| a.title == name).map(|a| a.id))
    }

    async fn create(&self, name: &str) -> VaultResult<String> {
        let token = self.bearer().await?;
        let resp = self
            .http
            .post(format!("{}/albums", API_BASE))
            .bearer_auth(&token)
            .json(&json!({ "album": { "title": name } }))
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(Self::api_error(resp).await);
        }
        let album: Album = resp.json().await?;
        log::info!("Created Photos album \"{}\" ({})", name, album.id);
        Ok(album.id)
    }

    async fn upload(
        &self,
        bytes: &[u8],
        file_name: &str,
        container_id: &str,
        mime_type: &str,
    ) -> VaultResult<String> {
        if bytes.is_empty() {
            return Err(VaultError::Api("empty media buffer".to_string()));
        }
        if bytes.len() > MAX_UPLOAD_BYTES {
            return Err(VaultError::TooLarge {
                size: bytes.len(),
                max: MAX_UPLOAD_BYTES,
            });
        }

        let token = self.bearer().await?;

        // Step 1: raw bytes buy an upload token
        let resp = self
            .http
            .post(format!("{}/uploads", API_BASE))
            .bearer_auth(&token)
            .header("Content-Type", "application/octet-stream")
            .header("X-Goog-Upload-Content-Type", mime_type)
            .header("X-Goog-Upload-Protocol", "raw")
            .body(bytes.to_vec())
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(Self::api_error(resp).await);
        }
        let upload_token = resp.text().await?;

        // Step 2: attach the item to the album
        let resp = self
            .http
            .post(format!("{}/mediaItems:batchCreate", API_BASE))
            .bearer_auth(&token)
            .json(&json!({
                "albumId": container_id,
                "newMediaItems": [{
                    "description": file_name,
                    "simpleMediaItem": {
                        "fileName": file_name,
                        "uploadToken": upload_token,
                    }
                }]
            }))
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            if Self::is_stale_album(status) {
                let body = resp.text().await.unwrap_or_default();
                log::warn!("Album {} rejected ({}): {}", container_id, status, body);
                return Err(VaultError::ContainerNotFound(container_id.to_string()));
            }
            return Err(Self::api_error(resp).await);
        }

        let created: BatchCreateResponse = resp.json().await?;
        let result = created
            .results
            .into_iter()
            .next()
            .ok_or_else(|| VaultError::Api("empty batchCreate response".to_string()))?;

        if let Some(item_status) = &result.status {
            if item_status.message != "Success" && item_status.message != "OK" {
                return Err(VaultError::Api(format!(
                    "media item rejected: {}",
                    item_status.message
                )));
            }
        }

        result
            .media_item
            .and_then(|m| m.product_url)
            .ok_or_else(|| VaultError::Api("no product URL in upload response".to_string()))
    }

    async fn verify(&self) -> VaultResult<String> {
        let token = self.bearer().await?;
        let resp = self
            .http
            .get("https://www.googleapis.com/oauth2/v2/userinfo")
            .bearer_auth(&token)
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(Self::api_error(resp).await);
        }
        let info: serde_json::Value = resp.json().await?;
        let email = info
            .get("email")
            .and_then(|v| v.as_str())
            .unwrap_or("unknown account");
        Ok(format!("Photos access as {}", email))
    }
}
