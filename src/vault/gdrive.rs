//! Google Drive v3 backend: one folder per channel.
//!
//! Drive tolerates a few requests in flight, so the default policy fans out
//! three uploads per batch. A 404 on the parent folder during upload is the
//! stale-container signal the resolver heals from.

use super::auth::TokenSource;
use super::{MediaStore, UploadPolicy, VaultError, VaultResult};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

const API_BASE: &str = "https://www.googleapis.com/drive/v3";
const UPLOAD_BASE: &str = "https://www.googleapis.com/upload/drive/v3";
const FOLDER_MIME: &str = "application/vnd.google-apps.folder";

pub struct DriveVault {
    http: reqwest::Client,
    tokens: TokenSource,
    /// Optional parent folder all channel folders live under.
    root: Option<String>,
    width: usize,
    pause: Duration,
}

#[derive(Deserialize)]
struct FileList {
    #[serde(default)]
    files: Vec<FileRef>,
}

#[derive(Deserialize)]
struct FileRef {
    id: String,
}

#[derive(Deserialize)]
struct CreatedFile {
    id: String,
    #[serde(rename = "webViewLink")]
    web_view_link: Option<String>,
}

#[derive(Deserialize)]
struct AboutResponse {
    user: AboutUser,
}

#[derive(Deserialize)]
struct AboutUser {
    #[serde(rename = "emailAddress")]
    email_address: String,
}

/// Quote a value for a Drive `q` query expression.
fn escape_query(value: &str) -> String {
    value.replace('\\', "\\\\").replace('\'', "\\'")
}

impl DriveVault {
    pub fn new(
        http: reqwest::Client,
        tokens: TokenSource,
        root: Option<String>,
        width_override: usize,
        pause_override: Option<Duration>,
    ) -> Self {
        DriveVault {
            http,
            tokens,
            root,
            width: if width_override > 0 { width_override } else { 3 },
            pause: pause_override.unwrap_or(Duration::ZERO),
        }
    }

    async fn bearer(&self) -> VaultResult<String> {
        self.tokens.access_token().await
    }

    /// Map an error response body onto the structured error space.
    /// 404 while referencing a container id means the folder is gone.
    async fn api_error(resp: reqwest::Response, container: Option<&str>) -> VaultError {
        let status = resp.status();
        let body = resp.text().await.unwrap_or_default();
        if status == reqwest::StatusCode::NOT_FOUND {
            if let Some(id) = container {
                return VaultError::ContainerNotFound(id.to_string());
            }
        }
        if status == reqwest::StatusCode::UNAUTHORIZED {
            return VaultError::Auth(format!("{} - {}", status, body));
        }
        VaultError::Api(format!("{} - {}", status, body))
    }
}

#[async_trait]
impl MediaStore for DriveVault {
    fn name(&self) -> &'static str {
        "Google Drive"
    }

    fn upload_policy(&self) -> UploadPolicy {
        UploadPolicy {
            width: self.width,
            pause: self.pause,
        }
    }

    async fn find_by_name(&self, name: &str) -> VaultResult<Option<String>> {
        let token = self.bearer().await?;
        let mut query = format!(
            "name='{}' and mimeType='{}' and trashed=false",
            escape_query(name),
            FOLDER_MIME
        );
        if let Some(root) = &self.root {
            query.push_str(&format!(" and '{}' in parents", escape_query(root)));
        }

        let resp = self
            .http
            .get(format!("{}/files", API_BASE))
            .bearer_auth(&token)
            .query(&[("q", query.as_str()), ("fields", "files(id, name)"), ("spaces", "drive")])
            .send()
            .await?;

        if resp.status() == reqwest::StatusCode::FORBIDDEN {
            // Listing scope missing; callers fall through to creation
            log::warn!("Drive listing forbidden; skipping folder search for \"{}\"", name);
            return Ok(None);
        }
        if !resp.status().is_success() {
            return Err(Self::api_error(resp, None).await);
        }

        let list: FileList = resp.json().await?;
        Ok(list.files.into_iter().next().map(|f| f.id))
    }

    async fn create(&self, name: &str) -> VaultResult<String> {
        let token = self.bearer().await?;
        let mut metadata = json!({
            "name": name,
            "mimeType": FOLDER_MIME,
        });
        if let Some(root) = &self.root {
            metadata["parents"] = json!([root]);
        }

        let resp = self
            .http
            .post(format!("{}/files", API_BASE))
            .bearer_auth(&token)
            .query(&[("fields", "id")])
            .json(&metadata)
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(Self::api_error(resp, self.root.as_deref()).await);
        }
        let created: CreatedFile = resp.json().await?;
        log::info!("Created Drive folder \"{}\" ({})", name, created.id);
        Ok(created.id)
    }

    async fn upload(
        &self,
        bytes: &[u8],
        file_name: &str,
        container_id: &str,
        mime_type: &str,
    ) -> VaultResult<String> {
        let token = self.bearer().await?;
        let metadata = json!({
            "name": file_name,
            "parents": [container_id],
        });

        // multipart/related body: JSON metadata part, then the media part
        let boundary = "chanvault_upload_boundary";
        let mut body = Vec::with_capacity(bytes.len() + 512);
        body.extend_from_slice(
            format!(
                "--{b}\r\nContent-Type: application/json; charset=UTF-8\r\n\r\n{meta}\r\n--{b}\r\nContent-Type: {mime}\r\n\r\n",
                b = boundary,
                meta = metadata,
                mime = mime_type
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(format!("\r\n--{}--", boundary).as_bytes());

        let resp = self
            .http
            .post(format!("{}/files", UPLOAD_BASE))
            .bearer_auth(&token)
            .query(&[("uploadType", "multipart"), ("fields", "id, webViewLink")])
            .header(
                "Content-Type",
                format!("multipart/related; boundary={}", boundary),
            )
            .body(body)
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(Self::api_error(resp, Some(container_id)).await);
        }
        let created: CreatedFile = resp.json().await?;
        Ok(created.web_view_link.unwrap_or(created.id))
    }

    async fn verify(&self) -> VaultResult<String> {
        let token = self.bearer().await?;
        let resp = self
            .http
            .get(format!("{}/about", API_BASE))
            .bearer_auth(&token)
            .query(&[("fields", "user(emailAddress)")])
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(Self::api_error(resp, None).await);
        }
        let about: AboutResponse = resp.json().await?;
        Ok(format!("Drive access as {}", about.user.email_address))
    }
}
