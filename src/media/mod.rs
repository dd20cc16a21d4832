//! Media extraction and classification helpers.
//!
//! `extract_media` is the one pure entry point the pipeline flattens messages
//! through; the rest derives upload metadata (file name, MIME type) from the
//! media URL.

use crate::chat::MessageRecord;
use crate::error::OpErrorContext;
use anyhow::Result;
use chrono::{DateTime, Utc};

/// Extract every qualifying media URL from a message, in order.
///
/// Attachments come first (content type starting with `image/` or `video/`),
/// then per embed: image, thumbnail, video. Identical URLs are not
/// de-duplicated; callers receive every qualifying entry.
pub fn extract_media(message: &MessageRecord) -> Vec<String> {
    let mut urls = Vec::new();

    for attachment in &message.attachments {
        if let Some(ct) = &attachment.content_type {
            if ct.starts_with("image/") || ct.starts_with("video/") {
                urls.push(attachment.url.clone());
            }
        }
    }

    for embed in &message.embeds {
        if let Some(url) = &embed.image_url {
            urls.push(url.clone());
        }
        if let Some(url) = &embed.thumbnail_url {
            urls.push(url.clone());
        }
        if let Some(url) = &embed.video_url {
            urls.push(url.clone());
        }
    }

    urls
}

/// File extension from a URL path, lowercased, including the dot.
/// Query strings and fragments are ignored.
fn extension_from_url(url: &str) -> Option<String> {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    let file = path.rsplit('/').next().unwrap_or(path);
    let dot = file.rfind('.')?;
    // A leading dot or a trailing dot is not an extension
    if dot == 0 || dot == file.len() - 1 {
        return None;
    }
    Some(file[dot..].to_ascii_lowercase())
}

/// Destination file name: `<messageId>_<index>_<timestamp><ext>`.
///
/// The timestamp keeps re-uploads of the same source distinguishable in the
/// destination container; colons and dots are not safe in every backend, so
/// they become dashes. Undetected extensions default to `.jpg`.
pub fn file_name_for(message_id: &str, index: usize, now: DateTime<Utc>, url: &str) -> String {
    let extension = extension_from_url(url).unwrap_or_else(|| ".jpg".to_string());
    let stamp = now.to_rfc3339().replace([':', '.'], "-");
    format!("{}_{}_{}{}", message_id, index, stamp, extension)
}

/// MIME type from the URL's file extension. Unrecognized extensions default
/// to `image/jpeg`, the most common case on the platform.
pub fn mime_type_for(url: &str) -> &'static str {
    match extension_from_url(url).as_deref() {
        Some(".jpg") | Some(".jpeg") => "image/jpeg",
        Some(".png") => "image/png",
        Some(".gif") => "image/gif",
        Some(".webp") => "image/webp",
        Some(".bmp") => "image/bmp",
        Some(".mp4") => "video/mp4",
        Some(".mov") => "video/quicktime",
        Some(".webm") => "video/webm",
        _ => "image/jpeg",
    }
}

/// Fetches raw media bytes from a URL. A trait seam so the pipeline can be
/// exercised without a network; the orchestrator treats a fetch failure as a
/// per-task failure, never a batch failure.
#[async_trait::async_trait]
pub trait MediaFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>>;
}

pub struct HttpFetcher {
    http: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(http: reqwest::Client) -> Self {
        HttpFetcher { http }
    }
}

#[async_trait::async_trait]
impl MediaFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        let resp = self
            .http
            .get(url)
            .send()
            .await
            .context_download(url)?
            .error_for_status()
            .context_download(url)?;
        let bytes = resp.bytes().await.context_download(url)?;
        Ok(bytes.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::{AttachmentRecord, EmbedRecord};

    fn msg(attachments: Vec<AttachmentRecord>, embeds: Vec<EmbedRecord>) -> MessageRecord {
        MessageRecord {
            id: "m1".into(),
            channel_id: "c1".into(),
            timestamp: Utc::now(),
            author_is_bot: false,
            attachments,
            embeds,
        }
    }

    #[test]
    fn attachments_before_embeds_and_embed_field_order() {
        let m = msg(
            vec![
                AttachmentRecord {
                    url: "https://cdn.example/a.png".into(),
                    content_type: Some("image/png".into()),
                },
                AttachmentRecord {
                    url: "https://cdn.example/clip.mp4".into(),
                    content_type: Some("video/mp4".into()),
                },
                AttachmentRecord {
                    url: "https://cdn.example/notes.txt".into(),
                    content_type: Some("text/plain".into()),
                },
                AttachmentRecord {
                    url: "https://cdn.example/unknown.bin".into(),
                    content_type: None,
                },
            ],
            vec![EmbedRecord {
                image_url: Some("https://cdn.example/e-img.jpg".into()),
                thumbnail_url: Some("https://cdn.example/e-thumb.jpg".into()),
                video_url: Some("https://cdn.example/e-vid.mp4".into()),
            }],
        );

        assert_eq!(
            extract_media(&m),
            vec![
                "https://cdn.example/a.png",
                "https://cdn.example/clip.mp4",
                "https://cdn.example/e-img.jpg",
                "https://cdn.example/e-thumb.jpg",
                "https://cdn.example/e-vid.mp4",
            ]
        );
    }

    #[test]
    fn no_media_yields_empty() {
        let m = msg(vec![], vec![EmbedRecord::default()]);
        assert!(extract_media(&m).is_empty());
    }

    #[test]
    fn duplicate_urls_are_kept() {
        let m = msg(
            vec![
                AttachmentRecord {
                    url: "https://cdn.example/same.png".into(),
                    content_type: Some("image/png".into()),
                },
                AttachmentRecord {
                    url: "https://cdn.example/same.png".into(),
                    content_type: Some("image/png".into()),
                },
            ],
            vec![],
        );
        assert_eq!(extract_media(&m).len(), 2);
    }

    #[test]
    fn mime_table() {
        assert_eq!(mime_type_for("https://x/a.PNG"), "image/png");
        assert_eq!(mime_type_for("https://x/a.jpeg?width=640"), "image/jpeg");
        assert_eq!(mime_type_for("https://x/a.webm"), "video/webm");
        assert_eq!(mime_type_for("https://x/a.xyz"), "image/jpeg");
        assert_eq!(mime_type_for("https://x/noext"), "image/jpeg");
    }

    #[test]
    fn file_name_derivation() {
        let now = "2024-05-01T10:30:00Z".parse::<DateTime<Utc>>().unwrap();
        let name = file_name_for("123", 0, now, "https://cdn.example/pic.png?ex=1");
        assert!(name.starts_with("123_0_"));
        assert!(name.ends_with(".png"));
        assert!(!name.contains(':'));

        let fallback = file_name_for("123", 2, now, "https://cdn.example/raw");
        assert!(fallback.ends_with(".jpg"));
    }
}
