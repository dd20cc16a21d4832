//! Discord REST v10 adapter.
//!
//! Speaks the plain HTTP API with a bot token; no gateway connection and no
//! SDK. Message pages come back newest-first, which is exactly what the
//! history collector paginates on.

use super::{AttachmentRecord, ChannelInfo, ChannelSource, EmbedRecord, MessageRecord};
use crate::error::OpErrorContext;
use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;

const API_BASE: &str = "https://discord.com/api/v10";
const USER_AGENT: &str = "DiscordBot (https://github.com/chanvault/chanvault, 0.2)";

/// Guild text channel type in the Discord channel object.
const CHANNEL_TYPE_GUILD_TEXT: u8 = 0;

pub struct DiscordGateway {
    http: reqwest::Client,
    token: String,
}

#[derive(Deserialize)]
struct ApiMessage {
    id: String,
    channel_id: String,
    timestamp: DateTime<Utc>,
    author: ApiAuthor,
    #[serde(default)]
    attachments: Vec<ApiAttachment>,
    #[serde(default)]
    embeds: Vec<ApiEmbed>,
}

#[derive(Deserialize)]
struct ApiAuthor {
    #[serde(default)]
    bot: bool,
}

#[derive(Deserialize)]
struct ApiAttachment {
    url: String,
    content_type: Option<String>,
}

#[derive(Deserialize, Default)]
struct ApiEmbed {
    image: Option<ApiEmbedMedia>,
    thumbnail: Option<ApiEmbedMedia>,
    video: Option<ApiEmbedMedia>,
}

#[derive(Deserialize)]
struct ApiEmbedMedia {
    url: Option<String>,
}

#[derive(Deserialize)]
struct ApiChannel {
    id: String,
    #[serde(rename = "type")]
    kind: u8,
    name: Option<String>,
    guild_id: Option<String>,
}

impl DiscordGateway {
    pub fn new(token: &str) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .context_connect()?;
        Ok(DiscordGateway {
            http,
            token: token.to_string(),
        })
    }

    fn auth_value(&self) -> String {
        format!("Bot {}", self.token)
    }
}

fn to_record(m: ApiMessage) -> MessageRecord {
    MessageRecord {
        id: m.id,
        channel_id: m.channel_id,
        timestamp: m.timestamp,
        author_is_bot: m.author.bot,
        attachments: m
            .attachments
            .into_iter()
            .map(|a| AttachmentRecord {
                url: a.url,
                content_type: a.content_type,
            })
            .collect(),
        embeds: m
            .embeds
            .into_iter()
            .map(|e| EmbedRecord {
                image_url: e.image.and_then(|m| m.url),
                thumbnail_url: e.thumbnail.and_then(|m| m.url),
                video_url: e.video.and_then(|m| m.url),
            })
            .collect(),
    }
}

#[async_trait]
impl ChannelSource for DiscordGateway {
    async fn fetch_page(
        &self,
        channel_id: &str,
        limit: usize,
        before: Option<&str>,
    ) -> Result<Vec<MessageRecord>> {
        let mut url = format!("{}/channels/{}/messages?limit={}", API_BASE, channel_id, limit);
        if let Some(before) = before {
            url.push_str(&format!("&before={}", before));
        }
        let resp = self
            .http
            .get(&url)
            .header("Authorization", self.auth_value())
            .send()
            .await
            .context_fetch_page(channel_id)?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!(
                "Failed to fetch messages from channel {}: {} - {}",
                channel_id,
                status,
                body
            );
        }
        let page: Vec<ApiMessage> = resp.json().await.context_fetch_page(channel_id)?;
        Ok(page.into_iter().map(to_record).collect())
    }

    async fn channel_info(&self, channel_id: &str) -> Result<ChannelInfo> {
        let url = format!("{}/channels/{}", API_BASE, channel_id);
        let resp = self
            .http
            .get(&url)
            .header("Authorization", self.auth_value())
            .send()
            .await
            .context_channel_info(channel_id)?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("Failed to look up channel {}: {} - {}", channel_id, status, body);
        }
        let ch: ApiChannel = resp.json().await.context_channel_info(channel_id)?;
        Ok(ChannelInfo {
            name: ch.name.unwrap_or_else(|| ch.id.clone()),
            id: ch.id,
            guild_id: ch.guild_id,
            is_text: ch.kind == CHANNEL_TYPE_GUILD_TEXT,
        })
    }

    async fn acknowledge(&self, channel_id: &str, message_id: &str, ok: bool) -> Result<()> {
        let emoji = if ok { "%E2%9C%85" } else { "%E2%9D%8C" }; // ✅ / ❌
        let url = format!(
            "{}/channels/{}/messages/{}/reactions/{}/@me",
            API_BASE, channel_id, message_id, emoji
        );
        let resp = self
            .http
            .put(&url)
            .header("Authorization", self.auth_value())
            .header("Content-Length", "0")
            .send()
            .await
            .context_acknowledge(channel_id, message_id)?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!(
                "Failed to add reaction to message {} in channel {}: {} - {}",
                message_id,
                channel_id,
                status,
                body
            );
        }
        Ok(())
    }
}
