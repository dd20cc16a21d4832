//! Chat-platform capability surface.
//!
//! The pipeline never talks to Discord types directly; it consumes the
//! neutral records below through the [`ChannelSource`] trait, which keeps the
//! history collector and orchestrator testable against in-process fakes.

pub mod discord;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// One attachment on a message, as the platform declared it.
#[derive(Debug, Clone)]
pub struct AttachmentRecord {
    pub url: String,
    pub content_type: Option<String>,
}

/// The media-bearing fields of an embed.
#[derive(Debug, Clone, Default)]
pub struct EmbedRecord {
    pub image_url: Option<String>,
    pub thumbnail_url: Option<String>,
    pub video_url: Option<String>,
}

/// A message as the pipeline sees it.
#[derive(Debug, Clone)]
pub struct MessageRecord {
    pub id: String,
    pub channel_id: String,
    pub timestamp: DateTime<Utc>,
    pub author_is_bot: bool,
    pub attachments: Vec<AttachmentRecord>,
    pub embeds: Vec<EmbedRecord>,
}

#[derive(Debug, Clone)]
pub struct ChannelInfo {
    pub id: String,
    pub name: String,
    pub guild_id: Option<String>,
    pub is_text: bool,
}

/// Paginated, read-mostly access to a channel's messages.
#[async_trait]
pub trait ChannelSource: Send + Sync {
    /// Fetch up to `limit` messages, newest first, strictly before
    /// `before` when given.
    async fn fetch_page(
        &self,
        channel_id: &str,
        limit: usize,
        before: Option<&str>,
    ) -> Result<Vec<MessageRecord>>;

    /// Channel metadata; fails if the channel is unreachable.
    async fn channel_info(&self, channel_id: &str) -> Result<ChannelInfo>;

    /// Mark a processed message for its author (reaction glue used by watch
    /// mode). Best-effort; callers log failures and move on.
    async fn acknowledge(&self, channel_id: &str, message_id: &str, ok: bool) -> Result<()>;
}
