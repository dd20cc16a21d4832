//! Live mode: poll monitored channels and upload media from new messages.
//!
//! Polling reuses the same page-fetch capability as backfill; the ledger
//! gate keeps repeated polls idempotent. Each processed message gets a
//! reaction acknowledgement and its own ledger flush, so a crash loses at
//! most the message in flight.

use crate::app::App;
use crate::chat::MessageRecord;
use anyhow::Result;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Messages per poll request; plenty for human-rate channels.
const POLL_PAGE: usize = 50;

pub struct WatchStats {
    pub polls: u64,
    pub messages_processed: u64,
    pub items_uploaded: u64,
}

impl App {
    /// Poll until shutdown. Errors inside one poll round are logged and the
    /// loop keeps going; only a broken monitored-set snapshot is fatal.
    pub async fn watch(&mut self) -> Result<WatchStats> {
        let shutdown = crate::shutdown::global();
        let started: DateTime<Utc> = Utc::now();
        let mut stats = WatchStats {
            polls: 0,
            messages_processed: 0,
            items_uploaded: 0,
        };

        if self.monitor.is_empty() {
            log::warn!("No channels are monitored; watch will idle. Use `setup` first.");
        }

        // Channel id → display name, learned lazily
        let mut names: HashMap<String, String> = HashMap::new();
        let mut ticker = tokio::time::interval(self.poll_interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = ticker.tick() => {}
            }

            stats.polls += 1;
            let channels: Vec<String> = self
                .monitor
                .guilds()
                .flat_map(|(_, set)| set.iter().cloned())
                .collect();

            for channel_id in channels {
                if shutdown.is_triggered() {
                    break;
                }
                match self.poll_channel(&channel_id, started, &mut names).await {
                    Ok((messages, items)) => {
                        stats.messages_processed += messages;
                        stats.items_uploaded += items;
                    }
                    Err(e) => {
                        log::error!("Poll of channel {} failed: {:#}", channel_id, e);
                    }
                }
            }
        }

        Ok(stats)
    }

    async fn poll_channel(
        &mut self,
        channel_id: &str,
        started: DateTime<Utc>,
        names: &mut HashMap<String, String>,
    ) -> Result<(u64, u64)> {
        let page = self.source.fetch_page(channel_id, POLL_PAGE, None).await?;

        // Oldest first, like the backfill pipeline
        let mut fresh: Vec<MessageRecord> = page
            .into_iter()
            .filter(|m| {
                m.timestamp >= started
                    && !m.author_is_bot
                    && !self.ledger.is_synced(channel_id, &m.id)
            })
            .collect();
        fresh.reverse();

        if fresh.is_empty() {
            return Ok((0, 0));
        }

        if !names.contains_key(channel_id) {
            let info = self.source.channel_info(channel_id).await?;
            names.insert(channel_id.to_string(), info.name);
        }
        let channel_name = names[channel_id].clone();

        let mut messages = 0u64;
        let mut items = 0u64;
        for message in fresh {
            items += self
                .process_live_message(channel_id, &channel_name, &message)
                .await?;
            messages += 1;
        }
        Ok((messages, items))
    }

    /// Straight-line handling of one live message: extract, upload serially,
    /// acknowledge, mark synced, flush.
    async fn process_live_message(
        &mut self,
        channel_id: &str,
        channel_name: &str,
        message: &MessageRecord,
    ) -> Result<u64> {
        let urls = crate::media::extract_media(message);
        if urls.is_empty() {
            return Ok(0);
        }
        log::info!("Found {} media item(s) in message {}", urls.len(), message.id);

        let container_id = self.resolver.resolve(channel_name, false).await?;
        let container = RwLock::new(container_id);

        let mut uploaded = 0u64;
        let mut failed = 0u64;
        for (index, url) in urls.into_iter().enumerate() {
            let task = crate::app::sync::MediaTask {
                message_id: message.id.clone(),
                url,
                index,
            };
            if self.process_task(&task, channel_name, &container).await {
                uploaded += 1;
            } else {
                failed += 1;
            }
        }

        if let Err(e) = self
            .source
            .acknowledge(channel_id, &message.id, failed == 0)
            .await
        {
            log::warn!("Failed to acknowledge message {}: {:#}", message.id, e);
        }

        self.ledger.mark_synced(channel_id, &message.id);
        if let Err(e) = self.ledger.save() {
            log::warn!("Failed to persist sync ledger: {:#}", e);
        }

        Ok(uploaded)
    }
}
