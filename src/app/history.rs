//! Cutoff-bounded retrieval of channel history.
//!
//! The platform paginates newest-first; collection walks `before` the last
//! seen id, accumulates, and reverses at the end so callers process
//! oldest-first (earlier messages land in the destination before later ones).

use crate::chat::{ChannelSource, MessageRecord};
use anyhow::Result;
use chrono::{DateTime, Utc};
use std::time::Duration;

/// The platform's maximum messages per history request.
pub const PAGE_SIZE: usize = 100;

/// Pause after a full page; more pages likely remain and the source
/// should not be hammered.
const FULL_PAGE_PAUSE: Duration = Duration::from_secs(1);

/// Stop condition for a collection run. `limit` wins over `cutoff` when the
/// caller supplies both.
#[derive(Debug, Clone, Copy, Default)]
pub struct CollectOptions {
    /// Earliest eligible timestamp, boundary inclusive.
    pub cutoff: Option<DateTime<Utc>>,
    /// Maximum messages to fetch/consider.
    pub limit: Option<usize>,
}

/// Collect history for `channel_id`, oldest-first.
pub async fn collect(
    source: &dyn ChannelSource,
    channel_id: &str,
    opts: &CollectOptions,
) -> Result<Vec<MessageRecord>> {
    let mut collected: Vec<MessageRecord> = Vec::new();
    let mut before: Option<String> = None;
    let mut fetched = 0usize;

    loop {
        let fetch_limit = match opts.limit {
            Some(limit) => {
                let remaining = limit.saturating_sub(fetched);
                if remaining == 0 {
                    break;
                }
                remaining.min(PAGE_SIZE)
            }
            None => PAGE_SIZE,
        };

        let page = source
            .fetch_page(channel_id, fetch_limit, before.as_deref())
            .await?;
        if page.is_empty() {
            log::debug!("Channel {} history exhausted", channel_id);
            break;
        }

        fetched += page.len();
        before = page.last().map(|m| m.id.clone());
        let full_page = page.len() == PAGE_SIZE;

        // The last entry of a newest-first page is the oldest in the page
        if let Some(cutoff) = opts.cutoff {
            let past_cutoff = page
                .last()
                .map(|m| m.timestamp < cutoff)
                .unwrap_or(false);
            if past_cutoff {
                collected.extend(page.into_iter().filter(|m| m.timestamp >= cutoff));
                log::debug!("Reached cutoff date for channel {}", channel_id);
                break;
            }
        }

        collected.extend(page);

        if let Some(limit) = opts.limit {
            if fetched >= limit {
                break;
            }
        }

        if full_page {
            tokio::time::sleep(FULL_PAGE_PAUSE).await;
        }
    }

    collected.reverse();
    Ok(collected)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::ChannelInfo;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Serves a fixed newest-first history in pages.
    struct FakeSource {
        // newest first, as the platform returns them
        messages: Vec<MessageRecord>,
        pages_served: Mutex<usize>,
    }

    impl FakeSource {
        fn new(messages: Vec<MessageRecord>) -> Self {
            FakeSource {
                messages,
                pages_served: Mutex::new(0),
            }
        }
    }

    #[async_trait]
    impl ChannelSource for FakeSource {
        async fn fetch_page(
            &self,
            _channel_id: &str,
            limit: usize,
            before: Option<&str>,
        ) -> Result<Vec<MessageRecord>> {
            *self.pages_served.lock().unwrap() += 1;
            let start = match before {
                Some(id) => match self.messages.iter().position(|m| m.id == id) {
                    Some(pos) => pos + 1,
                    None => return Ok(vec![]),
                },
                None => 0,
            };
            Ok(self
                .messages
                .iter()
                .skip(start)
                .take(limit)
                .cloned()
                .collect())
        }

        async fn channel_info(&self, channel_id: &str) -> Result<ChannelInfo> {
            Ok(ChannelInfo {
                id: channel_id.to_string(),
                name: "general".to_string(),
                guild_id: Some("g1".to_string()),
                is_text: true,
            })
        }

        async fn acknowledge(&self, _: &str, _: &str, _: bool) -> Result<()> {
            Ok(())
        }
    }

    fn message(id: u64, ts: &str) -> MessageRecord {
        MessageRecord {
            id: id.to_string(),
            channel_id: "c1".to_string(),
            timestamp: ts.parse().unwrap(),
            author_is_bot: false,
            attachments: vec![],
            embeds: vec![],
        }
    }

    /// ids descending with timestamps one hour apart, newest first.
    fn history(count: u64) -> Vec<MessageRecord> {
        (0..count)
            .map(|i| {
                let id = count - i;
                let ts = format!("2024-03-10T{:02}:00:00Z", 23 - (i % 24));
                message(id, &ts)
            })
            .collect()
    }

    #[tokio::test(start_paused = true)]
    async fn empty_channel_yields_nothing() {
        let source = FakeSource::new(vec![]);
        let out = collect(&source, "c1", &CollectOptions::default()).await.unwrap();
        assert!(out.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn collects_everything_oldest_first() {
        let source = FakeSource::new(vec![
            message(3, "2024-03-10T12:00:00Z"),
            message(2, "2024-03-10T11:00:00Z"),
            message(1, "2024-03-10T10:00:00Z"),
        ]);
        let out = collect(&source, "c1", &CollectOptions::default()).await.unwrap();
        let ids: Vec<&str> = out.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "2", "3"]);
    }

    #[tokio::test(start_paused = true)]
    async fn cutoff_is_boundary_inclusive() {
        let source = FakeSource::new(vec![
            message(4, "2024-03-10T12:00:00Z"),
            message(3, "2024-03-10T11:00:00Z"),
            message(2, "2024-03-10T10:00:00Z"),
            message(1, "2024-03-09T09:00:00Z"),
        ]);
        let opts = CollectOptions {
            cutoff: Some("2024-03-10T10:00:00Z".parse().unwrap()),
            limit: None,
        };
        let out = collect(&source, "c1", &opts).await.unwrap();
        let ids: Vec<&str> = out.iter().map(|m| m.id.as_str()).collect();
        // message 2 sits exactly on the cutoff and is kept; message 1 is not
        assert_eq!(ids, vec!["2", "3", "4"]);
    }

    #[tokio::test(start_paused = true)]
    async fn cutoff_holds_across_page_boundaries() {
        // 250 messages, one minute apart, newest first
        let messages: Vec<MessageRecord> = (0..250u64)
            .map(|i| {
                message(
                    250 - i,
                    &format!(
                        "2024-03-10T{:02}:{:02}:00Z",
                        10 + (249 - i) / 60,
                        (249 - i) % 60
                    ),
                )
            })
            .collect();
        let cutoff: DateTime<Utc> = "2024-03-10T11:00:00Z".parse().unwrap();
        let expected = messages.iter().filter(|m| m.timestamp >= cutoff).count();

        let source = FakeSource::new(messages);
        let opts = CollectOptions {
            cutoff: Some(cutoff),
            limit: None,
        };
        let out = collect(&source, "c1", &opts).await.unwrap();
        assert_eq!(out.len(), expected);
        // oldest-first ordering survives chunking
        assert!(out.windows(2).all(|w| w[0].timestamp <= w[1].timestamp));
    }

    #[tokio::test(start_paused = true)]
    async fn limit_caps_fetching() {
        let source = FakeSource::new(history(250));
        let opts = CollectOptions {
            cutoff: None,
            limit: Some(120),
        };
        let out = collect(&source, "c1", &opts).await.unwrap();
        assert_eq!(out.len(), 120);
        // one full page plus one 20-message page
        assert_eq!(*source.pages_served.lock().unwrap(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn limit_wins_over_cutoff() {
        let source = FakeSource::new(vec![
            message(3, "2024-03-10T12:00:00Z"),
            message(2, "2024-03-10T11:00:00Z"),
            message(1, "2024-03-10T10:00:00Z"),
        ]);
        let opts = CollectOptions {
            // cutoff would admit all three; limit keeps only the newest two
            cutoff: Some("2024-03-01T00:00:00Z".parse().unwrap()),
            limit: Some(2),
        };
        let out = collect(&source, "c1", &opts).await.unwrap();
        assert_eq!(out.len(), 2);
        assert_eq!(out.last().unwrap().id, "3");
    }
}
