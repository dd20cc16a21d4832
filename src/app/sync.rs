//! Backfill pipeline: collect history, flatten media tasks, upload.
//!
//! One task failing never aborts a run; the run always completes with a
//! scorecard. Only setup failures (unreachable channel, unresolvable
//! destination, bad window parameters) abort before any task is attempted.

use crate::app::{history, App};
use crate::error::OpErrorContext;
use crate::media;
use crate::vault::VaultError;
use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveDate, Utc};
use std::collections::BTreeSet;
use tokio::sync::RwLock;

/// What slice of history a sync run covers. Precedence when several options
/// are supplied: limit > days > since > default (last 7 days).
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SyncWindow {
    Limit(usize),
    Days(i64),
    Since(DateTime<Utc>),
    LastWeek,
}

impl SyncWindow {
    pub fn from_options(
        limit: Option<usize>,
        days: Option<i64>,
        since: Option<&str>,
    ) -> Result<Self> {
        if let Some(limit) = limit {
            return Ok(SyncWindow::Limit(limit));
        }
        if let Some(days) = days {
            return Ok(SyncWindow::Days(days));
        }
        if let Some(raw) = since {
            return Ok(SyncWindow::Since(parse_since(raw)?));
        }
        Ok(SyncWindow::LastWeek)
    }

    pub fn collect_options(&self, now: DateTime<Utc>) -> history::CollectOptions {
        match self {
            SyncWindow::Limit(limit) => history::CollectOptions {
                cutoff: None,
                limit: Some(*limit),
            },
            SyncWindow::Days(days) => history::CollectOptions {
                cutoff: Some(now - Duration::days(*days)),
                limit: None,
            },
            SyncWindow::Since(cutoff) => history::CollectOptions {
                cutoff: Some(*cutoff),
                limit: None,
            },
            SyncWindow::LastWeek => history::CollectOptions {
                cutoff: Some(now - Duration::days(7)),
                limit: None,
            },
        }
    }

    pub fn describe(&self) -> String {
        match self {
            SyncWindow::Limit(limit) => format!("up to {} messages", limit),
            SyncWindow::Days(days) => format!("last {} days", days),
            SyncWindow::Since(cutoff) => format!("since {}", cutoff.format("%Y-%m-%d")),
            SyncWindow::LastWeek => "last 7 days (default)".to_string(),
        }
    }
}

fn parse_since(raw: &str) -> Result<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.with_timezone(&Utc));
    }
    if let Ok(d) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Ok(d.and_hms_opt(0, 0, 0).unwrap().and_utc());
    }
    anyhow::bail!("Invalid date format: '{}'. Use YYYY-MM-DD (e.g., 2024-01-01) or RFC3339", raw)
}

/// One unit of upload work: a single media URL from a single message.
#[derive(Debug, Clone)]
pub struct MediaTask {
    pub message_id: String,
    pub url: String,
    pub index: usize,
}

/// Cumulative run state handed to the progress collaborator after each batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    pub total: usize,
    pub attempted: usize,
    pub uploaded: usize,
    pub failed: usize,
}

/// Receives periodic status snapshots; a chat frontend edits its reply here,
/// the CLI writes to stderr.
#[async_trait]
pub trait ProgressSink: Send + Sync {
    async fn report(&self, progress: &Progress);
}

/// Default sink: progress on stderr, like any long-running command.
pub struct LogProgress;

#[async_trait]
impl ProgressSink for LogProgress {
    async fn report(&self, p: &Progress) {
        eprintln!(
            "Syncing... {}/{} items, {} uploaded{}",
            p.attempted,
            p.total,
            p.uploaded,
            if p.failed > 0 {
                format!(", {} failed", p.failed)
            } else {
                String::new()
            }
        );
    }
}

pub struct SyncOptions {
    pub channel_id: String,
    pub window: SyncWindow,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncReport {
    /// Tasks considered (after the ledger gate), not messages.
    pub total: usize,
    pub uploaded: usize,
    pub failed: usize,
}

impl App {
    /// Run a backfill over one channel. See module docs for the failure
    /// taxonomy; the returned report is the scorecard.
    pub async fn sync(
        &mut self,
        opts: SyncOptions,
        progress: &dyn ProgressSink,
    ) -> Result<SyncReport> {
        let info = self.source.channel_info(&opts.channel_id).await?;
        if !info.is_text {
            anyhow::bail!("Channel {} is not a text channel", opts.channel_id);
        }

        log::info!(
            "Starting sync for channel {} ({}), window: {}",
            info.name,
            info.id,
            opts.window.describe()
        );

        let collect_opts = opts.window.collect_options(Utc::now());
        let messages = history::collect(self.source.as_ref(), &opts.channel_id, &collect_opts).await?;
        log::info!("Processing {} messages", messages.len());

        // Destination must resolve before any task runs
        let container_id = self
            .resolver
            .resolve(&info.name, false)
            .await
            .context_resolve(&info.name)?;

        // Flatten to tasks, gated by the ledger so overlapping windows are safe
        let mut tasks: Vec<MediaTask> = Vec::new();
        for message in &messages {
            if message.author_is_bot {
                continue;
            }
            if self.ledger.is_synced(&opts.channel_id, &message.id) {
                log::debug!("Message {} already synced, skipping", message.id);
                continue;
            }
            for (index, url) in media::extract_media(message).into_iter().enumerate() {
                tasks.push(MediaTask {
                    message_id: message.id.clone(),
                    url,
                    index,
                });
            }
        }

        let total = tasks.len();
        log::info!("Found {} media items to upload", total);

        let policy = self.vault.upload_policy();
        let width = policy.width.max(1);
        let container = RwLock::new(container_id);

        let mut uploaded = 0usize;
        let mut failed = 0usize;

        for (batch_index, batch) in tasks.chunks(width).enumerate() {
            if batch_index > 0 && !policy.pause.is_zero() {
                tokio::time::sleep(policy.pause).await;
            }

            let results = futures::future::join_all(
                batch
                    .iter()
                    .map(|task| self.process_task(task, &info.name, &container)),
            )
            .await;
            for ok in results {
                if ok {
                    uploaded += 1;
                } else {
                    failed += 1;
                }
            }

            // A message is marked once its batch attempted all of its items
            let batch_messages: BTreeSet<&str> =
                batch.iter().map(|t| t.message_id.as_str()).collect();
            for message_id in batch_messages {
                self.ledger.mark_synced(&opts.channel_id, message_id);
            }

            progress
                .report(&Progress {
                    total,
                    attempted: uploaded + failed,
                    uploaded,
                    failed,
                })
                .await;
        }

        // One flush per run; a failed write costs re-uploads, not correctness
        if let Err(e) = self.ledger.save() {
            log::warn!("Failed to persist sync ledger: {:#}", e);
        }

        log::info!("Sync complete: {}/{} uploaded, {} failed", uploaded, total, failed);
        Ok(SyncReport {
            total,
            uploaded,
            failed,
        })
    }

    /// Download and upload a single media item. Returns whether it succeeded;
    /// a stale container id triggers one re-resolution and one retry.
    pub(crate) async fn process_task(
        &self,
        task: &MediaTask,
        dest_name: &str,
        container: &RwLock<String>,
    ) -> bool {
        log::debug!("Downloading media from message {}", task.message_id);
        let bytes = match self.fetcher.fetch(&task.url).await {
            Ok(bytes) => bytes,
            Err(e) => {
                log::error!("Failed to download {} ({:#})", task.url, e);
                return false;
            }
        };

        let file_name = media::file_name_for(&task.message_id, task.index, Utc::now(), &task.url);
        let mime_type = media::mime_type_for(&task.url);

        let current = container.read().await.clone();
        match self
            .vault
            .upload(&bytes, &file_name, &current, mime_type)
            .await
        {
            Ok(link) => {
                log::debug!("Uploaded {} -> {}", file_name, link);
                true
            }
            Err(VaultError::ContainerNotFound(stale)) => {
                log::warn!(
                    "Container {} is stale, re-resolving \"{}\" and retrying once",
                    stale,
                    dest_name
                );
                self.resolver.invalidate(dest_name).await;
                let fresh = match self.resolver.resolve(dest_name, true).await {
                    Ok(id) => id,
                    Err(e) => {
                        log::error!("Re-resolution of \"{}\" failed: {}", dest_name, e);
                        return false;
                    }
                };
                *container.write().await = fresh.clone();
                match self.vault.upload(&bytes, &file_name, &fresh, mime_type).await {
                    Ok(link) => {
                        log::debug!("Uploaded {} -> {} after re-resolution", file_name, link);
                        true
                    }
                    Err(e) => {
                        log::error!("Upload of {} failed after retry: {}", file_name, e);
                        false
                    }
                }
            }
            Err(e) => {
                log::error!("Upload of {} failed: {}", file_name, e);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_precedence_limit_over_days_over_since() {
        let w = SyncWindow::from_options(Some(10), Some(3), Some("2024-01-01")).unwrap();
        assert_eq!(w, SyncWindow::Limit(10));

        let w = SyncWindow::from_options(None, Some(3), Some("2024-01-01")).unwrap();
        assert_eq!(w, SyncWindow::Days(3));

        let w = SyncWindow::from_options(None, None, Some("2024-01-01")).unwrap();
        assert_eq!(
            w,
            SyncWindow::Since("2024-01-01T00:00:00Z".parse().unwrap())
        );

        let w = SyncWindow::from_options(None, None, None).unwrap();
        assert_eq!(w, SyncWindow::LastWeek);
    }

    #[test]
    fn bad_since_date_is_a_setup_error() {
        let err = SyncWindow::from_options(None, None, Some("not-a-date")).unwrap_err();
        assert!(err.to_string().contains("Invalid date format"));
    }

    #[test]
    fn window_to_collect_options() {
        let now: DateTime<Utc> = "2024-03-10T00:00:00Z".parse().unwrap();

        let opts = SyncWindow::Limit(5).collect_options(now);
        assert_eq!(opts.limit, Some(5));
        assert!(opts.cutoff.is_none());

        let opts = SyncWindow::Days(3).collect_options(now);
        assert_eq!(opts.cutoff, Some("2024-03-07T00:00:00Z".parse().unwrap()));

        let opts = SyncWindow::LastWeek.collect_options(now);
        assert_eq!(opts.cutoff, Some("2024-03-03T00:00:00Z".parse().unwrap()));
    }
}
