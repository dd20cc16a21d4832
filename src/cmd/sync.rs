use crate::app::sync::{LogProgress, SyncOptions, SyncWindow};
use crate::app::App;
use crate::Cli;
use anyhow::Result;
use clap::Args;

#[derive(Args, Debug, Clone)]
pub struct SyncArgs {
    /// Channel id to backfill
    #[arg(long)]
    pub channel: String,

    /// Sync messages from the last N days
    #[arg(long, conflicts_with_all = ["since", "limit"])]
    pub days: Option<i64>,

    /// Sync messages since this date (YYYY-MM-DD or RFC3339)
    #[arg(long, conflicts_with = "limit")]
    pub since: Option<String>,

    /// Sync at most N messages
    #[arg(long)]
    pub limit: Option<usize>,
}

pub async fn run(cli: &Cli, args: &SyncArgs) -> Result<()> {
    // Window parsing is a setup concern; it fails before anything is fetched
    let window = SyncWindow::from_options(args.limit, args.days, args.since.as_deref())?;

    let mut app = App::new(cli)?;
    eprintln!("Syncing {}...", window.describe());

    let report = app
        .sync(
            SyncOptions {
                channel_id: args.channel.clone(),
                window,
            },
            &LogProgress,
        )
        .await?;

    eprintln!(
        "Sync complete. {} media item(s) found, {} uploaded{}",
        report.total,
        report.uploaded,
        if report.failed > 0 {
            format!(", {} failed", report.failed)
        } else {
            String::new()
        }
    );

    Ok(())
}
