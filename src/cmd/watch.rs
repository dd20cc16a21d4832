use crate::app::App;
use crate::Cli;
use anyhow::Result;
use clap::Args;

#[derive(Args, Debug, Clone)]
pub struct WatchArgs {
    /// Poll interval in seconds (overrides CHANVAULT_POLL_SECS)
    #[arg(long)]
    pub interval: Option<u64>,
}

pub async fn run(cli: &Cli, args: &WatchArgs) -> Result<()> {
    let mut app = App::new(cli)?;
    if let Some(secs) = args.interval {
        app.poll_interval = std::time::Duration::from_secs(secs);
    }

    eprintln!(
        "Watching monitored channels every {}s. Press Ctrl+C to stop.",
        app.poll_interval.as_secs()
    );

    let stats = app.watch().await?;

    eprintln!(
        "Watch stopped. Polls: {}, messages processed: {}, items uploaded: {}",
        stats.polls, stats.messages_processed, stats.items_uploaded
    );
    Ok(())
}
