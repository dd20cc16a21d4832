use crate::app::App;
use crate::Cli;
use anyhow::Result;
use clap::Args;

#[derive(Args, Debug, Clone)]
pub struct RemoveArgs {
    /// Guild (server) id the channel belongs to
    #[arg(long)]
    pub guild: String,

    /// Channel id to stop monitoring
    #[arg(long)]
    pub channel: String,
}

pub async fn run(cli: &Cli, args: &RemoveArgs) -> Result<()> {
    let mut app = App::new(cli)?;

    let removed = app.monitor.remove(&args.guild, &args.channel);
    if !removed {
        eprintln!("Channel {} is not being monitored.", args.channel);
        return Ok(());
    }

    let remaining = app.monitor.channels(&args.guild).len();
    log::info!(
        "Removed channel {} from guild {}. Remaining: {}",
        args.channel,
        args.guild,
        remaining
    );
    eprintln!(
        "Stopped monitoring channel {} ({} channel{} remaining in this guild)",
        args.channel,
        remaining,
        if remaining == 1 { "" } else { "s" }
    );

    Ok(())
}
