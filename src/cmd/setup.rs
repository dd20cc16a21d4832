use crate::app::App;
use crate::Cli;
use anyhow::Result;
use clap::Args;

#[derive(Args, Debug, Clone)]
pub struct SetupArgs {
    /// Guild (server) id the channel belongs to
    #[arg(long)]
    pub guild: String,

    /// Channel id to monitor
    #[arg(long)]
    pub channel: String,
}

pub async fn run(cli: &Cli, args: &SetupArgs) -> Result<()> {
    let mut app = App::new(cli)?;

    let info = app.source.channel_info(&args.channel).await?;
    if !info.is_text {
        anyhow::bail!("Channel {} is not a text channel", args.channel);
    }
    if info.guild_id.as_deref() != Some(args.guild.as_str()) {
        anyhow::bail!(
            "Channel {} does not belong to guild {}",
            args.channel,
            args.guild
        );
    }

    let added = app.monitor.add(&args.guild, &args.channel);
    let count = app.monitor.channels(&args.guild).len();
    if added {
        log::info!(
            "Added channel {} ({}) in guild {}. Total: {}",
            info.name,
            args.channel,
            args.guild,
            count
        );
        eprintln!(
            "Monitoring #{} ({} channel{} in this guild)",
            info.name,
            count,
            if count == 1 { "" } else { "s" }
        );
    } else {
        eprintln!("#{} is already being monitored.", info.name);
    }

    Ok(())
}
