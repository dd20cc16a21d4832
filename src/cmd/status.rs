use crate::store::MonitoredChannels;
use crate::Cli;
use anyhow::Result;
use clap::Args;

#[derive(Args, Debug, Clone)]
pub struct StatusArgs {
    /// Only show channels for this guild
    #[arg(long)]
    pub guild: Option<String>,
}

pub async fn run(cli: &Cli, args: &StatusArgs) -> Result<()> {
    // Status is a pure local query; no clients needed
    let monitor = MonitoredChannels::load(&cli.data_dir());

    if let Some(guild) = &args.guild {
        let channels = monitor.channels(guild);
        if channels.is_empty() {
            println!("No channels are monitored in guild {}. Use `setup` to add one.", guild);
            return Ok(());
        }
        println!("Monitoring {} channel(s) in guild {}:", channels.len(), guild);
        for channel in channels {
            println!("  {}", channel);
        }
        return Ok(());
    }

    if monitor.is_empty() {
        println!("No channels are currently being monitored. Use `setup` to add one.");
        return Ok(());
    }
    for (guild, channels) in monitor.guilds() {
        println!("Guild {} ({} channel(s)):", guild, channels.len());
        for channel in channels {
            println!("  {}", channel);
        }
    }

    Ok(())
}
