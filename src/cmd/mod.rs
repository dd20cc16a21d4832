pub mod completions;
pub mod remove;
pub mod setup;
pub mod status;
pub mod sync;
pub mod test;
pub mod watch;

use crate::Cli;
use clap::Subcommand;

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Add a channel to monitor for media
    Setup(setup::SetupArgs),
    /// Remove a channel from monitoring
    Remove(remove::RemoveArgs),
    /// Show which channels are being monitored
    Status(status::StatusArgs),
    /// Backfill media from a channel's history
    Sync(sync::SyncArgs),
    /// Watch monitored channels and upload media from new messages
    Watch(watch::WatchArgs),
    /// Verify remote media store connectivity
    Test,
    /// Generate shell completions
    Completions {
        /// Shell type to generate completions for
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    match &cli.command {
        Command::Setup(args) => setup::run(&cli, args).await,
        Command::Remove(args) => remove::run(&cli, args).await,
        Command::Status(args) => status::run(&cli, args).await,
        Command::Sync(args) => sync::run(&cli, args).await,
        Command::Watch(args) => watch::run(&cli, args).await,
        Command::Test => test::run(&cli).await,
        Command::Completions { shell } => completions::run(*shell),
    }
}
