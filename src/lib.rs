pub mod app;
pub mod chat;
pub mod cmd;
pub mod config;
pub mod error;
pub mod media;
pub mod shutdown;
pub mod store;
pub mod vault;

use clap::Parser;

#[derive(Parser, Debug, Clone)]
#[command(name = "chanvault", version, about = "Discord channel media backup (Google Drive / Google Photos)")]
pub struct Cli {
    /// Data directory for state snapshots (default: ~/.chanvault)
    #[arg(long, global = true, default_value = "~/.chanvault")]
    pub data_dir: String,

    #[command(subcommand)]
    pub command: cmd::Command,
}

impl Cli {
    pub fn data_dir(&self) -> String {
        let s = &self.data_dir;
        if s.starts_with("~/") {
            if let Some(home) = dirs_home() {
                return format!("{}{}", home, &s[1..]);
            }
        }
        s.clone()
    }
}

fn dirs_home() -> Option<String> {
    std::env::var("HOME").ok()
}
