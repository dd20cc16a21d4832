pub mod history;
pub mod sync;
pub mod watch;

use crate::chat::discord::DiscordGateway;
use crate::chat::ChannelSource;
use crate::config::{Backend, Config};
use crate::error::OpErrorContext;
use crate::media::{HttpFetcher, MediaFetcher};
use crate::store::{ContainerCache, MonitoredChannels, SyncLedger};
use crate::vault::auth::TokenSource;
use crate::vault::gdrive::DriveVault;
use crate::vault::gphotos::PhotosVault;
use crate::vault::resolver::ContainerResolver;
use crate::vault::MediaStore;
use crate::Cli;
use anyhow::Result;
use std::sync::Arc;

/// Everything a command needs, wired once: the chat source, the vault
/// backend, the resolver over the container cache, and the two other
/// persistent stores. Handles are passed around by reference; nothing in
/// the pipeline reaches for globals.
pub struct App {
    pub source: Arc<dyn ChannelSource>,
    pub vault: Arc<dyn MediaStore>,
    pub resolver: ContainerResolver,
    pub monitor: MonitoredChannels,
    pub ledger: SyncLedger,
    pub fetcher: Arc<dyn MediaFetcher>,
    pub poll_interval: std::time::Duration,
}

impl App {
    pub fn new(cli: &Cli) -> Result<Self> {
        let config = Config::from_env()?;
        let data_dir = cli.data_dir();
        std::fs::create_dir_all(&data_dir)?;

        let http = reqwest::Client::builder().build().context_connect()?;

        let source: Arc<dyn ChannelSource> =
            Arc::new(DiscordGateway::new(&config.discord_token)?);

        let tokens = TokenSource::new(
            http.clone(),
            &config.oauth_client_id,
            &config.oauth_client_secret,
            &config.token_path,
        )?;
        let vault: Arc<dyn MediaStore> = match config.backend {
            Backend::Drive => Arc::new(DriveVault::new(
                http.clone(),
                tokens,
                config.drive_root.clone(),
                config.upload_width,
                config.upload_pause,
            )),
            Backend::Photos => Arc::new(PhotosVault::new(
                http.clone(),
                tokens,
                config.upload_width,
                config.upload_pause,
            )),
        };
        log::info!("Upload backend: {}", vault.name());

        let resolver = ContainerResolver::new(Arc::clone(&vault), ContainerCache::load(&data_dir));
        let monitor = MonitoredChannels::load(&data_dir);
        let ledger = SyncLedger::load(&data_dir);

        Ok(App {
            source,
            vault,
            resolver,
            monitor,
            ledger,
            fetcher: Arc::new(HttpFetcher::new(http)),
            poll_interval: config.poll_interval,
        })
    }

    /// Assemble an App from explicit parts. Integration tests wire fakes
    /// through here; no environment or network is touched.
    pub fn from_parts(
        source: Arc<dyn ChannelSource>,
        vault: Arc<dyn MediaStore>,
        fetcher: Arc<dyn MediaFetcher>,
        data_dir: &str,
    ) -> Result<Self> {
        std::fs::create_dir_all(data_dir)?;
        let resolver = ContainerResolver::new(Arc::clone(&vault), ContainerCache::load(data_dir));
        Ok(App {
            source,
            vault,
            resolver,
            monitor: MonitoredChannels::load(data_dir),
            ledger: SyncLedger::load(data_dir),
            fetcher,
            poll_interval: std::time::Duration::from_secs(30),
        })
    }
}
