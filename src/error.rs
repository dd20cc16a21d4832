//! Error handling with context wrappers for chat and vault operations.
//!
//! Setup-class failures get a user-facing explanation attached here; the
//! structured upload errors live in [`crate::vault::VaultError`].

use anyhow::{Context, Result};

/// Extension trait to add operation context to errors.
pub trait OpErrorContext<T> {
    /// Add context for building or connecting an HTTP client.
    fn context_connect(self) -> Result<T>;

    /// Add context for fetching a page of channel history.
    fn context_fetch_page(self, channel_id: &str) -> Result<T>;

    /// Add context for looking up channel metadata.
    fn context_channel_info(self, channel_id: &str) -> Result<T>;

    /// Add context for resolving a destination container.
    fn context_resolve(self, name: &str) -> Result<T>;

    /// Add context for downloading media bytes.
    fn context_download(self, url: &str) -> Result<T>;

    /// Add context for acknowledging a message with a reaction.
    fn context_acknowledge(self, channel_id: &str, message_id: &str) -> Result<T>;

    /// Add context for writing a state snapshot file.
    fn context_save_state(self, path: &str) -> Result<T>;
}

impl<T, E: std::error::Error + Send + Sync + 'static> OpErrorContext<T>
    for std::result::Result<T, E>
{
    fn context_connect(self) -> Result<T> {
        self.context("Failed to build HTTP client")
    }

    fn context_fetch_page(self, channel_id: &str) -> Result<T> {
        self.with_context(|| {
            format!(
                "Failed to fetch messages from channel {}. The channel may not exist or the bot may lack access.",
                channel_id
            )
        })
    }

    fn context_channel_info(self, channel_id: &str) -> Result<T> {
        self.with_context(|| format!("Failed to look up channel {}", channel_id))
    }

    fn context_resolve(self, name: &str) -> Result<T> {
        self.with_context(|| format!("Failed to resolve destination \"{}\"", name))
    }

    fn context_download(self, url: &str) -> Result<T> {
        self.with_context(|| format!("Failed to download media: {}", url))
    }

    fn context_acknowledge(self, channel_id: &str, message_id: &str) -> Result<T> {
        self.with_context(|| {
            format!(
                "Failed to add reaction to message {} in channel {}",
                message_id, channel_id
            )
        })
    }

    fn context_save_state(self, path: &str) -> Result<T> {
        self.with_context(|| format!("Failed to write state file: {}", path))
    }
}
