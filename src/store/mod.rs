//! Persistent state snapshots.
//!
//! Three small stores back the bot: the monitored-channel set, the synced-
//! message ledger, and the destination-container cache. Each one is a plain
//! serde map persisted as a whole JSON snapshot: load once at startup, rewrite
//! the entire file on save. A missing or malformed file means "start empty";
//! it is logged, never fatal.

use crate::error::OpErrorContext;
use anyhow::Result;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

pub const MONITOR_FILE: &str = "monitored-channels.json";
pub const LEDGER_FILE: &str = "synced-messages.json";
pub const CACHE_FILE: &str = "container-cache.json";

fn load_snapshot<T: DeserializeOwned + Default>(path: &Path) -> T {
    if !path.exists() {
        return T::default();
    }
    let read = std::fs::read_to_string(path)
        .map_err(anyhow::Error::from)
        .and_then(|s| serde_json::from_str::<T>(&s).map_err(anyhow::Error::from));
    match read {
        Ok(v) => v,
        Err(e) => {
            log::warn!(
                "Ignoring unreadable state file {} ({:#}), starting empty",
                path.display(),
                e
            );
            T::default()
        }
    }
}

fn save_snapshot<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).context_save_state(&path.display().to_string())?;
    }
    let json = serde_json::to_string_pretty(value)
        .context_save_state(&path.display().to_string())?;
    std::fs::write(path, json).context_save_state(&path.display().to_string())?;
    Ok(())
}

/// Guild id → set of channel ids under watch.
///
/// Invariant: a guild entry with an empty set is removed, not kept empty.
pub struct MonitoredChannels {
    path: PathBuf,
    guilds: BTreeMap<String, BTreeSet<String>>,
}

impl MonitoredChannels {
    pub fn load(data_dir: &str) -> Self {
        let path = Path::new(data_dir).join(MONITOR_FILE);
        let guilds = load_snapshot(&path);
        MonitoredChannels { path, guilds }
    }

    pub fn save(&self) -> Result<()> {
        save_snapshot(&self.path, &self.guilds)
    }

    pub fn is_monitored(&self, guild_id: &str, channel_id: &str) -> bool {
        self.guilds
            .get(guild_id)
            .map(|c| c.contains(channel_id))
            .unwrap_or(false)
    }

    /// Add a channel to a guild's watch set. Returns false if it was already
    /// present. The snapshot is rewritten on every mutation; a failed write
    /// is logged and the in-memory state stands.
    pub fn add(&mut self, guild_id: &str, channel_id: &str) -> bool {
        let added = self
            .guilds
            .entry(guild_id.to_string())
            .or_default()
            .insert(channel_id.to_string());
        if added {
            if let Err(e) = self.save() {
                log::warn!("Failed to persist monitored channels: {:#}", e);
            }
        }
        added
    }

    /// Remove a channel; a guild left with no channels is dropped entirely.
    pub fn remove(&mut self, guild_id: &str, channel_id: &str) -> bool {
        let Some(channels) = self.guilds.get_mut(guild_id) else {
            return false;
        };
        let removed = channels.remove(channel_id);
        if removed {
            if channels.is_empty() {
                self.guilds.remove(guild_id);
            }
            if let Err(e) = self.save() {
                log::warn!("Failed to persist monitored channels: {:#}", e);
            }
        }
        removed
    }

    pub fn channels(&self, guild_id: &str) -> Vec<String> {
        self.guilds
            .get(guild_id)
            .map(|c| c.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn guilds(&self) -> impl Iterator<Item = (&String, &BTreeSet<String>)> {
        self.guilds.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.guilds.is_empty()
    }
}

/// Channel id → set of message ids whose media has been uploaded.
///
/// Presence means "do not re-upload media from this message"; it does not
/// mean the message had media in the first place.
pub struct SyncLedger {
    path: PathBuf,
    channels: BTreeMap<String, BTreeSet<String>>,
}

impl SyncLedger {
    pub fn load(data_dir: &str) -> Self {
        let path = Path::new(data_dir).join(LEDGER_FILE);
        let channels = load_snapshot(&path);
        SyncLedger { path, channels }
    }

    pub fn is_synced(&self, channel_id: &str, message_id: &str) -> bool {
        self.channels
            .get(channel_id)
            .map(|m| m.contains(message_id))
            .unwrap_or(false)
    }

    /// Idempotent: re-marking an already-synced message is a no-op.
    /// Does not persist; callers flush with [`SyncLedger::save`] per run.
    pub fn mark_synced(&mut self, channel_id: &str, message_id: &str) {
        self.channels
            .entry(channel_id.to_string())
            .or_default()
            .insert(message_id.to_string());
    }

    /// Flush the entire ledger, overwriting the previous snapshot.
    pub fn save(&self) -> Result<()> {
        save_snapshot(&self.path, &self.channels)
    }
}

/// Destination name (channel name) → remote container id.
///
/// A cached id is believed valid but may have been deleted remotely; lookups
/// that fail downstream must invalidate rather than error out.
pub struct ContainerCache {
    path: PathBuf,
    entries: BTreeMap<String, String>,
}

impl ContainerCache {
    pub fn load(data_dir: &str) -> Self {
        let path = Path::new(data_dir).join(CACHE_FILE);
        let entries = load_snapshot(&path);
        ContainerCache { path, entries }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries.get(name).map(|s| s.as_str())
    }

    /// Insert or overwrite a mapping and persist immediately. A save failure
    /// is logged; the in-memory entry stands either way.
    pub fn set(&mut self, name: &str, container_id: &str) {
        self.entries
            .insert(name.to_string(), container_id.to_string());
        if let Err(e) = save_snapshot(&self.path, &self.entries) {
            log::warn!("Failed to persist container cache: {:#}", e);
        }
    }

    pub fn invalidate(&mut self, name: &str) {
        if self.entries.remove(name).is_some() {
            log::info!("Dropped stale container mapping for \"{}\"", name);
            if let Err(e) = save_snapshot(&self.path, &self.entries) {
                log::warn!("Failed to persist container cache: {:#}", e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn missing_files_start_empty() {
        let tmp = tempdir().unwrap();
        let dir = tmp.path().to_str().unwrap();
        let monitor = MonitoredChannels::load(dir);
        assert!(monitor.is_empty());
        let ledger = SyncLedger::load(dir);
        assert!(!ledger.is_synced("c1", "m1"));
        let cache = ContainerCache::load(dir);
        assert!(cache.get("general").is_none());
    }

    #[test]
    fn malformed_file_starts_empty() {
        let tmp = tempdir().unwrap();
        let dir = tmp.path().to_str().unwrap();
        std::fs::write(tmp.path().join(LEDGER_FILE), "{not json").unwrap();
        let ledger = SyncLedger::load(dir);
        assert!(!ledger.is_synced("c1", "m1"));
    }

    #[test]
    fn monitor_roundtrip_and_empty_guild_removal() {
        let tmp = tempdir().unwrap();
        let dir = tmp.path().to_str().unwrap();

        let mut monitor = MonitoredChannels::load(dir);
        assert!(monitor.add("g1", "c1"));
        assert!(!monitor.add("g1", "c1"));
        assert!(monitor.add("g1", "c2"));
        drop(monitor);

        let mut monitor = MonitoredChannels::load(dir);
        assert!(monitor.is_monitored("g1", "c1"));
        assert_eq!(monitor.channels("g1").len(), 2);

        assert!(monitor.remove("g1", "c1"));
        assert!(monitor.remove("g1", "c2"));
        assert!(!monitor.remove("g1", "c2"));
        // Guild entry must be gone, not empty
        assert!(monitor.is_empty());

        let monitor = MonitoredChannels::load(dir);
        assert!(monitor.is_empty());
    }

    #[test]
    fn ledger_mark_is_idempotent_and_persists_on_save() {
        let tmp = tempdir().unwrap();
        let dir = tmp.path().to_str().unwrap();

        let mut ledger = SyncLedger::load(dir);
        ledger.mark_synced("c1", "m1");
        ledger.mark_synced("c1", "m1");
        ledger.save().unwrap();

        let ledger = SyncLedger::load(dir);
        assert!(ledger.is_synced("c1", "m1"));
        assert!(!ledger.is_synced("c2", "m1"));
    }

    #[test]
    fn cache_set_get_invalidate() {
        let tmp = tempdir().unwrap();
        let dir = tmp.path().to_str().unwrap();

        let mut cache = ContainerCache::load(dir);
        cache.set("general", "folder-123");
        assert_eq!(cache.get("general"), Some("folder-123"));

        // set persists immediately
        let cache2 = ContainerCache::load(dir);
        assert_eq!(cache2.get("general"), Some("folder-123"));

        cache.invalidate("general");
        assert!(cache.get("general").is_none());
        let cache3 = ContainerCache::load(dir);
        assert!(cache3.get("general").is_none());
    }
}
