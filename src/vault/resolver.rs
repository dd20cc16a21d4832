//! Destination resolution: logical name → remote container id.
//!
//! Cache-first. A miss (or `force_fresh`) searches the remote store by
//! display name, falling back to creation when search is unsupported or
//! empty-handed. Ids in the cache are only *believed* valid; upload-time
//! `ContainerNotFound` failures invalidate and re-resolve rather than fail.

use super::{MediaStore, VaultResult};
use crate::store::ContainerCache;
use std::sync::Arc;
use tokio::sync::Mutex;

pub struct ContainerResolver {
    vault: Arc<dyn MediaStore>,
    // Async mutex: concurrent batch tasks may heal the same entry mid-run
    cache: Mutex<ContainerCache>,
}

impl ContainerResolver {
    pub fn new(vault: Arc<dyn MediaStore>, cache: ContainerCache) -> Self {
        ContainerResolver {
            vault,
            cache: Mutex::new(cache),
        }
    }

    /// Resolve `name` to a container id. With `force_fresh` the cache is
    /// bypassed (and overwritten by the outcome).
    pub async fn resolve(&self, name: &str, force_fresh: bool) -> VaultResult<String> {
        if !force_fresh {
            let cache = self.cache.lock().await;
            if let Some(id) = cache.get(name) {
                log::debug!("Container cache hit for \"{}\"", name);
                return Ok(id.to_string());
            }
        }

        if let Some(id) = self.vault.find_by_name(name).await? {
            log::info!("Found existing container \"{}\" ({})", name, id);
            self.cache.lock().await.set(name, &id);
            return Ok(id);
        }

        let id = self.vault.create(name).await?;
        self.cache.lock().await.set(name, &id);
        Ok(id)
    }

    /// Drop a cached mapping after the remote store reported it stale.
    pub async fn invalidate(&self, name: &str) {
        self.cache.lock().await.invalidate(name);
    }
}
