//! Remote media store capability.
//!
//! Both backends (Drive folders, Photos albums) expose the same surface:
//! find a container by display name, create one, upload bytes into one.
//! Errors are structured: the orchestrator's stale-container self-heal keys
//! on [`VaultError::ContainerNotFound`], which only the adapter decides.

pub mod auth;
pub mod gdrive;
pub mod gphotos;
pub mod resolver;

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum VaultError {
    /// The given container id is no longer recognized by the remote service.
    /// Consumers treat this as a cache-invalidation trigger, not a failure.
    #[error("container {0} no longer exists on the remote service")]
    ContainerNotFound(String),

    #[error("authentication failed: {0}")]
    Auth(String),

    #[error("remote service rejected the request: {0}")]
    Api(String),

    #[error("media item too large: {size} bytes (max {max})")]
    TooLarge { size: usize, max: usize },

    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

pub type VaultResult<T> = Result<T, VaultError>;

/// How a backend wants its upload queue driven.
#[derive(Debug, Clone, Copy)]
pub struct UploadPolicy {
    /// Number of uploads in flight per batch. 1 means strictly serial.
    pub width: usize,
    /// Pause between batches. Zero for backends that tolerate sustained load.
    pub pause: Duration,
}

impl UploadPolicy {
    pub fn serial(pause: Duration) -> Self {
        UploadPolicy { width: 1, pause }
    }
}

impl Default for UploadPolicy {
    fn default() -> Self {
        UploadPolicy {
            width: 3,
            pause: Duration::ZERO,
        }
    }
}

/// An opaque upload/find-or-create capability over a cloud media store.
#[async_trait]
pub trait MediaStore: Send + Sync {
    /// Human-readable backend name for logs and summaries.
    fn name(&self) -> &'static str;

    /// How this backend's rate limits want uploads paced.
    fn upload_policy(&self) -> UploadPolicy;

    /// Find a container whose display name equals `name`. Backends that are
    /// not allowed to list return `Ok(None)` and let the caller create.
    async fn find_by_name(&self, name: &str) -> VaultResult<Option<String>>;

    /// Create a container named `name`, returning its id.
    async fn create(&self, name: &str) -> VaultResult<String>;

    /// Upload one media item into `container_id`; returns a public link.
    async fn upload(
        &self,
        bytes: &[u8],
        file_name: &str,
        container_id: &str,
        mime_type: &str,
    ) -> VaultResult<String>;

    /// Connectivity probe; returns a short identity/context description.
    async fn verify(&self) -> VaultResult<String>;
}
