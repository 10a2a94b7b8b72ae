//! Builds the storage, network and controller pieces from configuration

use crate::config::{Config, ConfigManager, StorageBackend};
use crate::controller::{CacheController, ControllerSettings};
use crate::error::TilawahResult;
use crate::fetch::{Fetcher, UpstreamFetcher};
use crate::store::{CacheStorage, DiskStorage, MemoryStorage};
use crate::sync::SyncQueue;
use std::sync::Arc;
use tracing::debug;

/// Create the configured store backend
pub fn create_storage(config: &Config) -> Arc<dyn CacheStorage> {
    match config.cache.backend {
        StorageBackend::Disk => {
            let root = ConfigManager::caches_dir(config);
            debug!("Using disk stores under {}", root.display());
            Arc::new(DiskStorage::new(root))
        }
        StorageBackend::Memory => Arc::new(MemoryStorage::new()),
    }
}

/// Create the fetcher for the configured upstream origin
pub fn create_fetcher(config: &Config) -> TilawahResult<Arc<dyn Fetcher>> {
    Ok(Arc::new(UpstreamFetcher::new(&config.network.upstream)?))
}

/// Open the sync queue, or `None` when background sync is disabled
///
/// The memory backend gets a queue that is never persisted.
pub async fn open_sync_queue(config: &Config) -> TilawahResult<Option<Arc<SyncQueue>>> {
    if !config.sync.enabled {
        return Ok(None);
    }

    let queue = match config.cache.backend {
        StorageBackend::Memory => SyncQueue::in_memory(config.sync.max_attempts),
        StorageBackend::Disk => {
            SyncQueue::open(ConfigManager::sync_queue_path(config), config.sync.max_attempts)
                .await?
        }
    };
    Ok(Some(Arc::new(queue.with_max_entries(config.sync.max_entries))))
}

/// Shared pieces every controller version is built on
#[derive(Clone)]
pub struct Components {
    pub storage: Arc<dyn CacheStorage>,
    pub fetcher: Arc<dyn Fetcher>,
    pub sync_queue: Option<Arc<SyncQueue>>,
}

impl Components {
    pub async fn from_config(config: &Config) -> TilawahResult<Self> {
        Ok(Self {
            storage: create_storage(config),
            fetcher: create_fetcher(config)?,
            sync_queue: open_sync_queue(config).await?,
        })
    }

    /// A fresh controller for the versions named in `config`
    pub fn controller(&self, config: &Config) -> Arc<CacheController> {
        let controller = CacheController::new(
            ControllerSettings::from_config(config),
            self.storage.clone(),
            self.fetcher.clone(),
        );
        Arc::new(match &self.sync_queue {
            Some(queue) => controller.with_sync_queue(queue.clone()),
            None => controller,
        })
    }
}
