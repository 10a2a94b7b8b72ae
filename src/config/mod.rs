//! Configuration management for Tilawah

pub mod schema;

pub use schema::{Config, StorageBackend};

use crate::error::{TilawahError, TilawahResult};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info};

/// Configuration manager
pub struct ConfigManager {
    config_path: PathBuf,
}

impl ConfigManager {
    /// Create a new config manager with default path
    pub fn new() -> Self {
        Self {
            config_path: Self::default_config_path(),
        }
    }

    /// Create a config manager with a custom path
    pub fn with_path(path: PathBuf) -> Self {
        Self { config_path: path }
    }

    /// Get the default config file path
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("tilawah")
            .join("config.toml")
    }

    /// Get the state directory path
    pub fn state_dir() -> PathBuf {
        dirs::state_dir()
            .or_else(dirs::data_local_dir)
            .unwrap_or_else(|| PathBuf::from("."))
            .join("tilawah")
    }

    /// Directory holding one subdirectory per cache store
    pub fn caches_dir(config: &Config) -> PathBuf {
        config
            .cache
            .dir
            .clone()
            .unwrap_or_else(|| Self::state_dir().join("caches"))
    }

    /// Location of the durable sync queue
    pub fn sync_queue_path(config: &Config) -> PathBuf {
        config
            .sync
            .path
            .clone()
            .unwrap_or_else(|| Self::state_dir().join("sync-queue.json"))
    }

    /// Load configuration, using defaults if the file does not exist
    pub async fn load(&self) -> TilawahResult<Config> {
        if !self.config_path.exists() {
            debug!("Config file not found, using defaults");
            return Ok(Config::default());
        }

        self.load_from_file(&self.config_path).await
    }

    /// Load configuration from a specific file
    pub async fn load_from_file(&self, path: &Path) -> TilawahResult<Config> {
        let content = fs::read_to_string(path)
            .await
            .map_err(|e| TilawahError::io(format!("reading config from {}", path.display()), e))?;

        toml::from_str(&content).map_err(|e| TilawahError::ConfigInvalid {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    /// Save configuration to file
    pub async fn save(&self, config: &Config) -> TilawahResult<()> {
        self.ensure_config_dir().await?;

        let content = toml::to_string_pretty(config)?;
        fs::write(&self.config_path, content).await.map_err(|e| {
            TilawahError::io(
                format!("writing config to {}", self.config_path.display()),
                e,
            )
        })?;

        info!("Configuration saved to {}", self.config_path.display());
        Ok(())
    }

    /// Ensure the config directory exists
    async fn ensure_config_dir(&self) -> TilawahResult<()> {
        if let Some(parent) = self.config_path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| TilawahError::ConfigDirCreate {
                    path: parent.to_path_buf(),
                    source: e,
                })?;
        }
        Ok(())
    }

    /// Ensure the state directories used by this configuration exist
    pub async fn ensure_state_dirs(config: &Config) -> TilawahResult<()> {
        let mut dirs = vec![Self::state_dir()];
        if config.cache.backend == StorageBackend::Disk {
            dirs.push(Self::caches_dir(config));
        }
        if let Some(parent) = Self::sync_queue_path(config).parent() {
            dirs.push(parent.to_path_buf());
        }

        for dir in &dirs {
            fs::create_dir_all(dir).await.map_err(|e| {
                TilawahError::io(format!("creating directory {}", dir.display()), e)
            })?;
        }

        Ok(())
    }

    /// Get the config file path
    pub fn path(&self) -> &Path {
        &self.config_path
    }
}

impl Default for ConfigManager {
    fn default() -> Self {
        Self::new()
    }
}
