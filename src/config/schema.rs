//! Configuration schema for Tilawah
//!
//! Configuration is stored at `~/.config/tilawah/config.toml`

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General settings
    pub general: GeneralConfig,

    /// Cache store naming and storage
    pub cache: CacheConfig,

    /// Request classification and install manifest
    pub routes: RoutesConfig,

    /// Upstream origin settings
    pub network: NetworkConfig,

    /// Controller lifecycle settings
    pub controller: ControllerConfig,

    /// Offline fallback settings
    pub offline: OfflineConfig,

    /// Background sync queue settings
    pub sync: SyncConfig,

    /// Front server settings
    pub server: ServerConfig,
}

/// General application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Enable verbose logging
    pub verbose: bool,

    /// Log format: "text" or "json"
    pub log_format: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            verbose: false,
            log_format: "text".to_string(),
        }
    }
}

/// Storage backend for cache stores
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// One directory per store under the state directory
    Disk,
    /// Process-local, lost on exit
    Memory,
}

/// Cache store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Base name of the static asset store
    pub static_store: String,

    /// Version suffix of the static asset store
    pub static_version: String,

    /// Base name of the API response store
    pub api_store: String,

    /// Version suffix of the API response store
    pub api_version: String,

    /// Storage backend
    pub backend: StorageBackend,

    /// Override for the disk cache directory
    pub dir: Option<PathBuf>,

    /// Per-entry max age for Cache-First lookups (unset = version-only eviction)
    pub max_age_secs: Option<u64>,
}

impl CacheConfig {
    /// Full name of the live static store, e.g. `indoquran-cache-v1`
    pub fn static_store_name(&self) -> String {
        format!("{}-{}", self.static_store, self.static_version)
    }

    /// Full name of the live API store, e.g. `indoquran-api-cache-v1`
    pub fn api_store_name(&self) -> String {
        format!("{}-{}", self.api_store, self.api_version)
    }

    /// Combined version label used to identify a controller build
    pub fn version_label(&self) -> String {
        if self.static_version == self.api_version {
            self.static_version.clone()
        } else {
            format!("{}+{}", self.static_version, self.api_version)
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            static_store: "indoquran-cache".to_string(),
            static_version: "v1".to_string(),
            api_store: "indoquran-api-cache".to_string(),
            api_version: "v1".to_string(),
            backend: StorageBackend::Disk,
            dir: None,
            max_age_secs: None,
        }
    }
}

/// Request classification and install manifest
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RoutesConfig {
    /// Paths starting with this prefix are API traffic
    pub api_prefix: String,

    /// Paths starting with this prefix are built static assets
    pub assets_prefix: String,

    /// File extensions (with leading dot) treated as static assets
    pub static_extensions: Vec<String>,

    /// Absolute paths cached at install time, in order
    pub manifest: Vec<String>,
}

impl Default for RoutesConfig {
    fn default() -> Self {
        let extensions = [
            ".css", ".js", ".woff2", ".woff", ".ttf", ".png", ".jpg", ".jpeg", ".gif", ".svg",
            ".webp", ".ico",
        ];
        let manifest = [
            "/",
            "/build/assets/app.css",
            "/build/assets/app.js",
            "/fonts/LPMQ-IsepMisbah.woff2",
            "/fonts/Amiri-Regular.woff2",
            "/images/header.png",
            "/favicon.ico",
        ];

        Self {
            api_prefix: "/api/".to_string(),
            assets_prefix: "/build/".to_string(),
            static_extensions: extensions.iter().map(|s| s.to_string()).collect(),
            manifest: manifest.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// Upstream origin settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Origin all requests are forwarded to
    pub upstream: String,

    /// Network-First timeout before falling back to cache (0 = no timeout)
    pub request_timeout_secs: u64,

    /// Seconds between connectivity probes while serving
    pub probe_interval_secs: u64,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            upstream: "http://127.0.0.1:8000".to_string(),
            request_timeout_secs: 10,
            probe_interval_secs: 15,
        }
    }
}

/// Controller lifecycle settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    /// Activate a freshly installed controller without waiting
    pub skip_waiting_on_install: bool,

    /// Registration scope
    pub scope: String,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            skip_waiting_on_install: true,
            scope: "/".to_string(),
        }
    }
}

/// Offline fallback settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OfflineConfig {
    /// Message placed in the offline JSON body
    pub message: String,
}

impl Default for OfflineConfig {
    fn default() -> Self {
        Self {
            message: "Koneksi internet tidak tersedia. Silakan coba lagi nanti.".to_string(),
        }
    }
}

/// Background sync queue settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Queue failed API requests for replay (credential headers are not stored)
    pub enabled: bool,

    /// Sync event tag that triggers replay
    pub tag: String,

    /// Drop an entry after this many failed replays (0 = never)
    pub max_attempts: u32,

    /// Keep at most this many pending requests, dropping the oldest (0 = no cap)
    pub max_entries: usize,

    /// Override for the queue file location
    pub path: Option<PathBuf>,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            tag: "sync-data".to_string(),
            max_attempts: 5,
            max_entries: 200,
            path: None,
        }
    }
}

/// Front server settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Interface to bind
    pub interface: String,

    /// Port to bind
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            interface: "127.0.0.1".to_string(),
            port: 8080,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let config = Config::default();
        let toml = toml::to_string_pretty(&config).unwrap();
        assert!(toml.contains("[cache]"));
        assert!(toml.contains("[routes]"));
    }

    #[test]
    fn config_deserializes_empty() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.cache.static_store_name(), "indoquran-cache-v1");
        assert_eq!(config.cache.api_store_name(), "indoquran-api-cache-v1");
    }

    #[test]
    fn config_deserializes_partial() {
        let toml = r#"
            [cache]
            static_version = "v2"
            backend = "memory"
        "#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.cache.static_store_name(), "indoquran-cache-v2");
        assert_eq!(config.cache.backend, StorageBackend::Memory);
        assert_eq!(config.routes.api_prefix, "/api/"); // default preserved
    }

    #[test]
    fn version_label_merges_distinct_versions() {
        let mut cache = CacheConfig::default();
        assert_eq!(cache.version_label(), "v1");
        cache.api_version = "v3".to_string();
        assert_eq!(cache.version_label(), "v1+v3");
    }
}
