//! Error types for Tilawah
//!
//! All modules use `TilawahResult<T>` as their return type.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for Tilawah operations
pub type TilawahResult<T> = Result<T, TilawahError>;

/// All errors that can occur in Tilawah
#[derive(Error, Debug)]
pub enum TilawahError {
    // Network errors
    #[error("Network unavailable for {url}: {reason}")]
    NetworkUnavailable { url: String, reason: String },

    #[error("Request to {url} timed out after {timeout_secs}s")]
    NetworkTimeout { url: String, timeout_secs: u64 },

    #[error("Invalid upstream origin: {0}")]
    UpstreamInvalid(String),

    // Controller lifecycle errors
    #[error("Install failed while caching {url}: {reason}")]
    InstallFailed { url: String, reason: String },

    #[error("Controller {version} cannot move from {from} to {to}")]
    InvalidTransition {
        version: String,
        from: String,
        to: String,
    },

    #[error("Controller registration failed: {0}")]
    RegistrationFailed(String),

    #[error("No waiting controller to activate")]
    NoWaitingController,

    // Store errors
    #[error("Cache store not found: {0}")]
    StoreNotFound(String),

    #[error("Corrupt cache entry {path}: {reason}")]
    StoreCorrupt { path: PathBuf, reason: String },

    // Sync queue errors
    #[error("Failed to persist sync queue: {0}")]
    SyncPersist(String),

    // Platform errors
    #[error("Clipboard unavailable: {0}")]
    Clipboard(String),

    // Configuration errors
    #[error("Invalid configuration at {path}: {reason}")]
    ConfigInvalid { path: PathBuf, reason: String },

    #[error("Failed to create config directory {path}: {source}")]
    ConfigDirCreate {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // Server errors
    #[error("Failed to bind {addr}: {reason}")]
    ServerBind { addr: String, reason: String },

    // IO errors
    #[error("IO error: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    // Serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    // General errors
    #[error("Internal error: {0}")]
    Internal(String),

    #[error("{0}")]
    User(String),
}

impl TilawahError {
    /// Create an IO error with context
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Create a network-unavailable error
    pub fn network(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::NetworkUnavailable {
            url: url.into(),
            reason: reason.into(),
        }
    }

    /// Whether this error means the network could not deliver a response
    pub fn is_network_failure(&self) -> bool {
        matches!(
            self,
            Self::NetworkUnavailable { .. } | Self::NetworkTimeout { .. }
        )
    }

    /// Get actionable hint for the error
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::NetworkUnavailable { .. } => Some("Check that the upstream origin is reachable"),
            Self::InstallFailed { .. } => {
                Some("Every manifest asset must be fetchable. Fix the manifest and run: tilawah install")
            }
            Self::UpstreamInvalid(_) => Some("Set network.upstream to an http:// or https:// origin"),
            Self::ConfigInvalid { .. } => {
                Some("Fix the file or reset it with: tilawah config init --force")
            }
            _ => None,
        }
    }
}
