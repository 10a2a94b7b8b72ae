//! Platform seam
//!
//! Everything the coordinator needs from its host (display mode,
//! connectivity, install prompts, sharing) goes through [`Platform`], so the
//! coordinator itself never touches a real browser or OS.

use crate::error::TilawahResult;
use crate::registration::{LifecycleEvent, Registration};
use async_trait::async_trait;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// User's answer to an install prompt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallChoice {
    Accepted,
    Dismissed,
}

/// A captured install prompt; the platform invalidates it after one use
#[async_trait]
pub trait InstallPrompt: Send + Sync {
    async fn prompt(&self) -> TilawahResult<InstallChoice>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SharePayload {
    pub title: Option<String>,
    pub text: Option<String>,
    pub url: String,
}

impl SharePayload {
    pub fn url(url: impl Into<String>) -> Self {
        Self {
            title: None,
            text: None,
            url: url.into(),
        }
    }
}

/// Why native sharing did not happen
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ShareError {
    #[error("sharing is not supported on this platform")]
    Unsupported,

    #[error("share was cancelled")]
    Cancelled,

    #[error("share failed: {0}")]
    Failed(String),
}

/// Which share path, if any, succeeded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ShareOutcome {
    Shared,
    /// Native share unavailable or failed; the URL was copied instead
    Copied,
    Cancelled,
    Failed,
}

impl ShareOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Shared | Self::Copied)
    }
}

/// Events the platform delivers to the coordinator
#[derive(Clone)]
pub enum PlatformEvent {
    BeforeInstallPrompt(Arc<dyn InstallPrompt>),
    AppInstalled,
    Online,
    Offline,
    Lifecycle(LifecycleEvent),
}

impl fmt::Debug for PlatformEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BeforeInstallPrompt(_) => f.write_str("BeforeInstallPrompt"),
            Self::AppInstalled => f.write_str("AppInstalled"),
            Self::Online => f.write_str("Online"),
            Self::Offline => f.write_str("Offline"),
            Self::Lifecycle(event) => f.debug_tuple("Lifecycle").field(event).finish(),
        }
    }
}

#[async_trait]
pub trait Platform: Send + Sync + 'static {
    /// Whether the app already runs as an installed app
    fn is_standalone(&self) -> bool;

    fn is_online(&self) -> bool;

    /// Register the cache controller for this origin
    async fn register_controller(&self) -> TilawahResult<Arc<Registration>>;

    async fn share(&self, payload: &SharePayload) -> Result<(), ShareError>;

    async fn write_clipboard(&self, text: &str) -> TilawahResult<()>;
}
