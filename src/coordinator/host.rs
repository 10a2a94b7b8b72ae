//! Platform used when running as a local caching front

use super::platform::{Platform, SharePayload, ShareError};
use crate::config::Config;
use crate::error::{TilawahError, TilawahResult};
use crate::factory::Components;
use crate::registration::Registration;
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::warn;

/// A headless host: no app shell, no share sheet, no clipboard
pub struct HostPlatform {
    config: Config,
    components: Components,
    online: AtomicBool,
}

impl HostPlatform {
    pub fn new(config: Config, components: Components) -> Self {
        Self {
            config,
            components,
            online: AtomicBool::new(true),
        }
    }

    /// Connectivity reported at startup
    pub fn with_online(self, online: bool) -> Self {
        self.online.store(online, Ordering::SeqCst);
        self
    }

    pub fn components(&self) -> &Components {
        &self.components
    }
}

#[async_trait]
impl Platform for HostPlatform {
    fn is_standalone(&self) -> bool {
        false
    }

    fn is_online(&self) -> bool {
        self.online.load(Ordering::SeqCst)
    }

    /// Install the configured version, or fall back to the copy a previous
    /// run left on disk when the upstream cannot be reached
    async fn register_controller(&self) -> TilawahResult<Arc<Registration>> {
        let registration = Registration::new(
            self.config.controller.scope.clone(),
            self.components.fetcher.clone(),
        );
        let Err(install_err) = registration
            .register(self.components.controller(&self.config))
            .await
        else {
            return Ok(registration);
        };

        let restored = registration
            .restore(self.components.controller(&self.config))
            .await
            .map_err(|e| TilawahError::RegistrationFailed(e.to_string()))?;
        if !restored {
            return Err(TilawahError::RegistrationFailed(install_err.to_string()));
        }
        warn!(
            "Install of {} failed, serving the cached copy: {}",
            self.config.cache.version_label(),
            install_err
        );
        Ok(registration)
    }

    async fn share(&self, _payload: &SharePayload) -> Result<(), ShareError> {
        Err(ShareError::Unsupported)
    }

    async fn write_clipboard(&self, _text: &str) -> TilawahResult<()> {
        Err(TilawahError::Clipboard(
            "no clipboard on a headless host".to_string(),
        ))
    }
}
