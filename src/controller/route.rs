//! Request classification

use crate::config::Config;
use crate::fetch::Request;

/// Where a request is dispatched
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// Network-First against the api store
    Api,
    /// Cache-First against the static store
    StaticAsset,
    /// Network-First against the static store
    Navigation,
    /// Forwarded untouched
    Passthrough,
}

/// Prefix and suffix rules used to pick a [`Route`]
#[derive(Debug, Clone)]
pub struct RouteTable {
    api_prefix: String,
    assets_prefix: String,
    static_extensions: Vec<String>,
}

impl RouteTable {
    pub fn new(
        api_prefix: impl Into<String>,
        assets_prefix: impl Into<String>,
        static_extensions: Vec<String>,
    ) -> Self {
        Self {
            api_prefix: api_prefix.into(),
            assets_prefix: assets_prefix.into(),
            static_extensions,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.routes.api_prefix.clone(),
            config.routes.assets_prefix.clone(),
            config.routes.static_extensions.clone(),
        )
    }

    /// API prefix wins over everything, regardless of method
    pub fn classify(&self, request: &Request) -> Route {
        let path = request.path();
        if self.is_api(path) {
            Route::Api
        } else if self.is_static_asset(path) {
            Route::StaticAsset
        } else if request.is_navigation() {
            Route::Navigation
        } else {
            Route::Passthrough
        }
    }

    pub fn is_api(&self, path: &str) -> bool {
        path.starts_with(&self.api_prefix)
    }

    /// Suffix or prefix test on the path; content is never inspected
    pub fn is_static_asset(&self, path: &str) -> bool {
        self.static_extensions.iter().any(|ext| path.ends_with(ext.as_str()))
            || path.starts_with(&self.assets_prefix)
    }
}

impl Default for RouteTable {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}
