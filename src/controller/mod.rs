//! Cache controller
//!
//! The controller sits between clients and the upstream origin. Every request
//! is classified by [`RouteTable`] and answered with one of two strategies:
//!
//! | Route | Strategy | Store |
//! |-------|----------|-------|
//! | API prefix | Network-First | api |
//! | static asset | Cache-First | static |
//! | navigation | Network-First | static |
//! | anything else | passthrough | none |
//!
//! A controller instance corresponds to one version of the store names. It
//! moves through [`WorkerState`] as it is installed, activated and finally
//! superseded.

mod offline;
mod route;
mod strategy;

pub use offline::{offline_response, OfflineBody, OFFLINE_STATUS};
pub use route::{Route, RouteTable};
pub use strategy::{fetch_with_timeout, Served, Source, Strategy};

use crate::config::Config;
use crate::error::{TilawahError, TilawahResult};
use crate::fetch::{Fetcher, Method, Request, Response};
use crate::store::CacheStorage;
use crate::sync::{ReplayOutcome, SyncQueue};
use futures_util::future::try_join_all;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// Lifecycle of one controller version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkerState {
    Installing,
    /// Installed and waiting for activation
    Installed,
    Activating,
    Activated,
    /// Failed to install or superseded
    Redundant,
}

impl WorkerState {
    pub fn can_transition_to(self, next: WorkerState) -> bool {
        use WorkerState::*;
        matches!(
            (self, next),
            (Installing, Installed)
                | (Installed, Activating)
                | (Activating, Activated)
                | (Installing | Installed | Activating | Activated, Redundant)
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Installing => "installing",
            Self::Installed => "installed",
            Self::Activating => "activating",
            Self::Activated => "activated",
            Self::Redundant => "redundant",
        }
    }
}

impl fmt::Display for WorkerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Messages a client posts to a controller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ControlMessage {
    /// Activate without waiting for existing clients to go away
    SkipWaiting,
}

/// Names of the two live stores
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoreNames {
    pub static_store: String,
    pub api_store: String,
}

impl StoreNames {
    pub fn contains(&self, name: &str) -> bool {
        name == self.static_store || name == self.api_store
    }
}

/// Everything a controller needs besides its storage and network
#[derive(Debug, Clone)]
pub struct ControllerSettings {
    pub version: String,
    pub stores: StoreNames,
    pub routes: RouteTable,
    pub manifest: Vec<String>,
    pub offline_message: String,
    pub request_timeout: Option<Duration>,
    pub max_age: Option<chrono::Duration>,
    pub skip_waiting_on_install: bool,
    pub sync_tag: String,
}

impl ControllerSettings {
    pub fn from_config(config: &Config) -> Self {
        let timeout_secs = config.network.request_timeout_secs;
        Self {
            version: config.cache.version_label(),
            stores: StoreNames {
                static_store: config.cache.static_store_name(),
                api_store: config.cache.api_store_name(),
            },
            routes: RouteTable::from_config(config),
            manifest: config.routes.manifest.clone(),
            offline_message: config.offline.message.clone(),
            request_timeout: (timeout_secs > 0).then(|| Duration::from_secs(timeout_secs)),
            max_age: config
                .cache
                .max_age_secs
                .and_then(|secs| i64::try_from(secs).ok())
                .map(chrono::Duration::seconds),
            skip_waiting_on_install: config.controller.skip_waiting_on_install,
            sync_tag: config.sync.tag.clone(),
        }
    }
}

/// One version of the caching front
pub struct CacheController {
    settings: ControllerSettings,
    storage: Arc<dyn CacheStorage>,
    fetcher: Arc<dyn Fetcher>,
    sync_queue: Option<Arc<SyncQueue>>,
    state: watch::Sender<WorkerState>,
    skip_waiting: AtomicBool,
    clients_claimed: AtomicBool,
}

impl CacheController {
    pub fn new(
        settings: ControllerSettings,
        storage: Arc<dyn CacheStorage>,
        fetcher: Arc<dyn Fetcher>,
    ) -> Self {
        let (state, _) = watch::channel(WorkerState::Installing);
        Self {
            settings,
            storage,
            fetcher,
            sync_queue: None,
            state,
            skip_waiting: AtomicBool::new(false),
            clients_claimed: AtomicBool::new(false),
        }
    }

    /// Queue API requests that fail at the network for later replay
    pub fn with_sync_queue(mut self, queue: Arc<SyncQueue>) -> Self {
        self.sync_queue = Some(queue);
        self
    }

    pub fn version(&self) -> &str {
        &self.settings.version
    }

    pub fn settings(&self) -> &ControllerSettings {
        &self.settings
    }

    pub fn store_names(&self) -> &StoreNames {
        &self.settings.stores
    }

    pub fn sync_queue(&self) -> Option<&Arc<SyncQueue>> {
        self.sync_queue.as_ref()
    }

    pub fn state(&self) -> WorkerState {
        *self.state.borrow()
    }

    pub fn watch_state(&self) -> watch::Receiver<WorkerState> {
        self.state.subscribe()
    }

    pub fn skip_waiting_requested(&self) -> bool {
        self.skip_waiting.load(Ordering::SeqCst)
    }

    pub fn clients_claimed(&self) -> bool {
        self.clients_claimed.load(Ordering::SeqCst)
    }

    fn transition(&self, next: WorkerState) -> TilawahResult<()> {
        let mut result = Ok(());
        self.state.send_if_modified(|state| {
            if state.can_transition_to(next) {
                debug!("Controller {}: {} -> {}", self.settings.version, state, next);
                *state = next;
                true
            } else {
                result = Err(TilawahError::InvalidTransition {
                    version: self.settings.version.clone(),
                    from: state.to_string(),
                    to: next.to_string(),
                });
                false
            }
        });
        result
    }

    /// Superseded or failed; a redundant controller is never used again
    pub fn mark_redundant(&self) {
        if self.state() != WorkerState::Redundant {
            // every live state may become redundant
            let _ = self.transition(WorkerState::Redundant);
        }
    }

    /// Precache the manifest into the static store
    ///
    /// Every asset is fetched before anything is written: one failed or
    /// non-success fetch fails the install and leaves the store untouched.
    pub async fn install(&self) -> TilawahResult<()> {
        if self.state() != WorkerState::Installing {
            return Err(TilawahError::InvalidTransition {
                version: self.settings.version.clone(),
                from: self.state().to_string(),
                to: WorkerState::Installed.to_string(),
            });
        }

        let store = &self.settings.stores.static_store;
        info!(
            "Installing controller {} ({} assets into {})",
            self.settings.version,
            self.settings.manifest.len(),
            store
        );

        if let Err(err) = self.precache(store).await {
            warn!("Install of controller {} failed: {}", self.settings.version, err);
            self.mark_redundant();
            return Err(err);
        }

        if self.settings.skip_waiting_on_install {
            self.skip_waiting.store(true, Ordering::SeqCst);
        }
        self.transition(WorkerState::Installed)
    }

    /// Mark this version installed from a static store left by an earlier
    /// run, without fetching anything
    ///
    /// Returns `false` when the store does not exist; the controller then
    /// stays installing.
    pub async fn restore(&self) -> TilawahResult<bool> {
        if self.state() != WorkerState::Installing {
            return Err(TilawahError::InvalidTransition {
                version: self.settings.version.clone(),
                from: self.state().to_string(),
                to: WorkerState::Installed.to_string(),
            });
        }
        if !self.storage.has(&self.settings.stores.static_store).await? {
            return Ok(false);
        }

        if self.settings.skip_waiting_on_install {
            self.skip_waiting.store(true, Ordering::SeqCst);
        }
        self.transition(WorkerState::Installed)?;
        Ok(true)
    }

    async fn precache(&self, store: &str) -> TilawahResult<()> {
        let fetcher = self.fetcher.as_ref();
        let timeout = self.settings.request_timeout;

        let fetches = self.settings.manifest.iter().map(|url| async move {
            let request = Request::get(url.as_str());
            let response = fetch_with_timeout(fetcher, &request, timeout)
                .await
                .map_err(|e| TilawahError::InstallFailed {
                    url: url.clone(),
                    reason: e.to_string(),
                })?;
            if !response.ok() {
                return Err(TilawahError::InstallFailed {
                    url: url.clone(),
                    reason: format!("upstream answered {}", response.status),
                });
            }
            Ok((request, response))
        });

        let entries = try_join_all(fetches).await?;
        self.storage.open(store).await?;
        self.storage.put_all(store, &entries).await
    }

    /// Delete every store that is not one of the live names
    ///
    /// Returns the deleted names. Clients are claimed once cleanup finishes.
    pub async fn activate(&self) -> TilawahResult<Vec<String>> {
        self.transition(WorkerState::Activating)?;
        let deleted = self.evict_stale().await?;
        self.transition(WorkerState::Activated)?;
        self.clients_claimed.store(true, Ordering::SeqCst);
        info!("Controller {} activated", self.settings.version);
        Ok(deleted)
    }

    /// Delete stores whose names do not match this version, without any
    /// state change
    pub async fn evict_stale(&self) -> TilawahResult<Vec<String>> {
        let mut deleted = vec![];
        for name in self.storage.keys().await? {
            if self.settings.stores.contains(&name) {
                continue;
            }
            if self.storage.delete(&name).await? {
                info!("Deleted old cache store {}", name);
                deleted.push(name);
            }
        }
        Ok(deleted)
    }

    fn strategy(&self) -> Strategy<'_> {
        Strategy {
            storage: self.storage.as_ref(),
            fetcher: self.fetcher.as_ref(),
            timeout: self.settings.request_timeout,
            max_age: self.settings.max_age,
        }
    }

    /// Answer one intercepted request
    pub async fn handle_fetch(&self, request: &Request) -> TilawahResult<Response> {
        let route = self.settings.routes.classify(request);
        debug!("{} {} -> {:?}", request.method, request.url, route);

        let stores = &self.settings.stores;
        match route {
            Route::Api => self.handle_api(request).await,
            Route::StaticAsset => Ok(self
                .strategy()
                .cache_first(&stores.static_store, request)
                .await?
                .response),
            Route::Navigation => Ok(self
                .strategy()
                .network_first(&stores.static_store, request)
                .await?
                .response),
            Route::Passthrough => self.fetcher.fetch(request).await,
        }
    }

    async fn handle_api(&self, request: &Request) -> TilawahResult<Response> {
        match self
            .strategy()
            .network_first(&self.settings.stores.api_store, request)
            .await
        {
            // served from the api store: not queued
            Ok(served) => Ok(served.response),
            Err(err) if err.is_network_failure() => {
                self.defer(request).await;
                offline_response(&self.settings.offline_message)
            }
            Err(err) => Err(err),
        }
    }

    async fn defer(&self, request: &Request) {
        let Some(queue) = &self.sync_queue else {
            return;
        };
        if let Err(e) = queue.enqueue(request).await {
            warn!("Could not queue {} for sync: {}", request.url, e);
        }
    }

    /// Handle a background sync event
    ///
    /// Only the configured tag replays the queue; other tags are ignored.
    pub async fn handle_sync(&self, tag: &str) -> TilawahResult<Option<ReplayOutcome>> {
        if tag != self.settings.sync_tag {
            debug!("Ignoring sync event with unknown tag {}", tag);
            return Ok(None);
        }
        let Some(queue) = &self.sync_queue else {
            info!("Sync event {} received but background sync is disabled", tag);
            return Ok(None);
        };

        let outcome = queue.replay(self.fetcher.as_ref()).await?;
        let api_store = &self.settings.stores.api_store;
        for delivered in &outcome.delivered {
            let request = delivered.request.to_request();
            if request.method == Method::Get && delivered.response.ok() {
                if let Err(e) = self.storage.put(api_store, &request, &delivered.response).await {
                    warn!("Failed to refresh {} after sync: {}", request.url, e);
                }
            }
        }
        Ok(Some(outcome))
    }

    pub fn handle_message(&self, message: ControlMessage) {
        match message {
            ControlMessage::SkipWaiting => {
                debug!("Controller {} asked to skip waiting", self.settings.version);
                self.skip_waiting.store(true, Ordering::SeqCst);
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::store::MemoryStorage;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Upstream double: answers from a fixed table, or fails every request
    /// while offline. Records every URL it was asked for.
    #[derive(Default)]
    pub(crate) struct ScriptedFetcher {
        routes: Mutex<HashMap<String, (u16, String)>>,
        offline: AtomicBool,
        calls: Mutex<Vec<String>>,
    }

    impl ScriptedFetcher {
        pub(crate) fn new() -> Arc<Self> {
            Arc::new(Self::default())
        }

        pub(crate) fn serve(&self, url: &str, status: u16, body: &str) {
            self.routes
                .lock()
                .unwrap()
                .insert(url.to_string(), (status, body.to_string()));
        }

        pub(crate) fn serve_manifest(&self) {
            for url in Config::default().routes.manifest {
                self.serve(&url, 200, &format!("asset {}", url));
            }
        }

        pub(crate) fn set_offline(&self, offline: bool) {
            self.offline.store(offline, Ordering::SeqCst);
        }

        pub(crate) fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }

        pub(crate) fn reset_calls(&self) {
            self.calls.lock().unwrap().clear();
        }
    }

    #[async_trait]
    impl Fetcher for ScriptedFetcher {
        async fn fetch(&self, request: &Request) -> TilawahResult<Response> {
            self.calls.lock().unwrap().push(request.url.clone());
            if self.offline.load(Ordering::SeqCst) {
                return Err(TilawahError::network(&request.url, "offline"));
            }
            let routes = self.routes.lock().unwrap();
            Ok(match routes.get(&request.url) {
                Some((status, body)) => Response::new(*status, body.as_str()),
                None => Response::new(404, "not found"),
            })
        }
    }

    pub(crate) fn settings_for(static_version: &str, api_version: &str) -> ControllerSettings {
        let mut config = Config::default();
        config.cache.static_version = static_version.to_string();
        config.cache.api_version = api_version.to_string();
        ControllerSettings::from_config(&config)
    }

    fn controller(fetcher: &Arc<ScriptedFetcher>) -> (CacheController, Arc<MemoryStorage>) {
        let storage = Arc::new(MemoryStorage::new());
        let controller =
            CacheController::new(settings_for("v1", "v1"), storage.clone(), fetcher.clone());
        (controller, storage)
    }

    async fn installed(fetcher: &Arc<ScriptedFetcher>) -> (CacheController, Arc<MemoryStorage>) {
        fetcher.serve_manifest();
        let (controller, storage) = controller(fetcher);
        controller.install().await.unwrap();
        controller.activate().await.unwrap();
        fetcher.reset_calls();
        (controller, storage)
    }

    async fn store_keys(storage: &MemoryStorage, store: &str) -> Vec<String> {
        storage
            .entries(store)
            .await
            .unwrap()
            .into_iter()
            .map(|e| e.key)
            .collect()
    }

    #[test]
    fn skip_waiting_wire_format() {
        let json = serde_json::to_string(&ControlMessage::SkipWaiting).unwrap();
        assert_eq!(json, r#"{"type":"SKIP_WAITING"}"#);
        let parsed: ControlMessage = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, ControlMessage::SkipWaiting);
    }

    #[test]
    fn state_machine_edges() {
        use WorkerState::*;
        assert!(Installing.can_transition_to(Installed));
        assert!(Activated.can_transition_to(Redundant));
        assert!(!Installing.can_transition_to(Activated));
        assert!(!Redundant.can_transition_to(Installing));
        assert!(!Activated.can_transition_to(Installed));
    }

    #[test]
    fn zero_timeout_disables_deadline() {
        let mut config = Config::default();
        config.network.request_timeout_secs = 0;
        assert!(ControllerSettings::from_config(&config).request_timeout.is_none());
        let defaults = ControllerSettings::from_config(&Config::default());
        assert_eq!(defaults.request_timeout, Some(Duration::from_secs(10)));
    }

    #[tokio::test]
    async fn install_precaches_manifest() {
        let fetcher = ScriptedFetcher::new();
        fetcher.serve_manifest();
        let (controller, storage) = controller(&fetcher);

        controller.install().await.unwrap();

        assert_eq!(controller.state(), WorkerState::Installed);
        assert!(controller.skip_waiting_requested());
        let keys = store_keys(&storage, "indoquran-cache-v1").await;
        assert_eq!(keys.len(), Config::default().routes.manifest.len());
        assert!(keys.contains(&"GET /fonts/Amiri-Regular.woff2".to_string()));
    }

    #[tokio::test]
    async fn install_is_all_or_nothing() {
        let fetcher = ScriptedFetcher::new();
        fetcher.serve_manifest();
        fetcher.serve("/favicon.ico", 404, "gone");
        let (controller, storage) = controller(&fetcher);

        let err = controller.install().await.unwrap_err();
        assert!(matches!(err, TilawahError::InstallFailed { ref url, .. } if url == "/favicon.ico"));
        assert_eq!(controller.state(), WorkerState::Redundant);
        assert!(store_keys(&storage, "indoquran-cache-v1").await.is_empty());
    }

    #[tokio::test]
    async fn install_fails_when_offline() {
        let fetcher = ScriptedFetcher::new();
        fetcher.set_offline(true);
        let (controller, _) = controller(&fetcher);

        assert!(controller.install().await.is_err());
        assert!(controller.activate().await.is_err());
    }

    #[tokio::test]
    async fn restore_needs_existing_static_store() {
        let fetcher = ScriptedFetcher::new();
        fetcher.set_offline(true);
        let (controller, storage) = controller(&fetcher);
        assert!(!controller.restore().await.unwrap());
        assert_eq!(controller.state(), WorkerState::Installing);

        storage
            .put("indoquran-cache-v1", &Request::get("/"), &Response::new(200, "shell"))
            .await
            .unwrap();
        assert!(controller.restore().await.unwrap());
        assert_eq!(controller.state(), WorkerState::Installed);
        assert!(fetcher.calls().is_empty());
        assert!(controller.restore().await.is_err());
    }

    #[tokio::test]
    async fn activate_requires_install() {
        let fetcher = ScriptedFetcher::new();
        let (controller, _) = controller(&fetcher);
        assert!(matches!(
            controller.activate().await,
            Err(TilawahError::InvalidTransition { .. })
        ));
    }

    #[tokio::test]
    async fn api_network_first_stores_live_response() {
        let fetcher = ScriptedFetcher::new();
        let (controller, storage) = installed(&fetcher).await;
        let request = Request::get("/api/surahs");
        storage
            .put("indoquran-api-cache-v1", &request, &Response::new(200, "stale"))
            .await
            .unwrap();
        fetcher.serve("/api/surahs", 200, r#"[{"number":1}]"#);

        let response = controller.handle_fetch(&request).await.unwrap();

        assert_eq!(response.body, br#"[{"number":1}]"#);
        let cached = storage
            .match_request("indoquran-api-cache-v1", &request)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(cached.response.body, br#"[{"number":1}]"#);
    }

    #[tokio::test]
    async fn api_offline_without_cache_is_503_json() {
        let fetcher = ScriptedFetcher::new();
        let (controller, _) = installed(&fetcher).await;
        fetcher.set_offline(true);

        let response = controller.handle_fetch(&Request::get("/api/surahs")).await.unwrap();

        assert_eq!(response.status, 503);
        assert_eq!(response.content_type(), Some("application/json"));
        assert_eq!(
            String::from_utf8(response.body).unwrap(),
            r#"{"status":"error","message":"Koneksi internet tidak tersedia. Silakan coba lagi nanti.","offline":true}"#
        );
    }

    #[tokio::test]
    async fn non_api_offline_miss_propagates() {
        let fetcher = ScriptedFetcher::new();
        let (controller, _) = installed(&fetcher).await;
        fetcher.set_offline(true);

        let err = controller
            .handle_fetch(&Request::navigate("/surah/114"))
            .await
            .unwrap_err();
        assert!(err.is_network_failure());

        let err = controller
            .handle_fetch(&Request::get("/images/uncached.png"))
            .await
            .unwrap_err();
        assert!(err.is_network_failure());

        let err = controller.handle_fetch(&Request::get("/robots.txt")).await.unwrap_err();
        assert!(err.is_network_failure());
    }

    #[tokio::test]
    async fn cached_static_asset_skips_network() {
        let fetcher = ScriptedFetcher::new();
        let (controller, _) = installed(&fetcher).await;

        let response = controller
            .handle_fetch(&Request::get("/build/assets/app.css"))
            .await
            .unwrap();

        assert_eq!(response.body, b"asset /build/assets/app.css");
        assert!(fetcher.calls().is_empty());
    }

    #[tokio::test]
    async fn offline_navigation_serves_cached_shell() {
        let fetcher = ScriptedFetcher::new();
        let (controller, _) = installed(&fetcher).await;
        fetcher.set_offline(true);

        let response = controller.handle_fetch(&Request::navigate("/")).await.unwrap();
        assert_eq!(response.body, b"asset /");
    }

    #[tokio::test]
    async fn activate_evicts_old_versions() {
        let fetcher = ScriptedFetcher::new();
        fetcher.serve_manifest();
        let (controller, storage) = controller(&fetcher);
        storage.open("indoquran-cache-v0").await.unwrap();
        storage.open("indoquran-api-cache-v1").await.unwrap();

        controller.install().await.unwrap();
        let deleted = controller.activate().await.unwrap();

        assert_eq!(deleted, vec!["indoquran-cache-v0"]);
        assert_eq!(
            storage.keys().await.unwrap(),
            vec!["indoquran-api-cache-v1", "indoquran-cache-v1"]
        );
        assert!(controller.clients_claimed());
        assert_eq!(controller.state(), WorkerState::Activated);
    }

    #[tokio::test]
    async fn stores_are_never_cross_written() {
        let fetcher = ScriptedFetcher::new();
        let (controller, storage) = installed(&fetcher).await;
        fetcher.serve("/api/surahs", 200, "[]");
        fetcher.serve("/api/icon.png", 200, "png");
        fetcher.serve("/images/new.webp", 200, "webp");
        fetcher.serve("/surah/1", 200, "<html>");

        for request in [
            Request::get("/api/surahs"),
            Request::get("/api/icon.png"),
            Request::get("/images/new.webp"),
            Request::navigate("/surah/1"),
        ] {
            controller.handle_fetch(&request).await.unwrap();
        }

        let api = store_keys(&storage, "indoquran-api-cache-v1").await;
        let statics = store_keys(&storage, "indoquran-cache-v1").await;
        assert_eq!(api, vec!["GET /api/icon.png", "GET /api/surahs"]);
        assert!(statics.contains(&"GET /images/new.webp".to_string()));
        assert!(statics.contains(&"GET /surah/1".to_string()));
        assert!(statics.iter().all(|k| !k.starts_with("GET /api/")));
    }

    #[tokio::test]
    async fn passthrough_is_not_cached() {
        let fetcher = ScriptedFetcher::new();
        let (controller, storage) = installed(&fetcher).await;
        fetcher.serve("/robots.txt", 200, "User-agent: *");

        controller.handle_fetch(&Request::get("/robots.txt")).await.unwrap();
        let statics = store_keys(&storage, "indoquran-cache-v1").await;
        assert!(!statics.contains(&"GET /robots.txt".to_string()));
    }

    #[tokio::test]
    async fn failed_api_requests_are_queued_and_replayed() {
        let fetcher = ScriptedFetcher::new();
        fetcher.serve_manifest();
        let storage = Arc::new(MemoryStorage::new());
        let queue = Arc::new(SyncQueue::in_memory(5));
        let controller =
            CacheController::new(settings_for("v1", "v1"), storage.clone(), fetcher.clone())
                .with_sync_queue(queue.clone());
        controller.install().await.unwrap();
        controller.activate().await.unwrap();

        fetcher.set_offline(true);
        let post = Request::get("/api/bookmarks")
            .with_method(Method::Post)
            .with_body(r#"{"surah":1,"ayah":1}"#);
        controller.handle_fetch(&post).await.unwrap();
        controller.handle_fetch(&post).await.unwrap();
        controller.handle_fetch(&Request::get("/api/surahs")).await.unwrap();
        assert_eq!(queue.len().await, 2);

        assert!(controller.handle_sync("other-tag").await.unwrap().is_none());

        fetcher.set_offline(false);
        fetcher.serve("/api/bookmarks", 201, "{}");
        fetcher.serve("/api/surahs", 200, "[1]");
        let outcome = controller.handle_sync("sync-data").await.unwrap().unwrap();

        assert_eq!(outcome.delivered.len(), 2);
        assert!(queue.is_empty().await);
        let refreshed = storage
            .match_request("indoquran-api-cache-v1", &Request::get("/api/surahs"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(refreshed.response.body, b"[1]");
    }

    #[tokio::test]
    async fn api_get_answered_from_cache_is_not_queued() {
        let fetcher = ScriptedFetcher::new();
        fetcher.serve_manifest();
        fetcher.serve("/api/surahs", 200, "[1]");
        let queue = Arc::new(SyncQueue::in_memory(5));
        let controller = CacheController::new(
            settings_for("v1", "v1"),
            Arc::new(MemoryStorage::new()),
            fetcher.clone(),
        )
        .with_sync_queue(queue.clone());
        controller.install().await.unwrap();
        controller.activate().await.unwrap();
        controller.handle_fetch(&Request::get("/api/surahs")).await.unwrap();

        fetcher.set_offline(true);
        let response = controller.handle_fetch(&Request::get("/api/surahs")).await.unwrap();
        assert_eq!(response.body, b"[1]");
        controller.handle_fetch(&Request::get("/api/surahs?page=2")).await.unwrap();

        let pending: Vec<_> = queue.pending().await.into_iter().map(|e| e.url).collect();
        assert_eq!(pending, vec!["/api/surahs?page=2"]);
    }

    #[tokio::test]
    async fn skip_waiting_message_sets_flag() {
        let fetcher = ScriptedFetcher::new();
        let mut settings = settings_for("v2", "v2");
        settings.skip_waiting_on_install = false;
        let controller =
            CacheController::new(settings, Arc::new(MemoryStorage::new()), fetcher.clone());

        assert!(!controller.skip_waiting_requested());
        controller.handle_message(ControlMessage::SkipWaiting);
        assert!(controller.skip_waiting_requested());
    }
}
