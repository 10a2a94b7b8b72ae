//! Front server
//!
//! Listens for HTTP requests and answers each one through the active
//! controller of the coordinator's registration. Requests under
//! `/__tilawah/` are handled locally:
//!
//! | Route | Effect |
//! |-------|--------|
//! | `GET /__tilawah/state` | current [`PwaState`](crate::coordinator::PwaState) |
//! | `POST /__tilawah/update` | ask the waiting controller to take over |
//! | `POST /__tilawah/sync` | replay the sync queue |

mod response;

pub use response::{error_response, to_http};

use crate::config::schema::ServerConfig;
use crate::config::{Config, ConfigManager};
use crate::controller::fetch_with_timeout;
use crate::coordinator::{HostPlatform, PlatformEvent, PwaCoordinator};
use crate::error::{TilawahError, TilawahResult};
use crate::fetch::{Fetcher, Method, Request, Response};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tiny_http::Server;
use tracing::{debug, info, warn};

const CONTROL_PREFIX: &str = "/__tilawah/";

/// Listener bound but not yet serving
pub struct FrontServer {
    server: Arc<Server>,
    addr: SocketAddr,
}

/// Bind the listener described by `config`
pub fn bind(config: &ServerConfig) -> TilawahResult<FrontServer> {
    let addr_text = format!("{}:{}", config.interface, config.port);
    let addr = addr_text.parse::<SocketAddr>().map_err(|e| TilawahError::ServerBind {
        addr: addr_text.clone(),
        reason: e.to_string(),
    })?;

    let server = Server::http(addr).map_err(|e| TilawahError::ServerBind {
        addr: addr_text,
        reason: e.to_string(),
    })?;
    // port 0 binds an ephemeral port
    let addr = server.server_addr().to_ip().unwrap_or(addr);

    Ok(FrontServer {
        server: Arc::new(server),
        addr,
    })
}

/// State shared by every request handler
pub struct ServeContext {
    pub config: Config,
    pub config_path: PathBuf,
    pub coordinator: Arc<PwaCoordinator<HostPlatform>>,
}

impl FrontServer {
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Serve until Ctrl+C
    pub async fn run(self, ctx: ServeContext) -> TilawahResult<()> {
        let ctx = Arc::new(ctx);
        let mut background = vec![
            tokio::spawn(probe_connectivity(ctx.clone())),
            tokio::spawn(shutdown_on_ctrl_c(self.server.clone())),
        ];
        #[cfg(unix)]
        background.push(tokio::spawn(reload_on_sighup(ctx.clone())));

        info!("Serving on http://{}", self.addr);

        let runtime = tokio::runtime::Handle::current();
        let server = self.server.clone();
        let accept = tokio::task::spawn_blocking(move || {
            for request in server.incoming_requests() {
                runtime.spawn(handle_request(request, ctx.clone()));
            }
        });

        let result = accept
            .await
            .map_err(|e| TilawahError::Internal(format!("accept loop failed: {}", e)));
        for task in &background {
            task.abort();
        }
        info!("Server stopped");
        result
    }
}

async fn shutdown_on_ctrl_c(server: Arc<Server>) {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("Shutting down");
        server.unblock();
    }
}

/// Rebuild the controller from the reloaded config and register it
#[cfg(unix)]
async fn reload_on_sighup(ctx: Arc<ServeContext>) {
    use tokio::signal::unix::{signal, SignalKind};

    let mut hangups = match signal(SignalKind::hangup()) {
        Ok(stream) => stream,
        Err(e) => {
            warn!("Config reload on SIGHUP unavailable: {}", e);
            return;
        }
    };

    while hangups.recv().await.is_some() {
        info!("Reloading configuration from {}", ctx.config_path.display());
        let config = match ConfigManager::with_path(ctx.config_path.clone()).load().await {
            Ok(config) => config,
            Err(e) => {
                warn!("Keeping current controller, reload failed: {}", e);
                continue;
            }
        };

        let Some(registration) = ctx.coordinator.registration() else {
            warn!("No registration to update; restart to enable offline support");
            continue;
        };
        let controller = ctx.coordinator.platform().components().controller(&config);
        if let Err(e) = registration.register(controller).await {
            warn!("New controller was not installed: {}", e);
        }
    }
}

/// Poll the upstream and turn reachability changes into Online/Offline events
async fn probe_connectivity(ctx: Arc<ServeContext>) {
    let interval_secs = ctx.config.network.probe_interval_secs;
    if interval_secs == 0 {
        return;
    }

    let fetcher = ctx.coordinator.platform().components().fetcher.clone();
    let timeout = Duration::from_secs(interval_secs);
    let mut ticker = tokio::time::interval(timeout);
    ticker.tick().await;

    loop {
        ticker.tick().await;
        let event = if probe_upstream(fetcher.as_ref(), timeout).await {
            PlatformEvent::Online
        } else {
            PlatformEvent::Offline
        };
        ctx.coordinator.dispatch(event).await;
    }
}

/// Whether the upstream answers a `HEAD /` within `timeout`.
///
/// Any HTTP status counts as reachable.
pub async fn probe_upstream(fetcher: &dyn Fetcher, timeout: Duration) -> bool {
    let probe = Request::get("/").with_method(Method::Head);
    match fetch_with_timeout(fetcher, &probe, Some(timeout)).await {
        Ok(_) => true,
        Err(e) => {
            debug!("Connectivity probe failed: {}", e);
            false
        }
    }
}

async fn handle_request(mut request: tiny_http::Request, ctx: Arc<ServeContext>) {
    let read = tokio::task::spawn_blocking(move || {
        let parsed = response::read_request(&mut request);
        (request, parsed)
    })
    .await;
    let Ok((request, parsed)) = read else {
        warn!("Request reader task failed");
        return;
    };

    let answer = match parsed {
        Ok(incoming) => {
            let answer = respond(&incoming, &ctx).await;
            debug!("{} {} -> {}", incoming.method, incoming.url, answer.status);
            answer
        }
        Err(e) => {
            warn!("Could not read request: {}", e);
            response::plain(400, "400 Bad Request")
        }
    };

    let sent = tokio::task::spawn_blocking(move || request.respond(to_http(answer))).await;
    match sent {
        Ok(Ok(())) => {}
        Ok(Err(e)) => debug!("Client went away: {}", e),
        Err(e) => warn!("Response writer task failed: {}", e),
    }
}

async fn respond(request: &Request, ctx: &ServeContext) -> Response {
    if request.path().starts_with(CONTROL_PREFIX) {
        return match control(request, ctx).await {
            Ok(response) => response,
            Err(e) => error_response(&e),
        };
    }

    let result = match ctx.coordinator.registration() {
        Some(registration) => registration.handle_fetch(request).await,
        None => ctx.coordinator.platform().components().fetcher.fetch(request).await,
    };

    match result {
        Ok(response) => response,
        Err(e) => {
            if e.is_network_failure() {
                debug!("{} {} failed: {}", request.method, request.url, e);
            } else {
                warn!("{} {} failed: {}", request.method, request.url, e);
            }
            error_response(&e)
        }
    }
}

async fn control(request: &Request, ctx: &ServeContext) -> TilawahResult<Response> {
    let route = &request.path()[CONTROL_PREFIX.len()..];
    match (&request.method, route) {
        (Method::Get, "state") => Response::json(200, &ctx.coordinator.state()),
        (Method::Post, "update") => {
            let signalled = ctx.coordinator.update();
            Response::json(200, &serde_json::json!({ "signalled": signalled }))
        }
        (Method::Post, "sync") => {
            let outcome = match ctx.coordinator.registration() {
                Some(registration) => registration.sync(&ctx.config.sync.tag).await?,
                None => None,
            };
            let body = match outcome {
                Some(outcome) => serde_json::json!({
                    "delivered": outcome.delivered.len(),
                    "dropped": outcome.dropped.len(),
                    "remaining": outcome.remaining,
                    "interrupted": outcome.interrupted,
                }),
                None => serde_json::json!({ "delivered": 0, "dropped": 0, "remaining": 0 }),
            };
            Response::json(200, &body)
        }
        (_, "state" | "update" | "sync") => Ok(response::plain(405, "405 Method Not Allowed")),
        _ => Ok(response::plain(404, "404 Not Found")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StorageBackend;
    use crate::factory::Components;
    use crate::store::{CacheStorage, DiskStorage};

    fn unreachable_config() -> Config {
        let mut config = Config::default();
        config.cache.backend = StorageBackend::Memory;
        config.network.upstream = "http://127.0.0.1:9".to_string();
        config.network.request_timeout_secs = 2;
        config
    }

    async fn start(config: Config) -> ServeContext {
        let components = Components::from_config(&config).await.unwrap();
        let platform = HostPlatform::new(config.clone(), components).with_online(false);
        let coordinator = PwaCoordinator::new(Arc::new(platform));
        coordinator.start().await;

        ServeContext {
            config,
            config_path: PathBuf::from("/nonexistent/config.toml"),
            coordinator,
        }
    }

    async fn context() -> ServeContext {
        start(unreachable_config()).await
    }

    #[tokio::test]
    async fn state_route_reports_coordinator_state() {
        let ctx = context().await;
        let response = respond(&Request::get("/__tilawah/state"), &ctx).await;

        assert_eq!(response.status, 200);
        let body: serde_json::Value = serde_json::from_slice(&response.body).unwrap();
        assert_eq!(body["online"], false);
        assert_eq!(body["update_available"], false);
    }

    #[tokio::test]
    async fn control_routes_check_method() {
        let ctx = context().await;
        let response = respond(&Request::get("/__tilawah/update"), &ctx).await;
        assert_eq!(response.status, 405);

        let response = respond(&Request::get("/__tilawah/nope"), &ctx).await;
        assert_eq!(response.status, 404);
    }

    #[tokio::test]
    async fn cold_start_without_upstream_forwards_to_network() {
        let ctx = context().await;
        assert!(ctx.coordinator.registration().is_none());

        let response = respond(&Request::navigate("/"), &ctx).await;
        assert_eq!(response.status, 502);

        let post = Request::get("/__tilawah/sync").with_method(Method::Post);
        let response = respond(&post, &ctx).await;
        assert_eq!(response.status, 200);
    }

    #[tokio::test]
    async fn restart_without_upstream_serves_previous_stores() {
        let dir = tempfile::TempDir::new().unwrap();
        let mut config = unreachable_config();
        config.cache.backend = StorageBackend::Disk;
        config.cache.dir = Some(dir.path().join("caches"));
        config.sync.path = Some(dir.path().join("sync-queue.json"));

        // what an earlier run left behind
        let storage = DiskStorage::new(dir.path().join("caches"));
        storage
            .put(
                "indoquran-cache-v1",
                &Request::get("/"),
                &Response::new(200, "<html>shell</html>"),
            )
            .await
            .unwrap();
        storage.open("indoquran-api-cache-v1").await.unwrap();

        let ctx = start(config).await;
        let active = ctx.coordinator.registration().unwrap().active().unwrap();
        assert_eq!(active.version(), "v1");

        let shell = respond(&Request::navigate("/"), &ctx).await;
        assert_eq!(shell.status, 200);
        assert_eq!(shell.body, b"<html>shell</html>");

        let api = respond(&Request::get("/api/surahs"), &ctx).await;
        assert_eq!(api.status, 503);
        let body: serde_json::Value = serde_json::from_slice(&api.body).unwrap();
        assert_eq!(body["offline"], true);
        assert_eq!(body["status"], "error");
    }

    #[tokio::test]
    async fn probe_reports_unreachable_upstream() {
        let ctx = context().await;
        let fetcher = ctx.coordinator.platform().components().fetcher.clone();
        assert!(!probe_upstream(fetcher.as_ref(), Duration::from_secs(2)).await);
    }

    #[test]
    fn bind_rejects_bad_interface() {
        let config = ServerConfig {
            interface: "not-an-ip".to_string(),
            port: 0,
        };
        assert!(matches!(bind(&config), Err(TilawahError::ServerBind { .. })));
    }

    #[test]
    fn bind_ephemeral_port() {
        let config = ServerConfig {
            interface: "127.0.0.1".to_string(),
            port: 0,
        };
        let server = bind(&config).unwrap();
        assert_ne!(server.addr().port(), 0);
    }
}
