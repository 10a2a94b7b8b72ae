//! Serve command - run the caching front

use crate::cli::args::ServeArgs;
use crate::config::{Config, ConfigManager};
use crate::coordinator::{HostPlatform, PwaCoordinator};
use crate::error::TilawahResult;
use crate::factory::Components;
use crate::server::{self, probe_upstream, ServeContext};
use crate::ui::{self, UiContext};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Execute the serve command
pub async fn execute(
    args: ServeArgs,
    config: &Config,
    manager: &ConfigManager,
) -> TilawahResult<()> {
    let ctx = UiContext::detect();
    let config = apply_overrides(config, &args);

    let components = Components::from_config(&config).await?;
    let front = server::bind(&config.server)?;

    let probe_timeout = Duration::from_secs(config.network.request_timeout_secs.max(1));
    let online = probe_upstream(components.fetcher.as_ref(), probe_timeout).await;
    if !online {
        ui::step_warn_hint(
            &ctx,
            &format!("Upstream {} is not reachable", config.network.upstream),
            "Serving from cache until it comes back",
        );
    }

    let platform = HostPlatform::new(config.clone(), components).with_online(online);
    let coordinator = PwaCoordinator::new(Arc::new(platform));
    coordinator.start().await;

    match coordinator.registration().and_then(|r| r.active()) {
        Some(controller) => ui::step_ok_detail(
            &ctx,
            &format!("Controller {} active", controller.version()),
            &controller.store_names().static_store,
        ),
        None => ui::step_warn_hint(
            &ctx,
            "No active controller",
            "Requests are forwarded without caching until the upstream answers",
        ),
    }

    ui::key_value(&ctx, "Listening", &format!("http://{}", front.addr()));
    ui::key_value_status(&ctx, "Upstream", &config.network.upstream, online);
    ui::remark(&ctx, "Press Ctrl+C to stop");
    info!("Front server starting on {}", front.addr());

    front
        .run(ServeContext {
            config,
            config_path: manager.path().to_path_buf(),
            coordinator,
        })
        .await
}

fn apply_overrides(config: &Config, args: &ServeArgs) -> Config {
    let mut config = config.clone();
    if let Some(port) = args.port {
        config.server.port = port;
    }
    if let Some(interface) = &args.interface {
        config.server.interface = interface.clone();
    }
    if let Some(upstream) = &args.upstream {
        config.network.upstream = upstream.clone();
    }
    config
}
