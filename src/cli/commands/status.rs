//! Status command - upstream reachability and store health

use crate::config::{Config, StorageBackend};
use crate::error::TilawahResult;
use crate::factory::Components;
use crate::server::probe_upstream;
use crate::store::CacheStorage;
use crate::sync::SyncQueue;
use console::{style, Emoji};
use std::time::Duration;

static CHECK: Emoji<'_, '_> = Emoji("✓ ", "[OK] ");
static CROSS: Emoji<'_, '_> = Emoji("✗ ", "[FAIL] ");
static WARN: Emoji<'_, '_> = Emoji("⚠ ", "[WARN] ");

/// Execute the status command
pub async fn execute(config: &Config) -> TilawahResult<()> {
    println!("{}", style("Tilawah Status").bold().cyan());
    println!();

    let components = Components::from_config(config).await?;
    let mut all_ok = true;

    println!("{}", style("Upstream:").bold());
    let timeout = Duration::from_secs(config.network.request_timeout_secs.max(1));
    if probe_upstream(components.fetcher.as_ref(), timeout).await {
        println!("  {} {} {}", CHECK, style("Reachable").green(), config.network.upstream);
    } else {
        println!(
            "  {} {} {} - Requests will be served from cache",
            CROSS,
            style("Unreachable").red(),
            config.network.upstream
        );
        all_ok = false;
    }

    println!();
    println!("{}", style("Cache stores:").bold());
    if config.cache.backend == StorageBackend::Memory {
        println!("  {} {}", WARN, style("Memory backend, nothing persists").yellow());
    }
    all_ok &= check_stores(components.storage.as_ref(), config).await?;

    println!();
    println!("{}", style("Background sync:").bold());
    check_sync(components.sync_queue.as_deref(), config).await;

    println!();
    if all_ok {
        println!("{}", style("All checks passed!").green().bold());
    } else {
        println!("{}", style("Some checks need attention.").yellow().bold());
    }

    Ok(())
}

async fn check_stores(storage: &dyn CacheStorage, config: &Config) -> TilawahResult<bool> {
    let mut ok = true;
    let live = [config.cache.static_store_name(), config.cache.api_store_name()];

    for name in &live {
        if storage.has(name).await? {
            let entries = storage.entries(name).await?.len();
            println!("  {} {} ({} entries)", CHECK, style(name).green(), entries);
        } else {
            println!(
                "  {} {} - Not created yet. Run: tilawah install",
                WARN,
                style(name).yellow()
            );
            ok = false;
        }
    }

    let stale: Vec<String> = storage
        .keys()
        .await?
        .into_iter()
        .filter(|name| !live.contains(name))
        .collect();
    if !stale.is_empty() {
        println!(
            "  {} {} stale store(s): {} - Run: tilawah activate",
            WARN,
            stale.len(),
            stale.join(", ")
        );
    }

    Ok(ok)
}

async fn check_sync(queue: Option<&SyncQueue>, config: &Config) {
    let Some(queue) = queue else {
        println!("  {} {}", WARN, style("Disabled").yellow());
        return;
    };

    let pending = queue.len().await;
    if pending == 0 {
        println!("  {} {} (tag {})", CHECK, style("Queue empty").green(), config.sync.tag);
    } else {
        println!(
            "  {} {} request(s) waiting - Run: tilawah sync replay",
            WARN,
            pending
        );
    }
}
