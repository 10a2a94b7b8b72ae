//! Sync command - inspect and replay the background sync queue

use crate::cli::args::{OutputFormat, SyncAction, SyncArgs};
use crate::config::Config;
use crate::error::{TilawahError, TilawahResult};
use crate::factory::{open_sync_queue, Components};
use crate::sync::{QueuedRequest, SyncQueue};
use crate::ui::{self, TaskSpinner, UiContext};
use std::sync::Arc;

/// Execute the sync command
pub async fn execute(args: SyncArgs, config: &Config) -> TilawahResult<()> {
    match args.action {
        SyncAction::Status { format } => {
            let queue = require_queue(config).await?;
            show_status(&queue, format).await
        }
        SyncAction::Replay => replay(config).await,
        SyncAction::Clear { yes } => {
            let queue = require_queue(config).await?;
            let ctx = UiContext::detect().with_auto_yes(yes);
            clear(&ctx, &queue).await
        }
    }
}

async fn require_queue(config: &Config) -> TilawahResult<Arc<SyncQueue>> {
    open_sync_queue(config).await?.ok_or_else(|| {
        TilawahError::User("Background sync is disabled (sync.enabled = false)".to_string())
    })
}

async fn show_status(queue: &SyncQueue, format: OutputFormat) -> TilawahResult<()> {
    let pending = queue.pending().await;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&pending)?),
        OutputFormat::Plain => {
            for entry in &pending {
                println!("{} {} {}", entry.id, entry.method, entry.url);
            }
        }
        OutputFormat::Table => print_queue_table(&pending),
    }
    Ok(())
}

fn print_queue_table(pending: &[QueuedRequest]) {
    if pending.is_empty() {
        println!("Sync queue is empty.");
        return;
    }

    println!(
        "{:<8} {:<7} {:<40} {:>8} {:<16}",
        "ID", "METHOD", "URL", "ATTEMPTS", "QUEUED"
    );
    println!("{}", "-".repeat(84));
    for entry in pending {
        let id = entry.id.to_string();
        println!(
            "{:<8} {:<7} {:<40} {:>8} {:<16}",
            &id[..8],
            entry.method,
            entry.url,
            entry.attempts,
            entry.enqueued_at.format("%Y-%m-%d %H:%M")
        );
        if let Some(error) = &entry.last_error {
            println!("         last error: {}", error);
        }
    }

    println!();
    println!("Total: {} queued request(s)", pending.len());
}

/// Replay through a controller so delivered GETs refresh the API store
async fn replay(config: &Config) -> TilawahResult<()> {
    let ctx = UiContext::detect();
    let components = Components::from_config(config).await?;
    let controller = components.controller(config);

    let mut spinner = TaskSpinner::new(&ctx);
    spinner.start(&format!("Replaying queued requests to {}...", config.network.upstream));
    let Some(outcome) = controller.handle_sync(&config.sync.tag).await? else {
        spinner.stop_warn("Background sync is disabled");
        return Ok(());
    };

    let summary = format!(
        "{} delivered, {} dropped, {} remaining",
        outcome.delivered.len(),
        outcome.dropped.len(),
        outcome.remaining
    );
    if outcome.interrupted {
        spinner.stop_warn(&summary);
        ui::step_warn_hint(
            &ctx,
            "Upstream went away during replay",
            "Remaining requests are kept for the next sync",
        );
    } else {
        spinner.stop(&summary);
    }

    for entry in &outcome.dropped {
        ui::step_error_detail(
            &ctx,
            &format!("Dropped {} {}", entry.method, entry.url),
            entry.last_error.as_deref().unwrap_or("too many attempts"),
        );
    }
    Ok(())
}

async fn clear(ctx: &UiContext, queue: &SyncQueue) -> TilawahResult<()> {
    let count = queue.len().await;
    if count == 0 {
        ui::step_info(ctx, "Sync queue is already empty");
        return Ok(());
    }
    if !ui::confirm(ctx, &format!("Drop {} queued request(s)?", count), false).await? {
        ui::step_info(ctx, "Aborted");
        return Ok(());
    }

    let removed = queue.clear().await?;
    ui::step_ok(ctx, &format!("Dropped {} queued request(s)", removed));
    Ok(())
}
