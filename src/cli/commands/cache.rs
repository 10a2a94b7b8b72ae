//! Cache command - inspect and delete cache stores

use crate::cli::args::{CacheAction, CacheArgs, OutputFormat};
use crate::config::Config;
use crate::error::{TilawahError, TilawahResult};
use crate::factory::create_storage;
use crate::store::{CacheStorage, EntryInfo};
use crate::ui::{self, StepProgress, UiContext};
use console::style;
use serde::Serialize;
use tracing::debug;

/// One store in a listing
#[derive(Debug, Serialize)]
struct StoreSummary {
    name: String,
    entries: usize,
    size_bytes: u64,
    live: bool,
}

/// Execute the cache command
pub async fn execute(args: CacheArgs, config: &Config) -> TilawahResult<()> {
    let storage = create_storage(config);

    match args.action {
        CacheAction::List { format } => list_stores(storage.as_ref(), config, format).await,
        CacheAction::Entries { store, format } => {
            list_entries(storage.as_ref(), &store, format).await
        }
        CacheAction::Clear { store, all, yes } => {
            let ctx = UiContext::detect().with_auto_yes(yes);
            if all {
                clear_all(&ctx, storage.as_ref()).await
            } else {
                match store {
                    Some(name) => clear_store(&ctx, storage.as_ref(), &name).await,
                    None => Err(TilawahError::User(
                        "Name a store or pass --all".to_string(),
                    )),
                }
            }
        }
    }
}

async fn summarize(storage: &dyn CacheStorage, config: &Config) -> TilawahResult<Vec<StoreSummary>> {
    let live = [config.cache.static_store_name(), config.cache.api_store_name()];
    let mut summaries = vec![];
    for name in storage.keys().await? {
        let entries = storage.entries(&name).await?;
        summaries.push(StoreSummary {
            live: live.contains(&name),
            entries: entries.len(),
            size_bytes: entries.iter().map(|e| e.size_bytes).sum(),
            name,
        });
    }
    Ok(summaries)
}

async fn list_stores(
    storage: &dyn CacheStorage,
    config: &Config,
    format: OutputFormat,
) -> TilawahResult<()> {
    let stores = summarize(storage, config).await?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&stores)?),
        OutputFormat::Plain => {
            for store in &stores {
                println!("{}", store.name);
            }
        }
        OutputFormat::Table => {
            if stores.is_empty() {
                println!("No cache stores found.");
                return Ok(());
            }
            print_store_table(&stores);
        }
    }
    Ok(())
}

fn print_store_table(stores: &[StoreSummary]) {
    println!("{:<36} {:>8} {:>12} {:<6}", "STORE", "ENTRIES", "SIZE", "STATE");
    println!("{}", "-".repeat(66));

    for store in stores {
        let state = if store.live {
            style("live").green().to_string()
        } else {
            style("stale").yellow().to_string()
        };
        println!(
            "{:<36} {:>8} {:>12} {:<6}",
            store.name,
            store.entries,
            format_size(store.size_bytes),
            state
        );
    }

    println!();
    println!("Total: {} store(s)", stores.len());
}

async fn list_entries(
    storage: &dyn CacheStorage,
    name: &str,
    format: OutputFormat,
) -> TilawahResult<()> {
    if !storage.has(name).await? {
        return Err(TilawahError::StoreNotFound(name.to_string()));
    }
    let entries = storage.entries(name).await?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&entries)?),
        OutputFormat::Plain => {
            for entry in &entries {
                println!("{}", entry.key);
            }
        }
        OutputFormat::Table => print_entry_table(name, &entries),
    }
    Ok(())
}

fn print_entry_table(name: &str, entries: &[EntryInfo]) {
    if entries.is_empty() {
        println!("Store {} is empty.", name);
        return;
    }

    println!("{:<48} {:>6} {:>10} {:<16}", "KEY", "STATUS", "SIZE", "STORED");
    println!("{}", "-".repeat(84));
    for entry in entries {
        println!(
            "{:<48} {:>6} {:>10} {:<16}",
            entry.key,
            entry.status,
            format_size(entry.size_bytes),
            entry.stored_at.format("%Y-%m-%d %H:%M")
        );
    }
}

async fn clear_store(ctx: &UiContext, storage: &dyn CacheStorage, name: &str) -> TilawahResult<()> {
    if !storage.has(name).await? {
        return Err(TilawahError::StoreNotFound(name.to_string()));
    }
    if !ui::confirm(ctx, &format!("Delete store {}?", name), false).await? {
        ui::step_info(ctx, "Aborted");
        return Ok(());
    }

    storage.delete(name).await?;
    ui::step_ok_detail(ctx, "Deleted", name);
    Ok(())
}

async fn clear_all(ctx: &UiContext, storage: &dyn CacheStorage) -> TilawahResult<()> {
    let names = storage.keys().await?;
    if names.is_empty() {
        ui::step_info(ctx, "No cache stores to delete");
        return Ok(());
    }

    ui::section(ctx, &format!("This will delete {} store(s):", names.len()));
    for name in &names {
        ui::remark(ctx, name);
    }
    if !ui::confirm(ctx, "Delete every store?", false).await? {
        ui::step_info(ctx, "Aborted");
        return Ok(());
    }

    let mut progress = StepProgress::new(ctx, "Deleting stores", names.len() as u64);
    for name in &names {
        debug!("Deleting store {}", name);
        storage.delete(name).await?;
        progress.step(name);
    }
    progress.finish();

    ui::outro_success(ctx, &format!("Deleted {} store(s)", names.len()));
    Ok(())
}

fn format_size(bytes: u64) -> String {
    const KIB: u64 = 1024;
    const MIB: u64 = 1024 * KIB;
    if bytes >= MIB {
        format!("{:.1} MiB", bytes as f64 / MIB as f64)
    } else if bytes >= KIB {
        format!("{:.1} KiB", bytes as f64 / KIB as f64)
    } else {
        format!("{} B", bytes)
    }
}
