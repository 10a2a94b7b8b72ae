//! Tilawah - offline caching front for the IndoQuran web app
//!
//! CLI entry point that dispatches to subcommands.

use clap::Parser;
use console::style;
use std::process::ExitCode;
use tilawah::cli::args::{ConfigAction, ConfigArgs};
use tilawah::cli::{commands, Cli, Commands};
use tilawah::config::{ConfigManager, StorageBackend};
use tilawah::error::TilawahResult;
use tilawah::ui;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {}", style("Error:").red().bold(), e);
            if let Some(hint) = e.hint() {
                eprintln!("{} {}", style("Hint:").yellow(), hint);
            }
            ExitCode::FAILURE
        }
    }
}

async fn run() -> TilawahResult<()> {
    let cli = Cli::parse();

    // Completions need neither config nor logging
    if let Commands::Completions { shell } = cli.command {
        commands::completions(shell);
        return Ok(());
    }

    let config_manager = match cli.config {
        Some(ref path) => ConfigManager::with_path(path.clone()),
        None => ConfigManager::new(),
    };
    // The path is printed even when the file does not parse
    if let Commands::Config(ConfigArgs {
        action: Some(ConfigAction::Path),
    }) = cli.command
    {
        commands::config::show_path(&config_manager);
        return Ok(());
    }

    let mut config = config_manager.load().await?;

    // 0 = warn (spinners only), 1 = info, 2+ = debug
    let verbose = cli.verbose.max(u8::from(config.general.verbose));
    let filter = match verbose {
        0 => EnvFilter::new("tilawah=warn"),
        1 => EnvFilter::new("tilawah=info"),
        _ => EnvFilter::new("tilawah=debug"),
    };
    if config.general.log_format == "json" {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .without_time()
            .with_writer(std::io::stderr)
            .init();
    }
    ui::init_theme();
    debug!("Using config at {}", config_manager.path().display());

    if cli.ephemeral {
        debug!("Ephemeral run, stores and sync queue stay in memory");
        config.cache.backend = StorageBackend::Memory;
    }
    if config.cache.backend == StorageBackend::Disk {
        ConfigManager::ensure_state_dirs(&config).await?;
    }

    match cli.command {
        Commands::Completions { .. } => unreachable!("Completions handled above"),
        Commands::Serve(args) => commands::serve(args, &config, &config_manager).await,
        Commands::Install(args) => commands::install(args, &config).await,
        Commands::Activate => commands::activate(&config).await,
        Commands::Fetch(args) => commands::fetch(args, &config).await,
        Commands::Cache(args) => commands::cache(args, &config).await,
        Commands::Sync(args) => commands::sync(args, &config).await,
        Commands::Config(args) => commands::config(args, &config, &config_manager).await,
        Commands::Status => commands::status(&config).await,
    }
}
