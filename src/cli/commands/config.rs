//! Config command - show or edit configuration

use crate::cli::args::{ConfigAction, ConfigArgs};
use crate::config::{Config, ConfigManager, StorageBackend};
use crate::error::{TilawahError, TilawahResult};
use crate::ui::{self, UiContext};
use std::path::PathBuf;

/// Execute the config command
pub async fn execute(args: ConfigArgs, config: &Config, manager: &ConfigManager) -> TilawahResult<()> {
    match args.action {
        None | Some(ConfigAction::Show) => show_config(config)?,
        Some(ConfigAction::Path) => show_path(manager),
        Some(ConfigAction::Init { force }) => init_config(manager, force).await?,
        Some(ConfigAction::Set { key, value }) => set_value(manager, config, &key, &value).await?,
    }

    Ok(())
}

fn show_config(config: &Config) -> TilawahResult<()> {
    println!("{}", toml::to_string_pretty(config)?);
    Ok(())
}

/// Print the config file path
pub fn show_path(manager: &ConfigManager) {
    println!("{}", manager.path().display());
}

async fn init_config(manager: &ConfigManager, force: bool) -> TilawahResult<()> {
    let ctx = UiContext::detect();
    let path = manager.path();

    if path.exists() && !force {
        ui::step_warn_hint(
            &ctx,
            &format!("Config already exists at {}", path.display()),
            "Use --force to overwrite",
        );
        return Ok(());
    }

    manager.save(&Config::default()).await?;

    ui::step_ok_detail(&ctx, "Configuration initialized", &path.display().to_string());
    Ok(())
}

async fn set_value(
    manager: &ConfigManager,
    config: &Config,
    key: &str,
    value: &str,
) -> TilawahResult<()> {
    let ctx = UiContext::detect();
    let mut config = config.clone();
    apply(&mut config, key, value)?;
    manager.save(&config).await?;

    ui::step_ok(&ctx, &format!("Set {} = {}", key, value));
    if key.starts_with("cache.") && key.ends_with("_version") {
        ui::remark(
            &ctx,
            "Run `tilawah install` to precache the new version and delete the old stores",
        );
    }
    Ok(())
}

fn apply(config: &mut Config, key: &str, value: &str) -> TilawahResult<()> {
    let parts: Vec<&str> = key.split('.').collect();

    match parts.as_slice() {
        ["general", "verbose"] => config.general.verbose = parse_bool(value)?,
        ["general", "log_format"] => config.general.log_format = parse_log_format(value)?,

        ["cache", "static_store"] => config.cache.static_store = value.to_string(),
        ["cache", "static_version"] => config.cache.static_version = value.to_string(),
        ["cache", "api_store"] => config.cache.api_store = value.to_string(),
        ["cache", "api_version"] => config.cache.api_version = value.to_string(),
        ["cache", "backend"] => config.cache.backend = parse_backend(value)?,
        ["cache", "dir"] => config.cache.dir = Some(PathBuf::from(value)),
        ["cache", "max_age_secs"] => {
            config.cache.max_age_secs = match parse_u64(value)? {
                0 => None,
                secs => Some(secs),
            }
        }

        ["routes", "api_prefix"] => config.routes.api_prefix = value.to_string(),
        ["routes", "assets_prefix"] => config.routes.assets_prefix = value.to_string(),
        ["routes", "static_extensions"] => config.routes.static_extensions = parse_list(value),
        ["routes", "manifest"] => config.routes.manifest = parse_list(value),

        ["network", "upstream"] => config.network.upstream = value.to_string(),
        ["network", "request_timeout_secs"] => {
            config.network.request_timeout_secs = parse_u64(value)?
        }
        ["network", "probe_interval_secs"] => {
            config.network.probe_interval_secs = parse_u64(value)?
        }

        ["controller", "skip_waiting_on_install"] => {
            config.controller.skip_waiting_on_install = parse_bool(value)?
        }
        ["controller", "scope"] => config.controller.scope = value.to_string(),

        ["offline", "message"] => config.offline.message = value.to_string(),

        ["sync", "enabled"] => config.sync.enabled = parse_bool(value)?,
        ["sync", "tag"] => config.sync.tag = value.to_string(),
        ["sync", "max_attempts"] => {
            config.sync.max_attempts = value
                .parse()
                .map_err(|_| TilawahError::User(format!("Invalid number: {}", value)))?
        }
        ["sync", "max_entries"] => {
            config.sync.max_entries = value
                .parse()
                .map_err(|_| TilawahError::User(format!("Invalid number: {}", value)))?
        }
        ["sync", "path"] => config.sync.path = Some(PathBuf::from(value)),

        ["server", "interface"] => config.server.interface = value.to_string(),
        ["server", "port"] => {
            config.server.port = value
                .parse()
                .map_err(|_| TilawahError::User(format!("Invalid port: {}", value)))?
        }

        _ => return Err(TilawahError::User(format!("Unknown config key: {}", key))),
    }

    Ok(())
}

fn parse_bool(value: &str) -> TilawahResult<bool> {
    match value.to_lowercase().as_str() {
        "true" | "yes" | "1" | "on" => Ok(true),
        "false" | "no" | "0" | "off" => Ok(false),
        _ => Err(TilawahError::User(format!("Invalid boolean: {}", value))),
    }
}

fn parse_u64(value: &str) -> TilawahResult<u64> {
    value
        .parse()
        .map_err(|_| TilawahError::User(format!("Invalid number: {}", value)))
}

fn parse_backend(value: &str) -> TilawahResult<StorageBackend> {
    match value {
        "disk" => Ok(StorageBackend::Disk),
        "memory" => Ok(StorageBackend::Memory),
        _ => Err(TilawahError::User(format!(
            "Invalid backend: {} (expected disk or memory)",
            value
        ))),
    }
}

fn parse_log_format(value: &str) -> TilawahResult<String> {
    match value {
        "text" | "json" => Ok(value.to_string()),
        _ => Err(TilawahError::User(format!(
            "Invalid log format: {} (expected text or json)",
            value
        ))),
    }
}

fn parse_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn apply_known_keys() {
        let mut config = Config::default();
        apply(&mut config, "cache.static_version", "v2").unwrap();
        apply(&mut config, "network.request_timeout_secs", "3").unwrap();
        apply(&mut config, "sync.enabled", "off").unwrap();
        apply(&mut config, "routes.manifest", "/, /favicon.ico").unwrap();
        apply(&mut config, "cache.max_age_secs", "0").unwrap();
        apply(&mut config, "sync.max_entries", "50").unwrap();

        assert_eq!(config.cache.static_store_name(), "indoquran-cache-v2");
        assert_eq!(config.network.request_timeout_secs, 3);
        assert!(!config.sync.enabled);
        assert_eq!(config.routes.manifest, vec!["/", "/favicon.ico"]);
        assert!(config.cache.max_age_secs.is_none());
        assert_eq!(config.sync.max_entries, 50);
    }

    #[test]
    fn apply_rejects_bad_input() {
        let mut config = Config::default();
        assert!(apply(&mut config, "cache.nope", "x").is_err());
        assert!(apply(&mut config, "server.port", "99999").is_err());
        assert!(apply(&mut config, "cache.backend", "s3").is_err());
        assert!(apply(&mut config, "general.log_format", "xml").is_err());
    }

    #[tokio::test]
    async fn set_persists_to_file() {
        let temp = TempDir::new().unwrap();
        let manager = ConfigManager::with_path(temp.path().join("config.toml"));

        set_value(&manager, &Config::default(), "cache.api_version", "v9")
            .await
            .unwrap();

        let loaded = manager.load().await.unwrap();
        assert_eq!(loaded.cache.api_store_name(), "indoquran-api-cache-v9");
    }

    #[tokio::test]
    async fn init_does_not_overwrite_without_force() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        tokio::fs::write(&path, "[server]\nport = 9999\n").await.unwrap();
        let manager = ConfigManager::with_path(path);

        init_config(&manager, false).await.unwrap();
        assert_eq!(manager.load().await.unwrap().server.port, 9999);

        init_config(&manager, true).await.unwrap();
        assert_eq!(manager.load().await.unwrap().server.port, 8080);
    }
}
