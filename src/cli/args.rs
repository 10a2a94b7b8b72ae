//! CLI argument definitions using clap derive

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;
use std::path::PathBuf;

/// Tilawah - offline caching front for the IndoQuran web app
///
/// Serves the app through a versioned dual cache: API responses network-first,
/// static assets cache-first, with an offline fallback and background sync.
#[derive(Parser, Debug)]
#[command(name = "tilawah")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Configuration file path
    #[arg(short, long, global = true, env = "TILAWAH_CONFIG")]
    pub config: Option<PathBuf>,

    /// Keep stores and the sync queue in memory only
    #[arg(long, global = true)]
    pub ephemeral: bool,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the caching front server
    Serve(ServeArgs),

    /// Precache the static manifest for the configured versions
    Install(InstallArgs),

    /// Delete stores left over from previous versions
    Activate,

    /// Send one request through the controller
    Fetch(FetchArgs),

    /// Inspect or clear cache stores
    Cache(CacheArgs),

    /// Inspect or replay the background sync queue
    Sync(SyncArgs),

    /// Show or edit configuration
    Config(ConfigArgs),

    /// Show upstream reachability and store status
    Status,

    /// Generate shell completions
    Completions {
        /// Target shell
        shell: Shell,
    },
}

/// Arguments for the serve command
#[derive(Parser, Debug)]
pub struct ServeArgs {
    /// Port to listen on (overrides server.port)
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Interface to bind (overrides server.interface)
    #[arg(long)]
    pub interface: Option<String>,

    /// Upstream origin (overrides network.upstream)
    #[arg(short, long)]
    pub upstream: Option<String>,
}

/// Arguments for the install command
#[derive(Parser, Debug)]
pub struct InstallArgs {
    /// Keep stores from previous versions
    #[arg(long)]
    pub no_activate: bool,
}

/// Arguments for the fetch command
#[derive(Parser, Debug)]
pub struct FetchArgs {
    /// Origin-relative URL, e.g. /api/surahs
    pub url: String,

    /// HTTP method
    #[arg(short = 'X', long, default_value = "GET")]
    pub method: String,

    /// Treat the request as a page navigation
    #[arg(short, long)]
    pub navigate: bool,

    /// Request body
    #[arg(short, long)]
    pub data: Option<String>,

    /// Extra request header, "Name: value" (repeatable)
    #[arg(short = 'H', long = "header")]
    pub headers: Vec<String>,

    /// Print status and headers before the body
    #[arg(short, long)]
    pub include: bool,
}

/// Output format for listings
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable table
    Table,
    /// JSON output
    Json,
    /// Simple text (one per line)
    Plain,
}

/// Arguments for the cache command
#[derive(Parser, Debug)]
pub struct CacheArgs {
    /// Subcommand for cache
    #[command(subcommand)]
    pub action: CacheAction,
}

/// Cache subcommands
#[derive(Subcommand, Debug)]
pub enum CacheAction {
    /// List all stores
    List {
        /// Output format
        #[arg(short, long, default_value = "table")]
        format: OutputFormat,
    },

    /// List entries of one store
    Entries {
        /// Store name
        store: String,

        /// Output format
        #[arg(short, long, default_value = "table")]
        format: OutputFormat,
    },

    /// Delete stores
    #[command(group(clap::ArgGroup::new("target").required(true).args(["store", "all"])))]
    Clear {
        /// Store to delete
        store: Option<String>,

        /// Delete every store
        #[arg(long)]
        all: bool,

        /// Skip confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
}

/// Arguments for the sync command
#[derive(Parser, Debug)]
pub struct SyncArgs {
    /// Subcommand for sync
    #[command(subcommand)]
    pub action: SyncAction,
}

/// Sync subcommands
#[derive(Subcommand, Debug)]
pub enum SyncAction {
    /// Show queued requests
    Status {
        /// Output format
        #[arg(short, long, default_value = "table")]
        format: OutputFormat,
    },

    /// Replay queued requests now
    Replay,

    /// Drop every queued request
    Clear {
        /// Skip confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
}

/// Arguments for the config command
#[derive(Parser, Debug)]
pub struct ConfigArgs {
    /// Subcommand for config
    #[command(subcommand)]
    pub action: Option<ConfigAction>,
}

/// Config subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Show configuration file path
    Path,

    /// Initialize default configuration
    Init {
        /// Overwrite existing configuration
        #[arg(short, long)]
        force: bool,
    },

    /// Set a configuration value
    Set {
        /// Dotted key, e.g. cache.static_version
        key: String,

        /// New value (lists are comma-separated)
        value: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_parses_serve() {
        let cli = Cli::parse_from(["tilawah", "serve", "--port", "9000"]);
        match cli.command {
            Commands::Serve(args) => {
                assert_eq!(args.port, Some(9000));
                assert!(args.upstream.is_none());
            }
            _ => panic!("expected Serve command"),
        }
    }

    #[test]
    fn cli_parses_status() {
        let cli = Cli::parse_from(["tilawah", "status"]);
        assert!(matches!(cli.command, Commands::Status));
    }

    #[test]
    fn cli_parses_fetch() {
        let cli = Cli::parse_from([
            "tilawah",
            "fetch",
            "-X",
            "post",
            "/api/bookmarks",
            "-d",
            "{}",
            "-H",
            "Content-Type: application/json",
        ]);
        match cli.command {
            Commands::Fetch(args) => {
                assert_eq!(args.url, "/api/bookmarks");
                assert_eq!(args.method, "post");
                assert_eq!(args.data.as_deref(), Some("{}"));
                assert_eq!(args.headers, vec!["Content-Type: application/json"]);
                assert!(!args.navigate);
            }
            _ => panic!("expected Fetch command"),
        }
    }

    #[test]
    fn cli_parses_global_flags_after_subcommand() {
        let cli = Cli::parse_from(["tilawah", "install", "--ephemeral", "-vv"]);
        assert!(cli.ephemeral);
        assert_eq!(cli.verbose, 2);
        assert!(matches!(cli.command, Commands::Install(_)));
    }

    #[test]
    fn cli_cache_clear_requires_target() {
        assert!(Cli::try_parse_from(["tilawah", "cache", "clear"]).is_err());
        let cli = Cli::parse_from(["tilawah", "cache", "clear", "--all", "-y"]);
        match cli.command {
            Commands::Cache(CacheArgs {
                action: CacheAction::Clear { all, yes, store },
            }) => {
                assert!(all && yes);
                assert!(store.is_none());
            }
            _ => panic!("expected Cache Clear command"),
        }
    }

    #[test]
    fn cli_parses_sync_replay() {
        let cli = Cli::parse_from(["tilawah", "sync", "replay"]);
        assert!(matches!(
            cli.command,
            Commands::Sync(SyncArgs {
                action: SyncAction::Replay
            })
        ));
    }

    #[test]
    fn cli_parses_config_without_action() {
        let cli = Cli::parse_from(["tilawah", "config"]);
        match cli.command {
            Commands::Config(args) => assert!(args.action.is_none()),
            _ => panic!("expected Config command"),
        }
    }

    #[test]
    fn cli_parses_config_set() {
        let cli = Cli::parse_from(["tilawah", "config", "set", "cache.api_version", "v2"]);
        match cli.command {
            Commands::Config(ConfigArgs {
                action: Some(ConfigAction::Set { key, value }),
            }) => {
                assert_eq!(key, "cache.api_version");
                assert_eq!(value, "v2");
            }
            _ => panic!("expected Config Set command"),
        }
    }

    #[test]
    fn cli_parses_completions() {
        let cli = Cli::parse_from(["tilawah", "completions", "bash"]);
        assert!(matches!(
            cli.command,
            Commands::Completions { shell: Shell::Bash }
        ));
    }
}
