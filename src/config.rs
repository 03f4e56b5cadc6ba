// src/config.rs
use clap::Parser;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Command-line arguments for the application.
#[derive(Parser, Debug, Deserialize, Default)]
#[clap(author, version, about, long_about = None)]
pub struct CliArgs {
    /// HTTP address for the site server (e.g., "0.0.0.0:3000")
    #[clap(
        short = 'a',
        long,
        value_parser,
        help = "HTTP address for the site server (e.g., \"0.0.0.0:3000\")"
    )]
    pub http: Option<String>,

    /// Address for the collaboration relay (e.g., "0.0.0.0:3001")
    #[clap(
        short,
        long,
        value_parser,
        help = "Address for the collaboration relay (e.g., \"0.0.0.0:3001\")"
    )]
    pub relay: Option<String>,

    /// Path to a configuration file (e.g., veranda.toml)
    #[clap(
        short,
        long,
        value_parser,
        help = "Path to a configuration file (e.g., veranda.toml)"
    )]
    pub config: Option<PathBuf>,

    /// Project root directory to serve
    #[clap(help = "Project root directory to serve")]
    pub root: Option<String>,

    /// Log level (e.g., trace, debug, info, warn, error)
    #[clap(
        long,
        value_parser,
        help = "Log level (e.g., trace, debug, info, warn, error)"
    )]
    pub log_level: Option<String>,
}

/// Configuration loaded from file, environment, or defaults.
#[derive(Deserialize, Serialize, Debug, Default)]
pub struct FileConfig {
    /// Project root to serve
    pub root: Option<String>,
    /// HTTP address
    pub http: Option<String>,
    /// Relay address
    pub relay: Option<String>,
    /// Static asset cache lifetime in seconds
    pub max_age: Option<u64>,
    /// Log level
    pub log_level: Option<String>,
}

/// Final application configuration after merging all sources.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// HTTP address for the site server
    pub http_addr: String,
    /// Address for the collaboration relay
    pub relay_addr: String,
    /// Project root directory served to clients
    pub root_dir: PathBuf,
    /// Cache lifetime applied to non-HTML static assets, in seconds
    pub asset_max_age: u64,
    /// Log level
    pub log_level: String,
}

impl AppConfig {
    /// Loads the application configuration by merging CLI, file, environment, and defaults.
    pub fn load() -> Result<Self, figment::Error> {
        let cli_args = CliArgs::parse();

        let config_file_path = cli_args
            .config
            .clone()
            .unwrap_or_else(|| PathBuf::from("veranda.toml"));

        // Default log level from environment variable VERANDA_LOG_LEVEL, then "info"
        let default_log_level =
            std::env::var("VERANDA_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let fig = Figment::new()
            .merge(Serialized::defaults(FileConfig {
                // These are the lowest precedence defaults
                root: Some(".".to_string()),
                http: Some("0.0.0.0:3000".to_string()),
                relay: Some("0.0.0.0:3001".to_string()),
                max_age: Some(3600),
                log_level: Some(default_log_level.clone()),
            }))
            .merge(Toml::file(config_file_path).nested())
            .merge(Env::prefixed("VERANDA_").map(|key| key.as_str().replace("__", ".").into()));

        // Extract the config after merging defaults, file, and env
        let mut merged_config: FileConfig = fig.select("veranda").extract()?;

        // CLI overrides take highest precedence
        if let Some(cli_ll) = cli_args.log_level {
            merged_config.log_level = Some(cli_ll);
        }
        if let Some(cli_http) = cli_args.http {
            merged_config.http = Some(cli_http);
        }
        if let Some(cli_relay) = cli_args.relay {
            merged_config.relay = Some(cli_relay);
        }
        if let Some(cli_root) = cli_args.root {
            merged_config.root = Some(cli_root);
        }

        Ok(AppConfig {
            http_addr: merged_config
                .http
                .unwrap_or_else(|| "0.0.0.0:3000".to_string()),
            relay_addr: merged_config
                .relay
                .unwrap_or_else(|| "0.0.0.0:3001".to_string()),
            root_dir: PathBuf::from(merged_config.root.unwrap_or_else(|| ".".to_string())),
            asset_max_age: merged_config.max_age.unwrap_or(3600),
            log_level: merged_config.log_level.unwrap_or(default_log_level),
        })
    }
}
