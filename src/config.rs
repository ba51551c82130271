use clap::Parser;
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::commands::Command;

/// Environment variable holding the API base URL.
pub const API_URL_ENV: &str = "AGORA_API_URL";

#[derive(Parser, Debug)]
#[command(name = "agora", about = "Client for the Agora civic collaboration platform")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Base URL of the Agora API
    #[arg(long, global = true)]
    pub api_url: Option<String>,

    /// Request timeout in seconds
    #[arg(long, global = true)]
    pub timeout: Option<u64>,

    /// Path to data directory
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub api: ApiConfig,
    pub storage: StorageConfig,
    pub auth: AuthConfig,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: String,
    pub timeout_secs: u64,
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct StorageConfig {
    pub path: Option<PathBuf>,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct AuthConfig {
    pub access_cookie: String,
    pub refresh_cookie: String,
    pub access_ttl_hours: i64,
    pub refresh_ttl_hours: i64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            timeout_secs: 30,
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            access_cookie: "access_token".to_string(),
            refresh_cookie: "refresh_token".to_string(),
            access_ttl_hours: 24,
            refresh_ttl_hours: 24 * 7,
        }
    }
}

impl Config {
    pub fn load(cli: &Cli) -> anyhow::Result<Self> {
        Self::load_with_env(cli, std::env::var(API_URL_ENV).ok())
    }

    /// Layering: defaults, then the TOML file, then the environment, then
    /// CLI flags.
    pub fn load_with_env(cli: &Cli, env_api_url: Option<String>) -> anyhow::Result<Self> {
        let data_dir = Self::data_dir(cli);
        let config_path = cli
            .config
            .clone()
            .unwrap_or_else(|| data_dir.join("config.toml"));

        let mut config = if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            toml::from_str(&content)?
        } else {
            Config::default()
        };

        if let Some(url) = env_api_url.filter(|u| !u.trim().is_empty()) {
            config.api.base_url = url;
        }

        // CLI overrides
        if let Some(ref url) = cli.api_url {
            config.api.base_url = url.clone();
        }
        if let Some(timeout) = cli.timeout {
            config.api.timeout_secs = timeout;
        }

        if config.storage.path.is_none() {
            config.storage.path = Some(data_dir.join("agora.db"));
        }

        Ok(config)
    }

    pub fn data_dir(cli: &Cli) -> PathBuf {
        cli.data_dir.clone().unwrap_or_else(|| {
            dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".agora")
        })
    }

    pub fn db_path(&self) -> &Path {
        self.storage
            .path
            .as_deref()
            .unwrap_or_else(|| Path::new("agora.db"))
    }
}
