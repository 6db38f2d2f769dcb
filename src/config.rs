use clap::Parser;
use serde::Deserialize;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

use crate::store::StoreError;

pub const DEFAULT_CONFIG_FILE: &str = "handoff.toml";

#[derive(Parser, Debug)]
#[command(name = "handoff", about = "Short-lived token staging for OAuth handoffs")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Host to bind to
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind to
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Durable storage endpoint (Supabase project URL)
    #[arg(long, env = "SUPABASE_URL")]
    pub supabase_url: Option<String>,

    /// Durable storage access key
    #[arg(long, env = "SUPABASE_ANON_KEY", hide_env_values = true)]
    pub supabase_key: Option<String>,
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub durable: DurableConfig,
    pub store: StoreConfig,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub request_timeout_secs: u64,
}

#[derive(Deserialize, Clone)]
#[serde(default)]
pub struct DurableConfig {
    pub url: Option<String>,
    pub key: Option<String>,
    pub table: String,
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct StoreConfig {
    pub sweep_interval_secs: Option<u64>,
}

/// Durable storage settings that passed validation.
#[derive(Clone)]
pub struct DurableSettings {
    pub url: Url,
    pub key: String,
    pub table: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8787,
            request_timeout_secs: 10,
        }
    }
}

impl Default for DurableConfig {
    fn default() -> Self {
        Self {
            url: None,
            key: None,
            table: "oauth_tokens".to_string(),
        }
    }
}

// The credential never goes to logs.
impl fmt::Debug for DurableConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DurableConfig")
            .field("url", &self.url)
            .field("key", &self.key.as_ref().map(|_| "<redacted>"))
            .field("table", &self.table)
            .finish()
    }
}

impl fmt::Debug for DurableSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DurableSettings")
            .field("url", &self.url.as_str())
            .field("key", &"<redacted>")
            .field("table", &self.table)
            .finish()
    }
}

impl DurableConfig {
    /// Validate endpoint and credential. Any error here means the store runs
    /// on the in-memory fallback.
    pub fn settings(&self) -> Result<DurableSettings, StoreError> {
        let raw_url = present(self.url.as_deref())
            .ok_or_else(|| StoreError::ConfigurationMissing("SUPABASE_URL is not set".into()))?;
        let key = present(self.key.as_deref()).ok_or_else(|| {
            StoreError::ConfigurationMissing("SUPABASE_ANON_KEY is not set".into())
        })?;

        let url = Url::parse(raw_url).map_err(|e| {
            StoreError::ConfigurationMissing(format!("SUPABASE_URL {:?} is malformed: {}", raw_url, e))
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(StoreError::ConfigurationMissing(format!(
                "SUPABASE_URL must be http(s), got {}",
                url.scheme()
            )));
        }
        if !key.chars().all(|c| c.is_ascii_graphic()) {
            return Err(StoreError::ConfigurationMissing(
                "SUPABASE_ANON_KEY contains invalid characters".into(),
            ));
        }
        let table = self.table.trim();
        if table.is_empty() {
            return Err(StoreError::ConfigurationMissing(
                "durable table name is empty".into(),
            ));
        }

        Ok(DurableSettings {
            url,
            key: key.to_string(),
            table: table.to_string(),
        })
    }
}

fn present(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

impl Config {
    pub fn load(cli: &Cli) -> anyhow::Result<Self> {
        let config_path = cli
            .config
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));

        let mut config = if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            toml::from_str(&content)?
        } else if cli.config.is_some() {
            anyhow::bail!("Config file not found: {}", config_path.display());
        } else {
            Config::default()
        };

        // CLI / environment overrides
        if let Some(ref host) = cli.host {
            config.server.host = host.clone();
        }
        if let Some(port) = cli.port {
            config.server.port = port;
        }
        if let Some(ref url) = cli.supabase_url {
            config.durable.url = Some(url.clone());
        }
        if let Some(ref key) = cli.supabase_key {
            config.durable.key = Some(key.clone());
        }

        Ok(config)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.server.request_timeout_secs)
    }

    pub fn sweep_interval(&self) -> Option<Duration> {
        self.store
            .sweep_interval_secs
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
    }
}
