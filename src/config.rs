use crate::store;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;

pub const DEFAULT_BUCKET: &str = "worksheet-files";
pub const DEFAULT_TABLE: &str = "worksheets";
pub const DEFAULT_DEMO_STORE: &str = "dir:///tmp/worksheets";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    pub backend: BackendConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_max_upload_mb")]
    pub max_upload_mb: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            max_upload_mb: default_max_upload_mb(),
        }
    }
}

/// Which persistence backend serves the catalog.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum BackendConfig {
    Demo(DemoConfig),
    Remote(RemoteConfig),
}

#[derive(Debug, Clone, Deserialize)]
pub struct DemoConfig {
    /// store url of the durable slot, `dir:///path` or `memory://`
    #[serde(default = "default_demo_store")]
    pub store: String,
    #[serde(default = "default_true")]
    pub simulate_latency: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RemoteConfig {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub service_key: String,
    #[serde(default = "default_bucket")]
    pub bucket: String,
    #[serde(default = "default_table")]
    pub table: String,
    /// user session token, only used to resolve the current actor
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
}

fn default_host() -> String {
    "127.0.0.1".into()
}

fn default_port() -> u16 {
    8080
}

fn default_max_upload_mb() -> usize {
    25
}

fn default_demo_store() -> String {
    DEFAULT_DEMO_STORE.into()
}

fn default_true() -> bool {
    true
}

fn default_bucket() -> String {
    DEFAULT_BUCKET.into()
}

fn default_table() -> String {
    DEFAULT_TABLE.into()
}

fn default_timeout() -> u64 {
    30
}

impl Config {
    /// Loads the config file when one is given, the process environment
    /// otherwise.
    pub async fn load(path: Option<&str>) -> Result<Config> {
        match path {
            Some(path) => parse_config(path).await,
            None => from_env(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !hostname_validator::is_valid(&self.server.host) {
            return Err(anyhow::Error::msg(format!(
                "host '{}' is invalid",
                self.server.host
            )));
        }

        match &self.backend {
            BackendConfig::Remote(remote) => {
                if remote.url.trim().is_empty() || remote.service_key.trim().is_empty() {
                    return Err(anyhow::Error::msg(
                        "Missing Supabase credentials. Set SUPABASE_URL and SUPABASE_SERVICE_ROLE_KEY or configure url and service_key in the [backend] section.",
                    ));
                }
                if remote.bucket.trim().is_empty() {
                    return Err(anyhow::Error::msg("storage bucket name is empty"));
                }
            }
            BackendConfig::Demo(demo) => {
                let u = url::Url::parse(&demo.store)
                    .with_context(|| format!("invalid demo store url '{}'", demo.store))?;
                if u.scheme() != store::dir::SCHEME && u.scheme() != store::memory::SCHEME {
                    return Err(anyhow::Error::msg(format!(
                        "unknown store type '{}'",
                        u.scheme()
                    )));
                }
            }
        }

        Ok(())
    }
}

/// Parse the config file into Config struct.
pub async fn parse_config(filepath: &str) -> Result<Config> {
    let content = fs::read_to_string(filepath).context("failed to read config file")?;
    let c: Config = toml::from_str(&content).context("failed to convert toml config data")?;

    c.validate()?;
    Ok(c)
}

fn var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// Builds the config from `WORKSHEETS_*` and `SUPABASE_*` environment variables.
pub fn from_env() -> Result<Config> {
    let backend = match var("WORKSHEETS_BACKEND").as_deref() {
        None | Some("remote") => BackendConfig::Remote(RemoteConfig {
            url: var("SUPABASE_URL").unwrap_or_default(),
            service_key: var("SUPABASE_SERVICE_ROLE_KEY").unwrap_or_default(),
            bucket: var("SUPABASE_BUCKET").unwrap_or_else(default_bucket),
            table: var("SUPABASE_TABLE").unwrap_or_else(default_table),
            access_token: var("SUPABASE_ACCESS_TOKEN"),
            timeout_seconds: default_timeout(),
        }),
        Some("demo") => BackendConfig::Demo(DemoConfig {
            store: var("WORKSHEETS_STORE").unwrap_or_else(default_demo_store),
            simulate_latency: var("WORKSHEETS_SIMULATE_LATENCY")
                .map(|v| v != "false" && v != "0")
                .unwrap_or(true),
        }),
        Some(other) => {
            return Err(anyhow::Error::msg(format!(
                "unknown backend '{}', expected 'demo' or 'remote'",
                other
            )))
        }
    };

    let mut server = ServerConfig::default();
    if let Some(host) = var("WORKSHEETS_HOST") {
        server.host = host;
    }
    if let Some(port) = var("WORKSHEETS_PORT") {
        server.port = port
            .parse()
            .with_context(|| format!("port '{}' is invalid", port))?;
    }

    let config = Config { server, backend };
    config.validate()?;
    Ok(config)
}
