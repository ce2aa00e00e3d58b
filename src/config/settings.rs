/// Service configuration structures

use std::net::SocketAddr;
use std::path::Path;
use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::core::{DEFAULT_MAX_PAGES, DEFAULT_REQUEST_TIMEOUT_SECS, DEFAULT_UPSTREAM_BASE_URL};

/// Environment variables consulted after the file is read.
pub const API_KEY_ENV: &str = "UNLEASH_API_KEY";
pub const LEGACY_API_KEY_ENV: &str = "API_KEY";
pub const BIND_ADDR_ENV: &str = "CLEMENTINE_BIND_ADDR";

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub upstream: UpstreamConfig,
    pub pagination: PaginationConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_addr: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct UpstreamConfig {
    pub base_url: String,
    pub api_key: String,
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PaginationConfig {
    /// Safety ceiling on pages fetched per resource.
    pub max_pages: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub directory: String,
    pub file_prefix: String,
    /// Filter used when RUST_LOG is unset.
    pub level: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:3000".to_string(),
        }
    }
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_UPSTREAM_BASE_URL.to_string(),
            api_key: String::new(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
        }
    }
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            max_pages: DEFAULT_MAX_PAGES,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            directory: "logs".to_string(),
            file_prefix: "clementine.log".to_string(),
            level: "info".to_string(),
        }
    }
}

impl Config {
    pub fn load_from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        Ok(config)
    }

    /// File (or defaults when no path is given) with environment overrides applied.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let mut config = match path {
            Some(path) => Self::load_from_file(path)?,
            None => Self::default(),
        };
        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(key) = non_empty(API_KEY_ENV).or_else(|| non_empty(LEGACY_API_KEY_ENV)) {
            self.upstream.api_key = key.trim().to_string();
        }
        if let Some(addr) = non_empty(BIND_ADDR_ENV) {
            self.server.bind_addr = addr.trim().to_string();
        }
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.upstream.api_key.trim().is_empty() {
            bail!(
                "upstream.api_key is not set; provide it in the config file or via {}",
                API_KEY_ENV
            );
        }
        Url::parse(&self.upstream.base_url)
            .with_context(|| format!("upstream.base_url is not a valid URL: {}", self.upstream.base_url))?;
        if self.upstream.request_timeout_secs == 0 {
            bail!("upstream.request_timeout_secs must be positive");
        }
        if self.pagination.max_pages == 0 {
            bail!("pagination.max_pages must be at least 1");
        }
        self.bind_socket()?;
        Ok(())
    }

    pub fn bind_socket(&self) -> anyhow::Result<SocketAddr> {
        self.server
            .bind_addr
            .parse()
            .with_context(|| format!("server.bind_addr is not a socket address: {}", self.server.bind_addr))
    }
}
