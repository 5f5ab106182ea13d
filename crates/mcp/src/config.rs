use anyhow::{bail, Context, Result};
use mcpbr_core::{CnaeService, DEFAULT_CACHE_CAPACITY};
use mcpbr_ibge::{IbgeClient, RetryConfig, DEFAULT_BASE_URL};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// Environment variable naming the configuration file
pub const CONFIG_PATH_ENV: &str = "MCPBR_CONFIG";

/// Configuration file used when `MCPBR_CONFIG` is unset
pub const DEFAULT_CONFIG_PATH: &str = "mcpbr.toml";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct McpConfig {
    #[serde(default)]
    pub upstream: UpstreamConfig,

    #[serde(default)]
    pub cache: CacheConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpstreamConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_capacity")]
    pub capacity: usize,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_max_retries() -> u32 {
    2
}

fn default_initial_backoff_ms() -> u64 {
    200
}

fn default_capacity() -> usize {
    DEFAULT_CACHE_CAPACITY
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
            max_retries: default_max_retries(),
            initial_backoff_ms: default_initial_backoff_ms(),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity: default_capacity(),
        }
    }
}

impl McpConfig {
    /// Load configuration from a TOML file; a missing file means defaults
    pub fn load(config_path: &Path) -> Result<Self> {
        if !config_path.exists() {
            tracing::info!(path = %config_path.display(), "Configuration file not found, using defaults");
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read configuration file {}", config_path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("Failed to parse configuration file {}", config_path.display()))
    }

    /// Load from `MCPBR_CONFIG` (or `mcpbr.toml`) and apply environment overrides
    pub fn from_env() -> Result<Self> {
        let path = std::env::var(CONFIG_PATH_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH));

        let mut config = Self::load(&path)?;
        config.apply_env_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Override fields from `MCPBR_*` variables resolved through `lookup`
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(base_url) = lookup("MCPBR_IBGE_BASE_URL") {
            self.upstream.base_url = base_url;
        }
        if let Some(value) = lookup("MCPBR_TIMEOUT_SECS") {
            self.upstream.timeout_secs = parse_var("MCPBR_TIMEOUT_SECS", &value)?;
        }
        if let Some(value) = lookup("MCPBR_MAX_RETRIES") {
            self.upstream.max_retries = parse_var("MCPBR_MAX_RETRIES", &value)?;
        }
        if let Some(value) = lookup("MCPBR_CACHE_CAPACITY") {
            self.cache.capacity = parse_var("MCPBR_CACHE_CAPACITY", &value)?;
        }
        Ok(())
    }

    pub fn retry_config(&self) -> RetryConfig {
        RetryConfig {
            max_retries: self.upstream.max_retries,
            initial_backoff: Duration::from_millis(self.upstream.initial_backoff_ms),
            ..Default::default()
        }
    }

    /// Build the IBGE-backed access layer described by this configuration
    pub fn build_service(&self) -> Result<CnaeService> {
        if self.cache.capacity == 0 {
            bail!("cache.capacity must be greater than zero");
        }

        let client = IbgeClient::builder()
            .base_url(&self.upstream.base_url)
            .timeout(Duration::from_secs(self.upstream.timeout_secs))
            .retry_config(self.retry_config())
            .build()
            .context("Failed to create IBGE client")?;

        tracing::info!(
            base_url = %client.config().base_url,
            timeout_secs = self.upstream.timeout_secs,
            max_retries = self.upstream.max_retries,
            cache_capacity = self.cache.capacity,
            "CNAE access layer configured"
        );

        Ok(CnaeService::with_cache_capacity(
            Arc::new(client),
            self.cache.capacity,
        ))
    }
}

fn parse_var<T: std::str::FromStr>(name: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| anyhow::anyhow!("Invalid value for {}: {:?}", name, value))
}
