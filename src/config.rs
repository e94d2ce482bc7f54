use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use tracing::info;

use crate::client::{ClientBuilder, ClientError, DEFAULT_QUEUE_CAPACITY};
use crate::labels::LabelSet;
use crate::transport::loki::{normalize_address, LokiConfig as LokiRuntimeConfig};

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("Invalid config: {0}")]
    Validation(String),
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub loki: LokiConfig,

    #[serde(default)]
    pub client: ClientConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LokiConfig {
    /// Loki URL (e.g., "http://loki:3100"); `http://` is assumed when missing
    pub url: String,

    /// Tenant ID for multi-tenant Loki (X-Scope-OrgID header)
    #[serde(default)]
    pub tenant_id: Option<String>,

    #[serde(default)]
    pub username: Option<String>,

    #[serde(default)]
    pub password: Option<String>,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClientConfig {
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    #[serde(default = "default_batch_timeout_ms")]
    pub batch_timeout_ms: u64,

    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    /// Labels attached to every stream
    #[serde(default)]
    pub labels: LabelSet,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            batch_timeout_ms: default_batch_timeout_ms(),
            queue_capacity: default_queue_capacity(),
            labels: LabelSet::new(),
        }
    }
}

fn default_batch_size() -> usize {
    5
}

fn default_batch_timeout_ms() -> u64 {
    5_000
}

fn default_queue_capacity() -> usize {
    DEFAULT_QUEUE_CAPACITY
}

// ============================================================================
// Conversion implementations: YAML config → Runtime config
// ============================================================================

impl LokiConfig {
    /// Convert to runtime LokiConfig, normalizing the URL scheme
    pub fn to_runtime_config(&self) -> Result<LokiRuntimeConfig, ConfigError> {
        let url = normalize_address(&self.url)
            .map_err(|e| ConfigError::Validation(format!("Invalid loki url {}: {}", self.url, e)))?;

        Ok(LokiRuntimeConfig {
            url,
            tenant_id: self.tenant_id.clone(),
            username: self.username.clone(),
            password: self.password.clone(),
            timeout_secs: self.timeout_secs,
        })
    }
}

impl ClientConfig {
    /// Apply batching options and labels to a client builder
    pub fn apply(&self, builder: ClientBuilder) -> ClientBuilder {
        builder
            .labels(self.labels.clone())
            .batch_size(self.batch_size)
            .batch_timeout(Duration::from_millis(self.batch_timeout_ms))
            .queue_capacity(self.queue_capacity)
    }
}

impl Config {
    /// Load config from YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Load config from YAML string (used in tests)
    #[cfg(test)]
    pub fn from_str(yaml: &str) -> Result<Self, ConfigError> {
        let config: Config = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    fn validate(&self) -> Result<(), ConfigError> {
        self.loki.to_runtime_config()?;

        if self.client.batch_size == 0 {
            return Err(ConfigError::Validation(
                "client.batch_size must be at least 1".to_string(),
            ));
        }
        if self.client.queue_capacity == 0 {
            return Err(ConfigError::Validation(
                "client.queue_capacity must be at least 1".to_string(),
            ));
        }

        Ok(())
    }

    /// Builder for a Loki client configured from this file
    pub fn client_builder(&self) -> Result<ClientBuilder, ClientError> {
        let loki = self
            .loki
            .to_runtime_config()
            .map_err(|e| ClientError::InvalidConfig(e.to_string()))?;
        let builder = ClientBuilder::with_loki_config(loki)?;
        Ok(self.client.apply(builder))
    }

    /// Print the configuration (masking secrets)
    pub fn print_config(&self) {
        info!("Loki: {}", self.loki.url);
        if let Some(ref tenant_id) = self.loki.tenant_id {
            info!("  Tenant: {}", tenant_id);
        }
        if self.loki.username.is_some() {
            info!("  Basic auth: enabled");
        }
        info!(
            "Batch: size={}, timeout={}ms, queue={}",
            self.client.batch_size, self.client.batch_timeout_ms, self.client.queue_capacity
        );
        if !self.client.labels.is_empty() {
            let labels: Vec<String> = self
                .client
                .labels
                .iter()
                .map(|(k, v)| format!("{}={}", k, v))
                .collect();
            info!("Labels: {}", labels.join(", "));
        }
    }
}
