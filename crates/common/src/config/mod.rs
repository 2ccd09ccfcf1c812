//! Configuration management for the Twilog search daemon
//!
//! Supports loading configuration from:
//! - Environment variables (prefixed with TWILOG__)
//! - Configuration files (config/default.toml, config/{env}.toml, config/local.toml)
//! - Default values

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    /// RPC socket configuration
    pub server: ServerConfig,

    /// On-disk store locations
    pub stores: StoreConfig,

    /// Embedder adapter configuration
    pub embedder: EmbedderConfig,

    /// Observability configuration
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    /// Host to bind to
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,

    /// Shutdown timeout in seconds
    #[serde(default = "default_shutdown_timeout")]
    pub shutdown_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StoreConfig {
    /// Content embeddings directory (`meta.json` + `NNNN.safetensors`)
    #[serde(default = "default_embeddings_dir")]
    pub embeddings_dir: String,

    /// Reasoning embeddings directory
    #[serde(default = "default_reasoning_dir")]
    pub reasoning_dir: String,

    /// Summary embeddings directory
    #[serde(default = "default_summary_dir")]
    pub summary_dir: String,

    /// Path to the CSV post archive
    #[serde(default = "default_csv_path")]
    pub csv_path: String,

    /// Reasoning/summary/tags JSONL
    #[serde(default = "default_results_path")]
    pub results_path: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EmbedderConfig {
    /// Base URL of the embedding adapter's HTTP endpoint
    #[serde(default = "default_embedder_endpoint")]
    pub endpoint: String,

    /// Request timeout in seconds
    #[serde(default = "default_embedder_timeout")]
    pub timeout_secs: u64,

    /// Maximum retries on transient transport failure
    #[serde(default = "default_embedder_retries")]
    pub max_retries: u32,

    /// Embedding dimension all stores and the embedder must agree on
    #[serde(default = "default_embedding_dimension")]
    pub dimension: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ObservabilityConfig {
    /// Log level (debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Enable JSON logging
    #[serde(default = "default_json_logging")]
    pub json_logging: bool,

    /// Metrics exporter port (0 to disable)
    #[serde(default = "default_metrics_port")]
    pub metrics_port: u16,

    /// Service name for tracing
    #[serde(default = "default_service_name")]
    pub service_name: String,
}

// Default value functions
fn default_host() -> String { "127.0.0.1".to_string() }
fn default_port() -> u16 { 8765 }
fn default_shutdown_timeout() -> u64 { 10 }
fn default_embeddings_dir() -> String { "embeddings".to_string() }
fn default_reasoning_dir() -> String { "batch/reasoning".to_string() }
fn default_summary_dir() -> String { "batch/summary".to_string() }
fn default_csv_path() -> String { "twilog.csv".to_string() }
fn default_results_path() -> String { "batch/results.jsonl".to_string() }
fn default_embedder_endpoint() -> String { "http://127.0.0.1:8766".to_string() }
fn default_embedder_timeout() -> u64 { 30 }
fn default_embedder_retries() -> u32 { 3 }
fn default_embedding_dimension() -> usize { crate::DEFAULT_EMBEDDING_DIMENSION }
fn default_log_level() -> String { "info".to_string() }
fn default_json_logging() -> bool { true }
fn default_metrics_port() -> u16 { 0 }
fn default_service_name() -> String { "twilog-search".to_string() }

impl AppConfig {
    /// Load configuration from environment and files
    pub fn load() -> Result<Self, ConfigError> {
        let env = std::env::var("TWILOG_ENV").unwrap_or_else(|_| "development".to_string());

        let config = Config::builder()
            // Start with defaults
            .set_default("server.host", default_host())?
            .set_default("server.port", default_port() as i64)?

            // Load base config file
            .add_source(File::with_name("config/default").required(false))

            // Load environment-specific config
            .add_source(File::with_name(&format!("config/{}", env)).required(false))

            // Load local overrides
            .add_source(File::with_name("config/local").required(false))

            // Load from environment variables with TWILOG__ prefix
            // e.g., TWILOG__SERVER__PORT=8900
            .add_source(
                Environment::with_prefix("TWILOG")
                    .separator("__")
                    .try_parsing(true)
            )

            .build()?;

        config.try_deserialize()
    }

    /// Load from a specific TOML file
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let config = Config::builder()
            .add_source(File::with_name(path))
            .add_source(
                Environment::with_prefix("TWILOG")
                    .separator("__")
                    .try_parsing(true)
            )
            .build()?;

        config.try_deserialize()
    }

    /// Get shutdown timeout as Duration
    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.server.shutdown_timeout_secs)
    }

    /// Get embedder timeout as Duration
    pub fn embedder_timeout(&self) -> Duration {
        Duration::from_secs(self.embedder.timeout_secs)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: default_host(),
                port: default_port(),
                shutdown_timeout_secs: default_shutdown_timeout(),
            },
            stores: StoreConfig {
                embeddings_dir: default_embeddings_dir(),
                reasoning_dir: default_reasoning_dir(),
                summary_dir: default_summary_dir(),
                csv_path: default_csv_path(),
                results_path: default_results_path(),
            },
            embedder: EmbedderConfig {
                endpoint: default_embedder_endpoint(),
                timeout_secs: default_embedder_timeout(),
                max_retries: default_embedder_retries(),
                dimension: default_embedding_dimension(),
            },
            observability: ObservabilityConfig {
                log_level: default_log_level(),
                json_logging: default_json_logging(),
                metrics_port: default_metrics_port(),
                service_name: default_service_name(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.server.port, 8765);
        assert_eq!(config.embedder.dimension, 768);
    }

    #[test]
    fn test_default_store_paths() {
        let config = AppConfig::default();
        assert_eq!(config.stores.embeddings_dir, "embeddings");
        assert_eq!(config.stores.reasoning_dir, "batch/reasoning");
        assert_eq!(config.stores.summary_dir, "batch/summary");
        assert_eq!(config.stores.csv_path, "twilog.csv");
    }
}
