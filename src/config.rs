//! # Relay Configuration
//!
//! Settings for the HTTP listener, the upload directory, the external printer
//! service and the in-memory job registry.
//!
//! ## Example: TOML Configuration
//!
//! ```toml
//! [server]
//! bind = "0.0.0.0:3000"
//!
//! [storage]
//! upload_dir = "uploads"
//! max_upload_bytes = 10485760
//! allowed_extensions = ["jpg", "jpeg", "png", "gif"]
//!
//! [printer]
//! api_host = "http://printer-api:8080"
//! endpoints = ["0", "1"]
//! timeout_secs = 30
//!
//! [registry]
//! max_jobs = 1000
//! retention_secs = 3600
//! upload_ttl_secs = 1800
//! ```
//!
//! Every field has a default, so a partial file (or no file) is valid. The
//! `API_HOST` environment variable overrides `printer.api_host`.

use crate::print_job::Retention;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Environment variable carrying the printer service base URL.
pub const API_HOST_ENV: &str = "API_HOST";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub printer: PrinterConfig,
    #[serde(default)]
    pub registry: RegistryConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { bind: default_bind() }
    }
}

/// Where uploads are written and what is accepted.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
    #[serde(default = "default_upload_dir")]
    pub upload_dir: PathBuf,
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
    #[serde(default = "default_allowed_extensions")]
    pub allowed_extensions: Vec<String>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            upload_dir: default_upload_dir(),
            max_upload_bytes: default_max_upload_bytes(),
            allowed_extensions: default_allowed_extensions(),
        }
    }
}

/// External printer service.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PrinterConfig {
    #[serde(default = "default_api_host")]
    pub api_host: String,
    /// Paths under `api_host` that accept prints; one is picked at random
    /// per submission. Empty means post to `api_host` itself.
    #[serde(default = "default_endpoints")]
    pub endpoints: Vec<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
}

impl Default for PrinterConfig {
    fn default() -> Self {
        Self {
            api_host: default_api_host(),
            endpoints: default_endpoints(),
            timeout_secs: default_timeout_secs(),
            connect_timeout_secs: default_connect_timeout_secs(),
        }
    }
}

impl PrinterConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

/// Job registry limits and eviction.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RegistryConfig {
    #[serde(default = "default_max_jobs")]
    pub max_jobs: usize,
    /// How long a completed or failed job stays queryable.
    #[serde(default = "default_retention_secs")]
    pub retention_secs: u64,
    /// How long an upload that is never printed is kept.
    #[serde(default = "default_upload_ttl_secs")]
    pub upload_ttl_secs: u64,
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            max_jobs: default_max_jobs(),
            retention_secs: default_retention_secs(),
            upload_ttl_secs: default_upload_ttl_secs(),
            sweep_interval_secs: default_sweep_interval_secs(),
        }
    }
}

impl RegistryConfig {
    pub fn retention(&self) -> Retention {
        Retention {
            finished: Duration::from_secs(self.retention_secs),
            unprinted: Duration::from_secs(self.upload_ttl_secs),
        }
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }
}

impl Config {
    /// Apply `API_HOST` from the environment when it is set and non-empty.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(host) = std::env::var(API_HOST_ENV) {
            self.apply_api_host(&host);
        }
    }

    fn apply_api_host(&mut self, host: &str) {
        let host = host.trim();
        if !host.is_empty() {
            tracing::info!("Printer API host overridden by {}: {}", API_HOST_ENV, host);
            self.printer.api_host = host.to_string();
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.storage.max_upload_bytes == 0 {
            return Err(ConfigError::Invalid("storage.max_upload_bytes must be > 0".to_string()));
        }
        if self.storage.allowed_extensions.is_empty() {
            return Err(ConfigError::Invalid("storage.allowed_extensions must not be empty".to_string()));
        }
        if !self.printer.api_host.starts_with("http://") && !self.printer.api_host.starts_with("https://") {
            return Err(ConfigError::Invalid(format!(
                "printer.api_host '{}' must be an http(s) URL",
                self.printer.api_host
            )));
        }
        if self.printer.timeout_secs == 0 || self.printer.connect_timeout_secs == 0 {
            return Err(ConfigError::Invalid("printer timeouts must be > 0".to_string()));
        }
        if self.registry.max_jobs == 0 {
            return Err(ConfigError::Invalid("registry.max_jobs must be > 0".to_string()));
        }
        if self.registry.sweep_interval_secs == 0 {
            return Err(ConfigError::Invalid("registry.sweep_interval_secs must be > 0".to_string()));
        }
        Ok(())
    }
}

// Default value functions
fn default_bind() -> String { "0.0.0.0:3000".to_string() }
fn default_upload_dir() -> PathBuf { PathBuf::from("uploads") }
fn default_max_upload_bytes() -> usize { 10 * 1024 * 1024 }
fn default_allowed_extensions() -> Vec<String> {
    ["jpg", "jpeg", "png", "gif"].iter().map(|s| s.to_string()).collect()
}
fn default_api_host() -> String { "http://printer-api:8080".to_string() }
fn default_endpoints() -> Vec<String> { vec!["0".to_string(), "1".to_string()] }
fn default_timeout_secs() -> u64 { 30 }
fn default_connect_timeout_secs() -> u64 { 10 }
fn default_max_jobs() -> usize { 1000 }
fn default_retention_secs() -> u64 { 3600 }
fn default_upload_ttl_secs() -> u64 { 1800 }
fn default_sweep_interval_secs() -> u64 { 60 }

/// Load configuration from a TOML file at the given path.
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    match std::fs::read_to_string(path) {
        Ok(contents) => match toml::from_str(&contents) {
            Ok(config) => Ok(config),
            Err(e) => {
                tracing::error!("Failed to parse config TOML: {}", e);
                Err(ConfigError::Toml(e))
            }
        },
        Err(e) => {
            tracing::error!("Failed to read config file '{}': {}", path.display(), e);
            Err(ConfigError::Io(e))
        }
    }
}

/// Like [`load_config`], but a missing file yields the built-in defaults.
pub fn load_config_or_default(path: &Path) -> Result<Config, ConfigError> {
    if !path.exists() {
        tracing::info!("No config file at '{}', using defaults", path.display());
        return Ok(Config::default());
    }
    load_config(path)
}
