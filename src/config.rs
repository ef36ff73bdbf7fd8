//! Configuration management for the kaze service
//!
//! Handles loading configuration from an optional TOML file and environment
//! variables, and provides validation for all configuration settings.

use crate::KazeError;
use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

/// Root configuration structure for the kaze service
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct KazeConfig {
    /// HTTP server configuration
    #[serde(default)]
    pub server: ServerConfig,
    /// Open-Meteo API configuration
    #[serde(default)]
    pub open_meteo: OpenMeteoConfig,
    /// Enrichment fan-out configuration
    #[serde(default)]
    pub enrichment: EnrichmentConfig,
    /// Power plant store configuration
    #[serde(default)]
    pub store: StoreConfig,
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// HTTP server settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_server_host")]
    pub host: String,
    #[serde(default = "default_server_port")]
    pub port: u16,
    /// Overall deadline for a single request in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_seconds: u32,
}

/// Open-Meteo API settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenMeteoConfig {
    /// Base URL; `/elevation` and `/forecast` are appended
    #[serde(default = "default_open_meteo_base_url")]
    pub base_url: String,
    /// API key for the commercial endpoints (optional)
    pub api_key: Option<String>,
    /// Per-request timeout in seconds
    #[serde(default = "default_open_meteo_timeout")]
    pub timeout_seconds: u32,
    /// Retries for transient failures (5xx, 429, network)
    #[serde(default = "default_open_meteo_max_retries")]
    pub max_retries: u32,
}

/// Enrichment settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrichmentConfig {
    /// Maximum number of plants enriched concurrently within one list request
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,
}

/// Which store implementation backs the service
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Memory,
    Postgres,
}

/// Store settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default)]
    pub backend: StoreBackend,
    /// Connection string, required for the postgres backend
    pub database_url: Option<String>,
}

/// Logging settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Log format (pretty or json)
    #[serde(default = "default_log_format")]
    pub format: String,
}

// Default value functions
fn default_server_host() -> String {
    "0.0.0.0".to_string()
}

fn default_server_port() -> u16 {
    8080
}

fn default_request_timeout() -> u32 {
    30
}

fn default_open_meteo_base_url() -> String {
    "https://api.open-meteo.com/v1".to_string()
}

fn default_open_meteo_timeout() -> u32 {
    10
}

fn default_open_meteo_max_retries() -> u32 {
    2
}

fn default_max_concurrency() -> usize {
    4
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_server_host(),
            port: default_server_port(),
            request_timeout_seconds: default_request_timeout(),
        }
    }
}

impl Default for OpenMeteoConfig {
    fn default() -> Self {
        Self {
            base_url: default_open_meteo_base_url(),
            api_key: None,
            timeout_seconds: default_open_meteo_timeout(),
            max_retries: default_open_meteo_max_retries(),
        }
    }
}

impl Default for EnrichmentConfig {
    fn default() -> Self {
        Self {
            max_concurrency: default_max_concurrency(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl KazeConfig {
    /// Load configuration from file and environment variables
    pub fn load() -> Result<Self> {
        Self::load_from_path(env::var("KAZE_CONFIG").ok().map(PathBuf::from))
    }

    /// Load configuration from the specified path, falling back to `config.toml`
    pub fn load_from_path(config_path: Option<PathBuf>) -> Result<Self> {
        let mut builder = Config::builder();

        let config_file = config_path.unwrap_or_else(|| PathBuf::from("config.toml"));
        if config_file.exists() {
            builder = builder.add_source(
                File::from(config_file.clone())
                    .required(false)
                    .format(config::FileFormat::Toml),
            );
        }

        // KAZE_SERVER__PORT=9000 style overrides
        builder = builder.add_source(
            Environment::with_prefix("KAZE")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        // Variables understood by earlier deployments
        builder = builder
            .set_override_option("store.database_url", env::var("APP_DB").ok())?
            .set_override_option("open_meteo.api_key", env::var("OPEN_METEO_API_KEY").ok())?
            .set_override_option(
                "logging.level",
                env::var("DEBUG")
                    .ok()
                    .filter(|value| !value.is_empty())
                    .map(|_| "debug"),
            )?;

        let settings = builder
            .build()
            .with_context(|| "Failed to build configuration")?;

        let mut config: KazeConfig = settings
            .try_deserialize()
            .with_context(|| "Failed to deserialize configuration")?;

        config.apply_defaults();
        config.validate()?;

        Ok(config)
    }

    /// Apply default values to empty configuration fields
    pub fn apply_defaults(&mut self) {
        if self.server.host.is_empty() {
            self.server.host = default_server_host();
        }
        if self.open_meteo.base_url.is_empty() {
            self.open_meteo.base_url = default_open_meteo_base_url();
        }
        if self.open_meteo.timeout_seconds == 0 {
            self.open_meteo.timeout_seconds = default_open_meteo_timeout();
        }
        if self.logging.level.is_empty() {
            self.logging.level = default_log_level();
        }
        if self.logging.format.is_empty() {
            self.logging.format = default_log_format();
        }
        if self.store.backend == StoreBackend::Memory && self.store.database_url.is_some() {
            // A connection string alone selects the database backend
            self.store.backend = StoreBackend::Postgres;
        }
    }

    /// Validate all configuration settings
    pub fn validate(&self) -> Result<()> {
        self.validate_numeric_ranges()?;
        self.validate_string_values()?;
        self.validate_store()?;
        Ok(())
    }

    fn validate_numeric_ranges(&self) -> Result<()> {
        if self.server.request_timeout_seconds == 0 || self.server.request_timeout_seconds > 300 {
            return Err(
                KazeError::config("Request timeout must be between 1 and 300 seconds").into(),
            );
        }

        if self.open_meteo.timeout_seconds > 120 {
            return Err(KazeError::config("Open-Meteo timeout cannot exceed 120 seconds").into());
        }

        if self.open_meteo.max_retries > 10 {
            return Err(KazeError::config("Open-Meteo max retries cannot exceed 10").into());
        }

        if self.enrichment.max_concurrency == 0 || self.enrichment.max_concurrency > 64 {
            return Err(
                KazeError::config("Enrichment max concurrency must be between 1 and 64").into(),
            );
        }

        Ok(())
    }

    fn validate_string_values(&self) -> Result<()> {
        let valid_log_levels = ["error", "warn", "info", "debug", "trace"];
        if !valid_log_levels.contains(&self.logging.level.as_str()) {
            return Err(KazeError::config(format!(
                "Invalid log level '{}'. Must be one of: {}",
                self.logging.level,
                valid_log_levels.join(", ")
            ))
            .into());
        }

        let valid_log_formats = ["pretty", "json"];
        if !valid_log_formats.contains(&self.logging.format.as_str()) {
            return Err(KazeError::config(format!(
                "Invalid log format '{}'. Must be one of: {}",
                self.logging.format,
                valid_log_formats.join(", ")
            ))
            .into());
        }

        if !self.open_meteo.base_url.starts_with("http://")
            && !self.open_meteo.base_url.starts_with("https://")
        {
            return Err(
                KazeError::config("Open-Meteo base URL must be a valid HTTP or HTTPS URL").into(),
            );
        }

        if let Some(api_key) = &self.open_meteo.api_key {
            if api_key.trim().is_empty() {
                return Err(KazeError::config(
                    "Open-Meteo API key cannot be empty if provided. Either remove it or provide a valid key.",
                )
                .into());
            }
        }

        Ok(())
    }

    fn validate_store(&self) -> Result<()> {
        if self.store.backend == StoreBackend::Postgres
            && self
                .store
                .database_url
                .as_deref()
                .is_none_or(|url| url.trim().is_empty())
        {
            return Err(KazeError::config(
                "Please provide a database connection string via KAZE_STORE__DATABASE_URL or APP_DB",
            )
            .into());
        }
        Ok(())
    }
}
