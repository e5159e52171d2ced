//! Configuration management for the allocation server
//!
//! Supports hierarchical configuration loading:
//! 1. Default values in code
//! 2. Configuration files (config/development.toml, config/production.toml)
//! 3. Environment variable overrides with ALLOC_ prefix

use config::{ConfigError, Environment, File};
use serde::Deserialize;
use shared::AllocationPolicy;

/// Main application configuration
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Current environment (development, production)
    pub environment: String,

    /// Log output format
    #[serde(default)]
    pub log_format: LogFormat,

    /// Server configuration
    pub server: ServerConfig,

    /// Upstream inventory API (GetRequest / IssueStock)
    pub inventory_api: InventoryApiConfig,

    /// Auto-fill and validation policy
    #[serde(default)]
    pub allocation: AllocationPolicy,
}

#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    /// Server port
    pub port: u16,

    /// Server host
    pub host: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct InventoryApiConfig {
    /// Base URL, e.g. https://inventory.internal/api
    pub base_url: String,

    /// Bearer token sent on every call
    pub api_token: Option<String>,

    /// Per-call timeout in seconds
    pub timeout_secs: u64,
}

impl Config {
    /// Load configuration from files and environment variables
    pub fn load() -> Result<Self, ConfigError> {
        let environment =
            std::env::var("ALLOC_ENVIRONMENT").unwrap_or_else(|_| "development".into());

        let config = config::Config::builder()
            // Start with default values
            .set_default("environment", environment.clone())?
            .set_default("log_format", "pretty")?
            .set_default("server.port", 3000)?
            .set_default("server.host", "0.0.0.0")?
            .set_default("inventory_api.base_url", "http://localhost:8080/api")?
            .set_default("inventory_api.timeout_secs", 15)?
            .set_default("allocation.sort", "canonical_quantity_descending")?
            .set_default("allocation.unknown_unit", "treat_as_primary")?
            .set_default("allocation.shortfall", "block")?
            // Load environment-specific config file
            .add_source(File::with_name(&format!("config/{}", environment)).required(false))
            // Override with environment variables (ALLOC_ prefix)
            .add_source(
                Environment::with_prefix("ALLOC")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}
