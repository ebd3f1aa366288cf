//! Configuration management for the Wholesale Distribution backend
//!
//! Supports hierarchical configuration loading:
//! 1. Default values in code
//! 2. Configuration files (development.toml, production.toml)
//! 3. Environment variable overrides with WDS_ prefix

use config::{ConfigError, Environment, File};
use rust_decimal::Decimal;
use serde::Deserialize;

/// Main application configuration
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Current environment (development, production)
    pub environment: String,

    /// Server configuration
    pub server: ServerConfig,

    /// Database configuration
    pub database: DatabaseConfig,

    /// Document numbering configuration
    pub numbering: NumberingConfig,

    /// Sales collection defaults
    pub sales: SalesConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    /// Server port
    pub port: u16,

    /// Server host
    pub host: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL
    pub url: String,

    /// Maximum number of connections in the pool
    pub max_connections: u32,

    /// Minimum number of connections in the pool
    pub min_connections: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct NumberingConfig {
    /// Collision checks before falling back to a timestamp-derived number
    pub max_attempts: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SalesConfig {
    /// Deduction applied to damaged goods on new sales collections
    #[serde(with = "rust_decimal::serde::str")]
    pub default_deduction_percentage: Decimal,
}

impl Config {
    /// Load configuration from files and environment variables
    pub fn load() -> Result<Self, ConfigError> {
        let environment = std::env::var("WDS_ENVIRONMENT").unwrap_or_else(|_| "development".into());

        let config = config::Config::builder()
            // Start with default values
            .set_default("environment", environment.clone())?
            .set_default("server.port", 3000)?
            .set_default("server.host", "0.0.0.0")?
            .set_default("database.max_connections", 10)?
            .set_default("database.min_connections", 2)?
            .set_default(
                "numbering.max_attempts",
                i64::from(shared::numbering::DEFAULT_MAX_ATTEMPTS),
            )?
            .set_default("sales.default_deduction_percentage", "10.00")?
            // Load environment-specific config file
            .add_source(File::with_name(&format!("config/{}", environment)).required(false))
            // Override with environment variables (WDS_ prefix)
            .add_source(
                Environment::with_prefix("WDS")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: Self = config.try_deserialize()?;
        config.sales.check()?;
        Ok(config)
    }

    /// Socket address the server binds to
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

impl SalesConfig {
    /// The deduction must be a percentage
    fn check(&self) -> Result<(), ConfigError> {
        let pct = self.default_deduction_percentage;
        if pct < Decimal::ZERO || pct > Decimal::ONE_HUNDRED {
            return Err(ConfigError::Message(format!(
                "sales.default_deduction_percentage must be within 0..=100, got {pct}"
            )));
        }
        Ok(())
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 3000,
            host: "0.0.0.0".to_string(),
        }
    }
}
