//! Configuration management for the warehouse booking service
//!
//! Supports hierarchical configuration loading:
//! 1. Default values in code
//! 2. Configuration files (development.toml, production.toml)
//! 3. Environment variable overrides with AGRI__ prefix
//!
//! Every variable uses the double-underscore form, the environment selector
//! included: `AGRI__ENVIRONMENT=production` picks `config/production.toml`,
//! `AGRI__DATABASE__URL` sets `database.url`.

use config::{ConfigError, Environment, File};
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

    /// JWT authentication configuration
    pub jwt: JwtConfig,

    /// SMS gateway configuration
    pub notification: NotificationConfig,

    /// QR artifact configuration
    pub qr: QrConfig,

    /// Booking policy limits
    pub booking: BookingConfig,
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
pub struct JwtConfig {
    /// Secret key used to verify portal tokens
    pub secret: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct NotificationConfig {
    /// SMS gateway endpoint; SMS is disabled when unset
    pub sms_gateway_url: Option<String>,

    /// SMS gateway API key
    pub sms_api_key: Option<String>,

    /// Sender ID shown on the farmer's phone
    pub sender_id: String,

    /// Request timeout for the gateway
    pub timeout_seconds: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct QrConfig {
    /// URL prefix that renders a QR image for the appended token
    pub generator_url: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct BookingConfig {
    /// Longest date range accepted by calendar and statistics queries
    pub max_range_days: i64,
}

impl Config {
    /// Load configuration from files and environment variables
    pub fn load() -> Result<Self, ConfigError> {
        let environment =
            std::env::var("AGRI__ENVIRONMENT").unwrap_or_else(|_| "development".into());

        let config = config::Config::builder()
            // Start with default values
            .set_default("environment", environment.clone())?
            .set_default("server.port", 3000)?
            .set_default("server.host", "0.0.0.0")?
            .set_default("database.max_connections", 10)?
            .set_default("database.min_connections", 2)?
            .set_default("notification.sender_id", "AGRISV")?
            .set_default("notification.timeout_seconds", 10)?
            .set_default("qr.generator_url", QrConfig::default().generator_url)?
            .set_default("booking.max_range_days", BookingConfig::default().max_range_days)?
            // Load environment-specific config file
            .add_source(File::with_name(&format!("config/{}", environment)).required(false))
            // Override with AGRI__<SECTION>__<KEY> environment variables
            .add_source(
                Environment::with_prefix("AGRI")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
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

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            sms_gateway_url: None,
            sms_api_key: None,
            sender_id: "AGRISV".to_string(),
            timeout_seconds: 10,
        }
    }
}

impl Default for QrConfig {
    fn default() -> Self {
        Self {
            generator_url: "https://api.qrserver.com/v1/create-qr-code/?size=300x300&data="
                .to_string(),
        }
    }
}

impl Default for BookingConfig {
    fn default() -> Self {
        Self { max_range_days: 366 }
    }
}
