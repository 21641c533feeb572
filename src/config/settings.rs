//! Application configuration loading from config.toml
//!
//! The file is optional: every section has defaults, and a handful of values can
//! be overridden from the environment (usually populated from `.env`). The
//! `[[services]]` entries are used to seed the catalog on startup.

use crate::{
    core::{
        invoice::DEFAULT_INVOICE_PREFIX,
        service::{ServiceInput, TierPrice},
        status::CustomerType,
    },
    errors::{Error, Result},
};
use serde::Deserialize;
use std::{collections::BTreeMap, path::Path};

/// Config file read when `FACILITY_BOOKING_CONFIG` is not set.
pub const DEFAULT_CONFIG_PATH: &str = "config.toml";
/// Listen address used when neither the file nor `BIND_ADDRESS` sets one.
pub const DEFAULT_BIND_ADDRESS: &str = "127.0.0.1:8080";

/// Configuration structure representing the entire config.toml file
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// HTTP listener settings
    pub server: ServerConfig,
    /// Database settings
    pub database: DatabaseConfig,
    /// Invoice numbering settings
    pub invoice: InvoiceConfig,
    /// Services to seed into the catalog
    pub services: Vec<ServiceSeed>,
}

/// `[server]` section
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Socket address to listen on
    pub bind_address: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: DEFAULT_BIND_ADDRESS.to_string(),
        }
    }
}

/// `[database]` section
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Connection URL
    pub url: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: super::database::DEFAULT_DATABASE_URL.to_string(),
        }
    }
}

/// `[invoice]` section
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct InvoiceConfig {
    /// Leading part of every invoice number
    pub prefix: String,
}

impl Default for InvoiceConfig {
    fn default() -> Self {
        Self {
            prefix: DEFAULT_INVOICE_PREFIX.to_string(),
        }
    }
}

/// Configuration for a single seeded service
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ServiceSeed {
    /// Display name, also the seeding key
    pub name: String,
    /// Owning organizational unit
    pub unit: String,
    /// Optional description
    #[serde(default)]
    pub description: Option<String>,
    /// Flat price per day
    #[serde(default)]
    pub base_price: i64,
    /// Whether `prices` replaces `base_price`
    #[serde(default)]
    pub is_price_per_type: bool,
    /// Price per customer type
    #[serde(default)]
    pub prices: BTreeMap<CustomerType, i64>,
}

impl ServiceSeed {
    /// Converts the seed into the input accepted by `core::service`.
    #[must_use]
    pub fn to_input(&self) -> ServiceInput {
        ServiceInput {
            name: self.name.clone(),
            unit: self.unit.clone(),
            description: self.description.clone(),
            base_price: self.base_price,
            is_price_per_type: self.is_price_per_type,
            is_active: true,
            prices: self
                .prices
                .iter()
                .map(|(&customer_type, &price)| TierPrice {
                    customer_type,
                    price,
                })
                .collect(),
        }
    }
}

impl AppConfig {
    /// Parses configuration from TOML text.
    pub fn from_toml(contents: &str) -> Result<Self> {
        toml::from_str(contents).map_err(|e| Error::Config {
            message: format!("Failed to parse config.toml: {e}"),
        })
    }

    /// Replaces file values with `DATABASE_URL` and `BIND_ADDRESS` when they are set.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(url) = std::env::var("DATABASE_URL") {
            self.database.url = url;
        }
        if let Ok(addr) = std::env::var("BIND_ADDRESS") {
            self.server.bind_address = addr;
        }
    }
}

/// Loads configuration from a TOML file
///
/// # Errors
/// Returns an error if the file exists but cannot be read, the TOML syntax is
/// invalid, or a value has the wrong type. A missing file yields the defaults.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<AppConfig> {
    let path = path.as_ref();
    let contents = match std::fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::info!(path = %path.display(), "No config file found, using defaults");
            return Ok(AppConfig::default());
        }
        Err(e) => {
            return Err(Error::Config {
                message: format!("Failed to read config file {}: {e}", path.display()),
            });
        }
    };

    AppConfig::from_toml(&contents)
}

/// Loads configuration from `FACILITY_BOOKING_CONFIG` (or ./config.toml) and
/// applies environment overrides.
pub fn load_default_config() -> Result<AppConfig> {
    let path = std::env::var("FACILITY_BOOKING_CONFIG")
        .unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
    let mut config = load_config(path)?;
    config.apply_env_overrides();
    Ok(config)
}
