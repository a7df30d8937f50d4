//! # Configuration
//!
//! Service configuration loaded once at startup.
//!
//! ## Configuration Sources (Priority Order)
//! 1. Environment variables (`AURUM_*`)
//! 2. Config file (`AURUM_CONFIG`, else `<config dir>/aurum/config.toml`)
//! 3. Defaults (this file)
//!
//! Every section is optional in the file; missing keys keep their default.
//!
//! ## Example `config.toml`
//! ```toml
//! [server]
//! port = 8080
//!
//! [pricing]
//! cod_handling_fee = 4000          # minor units
//! base_delivery_charge = 7000
//! free_delivery_threshold = 50000
//!
//! [checkout]
//! cod_initial_status = "paid"      # or "pending_payment"
//!
//! [gateway]
//! redirect_base_url = "https://pay.example.com/checkout"
//! timeout_ms = 5000
//! ```
//!
//! ## Thread Safety
//! Configuration is read-only after startup and shared behind an `Arc`.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use aurum_core::{
    AdjustmentRule, CodInitialStatus, FlatTax, MinorUnitScale, Money, NoAdjustments, PricingConfig,
    TaxRate, MAX_CART_ITEMS,
};

/// Service configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub pricing: PricingSection,
    pub checkout: CheckoutConfig,
    pub gateway: GatewayConfig,
    pub notifications: NotificationConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_addr: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            bind_addr: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// SQLite file. `None` uses the platform data directory.
    pub path: Option<PathBuf>,
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        DatabaseConfig {
            path: None,
            max_connections: 5,
        }
    }
}

/// Pricing constants, all money in minor units.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PricingSection {
    pub cod_handling_fee: i64,
    pub base_delivery_charge: i64,
    pub free_delivery_threshold: i64,
    /// Minor units per major unit (100 for paise).
    pub minor_unit_multiplier: i64,
    /// Display only.
    pub currency_symbol: String,
    /// Flat tax on the subtotal in basis points; 0 disables tax.
    pub tax_rate_bps: u32,
}

impl Default for PricingSection {
    fn default() -> Self {
        let defaults = PricingConfig::default();
        PricingSection {
            cod_handling_fee: defaults.cod_handling_fee.minor(),
            base_delivery_charge: defaults.base_delivery_charge.minor(),
            free_delivery_threshold: defaults.free_delivery_threshold.minor(),
            minor_unit_multiplier: 100,
            currency_symbol: "₹".to_string(),
            tax_rate_bps: 0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CheckoutConfig {
    pub cod_initial_status: CodInitialStatus,
    pub max_cart_items: usize,
}

impl Default for CheckoutConfig {
    fn default() -> Self {
        CheckoutConfig {
            cod_initial_status: CodInitialStatus::Paid,
            max_cart_items: MAX_CART_ITEMS,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Hosted payment page; the attempt reference is appended as a path segment.
    pub redirect_base_url: String,
    pub timeout_ms: u64,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        GatewayConfig {
            redirect_base_url: "https://sandbox.pay.local/checkout".to_string(),
            timeout_ms: 5_000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationConfig {
    pub timeout_ms: u64,
    pub relay_interval_secs: u64,
    pub batch_size: u32,
    pub max_attempts: u32,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        NotificationConfig {
            timeout_ms: 3_000,
            relay_interval_secs: 10,
            batch_size: 50,
            max_attempts: 5,
        }
    }
}

impl AppConfig {
    /// Loads defaults, then the config file, then `AURUM_*` overrides.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = match config_file_path() {
            Some(path) if path.exists() => AppConfig::from_file(&path)?,
            _ => AppConfig::default(),
        };

        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Parses a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        AppConfig::from_toml_str(&text)
    }

    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Applies environment overrides through `lookup`.
    ///
    /// ## Environment Variables
    /// - `AURUM_BIND_ADDR`, `AURUM_PORT`
    /// - `AURUM_DB_PATH`
    /// - `AURUM_COD_FEE`, `AURUM_DELIVERY_CHARGE`, `AURUM_FREE_DELIVERY_THRESHOLD`
    /// - `AURUM_TAX_RATE_BPS`
    /// - `AURUM_COD_INITIAL_STATUS` (`paid` | `pending_payment`)
    /// - `AURUM_GATEWAY_URL`, `AURUM_GATEWAY_TIMEOUT_MS`
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(addr) = lookup("AURUM_BIND_ADDR") {
            self.server.bind_addr = addr;
        }
        if let Some(port) = lookup("AURUM_PORT") {
            self.server.port = parse_env("AURUM_PORT", &port)?;
        }
        if let Some(path) = lookup("AURUM_DB_PATH") {
            self.database.path = Some(PathBuf::from(path));
        }
        if let Some(fee) = lookup("AURUM_COD_FEE") {
            self.pricing.cod_handling_fee = parse_env("AURUM_COD_FEE", &fee)?;
        }
        if let Some(charge) = lookup("AURUM_DELIVERY_CHARGE") {
            self.pricing.base_delivery_charge = parse_env("AURUM_DELIVERY_CHARGE", &charge)?;
        }
        if let Some(threshold) = lookup("AURUM_FREE_DELIVERY_THRESHOLD") {
            self.pricing.free_delivery_threshold =
                parse_env("AURUM_FREE_DELIVERY_THRESHOLD", &threshold)?;
        }
        if let Some(status) = lookup("AURUM_COD_INITIAL_STATUS") {
            self.checkout.cod_initial_status = match status.as_str() {
                "paid" => CodInitialStatus::Paid,
                "pending_payment" => CodInitialStatus::PendingPayment,
                _ => return Err(ConfigError::InvalidValue("AURUM_COD_INITIAL_STATUS".to_string())),
            };
        }
        if let Some(bps) = lookup("AURUM_TAX_RATE_BPS") {
            self.pricing.tax_rate_bps = parse_env("AURUM_TAX_RATE_BPS", &bps)?;
        }
        if let Some(url) = lookup("AURUM_GATEWAY_URL") {
            self.gateway.redirect_base_url = url;
        }
        if let Some(timeout) = lookup("AURUM_GATEWAY_TIMEOUT_MS") {
            self.gateway.timeout_ms = parse_env("AURUM_GATEWAY_TIMEOUT_MS", &timeout)?;
        }
        Ok(())
    }

    /// Rejects configurations that would break money or timeout invariants.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |field: &str, reason: &str| ConfigError::Invalid {
            field: field.to_string(),
            reason: reason.to_string(),
        };

        MinorUnitScale::new(self.pricing.minor_unit_multiplier)
            .map_err(|_| invalid("pricing.minor_unit_multiplier", "must be positive"))?;

        for (field, value) in [
            ("pricing.cod_handling_fee", self.pricing.cod_handling_fee),
            ("pricing.base_delivery_charge", self.pricing.base_delivery_charge),
            ("pricing.free_delivery_threshold", self.pricing.free_delivery_threshold),
        ] {
            if value < 0 {
                return Err(invalid(field, "must not be negative"));
            }
        }

        if self.pricing.tax_rate_bps > 10_000 {
            return Err(invalid("pricing.tax_rate_bps", "must be at most 10000"));
        }

        if self.checkout.max_cart_items == 0 {
            return Err(invalid("checkout.max_cart_items", "must be positive"));
        }
        if self.gateway.timeout_ms == 0 {
            return Err(invalid("gateway.timeout_ms", "must be positive"));
        }
        if self.notifications.timeout_ms == 0 {
            return Err(invalid("notifications.timeout_ms", "must be positive"));
        }
        if self.notifications.batch_size == 0 || self.notifications.max_attempts == 0 {
            return Err(invalid("notifications", "batch_size and max_attempts must be positive"));
        }
        let url = &self.gateway.redirect_base_url;
        if !(url.starts_with("https://") || url.starts_with("http://")) {
            return Err(invalid("gateway.redirect_base_url", "must be an http(s) URL"));
        }

        Ok(())
    }

    /// Pricing constants for the engine.
    pub fn pricing_config(&self) -> PricingConfig {
        PricingConfig {
            cod_handling_fee: Money::from_minor(self.pricing.cod_handling_fee),
            base_delivery_charge: Money::from_minor(self.pricing.base_delivery_charge),
            free_delivery_threshold: Money::from_minor(self.pricing.free_delivery_threshold),
        }
    }

    /// Tax/discount rule applied to every quote and order.
    pub fn adjustment_rule(&self) -> Arc<dyn AdjustmentRule> {
        match self.pricing.tax_rate_bps {
            0 => Arc::new(NoAdjustments),
            bps => Arc::new(FlatTax(TaxRate::from_bps(bps))),
        }
    }

    /// Minor-unit scale; falls back to the default if unvalidated.
    pub fn scale(&self) -> MinorUnitScale {
        MinorUnitScale::new(self.pricing.minor_unit_multiplier).unwrap_or(MinorUnitScale::DEFAULT)
    }

    pub fn gateway_timeout(&self) -> Duration {
        Duration::from_millis(self.gateway.timeout_ms)
    }

    /// Resolved database path.
    ///
    /// ## Platform-Specific Paths
    /// - **macOS**: `~/Library/Application Support/com.aurum.storefront/aurum.db`
    /// - **Windows**: `%APPDATA%\aurum\storefront\data\aurum.db`
    /// - **Linux**: `~/.local/share/storefront/aurum.db`
    pub fn database_path(&self) -> Result<PathBuf, ConfigError> {
        if let Some(path) = &self.database.path {
            return Ok(path.clone());
        }

        let dirs = ProjectDirs::from("com", "aurum", "storefront").ok_or(ConfigError::NoDataDir)?;
        let data_dir = dirs.data_dir();
        std::fs::create_dir_all(data_dir).map_err(|e| ConfigError::Io {
            path: data_dir.to_path_buf(),
            source: e,
        })?;

        Ok(data_dir.join("aurum.db"))
    }
}

fn config_file_path() -> Option<PathBuf> {
    if let Ok(path) = std::env::var("AURUM_CONFIG") {
        return Some(PathBuf::from(path));
    }
    ProjectDirs::from("com", "aurum", "storefront").map(|dirs| dirs.config_dir().join("config.toml"))
}

fn parse_env<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidValue(key.to_string()))
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid value for {0}")]
    InvalidValue(String),

    #[error("Invalid {field}: {reason}")]
    Invalid { field: String, reason: String },

    #[error("Could not determine app data directory")]
    NoDataDir,
}
