//! Configuration management for TradeFlow
//!
//! Loads from optional config files + environment variables via .env

use anyhow::{bail, Context, Result};
use config::{Config, Environment, File};
use serde::Deserialize;
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub api: ApiConfig,
    pub prices: PricesConfig,
    pub balance: BalanceConfig,
    pub server: ServerConfig,
    pub session: SessionConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    /// Backend REST base URL
    pub base_url: String,
    /// Per-request timeout in milliseconds
    pub timeout_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PricesConfig {
    /// Local price proxy (serves /api/prices)
    pub proxy_url: String,
    /// CoinGecko API root
    pub coingecko_url: String,
    /// CoinMarketCap data API root (used by the proxy)
    pub coinmarketcap_url: String,
    /// Ticker refresh interval in seconds
    pub refresh_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BalanceConfig {
    /// Balance poll interval in milliseconds
    pub refresh_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Listen address for the local service
    pub bind: String,
    /// JSON file backing the prediction options resource
    pub options_file: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    /// Where the CLI persists the session between runs
    pub file: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Emit JSON log lines
    pub json: bool,
    /// Default filter when RUST_LOG is unset
    pub filter: String,
}

impl AppConfig {
    /// Load configuration from file and environment
    pub fn load() -> Result<Self> {
        // Load .env file first
        dotenvy::dotenv().ok();

        let config = Self::builder()?
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            // Override with environment variables (TRADEFLOW__*)
            .add_source(Environment::with_prefix("TRADEFLOW").separator("__"))
            .build()
            .context("Failed to build configuration")?;

        let app_config: AppConfig = config
            .try_deserialize()
            .context("Failed to deserialize configuration")?;
        app_config.validate()?;

        Ok(app_config)
    }

    /// Built-in defaults only, no files or environment
    pub fn defaults() -> Result<Self> {
        let config = Self::builder()?
            .build()
            .context("Failed to build default configuration")?;
        config
            .try_deserialize()
            .context("Failed to deserialize default configuration")
    }

    fn builder() -> Result<config::builder::ConfigBuilder<config::builder::DefaultState>> {
        let builder = Config::builder()
            // Backend
            .set_default("api.base_url", "http://localhost:3001")?
            .set_default("api.timeout_ms", 30_000)?
            // Prices
            .set_default("prices.proxy_url", "http://localhost:8080")?
            .set_default("prices.coingecko_url", "https://api.coingecko.com/api/v3")?
            .set_default(
                "prices.coinmarketcap_url",
                "https://api.coinmarketcap.com/data-api/v3",
            )?
            .set_default("prices.refresh_secs", 30)?
            // Balance
            .set_default("balance.refresh_ms", 5000)?
            // Local service
            .set_default("server.bind", "127.0.0.1:8080")?
            .set_default("server.options_file", "./data/prediction-options.json")?
            // Session
            .set_default("session.file", "./data/session.json")?
            // Logging
            .set_default("logging.json", false)?
            .set_default("logging.filter", "info")?;
        Ok(builder)
    }

    /// Reject values that would make the pollers or clients misbehave
    pub fn validate(&self) -> Result<()> {
        if !self.api.base_url.starts_with("http") {
            bail!("api.base_url must be an http(s) URL, got {}", self.api.base_url);
        }
        if self.balance.refresh_ms == 0 {
            bail!("balance.refresh_ms must be greater than zero");
        }
        if self.prices.refresh_secs == 0 {
            bail!("prices.refresh_secs must be greater than zero");
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.api.timeout_ms)
    }

    /// Generate a digest of the config for logging
    pub fn digest(&self) -> String {
        format!(
            "api={} proxy={} balance_ms={} prices_secs={} bind={}",
            self.api.base_url,
            self.prices.proxy_url,
            self.balance.refresh_ms,
            self.prices.refresh_secs,
            self.server.bind
        )
    }
}

impl std::fmt::Display for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.digest())
    }
}
