//! Desk configuration.
//!
//! Loaded once from a TOML file; every section is optional and falls back to
//! the built-in defaults. API keys may also come from the environment.

use crate::application::workflow::DeskSettings;
use crate::domain::asset::{Asset, AssetCatalog};
use crate::error::{DeskError, Result};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const BINANCE_API_KEY_ENV: &str = "BINANCE_API_KEY";
pub const COINGECKO_API_KEY_ENV: &str = "COINGECKO_API_KEY";

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub fee_rate: Decimal,
    /// Stable currency quotes are expressed in.
    pub quote_currency: String,
    /// Where receipts are forwarded for review.
    pub reviewer_channel: String,
    /// Platform address users pay the quote currency to on Buy.
    pub payment_address: String,
    pub log_level: String,
    pub assets: Vec<AssetConfig>,
    pub pricing: PricingConfig,
    pub orders: OrdersConfig,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AssetConfig {
    pub symbol: Asset,
    /// Used until a price source reports, and whenever all of them fail.
    pub fallback_price: Decimal,
    /// Platform address users send this asset to on Sell.
    pub deposit_address: String,
    pub binance_symbol: Option<String>,
    pub coingecko_id: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Binance,
    CoinGecko,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SourceConfig {
    pub kind: SourceKind,
    pub base_url: String,
    pub api_key: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PricingConfig {
    pub refresh_interval: Duration,
    pub source_timeout: Duration,
    pub sources: Vec<SourceConfig>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct OrdersConfig {
    pub csv_path: Option<PathBuf>,
    pub rocksdb_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self::from(TomlConfig::default())
    }
}

impl Config {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            DeskError::ConfigError(format!(
                "Failed to read config file {:?}: {}",
                path.as_ref(),
                e
            ))
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let file: TomlConfig = toml::from_str(content)?;
        Ok(Self::from(file))
    }

    /// Fills in source API keys from the environment when the file has none.
    pub fn apply_env_overrides(&mut self) {
        for source in &mut self.pricing.sources {
            if source.api_key.is_some() {
                continue;
            }
            let var = match source.kind {
                SourceKind::Binance => BINANCE_API_KEY_ENV,
                SourceKind::CoinGecko => COINGECKO_API_KEY_ENV,
            };
            if let Ok(key) = std::env::var(var) {
                source.api_key = Some(key);
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.fee_rate < Decimal::ZERO || self.fee_rate >= Decimal::ONE {
            return Err(DeskError::ConfigError(format!(
                "fee_rate must be in [0, 1), got {}",
                self.fee_rate
            )));
        }
        if self.assets.is_empty() {
            return Err(DeskError::ConfigError(
                "at least one asset must be configured".to_string(),
            ));
        }
        let mut seen = HashSet::new();
        for asset in &self.assets {
            if asset.symbol.symbol().is_empty() {
                return Err(DeskError::ConfigError("asset symbol is empty".to_string()));
            }
            if !seen.insert(&asset.symbol) {
                return Err(DeskError::ConfigError(format!(
                    "asset {} is configured twice",
                    asset.symbol
                )));
            }
            if asset.fallback_price <= Decimal::ZERO {
                return Err(DeskError::ConfigError(format!(
                    "fallback_price for {} must be positive",
                    asset.symbol
                )));
            }
        }
        if self.pricing.source_timeout.is_zero() || self.pricing.refresh_interval.is_zero() {
            return Err(DeskError::ConfigError(
                "pricing intervals must be at least one second".to_string(),
            ));
        }
        Ok(())
    }

    pub fn catalog(&self) -> AssetCatalog {
        AssetCatalog::new(self.assets.iter().map(|a| a.symbol.clone()).collect())
    }

    pub fn fallback_prices(&self) -> BTreeMap<Asset, Decimal> {
        self.assets
            .iter()
            .map(|a| (a.symbol.clone(), a.fallback_price))
            .collect()
    }

    pub fn desk_settings(&self) -> DeskSettings {
        DeskSettings {
            catalog: self.catalog(),
            fee_rate: self.fee_rate,
            quote_currency: self.quote_currency.clone(),
            payment_address: self.payment_address.clone(),
            deposit_addresses: self
                .assets
                .iter()
                .map(|a| (a.symbol.clone(), a.deposit_address.clone()))
                .collect::<HashMap<_, _>>(),
        }
    }
}

// TOML file structures

#[derive(Debug, Deserialize)]
#[serde(default)]
struct TomlConfig {
    fee_rate: Decimal,
    quote_currency: String,
    reviewer_channel: String,
    payment_address: String,
    log_level: String,
    assets: Vec<AssetToml>,
    pricing: PricingToml,
    orders: OrdersToml,
}

impl Default for TomlConfig {
    fn default() -> Self {
        Self {
            fee_rate: dec!(0.03),
            quote_currency: "USDT".to_string(),
            reviewer_channel: "@operators".to_string(),
            payment_address: "0xYourUSDTAddressHere".to_string(),
            log_level: "info".to_string(),
            assets: vec![
                AssetToml {
                    symbol: "BTC".to_string(),
                    fallback_price: dec!(55832.25),
                    deposit_address: "YourBTCAddressHere".to_string(),
                    binance_symbol: Some("BTCUSDT".to_string()),
                    coingecko_id: Some("bitcoin".to_string()),
                },
                AssetToml {
                    symbol: "ETH".to_string(),
                    fallback_price: dec!(3433.91),
                    deposit_address: "0xYourETHAddressHere".to_string(),
                    binance_symbol: Some("ETHUSDT".to_string()),
                    coingecko_id: Some("ethereum".to_string()),
                },
            ],
            pricing: PricingToml::default(),
            orders: OrdersToml::default(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct AssetToml {
    symbol: String,
    fallback_price: Decimal,
    #[serde(default)]
    deposit_address: String,
    #[serde(default)]
    binance_symbol: Option<String>,
    #[serde(default)]
    coingecko_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct PricingToml {
    refresh_interval_secs: u64,
    source_timeout_secs: u64,
    sources: Vec<SourceToml>,
}

impl Default for PricingToml {
    fn default() -> Self {
        Self {
            refresh_interval_secs: 30,
            source_timeout_secs: 6,
            sources: vec![
                SourceToml {
                    kind: SourceKind::Binance,
                    base_url: "https://api.binance.com".to_string(),
                    api_key: None,
                },
                SourceToml {
                    kind: SourceKind::CoinGecko,
                    base_url: "https://api.coingecko.com".to_string(),
                    api_key: None,
                },
            ],
        }
    }
}

#[derive(Debug, Deserialize)]
struct SourceToml {
    kind: SourceKind,
    base_url: String,
    #[serde(default)]
    api_key: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct OrdersToml {
    csv_path: Option<PathBuf>,
    rocksdb_path: Option<PathBuf>,
}

impl From<TomlConfig> for Config {
    fn from(toml: TomlConfig) -> Self {
        Self {
            fee_rate: toml.fee_rate,
            quote_currency: toml.quote_currency,
            reviewer_channel: toml.reviewer_channel,
            payment_address: toml.payment_address,
            log_level: toml.log_level,
            assets: toml
                .assets
                .into_iter()
                .map(|a| AssetConfig {
                    symbol: Asset::new(a.symbol.trim()),
                    fallback_price: a.fallback_price,
                    deposit_address: a.deposit_address,
                    binance_symbol: a.binance_symbol,
                    coingecko_id: a.coingecko_id,
                })
                .collect(),
            pricing: PricingConfig {
                refresh_interval: Duration::from_secs(toml.pricing.refresh_interval_secs),
                source_timeout: Duration::from_secs(toml.pricing.source_timeout_secs),
                sources: toml
                    .pricing
                    .sources
                    .into_iter()
                    .map(|s| SourceConfig {
                        kind: s.kind,
                        base_url: s.base_url,
                        api_key: s.api_key,
                    })
                    .collect(),
            },
            orders: OrdersConfig {
                csv_path: toml.orders.csv_path,
                rocksdb_path: toml.orders.rocksdb_path,
            },
        }
    }
}
