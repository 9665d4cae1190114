//! HTTP market-data sources.

use crate::config::{Config, SourceConfig, SourceKind};
use crate::domain::asset::Asset;
use crate::domain::ports::{PriceSource, PriceSourceBox};
use crate::error::{DeskError, Result};
use async_trait::async_trait;
use reqwest::Client;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::collections::HashMap;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, warn};

const BINANCE_KEY_HEADER: &str = "X-MBX-APIKEY";
const COINGECKO_KEY_HEADER: &str = "x-cg-pro-api-key";
const COINGECKO_VS_CURRENCY: &str = "usd";

fn http_client(timeout: Duration) -> Result<Client> {
    Ok(Client::builder().timeout(timeout).build()?)
}

/// Binance spot ticker, one request per asset.
pub struct BinanceSource {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    symbols: HashMap<Asset, String>,
}

#[derive(Debug, Deserialize)]
struct TickerPrice {
    price: String,
}

impl BinanceSource {
    pub fn new(
        base_url: impl Into<String>,
        api_key: Option<String>,
        symbols: HashMap<Asset, String>,
        timeout: Duration,
    ) -> Result<Self> {
        Ok(Self {
            client: http_client(timeout)?,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
            symbols,
        })
    }

    async fn fetch_one(&self, symbol: &str) -> Result<Decimal> {
        let mut request = self
            .client
            .get(format!("{}/api/v3/ticker/price", self.base_url))
            .query(&[("symbol", symbol)]);
        if let Some(key) = &self.api_key {
            request = request.header(BINANCE_KEY_HEADER, key);
        }
        let body = request.send().await?.error_for_status()?.text().await?;
        parse_binance_price(&body)
    }
}

#[async_trait]
impl PriceSource for BinanceSource {
    fn name(&self) -> &str {
        "binance"
    }

    async fn fetch(&self, assets: &[Asset]) -> Result<HashMap<Asset, Decimal>> {
        let mut prices = HashMap::new();
        for asset in assets {
            let Some(symbol) = self.symbols.get(asset) else {
                continue;
            };
            match self.fetch_one(symbol).await {
                Ok(price) => {
                    debug!(source = "binance", %asset, %price, "Fetched price");
                    prices.insert(asset.clone(), price);
                }
                Err(e) => warn!(source = "binance", %asset, error = %e, "Price fetch failed"),
            }
        }
        Ok(prices)
    }
}

pub fn parse_binance_price(body: &str) -> Result<Decimal> {
    let ticker: TickerPrice = serde_json::from_str(body)?;
    Decimal::from_str(ticker.price.trim())
        .map_err(|e| DeskError::SourceError(format!("Bad Binance price {:?}: {}", ticker.price, e)))
}

/// CoinGecko simple-price endpoint, all assets in one request.
pub struct CoinGeckoSource {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    ids: HashMap<Asset, String>,
}

impl CoinGeckoSource {
    pub fn new(
        base_url: impl Into<String>,
        api_key: Option<String>,
        ids: HashMap<Asset, String>,
        timeout: Duration,
    ) -> Result<Self> {
        Ok(Self {
            client: http_client(timeout)?,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
            ids,
        })
    }
}

#[async_trait]
impl PriceSource for CoinGeckoSource {
    fn name(&self) -> &str {
        "coingecko"
    }

    async fn fetch(&self, assets: &[Asset]) -> Result<HashMap<Asset, Decimal>> {
        let wanted: Vec<(Asset, String)> = assets
            .iter()
            .filter_map(|a| self.ids.get(a).map(|id| (a.clone(), id.clone())))
            .collect();
        if wanted.is_empty() {
            return Ok(HashMap::new());
        }

        let ids = wanted
            .iter()
            .map(|(_, id)| id.as_str())
            .collect::<Vec<_>>()
            .join(",");
        let mut request = self
            .client
            .get(format!("{}/api/v3/simple/price", self.base_url))
            .query(&[("ids", ids.as_str()), ("vs_currencies", COINGECKO_VS_CURRENCY)]);
        if let Some(key) = &self.api_key {
            request = request.header(COINGECKO_KEY_HEADER, key);
        }
        let body = request.send().await?.error_for_status()?.text().await?;
        parse_coingecko(&body, &wanted)
    }
}

/// Extracts USD prices for the requested ids. Ids missing from the response or
/// carrying a non-numeric price are logged and skipped.
pub fn parse_coingecko(body: &str, wanted: &[(Asset, String)]) -> Result<HashMap<Asset, Decimal>> {
    let json: serde_json::Value = serde_json::from_str(body)?;
    let mut prices = HashMap::new();
    for (asset, id) in wanted {
        let price = json
            .get(id)
            .and_then(|entry| entry.get(COINGECKO_VS_CURRENCY))
            .and_then(|value| match value {
                serde_json::Value::Number(n) => Decimal::from_str(&n.to_string()).ok(),
                serde_json::Value::String(s) => Decimal::from_str(s).ok(),
                _ => None,
            });
        match price {
            Some(price) => {
                prices.insert(asset.clone(), price);
            }
            None => warn!(source = "coingecko", %asset, id = id.as_str(), "No usable price in response"),
        }
    }
    Ok(prices)
}

/// Builds one source per configured entry, mapping each asset to the
/// identifier that source knows it by.
pub fn sources_from_config(config: &Config) -> Result<Vec<PriceSourceBox>> {
    config
        .pricing
        .sources
        .iter()
        .map(|source| build_source(config, source))
        .collect()
}

fn build_source(config: &Config, source: &SourceConfig) -> Result<PriceSourceBox> {
    let timeout = config.pricing.source_timeout;
    let source: PriceSourceBox = match source.kind {
        SourceKind::Binance => {
            let symbols = config
                .assets
                .iter()
                .filter_map(|a| a.binance_symbol.clone().map(|s| (a.symbol.clone(), s)))
                .collect();
            Box::new(BinanceSource::new(
                source.base_url.clone(),
                source.api_key.clone(),
                symbols,
                timeout,
            )?)
        }
        SourceKind::CoinGecko => {
            let ids = config
                .assets
                .iter()
                .filter_map(|a| a.coingecko_id.clone().map(|id| (a.symbol.clone(), id)))
                .collect();
            Box::new(CoinGeckoSource::new(
                source.base_url.clone(),
                source.api_key.clone(),
                ids,
                timeout,
            )?)
        }
    };
    Ok(source)
}
