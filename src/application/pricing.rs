//! Multi-source price aggregation.
//!
//! Readers always get a price: the last published snapshot, which starts out
//! as the configured fallback table. Refreshes query every source
//! concurrently, each under its own timeout, and publish a new immutable
//! snapshot that replaces the old one wholesale.

use crate::domain::asset::Asset;
use crate::domain::ports::PriceSourceBox;
use chrono::{DateTime, Utc};
use futures::future::join_all;
use rust_decimal::Decimal;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{debug, info, warn};

/// Decimal places kept on aggregated prices.
const PRICE_SCALE: u32 = 4;

#[derive(Debug, Clone, PartialEq)]
pub struct PriceSnapshot {
    pub prices: BTreeMap<Asset, Decimal>,
    /// Time of the last aggregation with at least one contributing source.
    pub captured_at: Option<DateTime<Utc>>,
    /// Sources that contributed to this snapshot; 0 means fallback or carried-over data.
    pub source_count: usize,
}

impl PriceSnapshot {
    fn fallback(prices: BTreeMap<Asset, Decimal>) -> Self {
        Self {
            prices,
            captured_at: None,
            source_count: 0,
        }
    }

    pub fn price(&self, asset: &Asset) -> Option<Decimal> {
        self.prices.get(asset).copied()
    }
}

pub struct PriceAggregator {
    sources: Vec<PriceSourceBox>,
    assets: Vec<Asset>,
    source_timeout: Duration,
    refresh_interval: Duration,
    current: RwLock<Arc<PriceSnapshot>>,
    /// Held for the duration of a refresh; stores when the last one started.
    last_refresh: Mutex<Option<Instant>>,
}

impl PriceAggregator {
    /// The fallback table defines the supported assets and must hold a
    /// positive price for each of them.
    pub fn new(
        sources: Vec<PriceSourceBox>,
        fallback: BTreeMap<Asset, Decimal>,
        source_timeout: Duration,
        refresh_interval: Duration,
    ) -> Self {
        let assets = fallback.keys().cloned().collect();
        Self {
            sources,
            assets,
            source_timeout,
            refresh_interval,
            current: RwLock::new(Arc::new(PriceSnapshot::fallback(fallback))),
            last_refresh: Mutex::new(None),
        }
    }

    pub async fn snapshot(&self) -> Arc<PriceSnapshot> {
        Arc::clone(&*self.current.read().await)
    }

    /// Price from the last published snapshot without triggering a refresh.
    pub async fn cached_price(&self, asset: &Asset) -> Option<Decimal> {
        self.current.read().await.price(asset)
    }

    /// Current price for a supported asset, refreshing first when the snapshot
    /// is older than the refresh interval. `None` only for unsupported assets.
    pub async fn price(&self, asset: &Asset) -> Option<Decimal> {
        self.refresh_if_stale().await;
        self.cached_price(asset).await
    }

    /// Refreshes unless a recent refresh exists. Never waits on a refresh that
    /// another caller already started.
    pub async fn refresh_if_stale(&self) {
        if self.sources.is_empty() {
            return;
        }
        let Ok(mut last) = self.last_refresh.try_lock() else {
            debug!("Refresh already in progress, serving cached prices");
            return;
        };
        let fresh = last.is_some_and(|at| at.elapsed() < self.refresh_interval);
        if !fresh {
            *last = Some(Instant::now());
            self.aggregate().await;
        }
    }

    /// Unconditionally queries every source and publishes a new snapshot.
    pub async fn refresh(&self) -> Arc<PriceSnapshot> {
        let mut last = self.last_refresh.lock().await;
        *last = Some(Instant::now());
        self.aggregate().await
    }

    /// Runs `refresh` on a fixed interval until the handle is aborted.
    pub fn spawn_refresh(self: Arc<Self>) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.refresh_interval);
            loop {
                ticker.tick().await;
                self.refresh().await;
            }
        })
    }

    async fn aggregate(&self) -> Arc<PriceSnapshot> {
        let fetches = self.sources.iter().map(|source| async move {
            let result = timeout(self.source_timeout, source.fetch(&self.assets)).await;
            match result {
                Ok(Ok(prices)) => Some(prices),
                Ok(Err(e)) => {
                    warn!(source = source.name(), error = %e, "Price source failed");
                    None
                }
                Err(_) => {
                    warn!(source = source.name(), timeout = ?self.source_timeout, "Price source timed out");
                    None
                }
            }
        });
        let results: Vec<HashMap<Asset, Decimal>> = join_all(fetches)
            .await
            .into_iter()
            .flatten()
            .filter(|prices| !prices.is_empty())
            .collect();

        let previous = self.snapshot().await;
        let snapshot = Arc::new(combine(&self.assets, &results, &previous));
        if snapshot.source_count == 0 {
            warn!("All price sources failed, keeping previous prices");
        } else {
            info!(sources = snapshot.source_count, "Prices refreshed");
        }

        *self.current.write().await = Arc::clone(&snapshot);
        snapshot
    }
}

fn combine(
    assets: &[Asset],
    results: &[HashMap<Asset, Decimal>],
    previous: &PriceSnapshot,
) -> PriceSnapshot {
    let mut prices = BTreeMap::new();
    for asset in assets {
        let observed: Vec<Decimal> = results
            .iter()
            .filter_map(|r| r.get(asset).copied())
            .filter(|p| *p > Decimal::ZERO)
            .collect();
        let price = trimmed_mean(&observed).or_else(|| previous.price(asset));
        if let Some(price) = price {
            prices.insert(asset.clone(), price);
        }
    }

    let source_count = results.len();
    PriceSnapshot {
        prices,
        captured_at: if source_count > 0 {
            Some(Utc::now())
        } else {
            previous.captured_at
        },
        source_count,
    }
}

/// Mean of the values after dropping one minimum and one maximum, which only
/// happens when three or more values are present.
pub fn trimmed_mean(values: &[Decimal]) -> Option<Decimal> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort();
    let kept = if sorted.len() > 2 {
        &sorted[1..sorted.len() - 1]
    } else {
        &sorted[..]
    };
    let sum: Decimal = kept.iter().copied().sum();
    Some((sum / Decimal::from(kept.len())).round_dp(PRICE_SCALE))
}
