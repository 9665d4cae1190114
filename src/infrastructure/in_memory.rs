use crate::domain::asset::{Asset, Language};
use crate::domain::order::{Decision, OrderRecord, RequestId, ReviewRequest, UserId};
use crate::domain::ports::{OrderSink, OrderSinkBox, PriceSource, Transport};
use crate::domain::reply::Reply;
use crate::error::{DeskError, Result};
use async_trait::async_trait;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tokio::sync::RwLock;
use tracing::{info, warn};

/// A price source serving a fixed, mutable table.
///
/// `Clone` shares the table, so a test can move prices after handing the
/// source to an aggregator.
#[derive(Default, Clone)]
pub struct StaticPriceSource {
    name: String,
    prices: Arc<RwLock<HashMap<Asset, Decimal>>>,
}

impl StaticPriceSource {
    pub fn new(name: impl Into<String>, prices: HashMap<Asset, Decimal>) -> Self {
        Self {
            name: name.into(),
            prices: Arc::new(RwLock::new(prices)),
        }
    }

    pub async fn set(&self, asset: Asset, price: Decimal) {
        self.prices.write().await.insert(asset, price);
    }
}

#[async_trait]
impl PriceSource for StaticPriceSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch(&self, assets: &[Asset]) -> Result<HashMap<Asset, Decimal>> {
        let prices = self.prices.read().await;
        Ok(assets
            .iter()
            .filter_map(|a| prices.get(a).map(|p| (a.clone(), *p)))
            .collect())
    }
}

#[derive(Default)]
struct Recorded {
    replies: Vec<(UserId, Language, Reply)>,
    reviews: Vec<ReviewRequest>,
    closed: Vec<(RequestId, Decision)>,
}

/// A transport that keeps everything it is asked to deliver.
///
/// Review ids count up from 1 per accepted review. `Clone` shares state.
#[derive(Clone)]
pub struct RecordingTransport {
    recorded: Arc<RwLock<Recorded>>,
    next_id: Arc<AtomicU64>,
    fail_reviews: Arc<AtomicBool>,
}

impl Default for RecordingTransport {
    fn default() -> Self {
        Self {
            recorded: Arc::new(RwLock::new(Recorded::default())),
            next_id: Arc::new(AtomicU64::new(1)),
            fail_reviews: Arc::new(AtomicBool::new(false)),
        }
    }
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes `submit_review` fail until switched back.
    pub fn fail_reviews(&self, fail: bool) {
        self.fail_reviews.store(fail, Ordering::SeqCst);
    }

    pub async fn replies(&self) -> Vec<(UserId, Language, Reply)> {
        self.recorded.read().await.replies.clone()
    }

    pub async fn replies_for(&self, user: UserId) -> Vec<Reply> {
        self.recorded
            .read()
            .await
            .replies
            .iter()
            .filter(|(u, _, _)| *u == user)
            .map(|(_, _, reply)| reply.clone())
            .collect()
    }

    pub async fn reviews(&self) -> Vec<ReviewRequest> {
        self.recorded.read().await.reviews.clone()
    }

    pub async fn closed(&self) -> Vec<(RequestId, Decision)> {
        self.recorded.read().await.closed.clone()
    }
}

#[async_trait]
impl Transport for RecordingTransport {
    async fn send(&self, user: UserId, language: Language, reply: Reply) -> Result<()> {
        self.recorded
            .write()
            .await
            .replies
            .push((user, language, reply));
        Ok(())
    }

    async fn submit_review(&self, review: ReviewRequest) -> Result<RequestId> {
        if self.fail_reviews.load(Ordering::SeqCst) {
            return Err(DeskError::TransportError(
                "reviewer channel unavailable".to_string(),
            ));
        }
        let mut recorded = self.recorded.write().await;
        recorded.reviews.push(review);
        Ok(self.next_id.fetch_add(1, Ordering::SeqCst))
    }

    async fn close_review(&self, request_id: RequestId, decision: Decision) -> Result<()> {
        self.recorded
            .write()
            .await
            .closed
            .push((request_id, decision));
        Ok(())
    }
}

/// Keeps order records in memory. `Clone` shares the log.
#[derive(Default, Clone)]
pub struct InMemoryOrderSink {
    records: Arc<RwLock<Vec<OrderRecord>>>,
}

impl InMemoryOrderSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn records(&self) -> Vec<OrderRecord> {
        self.records.read().await.clone()
    }
}

#[async_trait]
impl OrderSink for InMemoryOrderSink {
    async fn record(&self, order: OrderRecord) -> Result<()> {
        self.records.write().await.push(order);
        Ok(())
    }
}

/// Writes each order record to the log and nowhere else.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingOrderSink;

#[async_trait]
impl OrderSink for TracingOrderSink {
    async fn record(&self, order: OrderRecord) -> Result<()> {
        info!(
            request_id = ?order.request_id,
            user = order.user_id,
            direction = %order.direction,
            asset = %order.asset,
            amount = %order.amount,
            total = %order.total,
            status = ?order.status,
            "Order recorded"
        );
        Ok(())
    }
}

/// Hands every record to each inner sink. A failing sink is logged and does
/// not stop the others.
pub struct FanoutSink {
    sinks: Vec<OrderSinkBox>,
}

impl FanoutSink {
    pub fn new(sinks: Vec<OrderSinkBox>) -> Self {
        Self { sinks }
    }
}

#[async_trait]
impl OrderSink for FanoutSink {
    async fn record(&self, order: OrderRecord) -> Result<()> {
        let mut failures = 0;
        for sink in &self.sinks {
            if let Err(e) = sink.record(order.clone()).await {
                failures += 1;
                warn!(error = %e, "Order sink failed");
            }
        }
        if failures > 0 && failures == self.sinks.len() {
            return Err(DeskError::SinkError("every order sink failed".to_string()));
        }
        Ok(())
    }
}
