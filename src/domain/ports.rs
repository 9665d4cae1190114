use super::asset::{Asset, Language};
use super::order::{Decision, OrderRecord, RequestId, ReviewRequest, UserId};
use super::reply::Reply;
use crate::error::Result;
use async_trait::async_trait;
use rust_decimal::Decimal;
use std::collections::HashMap;

/// An independent market-data source.
#[async_trait]
pub trait PriceSource: Send + Sync {
    fn name(&self) -> &str;

    /// Returns whatever prices the source could obtain. Assets it failed on are
    /// simply absent from the map.
    async fn fetch(&self, assets: &[Asset]) -> Result<HashMap<Asset, Decimal>>;
}

/// Best-effort order log.
#[async_trait]
pub trait OrderSink: Send + Sync {
    async fn record(&self, order: OrderRecord) -> Result<()>;
}

/// The chat transport, seen from the workflow.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, user: UserId, language: Language, reply: Reply) -> Result<()>;

    /// Posts the receipt to the reviewer channel with approve/reject controls
    /// and returns the id the reviewer's decision will refer to.
    async fn submit_review(&self, review: ReviewRequest) -> Result<RequestId>;

    /// Marks a reviewed request as decided and removes its controls.
    async fn close_review(&self, request_id: RequestId, decision: Decision) -> Result<()>;
}

pub type PriceSourceBox = Box<dyn PriceSource>;
pub type OrderSinkBox = Box<dyn OrderSink>;
pub type TransportBox = Box<dyn Transport>;
