use crate::domain::asset::{Asset, Direction, Language};
use crate::domain::quote::{Amount, Quote};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Identity of a chat user.
pub type UserId = u64;

/// Identifier assigned by the reviewer channel to a forwarded receipt.
pub type RequestId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Approved,
    Rejected,
}

/// A reviewer's binding decision on a pending request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Decision {
    Approve,
    Reject,
}

impl From<Decision> for OrderStatus {
    fn from(decision: Decision) -> Self {
        match decision {
            Decision::Approve => OrderStatus::Approved,
            Decision::Reject => OrderStatus::Rejected,
        }
    }
}

/// Everything fixed about a request at the moment its receipt was submitted.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingApproval {
    pub request_id: RequestId,
    pub user: UserId,
    pub username: Option<String>,
    pub language: Language,
    pub direction: Direction,
    pub asset: Asset,
    pub amount: Amount,
    pub quote: Quote,
    pub payout_wallet: String,
}

/// What the reviewer channel is shown for one submitted receipt.
#[derive(Debug, Clone, PartialEq)]
pub struct ReviewRequest {
    pub user: UserId,
    pub username: Option<String>,
    pub direction: Direction,
    pub asset: Asset,
    pub amount: Amount,
    pub quote: Quote,
    pub payout_wallet: String,
    pub receipt: Vec<u8>,
    /// The receipt carried no readable capture time.
    pub metadata_missing: bool,
    /// The user already submitted a receipt earlier in this session.
    pub is_retry: bool,
}

/// A row handed to the order log at submission and at resolution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderRecord {
    pub ts: DateTime<Utc>,
    pub request_id: Option<RequestId>,
    pub direction: Direction,
    pub asset: Asset,
    pub amount: Decimal,
    pub price: Decimal,
    pub base: Decimal,
    pub fee: Decimal,
    pub total: Decimal,
    pub user_id: UserId,
    pub username: Option<String>,
    pub wallet: String,
    pub status: OrderStatus,
}

impl OrderRecord {
    pub fn from_approval(approval: &PendingApproval, status: OrderStatus) -> Self {
        Self {
            ts: Utc::now(),
            request_id: Some(approval.request_id),
            direction: approval.direction,
            asset: approval.asset.clone(),
            amount: approval.amount.value(),
            price: approval.quote.price,
            base: approval.quote.base,
            fee: approval.quote.fee,
            total: approval.quote.total,
            user_id: approval.user,
            username: approval.username.clone(),
            wallet: approval.payout_wallet.clone(),
            status,
        }
    }
}
