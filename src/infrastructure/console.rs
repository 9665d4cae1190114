use crate::domain::asset::{Asset, Language};
use crate::domain::order::{Decision, RequestId, ReviewRequest, UserId};
use crate::domain::ports::Transport;
use crate::domain::reply::Reply;
use crate::error::{DeskError, Result};
use async_trait::async_trait;
use rust_decimal::Decimal;
use std::io::Write;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::Mutex;

/// A transport that prints every outbound message as a line of text.
///
/// Users see `[user <id> <lang>] ...`, the reviewer channel sees
/// `[review #<id> -> <channel>] ...`. Review ids count up from 1.
pub struct ConsoleTransport<W: Write + Send> {
    out: Mutex<W>,
    reviewer_channel: String,
    next_id: AtomicU64,
}

impl ConsoleTransport<std::io::Stdout> {
    pub fn stdout(reviewer_channel: impl Into<String>) -> Self {
        Self::new(std::io::stdout(), reviewer_channel)
    }
}

impl<W: Write + Send> ConsoleTransport<W> {
    pub fn new(out: W, reviewer_channel: impl Into<String>) -> Self {
        Self {
            out: Mutex::new(out),
            reviewer_channel: reviewer_channel.into(),
            next_id: AtomicU64::new(1),
        }
    }

    pub fn into_inner(self) -> W {
        self.out.into_inner()
    }

    async fn write_line(&self, line: String) -> Result<()> {
        let mut out = self.out.lock().await;
        writeln!(out, "{}", line).map_err(|e| DeskError::TransportError(e.to_string()))?;
        out.flush()
            .map_err(|e| DeskError::TransportError(e.to_string()))
    }
}

#[async_trait]
impl<W: Write + Send> Transport for ConsoleTransport<W> {
    async fn send(&self, user: UserId, language: Language, reply: Reply) -> Result<()> {
        self.write_line(format!("[user {} {}] {}", user, language.code(), render(&reply)))
            .await
    }

    async fn submit_review(&self, review: ReviewRequest) -> Result<RequestId> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let line = format!(
            "[review #{} -> {}] {}",
            id,
            self.reviewer_channel,
            render_review(&review)
        );
        self.write_line(line).await?;
        Ok(id)
    }

    async fn close_review(&self, request_id: RequestId, decision: Decision) -> Result<()> {
        let verdict = match decision {
            Decision::Approve => "approved",
            Decision::Reject => "rejected",
        };
        self.write_line(format!("[review #{}] {}", request_id, verdict))
            .await
    }
}

fn percent(rate: Decimal) -> Decimal {
    (rate * Decimal::ONE_HUNDRED).normalize()
}

fn asset_list(assets: &[Asset]) -> String {
    assets
        .iter()
        .map(Asset::symbol)
        .collect::<Vec<_>>()
        .join(", ")
}

/// English rendering of a reply.
pub fn render(reply: &Reply) -> String {
    match reply {
        Reply::ChooseLanguage => {
            let options = Language::ALL
                .iter()
                .map(|l| l.keyboard_label())
                .collect::<Vec<_>>()
                .join(" | ");
            format!("Choose your language: {}", options)
        }
        Reply::Rates { prices, fee_rate } => {
            let rates = prices
                .iter()
                .map(|(asset, price)| format!("{} = {}", asset, price))
                .collect::<Vec<_>>()
                .join(", ");
            format!("Current rates: {}. Fee: {}%", rates, percent(*fee_rate))
        }
        Reply::Menu => "Choose an action: Buy | Sell | ⬅️ Back".to_string(),
        Reply::PickAsset { assets } => format!("Choose an asset: {}", asset_list(assets)),
        Reply::EnterAmount { direction, asset } => {
            format!("Enter the amount of {} to {}", asset, direction)
        }
        Reply::QuoteSummary {
            direction,
            asset,
            amount,
            quote,
            fee_rate,
        } => format!(
            "{} {} {} at {}: base {}, fee {} ({}%), total {:.2}",
            direction.to_string().to_uppercase(),
            amount.value(),
            asset,
            quote.price,
            quote.base,
            quote.fee,
            percent(*fee_rate),
            quote.total
        ),
        Reply::PayTo { currency, address } => format!("Send {} to: {}", currency, address),
        Reply::EnterWallet => "Enter your payout wallet (0x..., 42 characters)".to_string(),
        Reply::InvalidWallet(reason) => format!("Invalid wallet: {}. Try again", reason),
        Reply::SendReceipt => "Send a photo of the payment receipt".to_string(),
        Reply::PhotoOnly => "Please send the receipt as a photo".to_string(),
        Reply::AwaitingReview => "Receipt received, waiting for operator review".to_string(),
        Reply::ReviewUnavailable => {
            "Could not forward your receipt, please send it again".to_string()
        }
        Reply::AutoRejected => "Receipt is not dated today and was rejected".to_string(),
        Reply::Approved {
            asset,
            amount,
            total,
        } => format!(
            "Your request was approved: {} {}, total {:.2}",
            amount.value(),
            asset,
            total
        ),
        Reply::Rejected => "Your request was rejected".to_string(),
    }
}

fn render_review(review: &ReviewRequest) -> String {
    let mut line = format!(
        "{} {} {} | base {} fee {} total {:.2} | wallet {} | user {}",
        review.direction.to_string().to_uppercase(),
        review.amount.value(),
        review.asset,
        review.quote.base,
        review.quote.fee,
        review.quote.total,
        review.payout_wallet,
        review.user,
    );
    if let Some(username) = &review.username {
        line.push_str(&format!(" (@{})", username));
    }
    line.push_str(&format!(" | receipt {} bytes", review.receipt.len()));
    if review.metadata_missing {
        line.push_str(" [metadata missing, check carefully]");
    }
    if review.is_retry {
        line.push_str(" [retry]");
    }
    line
}
