use crate::domain::asset::{Asset, Direction};
use crate::domain::quote::{Amount, Quote};
use crate::domain::wallet::WalletError;
use rust_decimal::Decimal;

/// Outbound messages to a user. Rendering and localisation belong to the transport.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    ChooseLanguage,
    Rates {
        prices: Vec<(Asset, Decimal)>,
        fee_rate: Decimal,
    },
    Menu,
    PickAsset {
        assets: Vec<Asset>,
    },
    EnterAmount {
        direction: Direction,
        asset: Asset,
    },
    QuoteSummary {
        direction: Direction,
        asset: Asset,
        amount: Amount,
        quote: Quote,
        fee_rate: Decimal,
    },
    /// Where the user sends their payment for this request.
    PayTo {
        currency: String,
        address: String,
    },
    EnterWallet,
    InvalidWallet(WalletError),
    SendReceipt,
    PhotoOnly,
    AwaitingReview,
    ReviewUnavailable,
    AutoRejected,
    Approved {
        asset: Asset,
        amount: Amount,
        total: Decimal,
    },
    Rejected,
}
