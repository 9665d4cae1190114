use crate::domain::asset::Direction;
use crate::error::DeskError;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// A strictly positive quantity of an asset requested by the user.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Amount(Decimal);

impl Amount {
    pub fn new(value: Decimal) -> Result<Self, DeskError> {
        if value > Decimal::ZERO {
            Ok(Self(value))
        } else {
            Err(DeskError::ValidationError(
                "Amount must be positive".to_string(),
            ))
        }
    }

    /// Parses user input, accepting a comma as the decimal separator.
    pub fn parse(input: &str) -> Result<Self, DeskError> {
        let normalised = input.trim().replace(',', ".");
        let value = Decimal::from_str(&normalised)
            .map_err(|e| DeskError::ValidationError(format!("Not a number: {}", e)))?;
        Self::new(value)
    }

    pub fn value(&self) -> Decimal {
        self.0
    }
}

impl TryFrom<Decimal> for Amount {
    type Error = DeskError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Amount> for Decimal {
    fn from(amount: Amount) -> Self {
        amount.0
    }
}

/// Fee-adjusted amounts for one request, all in the quote currency.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    /// Price of one unit of the asset used for this quote.
    pub price: Decimal,
    pub base: Decimal,
    pub fee: Decimal,
    pub total: Decimal,
}

/// Turns a requested amount into base, fee and total.
///
/// The same formula applies to every asset: `base = amount * price`,
/// `fee = base * fee_rate`, and the fee is added on Buy and subtracted on Sell.
/// A request too large for `Decimal` has no quote.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeeCalculator {
    fee_rate: Decimal,
}

impl FeeCalculator {
    pub fn new(fee_rate: Decimal) -> Self {
        Self { fee_rate }
    }

    pub fn fee_rate(&self) -> Decimal {
        self.fee_rate
    }

    pub fn quote(&self, direction: Direction, amount: Amount, price: Decimal) -> Option<Quote> {
        let base = amount.value().checked_mul(price)?;
        let fee = base.checked_mul(self.fee_rate)?;
        let total = match direction {
            Direction::Buy => base.checked_add(fee)?,
            Direction::Sell => base.checked_sub(fee)?,
        };
        Some(Quote {
            price,
            base,
            fee,
            total,
        })
    }
}
