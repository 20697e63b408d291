use std::sync::OnceLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::Id;

/// One tracked stock position.
///
/// `current_price` is only ever set by a successful quote fetch; a holding
/// whose fetches have all failed keeps `current_price = None` and
/// `is_fallback_data = true` until a refresh succeeds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Holding {
    pub id: Id,
    /// Normalized (uppercased) ticker symbol.
    pub symbol: String,
    pub quantity: Decimal,
    /// Price paid per unit.
    pub purchase_price: Decimal,
    /// Last successfully fetched market price.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub current_price: Option<Decimal>,
    /// Timestamp of the last successful fetch.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub last_updated: Option<DateTime<Utc>>,
    /// True while `current_price` is absent or has never been confirmed live.
    #[serde(default)]
    pub is_fallback_data: bool,
}

impl Holding {
    /// Market value of this position, falling back to the purchase price when
    /// no live quote has ever been fetched.
    pub fn market_value(&self) -> Decimal {
        self.quantity * self.current_price.unwrap_or(self.purchase_price)
    }

    /// Unrealized profit/loss, or `None` when no live price is known.
    pub fn unrealized_pl(&self) -> Option<Decimal> {
        self.current_price
            .map(|current| self.quantity * (current - self.purchase_price))
    }
}

/// Candidate for a new holding, as submitted by a consumer.
///
/// Validation happens in [`HoldingDraft::validate`]; the quote lookup and the
/// insert policy live in the portfolio store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HoldingDraft {
    pub symbol: String,
    pub quantity: Decimal,
    pub purchase_price: Decimal,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum HoldingError {
    #[error("invalid symbol {0:?}: expected 1-10 letters, digits, '.' or '-'")]
    InvalidSymbol(String),
    #[error("quantity must be greater than zero")]
    NonPositiveQuantity,
    #[error("purchase price must not be negative")]
    NegativePurchasePrice,
}

fn symbol_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[A-Z0-9.\-]{1,10}$").expect("valid symbol regex"))
}

impl HoldingDraft {
    pub fn new(
        symbol: impl Into<String>,
        quantity: Decimal,
        purchase_price: Decimal,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            quantity,
            purchase_price,
        }
    }

    /// Normalize the symbol (trim + uppercase) and check the field invariants.
    pub fn validate(&self) -> Result<ValidHolding, HoldingError> {
        let symbol = self.symbol.trim().to_uppercase();
        if !symbol_pattern().is_match(&symbol) {
            return Err(HoldingError::InvalidSymbol(self.symbol.clone()));
        }
        if self.quantity <= Decimal::ZERO {
            return Err(HoldingError::NonPositiveQuantity);
        }
        if self.purchase_price < Decimal::ZERO {
            return Err(HoldingError::NegativePurchasePrice);
        }
        Ok(ValidHolding {
            symbol,
            quantity: self.quantity,
            purchase_price: self.purchase_price,
        })
    }
}

/// A draft that passed validation, with the symbol already normalized.
#[derive(Debug, Clone)]
pub struct ValidHolding {
    pub symbol: String,
    pub quantity: Decimal,
    pub purchase_price: Decimal,
}

impl ValidHolding {
    /// Materialize a holding with a fresh id and no price data yet.
    pub fn into_holding(self) -> Holding {
        Holding {
            id: Id::new(),
            symbol: self.symbol,
            quantity: self.quantity,
            purchase_price: self.purchase_price,
            current_price: None,
            last_updated: None,
            is_fallback_data: false,
        }
    }
}
