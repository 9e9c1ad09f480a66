//! Type-safe price representation using decimal arithmetic.
//!
//! Prices arrive from the browser and from Printful in decimal currency units
//! (e.g. `19.99`, `"25.00"`); Stripe expects integer minor units (`1999`).
//! The conversion is `round(amount * 100)` with midpoint-away-from-zero
//! rounding, so fractional-cent inputs are not preserved exactly.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// Errors that can occur when converting a [`Price`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PriceError {
    /// The amount is below zero.
    #[error("price cannot be negative")]
    Negative,
    /// The amount does not fit in minor units.
    #[error("price is out of range")]
    OutOfRange,
    /// The amount could not be parsed as a decimal.
    #[error("invalid price amount: {0}")]
    Invalid(String),
}

/// A price with currency information.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Price {
    /// Amount in the currency's standard unit (e.g., dollars, not cents).
    pub amount: Decimal,
    /// ISO 4217 currency code.
    pub currency_code: CurrencyCode,
}

impl Price {
    /// Create a new price.
    #[must_use]
    pub const fn new(amount: Decimal, currency_code: CurrencyCode) -> Self {
        Self {
            amount,
            currency_code,
        }
    }

    /// Create a USD price.
    #[must_use]
    pub const fn usd(amount: Decimal) -> Self {
        Self::new(amount, CurrencyCode::USD)
    }

    /// Create a price from an amount in minor units (cents).
    #[must_use]
    pub fn from_minor_units(minor: i64, currency_code: CurrencyCode) -> Self {
        Self::new(Decimal::new(minor, 2), currency_code)
    }

    /// Parse a vendor-supplied decimal string such as `"25.00"`.
    ///
    /// # Errors
    ///
    /// Returns [`PriceError::Invalid`] if the string is not a decimal number.
    pub fn parse_amount(s: &str) -> Result<Decimal, PriceError> {
        s.trim()
            .parse::<Decimal>()
            .map_err(|_| PriceError::Invalid(s.to_string()))
    }

    /// Convert to integer minor units: `round(amount * 100)`.
    ///
    /// # Errors
    ///
    /// Returns [`PriceError::Negative`] for amounts below zero and
    /// [`PriceError::OutOfRange`] when the result does not fit in an `i64`.
    pub fn to_minor_units(&self) -> Result<i64, PriceError> {
        if self.amount.is_sign_negative() && !self.amount.is_zero() {
            return Err(PriceError::Negative);
        }

        self.amount
            .checked_mul(Decimal::ONE_HUNDRED)
            .ok_or(PriceError::OutOfRange)?
            .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
            .to_i64()
            .ok_or(PriceError::OutOfRange)
    }
}

/// ISO 4217 currency codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum CurrencyCode {
    #[default]
    USD,
    CAD,
}

impl CurrencyCode {
    /// Lowercase code as Stripe expects it (`usd`).
    #[must_use]
    pub const fn as_stripe_str(&self) -> &'static str {
        match self {
            Self::USD => "usd",
            Self::CAD => "cad",
        }
    }
}
