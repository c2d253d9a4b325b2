//! Type-safe price representation using decimal arithmetic.
//!
//! Catalog prices arrive from the backend as decimal numbers in the
//! currency's standard unit. The payments endpoint expects the amount in the
//! smallest unit (cents/fils), so conversion happens at that boundary only.

use std::fmt;
use std::str::FromStr;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// Errors produced when building or converting a [`Price`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PriceError {
    /// Prices are never negative.
    #[error("price cannot be negative: {0}")]
    Negative(Decimal),
    /// Amount does not fit into the minor-unit integer.
    #[error("price {0} is out of range")]
    OutOfRange(Decimal),
    /// Currency code is not one we sell in.
    #[error("unsupported currency: {0}")]
    UnsupportedCurrency(String),
}

/// A price with currency information.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Price {
    /// Amount in the currency's standard unit (e.g., dirhams, not fils).
    pub amount: Decimal,
    /// ISO 4217 currency code.
    pub currency_code: CurrencyCode,
}

impl Price {
    /// Create a new price.
    ///
    /// # Errors
    ///
    /// Returns `PriceError::Negative` for amounts below zero.
    pub fn new(amount: Decimal, currency_code: CurrencyCode) -> Result<Self, PriceError> {
        if amount.is_sign_negative() && !amount.is_zero() {
            return Err(PriceError::Negative(amount));
        }
        Ok(Self {
            amount,
            currency_code,
        })
    }

    /// Zero in the given currency.
    #[must_use]
    pub const fn zero(currency_code: CurrencyCode) -> Self {
        Self {
            amount: Decimal::ZERO,
            currency_code,
        }
    }

    /// Amount in minor units (cents), rounded half away from zero.
    ///
    /// # Errors
    ///
    /// Returns `PriceError::OutOfRange` when the value does not fit in `i64`.
    pub fn to_minor_units(&self) -> Result<i64, PriceError> {
        let scaled = (self.amount * Decimal::ONE_HUNDRED)
            .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero);
        scaled.to_i64().ok_or(PriceError::OutOfRange(self.amount))
    }

    /// Subtract a discount, flooring at zero.
    #[must_use]
    pub fn discounted_by(&self, discount: Decimal) -> Self {
        let amount = (self.amount - discount).max(Decimal::ZERO);
        Self {
            amount,
            currency_code: self.currency_code,
        }
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let amount = self.amount.round_dp(2);
        match self.currency_code.symbol() {
            Some(symbol) => write!(f, "{symbol}{amount:.2}"),
            None => write!(f, "{} {amount:.2}", self.currency_code),
        }
    }
}

/// ISO 4217 currency codes the shop sells in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum CurrencyCode {
    #[default]
    AED,
    USD,
    EUR,
    GBP,
    INR,
}

impl CurrencyCode {
    /// Display symbol, when one is unambiguous.
    #[must_use]
    pub const fn symbol(self) -> Option<&'static str> {
        match self {
            Self::USD => Some("$"),
            Self::EUR => Some("€"),
            Self::GBP => Some("£"),
            Self::INR => Some("₹"),
            Self::AED => None,
        }
    }

    /// Upper-case ISO code.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::AED => "AED",
            Self::USD => "USD",
            Self::EUR => "EUR",
            Self::GBP => "GBP",
            Self::INR => "INR",
        }
    }
}

impl fmt::Display for CurrencyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for CurrencyCode {
    type Err = PriceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "AED" => Ok(Self::AED),
            "USD" => Ok(Self::USD),
            "EUR" => Ok(Self::EUR),
            "GBP" => Ok(Self::GBP),
            "INR" => Ok(Self::INR),
            other => Err(PriceError::UnsupportedCurrency(other.to_owned())),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case("999", 99_900)]
    #[case("19.99", 1_999)]
    #[case("0.005", 1)]
    #[case("0", 0)]
    fn test_to_minor_units(#[case] amount: &str, #[case] cents: i64) {
        let price = Price::new(amount.parse().unwrap(), CurrencyCode::AED).unwrap();
        assert_eq!(price.to_minor_units().unwrap(), cents);
    }

    #[test]
    fn test_negative_rejected() {
        assert!(matches!(
            Price::new(Decimal::NEGATIVE_ONE, CurrencyCode::USD),
            Err(PriceError::Negative(_))
        ));
    }

    #[test]
    fn test_discount_floors_at_zero() {
        let price = Price::new(Decimal::TEN, CurrencyCode::USD).unwrap();
        assert_eq!(price.discounted_by(Decimal::ONE_HUNDRED).amount, Decimal::ZERO);
        assert_eq!(
            price.discounted_by(Decimal::ONE).amount,
            Decimal::from(9)
        );
    }

    #[test]
    fn test_display() {
        let usd = Price::new("5".parse().unwrap(), CurrencyCode::USD).unwrap();
        assert_eq!(usd.to_string(), "$5.00");
        let aed = Price::new("999".parse().unwrap(), CurrencyCode::AED).unwrap();
        assert_eq!(aed.to_string(), "AED 999.00");
    }

    #[test]
    fn test_currency_parse_is_case_insensitive() {
        assert_eq!("aed".parse::<CurrencyCode>().unwrap(), CurrencyCode::AED);
        assert!("XYZ".parse::<CurrencyCode>().is_err());
    }
}
