//! Type-safe price representation using decimal arithmetic.
//!
//! Prices travel through the document store as decimal strings and are never
//! represented as floats; discount math and checkout totals round half-up to
//! two decimal places.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// A price with currency information.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Price {
    /// Amount in the currency's standard unit (e.g., rupees, not paise).
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

    /// Create a price from an amount in minor units (e.g., paise for INR).
    #[must_use]
    pub fn from_minor_units(minor: i64, currency_code: CurrencyCode) -> Self {
        Self {
            amount: Decimal::new(minor, 2),
            currency_code,
        }
    }

    /// Convert to minor units (e.g., paise for INR), rounding half-up.
    ///
    /// Payment gateways take amounts in the smallest currency unit.
    #[must_use]
    pub fn to_minor_units(&self) -> i64 {
        (self.amount * Decimal::from(100))
            .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
            .to_i64()
            .unwrap_or(0)
    }

    /// Apply a percentage discount, rounding to two decimal places.
    #[must_use]
    pub fn discounted(&self, discount: DiscountPercent) -> Self {
        let factor = Decimal::from(100 - u32::from(discount.as_u8())) / Decimal::from(100);
        Self {
            amount: (self.amount * factor)
                .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero),
            currency_code: self.currency_code,
        }
    }

    /// Multiply by a quantity.
    #[must_use]
    pub fn times(&self, quantity: u32) -> Self {
        Self {
            amount: self.amount * Decimal::from(quantity),
            currency_code: self.currency_code,
        }
    }

    /// Format for display (e.g., "₹199.00").
    #[must_use]
    pub fn display(&self) -> String {
        format!("{}{:.2}", self.currency_code.symbol(), self.amount)
    }
}

/// A percentage discount in the range 0..=100.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DiscountPercent(u8);

impl DiscountPercent {
    /// Create a discount, clamping to 100.
    #[must_use]
    pub const fn new(percent: u8) -> Self {
        if percent > 100 {
            Self(100)
        } else {
            Self(percent)
        }
    }

    /// The discount as a percentage value.
    #[must_use]
    pub const fn as_u8(self) -> u8 {
        self.0
    }

    /// Whether any discount applies.
    #[must_use]
    pub const fn is_some(self) -> bool {
        self.0 > 0
    }
}

/// ISO 4217 currency codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum CurrencyCode {
    #[default]
    INR,
    USD,
    EUR,
    GBP,
}

impl CurrencyCode {
    /// The display symbol for the currency.
    #[must_use]
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::INR => "₹",
            Self::USD => "$",
            Self::EUR => "€",
            Self::GBP => "£",
        }
    }

    /// The ISO 4217 code as a string.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::INR => "INR",
            Self::USD => "USD",
            Self::EUR => "EUR",
            Self::GBP => "GBP",
        }
    }
}

impl std::str::FromStr for CurrencyCode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "INR" => Ok(Self::INR),
            "USD" => Ok(Self::USD),
            "EUR" => Ok(Self::EUR),
            "GBP" => Ok(Self::GBP),
            _ => Err(format!("unsupported currency code: {s}")),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn inr(amount: &str) -> Price {
        Price::new(amount.parse().unwrap(), CurrencyCode::INR)
    }

    #[test]
    fn test_discounted_price() {
        // 20% off 500.00 = 400.00
        let price = inr("500.00").discounted(DiscountPercent::new(20));
        assert_eq!(price.amount, "400.00".parse::<Decimal>().unwrap());
    }

    #[test]
    fn test_discounted_rounds_half_up() {
        // 15% off 99.99 = 84.9915 -> 84.99
        let price = inr("99.99").discounted(DiscountPercent::new(15));
        assert_eq!(price.amount, "84.99".parse::<Decimal>().unwrap());
    }

    #[test]
    fn test_zero_discount_is_identity() {
        let price = inr("123.45");
        assert_eq!(price.discounted(DiscountPercent::default()), price);
    }

    #[test]
    fn test_discount_clamps_at_100() {
        let discount = DiscountPercent::new(250);
        assert_eq!(discount.as_u8(), 100);
        assert_eq!(inr("80.00").discounted(discount).amount, Decimal::ZERO);
    }

    #[test]
    fn test_minor_units_roundtrip() {
        let price = Price::from_minor_units(19_900, CurrencyCode::INR);
        assert_eq!(price.amount, "199.00".parse::<Decimal>().unwrap());
        assert_eq!(price.to_minor_units(), 19_900);
    }

    #[test]
    fn test_times_quantity() {
        let line = inr("49.50").times(3);
        assert_eq!(line.amount, "148.50".parse::<Decimal>().unwrap());
    }

    #[test]
    fn test_display() {
        assert_eq!(inr("199.00").display(), "₹199.00");
        assert_eq!(
            Price::new("5.5".parse().unwrap(), CurrencyCode::USD).display(),
            "$5.50"
        );
    }

    #[test]
    fn test_currency_code_from_str() {
        assert_eq!("INR".parse::<CurrencyCode>().unwrap(), CurrencyCode::INR);
        assert!("XYZ".parse::<CurrencyCode>().is_err());
    }
}
