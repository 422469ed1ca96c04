//! Monetary value objects.
//!
//! `Money` pairs a non-negative decimal amount with an ISO 4217 currency
//! code. Arithmetic across differing currencies is rejected rather than
//! coerced.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::ValidationError;

/// Three-letter ISO 4217 currency code, normalized to uppercase.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Currency(String);

impl Currency {
    /// Creates a currency code, validating the 3-letter format.
    pub fn new(code: impl AsRef<str>) -> Result<Self, ValidationError> {
        let code = code.as_ref();
        if code.len() != 3 || !code.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(ValidationError::invalid_format(
                "currency",
                format!("expected 3-letter code, got '{}'", code),
            ));
        }
        Ok(Self(code.to_ascii_uppercase()))
    }

    /// Returns the inner code.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Immutable monetary amount.
///
/// # Invariants
///
/// - `amount` is never negative
/// - arithmetic requires identical currencies
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Money {
    amount: Decimal,
    currency: Currency,
}

impl Money {
    /// Creates a monetary amount, rejecting negative values.
    pub fn new(amount: Decimal, currency: Currency) -> Result<Self, ValidationError> {
        if amount.is_sign_negative() && !amount.is_zero() {
            return Err(ValidationError::negative_amount(
                "amount",
                amount.to_string(),
            ));
        }
        Ok(Self { amount, currency })
    }

    /// Creates a zero amount in the given currency.
    pub fn zero(currency: Currency) -> Self {
        Self {
            amount: Decimal::ZERO,
            currency,
        }
    }

    /// Returns the decimal amount.
    pub fn amount(&self) -> Decimal {
        self.amount
    }

    /// Returns the currency.
    pub fn currency(&self) -> &Currency {
        &self.currency
    }

    /// Returns true if the amount is zero.
    pub fn is_zero(&self) -> bool {
        self.amount.is_zero()
    }

    /// Adds another amount of the same currency.
    ///
    /// # Errors
    ///
    /// Returns `CurrencyMismatch` when the currencies differ.
    pub fn checked_add(&self, other: &Money) -> Result<Money, ValidationError> {
        self.require_same_currency(other)?;
        Ok(Self {
            amount: self.amount + other.amount,
            currency: self.currency.clone(),
        })
    }

    /// Subtracts another amount of the same currency.
    ///
    /// # Errors
    ///
    /// Returns `CurrencyMismatch` when the currencies differ, or a
    /// validation error when the result would be negative.
    pub fn checked_sub(&self, other: &Money) -> Result<Money, ValidationError> {
        self.require_same_currency(other)?;
        let result = self.amount - other.amount;
        if result.is_sign_negative() && !result.is_zero() {
            return Err(ValidationError::negative_amount(
                "amount",
                result.to_string(),
            ));
        }
        Ok(Self {
            amount: result,
            currency: self.currency.clone(),
        })
    }

    fn require_same_currency(&self, other: &Money) -> Result<(), ValidationError> {
        if self.currency != other.currency {
            return Err(ValidationError::currency_mismatch(
                self.currency.as_str(),
                other.currency.as_str(),
            ));
        }
        Ok(())
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.amount, self.currency)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rust_decimal::Decimal;

    fn usd() -> Currency {
        Currency::new("USD").unwrap()
    }

    fn eur() -> Currency {
        Currency::new("EUR").unwrap()
    }

    #[test]
    fn currency_normalizes_to_uppercase() {
        let c = Currency::new("usd").unwrap();
        assert_eq!(c.as_str(), "USD");
    }

    #[test]
    fn currency_rejects_wrong_length() {
        assert!(Currency::new("US").is_err());
        assert!(Currency::new("USDX").is_err());
        assert!(Currency::new("").is_err());
    }

    #[test]
    fn currency_rejects_non_alphabetic() {
        assert!(Currency::new("U5D").is_err());
    }

    #[test]
    fn money_rejects_negative_amount() {
        let result = Money::new(Decimal::new(-100, 2), usd());
        assert!(matches!(
            result,
            Err(ValidationError::NegativeAmount { .. })
        ));
    }

    #[test]
    fn money_accepts_zero() {
        let money = Money::new(Decimal::ZERO, usd()).unwrap();
        assert!(money.is_zero());
    }

    #[test]
    fn add_same_currency_sums_amounts() {
        let a = Money::new(Decimal::new(10_000, 2), usd()).unwrap();
        let b = Money::new(Decimal::new(5_000, 2), usd()).unwrap();

        let sum = a.checked_add(&b).unwrap();
        assert_eq!(sum.amount(), Decimal::new(15_000, 2));
    }

    #[test]
    fn add_mismatched_currency_fails() {
        let a = Money::new(Decimal::new(10_000, 2), usd()).unwrap();
        let b = Money::new(Decimal::new(5_000, 2), eur()).unwrap();

        let result = a.checked_add(&b);
        assert!(matches!(
            result,
            Err(ValidationError::CurrencyMismatch { .. })
        ));
    }

    #[test]
    fn sub_mismatched_currency_fails() {
        let a = Money::new(Decimal::new(10_000, 2), usd()).unwrap();
        let b = Money::new(Decimal::new(5_000, 2), eur()).unwrap();

        assert!(a.checked_sub(&b).is_err());
    }

    #[test]
    fn sub_below_zero_fails() {
        let a = Money::new(Decimal::new(5_000, 2), usd()).unwrap();
        let b = Money::new(Decimal::new(10_000, 2), usd()).unwrap();

        assert!(matches!(
            a.checked_sub(&b),
            Err(ValidationError::NegativeAmount { .. })
        ));
    }

    #[test]
    fn sub_to_exactly_zero_succeeds() {
        let a = Money::new(Decimal::new(5_000, 2), usd()).unwrap();
        let b = Money::new(Decimal::new(5_000, 2), usd()).unwrap();

        let result = a.checked_sub(&b).unwrap();
        assert!(result.is_zero());
    }

    #[test]
    fn money_displays_amount_and_currency() {
        let money = Money::new(Decimal::new(10_000, 2), usd()).unwrap();
        assert_eq!(format!("{}", money), "100.00 USD");
    }

    proptest! {
        #[test]
        fn any_non_negative_amount_constructs(cents in 0i64..1_000_000_000) {
            let money = Money::new(Decimal::new(cents, 2), usd());
            prop_assert!(money.is_ok());
        }

        #[test]
        fn any_negative_amount_is_rejected(cents in -1_000_000_000i64..0) {
            let money = Money::new(Decimal::new(cents, 2), usd());
            prop_assert!(money.is_err());
        }

        #[test]
        fn serde_round_trip_preserves_value(cents in 0i64..1_000_000_000) {
            let money = Money::new(Decimal::new(cents, 2), usd()).unwrap();
            let json = serde_json::to_string(&money).unwrap();
            let restored: Money = serde_json::from_str(&json).unwrap();
            prop_assert_eq!(money, restored);
        }

        #[test]
        fn valid_three_letter_codes_construct(code in "[A-Za-z]{3}") {
            let currency = Currency::new(&code);
            prop_assert!(currency.is_ok());
            let currency = currency.unwrap();
            prop_assert_eq!(currency.as_str(), code.to_ascii_uppercase());
        }
    }
}
