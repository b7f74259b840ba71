// crates/canteen-core/src/core/money.rs
// ============================================================================
// Module: Canteen Money
// Description: Fixed-point currency amounts in paise.
// Purpose: Keep prices and totals exact while speaking rupees on the wire.
// Dependencies: serde, thiserror
// ============================================================================

//! ## Overview
//! [`Money`] stores an amount as integer paise (1/100 rupee), which is also the
//! unit Razorpay expects. JSON carries rupees as a decimal number; inputs are
//! rounded to the nearest paisa and must be finite and non-negative.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Paise per rupee.
const PAISE_PER_RUPEE: i64 = 100;
/// Largest rupee amount accepted from input (keeps paise well inside `i64`).
const MAX_RUPEES: f64 = 1.0e12;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Money parsing and arithmetic errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MoneyError {
    /// Amount was NaN or infinite.
    #[error("amount must be a finite number")]
    NotFinite,
    /// Amount was below zero.
    #[error("amount must not be negative")]
    Negative,
    /// Amount exceeded the supported range.
    #[error("amount is out of range")]
    Overflow,
}

// ============================================================================
// SECTION: Types
// ============================================================================

/// Non-negative currency amount in paise.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct Money(i64);

impl Money {
    /// Zero amount.
    pub const ZERO: Self = Self(0);

    /// Creates an amount from paise.
    ///
    /// # Errors
    ///
    /// Returns [`MoneyError::Negative`] when `paise` is below zero.
    pub const fn from_paise(paise: i64) -> Result<Self, MoneyError> {
        if paise < 0 {
            return Err(MoneyError::Negative);
        }
        Ok(Self(paise))
    }

    /// Creates an amount from a rupee value, rounding to the nearest paisa.
    ///
    /// # Errors
    ///
    /// Returns [`MoneyError`] when the value is not finite, negative, or too
    /// large.
    pub fn from_rupees(rupees: f64) -> Result<Self, MoneyError> {
        if !rupees.is_finite() {
            return Err(MoneyError::NotFinite);
        }
        if rupees < 0.0 {
            return Err(MoneyError::Negative);
        }
        if rupees > MAX_RUPEES {
            return Err(MoneyError::Overflow);
        }
        #[allow(
            clippy::cast_possible_truncation,
            reason = "Value is finite, non-negative, and bounded by MAX_RUPEES."
        )]
        let paise = (rupees * 100.0).round() as i64;
        Ok(Self(paise))
    }

    /// Returns the amount in paise.
    #[must_use]
    pub const fn paise(self) -> i64 {
        self.0
    }

    /// Returns the amount in rupees.
    #[must_use]
    #[allow(clippy::cast_precision_loss, reason = "Amounts are bounded well below 2^53 paise.")]
    pub fn rupees(self) -> f64 {
        self.0 as f64 / 100.0
    }

    /// Adds two amounts.
    ///
    /// # Errors
    ///
    /// Returns [`MoneyError::Overflow`] on overflow.
    pub const fn checked_add(self, other: Self) -> Result<Self, MoneyError> {
        match self.0.checked_add(other.0) {
            Some(value) => Ok(Self(value)),
            None => Err(MoneyError::Overflow),
        }
    }

    /// Multiplies an amount by a line quantity.
    ///
    /// # Errors
    ///
    /// Returns [`MoneyError::Overflow`] on overflow.
    pub fn checked_mul(self, quantity: u32) -> Result<Self, MoneyError> {
        self.0.checked_mul(i64::from(quantity)).map(Self).ok_or(MoneyError::Overflow)
    }

    /// Sums amounts.
    ///
    /// # Errors
    ///
    /// Returns [`MoneyError::Overflow`] on overflow.
    pub fn checked_sum(amounts: impl IntoIterator<Item = Self>) -> Result<Self, MoneyError> {
        amounts.into_iter().try_fold(Self::ZERO, Self::checked_add)
    }
}

impl TryFrom<f64> for Money {
    type Error = MoneyError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        Self::from_rupees(value)
    }
}

impl From<Money> for f64 {
    fn from(value: Money) -> Self {
        value.rupees()
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02}", self.0 / PAISE_PER_RUPEE, self.0 % PAISE_PER_RUPEE)
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::float_cmp, reason = "Test-only assertions.")]

    use proptest::prelude::*;

    use super::*;

    #[test]
    fn rupees_round_to_nearest_paisa() {
        assert_eq!(Money::from_rupees(12.345).unwrap().paise(), 1235);
        assert_eq!(Money::from_rupees(0.1 + 0.2).unwrap().paise(), 30);
        assert_eq!(Money::from_rupees(99.0).unwrap().paise(), 9900);
    }

    #[test]
    fn rejects_negative_and_non_finite_amounts() {
        assert_eq!(Money::from_rupees(-0.5), Err(MoneyError::Negative));
        assert_eq!(Money::from_rupees(f64::NAN), Err(MoneyError::NotFinite));
        assert_eq!(Money::from_rupees(f64::INFINITY), Err(MoneyError::NotFinite));
        assert_eq!(Money::from_paise(-1), Err(MoneyError::Negative));
    }

    #[test]
    fn serializes_as_rupee_number() {
        let amount = Money::from_paise(12_050).unwrap();
        assert_eq!(serde_json::to_string(&amount).unwrap(), "120.5");
        let parsed: Money = serde_json::from_str("45.25").unwrap();
        assert_eq!(parsed.paise(), 4525);
        assert!(serde_json::from_str::<Money>("-3").is_err());
    }

    #[test]
    fn arithmetic_is_checked() {
        let price = Money::from_paise(2_500).unwrap();
        assert_eq!(price.checked_mul(3).unwrap().paise(), 7_500);
        let total = Money::checked_sum([price, price]).unwrap();
        assert_eq!(total.paise(), 5_000);
        assert_eq!(Money::from_paise(i64::MAX).unwrap().checked_mul(2), Err(MoneyError::Overflow));
        assert_eq!(total.to_string(), "50.00");
    }

    proptest! {
        #[test]
        fn paise_survive_json(paise in 0_i64 .. 10_000_000_000) {
            let amount = Money::from_paise(paise).unwrap();
            let json = serde_json::to_string(&amount).unwrap();
            let parsed: Money = serde_json::from_str(&json).unwrap();
            prop_assert_eq!(parsed, amount);
        }
    }
}
