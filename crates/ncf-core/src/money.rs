//! # Money Module
//!
//! Provides the `Money` type for Dominican peso amounts.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │  In floating point:                                                     │
//! │    0.1 + 0.2 = 0.30000000000000004  ❌ WRONG!                           │
//! │                                                                         │
//! │  An ITBIS total summed from float line taxes drifts by fractions of a  │
//! │  centavo and no longer matches the printed receipt.                     │
//! │                                                                         │
//! │  OUR SOLUTION: Integer centavos                                         │
//! │    RD$100.00 = 10000 centavos, 18% tax = 1800 centavos                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use ncf_core::money::Money;
//!
//! let subtotal = Money::from_cents(10000); // RD$100.00
//! let total = subtotal + Money::from_cents(1800);
//! assert_eq!(total.cents(), 11800);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::Add;
use ts_rs::TS;

use crate::types::TaxRate;

// =============================================================================
// Money Type
// =============================================================================

/// A monetary value in centavos (the smallest peso unit).
///
/// - **i64 (signed)**: refunds (`out_refund`) carry negative amounts
/// - **Single field tuple struct**: zero-cost abstraction over i64
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from centavos.
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Creates a Money value from whole pesos.
    ///
    /// ## Example
    /// ```rust
    /// use ncf_core::money::Money;
    ///
    /// assert_eq!(Money::from_pesos(200).cents(), 20000);
    /// ```
    #[inline]
    pub const fn from_pesos(pesos: i64) -> Self {
        Money(pesos * 100)
    }

    /// Returns the value in centavos.
    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// Returns the whole pesos portion.
    #[inline]
    pub const fn pesos(&self) -> i64 {
        self.0 / 100
    }

    /// Returns the centavos portion (always 0-99).
    #[inline]
    pub const fn cents_part(&self) -> i64 {
        (self.0 % 100).abs()
    }

    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// A POS order with a positive total needs an NCF.
    #[inline]
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    /// Calculates tax at the given rate, rounding half away from zero
    /// to the nearest centavo.
    ///
    /// ## Implementation
    /// Integer math on basis points: `(amount * bps ± 5000) / 10000`.
    ///
    /// ## Example
    /// ```rust
    /// use ncf_core::money::Money;
    /// use ncf_core::types::TaxRate;
    ///
    /// let subtotal = Money::from_pesos(100);
    /// let itbis = subtotal.calculate_tax(TaxRate::from_bps(1800));
    /// assert_eq!(itbis.cents(), 1800); // RD$18.00
    /// ```
    pub fn calculate_tax(&self, rate: TaxRate) -> Money {
        // i128 prevents overflow on large amounts
        let product = self.0 as i128 * rate.bps() as i128;
        let half = if product < 0 { -5000 } else { 5000 };
        Money::from_cents(((product + half) / 10000) as i64)
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Shows money as `RD$1234.50` (no thousands grouping).
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(
            f,
            "{}RD${}.{:02}",
            sign,
            self.pesos().abs(),
            self.cents_part()
        )
    }
}

impl Default for Money {
    fn default() -> Self {
        Money::zero()
    }
}

impl Add for Money {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Money(self.0 + other.0)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), Add::add)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_cents_and_pesos() {
        let money = Money::from_cents(1099);
        assert_eq!(money.cents(), 1099);
        assert_eq!(money.pesos(), 10);
        assert_eq!(money.cents_part(), 99);

        assert_eq!(Money::from_pesos(50).cents(), 5000);
    }

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", Money::from_cents(1099)), "RD$10.99");
        assert_eq!(format!("{}", Money::from_cents(500)), "RD$5.00");
        assert_eq!(format!("{}", Money::from_cents(-550)), "-RD$5.50");
        assert_eq!(format!("{}", Money::zero()), "RD$0.00");
    }

    #[test]
    fn test_arithmetic_and_sum() {
        let a = Money::from_cents(1000);
        let b = Money::from_cents(500);

        assert_eq!((a + b).cents(), 1500);

        let total: Money = vec![a, b, b].into_iter().sum();
        assert_eq!(total.cents(), 2000);
    }

    #[test]
    fn test_itbis_standard_rate() {
        let tax = Money::from_pesos(200).calculate_tax(TaxRate::from_bps(1800));
        assert_eq!(tax.cents(), 3600);
    }

    #[test]
    fn test_tax_rounding() {
        // RD$10.99 at 18% = 1.9782 → RD$1.98
        let tax = Money::from_cents(1099).calculate_tax(TaxRate::from_bps(1800));
        assert_eq!(tax.cents(), 198);

        // Refund lines round symmetrically
        let tax = Money::from_cents(-1099).calculate_tax(TaxRate::from_bps(1800));
        assert_eq!(tax.cents(), -198);
    }
}
