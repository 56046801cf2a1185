//! # Money Module
//!
//! Provides the `Money` type for handling rupiah amounts safely.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │  In JavaScript/floating point:                                          │
//! │    0.1 + 0.2 = 0.30000000000000004  ❌ WRONG!                           │
//! │                                                                         │
//! │  OUR SOLUTION: Integer Rupiah                                           │
//! │    Rp10.000 split over 3 lines = 3.333 each (×3 = 9.999)               │
//! │    We KNOW we lost Rp1, and report it explicitly                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use kasir_core::money::Money;
//!
//! let price = Money::from_rupiah(12_500);
//! let line = price * 3;
//! assert_eq!(line.rupiah(), 37_500);
//! assert_eq!(line.to_string(), "Rp37.500");
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul, Sub, SubAssign};
use ts_rs::TS;

// =============================================================================
// Money Type
// =============================================================================

/// A monetary value in whole rupiah (the smallest unit in use).
///
/// ## Design Decisions
/// - **i64 (signed)**: Allows negative values for refunds and cash out
/// - **Single field tuple struct**: Zero-cost abstraction over i64
///
/// ## Where Money is Used
/// ```text
/// Product.retail_price ──► CartItem.unit_price ──► line subtotal
///                                                      │
///                           points discount ◄──────────┤
///                                                      ▼
///                        Transaction.total ──► CashEntry (masuk)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from rupiah.
    #[inline]
    pub const fn from_rupiah(rupiah: i64) -> Self {
        Money(rupiah)
    }

    /// Returns the value in rupiah.
    #[inline]
    pub const fn rupiah(&self) -> i64 {
        self.0
    }

    /// Returns zero money value.
    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    /// Checks if the value is zero.
    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Checks if the value is positive (greater than zero).
    #[inline]
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    /// Checks if the value is negative (less than zero).
    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Returns the absolute value.
    #[inline]
    pub const fn abs(&self) -> Self {
        Money(self.0.abs())
    }

    /// Multiplies money by a quantity, saturating at the `i64` bounds.
    ///
    /// Display-side helper (cart preview, stock value). Checkout uses
    /// [`Money::checked_mul`] and rejects an overflow instead.
    ///
    /// ## Example
    /// ```rust
    /// use kasir_core::money::Money;
    ///
    /// let unit_price = Money::from_rupiah(4_500);
    /// assert_eq!(unit_price.multiply_quantity(3).rupiah(), 13_500);
    /// ```
    #[inline]
    pub const fn multiply_quantity(&self, qty: i64) -> Self {
        Money(self.0.saturating_mul(qty))
    }

    /// Multiplies by a quantity, `None` on overflow.
    ///
    /// ## Example
    /// ```rust
    /// use kasir_core::money::Money;
    ///
    /// assert_eq!(Money::from_rupiah(4_500).checked_mul(3), Some(Money::from_rupiah(13_500)));
    /// assert_eq!(Money::from_rupiah(i64::MAX).checked_mul(2), None);
    /// ```
    #[inline]
    pub const fn checked_mul(&self, qty: i64) -> Option<Self> {
        match self.0.checked_mul(qty) {
            Some(value) => Some(Money(value)),
            None => None,
        }
    }

    /// Adds two amounts, `None` on overflow.
    #[inline]
    pub const fn checked_add(&self, other: Money) -> Option<Self> {
        match self.0.checked_add(other.0) {
            Some(value) => Some(Money(value)),
            None => None,
        }
    }

    /// Sums amounts, `None` if any partial sum overflows.
    pub fn checked_sum<'a, I: IntoIterator<Item = &'a Money>>(amounts: I) -> Option<Money> {
        amounts
            .into_iter()
            .try_fold(Money::zero(), |acc, m| acc.checked_add(*m))
    }

    /// Returns `self × numerator / denominator`, rounded toward zero.
    ///
    /// Used for proportional splits (points per line, partial refunds).
    /// Intermediate math is done in i128 so large orders cannot overflow.
    /// A zero denominator yields zero.
    ///
    /// ## Example
    /// ```rust
    /// use kasir_core::money::Money;
    ///
    /// let total = Money::from_rupiah(10_000);
    /// assert_eq!(total.proportion(1, 3).rupiah(), 3_333);
    /// ```
    pub fn proportion(&self, numerator: i64, denominator: i64) -> Money {
        if denominator == 0 {
            return Money::zero();
        }
        let value = self.0 as i128 * numerator as i128 / denominator as i128;
        Money(value as i64)
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Formats as `Rp12.500` (dot thousands separator, as printed on receipts).
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let digits = self.0.unsigned_abs().to_string();

        let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
        for (i, ch) in digits.chars().enumerate() {
            if i > 0 && (digits.len() - i) % 3 == 0 {
                grouped.push('.');
            }
            grouped.push(ch);
        }

        write!(f, "{}Rp{}", sign, grouped)
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

impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}

impl Sub for Money {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Money(self.0 - other.0)
    }
}

impl SubAssign for Money {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        self.0 -= other.0;
    }
}

impl Mul<i64> for Money {
    type Output = Self;

    #[inline]
    fn mul(self, qty: i64) -> Self {
        Money(self.0 * qty)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), |acc, m| acc + m)
    }
}

impl<'a> Sum<&'a Money> for Money {
    fn sum<I: Iterator<Item = &'a Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), |acc, m| acc + *m)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
