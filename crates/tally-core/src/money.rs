//! # Money Module
//!
//! Provides the `Money` type for monetary values and the `Rate` type for
//! percentages (tax, coupon discounts).
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │    0.1 + 0.2 = 0.30000000000000004  ❌                                  │
//! │                                                                         │
//! │  A sale total that drifts by a fraction of a cent eventually breaks    │
//! │  loyalty point boundaries (1 point per 100.00) and invoice audits.     │
//! │                                                                         │
//! │  OUR SOLUTION: Integer minor units                                      │
//! │    1100.00 is stored as 110000 cents. Every rounding step is explicit. │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use tally_core::money::{Money, Rate};
//!
//! let subtotal = Money::from_cents(100_000); // 1000.00
//! let tax = subtotal.percentage(Rate::from_bps(1000)); // 10%
//! assert_eq!(tax.cents(), 10_000); // 100.00
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul, Sub, SubAssign};
use ts_rs::TS;

// =============================================================================
// Rate
// =============================================================================

/// A percentage represented in basis points (bps).
///
/// 1 basis point = 0.01%, so 1000 bps = 10% and 500 bps = 5%.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Rate(u32);

impl Rate {
    /// Creates a rate from basis points.
    #[inline]
    pub const fn from_bps(bps: u32) -> Self {
        Rate(bps)
    }

    /// Creates a rate from whole percent (5 → 5%).
    #[inline]
    pub const fn from_percent(pct: u32) -> Self {
        Rate(pct * 100)
    }

    /// Creates a rate from a fractional percentage (7.5 → 750 bps).
    ///
    /// Only used at the edges (HTTP input); core arithmetic never sees floats.
    pub fn from_percentage(pct: f64) -> Self {
        Rate((pct * 100.0).round().max(0.0) as u32)
    }

    /// Returns the rate in basis points.
    #[inline]
    pub const fn bps(&self) -> u32 {
        self.0
    }

    /// Returns the rate as a percentage (for display only).
    #[inline]
    pub fn percentage(&self) -> f64 {
        self.0 as f64 / 100.0
    }

    #[inline]
    pub const fn zero() -> Self {
        Rate(0)
    }

    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

impl Default for Rate {
    fn default() -> Self {
        Rate::zero()
    }
}

// =============================================================================
// Money Type
// =============================================================================

/// A monetary value in the smallest currency unit (cents).
///
/// ## Design Decisions
/// - **i64 (signed)**: deltas between two totals can be negative
/// - **Single field tuple struct**: zero-cost abstraction over i64
///
/// ## Where Money Flows
/// ```text
/// Product.selling_price_cents ──► SaleItem.unit_price ──► SaleItem.line_total
///                                                              │
/// Sale.subtotal ──► tax (10%) ──► coupon discount ──► Sale.grand_total
///                                                              │
///                                         LoyaltyAccrual (1 pt / 100.00)
/// ```
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize, TS,
)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from cents (the smallest currency unit).
    ///
    /// ```rust
    /// use tally_core::money::Money;
    ///
    /// let price = Money::from_cents(1099);
    /// assert_eq!(price.cents(), 1099);
    /// ```
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Creates a Money value from whole currency units.
    ///
    /// ```rust
    /// use tally_core::money::Money;
    ///
    /// assert_eq!(Money::from_units(7000).cents(), 700_000);
    /// ```
    #[inline]
    pub const fn from_units(units: i64) -> Self {
        Money(units * 100)
    }

    /// Converts a decimal amount given at the edge (HTTP input) to cents,
    /// rounding half away from zero.
    pub fn from_decimal(amount: f64) -> Self {
        Money((amount * 100.0).round() as i64)
    }

    /// Returns the value in cents.
    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// Returns the whole-unit portion.
    #[inline]
    pub const fn units(&self) -> i64 {
        self.0 / 100
    }

    /// Returns the minor-unit portion (always 0-99).
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

    #[inline]
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Returns `rate` of this amount, rounded half up to the nearest cent.
    ///
    /// ## Implementation
    /// Integer math: `(amount * bps + 5000) / 10000`. The +5000 provides
    /// the rounding (5000/10000 = 0.5), which matches `round(x, 2)` on the
    /// decimal amount for non-negative values.
    ///
    /// ```rust
    /// use tally_core::money::{Money, Rate};
    ///
    /// // 10.00 × 8.25% = 0.825 → 0.83
    /// let tax = Money::from_cents(1000).percentage(Rate::from_bps(825));
    /// assert_eq!(tax.cents(), 83);
    /// ```
    pub fn percentage(&self, rate: Rate) -> Money {
        // i128 prevents overflow on large amounts
        let cents = (self.0 as i128 * rate.bps() as i128 + 5000) / 10000;
        Money::from_cents(cents as i64)
    }

    /// Multiplies a unit price by a quantity; `None` on overflow.
    ///
    /// ```rust
    /// use tally_core::money::Money;
    ///
    /// assert_eq!(Money::from_cents(299).checked_multiply_quantity(3), Some(Money::from_cents(897)));
    /// assert_eq!(Money::from_cents(i64::MAX / 2).checked_multiply_quantity(3), None);
    /// ```
    #[inline]
    pub const fn checked_multiply_quantity(&self, qty: i64) -> Option<Self> {
        match self.0.checked_mul(qty) {
            Some(cents) => Some(Money(cents)),
            None => None,
        }
    }

    /// `None` on overflow.
    #[inline]
    pub const fn checked_add(self, other: Money) -> Option<Self> {
        match self.0.checked_add(other.0) {
            Some(cents) => Some(Money(cents)),
            None => None,
        }
    }

    /// Sums amounts; `None` as soon as the running total overflows.
    pub fn checked_sum<I>(amounts: I) -> Option<Money>
    where
        I: IntoIterator<Item = Money>,
    {
        amounts
            .into_iter()
            .try_fold(Money::zero(), |acc, m| acc.checked_add(m))
    }

    /// Returns the smaller of two amounts.
    #[inline]
    pub fn min(self, other: Money) -> Money {
        if self.0 <= other.0 {
            self
        } else {
            other
        }
    }

    /// Clamps negative amounts to zero.
    #[inline]
    pub fn non_negative(self) -> Money {
        Money(self.0.max(0))
    }

    /// How many whole `block`s fit into this amount (floor division).
    ///
    /// Used for loyalty accrual: 1 point per 100.00 spent.
    ///
    /// ```rust
    /// use tally_core::money::Money;
    ///
    /// let total = Money::from_cents(705_050); // 7050.50
    /// assert_eq!(total.whole_blocks_of(Money::from_units(100)), 70);
    /// ```
    pub fn whole_blocks_of(&self, block: Money) -> i64 {
        if block.0 <= 0 || self.0 <= 0 {
            return 0;
        }
        self.0 / block.0
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Shows money as `1234.56`; currency symbols are the client's job.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(f, "{}{}.{:02}", sign, self.units().abs(), self.cents_part())
    }
}

// Operators saturate at the i64 bounds. Document totals are computed with the
// checked methods (see `pricing`), which turn overflow into a validation error.

impl Add for Money {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Money(self.0.saturating_add(other.0))
    }
}

impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 = self.0.saturating_add(other.0);
    }
}

impl Sub for Money {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Money(self.0.saturating_sub(other.0))
    }
}

impl SubAssign for Money {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        self.0 = self.0.saturating_sub(other.0);
    }
}

impl Mul<i64> for Money {
    type Output = Self;

    #[inline]
    fn mul(self, qty: i64) -> Self {
        Money(self.0.saturating_mul(qty))
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), |acc, m| acc + m)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_cents_and_units() {
        let money = Money::from_cents(1099);
        assert_eq!(money.cents(), 1099);
        assert_eq!(money.units(), 10);
        assert_eq!(money.cents_part(), 99);
        assert_eq!(Money::from_units(12).cents(), 1200);
    }

    #[test]
    fn test_from_decimal_rounds() {
        assert_eq!(Money::from_decimal(12.5).cents(), 1250);
        assert_eq!(Money::from_decimal(0.25).cents(), 25);
        assert_eq!(Money::from_decimal(500.0).cents(), 50_000);
    }

    #[test]
    fn test_display() {
        assert_eq!(Money::from_cents(110_000).to_string(), "1100.00");
        assert_eq!(Money::from_cents(5).to_string(), "0.05");
        assert_eq!(Money::from_cents(-550).to_string(), "-5.50");
    }

    #[test]
    fn test_arithmetic_and_sum() {
        let a = Money::from_cents(1000);
        let b = Money::from_cents(500);
        assert_eq!((a + b).cents(), 1500);
        assert_eq!((a - b).cents(), 500);
        assert_eq!((a * 3).cents(), 3000);

        let total: Money = vec![a, b, b].into_iter().sum();
        assert_eq!(total.cents(), 2000);
    }

    #[test]
    fn test_operators_saturate() {
        let big = Money::from_cents(i64::MAX - 1);
        assert_eq!((big + Money::from_cents(10)).cents(), i64::MAX);
        assert_eq!((Money::from_cents(i64::MIN) - Money::from_cents(1)).cents(), i64::MIN);
        assert_eq!((big * 2).cents(), i64::MAX);
    }

    #[test]
    fn test_checked_arithmetic() {
        let price = Money::from_cents(299);
        assert_eq!(price.checked_multiply_quantity(3), Some(Money::from_cents(897)));
        assert_eq!(Money::from_cents(i64::MAX / 2).checked_multiply_quantity(3), None);
        assert_eq!(Money::from_cents(i64::MAX).checked_add(Money::from_cents(1)), None);

        let amounts = [Money::from_cents(i64::MAX - 5), Money::from_cents(5)];
        assert_eq!(Money::checked_sum(amounts), Some(Money::from_cents(i64::MAX)));
        let amounts = [Money::from_cents(i64::MAX - 5), Money::from_cents(6)];
        assert_eq!(Money::checked_sum(amounts), None);
    }

    #[test]
    fn test_ten_percent_tax() {
        // subtotal 1000.00 → tax 100.00
        let tax = Money::from_cents(100_000).percentage(Rate::from_bps(1000));
        assert_eq!(tax.cents(), 10_000);
    }

    #[test]
    fn test_percentage_rounds_half_up() {
        // 0.05 × 10% = 0.005 → 0.01
        assert_eq!(Money::from_cents(5).percentage(Rate::from_bps(1000)).cents(), 1);
        // 0.04 × 10% = 0.004 → 0.00
        assert_eq!(Money::from_cents(4).percentage(Rate::from_bps(1000)).cents(), 0);
    }

    #[test]
    fn test_min_and_non_negative() {
        let a = Money::from_cents(300);
        let b = Money::from_cents(500);
        assert_eq!(a.min(b), a);
        assert_eq!(b.min(a), a);
        assert_eq!(Money::from_cents(-1).non_negative(), Money::zero());
    }

    #[test]
    fn test_whole_blocks() {
        let hundred = Money::from_units(100);
        assert_eq!(Money::from_units(7000).whole_blocks_of(hundred), 70);
        assert_eq!(Money::from_cents(9_999).whole_blocks_of(hundred), 0);
        assert_eq!(Money::from_cents(-50_000).whole_blocks_of(hundred), 0);
        assert_eq!(Money::from_units(100).whole_blocks_of(Money::zero()), 0);
    }

    #[test]
    fn test_rate_constructors() {
        assert_eq!(Rate::from_percent(5).bps(), 500);
        assert_eq!(Rate::from_percentage(7.5).bps(), 750);
        assert_eq!(Rate::from_percentage(-3.0).bps(), 0);
        assert!((Rate::from_bps(825).percentage() - 8.25).abs() < 0.001);
    }
}
