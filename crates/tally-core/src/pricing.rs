//! # Pricing
//!
//! Sale totals: subtotal, tax, coupon discount, grand total.
//!
//! ```text
//! lines ──► subtotal = Σ(quantity × unit_price)   (≤ MAX_DOCUMENT_TOTAL_CENTS)
//!               │
//!               ▼
//!           tax = round_half_up(subtotal × tax_rate)
//!               │
//!               ▼
//!           gross = subtotal + tax
//!               │
//!               ▼
//!           discount = clamp(coupon(gross), 0, gross)
//!               │
//!               ▼
//!           grand_total = gross − discount   (never negative)
//! ```

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::ValidationError;
use crate::money::{Money, Rate};
use crate::validation::ValidationResult;
use crate::{DEFAULT_TAX_RATE_BPS, MAX_DOCUMENT_TOTAL_CENTS};

/// A coupon's effect on a sale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
#[ts(export)]
pub enum Discount {
    Percentage(Rate),
    Fixed(Money),
}

impl Discount {
    /// Amount taken off `gross`, clamped to `[0, gross]`.
    ///
    /// ```rust
    /// use tally_core::money::Money;
    /// use tally_core::pricing::Discount;
    ///
    /// let off = Discount::Fixed(Money::from_units(500)).amount_off(Money::from_units(300));
    /// assert_eq!(off, Money::from_units(300));
    /// ```
    pub fn amount_off(&self, gross: Money) -> Money {
        let raw = match self {
            Discount::Percentage(rate) => gross.percentage(*rate),
            Discount::Fixed(amount) => *amount,
        };
        raw.non_negative().min(gross.non_negative())
    }
}

/// Computed money fields of a sale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct SaleTotals {
    pub subtotal: Money,
    pub tax: Money,
    pub discount: Money,
    pub grand_total: Money,
}

/// Tax policy for sales.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PricingPolicy {
    pub tax_rate: Rate,
}

impl Default for PricingPolicy {
    fn default() -> Self {
        PricingPolicy {
            tax_rate: Rate::from_bps(DEFAULT_TAX_RATE_BPS),
        }
    }
}

impl PricingPolicy {
    pub fn new(tax_rate: Rate) -> Self {
        PricingPolicy { tax_rate }
    }

    /// Subtotal of `(unit_price, quantity)` lines.
    pub fn subtotal<I>(&self, lines: I) -> ValidationResult<Money>
    where
        I: IntoIterator<Item = (Money, i64)>,
    {
        let mut subtotal = Money::zero();
        for (price, qty) in lines {
            subtotal = subtotal
                .checked_add(line_total(price, qty)?)
                .ok_or_else(|| total_out_of_range("subtotal"))?;
        }
        document_total("subtotal", subtotal)
    }

    /// Totals for a subtotal with an optional coupon discount.
    ///
    /// ```rust
    /// use tally_core::money::Money;
    /// use tally_core::pricing::PricingPolicy;
    ///
    /// let totals = PricingPolicy::default().totals(Money::from_units(1000), None);
    /// assert_eq!(totals.tax, Money::from_units(100));
    /// assert_eq!(totals.grand_total, Money::from_units(1100));
    /// ```
    pub fn totals(&self, subtotal: Money, discount: Option<Discount>) -> SaleTotals {
        let tax = subtotal.percentage(self.tax_rate);
        let gross = subtotal + tax;
        let discount = discount
            .map(|d| d.amount_off(gross))
            .unwrap_or_else(Money::zero);
        SaleTotals {
            subtotal,
            tax,
            discount,
            grand_total: (gross - discount).non_negative(),
        }
    }

    /// Totals for an edited sale: keeps the discount amount already granted,
    /// clamped to the new gross so the total never goes negative.
    pub fn totals_with_fixed_discount(&self, subtotal: Money, discount: Money) -> SaleTotals {
        self.totals(subtotal, Some(Discount::Fixed(discount)))
    }
}

/// `unit_price × quantity`, or a validation error when it leaves the
/// document range.
///
/// ```rust
/// use tally_core::money::Money;
/// use tally_core::pricing::line_total;
///
/// assert_eq!(line_total(Money::from_cents(299), 3).unwrap(), Money::from_cents(897));
/// assert!(line_total(Money::from_cents(i64::MAX / 2), 3).is_err());
/// ```
pub fn line_total(unit_price: Money, quantity: i64) -> ValidationResult<Money> {
    let total = unit_price
        .checked_multiply_quantity(quantity)
        .ok_or_else(|| total_out_of_range("lineTotal"))?;
    document_total("lineTotal", total)
}

/// Sum of already computed amounts (purchase totals), bounded like a subtotal.
pub fn document_sum<I>(field: &str, amounts: I) -> ValidationResult<Money>
where
    I: IntoIterator<Item = Money>,
{
    let total = Money::checked_sum(amounts).ok_or_else(|| total_out_of_range(field))?;
    document_total(field, total)
}

fn document_total(field: &str, total: Money) -> ValidationResult<Money> {
    if (0..=MAX_DOCUMENT_TOTAL_CENTS).contains(&total.cents()) {
        Ok(total)
    } else {
        Err(total_out_of_range(field))
    }
}

fn total_out_of_range(field: &str) -> ValidationError {
    ValidationError::OutOfRange {
        field: field.to_string(),
        min: 0,
        max: MAX_DOCUMENT_TOTAL_CENTS,
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
