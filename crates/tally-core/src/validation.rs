//! # Validation Module
//!
//! Input validation for every engine operation. Runs before any storage
//! access, so a rejected request never opens a transaction.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: HTTP extractors (axum)                                       │
//! │  └── Shape and type checks (JSON deserialization)                      │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE                                                  │
//! │  ├── Quantities > 0, prices in range, non-empty item lists             │
//! │  └── Formats (SKU, coupon code), paging bounds                         │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: SQLite                                                       │
//! │  ├── CHECK (current_stock >= 0), CHECK (quantity > 0)                  │
//! │  └── UNIQUE (sku), UNIQUE (code), UNIQUE (invoice_number)              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use tally_core::validation::{validate_quantity, validate_sku};
//!
//! assert!(validate_sku("RICE-5KG").is_ok());
//! assert!(validate_quantity(0).is_err());
//! ```

use std::collections::HashSet;

use crate::error::ValidationError;
use crate::types::DiscountType;
use crate::{
    DEFAULT_PAGE_SIZE, MAX_COUPON_EXPIRY_DAYS, MAX_DOCUMENT_LINES, MAX_LINE_QUANTITY,
    MAX_PAGE_SIZE, MAX_PRICE_CENTS,
};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// String Validators
// =============================================================================

/// Validates a SKU (Stock Keeping Unit).
///
/// ## Rules
/// - Must not be empty
/// - At most 50 characters
/// - Letters, digits, hyphens and underscores only
///
/// ```rust
/// use tally_core::validation::validate_sku;
///
/// assert!(validate_sku("PRD-1A2B3C4D").is_ok());
/// assert!(validate_sku("").is_err());
/// assert!(validate_sku("has space").is_err());
/// ```
pub fn validate_sku(sku: &str) -> ValidationResult<()> {
    let sku = sku.trim();

    if sku.is_empty() {
        return Err(ValidationError::Required {
            field: "sku".to_string(),
        });
    }

    if sku.len() > 50 {
        return Err(ValidationError::TooLong {
            field: "sku".to_string(),
            max: 50,
        });
    }

    if !sku
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(ValidationError::InvalidFormat {
            field: "sku".to_string(),
            reason: "must contain only letters, numbers, hyphens, and underscores".to_string(),
        });
    }

    Ok(())
}

/// Validates a required, bounded free-text field (product name, first name).
pub fn validate_name(field: &str, value: &str, max: usize) -> ValidationResult<()> {
    let value = value.trim();

    if value.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    if value.chars().count() > max {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max,
        });
    }

    Ok(())
}

pub fn validate_product_name(name: &str) -> ValidationResult<()> {
    validate_name("name", name, 200)
}

/// Optional notes on ledger entries and purchases.
pub fn validate_notes(notes: Option<&str>) -> ValidationResult<()> {
    match notes {
        Some(n) if n.chars().count() > 500 => Err(ValidationError::TooLong {
            field: "notes".to_string(),
            max: 500,
        }),
        _ => Ok(()),
    }
}

/// Validates a non-empty identifier reference (product id, supplier id).
pub fn validate_id(field: &str, id: &str) -> ValidationResult<()> {
    if id.trim().is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }
    Ok(())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a line or movement quantity.
///
/// ## Rules
/// - Must be positive (> 0)
/// - Must not exceed MAX_LINE_QUANTITY
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    if qty > MAX_LINE_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_LINE_QUANTITY,
        });
    }

    Ok(())
}

/// Validates a catalog price in cents. Zero is allowed (free items).
///
/// ```rust
/// use tally_core::validation::validate_price_cents;
///
/// assert!(validate_price_cents("sellingPrice", 0).is_ok());
/// assert!(validate_price_cents("sellingPrice", -100).is_err());
/// assert!(validate_price_cents("sellingPrice", i64::MAX).is_err());
/// ```
pub fn validate_price_cents(field: &str, cents: i64) -> ValidationResult<()> {
    if !(0..=MAX_PRICE_CENTS).contains(&cents) {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 0,
            max: MAX_PRICE_CENTS,
        });
    }

    Ok(())
}

/// Purchase cost prices must be strictly positive and at most MAX_PRICE_CENTS.
pub fn validate_cost_price(cents: i64) -> ValidationResult<()> {
    if cents <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "costPrice".to_string(),
        });
    }
    if cents > MAX_PRICE_CENTS {
        return Err(ValidationError::OutOfRange {
            field: "costPrice".to_string(),
            min: 1,
            max: MAX_PRICE_CENTS,
        });
    }
    Ok(())
}

pub fn validate_minimum_stock_level(level: i64) -> ValidationResult<()> {
    if level < 0 {
        return Err(ValidationError::OutOfRange {
            field: "minimumStockLevel".to_string(),
            min: 0,
            max: i64::MAX,
        });
    }
    Ok(())
}

/// Validates a tax rate in basis points (0% to 100%).
pub fn validate_tax_rate_bps(bps: u32) -> ValidationResult<()> {
    if bps > 10000 {
        return Err(ValidationError::OutOfRange {
            field: "taxRate".to_string(),
            min: 0,
            max: 10000,
        });
    }

    Ok(())
}

// =============================================================================
// Coupon Validators
// =============================================================================

/// Validates a coupon discount.
///
/// - Percentage: 1..=10000 bps (0.01% to 100%)
/// - Fixed: positive amount in cents
pub fn validate_discount(discount_type: DiscountType, value: i64) -> ValidationResult<()> {
    match discount_type {
        DiscountType::Percentage if !(1..=10000).contains(&value) => {
            Err(ValidationError::OutOfRange {
                field: "discountValue".to_string(),
                min: 1,
                max: 10000,
            })
        }
        DiscountType::Fixed if value <= 0 => Err(ValidationError::MustBePositive {
            field: "discountValue".to_string(),
        }),
        _ => Ok(()),
    }
}

pub fn validate_expiry_days(days: i64) -> ValidationResult<()> {
    if !(1..=MAX_COUPON_EXPIRY_DAYS).contains(&days) {
        return Err(ValidationError::OutOfRange {
            field: "expiryDays".to_string(),
            min: 1,
            max: MAX_COUPON_EXPIRY_DAYS,
        });
    }
    Ok(())
}

// =============================================================================
// Collection Validators
// =============================================================================

/// Validates the line list of a sale or purchase.
///
/// ## Rules
/// - At least one line, at most MAX_DOCUMENT_LINES
/// - Every product id non-empty and listed once
pub fn validate_lines<'a, I>(product_ids: I) -> ValidationResult<()>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut seen = HashSet::new();

    for id in product_ids {
        validate_id("productId", id)?;
        if !seen.insert(id) {
            return Err(ValidationError::Duplicate {
                field: "items".to_string(),
                value: id.to_string(),
            });
        }
    }

    if seen.is_empty() {
        return Err(ValidationError::Required {
            field: "items".to_string(),
        });
    }

    if seen.len() > MAX_DOCUMENT_LINES {
        return Err(ValidationError::OutOfRange {
            field: "items".to_string(),
            min: 1,
            max: MAX_DOCUMENT_LINES as i64,
        });
    }

    Ok(())
}

/// Normalizes paging input to `(page, page_size)`.
///
/// `None` falls back to page 1 and DEFAULT_PAGE_SIZE; explicit values
/// outside the allowed range are rejected.
pub fn validate_page(page: Option<u32>, page_size: Option<u32>) -> ValidationResult<(u32, u32)> {
    let page = page.unwrap_or(1);
    let page_size = page_size.unwrap_or(DEFAULT_PAGE_SIZE);

    if page == 0 {
        return Err(ValidationError::OutOfRange {
            field: "page".to_string(),
            min: 1,
            max: u32::MAX as i64,
        });
    }

    if page_size == 0 || page_size > MAX_PAGE_SIZE {
        return Err(ValidationError::OutOfRange {
            field: "pageSize".to_string(),
            min: 1,
            max: MAX_PAGE_SIZE as i64,
        });
    }

    Ok((page, page_size))
}

// =============================================================================
// Unit Tests
// =============================================================================
