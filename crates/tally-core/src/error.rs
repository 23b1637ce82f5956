//! # Error Types
//!
//! Domain-specific error types for tally-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  tally-core errors (this file)                                         │
//! │  ├── CoreError        - Business rule violations                       │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  tally-db errors                                                       │
//! │  └── DbError          - Storage failures                               │
//! │                                                                         │
//! │  tally-ledger errors                                                   │
//! │  └── LedgerError      - Core | Db | ConcurrencyConflict                │
//! │                                                                         │
//! │  tally-api errors                                                      │
//! │  └── ApiError         - What the browser sees (code + message)         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::Serialize;
use thiserror::Error;
use ts_rs::TS;

// =============================================================================
// Stock Shortfall
// =============================================================================

/// One product that cannot cover a requested stock-out.
///
/// Listed in `OutOfStock` (sales) and `ReversalConflict` (purchase reversal)
/// so the caller sees every offending line, not just the first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct StockShortfall {
    pub product_id: String,
    pub product_name: String,
    pub available: i64,
    pub requested: i64,
}

// =============================================================================
// Core Error
// =============================================================================

/// Business rule violations.
///
/// Every variant maps to a terse categorical message; nothing here carries
/// storage details.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Input rejected before touching storage.
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// A stock-out delta would drive a product below zero.
    ///
    /// ```text
    /// current_stock = 3, delta = -5
    ///      │
    ///      ▼
    /// InsufficientStock { available: 3, requested: 5 }
    ///      │
    ///      ▼
    /// whole batch rejected, nothing written
    /// ```
    #[error("Insufficient stock for {product_id}: available {available}, requested {requested}")]
    InsufficientStock {
        product_id: String,
        available: i64,
        requested: i64,
    },

    /// A sale asked for more than is on hand for one or more lines.
    #[error("Out of stock: {} item(s) cannot be fulfilled", shortfalls.len())]
    OutOfStock { shortfalls: Vec<StockShortfall> },

    /// The coupon exists but cannot be applied to this sale.
    #[error("Invalid coupon {code}: {reason}")]
    InvalidCoupon { code: String, reason: String },

    #[error("Coupon not found: {0}")]
    CouponNotFound(String),

    #[error("Coupon expired: {0}")]
    CouponExpired(String),

    #[error("Coupon already used: {0}")]
    CouponAlreadyUsed(String),

    /// Undoing a purchase would drive stock negative because units were
    /// already sold since it was received.
    #[error("Purchase {purchase_id} cannot be reversed: stock already consumed")]
    ReversalConflict {
        purchase_id: String,
        shortfalls: Vec<StockShortfall>,
    },

    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// The product is deactivated and cannot take part in new documents.
    #[error("Product {0} is inactive")]
    ProductInactive(String),

    /// Document is not in a state that allows the operation.
    #[error("{entity} {id} is {status}, cannot perform operation")]
    InvalidStatus {
        entity: String,
        id: String,
        status: String,
    },

    /// The acting role may not perform this operation.
    #[error("Role {role} is not allowed to {action}")]
    Forbidden { role: String, action: String },
}

impl CoreError {
    /// Creates a NotFound error for a given entity type and ID.
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        CoreError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    pub fn invalid_coupon(code: impl Into<String>, reason: impl Into<String>) -> Self {
        CoreError::InvalidCoupon {
            code: code.into(),
            reason: reason.into(),
        }
    }

    /// True for the coupon family (`InvalidCoupon`, `CouponNotFound`, ...).
    pub fn is_coupon_error(&self) -> bool {
        matches!(
            self,
            CoreError::InvalidCoupon { .. }
                | CoreError::CouponNotFound(_)
                | CoreError::CouponExpired(_)
                | CoreError::CouponAlreadyUsed(_)
        )
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Invalid format (e.g., malformed coupon code, bad SKU characters).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// The same product appears on two lines of one document.
    #[error("{field} contains duplicate product {value}")]
    Duplicate { field: String, value: String },

    /// A unique business key (SKU) is already taken.
    #[error("{field} '{value}' already exists")]
    AlreadyExists { field: String, value: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================
