//! # tally-core: Pure Domain Logic for the Tally Back-Office
//!
//! Everything the ledger engine decides without touching storage: money
//! arithmetic, sale totals, loyalty points, coupon codes, role checks and
//! input validation.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Tally Back-Office                                  │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                 apps/tally-api (axum, JSON)                     │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │   tally-ledger: StockLedger, SaleProcessor, PurchaseProcessor,  │   │
//! │  │                 CouponEngine, LoyaltyAccrual                    │   │
//! │  └──────────────┬───────────────────────────────┬──────────────────┘   │
//! │                 │                               │                       │
//! │  ┌──────────────▼──────────────┐  ┌─────────────▼───────────────────┐  │
//! │  │  ★ tally-core (THIS CRATE) ★│  │   tally-db (SQLite, sqlx)      │  │
//! │  │  money  pricing  loyalty    │◄─│   repositories, migrations     │  │
//! │  │  codes  auth  validation    │  │                                 │  │
//! │  │  NO I/O • PURE FUNCTIONS    │  │                                 │  │
//! │  └─────────────────────────────┘  └─────────────────────────────────┘  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Entities (Product, StockTransaction, Sale, Purchase, Coupon, ...)
//! - [`money`] - Integer `Money` and basis-point `Rate`
//! - [`pricing`] - Subtotal, tax, discount, grand total
//! - [`loyalty`] - Points and reward thresholds
//! - [`codes`] - Coupon codes, generated SKUs, document numbers
//! - [`auth`] - Roles and permissions
//! - [`error`] - Domain error types
//! - [`validation`] - Input rules
//!
//! ## Example
//!
//! ```rust
//! use tally_core::money::Money;
//! use tally_core::pricing::PricingPolicy;
//!
//! let totals = PricingPolicy::default().totals(Money::from_units(1000), None);
//! assert_eq!(totals.grand_total.to_string(), "1100.00");
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod auth;
pub mod codes;
pub mod error;
pub mod loyalty;
pub mod money;
pub mod pricing;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use auth::{Actor, Permission, Role};
pub use error::{CoreError, CoreResult, StockShortfall, ValidationError};
pub use loyalty::{LoyaltyAward, LoyaltyPolicy};
pub use money::{Money, Rate};
pub use pricing::{Discount, PricingPolicy, SaleTotals};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Sales tax: 10%.
pub const DEFAULT_TAX_RATE_BPS: u32 = 1000;

/// One loyalty point per 100.00 spent.
pub const DEFAULT_CENTS_PER_POINT: i64 = 10_000;

/// A reward coupon every 500 points.
pub const DEFAULT_POINTS_PER_COUPON: i64 = 500;

/// Reward coupons take 5% off.
pub const DEFAULT_REWARD_PERCENTAGE_BPS: u32 = 500;

pub const DEFAULT_REWARD_EXPIRY_DAYS: i64 = 30;

/// Upper bound on manually generated coupon lifetimes (ten years).
pub const MAX_COUPON_EXPIRY_DAYS: i64 = 3650;

/// Maximum lines on a single sale or purchase.
pub const MAX_DOCUMENT_LINES: usize = 200;

/// Maximum quantity on one line or manual movement.
///
/// Catches typos (10000 instead of 100) before they reach the ledger.
pub const MAX_LINE_QUANTITY: i64 = 100_000;

/// Highest unit price or cost accepted, in cents (one billion in major units).
pub const MAX_PRICE_CENTS: i64 = 100_000_000_000;

/// Largest subtotal a single sale or purchase can reach.
pub const MAX_DOCUMENT_TOTAL_CENTS: i64 =
    MAX_PRICE_CENTS * MAX_LINE_QUANTITY * MAX_DOCUMENT_LINES as i64;

pub const DEFAULT_PAGE_SIZE: u32 = 20;
pub const MAX_PAGE_SIZE: u32 = 100;
