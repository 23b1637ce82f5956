//! # Domain Types
//!
//! Core domain types used throughout the back-office.
//!
//! ## Type Map
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Product      │   │ StockTransaction│   │    Customer     │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  sku (unique)   │◄──│  product_id     │   │  loyalty_points │       │
//! │  │  current_stock  │   │  kind, quantity │   │  total_purchases│       │
//! │  │  is_active      │   │  balance_after  │   └────────┬────────┘       │
//! │  └─────────────────┘   │  origin (doc)   │            │                │
//! │                        └─────────────────┘            ▼                │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │      Sale       │   │    Purchase     │   │     Coupon      │       │
//! │  │  invoice_number │   │ purchase_number │   │  CPN-XXXXXX     │       │
//! │  │  items (frozen) │   │  items (frozen) │   │  is_used (once) │       │
//! │  │  status         │   │  status         │   └─────────────────┘       │
//! │  └─────────────────┘   └─────────────────┘                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Snapshot Pattern
//! Sale and purchase lines copy product name/SKU/price at creation time, so
//! historical documents never drift when the catalog changes.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::{Money, Rate};
use crate::pricing::Discount;

// =============================================================================
// Product
// =============================================================================

/// A catalog product. `current_stock` is owned by the stock ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Product {
    pub id: String,
    /// Stock Keeping Unit - unique business identifier.
    pub sku: String,
    pub name: String,
    pub category_id: Option<String>,
    pub cost_price_cents: i64,
    pub selling_price_cents: i64,
    /// Reorder threshold for the low-stock report.
    pub minimum_stock_level: i64,
    /// Derived from the ledger; never written outside a ledger delta.
    pub current_stock: i64,
    /// Soft delete flag. Inactive products keep their history but cannot
    /// appear on new sales or purchases.
    pub is_active: bool,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Product {
    #[inline]
    pub fn selling_price(&self) -> Money {
        Money::from_cents(self.selling_price_cents)
    }

    #[inline]
    pub fn cost_price(&self) -> Money {
        Money::from_cents(self.cost_price_cents)
    }

    /// True when stock has fallen to or below the reorder threshold.
    pub fn is_low_stock(&self) -> bool {
        self.current_stock <= self.minimum_stock_level
    }

    /// Checks if `quantity` units can leave stock right now.
    pub fn can_fulfil(&self, quantity: i64) -> bool {
        self.is_active && self.current_stock >= quantity
    }
}

/// Input for creating a product. Blank SKUs are auto-generated.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct NewProduct {
    #[serde(default)]
    pub sku: Option<String>,
    pub name: String,
    #[serde(default)]
    pub category_id: Option<String>,
    pub cost_price_cents: i64,
    pub selling_price_cents: i64,
    #[serde(default)]
    pub minimum_stock_level: i64,
}

/// Edit of non-stock catalog fields. `None` leaves the field unchanged.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct ProductUpdate {
    pub name: Option<String>,
    pub category_id: Option<String>,
    pub cost_price_cents: Option<i64>,
    pub selling_price_cents: Option<i64>,
    pub minimum_stock_level: Option<i64>,
}

// =============================================================================
// Stock Ledger
// =============================================================================

/// Direction of a ledger entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum StockMovementKind {
    StockIn,
    StockOut,
}

/// Why stock moved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum StockReason {
    /// Stock-out for a new sale.
    Sale,
    /// Net change when a sale's lines are edited.
    SaleAdjustment,
    /// Stock-in compensating a deleted (voided) sale.
    SaleVoid,
    /// Stock-in for a received supplier order.
    Purchase,
    /// Stock-out compensating a reversed purchase.
    PurchaseReversal,
    /// Damage, correction, count adjustment.
    Manual,
}

impl StockReason {
    /// New documents may not move stock of a deactivated product;
    /// compensations and manual corrections still may.
    pub fn requires_active_product(&self) -> bool {
        matches!(self, StockReason::Sale | StockReason::Purchase)
    }
}

/// Kind of document that originated a ledger entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum DocumentKind {
    Sale,
    Purchase,
}

/// Reference to the sale or purchase a ledger entry belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct DocumentRef {
    pub kind: DocumentKind,
    pub id: String,
}

impl DocumentRef {
    pub fn sale(id: impl Into<String>) -> Self {
        DocumentRef {
            kind: DocumentKind::Sale,
            id: id.into(),
        }
    }

    pub fn purchase(id: impl Into<String>) -> Self {
        DocumentRef {
            kind: DocumentKind::Purchase,
            id: id.into(),
        }
    }
}

/// An immutable, append-only ledger entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct StockTransaction {
    pub id: String,
    pub product_id: String,
    pub kind: StockMovementKind,
    /// Always positive; the sign lives in `kind`.
    pub quantity: i64,
    /// Product stock right after this entry was applied.
    pub balance_after: i64,
    pub reason: StockReason,
    pub notes: Option<String>,
    pub actor_id: String,
    pub origin_kind: Option<DocumentKind>,
    pub origin_id: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl StockTransaction {
    /// Quantity with its sign: stock-in positive, stock-out negative.
    pub fn signed_quantity(&self) -> i64 {
        match self.kind {
            StockMovementKind::StockIn => self.quantity,
            StockMovementKind::StockOut => -self.quantity,
        }
    }
}

/// A requested change to one product's stock.
///
/// ```rust
/// use tally_core::{DocumentRef, StockDelta, StockReason};
///
/// let delta = StockDelta::stock_out("prod-1", 3, StockReason::Sale, "cashier-1")
///     .with_origin(DocumentRef::sale("sale-1"));
/// assert_eq!(delta.quantity, -3);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct StockDelta {
    pub product_id: String,
    /// Signed: positive for stock-in, negative for stock-out. Never zero.
    pub quantity: i64,
    pub reason: StockReason,
    pub notes: Option<String>,
    pub actor_id: String,
    pub origin: Option<DocumentRef>,
}

impl StockDelta {
    pub fn stock_in(
        product_id: impl Into<String>,
        quantity: i64,
        reason: StockReason,
        actor_id: impl Into<String>,
    ) -> Self {
        StockDelta {
            product_id: product_id.into(),
            quantity: quantity.saturating_abs(),
            reason,
            notes: None,
            actor_id: actor_id.into(),
            origin: None,
        }
    }

    pub fn stock_out(
        product_id: impl Into<String>,
        quantity: i64,
        reason: StockReason,
        actor_id: impl Into<String>,
    ) -> Self {
        StockDelta {
            product_id: product_id.into(),
            quantity: -quantity.saturating_abs(),
            reason,
            notes: None,
            actor_id: actor_id.into(),
            origin: None,
        }
    }

    pub fn with_origin(mut self, origin: DocumentRef) -> Self {
        self.origin = Some(origin);
        self
    }

    pub fn with_notes(mut self, notes: Option<String>) -> Self {
        self.notes = notes;
        self
    }

    pub fn kind(&self) -> StockMovementKind {
        if self.quantity >= 0 {
            StockMovementKind::StockIn
        } else {
            StockMovementKind::StockOut
        }
    }
}

/// Stock level of one product after a batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct StockBalance {
    pub product_id: String,
    pub current_stock: i64,
}

/// Result of applying a batch of deltas.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct AppliedDeltas {
    pub transactions: Vec<StockTransaction>,
    /// Final balance per touched product, in first-touched order.
    pub balances: Vec<StockBalance>,
}

/// Ledger sum versus the stored balance for one product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct StockReconciliation {
    pub product_id: String,
    pub ledger_balance: i64,
    pub recorded_balance: i64,
}

impl StockReconciliation {
    pub fn is_consistent(&self) -> bool {
        self.ledger_balance == self.recorded_balance
    }
}

// =============================================================================
// Customer
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Customer {
    pub id: String,
    pub first_name: String,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub loyalty_points: i64,
    /// Number of credited sales.
    pub total_purchases: i64,
    pub is_active: bool,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Customer {
    pub fn display_name(&self) -> String {
        match &self.last_name {
            Some(last) if !last.trim().is_empty() => format!("{} {}", self.first_name, last),
            _ => self.first_name.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct NewCustomer {
    pub first_name: String,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
}

// =============================================================================
// Coupon
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum DiscountType {
    Percentage,
    Fixed,
}

/// How a coupon came to exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum CouponSource {
    /// Granted by staff.
    Manual,
    /// Minted automatically at a loyalty threshold.
    Loyalty,
}

/// A single-use discount coupon owned by a customer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Coupon {
    pub id: String,
    /// `CPN-XXXXXX`
    pub code: String,
    pub customer_id: String,
    pub discount_type: DiscountType,
    /// Basis points for `Percentage`, cents for `Fixed`.
    pub discount_value: i64,
    #[ts(as = "String")]
    pub expires_at: DateTime<Utc>,
    pub is_used: bool,
    pub used_in_sale_id: Option<String>,
    #[ts(as = "Option<String>")]
    pub used_at: Option<DateTime<Utc>>,
    pub source: CouponSource,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl Coupon {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }

    /// The discount this coupon grants.
    pub fn discount(&self) -> Discount {
        match self.discount_type {
            DiscountType::Percentage => {
                Discount::Percentage(Rate::from_bps(self.discount_value.max(0) as u32))
            }
            DiscountType::Fixed => Discount::Fixed(Money::from_cents(self.discount_value)),
        }
    }
}

/// Result of a read-only coupon check.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct CouponCheck {
    pub coupon: Coupon,
    pub customer: Customer,
}

// =============================================================================
// Sale
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum PaymentMethod {
    Cash,
    Card,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum SaleStatus {
    Completed,
    /// Deleted by staff; stock compensated, row kept for audit.
    Voided,
}

impl SaleStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SaleStatus::Completed => "completed",
            SaleStatus::Voided => "voided",
        }
    }
}

/// A persisted sale with its frozen line items.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Sale {
    pub id: String,
    /// Sequential, unique: `INV-000001`.
    pub invoice_number: String,
    pub customer_id: Option<String>,
    /// Free-text name for walk-in sales.
    pub customer_name: Option<String>,
    pub status: SaleStatus,
    pub subtotal_cents: i64,
    pub tax_cents: i64,
    pub discount_cents: i64,
    pub grand_total_cents: i64,
    pub payment_method: PaymentMethod,
    pub coupon_id: Option<String>,
    pub created_by: String,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
    #[ts(as = "Option<String>")]
    pub voided_at: Option<DateTime<Utc>>,
    #[cfg_attr(feature = "sqlx", sqlx(skip))]
    pub items: Vec<SaleItem>,
}

impl Sale {
    #[inline]
    pub fn grand_total(&self) -> Money {
        Money::from_cents(self.grand_total_cents)
    }

    pub fn is_voided(&self) -> bool {
        self.status == SaleStatus::Voided
    }
}

/// A line item in a sale (snapshot of the product at sale time).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct SaleItem {
    pub id: String,
    pub sale_id: String,
    pub line_no: i64,
    pub product_id: String,
    /// Product name at time of sale (frozen).
    pub product_name: String,
    /// SKU at time of sale (frozen).
    pub sku: String,
    pub quantity: i64,
    /// Unit price at time of sale (frozen).
    pub unit_price_cents: i64,
    /// unit_price × quantity
    pub line_total_cents: i64,
}

/// One requested line of a sale. Prices are resolved server-side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct SaleLineInput {
    pub product_id: String,
    pub quantity: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct NewSale {
    #[serde(default)]
    pub customer_id: Option<String>,
    #[serde(default)]
    pub customer_name: Option<String>,
    pub payment_method: PaymentMethod,
    pub items: Vec<SaleLineInput>,
    #[serde(default)]
    pub coupon_code: Option<String>,
}

/// Edit of an existing sale. Coupon and loyalty effects are not re-run.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct SaleUpdate {
    pub items: Vec<SaleLineInput>,
    #[serde(default)]
    pub customer_name: Option<String>,
    pub payment_method: PaymentMethod,
}

/// What loyalty accrual did for a sale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct LoyaltyOutcome {
    pub customer_id: String,
    pub points_earned: i64,
    pub new_balance: i64,
    pub coupons_issued: Vec<Coupon>,
}

/// A committed sale plus its non-fatal side effects.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct SaleReceipt {
    pub sale: Sale,
    pub loyalty: Option<LoyaltyOutcome>,
    /// e.g. loyalty crediting failed; the sale itself still stands.
    pub warnings: Vec<String>,
}

// =============================================================================
// Purchase
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum PurchaseStatus {
    Completed,
    /// Stock compensated by a reversal; row kept for audit.
    Reversed,
}

impl PurchaseStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PurchaseStatus::Completed => "completed",
            PurchaseStatus::Reversed => "reversed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Purchase {
    pub id: String,
    /// Sequential, unique: `PO-000001`.
    pub purchase_number: String,
    pub supplier_id: String,
    pub status: PurchaseStatus,
    pub total_amount_cents: i64,
    pub notes: Option<String>,
    #[ts(as = "String")]
    pub purchase_date: NaiveDate,
    pub created_by: String,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "Option<String>")]
    pub reversed_at: Option<DateTime<Utc>>,
    pub reversed_by: Option<String>,
    #[cfg_attr(feature = "sqlx", sqlx(skip))]
    pub items: Vec<PurchaseItem>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct PurchaseItem {
    pub id: String,
    pub purchase_id: String,
    pub line_no: i64,
    pub product_id: String,
    pub product_name: String,
    pub quantity: i64,
    pub cost_price_cents: i64,
    pub line_total_cents: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct PurchaseLineInput {
    pub product_id: String,
    pub quantity: i64,
    pub cost_price_cents: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct NewPurchase {
    pub supplier_id: String,
    pub items: Vec<PurchaseLineInput>,
    #[serde(default)]
    pub notes: Option<String>,
    /// Defaults to today when absent.
    #[serde(default)]
    #[ts(as = "Option<String>")]
    pub purchase_date: Option<NaiveDate>,
}

// =============================================================================
// Pagination
// =============================================================================

/// One page of a newest-first listing.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: u32,
    pub page_size: u32,
    pub total: i64,
}

// =============================================================================
// Unit Tests
// =============================================================================
