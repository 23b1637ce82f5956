//! # Repository Module
//!
//! One repository per aggregate. Each holds a pool clone for standalone
//! reads; anything that must share a transaction is an associated `*_in`
//! function taking `&mut SqliteConnection`.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  tally-ledger operation                                                 │
//! │       │                                                                 │
//! │       │  let mut tx = db.begin().await?;                                │
//! │       ▼                                                                 │
//! │  SequenceRepository::next_document_number_in(&mut tx, Sale)  ← lock     │
//! │  ProductRepository::apply_stock_delta_in(&mut tx, ...)                  │
//! │  StockTransactionRepository::insert_in(&mut tx, ...)                    │
//! │  SaleRepository::insert_in(&mut tx, ...)                                │
//! │  CouponRepository::redeem_in(&mut tx, ...)                              │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  tx.commit() ── all or nothing                                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`ProductRepository`](product::ProductRepository) - catalog and guarded stock counter
//! - [`CustomerRepository`](customer::CustomerRepository) - customers and loyalty balance
//! - [`StockTransactionRepository`](stock::StockTransactionRepository) - the append-only ledger
//! - [`SaleRepository`](sale::SaleRepository) - sales with frozen line items
//! - [`PurchaseRepository`](purchase::PurchaseRepository) - supplier purchases
//! - [`CouponRepository`](coupon::CouponRepository) - coupons and single-use redemption
//! - [`SequenceRepository`](sequence::SequenceRepository) - invoice/PO numbering

pub mod coupon;
pub mod customer;
pub mod product;
pub mod purchase;
pub mod sale;
pub mod sequence;
pub mod stock;

use uuid::Uuid;

/// Generates a new row ID.
pub fn new_id() -> String {
    Uuid::new_v4().to_string()
}
