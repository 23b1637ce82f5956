//! # tally-ledger: Inventory & Transaction Ledger Engine
//!
//! Sales, purchases, manual stock movements, coupons and loyalty, each as
//! one all-or-nothing SQLite transaction.
//!
//! ## Stock Invariants
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  products.current_stock  ==  Σ stock_in − Σ stock_out  (ledger)         │
//! │  products.current_stock  >=  0                   (guarded UPDATE)      │
//! │  stock_transactions      append-only             (SQLite triggers)     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//! - [`stock`] - `StockLedger`, the single writer of stock counters
//! - [`sale`] - `SaleProcessor`: create, edit, void
//! - [`purchase`] - `PurchaseProcessor`: receive, reverse
//! - [`coupon`] - `CouponEngine`: issue, validate, redeem
//! - [`loyalty`] - `LoyaltyProgram` seam and the SQLite `LoyaltyAccrual`
//! - [`catalog`] - products and customers
//! - [`engine`] - `Engine` facade with retries
//! - [`retry`] - exponential backoff for lost write races
//!
//! ## Usage
//!
//! ```rust,ignore
//! use tally_core::{Actor, Role};
//! use tally_db::{Database, DbConfig};
//! use tally_ledger::{Engine, EngineConfig};
//!
//! let db = Database::new(DbConfig::new("tally.db")).await?;
//! let engine = Engine::new(db, EngineConfig::default());
//! let receipt = engine.create_sale(&Actor::new("u-1", Role::Cashier), &new_sale).await?;
//! ```

pub mod catalog;
pub mod coupon;
pub mod engine;
pub mod error;
pub mod loyalty;
pub mod purchase;
pub mod retry;
pub mod sale;
pub mod stock;

pub use catalog::{CustomerDirectory, ProductCatalog};
pub use coupon::{CouponEngine, CouponTerms};
pub use engine::{Engine, EngineConfig};
pub use error::{LedgerError, LedgerResult};
pub use loyalty::{LoyaltyAccrual, LoyaltyProgram};
pub use purchase::PurchaseProcessor;
pub use retry::RetryPolicy;
pub use sale::SaleProcessor;
pub use stock::{StockLedger, TryApply};
