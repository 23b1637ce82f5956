//! Shared fixtures for engine tests.

#![allow(dead_code)]

use std::time::Duration;

use tally_core::{
    Actor, Customer, NewCustomer, NewProduct, NewPurchase, NewSale, PaymentMethod, Product,
    PurchaseLineInput, Role, SaleLineInput,
};
use tally_db::{Database, DbConfig};
use tally_ledger::{Engine, EngineConfig, RetryPolicy};
use tempfile::TempDir;

pub fn admin() -> Actor {
    Actor::new("admin-1", Role::Admin)
}

pub fn manager() -> Actor {
    Actor::new("manager-1", Role::Manager)
}

pub fn cashier() -> Actor {
    Actor::new("cashier-1", Role::Cashier)
}

pub fn config() -> EngineConfig {
    EngineConfig {
        retry: RetryPolicy {
            max_retries: 5,
            initial_backoff: Duration::from_millis(5),
            max_backoff: Duration::from_millis(50),
        },
        ..Default::default()
    }
}

pub async fn memory_db() -> Database {
    Database::new(DbConfig::in_memory()).await.unwrap()
}

pub async fn memory_engine() -> Engine {
    Engine::new(memory_db().await, config())
}

/// A file-backed engine with several pooled connections, for racing writers.
pub async fn file_engine() -> (Engine, TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let db = Database::new(
        DbConfig::new(dir.path().join("tally.db"))
            .max_connections(8)
            .busy_timeout(Duration::from_secs(10)),
    )
    .await
    .unwrap();
    (Engine::new(db, config()), dir)
}

/// Creates a product priced in cents and stocks it through a manual stock-in.
pub async fn stocked_product(engine: &Engine, sku: &str, price_cents: i64, stock: i64) -> Product {
    let product = engine
        .create_product(
            &admin(),
            &NewProduct {
                sku: Some(sku.to_string()),
                name: format!("Product {sku}"),
                category_id: None,
                cost_price_cents: price_cents / 2,
                selling_price_cents: price_cents,
                minimum_stock_level: 5,
            },
        )
        .await
        .unwrap();

    if stock > 0 {
        engine
            .stock_in(&admin(), &product.id, stock, Some("opening".to_string()))
            .await
            .unwrap();
    }
    product
}

pub async fn customer(engine: &Engine, first_name: &str) -> Customer {
    engine
        .create_customer(
            &admin(),
            &NewCustomer {
                first_name: first_name.to_string(),
                ..Default::default()
            },
        )
        .await
        .unwrap()
}

pub fn sale(lines: &[(&str, i64)]) -> NewSale {
    NewSale {
        customer_id: None,
        customer_name: None,
        payment_method: PaymentMethod::Cash,
        items: lines
            .iter()
            .map(|(product_id, quantity)| SaleLineInput {
                product_id: product_id.to_string(),
                quantity: *quantity,
            })
            .collect(),
        coupon_code: None,
    }
}

pub fn purchase(lines: &[(&str, i64, i64)]) -> NewPurchase {
    NewPurchase {
        supplier_id: "supplier-1".to_string(),
        items: lines
            .iter()
            .map(|(product_id, quantity, cost)| PurchaseLineInput {
                product_id: product_id.to_string(),
                quantity: *quantity,
                cost_price_cents: *cost,
            })
            .collect(),
        notes: None,
        purchase_date: None,
    }
}

pub async fn stock_of(engine: &Engine, product_id: &str) -> i64 {
    engine
        .current_stock(&admin(), product_id)
        .await
        .unwrap()
        .current_stock
}

/// Ledger sum equals the stored counter.
pub async fn assert_consistent(engine: &Engine, product_id: &str) {
    let rec = engine.reconcile_stock(&admin(), product_id).await.unwrap();
    assert!(
        rec.is_consistent(),
        "ledger {} != recorded {} for {}",
        rec.ledger_balance,
        rec.recorded_balance,
        product_id
    );
}
