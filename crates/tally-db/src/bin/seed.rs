//! # Seed Data Generator
//!
//! Populates a development database with products, customers and opening
//! stock.
//!
//! ## Usage
//! ```bash
//! # 60 products (default)
//! cargo run -p tally-db --bin seed
//!
//! # Custom amount and path
//! cargo run -p tally-db --bin seed -- --count 200 --db ./data/tally.db
//! ```
//!
//! Opening stock is written as `manual` stock-in ledger entries, so the
//! ledger sum matches `current_stock` from the first run.

use chrono::Utc;
use std::env;
use tally_core::{
    Customer, Product, StockMovementKind, StockReason, StockTransaction,
};
use tally_db::{new_id, Database, DbConfig, ProductRepository, StockTransactionRepository};

/// Catalog sections for realistic test data.
const CATEGORIES: &[(&str, &[&str])] = &[
    (
        "GRC",
        &[
            "Basmati Rice",
            "Sella Rice",
            "Wheat Flour",
            "Chickpea Flour",
            "White Sugar",
            "Brown Sugar",
            "Red Lentils",
            "Yellow Lentils",
            "Chickpeas",
            "Iodized Salt",
        ],
    ),
    (
        "BEV",
        &[
            "Black Tea",
            "Green Tea",
            "Instant Coffee",
            "Mango Juice",
            "Orange Juice",
            "Mineral Water",
            "Cola",
            "Lemon Soda",
            "Milk Powder",
            "Rose Syrup",
        ],
    ),
    (
        "HSH",
        &[
            "Dish Soap",
            "Laundry Powder",
            "Floor Cleaner",
            "Bath Soap",
            "Shampoo",
            "Toothpaste",
            "Tissue Box",
            "Trash Bags",
            "Hand Wash",
            "Bleach",
        ],
    ),
];

/// Pack sizes with a price addon in cents.
const SIZES: &[(&str, i64)] = &[("Small", 0), ("Medium", 15_000), ("Large", 40_000)];

const CUSTOMERS: &[(&str, &str)] = &[
    ("Ayesha", "Khan"),
    ("Bilal", "Ahmed"),
    ("Fatima", "Raza"),
    ("Hamza", "Iqbal"),
    ("Zainab", "Malik"),
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();

    let mut count: usize = 60;
    let mut db_path = String::from("./tally_dev.db");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--count" | "-c" => {
                if i + 1 < args.len() {
                    count = args[i + 1].parse().unwrap_or(60);
                    i += 1;
                }
            }
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Tally Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -c, --count <N>    Number of products to generate (default: 60)");
                println!("  -d, --db <PATH>    Database file path (default: ./tally_dev.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("Tally Seed Data Generator");
    println!("=========================");
    println!("Database: {}", db_path);
    println!("Products: {}", count);
    println!();

    let db = Database::new(DbConfig::new(&db_path)).await?;
    println!("✓ Connected, migrations applied");

    let existing = db.products().count().await?;
    if existing > 0 {
        println!("⚠ Database already has {} products", existing);
        println!("  Skipping seed to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    let start = std::time::Instant::now();
    let mut generated = 0;

    'outer: for (category_idx, (code, names)) in CATEGORIES.iter().enumerate() {
        for (name_idx, name) in names.iter().enumerate() {
            for (size_idx, (size, addon)) in SIZES.iter().enumerate() {
                if generated >= count {
                    break 'outer;
                }
                let seed = category_idx * 1000 + name_idx * 10 + size_idx;
                let product = generate_product(code, name, size, *addon, seed);

                if let Err(e) = db.products().insert(&product).await {
                    eprintln!("Failed to insert {}: {}", product.sku, e);
                    continue;
                }

                let opening = (seed % 41) as i64;
                if opening > 0 {
                    record_opening_stock(&db, &product, opening).await?;
                }

                generated += 1;
            }
        }
    }

    for (first, last) in CUSTOMERS {
        db.customers().insert(&generate_customer(first, last)).await?;
    }

    println!("✓ Generated {} products in {:?}", generated, start.elapsed());
    println!("✓ Generated {} customers", CUSTOMERS.len());
    println!("  Low stock: {} products", db.products().low_stock().await?.len());
    println!();
    println!("✓ Seed complete!");

    Ok(())
}

/// Stock-in through the guarded counter plus a ledger row, in one transaction.
async fn record_opening_stock(
    db: &Database,
    product: &Product,
    quantity: i64,
) -> Result<(), Box<dyn std::error::Error>> {
    let now = Utc::now();
    let mut tx = db.begin().await?;

    let balance = ProductRepository::apply_stock_delta_in(&mut tx, &product.id, quantity, true, now)
        .await?
        .ok_or("opening stock rejected")?;

    let entry = StockTransaction {
        id: new_id(),
        product_id: product.id.clone(),
        kind: StockMovementKind::StockIn,
        quantity,
        balance_after: balance,
        reason: StockReason::Manual,
        notes: Some("opening stock".to_string()),
        actor_id: "seed".to_string(),
        origin_kind: None,
        origin_id: None,
        created_at: now,
    };
    StockTransactionRepository::insert_in(&mut tx, &entry).await?;

    tx.commit().await?;
    Ok(())
}

fn generate_product(category: &str, name: &str, size: &str, addon: i64, seed: usize) -> Product {
    let now = Utc::now();

    let short: String = name
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .take(4)
        .collect::<String>()
        .to_uppercase();
    let sku = format!("{}-{}-{:04}", category, short, seed);

    // 50.00 - 849.00 plus the size addon
    let selling_price_cents = 5_000 + ((seed * 37) % 800) as i64 * 100 + addon;
    // 60-79% of selling price
    let cost_price_cents = selling_price_cents * (60 + (seed % 20) as i64) / 100;

    Product {
        id: new_id(),
        sku,
        name: format!("{} {}", name, size),
        category_id: Some(category.to_string()),
        cost_price_cents,
        selling_price_cents,
        minimum_stock_level: 10,
        current_stock: 0,
        is_active: true,
        created_at: now,
        updated_at: now,
    }
}

fn generate_customer(first: &str, last: &str) -> Customer {
    let now = Utc::now();
    Customer {
        id: new_id(),
        first_name: first.to_string(),
        last_name: Some(last.to_string()),
        email: Some(format!("{}.{}@example.com", first, last).to_lowercase()),
        phone: None,
        loyalty_points: 0,
        total_purchases: 0,
        is_active: true,
        created_at: now,
        updated_at: now,
    }
}
