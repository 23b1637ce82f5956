//! # Product Repository
//!
//! Catalog rows plus the guarded `current_stock` counter.
//!
//! ## Guarded Stock Update
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  UPDATE products                                                        │
//! │     SET current_stock = current_stock + :delta                          │
//! │   WHERE id = :id                                                        │
//! │     AND current_stock + :delta >= 0        ← never below zero           │
//! │     AND (:require_active = 0 OR is_active = 1)                          │
//! │  RETURNING current_stock                                                │
//! │                                                                         │
//! │  row returned  → new balance                                            │
//! │  no row        → caller diagnoses: missing, inactive or short           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//! The statement takes SQLite's write lock even when no row matches, so
//! anything the caller reads afterwards in the same transaction is current.

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use tally_core::{Product, ProductUpdate};

macro_rules! select_products {
    ($tail:literal) => {
        concat!(
            "SELECT id, sku, name, category_id, cost_price_cents, selling_price_cents, ",
            "minimum_stock_level, current_stock, is_active, created_at, updated_at ",
            "FROM products ",
            $tail
        )
    };
}

#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

impl ProductRepository {
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository { pool }
    }

    /// Inserts a product. A taken SKU yields `UniqueViolation { field: "sku" }`.
    pub async fn insert(&self, product: &Product) -> DbResult<()> {
        debug!(id = %product.id, sku = %product.sku, "Inserting product");

        sqlx::query(
            r#"
            INSERT INTO products (
                id, sku, name, category_id, cost_price_cents, selling_price_cents,
                minimum_stock_level, current_stock, is_active, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            "#,
        )
        .bind(&product.id)
        .bind(&product.sku)
        .bind(&product.name)
        .bind(&product.category_id)
        .bind(product.cost_price_cents)
        .bind(product.selling_price_cents)
        .bind(product.minimum_stock_level)
        .bind(product.current_stock)
        .bind(product.is_active)
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| match DbError::from(e) {
            DbError::UniqueViolation { .. } => DbError::duplicate("sku", &product.sku),
            other => other,
        })?;

        Ok(())
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Product>> {
        let product = sqlx::query_as::<_, Product>(select_products!("WHERE id = ?1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(product)
    }

    /// Reads a product inside a caller's transaction.
    pub async fn find_in(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<Product>> {
        let product = sqlx::query_as::<_, Product>(select_products!("WHERE id = ?1"))
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?;
        Ok(product)
    }

    /// Lists products ordered by name.
    pub async fn list(&self, include_inactive: bool) -> DbResult<Vec<Product>> {
        let products = sqlx::query_as::<_, Product>(select_products!(
            "WHERE (?1 = 1 OR is_active = 1) ORDER BY name, sku"
        ))
        .bind(include_inactive)
        .fetch_all(&self.pool)
        .await?;

        debug!(count = products.len(), include_inactive, "Listed products");
        Ok(products)
    }

    /// Active products at or below their reorder threshold, emptiest first.
    pub async fn low_stock(&self) -> DbResult<Vec<Product>> {
        let products = sqlx::query_as::<_, Product>(select_products!(
            "WHERE is_active = 1 AND current_stock <= minimum_stock_level \
             ORDER BY current_stock, name"
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(products)
    }

    pub async fn sku_exists(&self, sku: &str) -> DbResult<bool> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM products WHERE sku = ?1)")
            .bind(sku)
            .fetch_one(&self.pool)
            .await?;
        Ok(exists)
    }

    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    pub async fn current_stock(&self, id: &str) -> DbResult<Option<i64>> {
        let stock: Option<i64> =
            sqlx::query_scalar("SELECT current_stock FROM products WHERE id = ?1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(stock)
    }

    /// Edits non-stock fields; `None` keeps the stored value.
    ///
    /// Returns the updated product, or `None` if the id is unknown.
    pub async fn update_details(
        &self,
        id: &str,
        update: &ProductUpdate,
        now: DateTime<Utc>,
    ) -> DbResult<Option<Product>> {
        debug!(id = %id, "Updating product details");

        let product = sqlx::query_as::<_, Product>(
            r#"
            UPDATE products SET
                name                = COALESCE(?1, name),
                category_id         = COALESCE(?2, category_id),
                cost_price_cents    = COALESCE(?3, cost_price_cents),
                selling_price_cents = COALESCE(?4, selling_price_cents),
                minimum_stock_level = COALESCE(?5, minimum_stock_level),
                updated_at          = ?6
            WHERE id = ?7
            RETURNING id, sku, name, category_id, cost_price_cents, selling_price_cents,
                      minimum_stock_level, current_stock, is_active, created_at, updated_at
            "#,
        )
        .bind(&update.name)
        .bind(&update.category_id)
        .bind(update.cost_price_cents)
        .bind(update.selling_price_cents)
        .bind(update.minimum_stock_level)
        .bind(now)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(product)
    }

    /// Soft delete. Returns false if the id is unknown.
    pub async fn deactivate(&self, id: &str, now: DateTime<Utc>) -> DbResult<bool> {
        debug!(id = %id, "Deactivating product");

        let result = sqlx::query("UPDATE products SET is_active = 0, updated_at = ?1 WHERE id = ?2")
            .bind(now)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Applies a signed delta if the result stays non-negative.
    ///
    /// Returns the new balance, or `None` when the guard rejected the change
    /// (or the product does not exist / is inactive and `require_active`).
    pub async fn apply_stock_delta_in(
        conn: &mut SqliteConnection,
        id: &str,
        delta: i64,
        require_active: bool,
        now: DateTime<Utc>,
    ) -> DbResult<Option<i64>> {
        let balance: Option<i64> = sqlx::query_scalar(
            r#"
            UPDATE products
               SET current_stock = current_stock + ?1,
                   updated_at = ?2
             WHERE id = ?3
               AND current_stock + ?1 >= 0
               AND (?4 = 0 OR is_active = 1)
            RETURNING current_stock
            "#,
        )
        .bind(delta)
        .bind(now)
        .bind(id)
        .bind(require_active)
        .fetch_optional(&mut *conn)
        .await?;

        debug!(product_id = %id, delta, applied = balance.is_some(), "Guarded stock update");
        Ok(balance)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
