//! # Sale Repository
//!
//! Sales and their frozen line items.
//!
//! ## Sale Lifecycle
//! ```text
//!   insert_in ──► completed ──┬── claim_for_update_in / replace_items_in ──► completed
//!                             │
//!                             └── void_in ──► voided (terminal, row kept)
//! ```
//! Status flips are guarded with `WHERE status = 'completed'`, so two staff
//! members voiding the same sale cannot both compensate its stock.

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::DbResult;
use tally_core::{Sale, SaleItem};

macro_rules! select_sales {
    ($tail:literal) => {
        concat!(
            "SELECT id, invoice_number, customer_id, customer_name, status, subtotal_cents, ",
            "tax_cents, discount_cents, grand_total_cents, payment_method, coupon_id, ",
            "created_by, created_at, updated_at, voided_at ",
            "FROM sales ",
            $tail
        )
    };
}

const SELECT_ITEMS: &str = r#"
    SELECT id, sale_id, line_no, product_id, product_name, sku, quantity,
           unit_price_cents, line_total_cents
      FROM sale_items
     WHERE sale_id = ?1
     ORDER BY line_no
"#;

#[derive(Debug, Clone)]
pub struct SaleRepository {
    pool: SqlitePool,
}

impl SaleRepository {
    pub fn new(pool: SqlitePool) -> Self {
        SaleRepository { pool }
    }

    /// Inserts the sale header and all of its items.
    pub async fn insert_in(conn: &mut SqliteConnection, sale: &Sale) -> DbResult<()> {
        debug!(id = %sale.id, invoice = %sale.invoice_number, "Inserting sale");

        sqlx::query(
            r#"
            INSERT INTO sales (
                id, invoice_number, customer_id, customer_name, status,
                subtotal_cents, tax_cents, discount_cents, grand_total_cents,
                payment_method, coupon_id, created_by, created_at, updated_at, voided_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)
            "#,
        )
        .bind(&sale.id)
        .bind(&sale.invoice_number)
        .bind(&sale.customer_id)
        .bind(&sale.customer_name)
        .bind(sale.status)
        .bind(sale.subtotal_cents)
        .bind(sale.tax_cents)
        .bind(sale.discount_cents)
        .bind(sale.grand_total_cents)
        .bind(sale.payment_method)
        .bind(&sale.coupon_id)
        .bind(&sale.created_by)
        .bind(sale.created_at)
        .bind(sale.updated_at)
        .bind(sale.voided_at)
        .execute(&mut *conn)
        .await?;

        Self::insert_items_in(conn, &sale.items).await
    }

    async fn insert_items_in(conn: &mut SqliteConnection, items: &[SaleItem]) -> DbResult<()> {
        for item in items {
            sqlx::query(
                r#"
                INSERT INTO sale_items (
                    id, sale_id, line_no, product_id, product_name, sku, quantity,
                    unit_price_cents, line_total_cents
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                "#,
            )
            .bind(&item.id)
            .bind(&item.sale_id)
            .bind(item.line_no)
            .bind(&item.product_id)
            .bind(&item.product_name)
            .bind(&item.sku)
            .bind(item.quantity)
            .bind(item.unit_price_cents)
            .bind(item.line_total_cents)
            .execute(&mut *conn)
            .await?;
        }
        Ok(())
    }

    /// Replaces every line item of a sale.
    pub async fn replace_items_in(
        conn: &mut SqliteConnection,
        sale_id: &str,
        items: &[SaleItem],
    ) -> DbResult<()> {
        sqlx::query("DELETE FROM sale_items WHERE sale_id = ?1")
            .bind(sale_id)
            .execute(&mut *conn)
            .await?;
        Self::insert_items_in(conn, items).await
    }

    /// Writes the recomputed header fields of an edited sale.
    pub async fn update_header_in(conn: &mut SqliteConnection, sale: &Sale) -> DbResult<()> {
        sqlx::query(
            r#"
            UPDATE sales SET
                customer_name     = ?1,
                payment_method    = ?2,
                subtotal_cents    = ?3,
                tax_cents         = ?4,
                discount_cents    = ?5,
                grand_total_cents = ?6,
                updated_at        = ?7
            WHERE id = ?8
            "#,
        )
        .bind(&sale.customer_name)
        .bind(sale.payment_method)
        .bind(sale.subtotal_cents)
        .bind(sale.tax_cents)
        .bind(sale.discount_cents)
        .bind(sale.grand_total_cents)
        .bind(sale.updated_at)
        .bind(&sale.id)
        .execute(&mut *conn)
        .await?;
        Ok(())
    }

    /// Touches a completed sale so the transaction holds the write lock
    /// before it reads the sale. False if missing or not completed.
    pub async fn claim_for_update_in(
        conn: &mut SqliteConnection,
        id: &str,
        now: DateTime<Utc>,
    ) -> DbResult<bool> {
        let result =
            sqlx::query("UPDATE sales SET updated_at = ?1 WHERE id = ?2 AND status = 'completed'")
                .bind(now)
                .bind(id)
                .execute(&mut *conn)
                .await?;
        Ok(result.rows_affected() == 1)
    }

    /// completed → voided. False if missing or already voided.
    pub async fn void_in(conn: &mut SqliteConnection, id: &str, now: DateTime<Utc>) -> DbResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE sales
               SET status = 'voided', voided_at = ?1, updated_at = ?1
             WHERE id = ?2 AND status = 'completed'
            "#,
        )
        .bind(now)
        .bind(id)
        .execute(&mut *conn)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    /// Sale with items, read inside a caller's transaction.
    pub async fn find_in(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<Sale>> {
        let sale = sqlx::query_as::<_, Sale>(select_sales!("WHERE id = ?1"))
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?;

        match sale {
            Some(mut sale) => {
                sale.items = sqlx::query_as::<_, SaleItem>(SELECT_ITEMS)
                    .bind(id)
                    .fetch_all(&mut *conn)
                    .await?;
                Ok(Some(sale))
            }
            None => Ok(None),
        }
    }

    /// Sale with items.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Sale>> {
        let mut conn = self.pool.acquire().await?;
        Self::find_in(&mut conn, id).await
    }

    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM sales")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}
