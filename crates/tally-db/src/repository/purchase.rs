//! # Purchase Repository
//!
//! Supplier purchases. A purchase is never deleted: reversal flips its
//! status and the ledger carries the compensating stock-outs.

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::DbResult;
use tally_core::{Purchase, PurchaseItem};

macro_rules! select_purchases {
    ($tail:literal) => {
        concat!(
            "SELECT id, purchase_number, supplier_id, status, total_amount_cents, notes, ",
            "purchase_date, created_by, created_at, reversed_at, reversed_by ",
            "FROM purchases ",
            $tail
        )
    };
}

const SELECT_ITEMS: &str = r#"
    SELECT id, purchase_id, line_no, product_id, product_name, quantity,
           cost_price_cents, line_total_cents
      FROM purchase_items
     WHERE purchase_id = ?1
     ORDER BY line_no
"#;

#[derive(Debug, Clone)]
pub struct PurchaseRepository {
    pool: SqlitePool,
}

impl PurchaseRepository {
    pub fn new(pool: SqlitePool) -> Self {
        PurchaseRepository { pool }
    }

    pub async fn insert_in(conn: &mut SqliteConnection, purchase: &Purchase) -> DbResult<()> {
        debug!(id = %purchase.id, number = %purchase.purchase_number, "Inserting purchase");

        sqlx::query(
            r#"
            INSERT INTO purchases (
                id, purchase_number, supplier_id, status, total_amount_cents, notes,
                purchase_date, created_by, created_at, reversed_at, reversed_by
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            "#,
        )
        .bind(&purchase.id)
        .bind(&purchase.purchase_number)
        .bind(&purchase.supplier_id)
        .bind(purchase.status)
        .bind(purchase.total_amount_cents)
        .bind(&purchase.notes)
        .bind(purchase.purchase_date)
        .bind(&purchase.created_by)
        .bind(purchase.created_at)
        .bind(purchase.reversed_at)
        .bind(&purchase.reversed_by)
        .execute(&mut *conn)
        .await?;

        for item in &purchase.items {
            sqlx::query(
                r#"
                INSERT INTO purchase_items (
                    id, purchase_id, line_no, product_id, product_name, quantity,
                    cost_price_cents, line_total_cents
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                "#,
            )
            .bind(&item.id)
            .bind(&item.purchase_id)
            .bind(item.line_no)
            .bind(&item.product_id)
            .bind(&item.product_name)
            .bind(item.quantity)
            .bind(item.cost_price_cents)
            .bind(item.line_total_cents)
            .execute(&mut *conn)
            .await?;
        }

        Ok(())
    }

    /// completed → reversed. False if missing or already reversed.
    pub async fn reverse_in(
        conn: &mut SqliteConnection,
        id: &str,
        actor_id: &str,
        now: DateTime<Utc>,
    ) -> DbResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE purchases
               SET status = 'reversed', reversed_at = ?1, reversed_by = ?2
             WHERE id = ?3 AND status = 'completed'
            "#,
        )
        .bind(now)
        .bind(actor_id)
        .bind(id)
        .execute(&mut *conn)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    pub async fn find_in(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<Purchase>> {
        let purchase = sqlx::query_as::<_, Purchase>(select_purchases!("WHERE id = ?1"))
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?;

        match purchase {
            Some(mut purchase) => {
                purchase.items = sqlx::query_as::<_, PurchaseItem>(SELECT_ITEMS)
                    .bind(id)
                    .fetch_all(&mut *conn)
                    .await?;
                Ok(Some(purchase))
            }
            None => Ok(None),
        }
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Purchase>> {
        let mut conn = self.pool.acquire().await?;
        Self::find_in(&mut conn, id).await
    }

    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM purchases")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::new_id;
    use crate::repository::test_support::*;
    use tally_core::PurchaseStatus;

    #[tokio::test]
    async fn test_insert_read_and_reverse_once() {
        let db = test_db().await;
        let p = insert_product(&db, "RICE-25KG", 5_000).await;
        let now = Utc::now();
        let id = new_id();
        let purchase = Purchase {
            id: id.clone(),
            purchase_number: "PO-000001".to_string(),
            supplier_id: "sup-1".to_string(),
            status: PurchaseStatus::Completed,
            total_amount_cents: 40_000,
            notes: Some("weekly order".to_string()),
            purchase_date: now.date_naive(),
            created_by: "manager-1".to_string(),
            created_at: now,
            reversed_at: None,
            reversed_by: None,
            items: vec![PurchaseItem {
                id: new_id(),
                purchase_id: id.clone(),
                line_no: 1,
                product_id: p.id.clone(),
                product_name: p.name.clone(),
                quantity: 10,
                cost_price_cents: 4_000,
                line_total_cents: 40_000,
            }],
        };

        let mut conn = db.pool().acquire().await.unwrap();
        PurchaseRepository::insert_in(&mut conn, &purchase).await.unwrap();

        let found = PurchaseRepository::find_in(&mut conn, &id).await.unwrap().unwrap();
        assert_eq!(found.items.len(), 1);
        assert_eq!(found.purchase_date, purchase.purchase_date);

        assert!(PurchaseRepository::reverse_in(&mut conn, &id, "manager-1", Utc::now())
            .await
            .unwrap());
        assert!(!PurchaseRepository::reverse_in(&mut conn, &id, "manager-1", Utc::now())
            .await
            .unwrap());

        let reversed = PurchaseRepository::find_in(&mut conn, &id).await.unwrap().unwrap();
        assert_eq!(reversed.status, PurchaseStatus::Reversed);
        assert_eq!(reversed.reversed_by.as_deref(), Some("manager-1"));
    }
}
