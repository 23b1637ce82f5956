//! # Stock Transaction Repository
//!
//! The append-only stock ledger. Rows are only ever inserted; the schema's
//! triggers abort any UPDATE or DELETE.

use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::DbResult;
use tally_core::{DocumentKind, StockTransaction};

macro_rules! select_transactions {
    ($tail:literal) => {
        concat!(
            "SELECT id, product_id, kind, quantity, balance_after, reason, notes, ",
            "actor_id, origin_kind, origin_id, created_at ",
            "FROM stock_transactions ",
            $tail
        )
    };
}

#[derive(Debug, Clone)]
pub struct StockTransactionRepository {
    pool: SqlitePool,
}

impl StockTransactionRepository {
    pub fn new(pool: SqlitePool) -> Self {
        StockTransactionRepository { pool }
    }

    pub async fn insert_in(conn: &mut SqliteConnection, tx: &StockTransaction) -> DbResult<()> {
        sqlx::query(
            r#"
            INSERT INTO stock_transactions (
                id, product_id, kind, quantity, balance_after, reason, notes,
                actor_id, origin_kind, origin_id, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            "#,
        )
        .bind(&tx.id)
        .bind(&tx.product_id)
        .bind(tx.kind)
        .bind(tx.quantity)
        .bind(tx.balance_after)
        .bind(tx.reason)
        .bind(&tx.notes)
        .bind(&tx.actor_id)
        .bind(tx.origin_kind)
        .bind(&tx.origin_id)
        .bind(tx.created_at)
        .execute(&mut *conn)
        .await?;

        debug!(
            id = %tx.id,
            product_id = %tx.product_id,
            kind = ?tx.kind,
            quantity = tx.quantity,
            balance_after = tx.balance_after,
            "Appended stock transaction"
        );
        Ok(())
    }

    /// One page of a product's ledger, newest first, plus the total count.
    ///
    /// `page` is 1-based.
    pub async fn history(
        &self,
        product_id: &str,
        page: u32,
        page_size: u32,
    ) -> DbResult<(Vec<StockTransaction>, i64)> {
        let offset = (page.saturating_sub(1) as i64) * page_size as i64;

        let items = sqlx::query_as::<_, StockTransaction>(select_transactions!(
            "WHERE product_id = ?1 ORDER BY seq DESC LIMIT ?2 OFFSET ?3"
        ))
        .bind(product_id)
        .bind(page_size as i64)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        let total: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM stock_transactions WHERE product_id = ?1")
                .bind(product_id)
                .fetch_one(&self.pool)
                .await?;

        Ok((items, total))
    }

    /// Entries written on behalf of one sale or purchase, oldest first.
    pub async fn for_origin(
        &self,
        kind: DocumentKind,
        origin_id: &str,
    ) -> DbResult<Vec<StockTransaction>> {
        let items = sqlx::query_as::<_, StockTransaction>(select_transactions!(
            "WHERE origin_kind = ?1 AND origin_id = ?2 ORDER BY seq"
        ))
        .bind(kind)
        .bind(origin_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(items)
    }

    /// Σ stock-in − Σ stock-out for a product.
    pub async fn ledger_balance(&self, product_id: &str) -> DbResult<i64> {
        let sum: i64 = sqlx::query_scalar(
            r#"
            SELECT COALESCE(SUM(CASE kind WHEN 'stock_in' THEN quantity ELSE -quantity END), 0)
              FROM stock_transactions
             WHERE product_id = ?1
            "#,
        )
        .bind(product_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(sum)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DbError;
    use crate::repository::new_id;
    use crate::repository::product::ProductRepository;
    use crate::repository::test_support::*;
    use chrono::Utc;
    use tally_core::{StockMovementKind, StockReason};

    fn entry(product_id: &str, kind: StockMovementKind, qty: i64, balance: i64) -> StockTransaction {
        StockTransaction {
            id: new_id(),
            product_id: product_id.to_string(),
            kind,
            quantity: qty,
            balance_after: balance,
            reason: StockReason::Manual,
            notes: None,
            actor_id: "tester".to_string(),
            origin_kind: None,
            origin_id: None,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_history_newest_first_and_paged() {
        let db = test_db().await;
        let p = insert_product(&db, "FLOUR-10KG", 2_000).await;
        {
            let mut conn = db.pool().acquire().await.unwrap();
            for i in 1..=5 {
                let e = entry(&p.id, StockMovementKind::StockIn, 1, i);
                StockTransactionRepository::insert_in(&mut conn, &e).await.unwrap();
            }
        }

        let repo = db.stock_transactions();
        let (page1, total) = repo.history(&p.id, 1, 2).await.unwrap();
        assert_eq!(total, 5);
        assert_eq!(page1.len(), 2);
        assert_eq!(page1[0].balance_after, 5);
        assert_eq!(page1[1].balance_after, 4);

        let (page3, _) = repo.history(&p.id, 3, 2).await.unwrap();
        assert_eq!(page3.len(), 1);
        assert_eq!(page3[0].balance_after, 1);

        assert_eq!(repo.ledger_balance(&p.id).await.unwrap(), 5);
    }

    #[tokio::test]
    async fn test_ledger_rows_cannot_be_changed() {
        let db = test_db().await;
        let p = insert_product(&db, "SALT-1KG", 100).await;
        let mut conn = db.pool().acquire().await.unwrap();
        ProductRepository::apply_stock_delta_in(&mut conn, &p.id, 3, true, Utc::now())
            .await
            .unwrap();
        let e = entry(&p.id, StockMovementKind::StockIn, 3, 3);
        StockTransactionRepository::insert_in(&mut conn, &e).await.unwrap();

        let update = sqlx::query("UPDATE stock_transactions SET quantity = 99 WHERE id = ?1")
            .bind(&e.id)
            .execute(&mut *conn)
            .await
            .map_err(DbError::from)
            .unwrap_err();
        assert!(matches!(update, DbError::ConstraintViolation { .. }));

        let delete = sqlx::query("DELETE FROM stock_transactions WHERE id = ?1")
            .bind(&e.id)
            .execute(&mut *conn)
            .await
            .map_err(DbError::from)
            .unwrap_err();
        assert!(matches!(delete, DbError::ConstraintViolation { .. }));
    }

    #[tokio::test]
    async fn test_ledger_balance_signs() {
        let db = test_db().await;
        let p = insert_product(&db, "TEA-500G", 700).await;
        {
            let mut conn = db.pool().acquire().await.unwrap();
            let a = entry(&p.id, StockMovementKind::StockIn, 10, 10);
            let b = entry(&p.id, StockMovementKind::StockOut, 4, 6);
            StockTransactionRepository::insert_in(&mut conn, &a).await.unwrap();
            StockTransactionRepository::insert_in(&mut conn, &b).await.unwrap();
        }
        assert_eq!(db.stock_transactions().ledger_balance(&p.id).await.unwrap(), 6);
    }
}
