//! # Customer Repository
//!
//! Customer rows and the loyalty balance, which only ever moves through an
//! atomic increment.

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::DbResult;
use tally_core::Customer;

macro_rules! select_customers {
    ($tail:literal) => {
        concat!(
            "SELECT id, first_name, last_name, email, phone, loyalty_points, ",
            "total_purchases, is_active, created_at, updated_at ",
            "FROM customers ",
            $tail
        )
    };
}

#[derive(Debug, Clone)]
pub struct CustomerRepository {
    pool: SqlitePool,
}

impl CustomerRepository {
    pub fn new(pool: SqlitePool) -> Self {
        CustomerRepository { pool }
    }

    pub async fn insert(&self, customer: &Customer) -> DbResult<()> {
        debug!(id = %customer.id, "Inserting customer");

        sqlx::query(
            r#"
            INSERT INTO customers (
                id, first_name, last_name, email, phone, loyalty_points,
                total_purchases, is_active, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
        )
        .bind(&customer.id)
        .bind(&customer.first_name)
        .bind(&customer.last_name)
        .bind(&customer.email)
        .bind(&customer.phone)
        .bind(customer.loyalty_points)
        .bind(customer.total_purchases)
        .bind(customer.is_active)
        .bind(customer.created_at)
        .bind(customer.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Customer>> {
        let customer = sqlx::query_as::<_, Customer>(select_customers!("WHERE id = ?1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(customer)
    }

    pub async fn find_in(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<Customer>> {
        let customer = sqlx::query_as::<_, Customer>(select_customers!("WHERE id = ?1"))
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?;
        Ok(customer)
    }

    /// Adds `points` and counts one more purchase.
    ///
    /// Returns the new balance, or `None` if the customer does not exist.
    pub async fn credit_loyalty_in(
        conn: &mut SqliteConnection,
        id: &str,
        points: i64,
        now: DateTime<Utc>,
    ) -> DbResult<Option<i64>> {
        let balance: Option<i64> = sqlx::query_scalar(
            r#"
            UPDATE customers
               SET loyalty_points = loyalty_points + ?1,
                   total_purchases = total_purchases + 1,
                   updated_at = ?2
             WHERE id = ?3
            RETURNING loyalty_points
            "#,
        )
        .bind(points)
        .bind(now)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;

        debug!(customer_id = %id, points, new_balance = ?balance, "Credited loyalty points");
        Ok(balance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::test_support::*;

    #[tokio::test]
    async fn test_insert_and_get() {
        let db = test_db().await;
        let c = insert_customer(&db, "Ayesha").await;

        let found = db.customers().get_by_id(&c.id).await.unwrap().unwrap();
        assert_eq!(found.first_name, "Ayesha");
        assert_eq!(found.loyalty_points, 0);
        assert!(db.customers().get_by_id("nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_credit_loyalty_accumulates() {
        let db = test_db().await;
        let c = insert_customer(&db, "Bilal").await;
        let mut conn = db.pool().acquire().await.unwrap();

        let first = CustomerRepository::credit_loyalty_in(&mut conn, &c.id, 70, Utc::now())
            .await
            .unwrap();
        let second = CustomerRepository::credit_loyalty_in(&mut conn, &c.id, 0, Utc::now())
            .await
            .unwrap();
        assert_eq!(first, Some(70));
        assert_eq!(second, Some(70));

        let stored = CustomerRepository::find_in(&mut conn, &c.id).await.unwrap().unwrap();
        assert_eq!(stored.total_purchases, 2);

        let missing = CustomerRepository::credit_loyalty_in(&mut conn, "ghost", 5, Utc::now())
            .await
            .unwrap();
        assert!(missing.is_none());
    }
}
