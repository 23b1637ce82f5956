//! # Coupon Repository
//!
//! Coupons are inserted once and mutated exactly once, from unused to used.
//!
//! ## Single-Use Redemption
//! ```text
//! UPDATE coupons SET is_used = 1, ... WHERE id = :id AND is_used = 0
//!
//!   sale A ──► 1 row affected ──► redeemed, sale A commits
//!   sale B ──► 0 rows affected ──► CouponAlreadyUsed, sale B rolls back
//! ```

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use tally_core::Coupon;

macro_rules! select_coupons {
    ($tail:literal) => {
        concat!(
            "SELECT id, code, customer_id, discount_type, discount_value, expires_at, ",
            "is_used, used_in_sale_id, used_at, source, created_at ",
            "FROM coupons ",
            $tail
        )
    };
}

#[derive(Debug, Clone)]
pub struct CouponRepository {
    pool: SqlitePool,
}

impl CouponRepository {
    pub fn new(pool: SqlitePool) -> Self {
        CouponRepository { pool }
    }

    /// Inserts a coupon. A taken code yields `UniqueViolation { field: "code" }`.
    pub async fn insert_in(conn: &mut SqliteConnection, coupon: &Coupon) -> DbResult<()> {
        debug!(id = %coupon.id, code = %coupon.code, customer_id = %coupon.customer_id, "Inserting coupon");

        sqlx::query(
            r#"
            INSERT INTO coupons (
                id, code, customer_id, discount_type, discount_value, expires_at,
                is_used, used_in_sale_id, used_at, source, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            "#,
        )
        .bind(&coupon.id)
        .bind(&coupon.code)
        .bind(&coupon.customer_id)
        .bind(coupon.discount_type)
        .bind(coupon.discount_value)
        .bind(coupon.expires_at)
        .bind(coupon.is_used)
        .bind(&coupon.used_in_sale_id)
        .bind(coupon.used_at)
        .bind(coupon.source)
        .bind(coupon.created_at)
        .execute(&mut *conn)
        .await
        .map_err(|e| match DbError::from(e) {
            DbError::UniqueViolation { .. } => DbError::duplicate("code", &coupon.code),
            other => other,
        })?;

        Ok(())
    }

    pub async fn code_exists_in(conn: &mut SqliteConnection, code: &str) -> DbResult<bool> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM coupons WHERE code = ?1)")
                .bind(code)
                .fetch_one(&mut *conn)
                .await?;
        Ok(exists)
    }

    pub async fn find_by_code(&self, code: &str) -> DbResult<Option<Coupon>> {
        let coupon = sqlx::query_as::<_, Coupon>(select_coupons!("WHERE code = ?1"))
            .bind(code)
            .fetch_optional(&self.pool)
            .await?;
        Ok(coupon)
    }

    pub async fn find_by_code_in(
        conn: &mut SqliteConnection,
        code: &str,
    ) -> DbResult<Option<Coupon>> {
        let coupon = sqlx::query_as::<_, Coupon>(select_coupons!("WHERE code = ?1"))
            .bind(code)
            .fetch_optional(&mut *conn)
            .await?;
        Ok(coupon)
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Coupon>> {
        let coupon = sqlx::query_as::<_, Coupon>(select_coupons!("WHERE id = ?1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(coupon)
    }

    /// A customer's coupons, newest first.
    pub async fn list_for_customer(&self, customer_id: &str) -> DbResult<Vec<Coupon>> {
        let coupons = sqlx::query_as::<_, Coupon>(select_coupons!(
            "WHERE customer_id = ?1 ORDER BY created_at DESC, code"
        ))
        .bind(customer_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(coupons)
    }

    /// Marks a coupon used by `sale_id` if nobody else did first.
    ///
    /// Returns true only for the single caller that flipped it.
    pub async fn redeem_in(
        conn: &mut SqliteConnection,
        coupon_id: &str,
        sale_id: &str,
        now: DateTime<Utc>,
    ) -> DbResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE coupons
               SET is_used = 1, used_in_sale_id = ?1, used_at = ?2
             WHERE id = ?3 AND is_used = 0
            "#,
        )
        .bind(sale_id)
        .bind(now)
        .bind(coupon_id)
        .execute(&mut *conn)
        .await?;

        let redeemed = result.rows_affected() == 1;
        debug!(coupon_id = %coupon_id, sale_id = %sale_id, redeemed, "Coupon redemption");
        Ok(redeemed)
    }
}
