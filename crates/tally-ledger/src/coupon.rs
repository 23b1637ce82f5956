//! # Coupon Engine
//!
//! Issues, validates and reserves single-use customer coupons.
//!
//! ## Lifecycle
//! ```text
//! generate / loyalty ──► unused ──► (sale commits) ──► used
//!                          │
//!                          └── expires_at < now ──► rejected at the register
//! ```
//!
//! Validation alone never flips `is_used`. The flip happens inside the sale
//! transaction through a compare-and-swap, so two registers racing for the
//! same code cannot both win.

use chrono::{DateTime, Duration, Utc};
use sqlx::SqliteConnection;
use tracing::{debug, info};

use tally_core::codes::{generate_coupon_code, is_coupon_code, normalize_coupon_code};
use tally_core::validation::{validate_discount, validate_expiry_days, validate_id};
use tally_core::{
    Actor, CoreError, Coupon, CouponCheck, CouponSource, DiscountType, Permission,
};
use tally_db::{new_id, CouponRepository, CustomerRepository, Database, DbError};

use crate::error::LedgerResult;

/// Fresh codes drawn before giving up on finding an unused one.
const MAX_CODE_ATTEMPTS: usize = 10;

/// What to mint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CouponTerms {
    pub discount_type: DiscountType,
    /// Basis points for percentage, cents for fixed.
    pub discount_value: i64,
    pub expiry_days: i64,
    pub source: CouponSource,
}

#[derive(Debug, Clone)]
pub struct CouponEngine {
    db: Database,
}

impl CouponEngine {
    pub fn new(db: Database) -> Self {
        CouponEngine { db }
    }

    /// Issues a coupon for a customer on staff request.
    pub async fn generate(
        &self,
        actor: &Actor,
        customer_id: &str,
        discount_type: DiscountType,
        discount_value: i64,
        expiry_days: i64,
    ) -> LedgerResult<Coupon> {
        actor.authorize(Permission::GenerateCoupon)?;
        validate_id("customerId", customer_id)?;
        validate_discount(discount_type, discount_value)?;
        validate_expiry_days(expiry_days)?;

        let terms = CouponTerms {
            discount_type,
            discount_value,
            expiry_days,
            source: CouponSource::Manual,
        };

        let mut conn = self.db.pool().acquire().await.map_err(DbError::from)?;
        if CustomerRepository::find_in(&mut conn, customer_id).await?.is_none() {
            return Err(CoreError::not_found("Customer", customer_id).into());
        }

        let coupon = Self::issue_in(&mut conn, customer_id, terms, Utc::now()).await?;
        info!(code = %coupon.code, customer_id = %customer_id, actor = %actor.id, "Coupon generated");
        Ok(coupon)
    }

    /// Mints a coupon with a fresh unique code inside the caller's
    /// transaction. The customer must exist.
    pub async fn issue_in(
        conn: &mut SqliteConnection,
        customer_id: &str,
        terms: CouponTerms,
        now: DateTime<Utc>,
    ) -> LedgerResult<Coupon> {
        for _ in 0..MAX_CODE_ATTEMPTS {
            let code = generate_coupon_code();
            if CouponRepository::code_exists_in(&mut *conn, &code).await? {
                debug!(code = %code, "Coupon code collision, drawing again");
                continue;
            }

            let coupon = Coupon {
                id: new_id(),
                code,
                customer_id: customer_id.to_string(),
                discount_type: terms.discount_type,
                discount_value: terms.discount_value,
                expires_at: now + Duration::days(terms.expiry_days),
                is_used: false,
                used_in_sale_id: None,
                used_at: None,
                source: terms.source,
                created_at: now,
            };

            match CouponRepository::insert_in(&mut *conn, &coupon).await {
                Ok(()) => return Ok(coupon),
                Err(DbError::UniqueViolation { .. }) => continue,
                Err(err) => return Err(err.into()),
            }
        }

        Err(DbError::Internal("no unused coupon code found".to_string()).into())
    }

    /// Looks a code up and checks it can still be redeemed.
    ///
    /// Does not reserve the coupon.
    pub async fn validate(&self, actor: &Actor, code: &str) -> LedgerResult<CouponCheck> {
        actor.authorize(Permission::ValidateCoupon)?;
        let code = normalize_coupon_code(code);
        if !is_coupon_code(&code) {
            return Err(CoreError::CouponNotFound(code).into());
        }

        let mut conn = self.db.pool().acquire().await.map_err(DbError::from)?;
        let coupon = CouponRepository::find_by_code_in(&mut conn, &code)
            .await?
            .ok_or_else(|| CoreError::CouponNotFound(code.clone()))?;
        ensure_redeemable(&coupon, Utc::now())?;

        let customer = CustomerRepository::find_in(&mut conn, &coupon.customer_id)
            .await?
            .ok_or_else(|| CoreError::not_found("Customer", &coupon.customer_id))?;

        Ok(CouponCheck { coupon, customer })
    }

    /// Checks a coupon for use in the sale being built in `conn`.
    ///
    /// The coupon stays unused here; `redeem_in` flips it once the sale row
    /// exists. A sale for a different customer than the coupon's owner is
    /// rejected.
    pub async fn validate_and_reserve_in(
        conn: &mut SqliteConnection,
        code: &str,
        sale_customer: Option<&str>,
        now: DateTime<Utc>,
    ) -> LedgerResult<Coupon> {
        let code = normalize_coupon_code(code);
        if !is_coupon_code(&code) {
            return Err(CoreError::CouponNotFound(code).into());
        }

        let coupon = CouponRepository::find_by_code_in(&mut *conn, &code)
            .await?
            .ok_or_else(|| CoreError::CouponNotFound(code.clone()))?;
        ensure_redeemable(&coupon, now)?;

        if let Some(customer_id) = sale_customer {
            if customer_id != coupon.customer_id {
                return Err(
                    CoreError::invalid_coupon(code, "coupon belongs to another customer").into(),
                );
            }
        }

        Ok(coupon)
    }

    /// Flips the coupon to used by `sale_id`. Loses cleanly to a concurrent
    /// redemption with `CouponAlreadyUsed`.
    pub async fn redeem_in(
        conn: &mut SqliteConnection,
        coupon: &Coupon,
        sale_id: &str,
        now: DateTime<Utc>,
    ) -> LedgerResult<()> {
        if CouponRepository::redeem_in(conn, &coupon.id, sale_id, now).await? {
            Ok(())
        } else {
            Err(CoreError::CouponAlreadyUsed(coupon.code.clone()).into())
        }
    }

    /// A customer's coupons, newest first.
    pub async fn list_for_customer(
        &self,
        actor: &Actor,
        customer_id: &str,
    ) -> LedgerResult<Vec<Coupon>> {
        actor.authorize(Permission::ReadRecords)?;
        if self.db.customers().get_by_id(customer_id).await?.is_none() {
            return Err(CoreError::not_found("Customer", customer_id).into());
        }
        Ok(self.db.coupons().list_for_customer(customer_id).await?)
    }
}

fn ensure_redeemable(coupon: &Coupon, now: DateTime<Utc>) -> Result<(), CoreError> {
    if coupon.is_used {
        return Err(CoreError::CouponAlreadyUsed(coupon.code.clone()));
    }
    if coupon.is_expired(now) {
        return Err(CoreError::CouponExpired(coupon.code.clone()));
    }
    Ok(())
}
