//! # Loyalty Accrual
//!
//! Credits points for a completed sale and mints a reward coupon for every
//! threshold the new balance crosses.
//!
//! Runs after the sale has committed, in its own transaction. A failure here
//! never undoes the sale; the caller turns it into a receipt warning.

use async_trait::async_trait;
use chrono::Utc;
use tracing::info;

use tally_core::{
    CoreError, CouponSource, DiscountType, LoyaltyAward, LoyaltyOutcome, LoyaltyPolicy, Money,
};
use tally_db::{CustomerRepository, Database};

use crate::coupon::{CouponEngine, CouponTerms};
use crate::error::LedgerResult;
use crate::retry::RetryPolicy;

/// Post-sale loyalty step.
///
/// The sale processor only knows this seam, so tests can swap in a program
/// that fails or records calls.
#[async_trait]
pub trait LoyaltyProgram: Send + Sync {
    /// Credits a completed sale. `Ok(None)` for walk-in sales.
    async fn credit(
        &self,
        customer_id: Option<&str>,
        grand_total: Money,
    ) -> LedgerResult<Option<LoyaltyOutcome>>;
}

/// Points and reward coupons stored in SQLite.
#[derive(Debug, Clone)]
pub struct LoyaltyAccrual {
    db: Database,
    policy: LoyaltyPolicy,
    retry: RetryPolicy,
}

impl LoyaltyAccrual {
    pub fn new(db: Database, policy: LoyaltyPolicy, retry: RetryPolicy) -> Self {
        LoyaltyAccrual { db, policy, retry }
    }

    pub fn policy(&self) -> &LoyaltyPolicy {
        &self.policy
    }

    async fn credit_once(
        &self,
        customer_id: &str,
        grand_total: Money,
    ) -> LedgerResult<LoyaltyOutcome> {
        let now = Utc::now();
        let points = self.policy.points_for(grand_total);

        let mut tx = self.db.begin().await?;

        // The increment is a single UPDATE; the award is read back from the
        // balance it left.
        let credited = CustomerRepository::credit_loyalty_in(&mut tx, customer_id, points, now)
            .await?
            .ok_or_else(|| CoreError::not_found("Customer", customer_id))?;
        let LoyaltyAward {
            points_earned,
            new_balance,
            coupons_due,
        } = self.policy.award(credited - points, grand_total);

        let terms = CouponTerms {
            discount_type: DiscountType::Percentage,
            discount_value: i64::from(self.policy.reward_rate.bps()),
            expiry_days: self.policy.reward_expiry_days,
            source: CouponSource::Loyalty,
        };

        let mut coupons_issued = Vec::new();
        for _ in 0..coupons_due {
            coupons_issued.push(CouponEngine::issue_in(&mut tx, customer_id, terms, now).await?);
        }

        tx.commit().await?;

        info!(
            customer_id = %customer_id,
            points_earned,
            new_balance,
            coupons = coupons_issued.len(),
            "Loyalty credited"
        );

        Ok(LoyaltyOutcome {
            customer_id: customer_id.to_string(),
            points_earned,
            new_balance,
            coupons_issued,
        })
    }
}

#[async_trait]
impl LoyaltyProgram for LoyaltyAccrual {
    async fn credit(
        &self,
        customer_id: Option<&str>,
        grand_total: Money,
    ) -> LedgerResult<Option<LoyaltyOutcome>> {
        let Some(customer_id) = customer_id else {
            return Ok(None);
        };

        let outcome = self
            .retry
            .run("loyalty_credit", || self.credit_once(customer_id, grand_total))
            .await?;
        Ok(Some(outcome))
    }
}
