//! # Loyalty Arithmetic
//!
//! Points earned per sale and reward coupons owed at point thresholds.
//!
//! ```text
//!   old points: 480            grand total: 7000.00
//!        │                            │
//!        │                  floor(7000.00 / 100.00) = 70
//!        ▼                            ▼
//!   new points: 550  ──►  floor(550/500) − floor(480/500) = 1 coupon
//! ```
//!
//! A sale that jumps several thresholds at once earns one coupon per
//! threshold crossed (480 → 1050 earns two).

use crate::money::{Money, Rate};
use crate::{
    DEFAULT_CENTS_PER_POINT, DEFAULT_POINTS_PER_COUPON, DEFAULT_REWARD_EXPIRY_DAYS,
    DEFAULT_REWARD_PERCENTAGE_BPS,
};

/// Loyalty program parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoyaltyPolicy {
    /// Spend needed for one point (10000 cents = 100.00).
    pub cents_per_point: i64,
    /// Every multiple of this many points mints a reward coupon.
    pub points_per_coupon: i64,
    /// Percentage discount on reward coupons.
    pub reward_rate: Rate,
    pub reward_expiry_days: i64,
}

impl Default for LoyaltyPolicy {
    fn default() -> Self {
        LoyaltyPolicy {
            cents_per_point: DEFAULT_CENTS_PER_POINT,
            points_per_coupon: DEFAULT_POINTS_PER_COUPON,
            reward_rate: Rate::from_bps(DEFAULT_REWARD_PERCENTAGE_BPS),
            reward_expiry_days: DEFAULT_REWARD_EXPIRY_DAYS,
        }
    }
}

/// What a single sale is worth to a customer's loyalty account.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoyaltyAward {
    pub points_earned: i64,
    pub new_balance: i64,
    /// Reward coupons to mint, one per threshold crossed.
    pub coupons_due: i64,
}

impl LoyaltyPolicy {
    /// Points for a grand total, rounded down.
    pub fn points_for(&self, grand_total: Money) -> i64 {
        grand_total.whole_blocks_of(Money::from_cents(self.cents_per_point))
    }

    /// Thresholds crossed moving from `old_points` to `new_points`.
    pub fn thresholds_crossed(&self, old_points: i64, new_points: i64) -> i64 {
        if self.points_per_coupon <= 0 || new_points <= old_points {
            return 0;
        }
        let before = old_points.max(0) / self.points_per_coupon;
        let after = new_points.max(0) / self.points_per_coupon;
        after - before
    }

    /// Full award for a sale credited to a customer holding `old_points`.
    ///
    /// ```rust
    /// use tally_core::loyalty::LoyaltyPolicy;
    /// use tally_core::money::Money;
    ///
    /// let award = LoyaltyPolicy::default().award(480, Money::from_units(7000));
    /// assert_eq!(award.points_earned, 70);
    /// assert_eq!(award.new_balance, 550);
    /// assert_eq!(award.coupons_due, 1);
    /// ```
    pub fn award(&self, old_points: i64, grand_total: Money) -> LoyaltyAward {
        let points_earned = self.points_for(grand_total);
        let new_balance = old_points + points_earned;
        LoyaltyAward {
            points_earned,
            new_balance,
            coupons_due: self.thresholds_crossed(old_points, new_balance),
        }
    }
}
