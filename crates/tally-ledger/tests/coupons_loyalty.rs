mod common;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use common::*;
use tally_core::{
    Coupon, CouponSource, CoreError, DiscountType, LoyaltyOutcome, Money, NewSale,
    ValidationError,
};
use tally_db::{CouponRepository, CustomerRepository};
use tally_ledger::{Engine, LedgerError, LedgerResult, LoyaltyProgram};

async fn give_points(engine: &Engine, customer_id: &str, points: i64) {
    let mut tx = engine.database().begin().await.unwrap();
    CustomerRepository::credit_loyalty_in(&mut tx, customer_id, points, Utc::now())
        .await
        .unwrap()
        .unwrap();
    tx.commit().await.unwrap();
}

fn customer_sale(customer_id: &str, lines: &[(&str, i64)]) -> NewSale {
    NewSale {
        customer_id: Some(customer_id.to_string()),
        ..sale(lines)
    }
}

// =============================================================================
// Coupons
// =============================================================================

#[tokio::test]
async fn test_generate_and_validate() {
    let engine = memory_engine().await;
    let sana = customer(&engine, "Sana").await;

    let coupon = engine
        .generate_coupon(&manager(), &sana.id, DiscountType::Percentage, 1_500, 14)
        .await
        .unwrap();
    assert!(coupon.code.starts_with("CPN-"));
    assert_eq!(coupon.code.len(), 10);
    assert_eq!(coupon.source, CouponSource::Manual);
    assert!(!coupon.is_used);
    let days = (coupon.expires_at - coupon.created_at).num_days();
    assert_eq!(days, 14);

    let check = engine
        .validate_coupon(&cashier(), &format!("  {}  ", coupon.code.to_lowercase()))
        .await
        .unwrap();
    assert_eq!(check.coupon.id, coupon.id);
    assert_eq!(check.customer.id, sana.id);

    let listed = engine.customer_coupons(&cashier(), &sana.id).await.unwrap();
    assert_eq!(listed.len(), 1);
}

#[tokio::test]
async fn test_generate_rejections() {
    let engine = memory_engine().await;
    let sana = customer(&engine, "Sana").await;

    let err = engine
        .generate_coupon(&cashier(), &sana.id, DiscountType::Fixed, 1_000, 30)
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::Core(CoreError::Forbidden { .. })));

    let err = engine
        .generate_coupon(&manager(), &sana.id, DiscountType::Percentage, 10_001, 30)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        LedgerError::Core(CoreError::Validation(ValidationError::OutOfRange { .. }))
    ));

    let err = engine
        .generate_coupon(&manager(), &sana.id, DiscountType::Fixed, 1_000, 0)
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::Core(CoreError::Validation(_))));

    let err = engine
        .generate_coupon(&manager(), "ghost", DiscountType::Fixed, 1_000, 30)
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::Core(CoreError::NotFound { .. })));
}

#[tokio::test]
async fn test_unknown_and_malformed_codes_are_not_found() {
    let engine = memory_engine().await;

    for code in ["CPN-ZZZZZZ", "nonsense", ""] {
        let err = engine.validate_coupon(&cashier(), code).await.unwrap_err();
        assert!(
            matches!(err, LedgerError::Core(CoreError::CouponNotFound(_))),
            "code {code:?} gave {err:?}"
        );
    }
}

#[tokio::test]
async fn test_coupon_redeems_once() {
    let engine = memory_engine().await;
    let pen = stocked_product(&engine, "PEN", 10_000, 10).await;
    let sana = customer(&engine, "Sana").await;
    let coupon = engine
        .generate_coupon(&manager(), &sana.id, DiscountType::Fixed, 1_000, 30)
        .await
        .unwrap();

    let first = engine
        .create_sale(
            &cashier(),
            &NewSale {
                coupon_code: Some(coupon.code.clone()),
                ..customer_sale(&sana.id, &[(pen.id.as_str(), 1)])
            },
        )
        .await
        .unwrap();
    assert_eq!(first.sale.discount_cents, 1_000);

    let redeemed = engine.database().coupons().get_by_id(&coupon.id).await.unwrap().unwrap();
    assert!(redeemed.is_used);
    assert_eq!(redeemed.used_in_sale_id.as_deref(), Some(first.sale.id.as_str()));
    assert!(redeemed.used_at.is_some());

    let err = engine
        .create_sale(
            &cashier(),
            &NewSale {
                coupon_code: Some(coupon.code.clone()),
                ..customer_sale(&sana.id, &[(pen.id.as_str(), 1)])
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::Core(CoreError::CouponAlreadyUsed(_))));
    assert_eq!(stock_of(&engine, &pen.id).await, 9);

    let err = engine.validate_coupon(&cashier(), &coupon.code).await.unwrap_err();
    assert!(matches!(err, LedgerError::Core(CoreError::CouponAlreadyUsed(_))));
}

#[tokio::test]
async fn test_expired_coupon_is_refused() {
    let engine = memory_engine().await;
    let pen = stocked_product(&engine, "PEN", 10_000, 10).await;
    let sana = customer(&engine, "Sana").await;

    let now = Utc::now();
    let expired = Coupon {
        id: "coupon-expired".to_string(),
        code: "CPN-EXP001".to_string(),
        customer_id: sana.id.clone(),
        discount_type: DiscountType::Percentage,
        discount_value: 500,
        expires_at: now - Duration::days(1),
        is_used: false,
        used_in_sale_id: None,
        used_at: None,
        source: CouponSource::Manual,
        created_at: now - Duration::days(31),
    };
    {
        let mut conn = engine.database().pool().acquire().await.unwrap();
        CouponRepository::insert_in(&mut conn, &expired).await.unwrap();
    }

    let err = engine.validate_coupon(&cashier(), "CPN-EXP001").await.unwrap_err();
    assert!(matches!(err, LedgerError::Core(CoreError::CouponExpired(_))));

    let err = engine
        .create_sale(
            &cashier(),
            &NewSale {
                coupon_code: Some("CPN-EXP001".to_string()),
                ..customer_sale(&sana.id, &[(pen.id.as_str(), 1)])
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::Core(CoreError::CouponExpired(_))));
    assert_eq!(stock_of(&engine, &pen.id).await, 10);
}

#[tokio::test]
async fn test_coupon_is_bound_to_its_owner() {
    let engine = memory_engine().await;
    let pen = stocked_product(&engine, "PEN", 10_000, 10).await;
    let sana = customer(&engine, "Sana").await;
    let omar = customer(&engine, "Omar").await;
    let coupon = engine
        .generate_coupon(&manager(), &sana.id, DiscountType::Fixed, 1_000, 30)
        .await
        .unwrap();

    let err = engine
        .create_sale(
            &cashier(),
            &NewSale {
                coupon_code: Some(coupon.code.clone()),
                ..customer_sale(&omar.id, &[(pen.id.as_str(), 1)])
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::Core(CoreError::InvalidCoupon { .. })));
    assert_eq!(stock_of(&engine, &pen.id).await, 10);

    // Presented at the register without a customer, the sale becomes the owner's.
    let receipt = engine
        .create_sale(
            &cashier(),
            &NewSale {
                coupon_code: Some(coupon.code.clone()),
                ..sale(&[(pen.id.as_str(), 1)])
            },
        )
        .await
        .unwrap();
    assert_eq!(receipt.sale.customer_id.as_deref(), Some(sana.id.as_str()));
    assert_eq!(receipt.loyalty.map(|l| l.customer_id), Some(sana.id.clone()));
}

// =============================================================================
// Loyalty
// =============================================================================

#[tokio::test]
async fn test_sale_credits_points_without_reward_below_threshold() {
    let engine = memory_engine().await;
    let kettle = stocked_product(&engine, "KETTLE", 50_000, 10).await;
    let sana = customer(&engine, "Sana").await;

    // 2 x 500.00 + 10% tax = 1100.00 -> 11 points
    let receipt = engine
        .create_sale(&cashier(), &customer_sale(&sana.id, &[(kettle.id.as_str(), 2)]))
        .await
        .unwrap();

    let loyalty = receipt.loyalty.unwrap();
    assert_eq!(loyalty.points_earned, 11);
    assert_eq!(loyalty.new_balance, 11);
    assert!(loyalty.coupons_issued.is_empty());

    let stored = engine.get_customer(&cashier(), &sana.id).await.unwrap();
    assert_eq!(stored.loyalty_points, 11);
}

#[tokio::test]
async fn test_crossing_one_threshold_issues_one_reward() {
    let engine = memory_engine().await;
    let tv = stocked_product(&engine, "TV", 100_000, 100).await;
    let sana = customer(&engine, "Sana").await;
    give_points(&engine, &sana.id, 480).await;

    // 7 x 1000.00 + tax = 7700.00 -> 77 points, 480 -> 557
    let receipt = engine
        .create_sale(&cashier(), &customer_sale(&sana.id, &[(tv.id.as_str(), 7)]))
        .await
        .unwrap();

    let loyalty = receipt.loyalty.unwrap();
    assert_eq!(loyalty.points_earned, 77);
    assert_eq!(loyalty.new_balance, 557);
    assert_eq!(loyalty.coupons_issued.len(), 1);

    let reward = &loyalty.coupons_issued[0];
    assert_eq!(reward.customer_id, sana.id);
    assert_eq!(reward.source, CouponSource::Loyalty);
    assert_eq!(reward.discount_type, DiscountType::Percentage);
    assert_eq!(reward.discount_value, 500);
    assert_eq!((reward.expires_at - reward.created_at).num_days(), 30);

    let listed = engine.customer_coupons(&admin(), &sana.id).await.unwrap();
    assert_eq!(listed.len(), 1);
}

#[tokio::test]
async fn test_crossing_two_thresholds_issues_two_rewards() {
    let engine = memory_engine().await;
    let tv = stocked_product(&engine, "TV", 100_000, 100).await;
    let sana = customer(&engine, "Sana").await;
    give_points(&engine, &sana.id, 480).await;

    // 52 x 1000.00 + tax = 57200.00 -> 572 points, 480 -> 1052
    let receipt = engine
        .create_sale(&cashier(), &customer_sale(&sana.id, &[(tv.id.as_str(), 52)]))
        .await
        .unwrap();

    let loyalty = receipt.loyalty.unwrap();
    assert_eq!(loyalty.new_balance, 1_052);
    assert_eq!(loyalty.coupons_issued.len(), 2);
    assert_ne!(loyalty.coupons_issued[0].code, loyalty.coupons_issued[1].code);
}

#[tokio::test]
async fn test_staying_inside_a_band_issues_nothing_more() {
    let engine = memory_engine().await;
    let tv = stocked_product(&engine, "TV", 100_000, 100).await;
    let sana = customer(&engine, "Sana").await;
    give_points(&engine, &sana.id, 499).await;

    // 1100.00 -> 11 points each: 499 -> 510 -> 521
    let first = engine
        .create_sale(&cashier(), &customer_sale(&sana.id, &[(tv.id.as_str(), 1)]))
        .await
        .unwrap()
        .loyalty
        .unwrap();
    assert_eq!(first.new_balance, 510);
    assert_eq!(first.coupons_issued.len(), 1);

    let second = engine
        .create_sale(&cashier(), &customer_sale(&sana.id, &[(tv.id.as_str(), 1)]))
        .await
        .unwrap()
        .loyalty
        .unwrap();
    assert_eq!(second.points_earned, 11);
    assert_eq!(second.new_balance, 521);
    assert!(second.coupons_issued.is_empty());
}

#[tokio::test]
async fn test_walk_in_sale_earns_nothing() {
    let engine = memory_engine().await;
    let tv = stocked_product(&engine, "TV", 100_000, 10).await;

    let receipt = engine
        .create_sale(&cashier(), &sale(&[(tv.id.as_str(), 1)]))
        .await
        .unwrap();
    assert!(receipt.loyalty.is_none());
    assert!(receipt.warnings.is_empty());
}

struct BrokenLoyalty;

#[async_trait]
impl LoyaltyProgram for BrokenLoyalty {
    async fn credit(
        &self,
        _customer_id: Option<&str>,
        _grand_total: Money,
    ) -> LedgerResult<Option<LoyaltyOutcome>> {
        Err(LedgerError::conflict("loyalty_credit"))
    }
}

#[tokio::test]
async fn test_loyalty_failure_leaves_sale_standing_with_warning() {
    let engine = Engine::with_loyalty(memory_db().await, config(), Arc::new(BrokenLoyalty));
    let tv = stocked_product(&engine, "TV", 100_000, 10).await;
    let sana = customer(&engine, "Sana").await;

    let receipt = engine
        .create_sale(&cashier(), &customer_sale(&sana.id, &[(tv.id.as_str(), 2)]))
        .await
        .unwrap();

    assert!(receipt.loyalty.is_none());
    assert_eq!(receipt.warnings.len(), 1);
    assert!(receipt.warnings[0].starts_with("Loyalty points were not credited"));

    let stored = engine.get_sale(&admin(), &receipt.sale.id).await.unwrap();
    assert_eq!(stored.grand_total_cents, 220_000);
    assert_eq!(stock_of(&engine, &tv.id).await, 8);
    let stored = engine.get_customer(&admin(), &sana.id).await.unwrap();
    assert_eq!(stored.loyalty_points, 0);
}
