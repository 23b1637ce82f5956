mod common;

use chrono::NaiveDate;
use common::*;
use tally_core::{
    CoreError, DocumentKind, NewPurchase, PurchaseStatus, StockReason, ValidationError,
    MAX_LINE_QUANTITY, MAX_PRICE_CENTS,
};
use tally_ledger::LedgerError;

#[tokio::test]
async fn test_purchase_receives_stock() {
    let engine = memory_engine().await;
    let flour = stocked_product(&engine, "FLOUR", 20_000, 0).await;
    let sugar = stocked_product(&engine, "SUGAR", 15_000, 3).await;

    let purchase = engine
        .create_purchase(
            &manager(),
            &NewPurchase {
                notes: Some("weekly order".to_string()),
                purchase_date: NaiveDate::from_ymd_opt(2026, 3, 14),
                ..purchase(&[(flour.id.as_str(), 10, 9_000), (sugar.id.as_str(), 5, 7_550)])
            },
        )
        .await
        .unwrap();

    assert_eq!(purchase.purchase_number, "PO-000001");
    assert_eq!(purchase.status, PurchaseStatus::Completed);
    assert_eq!(purchase.total_amount_cents, 90_000 + 37_750);
    assert_eq!(purchase.items[1].line_total_cents, 37_750);
    assert_eq!(purchase.purchase_date, NaiveDate::from_ymd_opt(2026, 3, 14).unwrap());
    assert_eq!(purchase.created_by, "manager-1");

    assert_eq!(stock_of(&engine, &flour.id).await, 10);
    assert_eq!(stock_of(&engine, &sugar.id).await, 8);
    assert_consistent(&engine, &flour.id).await;

    let entries = engine
        .database()
        .stock_transactions()
        .for_origin(DocumentKind::Purchase, &purchase.id)
        .await
        .unwrap();
    assert_eq!(entries.len(), 2);
    assert!(entries.iter().all(|t| t.reason == StockReason::Purchase));

    let stored = engine.get_purchase(&cashier(), &purchase.id).await.unwrap();
    assert_eq!(stored.items.len(), 2);
    assert_eq!(stored.notes.as_deref(), Some("weekly order"));
}

#[tokio::test]
async fn test_purchase_rejects_inactive_product_and_cashier() {
    let engine = memory_engine().await;
    let flour = stocked_product(&engine, "FLOUR", 20_000, 0).await;
    let old = stocked_product(&engine, "OLD", 20_000, 0).await;
    engine.deactivate_product(&admin(), &old.id).await.unwrap();

    let err = engine
        .create_purchase(
            &manager(),
            &purchase(&[(flour.id.as_str(), 1, 100), (old.id.as_str(), 1, 100)]),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::Core(CoreError::ProductInactive(_))));

    let err = engine
        .create_purchase(&cashier(), &purchase(&[(flour.id.as_str(), 1, 100)]))
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::Core(CoreError::Forbidden { .. })));

    assert_eq!(stock_of(&engine, &flour.id).await, 0);
    assert_eq!(engine.database().purchases().count().await.unwrap(), 0);
}

#[tokio::test]
async fn test_cost_above_the_ceiling_is_rejected() {
    let engine = memory_engine().await;
    let flour = stocked_product(&engine, "FLOUR", 20_000, 0).await;

    let err = engine
        .create_purchase(&manager(), &purchase(&[(flour.id.as_str(), 3, i64::MAX / 2)]))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        LedgerError::Core(CoreError::Validation(ValidationError::OutOfRange { .. }))
    ));

    assert_eq!(stock_of(&engine, &flour.id).await, 0);
    assert_eq!(engine.database().purchases().count().await.unwrap(), 0);
}

#[tokio::test]
async fn test_largest_allowed_line_is_totalled_exactly() {
    let engine = memory_engine().await;
    let flour = stocked_product(&engine, "FLOUR", 20_000, 0).await;
    let sugar = stocked_product(&engine, "SUGAR", 20_000, 0).await;

    let purchase = engine
        .create_purchase(
            &manager(),
            &purchase(&[
                (flour.id.as_str(), MAX_LINE_QUANTITY, MAX_PRICE_CENTS),
                (sugar.id.as_str(), 1, MAX_PRICE_CENTS),
            ]),
        )
        .await
        .unwrap();

    assert_eq!(
        purchase.total_amount_cents,
        MAX_PRICE_CENTS * MAX_LINE_QUANTITY + MAX_PRICE_CENTS
    );
    assert_eq!(stock_of(&engine, &flour.id).await, MAX_LINE_QUANTITY);
}

#[tokio::test]
async fn test_reversal_takes_stock_back_out() {
    let engine = memory_engine().await;
    let flour = stocked_product(&engine, "FLOUR", 20_000, 2).await;

    let received = engine
        .create_purchase(&manager(), &purchase(&[(flour.id.as_str(), 10, 9_000)]))
        .await
        .unwrap();
    assert_eq!(stock_of(&engine, &flour.id).await, 12);

    let reversed = engine.delete_purchase(&manager(), &received.id).await.unwrap();
    assert_eq!(reversed.status, PurchaseStatus::Reversed);
    assert_eq!(reversed.reversed_by.as_deref(), Some("manager-1"));
    assert!(reversed.reversed_at.is_some());

    assert_eq!(stock_of(&engine, &flour.id).await, 2);
    assert_consistent(&engine, &flour.id).await;

    let err = engine.delete_purchase(&manager(), &received.id).await.unwrap_err();
    assert!(matches!(
        err,
        LedgerError::Core(CoreError::InvalidStatus { ref status, .. }) if status == "reversed"
    ));
    assert_eq!(stock_of(&engine, &flour.id).await, 2);
}

#[tokio::test]
async fn test_reversal_after_units_were_sold_is_refused() {
    let engine = memory_engine().await;
    let flour = stocked_product(&engine, "FLOUR", 20_000, 0).await;

    let received = engine
        .create_purchase(&manager(), &purchase(&[(flour.id.as_str(), 10, 9_000)]))
        .await
        .unwrap();
    engine
        .create_sale(&cashier(), &sale(&[(flour.id.as_str(), 3)]))
        .await
        .unwrap();

    let err = engine.delete_purchase(&manager(), &received.id).await.unwrap_err();
    match err {
        LedgerError::Core(CoreError::ReversalConflict {
            purchase_id,
            shortfalls,
        }) => {
            assert_eq!(purchase_id, received.id);
            assert_eq!(shortfalls.len(), 1);
            assert_eq!(shortfalls[0].available, 7);
            assert_eq!(shortfalls[0].requested, 10);
        }
        other => panic!("expected ReversalConflict, got {other:?}"),
    }

    assert_eq!(stock_of(&engine, &flour.id).await, 7);
    let stored = engine.get_purchase(&admin(), &received.id).await.unwrap();
    assert_eq!(stored.status, PurchaseStatus::Completed);
    assert!(stored.reversed_at.is_none());
    assert_consistent(&engine, &flour.id).await;
}

#[tokio::test]
async fn test_reversal_of_unknown_purchase_is_not_found() {
    let engine = memory_engine().await;
    let err = engine.delete_purchase(&admin(), "missing").await.unwrap_err();
    assert!(matches!(
        err,
        LedgerError::Core(CoreError::NotFound { ref entity, .. }) if entity == "Purchase"
    ));
}
