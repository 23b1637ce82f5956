//! Racing writers against a file-backed database with a real pool.

mod common;

use std::collections::HashSet;

use common::*;
use tally_core::{CoreError, DiscountType, NewSale, SaleReceipt};
use tally_ledger::{Engine, LedgerError, LedgerResult};
use tokio::task::JoinHandle;

fn spawn_sale(engine: &Engine, input: NewSale) -> JoinHandle<LedgerResult<SaleReceipt>> {
    let engine = engine.clone();
    tokio::spawn(async move { engine.create_sale(&cashier(), &input).await })
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_last_unit_is_sold_once() {
    let (engine, _dir) = file_engine().await;
    let lamp = stocked_product(&engine, "LAMP", 30_000, 1).await;

    let racers: Vec<_> = (0..4)
        .map(|_| spawn_sale(&engine, sale(&[(lamp.id.as_str(), 1)])))
        .collect();

    let mut sold = 0;
    let mut refused = 0;
    for racer in racers {
        match racer.await.unwrap() {
            Ok(_) => sold += 1,
            Err(LedgerError::Core(CoreError::OutOfStock { shortfalls })) => {
                assert_eq!(shortfalls[0].available, 0);
                refused += 1;
            }
            Err(other) => panic!("unexpected error: {other:?}"),
        }
    }

    assert_eq!(sold, 1);
    assert_eq!(refused, 3);
    assert_eq!(stock_of(&engine, &lamp.id).await, 0);
    assert_eq!(engine.database().sales().count().await.unwrap(), 1);
    assert_consistent(&engine, &lamp.id).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_parallel_sales_get_unique_invoices() {
    let (engine, _dir) = file_engine().await;
    let pen = stocked_product(&engine, "PEN", 1_000, 10).await;

    let racers: Vec<_> = (0..10)
        .map(|_| spawn_sale(&engine, sale(&[(pen.id.as_str(), 1)])))
        .collect();

    let mut invoices = HashSet::new();
    for racer in racers {
        let receipt = racer.await.unwrap().unwrap();
        assert!(invoices.insert(receipt.sale.invoice_number));
    }

    assert_eq!(invoices.len(), 10);
    for n in 1..=10 {
        assert!(invoices.contains(&format!("INV-{n:06}")));
    }
    assert_eq!(stock_of(&engine, &pen.id).await, 0);
    assert_consistent(&engine, &pen.id).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_coupon_redeemed_by_one_of_two_concurrent_sales() {
    let (engine, _dir) = file_engine().await;
    let pen = stocked_product(&engine, "PEN", 10_000, 10).await;
    let zara = customer(&engine, "Zara").await;
    let coupon = engine
        .generate_coupon(&manager(), &zara.id, DiscountType::Percentage, 2_000, 30)
        .await
        .unwrap();

    let racers: Vec<_> = (0..2)
        .map(|_| {
            spawn_sale(
                &engine,
                NewSale {
                    customer_id: Some(zara.id.clone()),
                    coupon_code: Some(coupon.code.clone()),
                    ..sale(&[(pen.id.as_str(), 1)])
                },
            )
        })
        .collect();

    let mut winners = Vec::new();
    let mut losers = 0;
    for racer in racers {
        match racer.await.unwrap() {
            Ok(receipt) => winners.push(receipt.sale),
            Err(LedgerError::Core(CoreError::CouponAlreadyUsed(code))) => {
                assert_eq!(code, coupon.code);
                losers += 1;
            }
            Err(other) => panic!("unexpected error: {other:?}"),
        }
    }

    assert_eq!(winners.len(), 1);
    assert_eq!(losers, 1);
    assert_eq!(winners[0].coupon_id.as_deref(), Some(coupon.id.as_str()));

    // The losing sale left no trace.
    assert_eq!(stock_of(&engine, &pen.id).await, 9);
    assert_eq!(engine.database().sales().count().await.unwrap(), 1);
    let stored = engine.database().coupons().get_by_id(&coupon.id).await.unwrap().unwrap();
    assert_eq!(stored.used_in_sale_id.as_deref(), Some(winners[0].id.as_str()));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_reversal_and_sale_race_keeps_stock_non_negative() {
    let (engine, _dir) = file_engine().await;
    let rope = stocked_product(&engine, "ROPE", 4_000, 0).await;
    let received = engine
        .create_purchase(&manager(), &purchase(&[(rope.id.as_str(), 5, 2_000)]))
        .await
        .unwrap();

    let reverser = {
        let engine = engine.clone();
        let id = received.id.clone();
        tokio::spawn(async move { engine.delete_purchase(&manager(), &id).await })
    };
    let seller = spawn_sale(&engine, sale(&[(rope.id.as_str(), 1)]));

    let reversal = reverser.await.unwrap();
    let sold = seller.await.unwrap();

    match (&reversal, &sold) {
        (Ok(_), Err(LedgerError::Core(CoreError::OutOfStock { .. }))) => {
            assert_eq!(stock_of(&engine, &rope.id).await, 0);
        }
        (Err(LedgerError::Core(CoreError::ReversalConflict { .. })), Ok(_)) => {
            assert_eq!(stock_of(&engine, &rope.id).await, 4);
        }
        other => panic!("exactly one side should win, got {other:?}"),
    }
    assert_consistent(&engine, &rope.id).await;
}
