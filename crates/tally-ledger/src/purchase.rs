//! # Purchase Processor
//!
//! Receiving goods from a supplier, and undoing a receipt.
//!
//! ```text
//! create:  begin ─► PO number ─► products exist & active ─► stock-in per line
//!                ─► purchase + items ─► commit
//!
//! reverse: begin ─► completed → reversed ─► stock-out per line
//!                       │                        │
//!                       │                        └─ short? ReversalConflict,
//!                       │                           rollback (still completed)
//!                       └─ already reversed? InvalidStatus
//! ```

use chrono::Utc;
use tracing::info;

use tally_core::pricing::{document_sum, line_total};
use tally_core::validation::{
    validate_cost_price, validate_id, validate_lines, validate_notes, validate_quantity,
};
use tally_core::{
    Actor, CoreError, DocumentKind, DocumentRef, Money, NewPurchase, Permission, Purchase,
    PurchaseItem, PurchaseStatus, StockDelta, StockReason,
};
use tally_db::{new_id, Database, ProductRepository, PurchaseRepository, SequenceRepository};

use crate::error::LedgerResult;
use crate::stock::StockLedger;

#[derive(Debug, Clone)]
pub struct PurchaseProcessor {
    db: Database,
}

impl PurchaseProcessor {
    pub fn new(db: Database) -> Self {
        PurchaseProcessor { db }
    }

    /// Records received goods and adds them to stock.
    pub async fn create_purchase(
        &self,
        actor: &Actor,
        input: &NewPurchase,
    ) -> LedgerResult<Purchase> {
        actor.authorize(Permission::ManagePurchases)?;
        validate_id("supplierId", &input.supplier_id)?;
        validate_lines(input.items.iter().map(|l| l.product_id.as_str()))?;
        for line in &input.items {
            validate_quantity(line.quantity)?;
            validate_cost_price(line.cost_price_cents)?;
        }
        validate_notes(input.notes.as_deref())?;

        let now = Utc::now();
        let purchase_id = new_id();
        let mut tx = self.db.begin().await?;

        let purchase_number =
            SequenceRepository::next_document_number_in(&mut tx, DocumentKind::Purchase).await?;

        let mut items = Vec::with_capacity(input.items.len());
        for (idx, line) in input.items.iter().enumerate() {
            let product = ProductRepository::find_in(&mut tx, &line.product_id)
                .await?
                .ok_or_else(|| CoreError::not_found("Product", &line.product_id))?;
            if !product.is_active {
                return Err(CoreError::ProductInactive(product.id).into());
            }

            let cost = Money::from_cents(line.cost_price_cents);
            items.push(PurchaseItem {
                id: new_id(),
                purchase_id: purchase_id.clone(),
                line_no: idx as i64 + 1,
                product_id: product.id,
                product_name: product.name,
                quantity: line.quantity,
                cost_price_cents: cost.cents(),
                line_total_cents: line_total(cost, line.quantity)?.cents(),
            });
        }

        let total = document_sum(
            "totalAmount",
            items.iter().map(|item| Money::from_cents(item.line_total_cents)),
        )?;

        let deltas: Vec<StockDelta> = items
            .iter()
            .map(|item| {
                StockDelta::stock_in(
                    &item.product_id,
                    item.quantity,
                    StockReason::Purchase,
                    &actor.id,
                )
                .with_origin(DocumentRef::purchase(&purchase_id))
            })
            .collect();
        StockLedger::apply_deltas_in(&mut tx, &deltas, now).await?;

        let purchase = Purchase {
            id: purchase_id,
            purchase_number,
            supplier_id: input.supplier_id.trim().to_string(),
            status: PurchaseStatus::Completed,
            total_amount_cents: total.cents(),
            notes: input.notes.clone(),
            purchase_date: input.purchase_date.unwrap_or_else(|| now.date_naive()),
            created_by: actor.id.clone(),
            created_at: now,
            reversed_at: None,
            reversed_by: None,
            items,
        };
        PurchaseRepository::insert_in(&mut tx, &purchase).await?;

        tx.commit().await?;

        info!(
            purchase_id = %purchase.id,
            number = %purchase.purchase_number,
            supplier_id = %purchase.supplier_id,
            lines = purchase.items.len(),
            total = %total,
            actor = %actor.id,
            "Purchase received"
        );
        Ok(purchase)
    }

    /// Reverses a completed purchase, taking its units back out of stock.
    ///
    /// Fails with `ReversalConflict` when some of those units were already
    /// sold; nothing changes in that case.
    pub async fn delete_purchase(
        &self,
        actor: &Actor,
        purchase_id: &str,
    ) -> LedgerResult<Purchase> {
        actor.authorize(Permission::ManagePurchases)?;
        validate_id("purchaseId", purchase_id)?;

        let now = Utc::now();
        let mut tx = self.db.begin().await?;

        if !PurchaseRepository::reverse_in(&mut tx, purchase_id, &actor.id, now).await? {
            let err = match PurchaseRepository::find_in(&mut tx, purchase_id).await? {
                Some(purchase) => CoreError::InvalidStatus {
                    entity: "Purchase".to_string(),
                    id: purchase_id.to_string(),
                    status: purchase.status.as_str().to_string(),
                },
                None => CoreError::not_found("Purchase", purchase_id),
            };
            return Err(err.into());
        }

        let purchase = PurchaseRepository::find_in(&mut tx, purchase_id)
            .await?
            .ok_or_else(|| CoreError::not_found("Purchase", purchase_id))?;

        let deltas: Vec<StockDelta> = purchase
            .items
            .iter()
            .map(|item| {
                StockDelta::stock_out(
                    &item.product_id,
                    item.quantity,
                    StockReason::PurchaseReversal,
                    &actor.id,
                )
                .with_origin(DocumentRef::purchase(purchase_id))
            })
            .collect();
        if let Err(shortfalls) = StockLedger::try_apply_in(&mut tx, &deltas, now).await? {
            return Err(CoreError::ReversalConflict {
                purchase_id: purchase_id.to_string(),
                shortfalls,
            }
            .into());
        }

        tx.commit().await?;

        info!(
            purchase_id = %purchase.id,
            number = %purchase.purchase_number,
            lines = purchase.items.len(),
            actor = %actor.id,
            "Purchase reversed"
        );
        Ok(purchase)
    }

    pub async fn get_purchase(&self, actor: &Actor, purchase_id: &str) -> LedgerResult<Purchase> {
        actor.authorize(Permission::ReadRecords)?;
        let purchase = self
            .db
            .purchases()
            .get_by_id(purchase_id)
            .await?
            .ok_or_else(|| CoreError::not_found("Purchase", purchase_id))?;
        Ok(purchase)
    }
}
