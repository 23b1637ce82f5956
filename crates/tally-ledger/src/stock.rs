//! # Stock Ledger
//!
//! The only writer of `products.current_stock`.
//!
//! Each delta runs one guarded UPDATE and appends one ledger row, so the
//! counter and the ledger move together inside the caller's transaction.
//!
//! ```text
//! apply(deltas)
//!   for each delta:
//!     UPDATE products SET current_stock = current_stock + δ
//!      WHERE id = ? AND current_stock + δ >= 0 ... RETURNING current_stock
//!        │
//!        ├── row ──► INSERT stock_transactions (balance_after = row)
//!        └── none ─► missing? NotFound   inactive? ProductInactive
//!                    otherwise a shortfall; caller rolls back
//! ```

use chrono::{DateTime, Utc};
use sqlx::SqliteConnection;
use tracing::{debug, info};

use tally_core::validation::{validate_id, validate_notes, validate_page, validate_quantity};
use tally_core::{
    Actor, AppliedDeltas, CoreError, Page, Permission, Product, StockBalance, StockDelta,
    StockReason, StockReconciliation, StockShortfall, StockTransaction, ValidationError,
};
use tally_db::{new_id, Database, ProductRepository, StockTransactionRepository};

use crate::error::LedgerResult;

/// Outcome of a batch that may have hit a shortfall.
///
/// On `Err` some deltas of the batch may already be written; the caller
/// must drop its transaction.
pub type TryApply = Result<AppliedDeltas, Vec<StockShortfall>>;

#[derive(Debug, Clone)]
pub struct StockLedger {
    db: Database,
}

impl StockLedger {
    pub fn new(db: Database) -> Self {
        StockLedger { db }
    }

    // =========================================================================
    // Batch application
    // =========================================================================

    /// Applies a raw batch on behalf of `actor`, in its own transaction.
    /// All or nothing. Every entry is recorded under the actor's id.
    pub async fn apply_deltas(
        &self,
        actor: &Actor,
        deltas: &[StockDelta],
    ) -> LedgerResult<AppliedDeltas> {
        actor.authorize(Permission::ManualStock)?;
        let deltas: Vec<StockDelta> = deltas
            .iter()
            .map(|delta| StockDelta {
                actor_id: actor.id.clone(),
                ..delta.clone()
            })
            .collect();
        self.commit_batch(&deltas).await
    }

    async fn commit_batch(&self, deltas: &[StockDelta]) -> LedgerResult<AppliedDeltas> {
        let mut tx = self.db.begin().await?;
        let applied = Self::apply_deltas_in(&mut tx, deltas, Utc::now()).await?;
        tx.commit().await?;
        Ok(applied)
    }

    /// Applies a batch inside the caller's transaction.
    ///
    /// The first product that cannot cover its stock-out fails the batch
    /// with `InsufficientStock`.
    pub async fn apply_deltas_in(
        conn: &mut SqliteConnection,
        deltas: &[StockDelta],
        now: DateTime<Utc>,
    ) -> LedgerResult<AppliedDeltas> {
        match Self::try_apply_in(conn, deltas, now).await? {
            Ok(applied) => Ok(applied),
            Err(shortfalls) => {
                let first = shortfalls.into_iter().next().ok_or_else(|| {
                    CoreError::Validation(ValidationError::Required {
                        field: "deltas".to_string(),
                    })
                })?;
                Err(CoreError::InsufficientStock {
                    product_id: first.product_id,
                    available: first.available,
                    requested: first.requested,
                }
                .into())
            }
        }
    }

    /// Applies a batch, collecting every shortfall instead of stopping at
    /// the first.
    pub async fn try_apply_in(
        conn: &mut SqliteConnection,
        deltas: &[StockDelta],
        now: DateTime<Utc>,
    ) -> LedgerResult<TryApply> {
        if deltas.is_empty() {
            return Err(ValidationError::Required {
                field: "deltas".to_string(),
            }
            .into());
        }
        for delta in deltas {
            validate_id("productId", &delta.product_id)?;
            // i64::MIN has no magnitude; it fails the upper bound.
            validate_quantity(delta.quantity.checked_abs().unwrap_or(i64::MAX))?;
        }

        let mut transactions = Vec::with_capacity(deltas.len());
        let mut balances: Vec<StockBalance> = Vec::new();
        let mut shortfalls = Vec::new();

        for delta in deltas {
            let require_active = delta.reason.requires_active_product();
            let applied = ProductRepository::apply_stock_delta_in(
                &mut *conn,
                &delta.product_id,
                delta.quantity,
                require_active,
                now,
            )
            .await?;

            let Some(balance) = applied else {
                let product = ProductRepository::find_in(&mut *conn, &delta.product_id)
                    .await?
                    .ok_or_else(|| CoreError::not_found("Product", &delta.product_id))?;
                if require_active && !product.is_active {
                    return Err(CoreError::ProductInactive(product.id).into());
                }
                shortfalls.push(shortfall(&product, -delta.quantity));
                continue;
            };

            let entry = StockTransaction {
                id: new_id(),
                product_id: delta.product_id.clone(),
                kind: delta.kind(),
                quantity: delta.quantity.abs(),
                balance_after: balance,
                reason: delta.reason,
                notes: delta.notes.clone(),
                actor_id: delta.actor_id.clone(),
                origin_kind: delta.origin.as_ref().map(|o| o.kind),
                origin_id: delta.origin.as_ref().map(|o| o.id.clone()),
                created_at: now,
            };
            StockTransactionRepository::insert_in(&mut *conn, &entry).await?;
            transactions.push(entry);

            match balances.iter_mut().find(|b| b.product_id == delta.product_id) {
                Some(existing) => existing.current_stock = balance,
                None => balances.push(StockBalance {
                    product_id: delta.product_id.clone(),
                    current_stock: balance,
                }),
            }
        }

        if !shortfalls.is_empty() {
            debug!(count = shortfalls.len(), "Stock batch short");
            return Ok(Err(shortfalls));
        }

        Ok(Ok(AppliedDeltas {
            transactions,
            balances,
        }))
    }

    // =========================================================================
    // Manual movements
    // =========================================================================

    /// Receives stock outside of a purchase (count correction, return).
    pub async fn stock_in(
        &self,
        actor: &Actor,
        product_id: &str,
        quantity: i64,
        notes: Option<String>,
    ) -> LedgerResult<StockTransaction> {
        let delta = StockDelta::stock_in(product_id, quantity, StockReason::Manual, &actor.id);
        self.manual(actor, delta, quantity, notes).await
    }

    /// Writes stock off outside of a sale (damage, loss).
    pub async fn stock_out(
        &self,
        actor: &Actor,
        product_id: &str,
        quantity: i64,
        notes: Option<String>,
    ) -> LedgerResult<StockTransaction> {
        let delta = StockDelta::stock_out(product_id, quantity, StockReason::Manual, &actor.id);
        self.manual(actor, delta, quantity, notes).await
    }

    async fn manual(
        &self,
        actor: &Actor,
        delta: StockDelta,
        quantity: i64,
        notes: Option<String>,
    ) -> LedgerResult<StockTransaction> {
        actor.authorize(Permission::ManualStock)?;
        validate_id("productId", &delta.product_id)?;
        validate_quantity(quantity)?;
        validate_notes(notes.as_deref())?;

        let delta = delta.with_notes(notes);
        let mut applied = self.commit_batch(std::slice::from_ref(&delta)).await?;
        let entry = applied.transactions.pop().ok_or_else(|| {
            CoreError::Validation(ValidationError::Required {
                field: "deltas".to_string(),
            })
        })?;

        info!(
            product_id = %entry.product_id,
            kind = ?entry.kind,
            quantity = entry.quantity,
            balance_after = entry.balance_after,
            actor = %actor.id,
            "Manual stock movement"
        );
        Ok(entry)
    }

    // =========================================================================
    // Reads
    // =========================================================================

    pub async fn current_stock(&self, actor: &Actor, product_id: &str) -> LedgerResult<StockBalance> {
        actor.authorize(Permission::ReadRecords)?;
        let current_stock = self
            .db
            .products()
            .current_stock(product_id)
            .await?
            .ok_or_else(|| CoreError::not_found("Product", product_id))?;
        Ok(StockBalance {
            product_id: product_id.to_string(),
            current_stock,
        })
    }

    /// A product's ledger, newest first.
    pub async fn history(
        &self,
        actor: &Actor,
        product_id: &str,
        page: Option<u32>,
        page_size: Option<u32>,
    ) -> LedgerResult<Page<StockTransaction>> {
        actor.authorize(Permission::ReadRecords)?;
        let (page, page_size) = validate_page(page, page_size)?;

        if self.db.products().current_stock(product_id).await?.is_none() {
            return Err(CoreError::not_found("Product", product_id).into());
        }

        let (items, total) = self
            .db
            .stock_transactions()
            .history(product_id, page, page_size)
            .await?;

        Ok(Page {
            items,
            page,
            page_size,
            total,
        })
    }

    /// Active products at or below their minimum level.
    pub async fn low_stock(&self, actor: &Actor) -> LedgerResult<Vec<Product>> {
        actor.authorize(Permission::ReadRecords)?;
        Ok(self.db.products().low_stock().await?)
    }

    /// Compares the ledger sum with the stored counter.
    pub async fn reconcile(
        &self,
        actor: &Actor,
        product_id: &str,
    ) -> LedgerResult<StockReconciliation> {
        actor.authorize(Permission::ReadRecords)?;
        let recorded_balance = self
            .db
            .products()
            .current_stock(product_id)
            .await?
            .ok_or_else(|| CoreError::not_found("Product", product_id))?;
        let ledger_balance = self.db.stock_transactions().ledger_balance(product_id).await?;

        Ok(StockReconciliation {
            product_id: product_id.to_string(),
            ledger_balance,
            recorded_balance,
        })
    }
}

fn shortfall(product: &Product, requested: i64) -> StockShortfall {
    StockShortfall {
        product_id: product.id.clone(),
        product_name: product.name.clone(),
        available: product.current_stock,
        requested,
    }
}
