//! # Sale Processor
//!
//! Turns a cart into a committed sale.
//!
//! ## Create Flow
//! ```text
//! begin ─► invoice number (takes the write lock)
//!       ─► customer (optional)
//!       ─► products: exist? active? enough on hand?   ──► OutOfStock [all lines]
//!       ─► price: subtotal, 10% tax
//!       ─► coupon: exists, unused, unexpired, owner   ──► coupon error
//!       ─► discount on subtotal + tax, clamped
//!       ─► stock ledger: one stock-out per line
//!       ─► sale + items, coupon flipped to used
//! commit
//!       ─► loyalty (own transaction; failure = receipt warning)
//! ```
//!
//! Any error before commit drops the transaction: no sale, no items, no
//! stock movement, coupon untouched.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use sqlx::SqliteConnection;
use tracing::{info, warn};

use tally_core::pricing::line_total;
use tally_core::validation::{validate_id, validate_lines, validate_name, validate_quantity};
use tally_core::{
    Actor, CoreError, DocumentKind, DocumentRef, Money, NewSale, Permission, PricingPolicy,
    Product, Sale, SaleItem, SaleLineInput, SaleReceipt, SaleStatus, SaleUpdate, StockDelta,
    StockReason, StockShortfall, ValidationError,
};
use tally_db::{
    new_id, CustomerRepository, Database, ProductRepository, SaleRepository, SequenceRepository,
};

use crate::coupon::CouponEngine;
use crate::error::{LedgerError, LedgerResult};
use crate::loyalty::LoyaltyProgram;
use crate::stock::StockLedger;

const MAX_CUSTOMER_NAME_LEN: usize = 200;

#[derive(Clone)]
pub struct SaleProcessor {
    db: Database,
    pricing: PricingPolicy,
    loyalty: Arc<dyn LoyaltyProgram>,
}

impl SaleProcessor {
    pub fn new(db: Database, pricing: PricingPolicy, loyalty: Arc<dyn LoyaltyProgram>) -> Self {
        SaleProcessor {
            db,
            pricing,
            loyalty,
        }
    }

    // =========================================================================
    // Create
    // =========================================================================

    pub async fn create_sale(&self, actor: &Actor, input: &NewSale) -> LedgerResult<SaleReceipt> {
        actor.authorize(Permission::CreateSale)?;
        validate_sale_lines(&input.items)?;
        validate_customer_name(input.customer_name.as_deref())?;
        if let Some(customer_id) = &input.customer_id {
            validate_id("customerId", customer_id)?;
        }

        let now = Utc::now();
        let sale_id = new_id();
        let mut tx = self.db.begin().await?;

        let invoice_number =
            SequenceRepository::next_document_number_in(&mut tx, DocumentKind::Sale).await?;

        let customer = match &input.customer_id {
            Some(id) => Some(
                CustomerRepository::find_in(&mut tx, id)
                    .await?
                    .ok_or_else(|| CoreError::not_found("Customer", id))?,
            ),
            None => None,
        };

        // Every line is checked before anything is written so the cashier
        // sees the full list of shortfalls at once.
        let mut lines = Vec::with_capacity(input.items.len());
        let mut shortfalls = Vec::new();
        for line in &input.items {
            let product = load_active_product(&mut tx, &line.product_id).await?;
            if !product.can_fulfil(line.quantity) {
                shortfalls.push(shortfall(&product, line.quantity));
            }
            lines.push((product, line.quantity));
        }
        if !shortfalls.is_empty() {
            return Err(CoreError::OutOfStock { shortfalls }.into());
        }

        let subtotal = self
            .pricing
            .subtotal(lines.iter().map(|(p, qty)| (p.selling_price(), *qty)))?;

        let coupon = match &input.coupon_code {
            Some(code) => Some(
                CouponEngine::validate_and_reserve_in(
                    &mut tx,
                    code,
                    customer.as_ref().map(|c| c.id.as_str()),
                    now,
                )
                .await?,
            ),
            None => None,
        };

        // A walk-in presenting a customer's coupon is that customer's sale.
        let customer_id = customer
            .as_ref()
            .map(|c| c.id.clone())
            .or_else(|| coupon.as_ref().map(|c| c.customer_id.clone()));
        let customer_name = input
            .customer_name
            .clone()
            .or_else(|| customer.as_ref().map(|c| c.display_name()));

        let totals = self.pricing.totals(subtotal, coupon.as_ref().map(|c| c.discount()));

        let deltas: Vec<StockDelta> = lines
            .iter()
            .map(|(product, qty)| {
                StockDelta::stock_out(&product.id, *qty, StockReason::Sale, &actor.id)
                    .with_origin(DocumentRef::sale(&sale_id))
            })
            .collect();
        if let Err(shortfalls) = StockLedger::try_apply_in(&mut tx, &deltas, now).await? {
            return Err(CoreError::OutOfStock { shortfalls }.into());
        }

        let items = lines
            .iter()
            .enumerate()
            .map(|(idx, (product, qty))| {
                sale_item(&sale_id, idx, product, product.selling_price(), *qty)
            })
            .collect::<Result<Vec<_>, _>>()?;

        let sale = Sale {
            id: sale_id,
            invoice_number,
            customer_id,
            customer_name,
            status: SaleStatus::Completed,
            subtotal_cents: totals.subtotal.cents(),
            tax_cents: totals.tax.cents(),
            discount_cents: totals.discount.cents(),
            grand_total_cents: totals.grand_total.cents(),
            payment_method: input.payment_method,
            coupon_id: coupon.as_ref().map(|c| c.id.clone()),
            created_by: actor.id.clone(),
            created_at: now,
            updated_at: now,
            voided_at: None,
            items,
        };
        SaleRepository::insert_in(&mut tx, &sale).await?;

        if let Some(coupon) = &coupon {
            CouponEngine::redeem_in(&mut tx, coupon, &sale.id, now).await?;
        }

        tx.commit().await?;

        info!(
            sale_id = %sale.id,
            invoice = %sale.invoice_number,
            lines = sale.items.len(),
            grand_total = %sale.grand_total(),
            coupon = ?coupon.as_ref().map(|c| c.code.as_str()),
            actor = %actor.id,
            "Sale completed"
        );

        let mut warnings = Vec::new();
        let loyalty = match self
            .loyalty
            .credit(sale.customer_id.as_deref(), sale.grand_total())
            .await
        {
            Ok(outcome) => outcome,
            Err(err) => {
                warn!(sale_id = %sale.id, error = %err, "Loyalty accrual failed after sale commit");
                warnings.push(format!("Loyalty points were not credited: {err}"));
                None
            }
        };

        Ok(SaleReceipt {
            sale,
            loyalty,
            warnings,
        })
    }

    // =========================================================================
    // Update
    // =========================================================================

    /// Replaces the lines of a completed sale.
    ///
    /// Only the net quantity change per product touches stock. Lines kept
    /// from the original sale keep their snapshot price; new products are
    /// priced now. The discount already granted is kept (clamped), and the
    /// coupon and loyalty effects are not re-run.
    pub async fn update_sale(
        &self,
        actor: &Actor,
        sale_id: &str,
        update: &SaleUpdate,
    ) -> LedgerResult<Sale> {
        actor.authorize(Permission::AdjustSale)?;
        validate_id("saleId", sale_id)?;
        validate_sale_lines(&update.items)?;
        validate_customer_name(update.customer_name.as_deref())?;

        let now = Utc::now();
        let mut tx = self.db.begin().await?;

        if !SaleRepository::claim_for_update_in(&mut tx, sale_id, now).await? {
            return Err(not_completed(&mut tx, sale_id).await?);
        }
        let original = SaleRepository::find_in(&mut tx, sale_id)
            .await?
            .ok_or_else(|| CoreError::not_found("Sale", sale_id))?;

        let before: HashMap<&str, &SaleItem> = original
            .items
            .iter()
            .map(|item| (item.product_id.as_str(), item))
            .collect();

        let mut items = Vec::with_capacity(update.items.len());
        let mut deltas = Vec::new();

        for (idx, line) in update.items.iter().enumerate() {
            let kept = before.get(line.product_id.as_str()).copied();
            let net = line.quantity - kept.map_or(0, |item| item.quantity);

            let item = match kept {
                Some(old) => {
                    if net > 0 {
                        load_active_product(&mut tx, &line.product_id).await?;
                    }
                    SaleItem {
                        id: new_id(),
                        line_no: idx as i64 + 1,
                        quantity: line.quantity,
                        line_total_cents: line_total(
                            Money::from_cents(old.unit_price_cents),
                            line.quantity,
                        )?
                        .cents(),
                        ..old.clone()
                    }
                }
                None => {
                    let product = load_active_product(&mut tx, &line.product_id).await?;
                    sale_item(sale_id, idx, &product, product.selling_price(), line.quantity)?
                }
            };
            items.push(item);

            match net.cmp(&0) {
                Ordering::Greater => deltas.push(StockDelta::stock_out(
                    &line.product_id,
                    net,
                    StockReason::SaleAdjustment,
                    &actor.id,
                )),
                Ordering::Less => deltas.push(StockDelta::stock_in(
                    &line.product_id,
                    -net,
                    StockReason::SaleAdjustment,
                    &actor.id,
                )),
                Ordering::Equal => {}
            }
        }

        // Products dropped from the sale go back on the shelf.
        for old in &original.items {
            if !update.items.iter().any(|l| l.product_id == old.product_id) {
                deltas.push(StockDelta::stock_in(
                    &old.product_id,
                    old.quantity,
                    StockReason::SaleAdjustment,
                    &actor.id,
                ));
            }
        }

        if !deltas.is_empty() {
            let deltas: Vec<StockDelta> = deltas
                .into_iter()
                .map(|d| d.with_origin(DocumentRef::sale(sale_id)))
                .collect();
            if let Err(shortfalls) = StockLedger::try_apply_in(&mut tx, &deltas, now).await? {
                return Err(CoreError::OutOfStock { shortfalls }.into());
            }
        }

        let subtotal = self.pricing.subtotal(
            items
                .iter()
                .map(|item| (Money::from_cents(item.unit_price_cents), item.quantity)),
        )?;
        let totals = self
            .pricing
            .totals_with_fixed_discount(subtotal, Money::from_cents(original.discount_cents));

        let sale = Sale {
            customer_name: update.customer_name.clone().or(original.customer_name.clone()),
            payment_method: update.payment_method,
            subtotal_cents: totals.subtotal.cents(),
            tax_cents: totals.tax.cents(),
            discount_cents: totals.discount.cents(),
            grand_total_cents: totals.grand_total.cents(),
            updated_at: now,
            items,
            ..original
        };

        SaleRepository::replace_items_in(&mut tx, sale_id, &sale.items).await?;
        SaleRepository::update_header_in(&mut tx, &sale).await?;

        tx.commit().await?;

        info!(
            sale_id = %sale.id,
            invoice = %sale.invoice_number,
            grand_total = %sale.grand_total(),
            actor = %actor.id,
            "Sale updated"
        );
        Ok(sale)
    }

    // =========================================================================
    // Void
    // =========================================================================

    /// Voids a completed sale and returns every unit to stock.
    ///
    /// The sale row and its items stay for the audit trail. Loyalty points
    /// and a redeemed coupon are not given back.
    pub async fn delete_sale(&self, actor: &Actor, sale_id: &str) -> LedgerResult<Sale> {
        actor.authorize(Permission::AdjustSale)?;
        validate_id("saleId", sale_id)?;

        let now = Utc::now();
        let mut tx = self.db.begin().await?;

        if !SaleRepository::void_in(&mut tx, sale_id, now).await? {
            return Err(not_completed(&mut tx, sale_id).await?);
        }
        let sale = SaleRepository::find_in(&mut tx, sale_id)
            .await?
            .ok_or_else(|| CoreError::not_found("Sale", sale_id))?;

        let deltas: Vec<StockDelta> = sale
            .items
            .iter()
            .map(|item| {
                StockDelta::stock_in(
                    &item.product_id,
                    item.quantity,
                    StockReason::SaleVoid,
                    &actor.id,
                )
                .with_origin(DocumentRef::sale(sale_id))
            })
            .collect();
        if !deltas.is_empty() {
            StockLedger::apply_deltas_in(&mut tx, &deltas, now).await?;
        }

        tx.commit().await?;

        info!(
            sale_id = %sale.id,
            invoice = %sale.invoice_number,
            lines = sale.items.len(),
            actor = %actor.id,
            "Sale voided"
        );
        Ok(sale)
    }

    // =========================================================================
    // Reads
    // =========================================================================

    pub async fn get_sale(&self, actor: &Actor, sale_id: &str) -> LedgerResult<Sale> {
        actor.authorize(Permission::ReadRecords)?;
        let sale = self
            .db
            .sales()
            .get_by_id(sale_id)
            .await?
            .ok_or_else(|| CoreError::not_found("Sale", sale_id))?;
        Ok(sale)
    }
}

// =============================================================================
// Helpers
// =============================================================================

fn validate_sale_lines(items: &[SaleLineInput]) -> LedgerResult<()> {
    validate_lines(items.iter().map(|l| l.product_id.as_str()))?;
    for line in items {
        validate_quantity(line.quantity)?;
    }
    Ok(())
}

fn validate_customer_name(name: Option<&str>) -> LedgerResult<()> {
    if let Some(name) = name {
        validate_name("customerName", name, MAX_CUSTOMER_NAME_LEN)?;
    }
    Ok(())
}

async fn load_active_product(
    conn: &mut SqliteConnection,
    product_id: &str,
) -> LedgerResult<Product> {
    let product = ProductRepository::find_in(conn, product_id)
        .await?
        .ok_or_else(|| CoreError::not_found("Product", product_id))?;
    if !product.is_active {
        return Err(CoreError::ProductInactive(product.id).into());
    }
    Ok(product)
}

/// The error for a sale that could not be claimed: missing, or not
/// completed any more.
async fn not_completed(
    conn: &mut SqliteConnection,
    sale_id: &str,
) -> LedgerResult<LedgerError> {
    let err = match SaleRepository::find_in(conn, sale_id).await? {
        Some(sale) => CoreError::InvalidStatus {
            entity: "Sale".to_string(),
            id: sale_id.to_string(),
            status: sale.status.as_str().to_string(),
        },
        None => CoreError::not_found("Sale", sale_id),
    };
    Ok(err.into())
}

fn sale_item(
    sale_id: &str,
    idx: usize,
    product: &Product,
    unit_price: Money,
    quantity: i64,
) -> Result<SaleItem, ValidationError> {
    Ok(SaleItem {
        id: new_id(),
        sale_id: sale_id.to_string(),
        line_no: idx as i64 + 1,
        product_id: product.id.clone(),
        product_name: product.name.clone(),
        sku: product.sku.clone(),
        quantity,
        unit_price_cents: unit_price.cents(),
        line_total_cents: line_total(unit_price, quantity)?.cents(),
    })
}

fn shortfall(product: &Product, requested: i64) -> StockShortfall {
    StockShortfall {
        product_id: product.id.clone(),
        product_name: product.name.clone(),
        available: product.current_stock,
        requested,
    }
}
