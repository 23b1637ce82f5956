//! # Engine
//!
//! One handle over every ledger component, sharing one database.
//!
//! Write operations run through the retry policy: a transaction that lost a
//! write race rolled back in full and is simply run again. Reads are not
//! retried.

use std::sync::Arc;

use tally_core::{
    Actor, AppliedDeltas, Coupon, CouponCheck, Customer, DiscountType, LoyaltyPolicy, NewCustomer,
    NewProduct, NewPurchase, NewSale, Page, PricingPolicy, Product, ProductUpdate,
    Purchase, Sale, SaleReceipt, SaleUpdate, StockBalance, StockDelta, StockReconciliation,
    StockTransaction,
};
use tally_db::Database;

use crate::catalog::{CustomerDirectory, ProductCatalog};
use crate::coupon::CouponEngine;
use crate::error::LedgerResult;
use crate::loyalty::{LoyaltyAccrual, LoyaltyProgram};
use crate::purchase::PurchaseProcessor;
use crate::retry::RetryPolicy;
use crate::sale::SaleProcessor;
use crate::stock::StockLedger;

/// Business parameters for an engine instance.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EngineConfig {
    pub pricing: PricingPolicy,
    pub loyalty: LoyaltyPolicy,
    pub retry: RetryPolicy,
}

#[derive(Clone)]
pub struct Engine {
    db: Database,
    retry: RetryPolicy,
    products: ProductCatalog,
    customers: CustomerDirectory,
    stock: StockLedger,
    sales: SaleProcessor,
    purchases: PurchaseProcessor,
    coupons: CouponEngine,
}

impl Engine {
    pub fn new(db: Database, config: EngineConfig) -> Self {
        let loyalty = Arc::new(LoyaltyAccrual::new(db.clone(), config.loyalty, config.retry));
        Self::with_loyalty(db, config, loyalty)
    }

    /// Builds an engine around a different post-sale loyalty step.
    pub fn with_loyalty(
        db: Database,
        config: EngineConfig,
        loyalty: Arc<dyn LoyaltyProgram>,
    ) -> Self {
        Engine {
            retry: config.retry,
            products: ProductCatalog::new(db.clone()),
            customers: CustomerDirectory::new(db.clone()),
            stock: StockLedger::new(db.clone()),
            sales: SaleProcessor::new(db.clone(), config.pricing, loyalty),
            purchases: PurchaseProcessor::new(db.clone()),
            coupons: CouponEngine::new(db.clone()),
            db,
        }
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    // =========================================================================
    // Sales
    // =========================================================================

    pub async fn create_sale(&self, actor: &Actor, input: &NewSale) -> LedgerResult<SaleReceipt> {
        self.retry
            .run("create_sale", || self.sales.create_sale(actor, input))
            .await
    }

    pub async fn update_sale(
        &self,
        actor: &Actor,
        sale_id: &str,
        update: &SaleUpdate,
    ) -> LedgerResult<Sale> {
        self.retry
            .run("update_sale", || self.sales.update_sale(actor, sale_id, update))
            .await
    }

    pub async fn delete_sale(&self, actor: &Actor, sale_id: &str) -> LedgerResult<Sale> {
        self.retry
            .run("delete_sale", || self.sales.delete_sale(actor, sale_id))
            .await
    }

    pub async fn get_sale(&self, actor: &Actor, sale_id: &str) -> LedgerResult<Sale> {
        self.sales.get_sale(actor, sale_id).await
    }

    // =========================================================================
    // Purchases
    // =========================================================================

    pub async fn create_purchase(
        &self,
        actor: &Actor,
        input: &NewPurchase,
    ) -> LedgerResult<Purchase> {
        self.retry
            .run("create_purchase", || self.purchases.create_purchase(actor, input))
            .await
    }

    pub async fn delete_purchase(
        &self,
        actor: &Actor,
        purchase_id: &str,
    ) -> LedgerResult<Purchase> {
        self.retry
            .run("delete_purchase", || {
                self.purchases.delete_purchase(actor, purchase_id)
            })
            .await
    }

    pub async fn get_purchase(&self, actor: &Actor, purchase_id: &str) -> LedgerResult<Purchase> {
        self.purchases.get_purchase(actor, purchase_id).await
    }

    // =========================================================================
    // Stock
    // =========================================================================

    /// Applies a raw batch of deltas as `actor`. Requires manual stock rights.
    pub async fn apply_deltas(
        &self,
        actor: &Actor,
        deltas: &[StockDelta],
    ) -> LedgerResult<AppliedDeltas> {
        self.retry
            .run("apply_deltas", || self.stock.apply_deltas(actor, deltas))
            .await
    }

    pub async fn stock_in(
        &self,
        actor: &Actor,
        product_id: &str,
        quantity: i64,
        notes: Option<String>,
    ) -> LedgerResult<StockTransaction> {
        self.retry
            .run("stock_in", || {
                self.stock.stock_in(actor, product_id, quantity, notes.clone())
            })
            .await
    }

    pub async fn stock_out(
        &self,
        actor: &Actor,
        product_id: &str,
        quantity: i64,
        notes: Option<String>,
    ) -> LedgerResult<StockTransaction> {
        self.retry
            .run("stock_out", || {
                self.stock.stock_out(actor, product_id, quantity, notes.clone())
            })
            .await
    }

    pub async fn current_stock(
        &self,
        actor: &Actor,
        product_id: &str,
    ) -> LedgerResult<StockBalance> {
        self.stock.current_stock(actor, product_id).await
    }

    pub async fn stock_history(
        &self,
        actor: &Actor,
        product_id: &str,
        page: Option<u32>,
        page_size: Option<u32>,
    ) -> LedgerResult<Page<StockTransaction>> {
        self.stock.history(actor, product_id, page, page_size).await
    }

    pub async fn low_stock(&self, actor: &Actor) -> LedgerResult<Vec<Product>> {
        self.stock.low_stock(actor).await
    }

    pub async fn reconcile_stock(
        &self,
        actor: &Actor,
        product_id: &str,
    ) -> LedgerResult<StockReconciliation> {
        self.stock.reconcile(actor, product_id).await
    }

    // =========================================================================
    // Coupons
    // =========================================================================

    pub async fn generate_coupon(
        &self,
        actor: &Actor,
        customer_id: &str,
        discount_type: DiscountType,
        discount_value: i64,
        expiry_days: i64,
    ) -> LedgerResult<Coupon> {
        self.retry
            .run("generate_coupon", || {
                self.coupons
                    .generate(actor, customer_id, discount_type, discount_value, expiry_days)
            })
            .await
    }

    pub async fn validate_coupon(&self, actor: &Actor, code: &str) -> LedgerResult<CouponCheck> {
        self.coupons.validate(actor, code).await
    }

    pub async fn customer_coupons(
        &self,
        actor: &Actor,
        customer_id: &str,
    ) -> LedgerResult<Vec<Coupon>> {
        self.coupons.list_for_customer(actor, customer_id).await
    }

    // =========================================================================
    // Catalog & customers
    // =========================================================================

    pub async fn create_product(&self, actor: &Actor, input: &NewProduct) -> LedgerResult<Product> {
        self.retry
            .run("create_product", || self.products.create_product(actor, input))
            .await
    }

    pub async fn get_product(&self, actor: &Actor, product_id: &str) -> LedgerResult<Product> {
        self.products.get_product(actor, product_id).await
    }

    pub async fn list_products(
        &self,
        actor: &Actor,
        include_inactive: bool,
    ) -> LedgerResult<Vec<Product>> {
        self.products.list_products(actor, include_inactive).await
    }

    pub async fn update_product_details(
        &self,
        actor: &Actor,
        product_id: &str,
        update: &ProductUpdate,
    ) -> LedgerResult<Product> {
        self.retry
            .run("update_product_details", || {
                self.products.update_product_details(actor, product_id, update)
            })
            .await
    }

    pub async fn deactivate_product(&self, actor: &Actor, product_id: &str) -> LedgerResult<()> {
        self.retry
            .run("deactivate_product", || {
                self.products.deactivate_product(actor, product_id)
            })
            .await
    }

    pub async fn create_customer(
        &self,
        actor: &Actor,
        input: &NewCustomer,
    ) -> LedgerResult<Customer> {
        self.retry
            .run("create_customer", || self.customers.create_customer(actor, input))
            .await
    }

    pub async fn get_customer(&self, actor: &Actor, customer_id: &str) -> LedgerResult<Customer> {
        self.customers.get_customer(actor, customer_id).await
    }
}
