//! # Catalog & Customers
//!
//! Product and customer records the ledger operations act on.
//!
//! Stock is never set here: a product is created with zero on hand and
//! every later change goes through the [`StockLedger`](crate::stock::StockLedger).

use chrono::Utc;
use tracing::info;

use tally_core::codes::generate_sku;
use tally_core::validation::{
    validate_minimum_stock_level, validate_name, validate_price_cents, validate_product_name,
    validate_sku,
};
use tally_core::{
    Actor, CoreError, Customer, NewCustomer, NewProduct, Permission, Product, ProductUpdate,
    ValidationError,
};
use tally_db::{new_id, Database, DbError};

use crate::error::{LedgerError, LedgerResult};

/// Generated SKUs drawn before giving up.
const MAX_SKU_ATTEMPTS: usize = 10;

// =============================================================================
// Products
// =============================================================================

#[derive(Debug, Clone)]
pub struct ProductCatalog {
    db: Database,
}

impl ProductCatalog {
    pub fn new(db: Database) -> Self {
        ProductCatalog { db }
    }

    pub async fn create_product(
        &self,
        actor: &Actor,
        input: &NewProduct,
    ) -> LedgerResult<Product> {
        actor.authorize(Permission::ManageCatalog)?;
        validate_product_name(&input.name)?;
        validate_price_cents("costPrice", input.cost_price_cents)?;
        validate_price_cents("sellingPrice", input.selling_price_cents)?;
        validate_minimum_stock_level(input.minimum_stock_level)?;

        let sku = match input.sku.as_deref().map(str::trim) {
            Some(sku) if !sku.is_empty() => {
                validate_sku(sku)?;
                sku.to_string()
            }
            _ => self.unused_sku().await?,
        };

        let now = Utc::now();
        let product = Product {
            id: new_id(),
            sku,
            name: input.name.trim().to_string(),
            category_id: input.category_id.clone(),
            cost_price_cents: input.cost_price_cents,
            selling_price_cents: input.selling_price_cents,
            minimum_stock_level: input.minimum_stock_level,
            current_stock: 0,
            is_active: true,
            created_at: now,
            updated_at: now,
        };

        self.db
            .products()
            .insert(&product)
            .await
            .map_err(|err| -> LedgerError {
                match err {
                    DbError::UniqueViolation { field, value } => {
                        ValidationError::AlreadyExists { field, value }.into()
                    }
                    other => other.into(),
                }
            })?;

        info!(product_id = %product.id, sku = %product.sku, actor = %actor.id, "Product created");
        Ok(product)
    }

    async fn unused_sku(&self) -> LedgerResult<String> {
        for _ in 0..MAX_SKU_ATTEMPTS {
            let sku = generate_sku();
            if !self.db.products().sku_exists(&sku).await? {
                return Ok(sku);
            }
        }
        Err(DbError::Internal("no unused SKU found".to_string()).into())
    }

    pub async fn get_product(&self, actor: &Actor, product_id: &str) -> LedgerResult<Product> {
        actor.authorize(Permission::ReadRecords)?;
        let product = self
            .db
            .products()
            .get_by_id(product_id)
            .await?
            .ok_or_else(|| CoreError::not_found("Product", product_id))?;
        Ok(product)
    }

    pub async fn list_products(
        &self,
        actor: &Actor,
        include_inactive: bool,
    ) -> LedgerResult<Vec<Product>> {
        actor.authorize(Permission::ReadRecords)?;
        Ok(self.db.products().list(include_inactive).await?)
    }

    /// Edits names, prices and the reorder level. Existing sale lines keep
    /// the price they were sold at.
    pub async fn update_product_details(
        &self,
        actor: &Actor,
        product_id: &str,
        update: &ProductUpdate,
    ) -> LedgerResult<Product> {
        actor.authorize(Permission::ManageCatalog)?;
        if let Some(name) = &update.name {
            validate_product_name(name)?;
        }
        if let Some(cents) = update.cost_price_cents {
            validate_price_cents("costPrice", cents)?;
        }
        if let Some(cents) = update.selling_price_cents {
            validate_price_cents("sellingPrice", cents)?;
        }
        if let Some(level) = update.minimum_stock_level {
            validate_minimum_stock_level(level)?;
        }

        let product = self
            .db
            .products()
            .update_details(product_id, update, Utc::now())
            .await?
            .ok_or_else(|| CoreError::not_found("Product", product_id))?;

        info!(product_id = %product.id, actor = %actor.id, "Product updated");
        Ok(product)
    }

    /// Soft delete. The product drops out of new sales and purchases; its
    /// history and stock stay.
    pub async fn deactivate_product(&self, actor: &Actor, product_id: &str) -> LedgerResult<()> {
        actor.authorize(Permission::ManageCatalog)?;
        if !self.db.products().deactivate(product_id, Utc::now()).await? {
            return Err(CoreError::not_found("Product", product_id).into());
        }
        info!(product_id = %product_id, actor = %actor.id, "Product deactivated");
        Ok(())
    }
}

// =============================================================================
// Customers
// =============================================================================

#[derive(Debug, Clone)]
pub struct CustomerDirectory {
    db: Database,
}

impl CustomerDirectory {
    pub fn new(db: Database) -> Self {
        CustomerDirectory { db }
    }

    pub async fn create_customer(
        &self,
        actor: &Actor,
        input: &NewCustomer,
    ) -> LedgerResult<Customer> {
        actor.authorize(Permission::ManageCustomers)?;
        validate_name("firstName", &input.first_name, 100)?;
        if let Some(last_name) = &input.last_name {
            validate_name("lastName", last_name, 100)?;
        }
        if let Some(email) = &input.email {
            if !email.contains('@') {
                return Err(ValidationError::InvalidFormat {
                    field: "email".to_string(),
                    reason: "must contain @".to_string(),
                }
                .into());
            }
        }

        let now = Utc::now();
        let customer = Customer {
            id: new_id(),
            first_name: input.first_name.trim().to_string(),
            last_name: input.last_name.as_deref().map(|s| s.trim().to_string()),
            email: input.email.as_deref().map(|s| s.trim().to_string()),
            phone: input.phone.clone(),
            loyalty_points: 0,
            total_purchases: 0,
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        self.db.customers().insert(&customer).await?;

        info!(customer_id = %customer.id, actor = %actor.id, "Customer created");
        Ok(customer)
    }

    pub async fn get_customer(&self, actor: &Actor, customer_id: &str) -> LedgerResult<Customer> {
        actor.authorize(Permission::ReadRecords)?;
        let customer = self
            .db
            .customers()
            .get_by_id(customer_id)
            .await?
            .ok_or_else(|| CoreError::not_found("Customer", customer_id))?;
        Ok(customer)
    }
}
