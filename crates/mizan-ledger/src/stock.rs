//! # Stock Store Operations
//!
//! Product lifecycle and the reconciliation read side.
//!
//! Quantity only ever moves through
//! [`InventoryRepository::apply_movement`], which pairs the guarded update
//! with its history row. That pairing is what makes
//! `quantity == sum(quantity_change)` hold from the product's creation on.

use chrono::Utc;
use tracing::{info, warn};

use mizan_core::reconcile::{first_broken_link, replay};
use mizan_core::request::NewProduct;
use mizan_core::validation::validate_non_negative;
use mizan_core::{CoreError, InventoryAction, InventoryHistory, Product, StockCheck, DEFAULT_MIN_QUANTITY};
use mizan_db::{InventoryRepository, ProductRepository, StockMovement};

use crate::{new_id, Ledger, LedgerResult};

impl Ledger {
    /// Creates a product. A non-zero opening quantity is booked as
    /// INITIAL_STOCK in the same transaction.
    pub async fn create_product(&self, input: &NewProduct, user_id: &str) -> LedgerResult<Product> {
        self.bounded("create_product", self.create_product_once(input, user_id))
            .await
    }

    async fn create_product_once(&self, input: &NewProduct, user_id: &str) -> LedgerResult<Product> {
        input.validate()?;

        let now = Utc::now();
        let product = Product {
            id: new_id(),
            sku: input.sku.trim().to_string(),
            barcode: input.barcode.clone(),
            name: input.name.trim().to_string(),
            quantity: 0,
            min_quantity: input.min_quantity.unwrap_or(DEFAULT_MIN_QUANTITY),
            cost_price_cents: input.cost_price_cents,
            selling_price_cents: input.selling_price_cents,
            is_active: true,
            created_at: now,
            updated_at: now,
        };

        let mut tx = self.db.begin_immediate().await?;
        ProductRepository::insert(&mut tx, &product).await?;

        let product = if input.quantity > 0 {
            let movement = StockMovement {
                product_id: &product.id,
                action: InventoryAction::InitialStock,
                reference_id: Some(&product.id),
                reason: Some("Initial stock"),
                user_id,
            };
            let (stocked, _) =
                InventoryRepository::apply_movement(&mut tx, &movement, input.quantity, now).await?;
            stocked
        } else {
            product
        };

        tx.commit().await?;

        info!(product_id = %product.id, sku = %product.sku, quantity = product.quantity, "Product created");
        Ok(product)
    }

    /// Sets on-hand quantity to an absolute value, booking the difference as
    /// QUANTITY_ADJUSTMENT. Setting the current value writes nothing.
    pub async fn adjust_quantity(
        &self,
        product_id: &str,
        new_quantity: i64,
        reason: Option<&str>,
        user_id: &str,
    ) -> LedgerResult<Product> {
        self.bounded(
            "adjust_quantity",
            self.adjust_quantity_once(product_id, new_quantity, reason, user_id),
        )
        .await
    }

    async fn adjust_quantity_once(
        &self,
        product_id: &str,
        new_quantity: i64,
        reason: Option<&str>,
        user_id: &str,
    ) -> LedgerResult<Product> {
        validate_non_negative("quantity", new_quantity)?;

        let mut tx = self.db.begin_immediate().await?;
        let product = ProductRepository::find(&mut *tx, product_id)
            .await?
            .ok_or_else(|| CoreError::ProductNotFound(product_id.to_string()))?;

        let delta = new_quantity - product.quantity;
        if delta == 0 {
            return Ok(product);
        }

        let movement = StockMovement {
            product_id,
            action: InventoryAction::QuantityAdjustment,
            reference_id: Some(product_id),
            reason: Some(reason.unwrap_or("Manual adjustment")),
            user_id,
        };
        let (adjusted, _) =
            InventoryRepository::apply_movement(&mut tx, &movement, delta, Utc::now()).await?;

        tx.commit().await?;

        info!(product_id = %product_id, delta, quantity = adjusted.quantity, "Quantity adjusted");
        Ok(adjusted)
    }

    /// Soft delete. The builder rejects inactive products from then on.
    pub async fn deactivate_product(&self, product_id: &str) -> LedgerResult<()> {
        self.bounded("deactivate_product", self.deactivate_product_once(product_id))
            .await
    }

    async fn deactivate_product_once(&self, product_id: &str) -> LedgerResult<()> {
        let mut tx = self.db.begin_immediate().await?;
        if ProductRepository::find(&mut *tx, product_id).await?.is_none() {
            return Err(CoreError::ProductNotFound(product_id.to_string()).into());
        }
        ProductRepository::deactivate(&mut tx, product_id, Utc::now()).await?;
        tx.commit().await?;

        info!(product_id = %product_id, "Product deactivated");
        Ok(())
    }

    pub async fn get_product(&self, product_id: &str) -> LedgerResult<Product> {
        let product = self
            .db
            .products()
            .get_by_id(product_id)
            .await?
            .ok_or_else(|| CoreError::ProductNotFound(product_id.to_string()))?;
        Ok(product)
    }

    /// Lookup by scanned or typed SKU.
    pub async fn product_by_sku(&self, sku: &str) -> LedgerResult<Product> {
        let product = self
            .db
            .products()
            .get_by_sku(sku.trim())
            .await?
            .ok_or_else(|| CoreError::ProductNotFound(sku.to_string()))?;
        Ok(product)
    }

    pub async fn products(&self, limit: u32) -> LedgerResult<Vec<Product>> {
        Ok(self.db.products().list_active(limit).await?)
    }

    /// Active products at or below their reorder threshold.
    pub async fn low_stock(&self) -> LedgerResult<Vec<Product>> {
        Ok(self.db.products().low_stock().await?)
    }

    /// A product's history, oldest first.
    pub async fn history(&self, product_id: &str) -> LedgerResult<Vec<InventoryHistory>> {
        Ok(self.db.inventory().for_product(product_id).await?)
    }

    /// Every stock movement caused by one sale, purchase or adjustment.
    pub async fn movements(&self, reference_id: &str) -> LedgerResult<Vec<InventoryHistory>> {
        Ok(self.db.inventory().for_reference(reference_id).await?)
    }

    /// Replays a product's history from zero and compares the result with
    /// the stored quantity. Both are read in one snapshot.
    pub async fn verify_stock(&self, product_id: &str) -> LedgerResult<StockCheck> {
        let mut tx = self.db.pool().begin().await?;

        let product = ProductRepository::find(&mut *tx, product_id)
            .await?
            .ok_or_else(|| CoreError::ProductNotFound(product_id.to_string()))?;
        let history = InventoryRepository::find_for_product(&mut *tx, product_id).await?;
        tx.rollback().await?;

        let check = StockCheck {
            stored_quantity: product.quantity,
            replayed_quantity: replay(&history),
            history_entries: history.len() as i64,
        };

        if !check.is_consistent() {
            warn!(
                product_id = %product_id,
                stored = check.stored_quantity,
                replayed = check.replayed_quantity,
                "Stock does not match its history"
            );
        }
        if let Some(index) = first_broken_link(&history) {
            warn!(product_id = %product_id, index, "History chain is broken");
        }

        Ok(check)
    }
}
