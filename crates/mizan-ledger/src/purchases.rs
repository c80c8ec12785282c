//! # Purchase Ledger
//!
//! Purchases add stock and roll each product's cost price forward to the
//! latest purchase price. An edit replaces every item and books the net
//! per-product change as PURCHASE history; there is no up-front stock
//! check, though the stock guard still refuses a reduction below zero.

use chrono::Utc;
use std::collections::BTreeMap;
use tracing::info;

use mizan_core::builder::{Direction, TransactionBuilder, TransactionPlan};
use mizan_core::invoice::InvoiceKind;
use mizan_core::request::PurchaseRequest;
use mizan_core::{CoreError, InventoryAction, Purchase, PurchaseItem, PurchaseRecord, TransactionStatus};
use mizan_db::{InventoryRepository, ProductRepository, PurchaseRepository, StockMovement};
use sqlx::SqliteConnection;

use crate::{new_id, Ledger, LedgerResult};

impl Ledger {
    pub async fn create_purchase(
        &self,
        request: &PurchaseRequest,
        user_id: &str,
    ) -> LedgerResult<PurchaseRecord> {
        self.bounded(
            "create_purchase",
            self.with_fresh_invoice(InvoiceKind::Purchase, move |invoice_number| {
                self.create_purchase_once(request, user_id, invoice_number)
            }),
        )
        .await
    }

    async fn create_purchase_once(
        &self,
        request: &PurchaseRequest,
        user_id: &str,
        invoice_number: String,
    ) -> LedgerResult<PurchaseRecord> {
        request.validate()?;

        let mut tx = self.db.begin_immediate().await?;

        let catalog = ProductRepository::find_many(
            &mut tx,
            request.transaction.items.iter().map(|line| line.product_id.as_str()),
        )
        .await?;
        let plan = TransactionBuilder::new(Direction::Purchase).build(&request.transaction, &catalog)?;

        let now = Utc::now();
        let purchase = Purchase {
            id: new_id(),
            invoice_number,
            supplier_id: request.supplier_id.clone(),
            user_id: user_id.to_string(),
            total_amount_cents: plan.total_amount_cents,
            discount_cents: plan.discount_cents,
            tax_cents: plan.tax_cents,
            net_amount_cents: plan.net_amount_cents,
            currency: request.currency().to_string(),
            exchange_rate: request.exchange_rate(),
            status: TransactionStatus::Completed,
            notes: request.notes.clone(),
            purchase_date: request.purchase_date.unwrap_or(now),
            created_at: now,
            updated_at: now,
        };
        PurchaseRepository::insert_header(&mut tx, &purchase).await?;

        let items = insert_items(&mut tx, &purchase.id, &plan).await?;
        for item in &items {
            let movement = StockMovement {
                product_id: &item.product_id,
                action: InventoryAction::Purchase,
                reference_id: Some(&purchase.id),
                reason: None,
                user_id,
            };
            InventoryRepository::apply_movement(&mut tx, &movement, item.quantity, now).await?;
        }
        roll_cost_prices(&mut tx, &items, now).await?;

        tx.commit().await?;

        info!(
            purchase_id = %purchase.id,
            invoice = %purchase.invoice_number,
            items = items.len(),
            net_amount_cents = purchase.net_amount_cents,
            "Purchase created"
        );
        Ok(PurchaseRecord { purchase, items })
    }

    /// Replaces all items and header fields of a purchase.
    pub async fn edit_purchase(
        &self,
        purchase_id: &str,
        request: &PurchaseRequest,
        user_id: &str,
    ) -> LedgerResult<PurchaseRecord> {
        self.bounded("edit_purchase", self.edit_purchase_once(purchase_id, request, user_id))
            .await
    }

    async fn edit_purchase_once(
        &self,
        purchase_id: &str,
        request: &PurchaseRequest,
        user_id: &str,
    ) -> LedgerResult<PurchaseRecord> {
        request.validate()?;

        let mut tx = self.db.begin_immediate().await?;

        let purchase = PurchaseRepository::find(&mut *tx, purchase_id)
            .await?
            .ok_or_else(|| CoreError::PurchaseNotFound(purchase_id.to_string()))?;
        let old_items = PurchaseRepository::find_items(&mut *tx, purchase_id).await?;

        let catalog = ProductRepository::find_many(
            &mut tx,
            request.transaction.items.iter().map(|line| line.product_id.as_str()),
        )
        .await?;
        let plan = TransactionBuilder::new(Direction::Purchase).build(&request.transaction, &catalog)?;

        // Stock moves by new - old per product
        let mut changes: BTreeMap<String, i64> = plan.quantities();
        for item in &old_items {
            *changes.entry(item.product_id.clone()).or_insert(0) -= item.quantity;
        }
        changes.retain(|_, change| *change != 0);

        let now = Utc::now();
        PurchaseRepository::delete_items(&mut tx, purchase_id).await?;
        let items = insert_items(&mut tx, purchase_id, &plan).await?;

        for (product_id, change) in &changes {
            let movement = StockMovement {
                product_id,
                action: InventoryAction::Purchase,
                reference_id: Some(purchase_id),
                reason: Some("Purchase edited"),
                user_id,
            };
            InventoryRepository::apply_movement(&mut tx, &movement, *change, now).await?;
        }
        roll_cost_prices(&mut tx, &items, now).await?;

        let edited = Purchase {
            supplier_id: request.supplier_id.clone(),
            total_amount_cents: plan.total_amount_cents,
            discount_cents: plan.discount_cents,
            tax_cents: plan.tax_cents,
            net_amount_cents: plan.net_amount_cents,
            currency: request.currency().to_string(),
            exchange_rate: request.exchange_rate(),
            notes: request.notes.clone(),
            purchase_date: request.purchase_date.unwrap_or(purchase.purchase_date),
            updated_at: now,
            ..purchase
        };
        PurchaseRepository::update_header(&mut tx, &edited).await?;

        tx.commit().await?;

        info!(
            purchase_id = %purchase_id,
            products_moved = changes.len(),
            items = items.len(),
            "Purchase edited"
        );
        Ok(PurchaseRecord {
            purchase: edited,
            items,
        })
    }

    pub async fn get_purchase(&self, purchase_id: &str) -> LedgerResult<PurchaseRecord> {
        let purchases = self.db.purchases();
        let purchase = purchases
            .get_by_id(purchase_id)
            .await?
            .ok_or_else(|| CoreError::PurchaseNotFound(purchase_id.to_string()))?;
        let items = purchases.get_items(purchase_id).await?;
        Ok(PurchaseRecord { purchase, items })
    }
}

async fn insert_items(
    conn: &mut SqliteConnection,
    purchase_id: &str,
    plan: &TransactionPlan,
) -> LedgerResult<Vec<PurchaseItem>> {
    let mut items = Vec::with_capacity(plan.lines.len());
    for (position, line) in plan.lines.iter().enumerate() {
        let item = PurchaseItem {
            id: new_id(),
            purchase_id: purchase_id.to_string(),
            product_id: line.product_id.clone(),
            quantity: line.quantity,
            unit_price_cents: line.unit_price_cents,
            total_cents: line.line_total_cents,
            position: position as i64,
        };
        PurchaseRepository::insert_item(&mut *conn, &item).await?;
        items.push(item);
    }
    Ok(items)
}

/// Later lines win when a product appears more than once.
async fn roll_cost_prices(
    conn: &mut SqliteConnection,
    items: &[PurchaseItem],
    now: chrono::DateTime<Utc>,
) -> LedgerResult<()> {
    let mut latest: BTreeMap<&str, i64> = BTreeMap::new();
    for item in items {
        latest.insert(&item.product_id, item.unit_price_cents);
    }
    for (product_id, cost) in latest {
        ProductRepository::update_cost_price(&mut *conn, product_id, cost, now).await?;
    }
    Ok(())
}
