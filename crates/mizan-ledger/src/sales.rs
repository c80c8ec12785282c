//! # Sale Ledger
//!
//! ## Sale Edit: Validate, Then Apply
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  PASS 1 (no writes)                                                     │
//! │    plan new lines (stock check skipped)                                 │
//! │    delta(product) = old qty - new qty over both item sets               │
//! │    every product: stock + delta >= 0          else InsufficientStock    │
//! │    match new lines to old rows                else EditBelowReturned    │
//! │                                                                         │
//! │  PASS 2 (only if pass 1 accepted everything)                            │
//! │    rewrite item rows in place, insert new, delete unreturned leftovers  │
//! │    apply every delta + one SALE_EDIT history row per product            │
//! │    header totals; net = total - discount + tax - completed returns      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Item rows are reconciled rather than replaced so returns keep pointing at
//! the rows they were taken from.

use chrono::Utc;
use sqlx::SqliteConnection;
use std::collections::HashMap;
use tracing::info;

use mizan_core::builder::{Direction, PlannedLine, TransactionBuilder};
use mizan_core::invoice::InvoiceKind;
use mizan_core::reconcile::{quantities_by_product, reconcile_items, stock_deltas, validate_deltas};
use mizan_core::request::SaleRequest;
use mizan_core::window::check_edit_window;
use mizan_core::{CoreError, InventoryAction, Sale, SaleItem, SaleLine, SaleRecord, TransactionStatus};
use mizan_db::{InventoryRepository, ProductRepository, ReturnRepository, SaleRepository, StockMovement};

use crate::{new_id, Ledger, LedgerResult};

impl Ledger {
    /// Records a sale: header, items, one SALE history row per item.
    ///
    /// Fails without writing anything if any product is missing, inactive or
    /// short of stock.
    pub async fn create_sale(&self, request: &SaleRequest, user_id: &str) -> LedgerResult<SaleRecord> {
        self.bounded(
            "create_sale",
            self.with_fresh_invoice(InvoiceKind::Sale, move |invoice_number| {
                self.create_sale_once(request, user_id, invoice_number)
            }),
        )
        .await
    }

    async fn create_sale_once(
        &self,
        request: &SaleRequest,
        user_id: &str,
        invoice_number: String,
    ) -> LedgerResult<SaleRecord> {
        request.validate()?;

        let mut tx = self.db.begin_immediate().await?;

        let catalog = ProductRepository::find_many(
            &mut tx,
            request.transaction.items.iter().map(|line| line.product_id.as_str()),
        )
        .await?;
        let plan = TransactionBuilder::new(Direction::Sale).build(&request.transaction, &catalog)?;

        let now = Utc::now();
        let sale = Sale {
            id: new_id(),
            invoice_number,
            customer_id: request.customer_id.clone(),
            payment_method: request.payment_method,
            user_id: user_id.to_string(),
            total_amount_cents: plan.total_amount_cents,
            discount_cents: plan.discount_cents,
            tax_cents: plan.tax_cents,
            net_amount_cents: plan.net_amount_cents,
            status: TransactionStatus::Completed,
            notes: request.notes.clone(),
            created_at: now,
            updated_at: now,
        };
        SaleRepository::insert_header(&mut tx, &sale).await?;

        let mut items = Vec::with_capacity(plan.lines.len());
        for (position, line) in plan.lines.iter().enumerate() {
            let item = sale_item(&sale.id, position as i64, line, new_id());
            SaleRepository::insert_item(&mut tx, &item).await?;

            let movement = StockMovement {
                product_id: &item.product_id,
                action: InventoryAction::Sale,
                reference_id: Some(&sale.id),
                reason: None,
                user_id,
            };
            InventoryRepository::apply_movement(&mut tx, &movement, -item.quantity, now).await?;
            items.push(item);
        }

        tx.commit().await?;

        info!(
            sale_id = %sale.id,
            invoice = %sale.invoice_number,
            items = items.len(),
            net_amount_cents = sale.net_amount_cents,
            "Sale created"
        );

        Ok(SaleRecord {
            sale,
            items: items.into_iter().map(|item| sale_line(item, 0)).collect(),
            returns: Vec::new(),
        })
    }

    /// Replaces a sale's lines within 24 hours of its creation.
    ///
    /// All stock deltas are validated before any is applied; either every
    /// affected product moves or none does.
    pub async fn edit_sale(
        &self,
        sale_id: &str,
        request: &SaleRequest,
        user_id: &str,
    ) -> LedgerResult<SaleRecord> {
        self.bounded("edit_sale", self.edit_sale_once(sale_id, request, user_id))
            .await
    }

    async fn edit_sale_once(
        &self,
        sale_id: &str,
        request: &SaleRequest,
        user_id: &str,
    ) -> LedgerResult<SaleRecord> {
        request.validate()?;

        let mut tx = self.db.begin_immediate().await?;
        let now = Utc::now();

        let sale = SaleRepository::find(&mut *tx, sale_id)
            .await?
            .ok_or_else(|| CoreError::SaleNotFound(sale_id.to_string()))?;
        if sale.status != TransactionStatus::Completed {
            return Err(CoreError::NotEditable {
                reason: format!("sale status is {}", sale.status),
            }
            .into());
        }
        check_edit_window(sale.created_at, now)?;

        let old_items = SaleRepository::find_items(&mut *tx, sale_id).await?;
        let returned = ReturnRepository::returned_by_item(&mut *tx, sale_id).await?;
        let (_, returned_amount) = ReturnRepository::completed_totals(&mut *tx, sale_id).await?;

        let product_ids: Vec<&str> = old_items
            .iter()
            .map(|item| item.product_id.as_str())
            .chain(request.transaction.items.iter().map(|line| line.product_id.as_str()))
            .collect();
        let catalog = ProductRepository::find_many(&mut tx, product_ids).await?;

        // Pass 1
        let plan = TransactionBuilder::new(Direction::Sale)
            .skip_stock_check()
            .build(&request.transaction, &catalog)?;

        let deltas = stock_deltas(&quantities_by_product(&old_items), &plan.quantities());
        validate_deltas(&deltas, &catalog)?;

        let reconciliation = reconcile_items(&old_items, &returned, &plan.lines)?;

        let net_amount_cents = plan.net_amount_cents - returned_amount;

        // Pass 2
        for item_id in &reconciliation.deletes {
            SaleRepository::delete_item(&mut tx, item_id).await?;
        }
        for update in &reconciliation.updates {
            let item = sale_item(sale_id, update.position, &update.line, update.sale_item_id.clone());
            SaleRepository::update_item(&mut tx, &item).await?;
        }
        for insert in &reconciliation.inserts {
            let item = sale_item(sale_id, insert.position, &insert.line, new_id());
            SaleRepository::insert_item(&mut tx, &item).await?;
        }

        for (product_id, delta) in &deltas {
            let movement = StockMovement {
                product_id,
                action: InventoryAction::SaleEdit,
                reference_id: Some(sale_id),
                reason: Some("Sale edited"),
                user_id,
            };
            InventoryRepository::apply_movement(&mut tx, &movement, *delta, now).await?;
        }

        let edited = Sale {
            customer_id: request.customer_id.clone(),
            payment_method: request.payment_method,
            total_amount_cents: plan.total_amount_cents,
            discount_cents: plan.discount_cents,
            tax_cents: plan.tax_cents,
            net_amount_cents,
            notes: request.notes.clone(),
            updated_at: now,
            ..sale
        };
        SaleRepository::update_header(&mut tx, &edited).await?;

        let record = load_sale_record(&mut tx, sale_id).await?;
        tx.commit().await?;

        info!(
            sale_id = %sale_id,
            products_moved = deltas.len(),
            updated = reconciliation.updates.len(),
            inserted = reconciliation.inserts.len(),
            deleted = reconciliation.deletes.len(),
            "Sale edited"
        );
        Ok(record)
    }

    /// Puts every item back into stock (SALE_CANCELLED) and deletes the sale.
    /// Refused once the sale has completed returns.
    pub async fn cancel_sale(&self, sale_id: &str, user_id: &str) -> LedgerResult<()> {
        self.bounded("cancel_sale", self.cancel_sale_once(sale_id, user_id))
            .await
    }

    async fn cancel_sale_once(&self, sale_id: &str, user_id: &str) -> LedgerResult<()> {
        let mut tx = self.db.begin_immediate().await?;

        if SaleRepository::find(&mut *tx, sale_id).await?.is_none() {
            return Err(CoreError::SaleNotFound(sale_id.to_string()).into());
        }

        let (returns, _) = ReturnRepository::completed_totals(&mut *tx, sale_id).await?;
        if returns > 0 {
            return Err(CoreError::SaleHasReturns {
                sale_id: sale_id.to_string(),
                returns,
            }
            .into());
        }

        let now = Utc::now();
        let items = SaleRepository::find_items(&mut *tx, sale_id).await?;
        for item in &items {
            let movement = StockMovement {
                product_id: &item.product_id,
                action: InventoryAction::SaleCancelled,
                reference_id: Some(sale_id),
                reason: Some("Sale cancelled"),
                user_id,
            };
            InventoryRepository::apply_movement(&mut tx, &movement, item.quantity, now).await?;
        }

        SaleRepository::delete(&mut tx, sale_id).await?;
        tx.commit().await?;

        info!(sale_id = %sale_id, items = items.len(), "Sale cancelled");
        Ok(())
    }

    /// A sale with its items, their return progress, and its returns.
    pub async fn get_sale(&self, sale_id: &str) -> LedgerResult<SaleRecord> {
        let mut tx = self.db.pool().begin().await?;
        let record = load_sale_record(&mut tx, sale_id).await?;
        tx.rollback().await?;
        Ok(record)
    }

    /// Most recent sales first.
    pub async fn recent_sales(&self, limit: u32) -> LedgerResult<Vec<Sale>> {
        Ok(self.db.sales().list_recent(limit).await?)
    }
}

fn sale_item(sale_id: &str, position: i64, line: &PlannedLine, id: String) -> SaleItem {
    SaleItem {
        id,
        sale_id: sale_id.to_string(),
        product_id: line.product_id.clone(),
        quantity: line.quantity,
        unit_price_cents: line.unit_price_cents,
        total_cents: line.line_total_cents,
        position,
    }
}

fn sale_line(item: SaleItem, returned_quantity: i64) -> SaleLine {
    SaleLine {
        returnable_quantity: item.quantity - returned_quantity,
        returned_quantity,
        item,
    }
}

async fn load_sale_record(conn: &mut SqliteConnection, sale_id: &str) -> LedgerResult<SaleRecord> {
    let sale = SaleRepository::find(&mut *conn, sale_id)
        .await?
        .ok_or_else(|| CoreError::SaleNotFound(sale_id.to_string()))?;
    let items = SaleRepository::find_items(&mut *conn, sale_id).await?;
    let returned: HashMap<String, i64> = ReturnRepository::returned_by_item(&mut *conn, sale_id).await?;
    let returns = ReturnRepository::find_for_sale(&mut *conn, sale_id).await?;

    let items = items
        .into_iter()
        .map(|item| {
            let already = returned.get(&item.id).copied().unwrap_or(0);
            sale_line(item, already)
        })
        .collect();

    Ok(SaleRecord { sale, items, returns })
}
