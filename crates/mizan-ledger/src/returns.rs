//! # Return Processor
//!
//! Partial returns against a sale's items.
//!
//! The returned-so-far figures are read after `BEGIN IMMEDIATE`, so two
//! concurrent returns on one item are checked one after the other and
//! cannot jointly exceed what was sold.

use chrono::Utc;
use tracing::info;

use mizan_core::request::ReturnRequest;
use mizan_core::returns::{batch_amount, plan_returns};
use mizan_core::window::check_return_window;
use mizan_core::{CoreError, InventoryAction, Return, TransactionStatus};
use mizan_db::{InventoryRepository, ReturnRepository, SaleRepository, StockMovement};

use crate::{new_id, Ledger, LedgerResult};

impl Ledger {
    /// Accepts every requested line or none.
    ///
    /// Each accepted line becomes a COMPLETED return, puts its quantity back
    /// into stock (RETURN history, referencing the sale) and the sale's net
    /// amount drops by the batch total.
    pub async fn process_return(&self, request: &ReturnRequest, user_id: &str) -> LedgerResult<Vec<Return>> {
        self.bounded("process_return", self.process_return_once(request, user_id))
            .await
    }

    async fn process_return_once(&self, request: &ReturnRequest, user_id: &str) -> LedgerResult<Vec<Return>> {
        request.validate()?;

        let mut tx = self.db.begin_immediate().await?;
        let now = Utc::now();

        let sale = SaleRepository::find(&mut *tx, &request.sale_id)
            .await?
            .ok_or_else(|| CoreError::SaleNotFound(request.sale_id.clone()))?;
        check_return_window(sale.created_at, now)?;

        let items = SaleRepository::find_items(&mut *tx, &sale.id).await?;
        let returned = ReturnRepository::returned_by_item(&mut *tx, &sale.id).await?;
        let planned = plan_returns(request, &items, &returned)?;

        let mut accepted = Vec::with_capacity(planned.len());
        for line in &planned {
            let ret = Return {
                id: new_id(),
                sale_id: sale.id.clone(),
                sale_item_id: line.sale_item_id.clone(),
                product_id: line.product_id.clone(),
                quantity: line.quantity,
                amount_cents: line.amount_cents,
                reason: request.reason.clone(),
                status: TransactionStatus::Completed,
                user_id: user_id.to_string(),
                created_at: now,
            };
            ReturnRepository::insert(&mut tx, &ret).await?;

            let movement = StockMovement {
                product_id: &line.product_id,
                action: InventoryAction::Return,
                reference_id: Some(&sale.id),
                reason: Some(&request.reason),
                user_id,
            };
            InventoryRepository::apply_movement(&mut tx, &movement, line.quantity, now).await?;
            accepted.push(ret);
        }

        let amount = batch_amount(&planned);
        SaleRepository::reduce_net_amount(&mut tx, &sale.id, amount.cents(), now).await?;

        tx.commit().await?;

        info!(
            sale_id = %sale.id,
            lines = accepted.len(),
            amount = %amount,
            "Return processed"
        );
        Ok(accepted)
    }

    /// A sale's returns, oldest first.
    pub async fn sale_returns(&self, sale_id: &str) -> LedgerResult<Vec<Return>> {
        Ok(self.db.returns().get_for_sale(sale_id).await?)
    }
}
