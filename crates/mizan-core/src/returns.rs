//! # Return Rules
//!
//! Decides how much of each sale item may still be returned and prices the
//! accepted lines.
//!
//! ```text
//! already_returned = Σ quantity of COMPLETED returns on the item
//! available        = original quantity - already_returned
//! amount           = original unit price × requested quantity
//! ```
//!
//! The caller loads `returned` inside the same transaction that writes the
//! returns, so two concurrent requests cannot both pass the check.

use std::collections::HashMap;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;
use crate::request::ReturnRequest;
use crate::types::SaleItem;

/// One accepted return line, ready to persist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedReturn {
    pub sale_item_id: String,
    pub product_id: String,
    pub quantity: i64,
    pub amount_cents: i64,
}

/// Validates every requested line before any is accepted.
///
/// `items` are the sale's items; `returned` maps sale item id to its
/// completed return quantity. A sale item named twice in one request is
/// checked against the running total.
pub fn plan_returns(
    request: &ReturnRequest,
    items: &[SaleItem],
    returned: &HashMap<String, i64>,
) -> CoreResult<Vec<PlannedReturn>> {
    request.validate()?;

    let by_id: HashMap<&str, &SaleItem> = items.iter().map(|i| (i.id.as_str(), i)).collect();
    let mut in_batch: HashMap<&str, i64> = HashMap::new();
    let mut planned = Vec::with_capacity(request.items.len());

    for (i, line) in request.items.iter().enumerate() {
        let item = by_id
            .get(line.sale_item_id.as_str())
            .copied()
            .ok_or_else(|| CoreError::SaleItemNotFound {
                sale_id: request.sale_id.clone(),
                sale_item_id: line.sale_item_id.clone(),
            })?;

        let pending = in_batch.entry(item.id.as_str()).or_insert(0);
        let already_returned = returned.get(&item.id).copied().unwrap_or(0) + *pending;
        let available = item.quantity - already_returned;

        if line.quantity > available {
            return Err(CoreError::OverReturn {
                sale_item_id: item.id.clone(),
                original: item.quantity,
                already_returned,
                requested: line.quantity,
                available,
            });
        }
        *pending += line.quantity;

        let amount = item
            .unit_price()
            .checked_times(line.quantity)
            .ok_or_else(|| ValidationError::InvalidFormat {
                field: format!("items[{i}].quantity"),
                reason: "amount is too large".to_string(),
            })?;

        planned.push(PlannedReturn {
            sale_item_id: item.id.clone(),
            product_id: item.product_id.clone(),
            quantity: line.quantity,
            amount_cents: amount.cents(),
        });
    }

    Ok(planned)
}

/// Sum of a batch's return amounts; the sale's net amount drops by this.
pub fn batch_amount(planned: &[PlannedReturn]) -> Money {
    planned
        .iter()
        .map(|p| Money::from_cents(p.amount_cents))
        .sum()
}
