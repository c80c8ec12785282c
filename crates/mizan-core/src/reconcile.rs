//! # Sale Edit Reconciliation
//!
//! Math for editing a sale in place, plus history replay.
//!
//! ## Two-Pass Edit
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Pass 1 (validate, no writes)                                           │
//! │    old items ─┐                                                         │
//! │               ├─► stock_deltas: delta(p) = old(p) - new(p)              │
//! │    new plan  ─┘         │                                               │
//! │                         ▼                                               │
//! │               validate_deltas: stock(p) + delta(p) ≥ 0 for EVERY p      │
//! │               reconcile_items: no line below its returned quantity      │
//! │                                                                         │
//! │  Pass 2 (apply, only if pass 1 passed for all products)                 │
//! │    item rows ▸ stock deltas ▸ SALE_EDIT history ▸ header totals         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A positive delta returns stock to the shelf, a negative one consumes it.
//!
//! Item rows are updated in place rather than replaced so that returns keep
//! pointing at the sale item they were made against.

use std::collections::{BTreeMap, HashMap, VecDeque};

use crate::builder::{PlannedLine, ProductCatalog};
use crate::error::{CoreError, CoreResult};
use crate::types::{InventoryHistory, SaleItem};

// =============================================================================
// Stock Deltas
// =============================================================================

/// Summed quantity per product for a set of sale items.
pub fn quantities_by_product(items: &[SaleItem]) -> BTreeMap<String, i64> {
    let mut totals = BTreeMap::new();
    for item in items {
        *totals.entry(item.product_id.clone()).or_insert(0) += item.quantity;
    }
    totals
}

/// Per-product `old - new` over the union of both sets. Zero deltas are
/// omitted.
///
/// ```rust
/// use std::collections::BTreeMap;
/// use mizan_core::reconcile::stock_deltas;
///
/// let old = BTreeMap::from([("a".to_string(), 4), ("b".to_string(), 2)]);
/// let new = BTreeMap::from([("a".to_string(), 7), ("c".to_string(), 1)]);
///
/// let deltas = stock_deltas(&old, &new);
/// assert_eq!(deltas["a"], -3);
/// assert_eq!(deltas["b"], 2);
/// assert_eq!(deltas["c"], -1);
/// ```
pub fn stock_deltas(
    old: &BTreeMap<String, i64>,
    new: &BTreeMap<String, i64>,
) -> BTreeMap<String, i64> {
    let mut deltas: BTreeMap<String, i64> = old.clone();
    for (product_id, quantity) in new {
        *deltas.entry(product_id.clone()).or_insert(0) -= quantity;
    }
    deltas.retain(|_, delta| *delta != 0);
    deltas
}

/// Checks every delta against current stock before anything is applied.
///
/// The first failing product is reported with `available` = current stock
/// and `requested` = units the edit would consume.
pub fn validate_deltas<C: ProductCatalog + ?Sized>(
    deltas: &BTreeMap<String, i64>,
    catalog: &C,
) -> CoreResult<()> {
    for (product_id, delta) in deltas {
        let product = catalog
            .product(product_id)
            .ok_or_else(|| CoreError::ProductNotFound(product_id.clone()))?;

        if product.quantity + delta < 0 {
            return Err(CoreError::insufficient_stock(
                product.sku.clone(),
                product.quantity,
                -delta,
            ));
        }
    }
    Ok(())
}

// =============================================================================
// Item Reconciliation
// =============================================================================

/// An existing sale item rewritten with a new line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemUpdate {
    pub sale_item_id: String,
    pub position: i64,
    pub line: PlannedLine,
}

/// A line with no existing item to reuse.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemInsert {
    pub position: i64,
    pub line: PlannedLine,
}

/// Row-level changes that turn the old item set into the new one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ItemReconciliation {
    pub updates: Vec<ItemUpdate>,
    pub inserts: Vec<ItemInsert>,
    /// Ids of items dropped from the sale; none of them has returns.
    pub deletes: Vec<String>,
}

/// Matches new lines to existing items of the same product.
///
/// Within a product, items that already have returns are matched first so
/// that only unreturned rows are ever deleted. A matched item may not shrink
/// below its returned quantity, and an item with returns may not be dropped:
/// both yield [`CoreError::EditBelowReturned`].
///
/// `returned` maps sale item id to its completed return quantity.
pub fn reconcile_items(
    existing: &[SaleItem],
    returned: &HashMap<String, i64>,
    lines: &[PlannedLine],
) -> CoreResult<ItemReconciliation> {
    let returned_of = |id: &str| returned.get(id).copied().unwrap_or(0);

    let mut by_product: HashMap<&str, Vec<&SaleItem>> = HashMap::new();
    for item in existing {
        by_product.entry(item.product_id.as_str()).or_default().push(item);
    }

    let mut queues: HashMap<&str, VecDeque<&SaleItem>> = by_product
        .into_iter()
        .map(|(product_id, mut items)| {
            items.sort_by_key(|item| (returned_of(&item.id) == 0, item.position));
            (product_id, items.into_iter().collect())
        })
        .collect();

    let mut plan = ItemReconciliation::default();

    for (position, line) in lines.iter().enumerate() {
        let position = position as i64;
        let reused = queues
            .get_mut(line.product_id.as_str())
            .and_then(VecDeque::pop_front);

        match reused {
            Some(item) => {
                let already = returned_of(&item.id);
                if line.quantity < already {
                    return Err(CoreError::EditBelowReturned {
                        sale_item_id: item.id.clone(),
                        returned: already,
                        requested: line.quantity,
                    });
                }
                plan.updates.push(ItemUpdate {
                    sale_item_id: item.id.clone(),
                    position,
                    line: line.clone(),
                });
            }
            None => plan.inserts.push(ItemInsert {
                position,
                line: line.clone(),
            }),
        }
    }

    let mut leftovers: Vec<&SaleItem> = queues.into_values().flatten().collect();
    leftovers.sort_by_key(|item| item.position);

    for item in leftovers {
        let already = returned_of(&item.id);
        if already > 0 {
            return Err(CoreError::EditBelowReturned {
                sale_item_id: item.id.clone(),
                returned: already,
                requested: 0,
            });
        }
        plan.deletes.push(item.id.clone());
    }

    Ok(plan)
}

// =============================================================================
// History Replay
// =============================================================================

/// Replays a product's history from a zero baseline.
///
/// For a consistent ledger this equals the product's stored quantity.
pub fn replay(history: &[InventoryHistory]) -> i64 {
    history.iter().map(|entry| entry.quantity_change).sum()
}

/// Index of the first entry whose `previous_quantity` does not continue
/// from the entry before it, or whose change does not match its endpoints.
pub fn first_broken_link(history: &[InventoryHistory]) -> Option<usize> {
    let mut expected_previous = 0;
    for (i, entry) in history.iter().enumerate() {
        if entry.previous_quantity != expected_previous
            || entry.new_quantity - entry.previous_quantity != entry.quantity_change
        {
            return Some(i);
        }
        expected_previous = entry.new_quantity;
    }
    None
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{InventoryAction, Product};
    use chrono::Utc;

    fn item(id: &str, product_id: &str, quantity: i64, position: i64) -> SaleItem {
        SaleItem {
            id: id.to_string(),
            sale_id: "s1".to_string(),
            product_id: product_id.to_string(),
            quantity,
            unit_price_cents: 100,
            total_cents: quantity * 100,
            position,
        }
    }

    fn line(product_id: &str, quantity: i64) -> PlannedLine {
        PlannedLine {
            product_id: product_id.to_string(),
            sku: format!("SKU-{product_id}"),
            quantity,
            unit_price_cents: 100,
            line_total_cents: quantity * 100,
        }
    }

    fn product(id: &str, quantity: i64) -> Product {
        let now = Utc::now();
        Product {
            id: id.to_string(),
            sku: format!("SKU-{id}"),
            barcode: None,
            name: id.to_string(),
            quantity,
            min_quantity: 0,
            cost_price_cents: 1,
            selling_price_cents: 1,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    fn entry(previous: i64, new: i64) -> InventoryHistory {
        InventoryHistory {
            id: format!("h{previous}-{new}"),
            product_id: "p".to_string(),
            action: InventoryAction::QuantityAdjustment,
            previous_quantity: previous,
            new_quantity: new,
            quantity_change: new - previous,
            reference_id: None,
            reason: None,
            user_id: "u".to_string(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_deltas_cover_union_and_drop_zeroes() {
        let old = quantities_by_product(&[item("1", "a", 4, 0), item("2", "b", 2, 1)]);
        let new = BTreeMap::from([("a".to_string(), 4), ("c".to_string(), 3)]);

        let deltas = stock_deltas(&old, &new);
        assert_eq!(deltas.len(), 2);
        assert_eq!(deltas["b"], 2);
        assert_eq!(deltas["c"], -3);
    }

    #[test]
    fn test_validate_deltas_checks_every_product_before_applying() {
        let catalog: HashMap<String, Product> = [product("a", 8), product("b", 1)]
            .into_iter()
            .map(|p| (p.id.clone(), p))
            .collect();

        // a: consumes 3 of 8 (fine); b: consumes 2 of 1 (fails)
        let deltas = BTreeMap::from([("a".to_string(), -3), ("b".to_string(), -2)]);
        let err = validate_deltas(&deltas, &catalog).unwrap_err();
        assert_eq!(err, CoreError::insufficient_stock("SKU-b", 1, 2));
        assert_eq!(err.deficit(), Some(1));

        let ok = BTreeMap::from([("a".to_string(), -8), ("b".to_string(), 5)]);
        assert!(validate_deltas(&ok, &catalog).is_ok());
    }

    #[test]
    fn test_reconcile_updates_inserts_and_deletes() {
        let existing = vec![item("i1", "a", 4, 0), item("i2", "b", 1, 1)];
        let lines = vec![line("a", 7), line("c", 2)];

        let plan = reconcile_items(&existing, &HashMap::new(), &lines).unwrap();
        assert_eq!(plan.updates.len(), 1);
        assert_eq!(plan.updates[0].sale_item_id, "i1");
        assert_eq!(plan.updates[0].line.quantity, 7);
        assert_eq!(plan.inserts.len(), 1);
        assert_eq!(plan.inserts[0].position, 1);
        assert_eq!(plan.deletes, vec!["i2".to_string()]);
    }

    #[test]
    fn test_reconcile_prefers_items_with_returns() {
        let existing = vec![item("i1", "a", 2, 0), item("i2", "a", 3, 1)];
        let returned = HashMap::from([("i2".to_string(), 1)]);

        let plan = reconcile_items(&existing, &returned, &[line("a", 5)]).unwrap();
        assert_eq!(plan.updates[0].sale_item_id, "i2");
        assert_eq!(plan.deletes, vec!["i1".to_string()]);
    }

    #[test]
    fn test_reconcile_rejects_edit_below_returned() {
        let existing = vec![item("i1", "a", 4, 0)];
        let returned = HashMap::from([("i1".to_string(), 2)]);

        let err = reconcile_items(&existing, &returned, &[line("a", 1)]).unwrap_err();
        assert_eq!(
            err,
            CoreError::EditBelowReturned {
                sale_item_id: "i1".to_string(),
                returned: 2,
                requested: 1
            }
        );

        let dropped = reconcile_items(&existing, &returned, &[line("b", 1)]).unwrap_err();
        assert!(matches!(dropped, CoreError::EditBelowReturned { requested: 0, .. }));
    }

    #[test]
    fn test_replay_and_chain() {
        let history = vec![entry(0, 10), entry(10, 6), entry(6, 8)];
        assert_eq!(replay(&history), 8);
        assert_eq!(first_broken_link(&history), None);

        let broken = vec![entry(0, 10), entry(9, 6)];
        assert_eq!(first_broken_link(&broken), Some(1));
    }
}
