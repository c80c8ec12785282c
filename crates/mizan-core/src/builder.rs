//! # Transaction Builder
//!
//! Validates a proposed set of line items against the current catalog and
//! computes monetary totals. Performs no writes: the resulting
//! [`TransactionPlan`] is handed to the ledger, which persists it inside one
//! database transaction.
//!
//! ## Flow
//! ```text
//! TransactionRequest { items, discount, tax }
//!      │
//!      ├── field checks ........ items[i].quantity > 0, unit price > 0,
//!      │                         discount ≥ 0, tax ≥ 0
//!      ├── catalog lookup ...... ProductNotFound / ProductInactive
//!      ├── stock check (sale) .. Σ requested per product ≤ on hand
//!      │                         → InsufficientStock
//!      └── totals .............. line = qty × price
//!                                total = Σ line
//!                                net = total - discount + tax ≥ 0
//!                                → NegativeNetAmount
//! ```
//!
//! The same product may appear on several lines; stock is checked against
//! the summed quantity.

use std::collections::{BTreeMap, HashMap};

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;
use crate::request::TransactionRequest;
use crate::types::Product;
use crate::validation::{validate_id, validate_line_count, validate_non_negative, validate_positive};

// =============================================================================
// Catalog
// =============================================================================

/// Read access to products, loaded by the caller inside its transaction.
pub trait ProductCatalog {
    fn product(&self, id: &str) -> Option<&Product>;
}

impl ProductCatalog for HashMap<String, Product> {
    fn product(&self, id: &str) -> Option<&Product> {
        self.get(id)
    }
}

impl ProductCatalog for BTreeMap<String, Product> {
    fn product(&self, id: &str) -> Option<&Product> {
        self.get(id)
    }
}

// =============================================================================
// Plan
// =============================================================================

/// Whether the transaction removes stock (sale) or adds it (purchase).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Sale,
    Purchase,
}

/// A validated, priced line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedLine {
    pub product_id: String,
    pub sku: String,
    pub quantity: i64,
    pub unit_price_cents: i64,
    pub line_total_cents: i64,
}

/// Output of [`TransactionBuilder::build`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionPlan {
    pub direction: Direction,
    pub lines: Vec<PlannedLine>,
    pub total_amount_cents: i64,
    pub discount_cents: i64,
    pub tax_cents: i64,
    pub net_amount_cents: i64,
}

impl TransactionPlan {
    #[inline]
    pub fn total_amount(&self) -> Money {
        Money::from_cents(self.total_amount_cents)
    }

    #[inline]
    pub fn net_amount(&self) -> Money {
        Money::from_cents(self.net_amount_cents)
    }

    /// Summed quantity per product, in product-id order.
    pub fn quantities(&self) -> BTreeMap<String, i64> {
        let mut totals = BTreeMap::new();
        for line in &self.lines {
            *totals.entry(line.product_id.clone()).or_insert(0) += line.quantity;
        }
        totals
    }
}

// =============================================================================
// Builder
// =============================================================================

/// Builds a [`TransactionPlan`].
///
/// ```rust
/// use std::collections::HashMap;
/// use chrono::Utc;
/// use mizan_core::builder::{Direction, TransactionBuilder};
/// use mizan_core::request::{LineInput, TransactionRequest};
/// use mizan_core::Product;
///
/// let now = Utc::now();
/// let mut catalog = HashMap::new();
/// catalog.insert("p1".to_string(), Product {
///     id: "p1".into(), sku: "PEN".into(), barcode: None, name: "Pen".into(),
///     quantity: 10, min_quantity: 5, cost_price_cents: 50, selling_price_cents: 80,
///     is_active: true, created_at: now, updated_at: now,
/// });
///
/// let request = TransactionRequest::new(vec![LineInput::new("p1", 3, 80)]).with_tax(10);
/// let plan = TransactionBuilder::new(Direction::Sale).build(&request, &catalog).unwrap();
/// assert_eq!(plan.total_amount_cents, 240);
/// assert_eq!(plan.net_amount_cents, 250);
/// ```
#[derive(Debug, Clone, Copy)]
pub struct TransactionBuilder {
    direction: Direction,
    check_stock: bool,
}

impl TransactionBuilder {
    /// Sales check stock by default; purchases never do.
    pub fn new(direction: Direction) -> Self {
        Self {
            direction,
            check_stock: direction == Direction::Sale,
        }
    }

    /// Skip the on-hand check. Sale edits validate net deltas instead.
    pub fn skip_stock_check(mut self) -> Self {
        self.check_stock = false;
        self
    }

    pub fn build<C: ProductCatalog + ?Sized>(
        &self,
        request: &TransactionRequest,
        catalog: &C,
    ) -> CoreResult<TransactionPlan> {
        validate_line_count(request.items.len())?;
        validate_non_negative("discount_cents", request.discount_cents)?;
        validate_non_negative("tax_cents", request.tax_cents)?;

        let mut lines = Vec::with_capacity(request.items.len());
        let mut total = Money::zero();

        for (i, item) in request.items.iter().enumerate() {
            validate_id(&format!("items[{i}].product_id"), &item.product_id)?;
            validate_positive(&format!("items[{i}].quantity"), item.quantity)?;
            validate_positive(&format!("items[{i}].unit_price_cents"), item.unit_price_cents)?;

            let product = catalog
                .product(&item.product_id)
                .ok_or_else(|| CoreError::ProductNotFound(item.product_id.clone()))?;

            if !product.is_active {
                return Err(CoreError::ProductInactive {
                    sku: product.sku.clone(),
                });
            }

            let line_total = Money::from_cents(item.unit_price_cents)
                .checked_times(item.quantity)
                .ok_or_else(|| overflow(&format!("items[{i}]")))?;
            total = total
                .checked_add(line_total)
                .ok_or_else(|| overflow("items"))?;

            lines.push(PlannedLine {
                product_id: product.id.clone(),
                sku: product.sku.clone(),
                quantity: item.quantity,
                unit_price_cents: item.unit_price_cents,
                line_total_cents: line_total.cents(),
            });
        }

        let net = total.cents() - request.discount_cents + request.tax_cents;
        if net < 0 {
            return Err(CoreError::NegativeNetAmount {
                total: total.cents(),
                discount: request.discount_cents,
                tax: request.tax_cents,
            });
        }

        let plan = TransactionPlan {
            direction: self.direction,
            lines,
            total_amount_cents: total.cents(),
            discount_cents: request.discount_cents,
            tax_cents: request.tax_cents,
            net_amount_cents: net,
        };

        if self.check_stock {
            for (product_id, requested) in plan.quantities() {
                // present: every line was looked up above
                if let Some(product) = catalog.product(&product_id) {
                    if product.quantity < requested {
                        return Err(CoreError::insufficient_stock(
                            product.sku.clone(),
                            product.quantity,
                            requested,
                        ));
                    }
                }
            }
        }

        Ok(plan)
    }
}

fn overflow(field: &str) -> CoreError {
    ValidationError::InvalidFormat {
        field: field.to_string(),
        reason: "amount is too large".to_string(),
    }
    .into()
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::LineInput;
    use chrono::Utc;

    fn product(id: &str, quantity: i64) -> Product {
        let now = Utc::now();
        Product {
            id: id.to_string(),
            sku: format!("SKU-{id}"),
            barcode: None,
            name: format!("Product {id}"),
            quantity,
            min_quantity: 5,
            cost_price_cents: 100,
            selling_price_cents: 150,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    fn catalog(products: Vec<Product>) -> HashMap<String, Product> {
        products.into_iter().map(|p| (p.id.clone(), p)).collect()
    }

    #[test]
    fn test_totals() {
        let catalog = catalog(vec![product("a", 10), product("b", 10)]);
        let request = TransactionRequest::new(vec![
            LineInput::new("a", 2, 150),
            LineInput::new("b", 1, 1000),
        ])
        .with_discount(100)
        .with_tax(50);

        let plan = TransactionBuilder::new(Direction::Sale)
            .build(&request, &catalog)
            .unwrap();

        assert_eq!(plan.lines.len(), 2);
        assert_eq!(plan.lines[0].line_total_cents, 300);
        assert_eq!(plan.total_amount_cents, 1300);
        assert_eq!(plan.net_amount_cents, 1250);
        assert_eq!(plan.lines[1].sku, "SKU-b");
    }

    #[test]
    fn test_sale_rejects_insufficient_stock_on_summed_lines() {
        let catalog = catalog(vec![product("a", 5)]);
        let request = TransactionRequest::new(vec![
            LineInput::new("a", 3, 100),
            LineInput::new("a", 3, 100),
        ]);

        let err = TransactionBuilder::new(Direction::Sale)
            .build(&request, &catalog)
            .unwrap_err();

        assert_eq!(err, CoreError::insufficient_stock("SKU-a", 5, 6));
        assert_eq!(err.deficit(), Some(1));
    }

    #[test]
    fn test_purchase_has_no_upper_bound() {
        let catalog = catalog(vec![product("a", 0)]);
        let request = TransactionRequest::new(vec![LineInput::new("a", 1_000, 100)]);

        let plan = TransactionBuilder::new(Direction::Purchase)
            .build(&request, &catalog)
            .unwrap();
        assert_eq!(plan.quantities().get("a"), Some(&1_000));
    }

    #[test]
    fn test_skip_stock_check() {
        let catalog = catalog(vec![product("a", 1)]);
        let request = TransactionRequest::new(vec![LineInput::new("a", 4, 100)]);

        assert!(TransactionBuilder::new(Direction::Sale)
            .skip_stock_check()
            .build(&request, &catalog)
            .is_ok());
    }

    #[test]
    fn test_unknown_and_inactive_products() {
        let mut inactive = product("b", 10);
        inactive.is_active = false;
        let catalog = catalog(vec![product("a", 10), inactive]);

        let missing = TransactionRequest::new(vec![LineInput::new("zzz", 1, 100)]);
        assert_eq!(
            TransactionBuilder::new(Direction::Sale).build(&missing, &catalog),
            Err(CoreError::ProductNotFound("zzz".to_string()))
        );

        let deactivated = TransactionRequest::new(vec![LineInput::new("b", 1, 100)]);
        assert_eq!(
            TransactionBuilder::new(Direction::Purchase).build(&deactivated, &catalog),
            Err(CoreError::ProductInactive {
                sku: "SKU-b".to_string()
            })
        );
    }

    #[test]
    fn test_negative_net_amount() {
        let catalog = catalog(vec![product("a", 10)]);
        let request = TransactionRequest::new(vec![LineInput::new("a", 1, 100)])
            .with_discount(200)
            .with_tax(50);

        let err = TransactionBuilder::new(Direction::Sale)
            .build(&request, &catalog)
            .unwrap_err();
        assert_eq!(
            err,
            CoreError::NegativeNetAmount {
                total: 100,
                discount: 200,
                tax: 50
            }
        );
    }

    #[test]
    fn test_field_level_validation() {
        let catalog = catalog(vec![product("a", 10)]);

        let empty = TransactionRequest::new(vec![]);
        let err = TransactionBuilder::new(Direction::Sale)
            .build(&empty, &catalog)
            .unwrap_err();
        assert!(matches!(err, CoreError::Validation(ValidationError::Required { .. })));

        let bad_qty = TransactionRequest::new(vec![
            LineInput::new("a", 1, 100),
            LineInput::new("a", 0, 100),
        ]);
        match TransactionBuilder::new(Direction::Sale).build(&bad_qty, &catalog) {
            Err(CoreError::Validation(v)) => assert_eq!(v.field(), "items[1].quantity"),
            other => panic!("expected validation error, got {other:?}"),
        }

        let bad_price = TransactionRequest::new(vec![LineInput::new("a", 1, -5)]);
        match TransactionBuilder::new(Direction::Sale).build(&bad_price, &catalog) {
            Err(CoreError::Validation(v)) => assert_eq!(v.field(), "items[0].unit_price_cents"),
            other => panic!("expected validation error, got {other:?}"),
        }

        let bad_discount = TransactionRequest::new(vec![LineInput::new("a", 1, 100)]).with_discount(-1);
        assert!(TransactionBuilder::new(Direction::Sale)
            .build(&bad_discount, &catalog)
            .is_err());
    }

    #[test]
    fn test_overflowing_line_is_rejected() {
        let catalog = catalog(vec![product("a", 10)]);
        let request = TransactionRequest::new(vec![LineInput::new("a", 2, i64::MAX)]);

        let err = TransactionBuilder::new(Direction::Purchase)
            .build(&request, &catalog)
            .unwrap_err();
        assert!(matches!(err, CoreError::Validation(ValidationError::InvalidFormat { .. })));
    }
}
