mod common;

use common::{ledger, product, quantity, rule, sale_of, CASHIER};
use mizan_core::request::{LineInput, NewProduct, PurchaseRequest, TransactionRequest};
use mizan_core::{CoreError, InventoryAction};
use mizan_ledger::ErrorCode;

fn purchase_of(lines: &[(&str, i64, i64)]) -> PurchaseRequest {
    PurchaseRequest::new(TransactionRequest::new(
        lines
            .iter()
            .map(|(product_id, qty, cost)| LineInput::new(*product_id, *qty, *cost))
            .collect(),
    ))
    .with_supplier("supplier-1")
}

#[tokio::test]
async fn test_create_product_records_initial_stock() {
    let ledger = ledger().await;
    let p = product(&ledger, "P-1", 12, 100).await;

    assert_eq!(p.quantity, 12);
    assert_eq!(p.min_quantity, mizan_core::DEFAULT_MIN_QUANTITY);

    let history = ledger.history(&p.id).await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].action, InventoryAction::InitialStock);
    assert_eq!(history[0].previous_quantity, 0);
    assert_eq!(history[0].new_quantity, 12);

    assert_eq!(ledger.product_by_sku("P-1").await.unwrap().id, p.id);
    assert_eq!(ledger.products(10).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_duplicate_sku_rejected() {
    let ledger = ledger().await;
    product(&ledger, "P-1", 1, 100).await;

    let err = ledger
        .create_product(&NewProduct::new("P-1", "Again", 1, 50, 100), CASHIER)
        .await
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::Duplicate);
}

#[tokio::test]
async fn test_adjust_quantity() {
    let ledger = ledger().await;
    let p = product(&ledger, "P-1", 10, 100).await;

    let adjusted = ledger.adjust_quantity(&p.id, 7, Some("stock count"), CASHIER).await.unwrap();
    assert_eq!(adjusted.quantity, 7);

    // Same value writes nothing
    ledger.adjust_quantity(&p.id, 7, None, CASHIER).await.unwrap();

    let history = ledger.history(&p.id).await.unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[1].action, InventoryAction::QuantityAdjustment);
    assert_eq!(history[1].quantity_change, -3);
    assert_eq!(history[1].reason.as_deref(), Some("stock count"));

    let err = ledger.adjust_quantity(&p.id, -1, None, CASHIER).await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::ValidationError);
}

#[tokio::test]
async fn test_low_stock() {
    let ledger = ledger().await;
    let low = product(&ledger, "LOW-1", 3, 100).await;
    product(&ledger, "OK-1", 50, 100).await;

    let products = ledger.low_stock().await.unwrap();
    assert_eq!(products.len(), 1);
    assert_eq!(products[0].id, low.id);
}

#[tokio::test]
async fn test_purchase_adds_stock_and_rolls_cost() {
    let ledger = ledger().await;
    let p = product(&ledger, "P-1", 2, 100).await;
    assert_eq!(p.cost_price_cents, 50);

    let record = ledger
        .create_purchase(&purchase_of(&[(&p.id, 10, 60)]), CASHIER)
        .await
        .unwrap();
    assert!(record.purchase.invoice_number.starts_with("PUR-"));
    assert_eq!(record.purchase.net_amount_cents, 600);
    assert_eq!(record.purchase.currency, mizan_core::request::DEFAULT_CURRENCY);

    let stocked = ledger.get_product(&p.id).await.unwrap();
    assert_eq!(stocked.quantity, 12);
    assert_eq!(stocked.cost_price_cents, 60);

    let last = ledger.history(&p.id).await.unwrap().pop().unwrap();
    assert_eq!(last.action, InventoryAction::Purchase);
    assert_eq!(last.quantity_change, 10);
}

#[tokio::test]
async fn test_purchase_edit_moves_only_the_difference() {
    let ledger = ledger().await;
    let a = product(&ledger, "A-1", 0, 100).await;
    let b = product(&ledger, "B-1", 0, 100).await;

    let record = ledger
        .create_purchase(&purchase_of(&[(&a.id, 10, 60), (&b.id, 5, 40)]), CASHIER)
        .await
        .unwrap();

    let edited = ledger
        .edit_purchase(&record.purchase.id, &purchase_of(&[(&a.id, 4, 70)]), CASHIER)
        .await
        .unwrap();

    assert_eq!(edited.items.len(), 1);
    assert_eq!(edited.purchase.net_amount_cents, 280);
    assert_eq!(edited.purchase.invoice_number, record.purchase.invoice_number);
    assert_eq!(
        edited.purchase.purchase_date.timestamp(),
        record.purchase.purchase_date.timestamp()
    );

    let a_now = ledger.get_product(&a.id).await.unwrap();
    assert_eq!(a_now.quantity, 4);
    assert_eq!(a_now.cost_price_cents, 70);
    assert_eq!(quantity(&ledger, &b).await, 0);

    let last = ledger.history(&a.id).await.unwrap().pop().unwrap();
    assert_eq!(last.quantity_change, -6);
    assert_eq!(last.reason.as_deref(), Some("Purchase edited"));

    let reread = ledger.get_purchase(&record.purchase.id).await.unwrap();
    assert_eq!(reread.items, edited.items);
    assert!(ledger.verify_stock(&a.id).await.unwrap().is_consistent());
    assert!(ledger.verify_stock(&b.id).await.unwrap().is_consistent());
}

#[tokio::test]
async fn test_purchase_edit_cannot_take_sold_stock() {
    let ledger = ledger().await;
    let p = product(&ledger, "P-1", 0, 100).await;

    let record = ledger
        .create_purchase(&purchase_of(&[(&p.id, 10, 60)]), CASHIER)
        .await
        .unwrap();
    ledger.create_sale(&sale_of(&[(&p, 8)]), CASHIER).await.unwrap();

    let err = ledger
        .edit_purchase(&record.purchase.id, &purchase_of(&[(&p.id, 1, 60)]), CASHIER)
        .await
        .unwrap_err();
    assert!(matches!(rule(err), CoreError::InsufficientStock { .. }));
    assert_eq!(quantity(&ledger, &p).await, 2);
}
