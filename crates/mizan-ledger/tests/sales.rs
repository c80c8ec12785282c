mod common;

use chrono::{DateTime, Duration, Utc};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use common::{backdate, file_ledger, ledger, product, quantity, rule, sale_of, CASHIER};
use mizan_core::invoice::{InvoiceKind, InvoiceNumbering};
use mizan_core::request::{ReturnLineInput, ReturnRequest};
use mizan_core::{CoreError, InventoryAction};
use mizan_db::DbError;
use mizan_ledger::{ErrorCode, Ledger, LedgerConfig, LedgerError};

/// Hands out fixed invoice numbers; the last one repeats forever.
#[derive(Debug)]
struct Scripted {
    numbers: Mutex<VecDeque<&'static str>>,
    calls: AtomicUsize,
}

impl Scripted {
    fn new(numbers: &[&'static str]) -> Arc<Self> {
        Arc::new(Scripted {
            numbers: Mutex::new(numbers.iter().copied().collect()),
            calls: AtomicUsize::new(0),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl InvoiceNumbering for Scripted {
    fn next(&self, _kind: InvoiceKind, _now: DateTime<Utc>) -> String {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut numbers = self.numbers.lock().unwrap();
        if numbers.len() > 1 {
            numbers.pop_front().unwrap().to_string()
        } else {
            numbers.front().unwrap().to_string()
        }
    }
}

#[tokio::test]
async fn test_sale_moves_stock_and_writes_history() {
    let ledger = ledger().await;
    let cola = product(&ledger, "COKE-330", 10, 150).await;

    let record = ledger.create_sale(&sale_of(&[(&cola, 4)]), CASHIER).await.unwrap();

    assert!(record.sale.invoice_number.starts_with("INV-"));
    assert_eq!(record.sale.total_amount_cents, 600);
    assert_eq!(record.sale.net_amount_cents, 600);
    assert_eq!(record.items.len(), 1);
    assert_eq!(record.items[0].returnable_quantity, 4);
    assert_eq!(quantity(&ledger, &cola).await, 6);

    let history = ledger.history(&cola.id).await.unwrap();
    let last = history.last().unwrap();
    assert_eq!(last.action, InventoryAction::Sale);
    assert_eq!(last.quantity_change, -4);
    assert_eq!(last.reference_id.as_deref(), Some(record.sale.id.as_str()));

    let movements = ledger.movements(&record.sale.id).await.unwrap();
    assert_eq!(movements.len(), 1);
    assert_eq!(movements[0].id, last.id);

    let check = ledger.verify_stock(&cola.id).await.unwrap();
    assert!(check.is_consistent());
    assert_eq!(check.history_entries, 2);
}

#[tokio::test]
async fn test_failed_sale_writes_nothing() {
    let ledger = ledger().await;
    let cola = product(&ledger, "COKE-330", 5, 150).await;
    let chips = product(&ledger, "CHIPS-50", 1, 80).await;

    let err = ledger
        .create_sale(&sale_of(&[(&cola, 2), (&chips, 3)]), CASHIER)
        .await
        .unwrap_err();

    assert_eq!(err.code(), ErrorCode::InsufficientStock);
    match rule(err) {
        CoreError::InsufficientStock { sku, available, requested } => {
            assert_eq!(sku, "CHIPS-50");
            assert_eq!(available, 1);
            assert_eq!(requested, 3);
        }
        other => panic!("unexpected error: {other:?}"),
    }

    assert_eq!(quantity(&ledger, &cola).await, 5);
    assert_eq!(quantity(&ledger, &chips).await, 1);
    assert_eq!(ledger.history(&cola.id).await.unwrap().len(), 1);
    assert!(ledger.recent_sales(10).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_inactive_product_cannot_be_sold() {
    let ledger = ledger().await;
    let cola = product(&ledger, "COKE-330", 5, 150).await;
    ledger.deactivate_product(&cola.id).await.unwrap();

    let err = ledger.create_sale(&sale_of(&[(&cola, 1)]), CASHIER).await.unwrap_err();
    assert!(matches!(rule(err), CoreError::ProductInactive { .. }));
}

#[tokio::test]
async fn test_return_then_edit_scenario() {
    let ledger = ledger().await;
    let p = product(&ledger, "P-1", 10, 100).await;

    let record = ledger.create_sale(&sale_of(&[(&p, 4)]), CASHIER).await.unwrap();
    assert_eq!(quantity(&ledger, &p).await, 6);

    let item_id = record.items[0].item.id.clone();
    let request = ReturnRequest::new(&record.sale.id, "damaged", vec![ReturnLineInput::new(&item_id, 2)]);
    ledger.process_return(&request, CASHIER).await.unwrap();
    assert_eq!(quantity(&ledger, &p).await, 8);

    let again = ReturnRequest::new(&record.sale.id, "damaged", vec![ReturnLineInput::new(&item_id, 3)]);
    let err = ledger.process_return(&again, CASHIER).await.unwrap_err();
    match rule(err) {
        CoreError::OverReturn { available, already_returned, original, .. } => {
            assert_eq!(available, 2);
            assert_eq!(already_returned, 2);
            assert_eq!(original, 4);
        }
        other => panic!("unexpected error: {other:?}"),
    }

    // 4 - 13 = -9 against 8 on hand
    let err = ledger
        .edit_sale(&record.sale.id, &sale_of(&[(&p, 13)]), CASHIER)
        .await
        .unwrap_err();
    assert!(matches!(rule(err), CoreError::InsufficientStock { .. }));
    assert_eq!(quantity(&ledger, &p).await, 8);

    let edited = ledger
        .edit_sale(&record.sale.id, &sale_of(&[(&p, 7)]), CASHIER)
        .await
        .unwrap();
    assert_eq!(quantity(&ledger, &p).await, 5);

    // Item row kept, so the earlier return still points at it
    assert_eq!(edited.items.len(), 1);
    assert_eq!(edited.items[0].item.id, item_id);
    assert_eq!(edited.items[0].returned_quantity, 2);
    assert_eq!(edited.items[0].returnable_quantity, 5);
    assert_eq!(edited.sale.total_amount_cents, 700);
    assert_eq!(edited.sale.net_amount_cents, 500);

    let history = ledger.history(&p.id).await.unwrap();
    let actions: Vec<_> = history.iter().map(|h| h.action).collect();
    assert_eq!(
        actions,
        vec![
            InventoryAction::InitialStock,
            InventoryAction::Sale,
            InventoryAction::Return,
            InventoryAction::SaleEdit,
        ]
    );
    assert_eq!(history[3].quantity_change, -3);
    assert!(ledger.verify_stock(&p.id).await.unwrap().is_consistent());
}

#[tokio::test]
async fn test_edit_applies_all_deltas_or_none() {
    let ledger = ledger().await;
    let cola = product(&ledger, "COKE-330", 10, 150).await;
    let chips = product(&ledger, "CHIPS-50", 1, 80).await;

    let record = ledger
        .create_sale(&sale_of(&[(&cola, 2), (&chips, 1)]), CASHIER)
        .await
        .unwrap();
    assert_eq!(quantity(&ledger, &cola).await, 8);
    assert_eq!(quantity(&ledger, &chips).await, 0);

    // Cola would go back up by one, but chips has nothing left to give
    let err = ledger
        .edit_sale(&record.sale.id, &sale_of(&[(&cola, 1), (&chips, 2)]), CASHIER)
        .await
        .unwrap_err();
    assert!(matches!(rule(err), CoreError::InsufficientStock { .. }));

    assert_eq!(quantity(&ledger, &cola).await, 8);
    assert_eq!(quantity(&ledger, &chips).await, 0);
    assert_eq!(ledger.history(&cola.id).await.unwrap().len(), 2);

    let unchanged = ledger.get_sale(&record.sale.id).await.unwrap();
    assert_eq!(unchanged.sale.total_amount_cents, record.sale.total_amount_cents);
}

#[tokio::test]
async fn test_edit_swaps_products() {
    let ledger = ledger().await;
    let cola = product(&ledger, "COKE-330", 10, 150).await;
    let chips = product(&ledger, "CHIPS-50", 10, 80).await;

    let record = ledger.create_sale(&sale_of(&[(&cola, 3)]), CASHIER).await.unwrap();
    let edited = ledger
        .edit_sale(&record.sale.id, &sale_of(&[(&chips, 2)]), CASHIER)
        .await
        .unwrap();

    assert_eq!(quantity(&ledger, &cola).await, 10);
    assert_eq!(quantity(&ledger, &chips).await, 8);
    assert_eq!(edited.items.len(), 1);
    assert_eq!(edited.items[0].item.product_id, chips.id);
    assert_eq!(edited.sale.total_amount_cents, 160);
}

#[tokio::test]
async fn test_edit_cannot_go_below_returned() {
    let ledger = ledger().await;
    let p = product(&ledger, "P-1", 10, 100).await;

    let record = ledger.create_sale(&sale_of(&[(&p, 4)]), CASHIER).await.unwrap();
    let item_id = record.items[0].item.id.clone();
    ledger
        .process_return(
            &ReturnRequest::new(&record.sale.id, "wrong size", vec![ReturnLineInput::new(&item_id, 3)]),
            CASHIER,
        )
        .await
        .unwrap();

    let err = ledger
        .edit_sale(&record.sale.id, &sale_of(&[(&p, 2)]), CASHIER)
        .await
        .unwrap_err();
    assert!(matches!(rule(err), CoreError::EditBelowReturned { returned: 3, requested: 2, .. }));
    assert_eq!(quantity(&ledger, &p).await, 9);
}

#[tokio::test]
async fn test_edit_window() {
    let ledger = ledger().await;
    let p = product(&ledger, "P-1", 10, 100).await;
    let record = ledger.create_sale(&sale_of(&[(&p, 1)]), CASHIER).await.unwrap();

    backdate(&ledger, "sales", &record.sale.id, Utc::now() - Duration::hours(25)).await;

    let err = ledger
        .edit_sale(&record.sale.id, &sale_of(&[(&p, 2)]), CASHIER)
        .await
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::EditWindowExpired);
    assert_eq!(quantity(&ledger, &p).await, 9);
}

#[tokio::test]
async fn test_cancel_restores_stock_and_deletes_sale() {
    let ledger = ledger().await;
    let p = product(&ledger, "P-1", 10, 100).await;
    let record = ledger.create_sale(&sale_of(&[(&p, 4)]), CASHIER).await.unwrap();

    ledger.cancel_sale(&record.sale.id, CASHIER).await.unwrap();

    assert_eq!(quantity(&ledger, &p).await, 10);
    let history = ledger.history(&p.id).await.unwrap();
    assert_eq!(history.last().unwrap().action, InventoryAction::SaleCancelled);
    assert_eq!(history.last().unwrap().quantity_change, 4);

    let err = ledger.get_sale(&record.sale.id).await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::NotFound);
    assert!(ledger.verify_stock(&p.id).await.unwrap().is_consistent());
}

#[tokio::test]
async fn test_cancel_refused_after_return() {
    let ledger = ledger().await;
    let p = product(&ledger, "P-1", 10, 100).await;
    let record = ledger.create_sale(&sale_of(&[(&p, 4)]), CASHIER).await.unwrap();
    ledger
        .process_return(
            &ReturnRequest::new(
                &record.sale.id,
                "damaged",
                vec![ReturnLineInput::new(&record.items[0].item.id, 1)],
            ),
            CASHIER,
        )
        .await
        .unwrap();

    let err = ledger.cancel_sale(&record.sale.id, CASHIER).await.unwrap_err();
    assert!(matches!(rule(err), CoreError::SaleHasReturns { returns: 1, .. }));
    assert_eq!(quantity(&ledger, &p).await, 7);
}

#[tokio::test]
async fn test_discount_above_total_rejected() {
    let ledger = ledger().await;
    let p = product(&ledger, "P-1", 10, 100).await;

    let mut request = sale_of(&[(&p, 1)]);
    request.transaction = request.transaction.with_discount(500);

    let err = ledger.create_sale(&request, CASHIER).await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::NegativeNetAmount);
    assert_eq!(quantity(&ledger, &p).await, 10);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_concurrent_sales_of_last_unit() {
    let dir = tempfile::tempdir().unwrap();
    let ledger = file_ledger(&dir).await;
    let p = product(&ledger, "LAST-1", 1, 100).await;
    let request = sale_of(&[(&p, 1)]);

    let (first, second) = tokio::join!(
        ledger.create_sale(&request, "till-1"),
        ledger.create_sale(&request, "till-2"),
    );

    let outcomes = [first, second];
    assert_eq!(outcomes.iter().filter(|r| r.is_ok()).count(), 1);
    let failure = outcomes.into_iter().find_map(Result::err).unwrap();
    assert_eq!(failure.code(), ErrorCode::InsufficientStock);

    assert_eq!(quantity(&ledger, &p).await, 0);
    assert!(ledger.verify_stock(&p.id).await.unwrap().is_consistent());
}

#[tokio::test]
async fn test_taken_invoice_number_is_regenerated() {
    let numbers = Scripted::new(&["INV-1-001", "INV-1-001", "INV-1-002"]);
    let ledger = ledger().await.with_invoice_numbering(numbers.clone());
    let p = product(&ledger, "P-1", 10, 100).await;

    let first = ledger.create_sale(&sale_of(&[(&p, 1)]), CASHIER).await.unwrap();
    let second = ledger.create_sale(&sale_of(&[(&p, 2)]), CASHIER).await.unwrap();

    assert_eq!(first.sale.invoice_number, "INV-1-001");
    assert_eq!(second.sale.invoice_number, "INV-1-002");
    assert_eq!(numbers.calls(), 3);

    // The colliding attempt rolled back its stock movement
    assert_eq!(quantity(&ledger, &p).await, 7);
    assert_eq!(ledger.history(&p.id).await.unwrap().len(), 3);
    assert!(ledger.verify_stock(&p.id).await.unwrap().is_consistent());
}

#[tokio::test]
async fn test_invoice_attempts_exhausted() {
    mizan_ledger::telemetry::init_tracing();
    let numbers = Scripted::new(&["INV-1-001"]);
    let ledger = Ledger::open(LedgerConfig::in_memory().invoice_attempts(3))
        .await
        .unwrap()
        .with_invoice_numbering(numbers.clone());
    let p = product(&ledger, "P-1", 10, 100).await;

    ledger.create_sale(&sale_of(&[(&p, 1)]), CASHIER).await.unwrap();
    let err = ledger.create_sale(&sale_of(&[(&p, 1)]), CASHIER).await.unwrap_err();

    assert_eq!(err.code(), ErrorCode::Duplicate);
    assert!(matches!(
        &err,
        LedgerError::Storage(db) if db.is_unique_violation_on("invoice_number")
    ));
    assert!(matches!(err, LedgerError::Storage(DbError::UniqueViolation { .. })));
    assert_eq!(numbers.calls(), 1 + 3);
    assert_eq!(quantity(&ledger, &p).await, 9);
    assert_eq!(ledger.recent_sales(10).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_sale_times_out_behind_held_write_lock() {
    mizan_ledger::telemetry::init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let config = LedgerConfig::new(dir.path().join("mizan.db"))
        .max_connections(4)
        .busy_timeout(std::time::Duration::from_secs(5))
        .transaction_timeout(std::time::Duration::from_millis(300));
    let ledger = Ledger::open(config).await.unwrap();
    let p = product(&ledger, "P-1", 5, 100).await;

    let held = ledger.database().begin_immediate().await.unwrap();

    let started = std::time::Instant::now();
    let err = ledger.create_sale(&sale_of(&[(&p, 1)]), CASHIER).await.unwrap_err();

    assert!(matches!(err, LedgerError::Timeout(limit) if limit.as_millis() == 300));
    assert_eq!(err.code(), ErrorCode::Timeout);
    assert!(err.is_retryable());
    assert!(started.elapsed() < std::time::Duration::from_secs(5));

    held.rollback().await.unwrap();
    assert_eq!(quantity(&ledger, &p).await, 5);
    assert!(ledger.recent_sales(10).await.unwrap().is_empty());
}
