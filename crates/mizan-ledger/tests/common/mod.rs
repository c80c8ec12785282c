#![allow(dead_code)]

use chrono::{DateTime, Utc};

use mizan_core::request::{LineInput, NewProduct, SaleRequest, TransactionRequest};
use mizan_core::{CoreError, Product};
use mizan_ledger::{Ledger, LedgerConfig, LedgerError};

pub const CASHIER: &str = "cashier-1";

pub async fn ledger() -> Ledger {
    mizan_ledger::telemetry::init_tracing();
    Ledger::open(LedgerConfig::in_memory()).await.unwrap()
}

/// File-backed ledger with several connections, for tests that race writers.
pub async fn file_ledger(dir: &tempfile::TempDir) -> Ledger {
    mizan_ledger::telemetry::init_tracing();
    let config = LedgerConfig::new(dir.path().join("mizan.db")).max_connections(4);
    Ledger::open(config).await.unwrap()
}

pub async fn product(ledger: &Ledger, sku: &str, quantity: i64, price_cents: i64) -> Product {
    let input = NewProduct::new(sku, format!("Product {sku}"), quantity, price_cents / 2, price_cents);
    ledger.create_product(&input, CASHIER).await.unwrap()
}

pub fn sale_of(lines: &[(&Product, i64)]) -> SaleRequest {
    SaleRequest::new(TransactionRequest::new(
        lines
            .iter()
            .map(|(product, qty)| LineInput::new(product.id.clone(), *qty, product.selling_price_cents))
            .collect(),
    ))
}

pub async fn quantity(ledger: &Ledger, product: &Product) -> i64 {
    ledger.get_product(&product.id).await.unwrap().quantity
}

pub fn rule(err: LedgerError) -> CoreError {
    match err {
        LedgerError::Rule(rule) => rule,
        other => panic!("expected a business rule error, got {other:?}"),
    }
}

/// Moves a row's `created_at` into the past.
pub async fn backdate(ledger: &Ledger, table: &str, id: &str, at: DateTime<Utc>) {
    sqlx::query(&format!("UPDATE {table} SET created_at = ?1 WHERE id = ?2"))
        .bind(at)
        .bind(id)
        .execute(ledger.database().pool())
        .await
        .unwrap();
}
