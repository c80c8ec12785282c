//! # mizan-ledger: Inventory & Cash Ledger Engine
//!
//! Every operation that moves stock or money runs here as one atomic unit.
//!
//! ## Unit of Work
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    One Ledger Operation                                 │
//! │                                                                         │
//! │  tokio::time::timeout(transaction_timeout, ...)                         │
//! │  │                                                                      │
//! │  │  BEGIN IMMEDIATE          ← write lock held from here                │
//! │  │     │                                                                │
//! │  │     ├── re-read products / employee / sale inside the transaction    │
//! │  │     ├── mizan-core validates and plans (no writes yet)               │
//! │  │     ├── headers, items, stock deltas, history rows                   │
//! │  │     │                                                                │
//! │  │  COMMIT                   ← all or nothing                           │
//! │  │                                                                      │
//! │  └── on error or timeout the transaction is dropped → ROLLBACK          │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`stock`] - Product lifecycle, adjustments, history and reconciliation
//! - [`sales`] - Sale create, edit, cancel and read
//! - [`purchases`] - Purchase create, edit and read
//! - [`returns`] - Partial returns against sale items
//! - [`payroll`] - Employees and salary payments
//! - [`cash`] - Cash transactions
//! - [`config`] - [`LedgerConfig`]
//! - [`error`] - [`LedgerError`] and its codes
//! - [`telemetry`] - Tracing setup
//!
//! ## Usage
//!
//! ```rust,ignore
//! use mizan_core::request::{LineInput, SaleRequest, TransactionRequest};
//! use mizan_ledger::{Ledger, LedgerConfig};
//!
//! let ledger = Ledger::open(LedgerConfig::load()?).await?;
//!
//! let request = SaleRequest::new(TransactionRequest::new(vec![
//!     LineInput::new(product_id, 2, 150),
//! ]));
//! let sale = ledger.create_sale(&request, "cashier-1").await?;
//! ```

pub mod cash;
pub mod config;
pub mod error;
pub mod payroll;
pub mod purchases;
pub mod returns;
pub mod sales;
pub mod stock;
pub mod telemetry;

pub use config::{ConfigError, LedgerConfig};
pub use error::{ErrorCode, ErrorPayload, LedgerError, LedgerResult};
pub use payroll::PayrollPayment;

use std::future::Future;
use std::sync::Arc;

use tracing::{error, warn};
use uuid::Uuid;

use mizan_core::invoice::{format_invoice_number, InvoiceKind, InvoiceNumbering};
use mizan_core::payroll::{BalancePolicy, SharedMonthlyBalance};
use mizan_db::Database;

/// The ledger service. Cheap to clone; clones share the pool.
#[derive(Debug, Clone)]
pub struct Ledger {
    db: Database,
    config: LedgerConfig,
    policy: Arc<dyn BalancePolicy>,
    invoices: Arc<dyn InvoiceNumbering>,
}

impl Ledger {
    /// Connects to the configured database and applies migrations.
    pub async fn open(config: LedgerConfig) -> LedgerResult<Self> {
        let db = Database::new(config.db_config()).await?;
        Ok(Ledger::new(db, config))
    }

    /// Wraps an existing database with the default balance policy.
    pub fn new(db: Database, config: LedgerConfig) -> Self {
        Ledger {
            db,
            config,
            policy: Arc::new(SharedMonthlyBalance),
            invoices: Arc::new(TimestampNonce),
        }
    }

    /// Replaces the salary balance policy.
    pub fn with_policy(mut self, policy: Arc<dyn BalancePolicy>) -> Self {
        self.policy = policy;
        self
    }

    /// Replaces the invoice number source.
    pub fn with_invoice_numbering(mut self, invoices: Arc<dyn InvoiceNumbering>) -> Self {
        self.invoices = invoices;
        self
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    /// Runs one operation under the transaction timeout. Whatever the
    /// future holds (its transaction included) is dropped on expiry.
    async fn bounded<T, F>(&self, operation: &'static str, work: F) -> LedgerResult<T>
    where
        F: Future<Output = LedgerResult<T>>,
    {
        let limit = self.config.transaction_timeout;

        match tokio::time::timeout(limit, work).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(err)) => {
                match &err {
                    LedgerError::Rule(rule) => warn!(operation, error = %rule, "Operation rejected"),
                    LedgerError::Storage(db) if db.is_retryable() => {
                        warn!(operation, error = %db, "Operation hit a lock conflict")
                    }
                    other => error!(operation, error = %other, "Operation failed"),
                }
                Err(err)
            }
            Err(_) => {
                warn!(operation, timeout_ms = limit.as_millis() as u64, "Operation timed out");
                Err(LedgerError::Timeout(limit))
            }
        }
    }

    /// Runs `attempt` with fresh invoice numbers until one is not taken.
    ///
    /// Each attempt is a complete transaction; a collision rolls it back
    /// before the next one starts.
    async fn with_fresh_invoice<T, F, Fut>(&self, kind: InvoiceKind, mut attempt: F) -> LedgerResult<T>
    where
        F: FnMut(String) -> Fut,
        Fut: Future<Output = LedgerResult<T>>,
    {
        let attempts = self.config.invoice_attempts.max(1);
        let mut tried = 1;

        loop {
            let invoice_number = self.invoices.next(kind, chrono::Utc::now());

            match attempt(invoice_number.clone()).await {
                Err(LedgerError::Storage(err))
                    if err.is_unique_violation_on("invoice_number") && tried < attempts =>
                {
                    warn!(invoice = %invoice_number, tried, "Invoice number taken, retrying");
                    tried += 1;
                }
                other => return other,
            }
        }
    }
}

/// Current time in millis plus a random three digit nonce.
#[derive(Debug, Default, Clone, Copy)]
pub struct TimestampNonce;

impl InvoiceNumbering for TimestampNonce {
    fn next(&self, kind: InvoiceKind, now: chrono::DateTime<chrono::Utc>) -> String {
        let nonce = (Uuid::new_v4().as_u128() % 1000) as u64;
        format_invoice_number(kind, now, nonce)
    }
}

fn new_id() -> String {
    Uuid::new_v4().to_string()
}
