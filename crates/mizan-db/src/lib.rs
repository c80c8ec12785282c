//! # mizan-db: Storage Layer for the Mizan Ledger
//!
//! SQLite storage through sqlx: the connection pool, embedded migrations
//! and one repository per table group.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Mizan Data Flow                                  │
//! │                                                                         │
//! │  Ledger operation (create_sale, pay_salary, ...)                        │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐    │
//! │  │                     mizan-db (THIS CRATE)                       │    │
//! │  │                                                                 │    │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐    │    │
//! │  │   │   Database    │    │  Repositories │    │  Migrations  │    │    │
//! │  │   │   (pool.rs)   │    │               │    │  (embedded)  │    │    │
//! │  │   │               │    │ ProductRepo   │    │              │    │    │
//! │  │   │ SqlitePool    │◄───│ InventoryRepo │    │ 001_initial  │    │    │
//! │  │   │ BEGIN         │    │ SaleRepo      │    │  _schema.sql │    │    │
//! │  │   │  IMMEDIATE    │    │ ...           │    │              │    │    │
//! │  │   └───────────────┘    └───────────────┘    └──────────────┘    │    │
//! │  │                                                                 │    │
//! │  └─────────────────────────────────────────────────────────────────┘    │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite database file (WAL)                                             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - Repository implementations
//!
//! ## Usage
//!
//! ```rust,ignore
//! use mizan_db::{Database, DbConfig, ProductRepository};
//!
//! let db = Database::new(DbConfig::new("path/to/mizan.db")).await?;
//!
//! let mut tx = db.begin_immediate().await?;
//! let change = ProductRepository::adjust_stock(&mut tx, "product-id", -2, Utc::now()).await?;
//! tx.commit().await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};

// Repository re-exports for convenience
pub use repository::{
    CashRepository, EmployeeRepository, InventoryRepository, ProductRepository,
    PurchaseRepository, ReturnRepository, SaleRepository, StockChange, StockMovement,
};
