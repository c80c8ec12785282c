//! # Database Migrations
//!
//! Embedded SQL migrations for the ledger schema.
//!
//! ## What The Schema Enforces
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  products.quantity >= 0                  CHECK                          │
//! │  sku, barcode, invoice_number            UNIQUE                         │
//! │  0 <= remaining_salary <= salary         CHECK (when set)               │
//! │  sale_items / purchase_items             ON DELETE CASCADE from header  │
//! │  returns → sale_items                    FOREIGN KEY, no cascade        │
//! │  inventory_history                       UPDATE / DELETE triggers abort │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! These are backstops: the repositories and the ledger reject violations
//! with precise errors before SQLite ever sees them.
//!
//! ## Adding New Migrations
//!
//! 1. Create `migrations/sqlite/NNN_description.sql` with the next number
//! 2. **NEVER** modify an applied migration
//! 3. Keep `inventory_history` append-only: no migration may rewrite its rows

use sqlx::SqlitePool;
use tracing::{debug, info};

use crate::error::DbResult;

/// All SQL files under `migrations/sqlite`, embedded at compile time.
static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("../../migrations/sqlite");

/// Applies pending migrations in filename order, each in its own
/// transaction. Safe to run repeatedly.
pub async fn run_migrations(pool: &SqlitePool) -> DbResult<()> {
    debug!("Applying embedded migrations");

    MIGRATOR.run(pool).await?;

    info!(count = MIGRATOR.migrations.len(), "Schema migrated");
    Ok(())
}

/// `(embedded, applied)` migration counts, for diagnostics.
pub async fn migration_status(pool: &SqlitePool) -> DbResult<(usize, usize)> {
    let total = MIGRATOR.migrations.len();

    let applied: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM _sqlx_migrations WHERE success = 1")
        .fetch_one(pool)
        .await?;

    Ok((total, applied as usize))
}
