//! # Inventory History Repository
//!
//! Append-only audit trail of stock movements.
//!
//! Rows are inserted and read, never updated or deleted (the schema's
//! triggers abort any attempt). Reads return rows in insertion order, which
//! for one product is the order its quantity changed in, since every
//! writer holds the database write lock.

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqliteExecutor, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::error::DbResult;
use crate::repository::product::ProductRepository;
use mizan_core::{InventoryAction, InventoryHistory, Product};

/// Why a stock delta is applied, and who applied it.
#[derive(Debug, Clone, Copy)]
pub struct StockMovement<'a> {
    pub product_id: &'a str,
    pub action: InventoryAction,
    pub reference_id: Option<&'a str>,
    pub reason: Option<&'a str>,
    pub user_id: &'a str,
}

#[derive(Debug, Clone)]
pub struct InventoryRepository {
    pool: SqlitePool,
}

impl InventoryRepository {
    pub fn new(pool: SqlitePool) -> Self {
        InventoryRepository { pool }
    }

    /// A product's trail, oldest first.
    pub async fn for_product(&self, product_id: &str) -> DbResult<Vec<InventoryHistory>> {
        Self::find_for_product(&self.pool, product_id).await
    }

    /// Every row caused by one sale, purchase or adjustment, oldest first.
    pub async fn for_reference(&self, reference_id: &str) -> DbResult<Vec<InventoryHistory>> {
        let rows = sqlx::query_as::<_, InventoryHistory>(
            "SELECT * FROM inventory_history WHERE reference_id = ?1 ORDER BY rowid",
        )
        .bind(reference_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    // -------------------------------------------------------------------------
    // Transaction-scoped operations
    // -------------------------------------------------------------------------

    pub async fn find_for_product<'e, E>(executor: E, product_id: &str) -> DbResult<Vec<InventoryHistory>>
    where
        E: SqliteExecutor<'e>,
    {
        let rows = sqlx::query_as::<_, InventoryHistory>(
            "SELECT * FROM inventory_history WHERE product_id = ?1 ORDER BY rowid",
        )
        .bind(product_id)
        .fetch_all(executor)
        .await?;
        Ok(rows)
    }

    pub async fn append(conn: &mut SqliteConnection, entry: &InventoryHistory) -> DbResult<()> {
        sqlx::query(
            r#"
            INSERT INTO inventory_history (
                id, product_id, action, previous_quantity, new_quantity,
                quantity_change, reference_id, reason, user_id, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
        )
        .bind(&entry.id)
        .bind(&entry.product_id)
        .bind(entry.action)
        .bind(entry.previous_quantity)
        .bind(entry.new_quantity)
        .bind(entry.quantity_change)
        .bind(&entry.reference_id)
        .bind(&entry.reason)
        .bind(&entry.user_id)
        .bind(entry.created_at)
        .execute(conn)
        .await?;

        debug!(
            product_id = %entry.product_id,
            action = %entry.action,
            change = entry.quantity_change,
            "History appended"
        );
        Ok(())
    }

    /// Applies `delta` through the stock guard and appends the matching
    /// history row. Returns the updated product and the row written.
    pub async fn apply_movement(
        conn: &mut SqliteConnection,
        movement: &StockMovement<'_>,
        delta: i64,
        now: DateTime<Utc>,
    ) -> DbResult<(Product, InventoryHistory)> {
        let change = ProductRepository::adjust_stock(&mut *conn, movement.product_id, delta, now).await?;

        let entry = InventoryHistory {
            id: Uuid::new_v4().to_string(),
            product_id: movement.product_id.to_string(),
            action: movement.action,
            previous_quantity: change.previous_quantity,
            new_quantity: change.product.quantity,
            quantity_change: change.product.quantity - change.previous_quantity,
            reference_id: movement.reference_id.map(str::to_string),
            reason: movement.reason.map(str::to_string),
            user_id: movement.user_id.to_string(),
            created_at: now,
        };
        Self::append(&mut *conn, &entry).await?;

        Ok((change.product, entry))
    }
}
