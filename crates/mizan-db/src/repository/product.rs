//! # Product Repository
//!
//! The stock store: products and their on-hand quantity.
//!
//! ## Stock Guard
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  adjust_stock(id, delta)                                                │
//! │                                                                         │
//! │  UPDATE products SET quantity = quantity + delta                        │
//! │  WHERE id = ? AND quantity + delta >= 0                                 │
//! │  RETURNING *                                                            │
//! │       │                                                                 │
//! │       ├── row returned  → applied, previous = new - delta               │
//! │       └── no row        → NotFound, or InsufficientStock with the       │
//! │                           current quantity                              │
//! │                                                                         │
//! │  The CHECK (quantity >= 0) constraint is the last line behind this.     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Quantity is never written any other way.

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqliteExecutor, SqlitePool};
use std::collections::HashMap;
use tracing::debug;

use crate::error::{DbError, DbResult};
use mizan_core::Product;

/// Repository for product database operations.
///
/// Methods on `&self` read through the pool; associated functions taking a
/// connection run inside the caller's transaction.
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

/// Stock after a successful [`ProductRepository::adjust_stock`].
#[derive(Debug, Clone, PartialEq)]
pub struct StockChange {
    pub previous_quantity: i64,
    pub product: Product,
}

impl ProductRepository {
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository { pool }
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Product>> {
        Self::find(&self.pool, id).await
    }

    pub async fn get_by_sku(&self, sku: &str) -> DbResult<Option<Product>> {
        let product = sqlx::query_as::<_, Product>("SELECT * FROM products WHERE sku = ?1")
            .bind(sku)
            .fetch_optional(&self.pool)
            .await?;
        Ok(product)
    }

    /// Active products ordered by SKU.
    pub async fn list_active(&self, limit: u32) -> DbResult<Vec<Product>> {
        let products = sqlx::query_as::<_, Product>(
            "SELECT * FROM products WHERE is_active = 1 ORDER BY sku LIMIT ?1",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(products)
    }

    /// Active products at or below their reorder threshold, emptiest first.
    pub async fn low_stock(&self) -> DbResult<Vec<Product>> {
        let products = sqlx::query_as::<_, Product>(
            r#"
            SELECT * FROM products
            WHERE is_active = 1 AND quantity <= min_quantity
            ORDER BY quantity ASC, sku ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        debug!(count = products.len(), "Low stock products");
        Ok(products)
    }

    // -------------------------------------------------------------------------
    // Transaction-scoped operations
    // -------------------------------------------------------------------------

    pub async fn find<'e, E>(executor: E, id: &str) -> DbResult<Option<Product>>
    where
        E: SqliteExecutor<'e>,
    {
        let product = sqlx::query_as::<_, Product>("SELECT * FROM products WHERE id = ?1")
            .bind(id)
            .fetch_optional(executor)
            .await?;
        Ok(product)
    }

    /// Loads the given products, keyed by id. Unknown ids are absent from
    /// the map.
    pub async fn find_many<'a, I>(
        conn: &mut SqliteConnection,
        ids: I,
    ) -> DbResult<HashMap<String, Product>>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut found = HashMap::new();
        for id in ids {
            if found.contains_key(id) {
                continue;
            }
            if let Some(product) = Self::find(&mut *conn, id).await? {
                found.insert(product.id.clone(), product);
            }
        }
        Ok(found)
    }

    pub async fn insert(conn: &mut SqliteConnection, product: &Product) -> DbResult<()> {
        debug!(id = %product.id, sku = %product.sku, "Inserting product");

        sqlx::query(
            r#"
            INSERT INTO products (
                id, sku, barcode, name, quantity, min_quantity,
                cost_price_cents, selling_price_cents, is_active, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            "#,
        )
        .bind(&product.id)
        .bind(&product.sku)
        .bind(&product.barcode)
        .bind(&product.name)
        .bind(product.quantity)
        .bind(product.min_quantity)
        .bind(product.cost_price_cents)
        .bind(product.selling_price_cents)
        .bind(product.is_active)
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(conn)
        .await
        .map_err(|e| match DbError::from(e) {
            DbError::UniqueViolation { field, .. } if field.ends_with("barcode") => {
                DbError::duplicate("barcode", product.barcode.clone().unwrap_or_default())
            }
            DbError::UniqueViolation { .. } => DbError::duplicate("sku", product.sku.clone()),
            other => other,
        })?;

        Ok(())
    }

    /// Applies a signed delta, refusing to go below zero.
    pub async fn adjust_stock(
        conn: &mut SqliteConnection,
        id: &str,
        delta: i64,
        now: DateTime<Utc>,
    ) -> DbResult<StockChange> {
        let updated = sqlx::query_as::<_, Product>(
            r#"
            UPDATE products
            SET quantity = quantity + ?1, updated_at = ?2
            WHERE id = ?3 AND quantity + ?1 >= 0
            RETURNING *
            "#,
        )
        .bind(delta)
        .bind(now)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;

        match updated {
            Some(product) => {
                debug!(
                    product_id = %id,
                    delta,
                    quantity = product.quantity,
                    "Stock adjusted"
                );
                Ok(StockChange {
                    previous_quantity: product.quantity - delta,
                    product,
                })
            }
            None => match Self::find(&mut *conn, id).await? {
                None => Err(DbError::not_found("Product", id)),
                Some(product) => Err(DbError::InsufficientStock {
                    product_id: product.id,
                    sku: product.sku,
                    available: product.quantity,
                    requested: -delta,
                }),
            },
        }
    }

    /// Rolls the cost price forward to the latest purchase price.
    pub async fn update_cost_price(
        conn: &mut SqliteConnection,
        id: &str,
        cost_price_cents: i64,
        now: DateTime<Utc>,
    ) -> DbResult<()> {
        let result = sqlx::query(
            "UPDATE products SET cost_price_cents = ?1, updated_at = ?2 WHERE id = ?3",
        )
        .bind(cost_price_cents)
        .bind(now)
        .bind(id)
        .execute(conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }

        debug!(product_id = %id, cost_price_cents, "Cost price rolled forward");
        Ok(())
    }

    /// Soft delete. History and past transactions keep referencing the row.
    pub async fn deactivate(conn: &mut SqliteConnection, id: &str, now: DateTime<Utc>) -> DbResult<()> {
        let result = sqlx::query("UPDATE products SET is_active = 0, updated_at = ?1 WHERE id = ?2")
            .bind(now)
            .bind(id)
            .execute(conn)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }

        debug!(product_id = %id, "Product deactivated");
        Ok(())
    }
}
