//! # Sale Repository
//!
//! Database operations for sale headers and sale items.
//!
//! ## Sale Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Sale Lifecycle                                    │
//! │                                                                         │
//! │  CREATE     insert_header() + insert_item() × n      → COMPLETED        │
//! │                                                                         │
//! │  EDIT       update_item() / insert_item() / delete_item()               │
//! │  (≤ 24h)    update_header()                          → still COMPLETED  │
//! │                                                                         │
//! │  RETURN     reduce_net_amount()                      → still COMPLETED  │
//! │                                                                         │
//! │  CANCEL     delete()  (items cascade)                → gone             │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Stock and history side effects are the ledger's job; nothing here
//! touches `products`.

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqliteExecutor, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use mizan_core::{Sale, SaleItem};

/// Repository for sale database operations.
#[derive(Debug, Clone)]
pub struct SaleRepository {
    pool: SqlitePool,
}

impl SaleRepository {
    pub fn new(pool: SqlitePool) -> Self {
        SaleRepository { pool }
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Sale>> {
        Self::find(&self.pool, id).await
    }

    /// Items in display order.
    pub async fn get_items(&self, sale_id: &str) -> DbResult<Vec<SaleItem>> {
        Self::find_items(&self.pool, sale_id).await
    }

    /// Most recent sales first.
    pub async fn list_recent(&self, limit: u32) -> DbResult<Vec<Sale>> {
        let sales = sqlx::query_as::<_, Sale>(
            "SELECT * FROM sales ORDER BY created_at DESC, rowid DESC LIMIT ?1",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(sales)
    }

    // -------------------------------------------------------------------------
    // Transaction-scoped operations
    // -------------------------------------------------------------------------

    pub async fn find<'e, E>(executor: E, id: &str) -> DbResult<Option<Sale>>
    where
        E: SqliteExecutor<'e>,
    {
        let sale = sqlx::query_as::<_, Sale>("SELECT * FROM sales WHERE id = ?1")
            .bind(id)
            .fetch_optional(executor)
            .await?;
        Ok(sale)
    }

    pub async fn find_items<'e, E>(executor: E, sale_id: &str) -> DbResult<Vec<SaleItem>>
    where
        E: SqliteExecutor<'e>,
    {
        let items = sqlx::query_as::<_, SaleItem>(
            "SELECT * FROM sale_items WHERE sale_id = ?1 ORDER BY position, rowid",
        )
        .bind(sale_id)
        .fetch_all(executor)
        .await?;
        Ok(items)
    }

    /// Inserts a header. A taken invoice number surfaces as
    /// `UniqueViolation` on `invoice_number` so the caller can retry.
    pub async fn insert_header(conn: &mut SqliteConnection, sale: &Sale) -> DbResult<()> {
        debug!(sale_id = %sale.id, invoice = %sale.invoice_number, "Inserting sale");

        sqlx::query(
            r#"
            INSERT INTO sales (
                id, invoice_number, customer_id, payment_method, user_id,
                total_amount_cents, discount_cents, tax_cents, net_amount_cents,
                status, notes, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
            "#,
        )
        .bind(&sale.id)
        .bind(&sale.invoice_number)
        .bind(&sale.customer_id)
        .bind(sale.payment_method)
        .bind(&sale.user_id)
        .bind(sale.total_amount_cents)
        .bind(sale.discount_cents)
        .bind(sale.tax_cents)
        .bind(sale.net_amount_cents)
        .bind(sale.status)
        .bind(&sale.notes)
        .bind(sale.created_at)
        .bind(sale.updated_at)
        .execute(conn)
        .await
        .map_err(|e| match DbError::from(e) {
            DbError::UniqueViolation { field, .. } if field.ends_with("invoice_number") => {
                DbError::duplicate("sales.invoice_number", sale.invoice_number.clone())
            }
            other => other,
        })?;

        Ok(())
    }

    /// Rewrites the mutable header fields (customer, payment method, totals,
    /// notes) from `sale`.
    pub async fn update_header(conn: &mut SqliteConnection, sale: &Sale) -> DbResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE sales SET
                customer_id = ?2,
                payment_method = ?3,
                total_amount_cents = ?4,
                discount_cents = ?5,
                tax_cents = ?6,
                net_amount_cents = ?7,
                notes = ?8,
                updated_at = ?9
            WHERE id = ?1
            "#,
        )
        .bind(&sale.id)
        .bind(&sale.customer_id)
        .bind(sale.payment_method)
        .bind(sale.total_amount_cents)
        .bind(sale.discount_cents)
        .bind(sale.tax_cents)
        .bind(sale.net_amount_cents)
        .bind(&sale.notes)
        .bind(sale.updated_at)
        .execute(conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Sale", &sale.id));
        }

        debug!(sale_id = %sale.id, net = sale.net_amount_cents, "Sale header updated");
        Ok(())
    }

    /// Lowers the net amount by a batch of returns.
    pub async fn reduce_net_amount(
        conn: &mut SqliteConnection,
        sale_id: &str,
        amount_cents: i64,
        now: DateTime<Utc>,
    ) -> DbResult<()> {
        let result = sqlx::query(
            "UPDATE sales SET net_amount_cents = net_amount_cents - ?1, updated_at = ?2 WHERE id = ?3",
        )
        .bind(amount_cents)
        .bind(now)
        .bind(sale_id)
        .execute(conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Sale", sale_id));
        }

        debug!(sale_id = %sale_id, amount_cents, "Net amount reduced");
        Ok(())
    }

    /// Deletes a header; its items go with it.
    pub async fn delete(conn: &mut SqliteConnection, sale_id: &str) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM sales WHERE id = ?1")
            .bind(sale_id)
            .execute(conn)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Sale", sale_id));
        }

        debug!(sale_id = %sale_id, "Sale deleted");
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Items
    // -------------------------------------------------------------------------

    pub async fn insert_item(conn: &mut SqliteConnection, item: &SaleItem) -> DbResult<()> {
        sqlx::query(
            r#"
            INSERT INTO sale_items (
                id, sale_id, product_id, quantity, unit_price_cents, total_cents, position
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(&item.id)
        .bind(&item.sale_id)
        .bind(&item.product_id)
        .bind(item.quantity)
        .bind(item.unit_price_cents)
        .bind(item.total_cents)
        .bind(item.position)
        .execute(conn)
        .await?;

        debug!(sale_id = %item.sale_id, product_id = %item.product_id, qty = item.quantity, "Sale item inserted");
        Ok(())
    }

    /// Rewrites an item in place, keeping its id (returns point at it).
    pub async fn update_item(conn: &mut SqliteConnection, item: &SaleItem) -> DbResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE sale_items SET
                quantity = ?2,
                unit_price_cents = ?3,
                total_cents = ?4,
                position = ?5
            WHERE id = ?1
            "#,
        )
        .bind(&item.id)
        .bind(item.quantity)
        .bind(item.unit_price_cents)
        .bind(item.total_cents)
        .bind(item.position)
        .execute(conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("SaleItem", &item.id));
        }
        Ok(())
    }

    pub async fn delete_item(conn: &mut SqliteConnection, item_id: &str) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM sale_items WHERE id = ?1")
            .bind(item_id)
            .execute(conn)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("SaleItem", item_id));
        }
        Ok(())
    }
}
