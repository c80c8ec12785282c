//! # Purchase Repository
//!
//! Purchase headers and their items. Purchase edits replace the whole item
//! set, so items are only ever inserted or deleted together.

use sqlx::{SqliteConnection, SqliteExecutor, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use mizan_core::{Purchase, PurchaseItem};

#[derive(Debug, Clone)]
pub struct PurchaseRepository {
    pool: SqlitePool,
}

impl PurchaseRepository {
    pub fn new(pool: SqlitePool) -> Self {
        PurchaseRepository { pool }
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Purchase>> {
        Self::find(&self.pool, id).await
    }

    pub async fn get_items(&self, purchase_id: &str) -> DbResult<Vec<PurchaseItem>> {
        Self::find_items(&self.pool, purchase_id).await
    }

    // -------------------------------------------------------------------------
    // Transaction-scoped operations
    // -------------------------------------------------------------------------

    pub async fn find<'e, E>(executor: E, id: &str) -> DbResult<Option<Purchase>>
    where
        E: SqliteExecutor<'e>,
    {
        let purchase = sqlx::query_as::<_, Purchase>("SELECT * FROM purchases WHERE id = ?1")
            .bind(id)
            .fetch_optional(executor)
            .await?;
        Ok(purchase)
    }

    pub async fn find_items<'e, E>(executor: E, purchase_id: &str) -> DbResult<Vec<PurchaseItem>>
    where
        E: SqliteExecutor<'e>,
    {
        let items = sqlx::query_as::<_, PurchaseItem>(
            "SELECT * FROM purchase_items WHERE purchase_id = ?1 ORDER BY position, rowid",
        )
        .bind(purchase_id)
        .fetch_all(executor)
        .await?;
        Ok(items)
    }

    pub async fn insert_header(conn: &mut SqliteConnection, purchase: &Purchase) -> DbResult<()> {
        debug!(purchase_id = %purchase.id, invoice = %purchase.invoice_number, "Inserting purchase");

        sqlx::query(
            r#"
            INSERT INTO purchases (
                id, invoice_number, supplier_id, user_id,
                total_amount_cents, discount_cents, tax_cents, net_amount_cents,
                currency, exchange_rate, status, notes,
                purchase_date, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)
            "#,
        )
        .bind(&purchase.id)
        .bind(&purchase.invoice_number)
        .bind(&purchase.supplier_id)
        .bind(&purchase.user_id)
        .bind(purchase.total_amount_cents)
        .bind(purchase.discount_cents)
        .bind(purchase.tax_cents)
        .bind(purchase.net_amount_cents)
        .bind(&purchase.currency)
        .bind(purchase.exchange_rate)
        .bind(purchase.status)
        .bind(&purchase.notes)
        .bind(purchase.purchase_date)
        .bind(purchase.created_at)
        .bind(purchase.updated_at)
        .execute(conn)
        .await
        .map_err(|e| match DbError::from(e) {
            DbError::UniqueViolation { field, .. } if field.ends_with("invoice_number") => {
                DbError::duplicate("purchases.invoice_number", purchase.invoice_number.clone())
            }
            other => other,
        })?;

        Ok(())
    }

    pub async fn update_header(conn: &mut SqliteConnection, purchase: &Purchase) -> DbResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE purchases SET
                supplier_id = ?2,
                total_amount_cents = ?3,
                discount_cents = ?4,
                tax_cents = ?5,
                net_amount_cents = ?6,
                currency = ?7,
                exchange_rate = ?8,
                notes = ?9,
                purchase_date = ?10,
                updated_at = ?11
            WHERE id = ?1
            "#,
        )
        .bind(&purchase.id)
        .bind(&purchase.supplier_id)
        .bind(purchase.total_amount_cents)
        .bind(purchase.discount_cents)
        .bind(purchase.tax_cents)
        .bind(purchase.net_amount_cents)
        .bind(&purchase.currency)
        .bind(purchase.exchange_rate)
        .bind(&purchase.notes)
        .bind(purchase.purchase_date)
        .bind(purchase.updated_at)
        .execute(conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Purchase", &purchase.id));
        }

        debug!(purchase_id = %purchase.id, net = purchase.net_amount_cents, "Purchase header updated");
        Ok(())
    }

    pub async fn insert_item(conn: &mut SqliteConnection, item: &PurchaseItem) -> DbResult<()> {
        sqlx::query(
            r#"
            INSERT INTO purchase_items (
                id, purchase_id, product_id, quantity, unit_price_cents, total_cents, position
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(&item.id)
        .bind(&item.purchase_id)
        .bind(&item.product_id)
        .bind(item.quantity)
        .bind(item.unit_price_cents)
        .bind(item.total_cents)
        .bind(item.position)
        .execute(conn)
        .await?;
        Ok(())
    }

    /// Removes every item of a purchase; returns how many were removed.
    pub async fn delete_items(conn: &mut SqliteConnection, purchase_id: &str) -> DbResult<u64> {
        let result = sqlx::query("DELETE FROM purchase_items WHERE purchase_id = ?1")
            .bind(purchase_id)
            .execute(conn)
            .await?;

        debug!(purchase_id = %purchase_id, removed = result.rows_affected(), "Purchase items cleared");
        Ok(result.rows_affected())
    }
}
