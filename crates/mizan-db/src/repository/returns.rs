//! # Return Repository
//!
//! Returns reference a sale and one of its items without owning either.
//! Only COMPLETED returns count toward what has been returned.

use sqlx::{SqliteConnection, SqliteExecutor, SqlitePool};
use std::collections::HashMap;
use tracing::debug;

use crate::error::DbResult;
use mizan_core::Return;

#[derive(Debug, Clone)]
pub struct ReturnRepository {
    pool: SqlitePool,
}

impl ReturnRepository {
    pub fn new(pool: SqlitePool) -> Self {
        ReturnRepository { pool }
    }

    pub async fn get_for_sale(&self, sale_id: &str) -> DbResult<Vec<Return>> {
        Self::find_for_sale(&self.pool, sale_id).await
    }

    // -------------------------------------------------------------------------
    // Transaction-scoped operations
    // -------------------------------------------------------------------------

    pub async fn find_for_sale<'e, E>(executor: E, sale_id: &str) -> DbResult<Vec<Return>>
    where
        E: SqliteExecutor<'e>,
    {
        let returns = sqlx::query_as::<_, Return>(
            "SELECT * FROM returns WHERE sale_id = ?1 ORDER BY created_at, rowid",
        )
        .bind(sale_id)
        .fetch_all(executor)
        .await?;
        Ok(returns)
    }

    /// Completed return quantity per sale item of one sale.
    pub async fn returned_by_item<'e, E>(executor: E, sale_id: &str) -> DbResult<HashMap<String, i64>>
    where
        E: SqliteExecutor<'e>,
    {
        let rows: Vec<(String, i64)> = sqlx::query_as(
            r#"
            SELECT sale_item_id, SUM(quantity)
            FROM returns
            WHERE sale_id = ?1 AND status = 'COMPLETED'
            GROUP BY sale_item_id
            "#,
        )
        .bind(sale_id)
        .fetch_all(executor)
        .await?;

        Ok(rows.into_iter().collect())
    }

    /// `(count, amount_cents)` of a sale's completed returns.
    pub async fn completed_totals<'e, E>(executor: E, sale_id: &str) -> DbResult<(i64, i64)>
    where
        E: SqliteExecutor<'e>,
    {
        let totals: (i64, i64) = sqlx::query_as(
            r#"
            SELECT COUNT(*), COALESCE(SUM(amount_cents), 0)
            FROM returns
            WHERE sale_id = ?1 AND status = 'COMPLETED'
            "#,
        )
        .bind(sale_id)
        .fetch_one(executor)
        .await?;
        Ok(totals)
    }

    pub async fn insert(conn: &mut SqliteConnection, ret: &Return) -> DbResult<()> {
        sqlx::query(
            r#"
            INSERT INTO returns (
                id, sale_id, sale_item_id, product_id, quantity,
                amount_cents, reason, status, user_id, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
        )
        .bind(&ret.id)
        .bind(&ret.sale_id)
        .bind(&ret.sale_item_id)
        .bind(&ret.product_id)
        .bind(ret.quantity)
        .bind(ret.amount_cents)
        .bind(&ret.reason)
        .bind(ret.status)
        .bind(&ret.user_id)
        .bind(ret.created_at)
        .execute(conn)
        .await?;

        debug!(
            sale_id = %ret.sale_id,
            sale_item_id = %ret.sale_item_id,
            qty = ret.quantity,
            "Return inserted"
        );
        Ok(())
    }
}
