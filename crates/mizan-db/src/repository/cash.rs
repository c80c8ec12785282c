//! # Cash Transaction Repository
//!
//! Monetary movements independent of stock. Edits overwrite the row in
//! place; there is no history table for cash.

use sqlx::{SqliteConnection, SqliteExecutor, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use mizan_core::CashTransaction;

#[derive(Debug, Clone)]
pub struct CashRepository {
    pool: SqlitePool,
}

impl CashRepository {
    pub fn new(pool: SqlitePool) -> Self {
        CashRepository { pool }
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<CashTransaction>> {
        Self::find(&self.pool, id).await
    }

    /// An employee's cash records, oldest first.
    pub async fn list_for_employee(&self, employee_id: &str) -> DbResult<Vec<CashTransaction>> {
        let rows = sqlx::query_as::<_, CashTransaction>(
            "SELECT * FROM cash_transactions WHERE employee_id = ?1 ORDER BY created_at, rowid",
        )
        .bind(employee_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    // -------------------------------------------------------------------------
    // Transaction-scoped operations
    // -------------------------------------------------------------------------

    pub async fn find<'e, E>(executor: E, id: &str) -> DbResult<Option<CashTransaction>>
    where
        E: SqliteExecutor<'e>,
    {
        let row = sqlx::query_as::<_, CashTransaction>("SELECT * FROM cash_transactions WHERE id = ?1")
            .bind(id)
            .fetch_optional(executor)
            .await?;
        Ok(row)
    }

    pub async fn insert(conn: &mut SqliteConnection, tx: &CashTransaction) -> DbResult<()> {
        sqlx::query(
            r#"
            INSERT INTO cash_transactions (
                id, transaction_type, amount_cents, currency, exchange_rate,
                description, employee_id, expense_category_id, reference_id,
                status, user_id, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
            "#,
        )
        .bind(&tx.id)
        .bind(tx.transaction_type)
        .bind(tx.amount_cents)
        .bind(&tx.currency)
        .bind(tx.exchange_rate)
        .bind(&tx.description)
        .bind(&tx.employee_id)
        .bind(&tx.expense_category_id)
        .bind(&tx.reference_id)
        .bind(tx.status)
        .bind(&tx.user_id)
        .bind(tx.created_at)
        .bind(tx.updated_at)
        .execute(conn)
        .await?;

        debug!(
            id = %tx.id,
            kind = %tx.transaction_type,
            amount_cents = tx.amount_cents,
            "Cash transaction recorded"
        );
        Ok(())
    }

    /// Replaces every mutable field in one statement.
    pub async fn update(conn: &mut SqliteConnection, tx: &CashTransaction) -> DbResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE cash_transactions SET
                transaction_type = ?2,
                amount_cents = ?3,
                currency = ?4,
                exchange_rate = ?5,
                description = ?6,
                employee_id = ?7,
                expense_category_id = ?8,
                reference_id = ?9,
                status = ?10,
                updated_at = ?11
            WHERE id = ?1
            "#,
        )
        .bind(&tx.id)
        .bind(tx.transaction_type)
        .bind(tx.amount_cents)
        .bind(&tx.currency)
        .bind(tx.exchange_rate)
        .bind(&tx.description)
        .bind(&tx.employee_id)
        .bind(&tx.expense_category_id)
        .bind(&tx.reference_id)
        .bind(tx.status)
        .bind(tx.updated_at)
        .execute(conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("CashTransaction", &tx.id));
        }

        debug!(id = %tx.id, "Cash transaction updated");
        Ok(())
    }
}
