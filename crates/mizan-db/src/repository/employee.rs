//! # Employee Repository
//!
//! Employees and their running salary balance. The balance is written only
//! through [`EmployeeRepository::update_balance`], inside the same
//! transaction as the cash record that pays it out.

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqliteExecutor, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use mizan_core::Employee;

#[derive(Debug, Clone)]
pub struct EmployeeRepository {
    pool: SqlitePool,
}

impl EmployeeRepository {
    pub fn new(pool: SqlitePool) -> Self {
        EmployeeRepository { pool }
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Employee>> {
        Self::find(&self.pool, id).await
    }

    pub async fn list_active(&self) -> DbResult<Vec<Employee>> {
        let employees = sqlx::query_as::<_, Employee>(
            "SELECT * FROM employees WHERE is_active = 1 ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(employees)
    }

    // -------------------------------------------------------------------------
    // Transaction-scoped operations
    // -------------------------------------------------------------------------

    pub async fn find<'e, E>(executor: E, id: &str) -> DbResult<Option<Employee>>
    where
        E: SqliteExecutor<'e>,
    {
        let employee = sqlx::query_as::<_, Employee>("SELECT * FROM employees WHERE id = ?1")
            .bind(id)
            .fetch_optional(executor)
            .await?;
        Ok(employee)
    }

    pub async fn insert(conn: &mut SqliteConnection, employee: &Employee) -> DbResult<()> {
        sqlx::query(
            r#"
            INSERT INTO employees (
                id, name, position, salary_cents, remaining_salary_cents,
                last_payment_date, is_active, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
        )
        .bind(&employee.id)
        .bind(&employee.name)
        .bind(&employee.position)
        .bind(employee.salary_cents)
        .bind(employee.remaining_salary_cents)
        .bind(employee.last_payment_date)
        .bind(employee.is_active)
        .bind(employee.created_at)
        .bind(employee.updated_at)
        .execute(conn)
        .await?;

        debug!(employee_id = %employee.id, "Employee inserted");
        Ok(())
    }

    /// Stores the balance left after a payment and the payment date.
    pub async fn update_balance(
        conn: &mut SqliteConnection,
        id: &str,
        remaining_salary_cents: i64,
        last_payment_date: DateTime<Utc>,
    ) -> DbResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE employees SET
                remaining_salary_cents = ?1,
                last_payment_date = ?2,
                updated_at = ?2
            WHERE id = ?3
            "#,
        )
        .bind(remaining_salary_cents)
        .bind(last_payment_date)
        .bind(id)
        .execute(conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Employee", id));
        }

        debug!(employee_id = %id, remaining_salary_cents, "Salary balance updated");
        Ok(())
    }
}
