//! # Cash Transaction Recorder
//!
//! Receipts, payments, expenses and transfers. None of them touch stock.
//! An employee-linked PAYMENT is an advance and draws on the employee's
//! salary balance in the same transaction.
//!
//! Edits overwrite the row and leave no trail, unlike stock movements.

use chrono::Utc;
use tracing::info;

use mizan_core::cash::{check_editable, check_recordable, is_employee_advance};
use mizan_core::payroll::draw;
use mizan_core::request::CashTransactionInput;
use mizan_core::{CashTransaction, CashTransactionType, CoreError, Employee};
use mizan_db::{CashRepository, EmployeeRepository};
use sqlx::SqliteConnection;

use crate::{new_id, Ledger, LedgerResult};

impl Ledger {
    pub async fn record_cash(&self, input: &CashTransactionInput, user_id: &str) -> LedgerResult<CashTransaction> {
        self.bounded("record_cash", self.record_cash_once(input, user_id))
            .await
    }

    async fn record_cash_once(&self, input: &CashTransactionInput, user_id: &str) -> LedgerResult<CashTransaction> {
        check_recordable(input)?;

        let mut tx = self.db.begin_immediate().await?;
        let now = Utc::now();

        let employee = match &input.employee_id {
            Some(employee_id) => Some(find_employee(&mut tx, employee_id).await?),
            None => None,
        };

        let transaction = CashTransaction {
            id: new_id(),
            transaction_type: input.transaction_type,
            amount_cents: input.amount_cents,
            currency: input.currency().to_string(),
            exchange_rate: input.exchange_rate(),
            description: input.description.clone(),
            employee_id: input.employee_id.clone(),
            expense_category_id: input.expense_category_id.clone(),
            reference_id: input.reference_id.clone(),
            status: input.status,
            user_id: user_id.to_string(),
            created_at: now,
            updated_at: now,
        };
        CashRepository::insert(&mut tx, &transaction).await?;

        let advance_from = employee.as_ref().filter(|_| is_employee_advance(input));
        if let Some(employee) = advance_from {
            let change = draw(self.policy.as_ref(), employee, None, input.amount_cents, now)?;
            EmployeeRepository::update_balance(&mut tx, &employee.id, change.new_remaining, now).await?;
            info!(
                employee_id = %employee.id,
                amount_cents = input.amount_cents,
                remaining_cents = change.new_remaining,
                "Advance drawn"
            );
        }

        tx.commit().await?;

        info!(
            id = %transaction.id,
            kind = %transaction.transaction_type,
            amount_cents = transaction.amount_cents,
            "Cash transaction recorded"
        );
        Ok(transaction)
    }

    /// Replaces every mutable field of a COMPLETED, non-RECEIPT record
    /// created within the last 24 hours.
    pub async fn edit_cash(
        &self,
        transaction_id: &str,
        input: &CashTransactionInput,
    ) -> LedgerResult<CashTransaction> {
        self.bounded("edit_cash", self.edit_cash_once(transaction_id, input))
            .await
    }

    async fn edit_cash_once(&self, transaction_id: &str, input: &CashTransactionInput) -> LedgerResult<CashTransaction> {
        input.validate()?;

        let mut tx = self.db.begin_immediate().await?;
        let now = Utc::now();

        let existing = CashRepository::find(&mut *tx, transaction_id)
            .await?
            .ok_or_else(|| CoreError::CashTransactionNotFound(transaction_id.to_string()))?;
        check_editable(&existing, now)?;

        let was_salary = existing.transaction_type == CashTransactionType::Salary;
        let is_salary = input.transaction_type == CashTransactionType::Salary;
        if was_salary != is_salary {
            return Err(CoreError::NotEditable {
                reason: "salary records cannot change type".to_string(),
            }
            .into());
        }

        if let Some(employee_id) = &input.employee_id {
            find_employee(&mut tx, employee_id).await?;
        }

        let edited = CashTransaction {
            transaction_type: input.transaction_type,
            amount_cents: input.amount_cents,
            currency: input.currency().to_string(),
            exchange_rate: input.exchange_rate(),
            description: input.description.clone(),
            employee_id: input.employee_id.clone(),
            expense_category_id: input.expense_category_id.clone(),
            reference_id: input.reference_id.clone(),
            status: input.status,
            updated_at: now,
            ..existing
        };
        CashRepository::update(&mut tx, &edited).await?;

        tx.commit().await?;

        info!(id = %edited.id, "Cash transaction edited");
        Ok(edited)
    }

    pub async fn get_cash(&self, transaction_id: &str) -> LedgerResult<CashTransaction> {
        let transaction = self
            .db
            .cash()
            .get_by_id(transaction_id)
            .await?
            .ok_or_else(|| CoreError::CashTransactionNotFound(transaction_id.to_string()))?;
        Ok(transaction)
    }

    /// An employee's salary records and advances, oldest first.
    pub async fn employee_cash(&self, employee_id: &str) -> LedgerResult<Vec<CashTransaction>> {
        Ok(self.db.cash().list_for_employee(employee_id).await?)
    }
}

async fn find_employee(conn: &mut SqliteConnection, employee_id: &str) -> LedgerResult<Employee> {
    let employee = EmployeeRepository::find(&mut *conn, employee_id)
        .await?
        .ok_or_else(|| CoreError::EmployeeNotFound(employee_id.to_string()))?;
    Ok(employee)
}
