//! # Payroll Ledger
//!
//! Salary payments draw on the employee's remaining balance. The balance
//! update and the SALARY cash record commit together or not at all.
//!
//! Which balance a payment draws on is decided by the ledger's
//! [`BalancePolicy`](mizan_core::payroll::BalancePolicy); see
//! [`Ledger::with_policy`].

use chrono::Utc;
use serde::Serialize;
use tracing::info;

use mizan_core::payroll::{draw, salary_description, BalanceChange};
use mizan_core::request::{NewEmployee, SalaryPayment};
use mizan_core::{CashTransaction, CashTransactionType, CoreError, Employee, TransactionStatus};
use mizan_db::{CashRepository, EmployeeRepository};

use crate::{new_id, Ledger, LedgerResult};

/// A committed salary payment.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PayrollPayment {
    pub transaction: CashTransaction,
    pub previous_remaining_cents: i64,
    pub new_remaining_cents: i64,
}

impl PayrollPayment {
    fn new(transaction: CashTransaction, change: BalanceChange) -> Self {
        PayrollPayment {
            transaction,
            previous_remaining_cents: change.previous_remaining,
            new_remaining_cents: change.new_remaining,
        }
    }
}

impl Ledger {
    pub async fn create_employee(&self, input: &NewEmployee) -> LedgerResult<Employee> {
        self.bounded("create_employee", self.create_employee_once(input))
            .await
    }

    async fn create_employee_once(&self, input: &NewEmployee) -> LedgerResult<Employee> {
        input.validate()?;

        let now = Utc::now();
        let employee = Employee {
            id: new_id(),
            name: input.name.trim().to_string(),
            position: input.position.clone(),
            salary_cents: input.salary_cents,
            remaining_salary_cents: None,
            last_payment_date: None,
            is_active: true,
            created_at: now,
            updated_at: now,
        };

        let mut tx = self.db.begin_immediate().await?;
        EmployeeRepository::insert(&mut tx, &employee).await?;
        tx.commit().await?;

        info!(employee_id = %employee.id, "Employee created");
        Ok(employee)
    }

    pub async fn get_employee(&self, employee_id: &str) -> LedgerResult<Employee> {
        let employee = self
            .db
            .employees()
            .get_by_id(employee_id)
            .await?
            .ok_or_else(|| CoreError::EmployeeNotFound(employee_id.to_string()))?;
        Ok(employee)
    }

    pub async fn employees(&self) -> LedgerResult<Vec<Employee>> {
        Ok(self.db.employees().list_active().await?)
    }

    /// Pays salary out of the employee's balance.
    ///
    /// The balance is re-read inside the transaction; an amount above it is
    /// rejected, never clamped.
    pub async fn pay_salary(&self, payment: &SalaryPayment, user_id: &str) -> LedgerResult<PayrollPayment> {
        self.bounded("pay_salary", self.pay_salary_once(payment, user_id))
            .await
    }

    async fn pay_salary_once(&self, payment: &SalaryPayment, user_id: &str) -> LedgerResult<PayrollPayment> {
        payment.validate()?;

        let mut tx = self.db.begin_immediate().await?;
        let now = Utc::now();

        let employee = EmployeeRepository::find(&mut *tx, &payment.employee_id)
            .await?
            .ok_or_else(|| CoreError::EmployeeNotFound(payment.employee_id.clone()))?;

        let change = draw(
            self.policy.as_ref(),
            &employee,
            Some(payment.salary_type),
            payment.amount_cents,
            now,
        )?;

        let transaction = CashTransaction {
            id: new_id(),
            transaction_type: CashTransactionType::Salary,
            amount_cents: payment.amount_cents,
            currency: payment.currency().to_string(),
            exchange_rate: payment.exchange_rate(),
            description: Some(salary_description(
                payment.salary_type,
                &employee.name,
                &payment.salary_period,
                &payment.description,
            )),
            employee_id: Some(employee.id.clone()),
            expense_category_id: None,
            reference_id: payment.reference_id.clone(),
            status: TransactionStatus::Completed,
            user_id: user_id.to_string(),
            created_at: now,
            updated_at: now,
        };
        CashRepository::insert(&mut tx, &transaction).await?;
        EmployeeRepository::update_balance(&mut tx, &employee.id, change.new_remaining, now).await?;

        tx.commit().await?;

        info!(
            employee_id = %employee.id,
            salary_type = %payment.salary_type,
            amount_cents = payment.amount_cents,
            remaining_cents = change.new_remaining,
            "Salary paid"
        );
        Ok(PayrollPayment::new(transaction, change))
    }
}
