//! Cash transaction guards.
//!
//! A cash transaction is editable only while it is COMPLETED, is not a
//! RECEIPT, and is at most 24 hours old. Edits replace the mutable fields in
//! one update and leave no history trail.

use chrono::{DateTime, Utc};

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::request::CashTransactionInput;
use crate::types::{CashTransaction, CashTransactionType, TransactionStatus};
use crate::window::check_edit_window;

/// Checks the status, type and age guard for an edit.
pub fn check_editable(transaction: &CashTransaction, now: DateTime<Utc>) -> CoreResult<()> {
    if transaction.status != TransactionStatus::Completed {
        return Err(CoreError::NotEditable {
            reason: format!("status is {}", transaction.status),
        });
    }

    if transaction.transaction_type == CashTransactionType::Receipt {
        return Err(CoreError::NotEditable {
            reason: "receipts cannot be edited".to_string(),
        });
    }

    check_edit_window(transaction.created_at, now)
}

/// Inputs accepted by the plain cash recorder.
///
/// SALARY records are only written by the payroll ledger, which keeps the
/// employee balance in step.
pub fn check_recordable(input: &CashTransactionInput) -> CoreResult<()> {
    input.validate()?;

    if input.transaction_type == CashTransactionType::Salary {
        return Err(ValidationError::NotAllowed {
            field: "transaction_type".to_string(),
            allowed: [
                CashTransactionType::Receipt,
                CashTransactionType::Payment,
                CashTransactionType::Expense,
                CashTransactionType::Transfer,
            ]
            .iter()
            .map(|t| t.as_str().to_string())
            .collect(),
        }
        .into());
    }

    Ok(())
}

/// True for employee-linked PAYMENT records, which draw on payroll.
pub fn is_employee_advance(input: &CashTransactionInput) -> bool {
    input.transaction_type == CashTransactionType::Payment && input.employee_id.is_some()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn transaction(kind: CashTransactionType, status: TransactionStatus, age: Duration) -> CashTransaction {
        let now = Utc::now();
        CashTransaction {
            id: "c1".to_string(),
            transaction_type: kind,
            amount_cents: 5_000,
            currency: "USD".to_string(),
            exchange_rate: 1.0,
            description: None,
            employee_id: None,
            expense_category_id: None,
            reference_id: None,
            status,
            user_id: "u1".to_string(),
            created_at: now - age,
            updated_at: now - age,
        }
    }

    #[test]
    fn test_fresh_completed_expense_is_editable() {
        let tx = transaction(CashTransactionType::Expense, TransactionStatus::Completed, Duration::hours(2));
        assert!(check_editable(&tx, Utc::now()).is_ok());
    }

    #[test]
    fn test_receipts_and_non_completed_are_not_editable() {
        let receipt = transaction(CashTransactionType::Receipt, TransactionStatus::Completed, Duration::zero());
        assert!(matches!(check_editable(&receipt, Utc::now()), Err(CoreError::NotEditable { .. })));

        let pending = transaction(CashTransactionType::Payment, TransactionStatus::Pending, Duration::zero());
        match check_editable(&pending, Utc::now()) {
            Err(CoreError::NotEditable { reason }) => assert_eq!(reason, "status is PENDING"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_old_transactions_are_not_editable() {
        let old = transaction(CashTransactionType::Payment, TransactionStatus::Completed, Duration::hours(30));
        assert!(matches!(
            check_editable(&old, Utc::now()),
            Err(CoreError::EditWindowExpired { max_hours: 24, .. })
        ));
    }

    #[test]
    fn test_salary_cannot_be_recorded_directly() {
        let input = CashTransactionInput::new(CashTransactionType::Salary, 100);
        assert!(matches!(
            check_recordable(&input),
            Err(CoreError::Validation(ValidationError::NotAllowed { .. }))
        ));
        assert!(check_recordable(&CashTransactionInput::new(CashTransactionType::Transfer, 100)).is_ok());
    }

    #[test]
    fn test_employee_advance_detection() {
        let plain = CashTransactionInput::new(CashTransactionType::Payment, 100);
        assert!(!is_employee_advance(&plain));
        assert!(is_employee_advance(&plain.with_employee("e1")));
    }
}
