//! # Payroll Balance
//!
//! Chooses the balance a salary or advance payment draws from and checks the
//! payment against it.
//!
//! ## Balance Selection
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  salary type == MONTHLY  AND  last payment unset or in a prior month    │
//! │        → reset to nominal salary                                        │
//! │  remaining unset         → nominal salary                               │
//! │  otherwise               → stored remaining                             │
//! │                                                                         │
//! │  amount > current        → PayrollOverpayment                           │
//! │  else new remaining = current - amount, last payment = now              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The selection lives behind [`BalancePolicy`] so it can change without
//! touching the atomic update in the ledger. [`SharedMonthlyBalance`] draws
//! every salary type (bonus and overtime included) from the one monthly
//! balance.

use chrono::{DateTime, Datelike, Utc};
use std::fmt;

use crate::error::{CoreError, CoreResult};
use crate::types::{Employee, SalaryType};
use crate::validation::validate_positive;

/// Picks an employee's balance at the moment of a payment.
///
/// `salary_type` is `None` for advances drawn through an employee-linked
/// cash payment.
pub trait BalancePolicy: Send + Sync + fmt::Debug {
    fn current_remaining(
        &self,
        employee: &Employee,
        salary_type: Option<SalaryType>,
        now: DateTime<Utc>,
    ) -> i64;
}

/// One balance per employee, reset by the first MONTHLY payment of a
/// calendar month and drawn down by every payment type.
#[derive(Debug, Default, Clone, Copy)]
pub struct SharedMonthlyBalance;

impl BalancePolicy for SharedMonthlyBalance {
    fn current_remaining(
        &self,
        employee: &Employee,
        salary_type: Option<SalaryType>,
        now: DateTime<Utc>,
    ) -> i64 {
        let new_period = match employee.last_payment_date {
            None => true,
            Some(last) => (last.year(), last.month()) < (now.year(), now.month()),
        };

        if salary_type == Some(SalaryType::Monthly) && new_period {
            return employee.salary_cents;
        }

        employee
            .remaining_salary_cents
            .unwrap_or(employee.salary_cents)
    }
}

/// Balance before and after an accepted payment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BalanceChange {
    pub previous_remaining: i64,
    pub new_remaining: i64,
}

/// Checks `amount` against the policy's balance. Never clamps: an amount
/// above the balance is rejected with both figures.
pub fn draw(
    policy: &dyn BalancePolicy,
    employee: &Employee,
    salary_type: Option<SalaryType>,
    amount_cents: i64,
    now: DateTime<Utc>,
) -> CoreResult<BalanceChange> {
    validate_positive("amount_cents", amount_cents)?;

    let current = policy.current_remaining(employee, salary_type, now);
    if amount_cents > current {
        return Err(CoreError::PayrollOverpayment {
            requested: amount_cents,
            remaining: current,
        });
    }

    Ok(BalanceChange {
        previous_remaining: current,
        new_remaining: current - amount_cents,
    })
}

/// Cash-record description for a salary payment. A blank `description`
/// leaves the suffix off.
///
/// ```rust
/// use mizan_core::payroll::salary_description;
/// use mizan_core::SalaryType;
///
/// assert_eq!(
///     salary_description(SalaryType::Monthly, "Sara", "2024-05", "May salary"),
///     "MONTHLY salary for Sara - 2024-05: May salary"
/// );
/// assert_eq!(
///     salary_description(SalaryType::Bonus, "Sara", "2024-05", "  "),
///     "BONUS salary for Sara - 2024-05"
/// );
/// ```
pub fn salary_description(
    salary_type: SalaryType,
    employee_name: &str,
    period: &str,
    description: &str,
) -> String {
    let head = format!("{salary_type} salary for {employee_name} - {period}");
    match description.trim() {
        "" => head,
        note => format!("{head}: {note}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 12, 0, 0).unwrap()
    }

    fn employee(remaining: Option<i64>, last: Option<DateTime<Utc>>) -> Employee {
        Employee {
            id: "e1".to_string(),
            name: "Sara".to_string(),
            position: None,
            salary_cents: 100_000,
            remaining_salary_cents: remaining,
            last_payment_date: last,
            is_active: true,
            created_at: at(2024, 1, 1),
            updated_at: at(2024, 1, 1),
        }
    }

    #[test]
    fn test_monthly_payment_resets_in_new_month() {
        let e = employee(Some(10_000), Some(at(2024, 4, 28)));
        let change = draw(&SharedMonthlyBalance, &e, Some(SalaryType::Monthly), 60_000, at(2024, 5, 2)).unwrap();
        assert_eq!(change.previous_remaining, 100_000);
        assert_eq!(change.new_remaining, 40_000);
    }

    #[test]
    fn test_monthly_payment_resets_across_year_boundary() {
        let e = employee(Some(0), Some(at(2023, 12, 31)));
        let current = SharedMonthlyBalance.current_remaining(&e, Some(SalaryType::Monthly), at(2024, 1, 1));
        assert_eq!(current, 100_000);
    }

    #[test]
    fn test_same_month_uses_stored_balance() {
        let e = employee(Some(40_000), Some(at(2024, 5, 2)));
        let err = draw(&SharedMonthlyBalance, &e, Some(SalaryType::Monthly), 50_000, at(2024, 5, 20)).unwrap_err();
        assert_eq!(
            err,
            CoreError::PayrollOverpayment {
                requested: 50_000,
                remaining: 40_000
            }
        );
    }

    #[test]
    fn test_bonus_draws_from_same_balance_without_reset() {
        let e = employee(Some(5_000), Some(at(2024, 4, 15)));
        let current = SharedMonthlyBalance.current_remaining(&e, Some(SalaryType::Bonus), at(2024, 5, 1));
        assert_eq!(current, 5_000);
    }

    #[test]
    fn test_unset_balance_is_full_salary() {
        let e = employee(None, Some(at(2024, 5, 1)));
        let change = draw(&SharedMonthlyBalance, &e, None, 100_000, at(2024, 5, 3)).unwrap();
        assert_eq!(change.new_remaining, 0);
    }

    #[test]
    fn test_salary_description_suffix() {
        assert_eq!(
            salary_description(SalaryType::Overtime, "Sara", "2024-05", "Eid rush"),
            "OVERTIME salary for Sara - 2024-05: Eid rush"
        );
        assert_eq!(
            salary_description(SalaryType::Monthly, "Sara", "2024-05", ""),
            "MONTHLY salary for Sara - 2024-05"
        );
    }

    #[test]
    fn test_non_positive_amount_rejected() {
        let e = employee(None, None);
        assert!(matches!(
            draw(&SharedMonthlyBalance, &e, Some(SalaryType::Daily), 0, at(2024, 5, 3)),
            Err(CoreError::Validation(_))
        ));
    }
}
