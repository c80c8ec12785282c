//! # Ledger Error Type
//!
//! Unified error returned by every [`Ledger`](crate::Ledger) operation.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  CoreError (rule rejected) ─────────────┐                               │
//! │                                         │                               │
//! │  DbError::InsufficientStock ── as ──► Rule(CoreError::InsufficientStock)│
//! │                                         │                               │
//! │  DbError (anything else) ──────► Storage(DbError)                       │
//! │                                         │                               │
//! │  tokio timeout elapsed ────────► Timeout(Duration)                      │
//! │                                         ▼                               │
//! │                                   LedgerError                           │
//! │                                   ├── code()         → ErrorCode        │
//! │                                   ├── is_retryable() → bool             │
//! │                                   └── payload()      → ErrorPayload     │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every error leaves persisted state unchanged: the transaction that
//! produced it was never committed.

use serde::Serialize;
use std::time::Duration;
use thiserror::Error;

use mizan_core::{CoreError, ValidationError};
use mizan_db::DbError;

#[derive(Debug, Error)]
pub enum LedgerError {
    /// A business rule rejected the operation.
    #[error(transparent)]
    Rule(#[from] CoreError),

    /// Storage failed or reported a conflict.
    #[error(transparent)]
    Storage(DbError),

    /// The whole unit did not finish within the configured bound.
    #[error("Operation timed out after {0:?}")]
    Timeout(Duration),
}

/// Machine-readable error codes for the presentation layer.
///
/// ## Usage in Frontend
/// ```typescript
/// switch (e.code) {
///   case 'INSUFFICIENT_STOCK': showShortage(e.message); break;
///   case 'CONCURRENCY_CONFLICT': retry(); break;
///   default: showError(e.message);
/// }
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    NotFound,
    ValidationError,
    Duplicate,
    InsufficientStock,
    OverReturn,
    PayrollOverpayment,
    NegativeNetAmount,
    ReturnWindowExpired,
    EditWindowExpired,
    /// Remaining rule rejections (inactive product, returns block the edit
    /// or cancel, record not editable).
    BusinessRule,
    ConcurrencyConflict,
    Timeout,
    DatabaseError,
}

/// What a failed operation reports to its caller.
///
/// ```json
/// { "code": "OVER_RETURN", "message": "Cannot return 3 of sale item ..." }
/// ```
#[derive(Debug, Clone, Serialize)]
pub struct ErrorPayload {
    pub code: ErrorCode,
    pub message: String,
    pub retryable: bool,
}

impl LedgerError {
    pub fn code(&self) -> ErrorCode {
        match self {
            LedgerError::Rule(err) => match err {
                CoreError::ProductNotFound(_)
                | CoreError::SaleNotFound(_)
                | CoreError::SaleItemNotFound { .. }
                | CoreError::PurchaseNotFound(_)
                | CoreError::EmployeeNotFound(_)
                | CoreError::CashTransactionNotFound(_) => ErrorCode::NotFound,
                CoreError::InsufficientStock { .. } => ErrorCode::InsufficientStock,
                CoreError::OverReturn { .. } => ErrorCode::OverReturn,
                CoreError::PayrollOverpayment { .. } => ErrorCode::PayrollOverpayment,
                CoreError::NegativeNetAmount { .. } => ErrorCode::NegativeNetAmount,
                CoreError::ReturnWindowExpired { .. } => ErrorCode::ReturnWindowExpired,
                CoreError::EditWindowExpired { .. } => ErrorCode::EditWindowExpired,
                CoreError::Validation(_) => ErrorCode::ValidationError,
                CoreError::ProductInactive { .. }
                | CoreError::NotEditable { .. }
                | CoreError::SaleHasReturns { .. }
                | CoreError::EditBelowReturned { .. } => ErrorCode::BusinessRule,
            },
            LedgerError::Storage(err) => match err {
                DbError::NotFound { .. } => ErrorCode::NotFound,
                DbError::UniqueViolation { .. } => ErrorCode::Duplicate,
                DbError::ForeignKeyViolation { .. } | DbError::CheckViolation { .. } => {
                    ErrorCode::ValidationError
                }
                DbError::InsufficientStock { .. } => ErrorCode::InsufficientStock,
                DbError::ConcurrencyConflict(_) | DbError::PoolExhausted => {
                    ErrorCode::ConcurrencyConflict
                }
                DbError::ConnectionFailed(_)
                | DbError::MigrationFailed(_)
                | DbError::QueryFailed(_)
                | DbError::Internal(_) => ErrorCode::DatabaseError,
            },
            LedgerError::Timeout(_) => ErrorCode::Timeout,
        }
    }

    /// Safe to rerun the whole operation from scratch. Never true for a
    /// rule rejection.
    pub fn is_retryable(&self) -> bool {
        match self {
            LedgerError::Rule(_) => false,
            LedgerError::Storage(err) => err.is_retryable(),
            LedgerError::Timeout(_) => true,
        }
    }

    /// The rule rejection behind this error, if any.
    pub fn as_rule(&self) -> Option<&CoreError> {
        match self {
            LedgerError::Rule(err) => Some(err),
            _ => None,
        }
    }

    pub fn payload(&self) -> ErrorPayload {
        let message = match self {
            // Storage internals stay in the logs
            LedgerError::Storage(
                DbError::QueryFailed(detail) | DbError::Internal(detail) | DbError::ConnectionFailed(detail),
            ) => {
                tracing::error!(%detail, "Storage failure");
                "Database operation failed".to_string()
            }
            other => other.to_string(),
        };

        ErrorPayload {
            code: self.code(),
            message,
            retryable: self.is_retryable(),
        }
    }
}

/// The stock guard's refusal is the same rule the builder checks, so it
/// surfaces as the same error.
impl From<DbError> for LedgerError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::InsufficientStock {
                sku,
                available,
                requested,
                ..
            } => LedgerError::Rule(CoreError::InsufficientStock {
                sku,
                available,
                requested,
            }),
            other => LedgerError::Storage(other),
        }
    }
}

impl From<ValidationError> for LedgerError {
    fn from(err: ValidationError) -> Self {
        LedgerError::Rule(CoreError::Validation(err))
    }
}

impl From<sqlx::Error> for LedgerError {
    fn from(err: sqlx::Error) -> Self {
        LedgerError::from(DbError::from(err))
    }
}

pub type LedgerResult<T> = Result<T, LedgerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stock_guard_maps_to_rule() {
        let err = LedgerError::from(DbError::InsufficientStock {
            product_id: "p1".into(),
            sku: "COKE-330".into(),
            available: 3,
            requested: 5,
        });

        assert_eq!(err.code(), ErrorCode::InsufficientStock);
        assert_eq!(err.as_rule().and_then(CoreError::deficit), Some(2));
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_retryable_errors() {
        assert!(LedgerError::from(DbError::ConcurrencyConflict("database is locked".into())).is_retryable());
        assert!(LedgerError::Timeout(Duration::from_secs(1)).is_retryable());
        assert!(!LedgerError::from(CoreError::SaleNotFound("s1".into())).is_retryable());
    }

    #[test]
    fn test_payload_serialization() {
        let err = LedgerError::from(CoreError::PayrollOverpayment {
            requested: 500,
            remaining: 300,
        });

        let json = serde_json::to_value(err.payload()).unwrap();
        assert_eq!(json["code"], "PAYROLL_OVERPAYMENT");
        assert_eq!(json["retryable"], false);
        assert!(json["message"].as_str().unwrap().contains("300"));
    }

    #[test]
    fn test_payload_hides_query_detail() {
        let err = LedgerError::from(DbError::QueryFailed("no such column: foo".into()));
        let payload = err.payload();
        assert_eq!(payload.code, ErrorCode::DatabaseError);
        assert_eq!(payload.message, "Database operation failed");
    }
}
