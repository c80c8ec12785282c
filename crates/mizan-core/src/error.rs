//! # Error Types
//!
//! Business-rule and validation errors for mizan-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  mizan-core (this file)                                                 │
//! │  ├── CoreError        - Business-rule rejections (with the numbers)     │
//! │  └── ValidationError  - Field-level input failures                      │
//! │                                                                         │
//! │  mizan-db                                                               │
//! │  └── DbError          - Storage failures, lock conflicts                │
//! │                                                                         │
//! │  mizan-ledger                                                           │
//! │  └── LedgerError      - What callers see (code + retryable flag)        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Rejections always carry the figures involved (available vs requested,
//! remaining vs requested) so the caller can explain the failure. Nothing is
//! ever silently clamped.

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Business-rule rejections.
///
/// Every variant leaves persisted state untouched: the ledger aborts the
/// enclosing transaction before returning one of these.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    /// Product id does not exist.
    #[error("Product not found: {0}")]
    ProductNotFound(String),

    /// Product exists but has been deactivated.
    #[error("Product {sku} is not active")]
    ProductInactive { sku: String },

    /// Applying the operation would drive on-hand stock below zero.
    ///
    /// ## User Workflow
    /// ```text
    /// Sell 5 × COKE-330
    ///      │
    ///      ▼
    /// Stock check: available=3
    ///      │
    ///      ▼
    /// InsufficientStock { sku: "COKE-330", available: 3, requested: 5 }
    ///      │
    ///      ▼
    /// UI shows: "Only 3 COKE-330 in stock (short by 2)"
    /// ```
    #[error("Insufficient stock for {sku}: available {available}, requested {requested}")]
    InsufficientStock {
        sku: String,
        available: i64,
        requested: i64,
    },

    #[error("Sale not found: {0}")]
    SaleNotFound(String),

    #[error("Sale item {sale_item_id} not found on sale {sale_id}")]
    SaleItemNotFound {
        sale_id: String,
        sale_item_id: String,
    },

    #[error("Purchase not found: {0}")]
    PurchaseNotFound(String),

    #[error("Employee not found: {0}")]
    EmployeeNotFound(String),

    #[error("Cash transaction not found: {0}")]
    CashTransactionNotFound(String),

    /// Return request exceeds what is still returnable on a sale item.
    #[error(
        "Cannot return {requested} of sale item {sale_item_id}: only {available} available \
         (original: {original}, already returned: {already_returned})"
    )]
    OverReturn {
        sale_item_id: String,
        original: i64,
        already_returned: i64,
        requested: i64,
        available: i64,
    },

    /// Salary or advance exceeds the employee's remaining balance.
    #[error("Payment amount {requested} exceeds remaining salary {remaining}")]
    PayrollOverpayment { requested: i64, remaining: i64 },

    /// Discount outweighs item total plus tax.
    #[error("Net amount cannot be negative: total {total} - discount {discount} + tax {tax}")]
    NegativeNetAmount { total: i64, discount: i64, tax: i64 },

    #[error("Sales older than {max_days} days cannot be returned (sale is {age_days} days old)")]
    ReturnWindowExpired { age_days: i64, max_days: i64 },

    #[error("Records older than {max_hours} hours cannot be edited (record is {age_hours} hours old)")]
    EditWindowExpired { age_hours: i64, max_hours: i64 },

    /// Record is in a state that forbids editing (wrong type or status).
    #[error("Transaction cannot be edited: {reason}")]
    NotEditable { reason: String },

    /// Cancelling would orphan completed returns.
    #[error("Sale {sale_id} has {returns} completed return(s) and cannot be cancelled")]
    SaleHasReturns { sale_id: String, returns: i64 },

    /// Edit would shrink or drop a line below what was already returned on it.
    #[error(
        "Sale item {sale_item_id} already has {returned} unit(s) returned; \
         it cannot be edited down to {requested}"
    )]
    EditBelowReturned {
        sale_item_id: String,
        returned: i64,
        requested: i64,
    },

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

impl CoreError {
    /// Creates an InsufficientStock error.
    pub fn insufficient_stock(sku: impl Into<String>, available: i64, requested: i64) -> Self {
        CoreError::InsufficientStock {
            sku: sku.into(),
            available,
            requested,
        }
    }

    /// Units missing to satisfy an InsufficientStock rejection.
    pub fn deficit(&self) -> Option<i64> {
        match self {
            CoreError::InsufficientStock {
                available,
                requested,
                ..
            } => Some(requested - available),
            _ => None,
        }
    }

    /// True for missing product/sale/item/employee/cash records.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            CoreError::ProductNotFound(_)
                | CoreError::SaleNotFound(_)
                | CoreError::SaleItemNotFound { .. }
                | CoreError::PurchaseNotFound(_)
                | CoreError::EmployeeNotFound(_)
                | CoreError::CashTransactionNotFound(_)
        )
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors with field-level detail.
///
/// Field names use the request path, e.g. `items[2].quantity`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{field} is required")]
    Required { field: String },

    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    #[error("{field} must be positive")]
    MustBePositive { field: String },

    #[error("{field} cannot be negative")]
    MustNotBeNegative { field: String },

    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    #[error("{field} must be one of: {allowed:?}")]
    NotAllowed { field: String, allowed: Vec<String> },
}

impl ValidationError {
    /// Name of the offending field.
    pub fn field(&self) -> &str {
        match self {
            ValidationError::Required { field }
            | ValidationError::TooLong { field, .. }
            | ValidationError::OutOfRange { field, .. }
            | ValidationError::MustBePositive { field }
            | ValidationError::MustNotBeNegative { field }
            | ValidationError::InvalidFormat { field, .. }
            | ValidationError::NotAllowed { field, .. } => field,
        }
    }
}

// =============================================================================
// Result Type Alias
// =============================================================================

pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insufficient_stock_message_and_deficit() {
        let err = CoreError::insufficient_stock("COKE-330", 3, 5);
        assert_eq!(
            err.to_string(),
            "Insufficient stock for COKE-330: available 3, requested 5"
        );
        assert_eq!(err.deficit(), Some(2));
    }

    #[test]
    fn test_over_return_reports_available() {
        let err = CoreError::OverReturn {
            sale_item_id: "item-1".to_string(),
            original: 4,
            already_returned: 2,
            requested: 3,
            available: 2,
        };
        let msg = err.to_string();
        assert!(msg.contains("only 2 available"), "{msg}");
        assert!(msg.contains("original: 4"));
        assert!(msg.contains("already returned: 2"));
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let err: CoreError = ValidationError::Required {
            field: "items".to_string(),
        }
        .into();
        assert!(matches!(err, CoreError::Validation(_)));
        assert_eq!(err.to_string(), "Validation error: items is required");
    }

    #[test]
    fn test_not_found_classification() {
        assert!(CoreError::SaleNotFound("s".into()).is_not_found());
        assert!(!CoreError::insufficient_stock("x", 0, 1).is_not_found());
    }
}
