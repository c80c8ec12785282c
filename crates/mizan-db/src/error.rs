//! # Storage Errors
//!
//! `sqlx` failures sorted into what the ledger can act on:
//! ```text
//! sqlx::Error ──► DbError ──► LedgerError::Storage
//!                   │
//!                   ├─ UniqueViolation on invoice_number → fresh number, retry
//!                   ├─ ConcurrencyConflict / PoolExhausted → retryable
//!                   ├─ InsufficientStock → business rule (stock guard)
//!                   └─ everything else → surfaced as DATABASE_ERROR
//! ```

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DbError {
    /// An update or delete matched no row.
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// Duplicate SKU, barcode or invoice number. `field` is
    /// `<table>.<column>`.
    #[error("Duplicate {field}: '{value}' already exists")]
    UniqueViolation { field: String, value: String },

    /// A row points at a product, sale item or employee that does not
    /// exist, or a delete would orphan a return.
    #[error("Foreign key violation: {message}")]
    ForeignKeyViolation { message: String },

    /// CHECK constraint violation (negative stock, salary balance out of
    /// bounds, ...). Schema-level backstop behind the repository guards.
    #[error("Check constraint violation: {message}")]
    CheckViolation { message: String },

    /// The stock store refused a delta that would take quantity below zero.
    #[error("Insufficient stock for {sku}: available {available}, requested {requested}")]
    InsufficientStock {
        product_id: String,
        sku: String,
        available: i64,
        requested: i64,
    },

    /// SQLite reported BUSY or LOCKED: another writer held the lock past
    /// the busy timeout. The whole operation may be retried from scratch.
    #[error("Concurrency conflict: {0}")]
    ConcurrencyConflict(String),

    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Every pooled connection stayed busy past the acquire timeout.
    #[error("Connection pool exhausted")]
    PoolExhausted,

    #[error("Internal database error: {0}")]
    Internal(String),
}

impl DbError {
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        DbError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    pub fn duplicate(field: impl Into<String>, value: impl Into<String>) -> Self {
        DbError::UniqueViolation {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Unique violation on a column whose name ends with `column`
    /// (e.g. `"invoice_number"` matches `sales.invoice_number`).
    pub fn is_unique_violation_on(&self, column: &str) -> bool {
        matches!(self, DbError::UniqueViolation { field, .. } if field.ends_with(column))
    }

    /// Lock conflicts and pool exhaustion clear up on their own.
    pub fn is_retryable(&self) -> bool {
        matches!(self, DbError::ConcurrencyConflict(_) | DbError::PoolExhausted)
    }
}

/// SQLite primary result codes for lock contention.
const SQLITE_BUSY: i64 = 5;
const SQLITE_LOCKED: i64 = 6;

fn is_lock_contention(code: Option<&str>, message: &str) -> bool {
    let primary = code
        .and_then(|c| c.parse::<i64>().ok())
        .map(|c| c & 0xff);

    matches!(primary, Some(SQLITE_BUSY) | Some(SQLITE_LOCKED))
        || message.contains("database is locked")
        || message.contains("database table is locked")
}

/// Classifies a SQLite error message by the constraint it names.
///
/// SQLite reports `UNIQUE constraint failed: <table>.<column>`,
/// `FOREIGN KEY constraint failed` and `CHECK constraint failed: <name>`.
fn classify_constraint(message: &str) -> DbError {
    if let Some(column) = message.strip_prefix("UNIQUE constraint failed: ") {
        // Composite indexes list every column: keep the first
        let column = column.split(',').next().unwrap_or(column).trim();
        return DbError::duplicate(column, "unknown");
    }
    if message.starts_with("FOREIGN KEY constraint failed") {
        return DbError::ForeignKeyViolation {
            message: message.to_string(),
        };
    }
    if message.starts_with("CHECK constraint failed") {
        return DbError::CheckViolation {
            message: message.to_string(),
        };
    }
    DbError::QueryFailed(message.to_string())
}

/// ```text
/// RowNotFound       → NotFound
/// Database          → BUSY/LOCKED → ConcurrencyConflict, else by constraint
/// PoolTimedOut      → PoolExhausted (retryable)
/// PoolClosed        → ConnectionFailed
/// anything else     → Internal
/// ```
impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => DbError::not_found("Record", "unknown"),
            sqlx::Error::Database(db_err) => {
                let message = db_err.message();
                if is_lock_contention(db_err.code().as_deref(), message) {
                    DbError::ConcurrencyConflict(message.to_string())
                } else {
                    classify_constraint(message)
                }
            }
            sqlx::Error::PoolTimedOut => DbError::PoolExhausted,
            sqlx::Error::PoolClosed => DbError::ConnectionFailed("pool is closed".to_string()),
            other => DbError::Internal(other.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for DbError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        DbError::MigrationFailed(err.to_string())
    }
}

pub type DbResult<T> = Result<T, DbError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lock_contention_detection() {
        assert!(is_lock_contention(Some("5"), "anything"));
        // SQLITE_BUSY_SNAPSHOT (517) and SQLITE_LOCKED_SHAREDCACHE (262)
        assert!(is_lock_contention(Some("517"), ""));
        assert!(is_lock_contention(Some("262"), ""));
        assert!(is_lock_contention(None, "database is locked"));
        assert!(!is_lock_contention(Some("19"), "UNIQUE constraint failed: sales.invoice_number"));
    }

    #[test]
    fn test_unique_violation_column_match() {
        let err = DbError::duplicate("sales.invoice_number", "INV-1-001");
        assert!(err.is_unique_violation_on("invoice_number"));
        assert!(!err.is_unique_violation_on("sku"));
    }

    #[test]
    fn test_constraint_classification() {
        assert!(classify_constraint("UNIQUE constraint failed: products.sku").is_unique_violation_on("sku"));
        assert!(matches!(
            classify_constraint("CHECK constraint failed: quantity >= 0"),
            DbError::CheckViolation { .. }
        ));
        assert!(matches!(
            classify_constraint("FOREIGN KEY constraint failed"),
            DbError::ForeignKeyViolation { .. }
        ));
        assert!(matches!(classify_constraint("no such table: x"), DbError::QueryFailed(_)));
    }

    #[test]
    fn test_retryable() {
        assert!(DbError::ConcurrencyConflict("database is locked".into()).is_retryable());
        assert!(DbError::PoolExhausted.is_retryable());
        assert!(!DbError::not_found("Product", "p1").is_retryable());
    }
}
