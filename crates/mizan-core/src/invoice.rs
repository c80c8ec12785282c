//! Invoice numbers: `<PREFIX>-<unix millis>-<3 digit nonce>`.
//!
//! Uniqueness is enforced by the database; the ledger regenerates the
//! number with a fresh nonce and retries when an insert collides.

use chrono::{DateTime, Utc};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvoiceKind {
    Sale,
    Purchase,
}

impl InvoiceKind {
    pub const fn prefix(&self) -> &'static str {
        match self {
            InvoiceKind::Sale => "INV",
            InvoiceKind::Purchase => "PUR",
        }
    }
}

/// Formats an invoice number; only the last three digits of `nonce` are
/// used.
///
/// ```rust
/// use chrono::{TimeZone, Utc};
/// use mizan_core::invoice::{format_invoice_number, InvoiceKind};
///
/// let at = Utc.timestamp_millis_opt(1_700_000_000_123).unwrap();
/// assert_eq!(format_invoice_number(InvoiceKind::Sale, at, 7), "INV-1700000000123-007");
/// assert_eq!(format_invoice_number(InvoiceKind::Purchase, at, 4321), "PUR-1700000000123-321");
/// ```
pub fn format_invoice_number(kind: InvoiceKind, at: DateTime<Utc>, nonce: u64) -> String {
    format!("{}-{}-{:03}", kind.prefix(), at.timestamp_millis(), nonce % 1000)
}

/// Supplies candidate invoice numbers. A candidate may already be taken;
/// the ledger asks for another one when the insert collides.
pub trait InvoiceNumbering: Send + Sync + fmt::Debug {
    fn next(&self, kind: InvoiceKind, now: DateTime<Utc>) -> String;
}

/// Whether `value` has the shape produced by [`format_invoice_number`].
pub fn is_invoice_number(kind: InvoiceKind, value: &str) -> bool {
    let mut parts = value.splitn(3, '-');
    let (Some(prefix), Some(millis), Some(nonce)) = (parts.next(), parts.next(), parts.next()) else {
        return false;
    };

    prefix == kind.prefix()
        && !millis.is_empty()
        && millis.chars().all(|c| c.is_ascii_digit())
        && nonce.len() == 3
        && nonce.chars().all(|c| c.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shape() {
        let number = format_invoice_number(InvoiceKind::Sale, Utc::now(), 42);
        assert!(is_invoice_number(InvoiceKind::Sale, &number), "{number}");
        assert!(!is_invoice_number(InvoiceKind::Purchase, &number));
        assert!(!is_invoice_number(InvoiceKind::Sale, "INV-abc-001"));
        assert!(!is_invoice_number(InvoiceKind::Sale, "INV-123-01"));
    }
}
