//! # mizan-core: Pure Ledger Rules
//!
//! Every rule that decides whether a stock- or cash-affecting operation may
//! happen lives here, as plain functions over plain data. The database layer
//! loads state, hands it to these functions, and writes whatever they return.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Mizan Architecture                               │
//! │                                                                         │
//! │  Request handlers (excluded: HTTP, sessions, rendering)                 │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │              mizan-ledger (one transaction per operation)       │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ mizan-core (THIS CRATE) ★                       │   │
//! │  │                                                                 │   │
//! │  │   builder     reconcile     returns     payroll     cash        │   │
//! │  │   (plan)      (edit diff)   (limits)    (balance)   (guard)     │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO CLOCK • PURE FUNCTIONS              │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    mizan-db (SQLite repositories)               │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Stored records (Product, Sale, Return, InventoryHistory, ...)
//! - [`request`] - Inbound request shapes
//! - [`money`] - Integer money
//! - [`error`] - Business-rule and validation errors
//! - [`validation`] - Field validators
//! - [`builder`] - Transaction Builder (validate + total line items)
//! - [`reconcile`] - Sale-edit stock deltas, item matching, history replay
//! - [`returns`] - Return window and cumulative-return limits
//! - [`payroll`] - Remaining-salary balance selection
//! - [`cash`] - Cash transaction edit guard
//! - [`invoice`] - Invoice number formatting
//! - [`window`] - Return and edit windows
//!
//! ## Example
//!
//! ```rust
//! use std::collections::HashMap;
//! use mizan_core::builder::{Direction, TransactionBuilder};
//! use mizan_core::request::{LineInput, TransactionRequest};
//! use mizan_core::Product;
//!
//! let catalog: HashMap<String, Product> = HashMap::new();
//! let request = TransactionRequest::new(vec![LineInput::new("missing", 1, 100)]);
//!
//! let err = TransactionBuilder::new(Direction::Sale)
//!     .build(&request, &catalog)
//!     .unwrap_err();
//! assert!(err.to_string().contains("Product not found"));
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod builder;
pub mod cash;
pub mod error;
pub mod invoice;
pub mod money;
pub mod payroll;
pub mod reconcile;
pub mod request;
pub mod returns;
pub mod types;
pub mod validation;
pub mod window;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, CoreResult, ValidationError};
pub use money::Money;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// A sale accepts returns while it is at most this many days old.
pub const RETURN_WINDOW_DAYS: i64 = 30;

/// Sales and cash transactions may be edited while at most this many hours old.
pub const EDIT_WINDOW_HOURS: i64 = 24;

/// Reorder threshold applied when a product is created without one.
pub const DEFAULT_MIN_QUANTITY: i64 = 5;

/// Maximum line items accepted in a single sale or purchase.
pub const MAX_LINE_ITEMS: usize = 500;
