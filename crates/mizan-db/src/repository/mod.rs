//! # Repository Module
//!
//! One repository per table group.
//!
//! ## Two Ways In
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  Reads outside a transaction                                            │
//! │       db.sales().get_by_id("...")          (&self, goes through pool)   │
//! │                                                                         │
//! │  Reads and writes inside a transaction                                  │
//! │       let mut tx = db.begin_immediate().await?;                         │
//! │       SaleRepository::find(&mut *tx, id)           (generic executor)   │
//! │       SaleRepository::insert_header(&mut tx, &sale)  (&mut connection)  │
//! │       tx.commit().await?;                                               │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`ProductRepository`] - Products and the stock guard
//! - [`InventoryRepository`] - Append-only stock history
//! - [`SaleRepository`] - Sale headers and items
//! - [`PurchaseRepository`] - Purchase headers and items
//! - [`ReturnRepository`] - Returns against sale items
//! - [`EmployeeRepository`] - Employees and salary balances
//! - [`CashRepository`] - Cash transactions

pub mod cash;
pub mod employee;
pub mod inventory;
pub mod product;
pub mod purchase;
pub mod returns;
pub mod sale;

pub use cash::CashRepository;
pub use employee::EmployeeRepository;
pub use inventory::{InventoryRepository, StockMovement};
pub use product::{ProductRepository, StockChange};
pub use purchase::PurchaseRepository;
pub use returns::ReturnRepository;
pub use sale::SaleRepository;
