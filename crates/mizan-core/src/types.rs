//! # Domain Types
//!
//! Stored records and read models of the ledger.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  Long-lived (mutated by many transactions, owned by none)               │
//! │  ┌─────────────────┐   ┌─────────────────┐                              │
//! │  │    Product      │   │    Employee     │                              │
//! │  │  quantity ≥ 0   │   │  0 ≤ remaining  │                              │
//! │  │                 │   │    ≤ salary     │                              │
//! │  └─────────────────┘   └─────────────────┘                              │
//! │                                                                         │
//! │  Headers (own their items, cascade delete)                              │
//! │  ┌─────────────────┐   ┌─────────────────┐                              │
//! │  │  Sale ─► Items  │   │ Purchase ─►Items│                              │
//! │  └────────▲────────┘   └─────────────────┘                              │
//! │           │ weak reference (never owns, never deletes)                  │
//! │  ┌────────┴────────┐   ┌─────────────────┐   ┌─────────────────┐        │
//! │  │     Return      │   │InventoryHistory │   │ CashTransaction │        │
//! │  │                 │   │  (append-only)  │   │                 │        │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every amount is stored in minor units (`*_cents`); use the accessor
//! methods to get a [`Money`].
//!
//! Enums are stored and serialized as SCREAMING_SNAKE_CASE text
//! (`"SALE_EDIT"`, `"COMPLETED"`), matching the presentation layer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use ts_rs::TS;

use crate::money::Money;

// =============================================================================
// Product
// =============================================================================

/// A stocked product. `quantity` is the single source of truth for
/// availability and only ever changes through the stock store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Product {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Stock Keeping Unit - business identifier, unique.
    pub sku: String,

    /// Barcode, unique when present.
    pub barcode: Option<String>,

    pub name: String,

    /// On-hand stock. Never negative.
    pub quantity: i64,

    /// Reorder threshold.
    pub min_quantity: i64,

    /// Latest purchase price, rolled forward by every purchase.
    pub cost_price_cents: i64,

    pub selling_price_cents: i64,

    /// Whether product is active (soft delete).
    pub is_active: bool,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,

    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Product {
    #[inline]
    pub fn cost_price(&self) -> Money {
        Money::from_cents(self.cost_price_cents)
    }

    #[inline]
    pub fn selling_price(&self) -> Money {
        Money::from_cents(self.selling_price_cents)
    }

    /// At or below the reorder threshold.
    #[inline]
    pub fn is_low_stock(&self) -> bool {
        self.quantity <= self.min_quantity
    }
}

// =============================================================================
// Statuses & Methods
// =============================================================================

/// Lifecycle status shared by headers, returns and cash transactions.
///
/// Only `Completed` records count toward balances; a cancelled sale is
/// deleted outright rather than persisted as `Cancelled`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionStatus {
    Completed,
    Pending,
    Cancelled,
}

impl Default for TransactionStatus {
    fn default() -> Self {
        TransactionStatus::Completed
    }
}

impl TransactionStatus {
    pub const fn as_str(&self) -> &'static str {
        match self {
            TransactionStatus::Completed => "COMPLETED",
            TransactionStatus::Pending => "PENDING",
            TransactionStatus::Cancelled => "CANCELLED",
        }
    }
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentMethod {
    Cash,
    /// Customer owes the amount (on account).
    Credit,
    Card,
}

impl Default for PaymentMethod {
    fn default() -> Self {
        PaymentMethod::Cash
    }
}

// =============================================================================
// Sale
// =============================================================================

/// Sale header. `net_amount_cents` shrinks with every completed return:
///
/// ```text
/// net = total_amount - discount + tax - Σ completed returns
/// ```
///
/// Returns are refunded at the item's unit price, so a discounted sale can
/// end up with a negative net amount.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Sale {
    pub id: String,
    pub invoice_number: String,
    pub customer_id: Option<String>,
    pub payment_method: PaymentMethod,
    /// Acting user at creation.
    pub user_id: String,
    pub total_amount_cents: i64,
    pub discount_cents: i64,
    pub tax_cents: i64,
    pub net_amount_cents: i64,
    pub status: TransactionStatus,
    pub notes: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Sale {
    #[inline]
    pub fn total_amount(&self) -> Money {
        Money::from_cents(self.total_amount_cents)
    }

    #[inline]
    pub fn net_amount(&self) -> Money {
        Money::from_cents(self.net_amount_cents)
    }

    /// Net amount before any returns.
    #[inline]
    pub fn gross_net_amount(&self) -> Money {
        Money::from_cents(self.total_amount_cents - self.discount_cents + self.tax_cents)
    }
}

/// A line item in a sale. Unit price is frozen at the time of sale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct SaleItem {
    pub id: String,
    pub sale_id: String,
    pub product_id: String,
    pub quantity: i64,
    pub unit_price_cents: i64,
    /// `quantity × unit_price_cents`.
    pub total_cents: i64,
    /// Order within the sale, zero-based.
    pub position: i64,
}

impl SaleItem {
    #[inline]
    pub fn unit_price(&self) -> Money {
        Money::from_cents(self.unit_price_cents)
    }

    #[inline]
    pub fn line_total(&self) -> Money {
        Money::from_cents(self.total_cents)
    }
}

// =============================================================================
// Purchase
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Purchase {
    pub id: String,
    pub invoice_number: String,
    pub supplier_id: Option<String>,
    pub user_id: String,
    pub total_amount_cents: i64,
    pub discount_cents: i64,
    pub tax_cents: i64,
    pub net_amount_cents: i64,
    /// ISO code the supplier invoiced in.
    pub currency: String,
    pub exchange_rate: f64,
    pub status: TransactionStatus,
    pub notes: Option<String>,
    #[ts(as = "String")]
    pub purchase_date: DateTime<Utc>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct PurchaseItem {
    pub id: String,
    pub purchase_id: String,
    pub product_id: String,
    pub quantity: i64,
    pub unit_price_cents: i64,
    pub total_cents: i64,
    pub position: i64,
}

// =============================================================================
// Return
// =============================================================================

/// A (partial) return against one sale item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Return {
    pub id: String,
    pub sale_id: String,
    pub sale_item_id: String,
    pub product_id: String,
    pub quantity: i64,
    /// `original unit price × quantity`.
    pub amount_cents: i64,
    pub reason: String,
    pub status: TransactionStatus,
    pub user_id: String,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl Return {
    #[inline]
    pub fn amount(&self) -> Money {
        Money::from_cents(self.amount_cents)
    }
}

// =============================================================================
// Inventory History
// =============================================================================

/// What caused a stock movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InventoryAction {
    InitialStock,
    Sale,
    SaleEdit,
    SaleCancelled,
    Purchase,
    Return,
    QuantityAdjustment,
}

impl InventoryAction {
    pub const fn as_str(&self) -> &'static str {
        match self {
            InventoryAction::InitialStock => "INITIAL_STOCK",
            InventoryAction::Sale => "SALE",
            InventoryAction::SaleEdit => "SALE_EDIT",
            InventoryAction::SaleCancelled => "SALE_CANCELLED",
            InventoryAction::Purchase => "PURCHASE",
            InventoryAction::Return => "RETURN",
            InventoryAction::QuantityAdjustment => "QUANTITY_ADJUSTMENT",
        }
    }
}

impl fmt::Display for InventoryAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One row of the append-only stock audit trail.
///
/// `quantity_change == new_quantity - previous_quantity`, and the running sum
/// of `quantity_change` for a product equals its current quantity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct InventoryHistory {
    pub id: String,
    pub product_id: String,
    pub action: InventoryAction,
    pub previous_quantity: i64,
    pub new_quantity: i64,
    pub quantity_change: i64,
    /// Id of the sale, purchase or adjustment that caused the change.
    pub reference_id: Option<String>,
    pub reason: Option<String>,
    pub user_id: String,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Employee & Payroll
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SalaryType {
    Monthly,
    Weekly,
    Daily,
    Bonus,
    Overtime,
}

impl SalaryType {
    pub const fn as_str(&self) -> &'static str {
        match self {
            SalaryType::Monthly => "MONTHLY",
            SalaryType::Weekly => "WEEKLY",
            SalaryType::Daily => "DAILY",
            SalaryType::Bonus => "BONUS",
            SalaryType::Overtime => "OVERTIME",
        }
    }
}

impl fmt::Display for SalaryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An employee with a running pay-period balance.
///
/// `remaining_salary_cents == None` means the balance has never been drawn
/// on and is implicitly the full salary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Employee {
    pub id: String,
    pub name: String,
    pub position: Option<String>,
    /// Nominal salary per pay period.
    pub salary_cents: i64,
    pub remaining_salary_cents: Option<i64>,
    #[ts(as = "Option<String>")]
    pub last_payment_date: Option<DateTime<Utc>>,
    pub is_active: bool,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Employee {
    #[inline]
    pub fn salary(&self) -> Money {
        Money::from_cents(self.salary_cents)
    }

    /// Stored balance, or the full salary when unset.
    #[inline]
    pub fn remaining_salary(&self) -> Money {
        Money::from_cents(self.remaining_salary_cents.unwrap_or(self.salary_cents))
    }
}

// =============================================================================
// Cash Transaction
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CashTransactionType {
    Receipt,
    Payment,
    Salary,
    Expense,
    Transfer,
}

impl CashTransactionType {
    pub const fn as_str(&self) -> &'static str {
        match self {
            CashTransactionType::Receipt => "RECEIPT",
            CashTransactionType::Payment => "PAYMENT",
            CashTransactionType::Salary => "SALARY",
            CashTransactionType::Expense => "EXPENSE",
            CashTransactionType::Transfer => "TRANSFER",
        }
    }
}

impl fmt::Display for CashTransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A monetary movement independent of stock.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct CashTransaction {
    pub id: String,
    pub transaction_type: CashTransactionType,
    /// Always positive; the type carries the direction.
    pub amount_cents: i64,
    pub currency: String,
    pub exchange_rate: f64,
    pub description: Option<String>,
    pub employee_id: Option<String>,
    pub expense_category_id: Option<String>,
    pub reference_id: Option<String>,
    pub status: TransactionStatus,
    pub user_id: String,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl CashTransaction {
    #[inline]
    pub fn amount(&self) -> Money {
        Money::from_cents(self.amount_cents)
    }
}

// =============================================================================
// Read Models
// =============================================================================

/// A sale item with its return progress.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SaleLine {
    pub item: SaleItem,
    /// Sum of completed returns on this item.
    pub returned_quantity: i64,
    /// `item.quantity - returned_quantity`.
    pub returnable_quantity: i64,
}

/// Sale header with items and returns, as shown on the sale detail page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SaleRecord {
    pub sale: Sale,
    pub items: Vec<SaleLine>,
    pub returns: Vec<Return>,
}

impl SaleRecord {
    /// Sum of completed return amounts.
    pub fn returned_amount(&self) -> Money {
        self.returns
            .iter()
            .filter(|r| r.status == TransactionStatus::Completed)
            .map(Return::amount)
            .sum()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PurchaseRecord {
    pub purchase: Purchase,
    pub items: Vec<PurchaseItem>,
}

/// Result of replaying a product's history against its stored quantity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct StockCheck {
    pub stored_quantity: i64,
    pub replayed_quantity: i64,
    pub history_entries: i64,
}

impl StockCheck {
    #[inline]
    pub fn is_consistent(&self) -> bool {
        self.stored_quantity == self.replayed_quantity
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
