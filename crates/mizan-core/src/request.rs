//! # Request Types
//!
//! Inbound shapes handed to the ledger by request handlers. Amounts are
//! minor units; the acting user id travels separately on every ledger call.
//!
//! Each request has a `validate()` for field-level checks that need no
//! state. Line items of sales and purchases are validated by the
//! [`TransactionBuilder`](crate::builder::TransactionBuilder) instead, since
//! it reports per-line paths alongside stock checks.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{CashTransactionType, PaymentMethod, SalaryType, TransactionStatus};
use crate::validation::{
    validate_currency, validate_exchange_rate, validate_id, validate_non_negative,
    validate_positive, validate_sku, validate_text, ValidationResult,
};

/// Currency recorded when the caller gives none.
pub const DEFAULT_CURRENCY: &str = "USD";

// =============================================================================
// Sales & Purchases
// =============================================================================

/// One requested line: `{productId, quantity, unitPrice}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineInput {
    pub product_id: String,
    pub quantity: i64,
    pub unit_price_cents: i64,
}

impl LineInput {
    pub fn new(product_id: impl Into<String>, quantity: i64, unit_price_cents: i64) -> Self {
        Self {
            product_id: product_id.into(),
            quantity,
            unit_price_cents,
        }
    }
}

/// Line items plus header-level discount and tax.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TransactionRequest {
    pub items: Vec<LineInput>,
    #[serde(default)]
    pub discount_cents: i64,
    #[serde(default)]
    pub tax_cents: i64,
}

impl TransactionRequest {
    pub fn new(items: Vec<LineInput>) -> Self {
        Self {
            items,
            discount_cents: 0,
            tax_cents: 0,
        }
    }

    pub fn with_discount(mut self, cents: i64) -> Self {
        self.discount_cents = cents;
        self
    }

    pub fn with_tax(mut self, cents: i64) -> Self {
        self.tax_cents = cents;
        self
    }
}

/// Create or edit a sale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaleRequest {
    pub transaction: TransactionRequest,
    #[serde(default)]
    pub customer_id: Option<String>,
    #[serde(default)]
    pub payment_method: PaymentMethod,
    #[serde(default)]
    pub notes: Option<String>,
}

impl SaleRequest {
    pub fn new(transaction: TransactionRequest) -> Self {
        Self {
            transaction,
            customer_id: None,
            payment_method: PaymentMethod::Cash,
            notes: None,
        }
    }

    pub fn with_customer(mut self, customer_id: impl Into<String>) -> Self {
        self.customer_id = Some(customer_id.into());
        self
    }

    pub fn with_payment_method(mut self, method: PaymentMethod) -> Self {
        self.payment_method = method;
        self
    }

    pub fn validate(&self) -> ValidationResult<()> {
        if let Some(customer_id) = &self.customer_id {
            validate_id("customer_id", customer_id)?;
        }
        Ok(())
    }
}

/// Create or edit a purchase.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PurchaseRequest {
    pub transaction: TransactionRequest,
    #[serde(default)]
    pub supplier_id: Option<String>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub exchange_rate: Option<f64>,
    /// Defaults to the time of recording.
    #[serde(default)]
    pub purchase_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl PurchaseRequest {
    pub fn new(transaction: TransactionRequest) -> Self {
        Self {
            transaction,
            supplier_id: None,
            currency: None,
            exchange_rate: None,
            purchase_date: None,
            notes: None,
        }
    }

    pub fn with_supplier(mut self, supplier_id: impl Into<String>) -> Self {
        self.supplier_id = Some(supplier_id.into());
        self
    }

    pub fn with_currency(mut self, currency: impl Into<String>, exchange_rate: f64) -> Self {
        self.currency = Some(currency.into());
        self.exchange_rate = Some(exchange_rate);
        self
    }

    pub fn currency(&self) -> &str {
        self.currency.as_deref().unwrap_or(DEFAULT_CURRENCY)
    }

    pub fn exchange_rate(&self) -> f64 {
        self.exchange_rate.unwrap_or(1.0)
    }

    pub fn validate(&self) -> ValidationResult<()> {
        if let Some(supplier_id) = &self.supplier_id {
            validate_id("supplier_id", supplier_id)?;
        }
        validate_currency(self.currency())?;
        validate_exchange_rate(self.exchange_rate())
    }
}

// =============================================================================
// Returns
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReturnLineInput {
    pub sale_item_id: String,
    pub quantity: i64,
}

impl ReturnLineInput {
    pub fn new(sale_item_id: impl Into<String>, quantity: i64) -> Self {
        Self {
            sale_item_id: sale_item_id.into(),
            quantity,
        }
    }
}

/// Return part of a sale: `saleId, reason, [{saleItemId, quantity}]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReturnRequest {
    pub sale_id: String,
    pub reason: String,
    pub items: Vec<ReturnLineInput>,
}

impl ReturnRequest {
    pub fn new(
        sale_id: impl Into<String>,
        reason: impl Into<String>,
        items: Vec<ReturnLineInput>,
    ) -> Self {
        Self {
            sale_id: sale_id.into(),
            reason: reason.into(),
            items,
        }
    }

    /// Empty list and non-positive quantities are rejected before any read.
    pub fn validate(&self) -> ValidationResult<()> {
        validate_id("sale_id", &self.sale_id)?;
        validate_text("reason", &self.reason, 500)?;

        if self.items.is_empty() {
            return Err(crate::ValidationError::Required {
                field: "items".to_string(),
            });
        }

        for (i, line) in self.items.iter().enumerate() {
            validate_id(&format!("items[{i}].sale_item_id"), &line.sale_item_id)?;
            validate_positive(&format!("items[{i}].quantity"), line.quantity)?;
        }

        Ok(())
    }
}

// =============================================================================
// Products
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewProduct {
    pub sku: String,
    #[serde(default)]
    pub barcode: Option<String>,
    pub name: String,
    /// Opening stock, recorded as INITIAL_STOCK when non-zero.
    #[serde(default)]
    pub quantity: i64,
    #[serde(default)]
    pub min_quantity: Option<i64>,
    pub cost_price_cents: i64,
    pub selling_price_cents: i64,
}

impl NewProduct {
    pub fn new(
        sku: impl Into<String>,
        name: impl Into<String>,
        quantity: i64,
        cost_price_cents: i64,
        selling_price_cents: i64,
    ) -> Self {
        Self {
            sku: sku.into(),
            barcode: None,
            name: name.into(),
            quantity,
            min_quantity: None,
            cost_price_cents,
            selling_price_cents,
        }
    }

    pub fn with_barcode(mut self, barcode: impl Into<String>) -> Self {
        self.barcode = Some(barcode.into());
        self
    }

    pub fn with_min_quantity(mut self, min_quantity: i64) -> Self {
        self.min_quantity = Some(min_quantity);
        self
    }

    pub fn validate(&self) -> ValidationResult<()> {
        validate_sku(&self.sku)?;
        validate_text("name", &self.name, 200)?;
        if let Some(barcode) = &self.barcode {
            validate_text("barcode", barcode, 64)?;
        }
        validate_non_negative("quantity", self.quantity)?;
        if let Some(min) = self.min_quantity {
            validate_non_negative("min_quantity", min)?;
        }
        validate_positive("cost_price_cents", self.cost_price_cents)?;
        validate_positive("selling_price_cents", self.selling_price_cents)
    }
}

// =============================================================================
// Employees & Payroll
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewEmployee {
    pub name: String,
    #[serde(default)]
    pub position: Option<String>,
    pub salary_cents: i64,
}

impl NewEmployee {
    pub fn new(name: impl Into<String>, salary_cents: i64) -> Self {
        Self {
            name: name.into(),
            position: None,
            salary_cents,
        }
    }

    pub fn validate(&self) -> ValidationResult<()> {
        validate_text("name", &self.name, 200)?;
        validate_non_negative("salary_cents", self.salary_cents)
    }
}

/// Salary or advance paid out of an employee's remaining balance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SalaryPayment {
    pub employee_id: String,
    pub amount_cents: i64,
    pub salary_type: SalaryType,
    /// Free text naming the period, e.g. `2024-05`.
    pub salary_period: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub exchange_rate: Option<f64>,
    #[serde(default)]
    pub reference_id: Option<String>,
}

impl SalaryPayment {
    pub fn new(employee_id: impl Into<String>, amount_cents: i64, salary_type: SalaryType) -> Self {
        Self {
            employee_id: employee_id.into(),
            amount_cents,
            salary_type,
            salary_period: String::new(),
            description: String::new(),
            currency: None,
            exchange_rate: None,
            reference_id: None,
        }
    }

    pub fn with_period(mut self, period: impl Into<String>) -> Self {
        self.salary_period = period.into();
        self
    }

    pub fn currency(&self) -> &str {
        self.currency.as_deref().unwrap_or(DEFAULT_CURRENCY)
    }

    pub fn exchange_rate(&self) -> f64 {
        self.exchange_rate.unwrap_or(1.0)
    }

    pub fn validate(&self) -> ValidationResult<()> {
        validate_id("employee_id", &self.employee_id)?;
        validate_positive("amount_cents", self.amount_cents)?;
        validate_currency(self.currency())?;
        validate_exchange_rate(self.exchange_rate())
    }
}

// =============================================================================
// Cash Transactions
// =============================================================================

/// Fields of a cash transaction, used both to record and to edit one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CashTransactionInput {
    pub transaction_type: CashTransactionType,
    pub amount_cents: i64,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub exchange_rate: Option<f64>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub employee_id: Option<String>,
    #[serde(default)]
    pub expense_category_id: Option<String>,
    #[serde(default)]
    pub reference_id: Option<String>,
    #[serde(default)]
    pub status: TransactionStatus,
}

impl CashTransactionInput {
    pub fn new(transaction_type: CashTransactionType, amount_cents: i64) -> Self {
        Self {
            transaction_type,
            amount_cents,
            currency: None,
            exchange_rate: None,
            description: None,
            employee_id: None,
            expense_category_id: None,
            reference_id: None,
            status: TransactionStatus::Completed,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_employee(mut self, employee_id: impl Into<String>) -> Self {
        self.employee_id = Some(employee_id.into());
        self
    }

    pub fn with_expense_category(mut self, category_id: impl Into<String>) -> Self {
        self.expense_category_id = Some(category_id.into());
        self
    }

    pub fn currency(&self) -> &str {
        self.currency.as_deref().unwrap_or(DEFAULT_CURRENCY)
    }

    pub fn exchange_rate(&self) -> f64 {
        self.exchange_rate.unwrap_or(1.0)
    }

    pub fn validate(&self) -> ValidationResult<()> {
        validate_positive("amount_cents", self.amount_cents)?;
        validate_currency(self.currency())?;
        validate_exchange_rate(self.exchange_rate())?;
        if let Some(employee_id) = &self.employee_id {
            validate_id("employee_id", employee_id)?;
        }
        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ValidationError;

    #[test]
    fn test_return_request_rejects_empty_and_non_positive() {
        let empty = ReturnRequest::new("s1", "damaged", vec![]);
        assert_eq!(
            empty.validate(),
            Err(ValidationError::Required {
                field: "items".to_string()
            })
        );

        let zero = ReturnRequest::new("s1", "damaged", vec![ReturnLineInput::new("i1", 0)]);
        assert_eq!(zero.validate().unwrap_err().field(), "items[0].quantity");

        let ok = ReturnRequest::new("s1", "damaged", vec![ReturnLineInput::new("i1", 2)]);
        assert!(ok.validate().is_ok());
    }

    #[test]
    fn test_purchase_defaults() {
        let purchase = PurchaseRequest::new(TransactionRequest::default());
        assert_eq!(purchase.currency(), "USD");
        assert_eq!(purchase.exchange_rate(), 1.0);
        assert!(purchase.validate().is_ok());

        let bad = purchase.with_currency("IQD", 0.0);
        assert_eq!(bad.validate().unwrap_err().field(), "exchange_rate");
    }

    #[test]
    fn test_new_product_validation() {
        assert!(NewProduct::new("P-1", "Pen", 10, 50, 80).validate().is_ok());
        assert_eq!(
            NewProduct::new("P-1", "Pen", -1, 50, 80)
                .validate()
                .unwrap_err()
                .field(),
            "quantity"
        );
        assert_eq!(
            NewProduct::new("P-1", "Pen", 0, 0, 80)
                .validate()
                .unwrap_err()
                .field(),
            "cost_price_cents"
        );
    }

    #[test]
    fn test_cash_input_requires_positive_amount() {
        let input = CashTransactionInput::new(CashTransactionType::Expense, 0);
        assert_eq!(input.validate().unwrap_err().field(), "amount_cents");
    }

    #[test]
    fn test_sale_request_deserializes_with_defaults() {
        let json = r#"{"transaction":{"items":[{"product_id":"p1","quantity":2,"unit_price_cents":150}]}}"#;
        let request: SaleRequest = serde_json::from_str(json).unwrap();
        assert_eq!(request.payment_method, PaymentMethod::Cash);
        assert_eq!(request.transaction.discount_cents, 0);
        assert_eq!(request.transaction.items[0].quantity, 2);
    }
}
