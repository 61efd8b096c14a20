//! # Domain Types
//!
//! Core domain types used throughout Bistro POS.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Product      │   │   Sale/Order    │   │    SaleItem     │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id (UUID)      │   │  id (UUID)      │   │  sale_id (FK)   │       │
//! │  │  sku (business) │   │  invoice_number │   │  product_name   │       │
//! │  │  stock          │   │  status         │   │  unit_price     │       │
//! │  │  min_stock      │   │  table_number   │   │  (snapshots)    │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │  OrderStatus    │   │ PaymentMethod   │   │      Role       │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  Pending        │   │  Cash  Card     │   │  Admin  Manager │       │
//! │  │  Preparing      │   │  Upi   Mobile   │   │  Waiter Chef    │       │
//! │  │  Ready Served   │   │  Other Pending  │   │  Cashier        │       │
//! │  │  Completed      │   └─────────────────┘   └─────────────────┘       │
//! │  └─────────────────┘                                                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Wire and Storage Names
//! Enums travel as `SCREAMING_SNAKE_CASE` in JSON (`"PREPARING"`) and are
//! stored lowercase in SQLite (`'preparing'`). Record fields are camelCase
//! on the wire.
//!
//! ## Orders and Sales
//! An order and a sale are the same row. "Order" is the pre-payment view
//! (PENDING through SERVED); "sale" is the same row once COMPLETED.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::ValidationError;
use crate::money::Money;

// =============================================================================
// Role
// =============================================================================

/// Staff role. Decides which permissions a session carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Admin,
    Manager,
    Waiter,
    Chef,
    Cashier,
}

impl Role {
    pub const ALL: [Role; 5] = [
        Role::Admin,
        Role::Manager,
        Role::Waiter,
        Role::Chef,
        Role::Cashier,
    ];

    pub const fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "ADMIN",
            Role::Manager => "MANAGER",
            Role::Waiter => "WAITER",
            Role::Chef => "CHEF",
            Role::Cashier => "CASHIER",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Role::ALL
            .into_iter()
            .find(|r| r.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| ValidationError::NotAllowed {
                field: "role".to_string(),
                allowed: Role::ALL.iter().map(|r| r.as_str().to_string()).collect(),
            })
    }
}

// =============================================================================
// Order Status
// =============================================================================

/// Lifecycle state of an order. Transitions live in [`crate::lifecycle`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    /// Created, waiting for the kitchen.
    Pending,
    /// Kitchen is cooking.
    Preparing,
    /// Ready at the pass.
    Ready,
    /// Delivered to the table, awaiting the bill.
    Served,
    /// Paid. Terminal.
    Completed,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 5] = [
        OrderStatus::Pending,
        OrderStatus::Preparing,
        OrderStatus::Ready,
        OrderStatus::Served,
        OrderStatus::Completed,
    ];

    pub const fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "PENDING",
            OrderStatus::Preparing => "PREPARING",
            OrderStatus::Ready => "READY",
            OrderStatus::Served => "SERVED",
            OrderStatus::Completed => "COMPLETED",
        }
    }

    /// Statuses shown on the kitchen display.
    #[inline]
    pub const fn is_kitchen_visible(&self) -> bool {
        matches!(
            self,
            OrderStatus::Pending | OrderStatus::Preparing | OrderStatus::Ready
        )
    }

    /// Statuses from which a bill may be settled.
    #[inline]
    pub const fn is_billable(&self) -> bool {
        matches!(self, OrderStatus::Ready | OrderStatus::Served)
    }
}

impl Default for OrderStatus {
    fn default() -> Self {
        OrderStatus::Pending
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OrderStatus::ALL
            .into_iter()
            .find(|st| st.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| ValidationError::NotAllowed {
                field: "status".to_string(),
                allowed: OrderStatus::ALL
                    .iter()
                    .map(|st| st.as_str().to_string())
                    .collect(),
            })
    }
}

// =============================================================================
// Payment Method
// =============================================================================

/// How a sale was (or will be) paid.
///
/// `Pending` marks an order that has not been billed yet; it is never an
/// accepted method when settling a bill.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentMethod {
    Cash,
    Card,
    Upi,
    Mobile,
    Other,
    Pending,
}

impl PaymentMethod {
    pub const fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Cash => "CASH",
            PaymentMethod::Card => "CARD",
            PaymentMethod::Upi => "UPI",
            PaymentMethod::Mobile => "MOBILE",
            PaymentMethod::Other => "OTHER",
            PaymentMethod::Pending => "PENDING",
        }
    }

    /// Whether this method may settle a bill.
    #[inline]
    pub const fn is_settlement(&self) -> bool {
        !matches!(self, PaymentMethod::Pending)
    }
}

impl Default for PaymentMethod {
    fn default() -> Self {
        PaymentMethod::Pending
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Expense Category
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExpenseCategory {
    Rent,
    Utilities,
    Salaries,
    Supplies,
    Marketing,
    Maintenance,
    Other,
}

impl ExpenseCategory {
    pub const ALL: [ExpenseCategory; 7] = [
        ExpenseCategory::Rent,
        ExpenseCategory::Utilities,
        ExpenseCategory::Salaries,
        ExpenseCategory::Supplies,
        ExpenseCategory::Marketing,
        ExpenseCategory::Maintenance,
        ExpenseCategory::Other,
    ];

    pub const fn as_str(&self) -> &'static str {
        match self {
            ExpenseCategory::Rent => "RENT",
            ExpenseCategory::Utilities => "UTILITIES",
            ExpenseCategory::Salaries => "SALARIES",
            ExpenseCategory::Supplies => "SUPPLIES",
            ExpenseCategory::Marketing => "MARKETING",
            ExpenseCategory::Maintenance => "MAINTENANCE",
            ExpenseCategory::Other => "OTHER",
        }
    }
}

impl fmt::Display for ExpenseCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExpenseCategory {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ExpenseCategory::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| ValidationError::NotAllowed {
                field: "category".to_string(),
                allowed: ExpenseCategory::ALL
                    .iter()
                    .map(|c| c.as_str().to_string())
                    .collect(),
            })
    }
}

// =============================================================================
// Stock Policy
// =============================================================================

/// What to do when an order asks for more than is on hand.
///
/// ```text
/// RejectInsufficient:  stock 3, order 5  →  InsufficientStock, rollback
/// AllowNegative:       stock 3, order 5  →  stock -2 (backorder)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StockPolicy {
    RejectInsufficient,
    AllowNegative,
}

impl StockPolicy {
    /// Maps the `allow negative` config flag onto a policy.
    pub const fn from_allow_negative(allow: bool) -> Self {
        if allow {
            StockPolicy::AllowNegative
        } else {
            StockPolicy::RejectInsufficient
        }
    }
}

impl Default for StockPolicy {
    fn default() -> Self {
        StockPolicy::RejectInsufficient
    }
}

// =============================================================================
// Product
// =============================================================================

/// A menu item.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Display name on the menu and the bill.
    pub name: String,

    pub description: Option<String>,

    /// Stock Keeping Unit, unique business identifier.
    pub sku: String,

    pub barcode: Option<String>,

    /// Selling price in minor units.
    pub price_cents: i64,

    /// Cost in minor units, used for profit reports.
    pub cost_price_cents: i64,

    /// Units on hand. May be negative under [`StockPolicy::AllowNegative`].
    pub stock: i64,

    /// Low-stock threshold.
    pub min_stock: i64,

    pub category_id: String,

    pub image_url: Option<String>,

    /// Soft delete flag.
    pub is_active: bool,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,

    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Product {
    #[inline]
    pub fn price(&self) -> Money {
        Money::from_cents(self.price_cents)
    }

    #[inline]
    pub fn cost_price(&self) -> Money {
        Money::from_cents(self.cost_price_cents)
    }

    /// At or below the reorder threshold.
    #[inline]
    pub fn is_low_stock(&self) -> bool {
        self.stock <= self.min_stock
    }

    #[inline]
    pub fn is_out_of_stock(&self) -> bool {
        self.stock <= 0
    }
}

// =============================================================================
// Category
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

/// A category together with how many active products it holds.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct CategorySummary {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub product_count: i64,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Customer & Supplier
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Customer {
    pub id: String,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    /// One point per whole currency unit of completed sales.
    pub loyalty_points: i64,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Supplier {
    pub id: String,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub contact_person: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Sale
// =============================================================================

/// An order / sale row.
///
/// Money columns are always server-computed:
/// `total = subtotal - discount + tax`, `subtotal = Σ item.total`.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Sale {
    pub id: String,
    /// Human-readable number, `INV-000042`.
    pub invoice_number: String,
    /// Numeric part of the invoice number, unique.
    pub invoice_seq: i64,
    pub customer_id: Option<String>,
    pub customer_name: Option<String>,
    /// Staff member who created the order.
    pub user_id: String,
    pub table_number: Option<String>,
    pub subtotal_cents: i64,
    pub discount_cents: i64,
    pub tax_cents: i64,
    pub total_cents: i64,
    pub payment_method: PaymentMethod,
    pub status: OrderStatus,
    pub notes: Option<String>,
    /// Cash tendered, recorded at billing.
    pub received_cents: Option<i64>,
    /// Change returned, recorded at billing.
    pub change_cents: Option<i64>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
    #[ts(as = "Option<String>")]
    pub completed_at: Option<DateTime<Utc>>,
    /// Staff member who took payment. For a direct sale, the creator.
    pub settled_by: Option<String>,
}

impl Sale {
    #[inline]
    pub fn total(&self) -> Money {
        Money::from_cents(self.total_cents)
    }

    #[inline]
    pub fn subtotal(&self) -> Money {
        Money::from_cents(self.subtotal_cents)
    }

    /// The structured payment note, present once the bill is settled.
    pub fn payment_note(&self) -> Option<PaymentNote> {
        match (self.received_cents, self.change_cents) {
            (Some(received_cents), Some(change_cents)) => Some(PaymentNote {
                received_cents,
                change_cents,
            }),
            _ => None,
        }
    }
}

/// Cash handling recorded when a bill is settled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct PaymentNote {
    pub received_cents: i64,
    pub change_cents: i64,
}

// =============================================================================
// Sale Item
// =============================================================================

/// A line item. Name and unit price are frozen at order time.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct SaleItem {
    pub id: String,
    pub sale_id: String,
    pub product_id: String,
    /// Product name at time of sale (frozen).
    pub product_name: String,
    pub quantity: i64,
    /// Unit price at time of sale (frozen).
    pub unit_price_cents: i64,
    pub discount_cents: i64,
    /// `quantity × unit_price − discount`.
    pub total_cents: i64,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl SaleItem {
    #[inline]
    pub fn unit_price(&self) -> Money {
        Money::from_cents(self.unit_price_cents)
    }

    #[inline]
    pub fn total(&self) -> Money {
        Money::from_cents(self.total_cents)
    }
}

/// A sale with its line items, the shape returned by order endpoints.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct SaleDetail {
    #[serde(flatten)]
    pub sale: Sale,
    pub items: Vec<SaleItem>,
    pub payment_note: Option<PaymentNote>,
}

impl SaleDetail {
    pub fn new(sale: Sale, items: Vec<SaleItem>) -> Self {
        let payment_note = sale.payment_note();
        SaleDetail {
            sale,
            items,
            payment_note,
        }
    }
}

// =============================================================================
// Expense
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Expense {
    pub id: String,
    pub description: String,
    pub amount_cents: i64,
    pub category: ExpenseCategory,
    pub notes: Option<String>,
    #[ts(as = "String")]
    pub expense_date: DateTime<Utc>,
    /// Staff member who recorded it.
    pub user_id: String,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// User
// =============================================================================

/// A staff account.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub email: String,
    /// Argon2 PHC string. Never leaves the server.
    #[serde(skip)]
    pub password_hash: String,
    pub name: String,
    pub role: Role,
    pub is_active: bool,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_wire_names() {
        let json = serde_json::to_string(&OrderStatus::Preparing).unwrap();
        assert_eq!(json, "\"PREPARING\"");

        let parsed: OrderStatus = serde_json::from_str("\"SERVED\"").unwrap();
        assert_eq!(parsed, OrderStatus::Served);
    }

    #[test]
    fn test_status_from_str_is_case_insensitive() {
        assert_eq!("ready".parse::<OrderStatus>().unwrap(), OrderStatus::Ready);
        assert_eq!("READY".parse::<OrderStatus>().unwrap(), OrderStatus::Ready);
        assert!("CANCELLED".parse::<OrderStatus>().is_err());
    }

    #[test]
    fn test_billable_statuses() {
        let billable: Vec<_> = OrderStatus::ALL
            .into_iter()
            .filter(|s| s.is_billable())
            .collect();
        assert_eq!(billable, vec![OrderStatus::Ready, OrderStatus::Served]);
    }

    #[test]
    fn test_role_parse() {
        assert_eq!("chef".parse::<Role>().unwrap(), Role::Chef);
        assert!("owner".parse::<Role>().is_err());
    }

    #[test]
    fn test_pending_is_not_a_settlement_method() {
        assert!(!PaymentMethod::Pending.is_settlement());
        assert!(PaymentMethod::Upi.is_settlement());
    }

    #[test]
    fn test_stock_policy_default_rejects() {
        assert_eq!(StockPolicy::default(), StockPolicy::RejectInsufficient);
        assert_eq!(
            StockPolicy::from_allow_negative(true),
            StockPolicy::AllowNegative
        );
    }

    #[test]
    fn test_user_never_serializes_password_hash() {
        let user = User {
            id: "u1".to_string(),
            email: "chef@restaurant.com".to_string(),
            password_hash: "$argon2id$secret".to_string(),
            name: "Chef".to_string(),
            role: Role::Chef,
            is_active: true,
            created_at: Utc::now(),
        };
        let json = serde_json::to_string(&user).unwrap();
        assert!(!json.contains("argon2"));
        assert!(json.contains("\"role\":\"CHEF\""));
        assert!(json.contains("\"isActive\":true"));
    }

    #[test]
    fn test_sale_detail_flattens_sale_fields() {
        let now = Utc::now();
        let sale = Sale {
            id: "s1".to_string(),
            invoice_number: "INV-000001".to_string(),
            invoice_seq: 1,
            customer_id: None,
            customer_name: None,
            user_id: "u1".to_string(),
            table_number: Some("T4".to_string()),
            subtotal_cents: 25000,
            discount_cents: 0,
            tax_cents: 1250,
            total_cents: 26250,
            payment_method: PaymentMethod::Cash,
            status: OrderStatus::Completed,
            notes: None,
            received_cents: Some(30000),
            change_cents: Some(3750),
            created_at: now,
            updated_at: now,
            completed_at: Some(now),
            settled_by: Some("u2".to_string()),
        };
        let detail = SaleDetail::new(sale, vec![]);
        let value = serde_json::to_value(&detail).unwrap();

        assert_eq!(value["invoiceNumber"], "INV-000001");
        assert_eq!(value["tableNumber"], "T4");
        assert_eq!(value["paymentNote"]["changeCents"], 3750);
        assert_eq!(value["settledBy"], "u2");
    }
}
