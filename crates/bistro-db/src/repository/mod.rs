//! # Repository Module
//!
//! Database repository implementations for Bistro POS.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Repository Pattern                                   │
//! │                                                                         │
//! │  Route handler                                                         │
//! │       │                                                                 │
//! │       │  db.sales().create_order(&session.user_id, order)              │
//! │       ▼                                                                 │
//! │  SaleRepository                                                        │
//! │  ├── create_order / create_sale   (one transaction each)              │
//! │  ├── transition_status            (guarded UPDATE)                    │
//! │  ├── settle_bill                  (one transaction)                   │
//! │  └── list / get / kitchen_queue                                       │
//! │       │                                                                 │
//! │       │  SQL                                                            │
//! │       ▼                                                                 │
//! │  SQLite Database                                                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`product::ProductRepository`] - Menu items, stock ledger
//! - [`category::CategoryRepository`] - Menu categories
//! - [`customer::CustomerRepository`] - Customers and loyalty balance
//! - [`supplier::SupplierRepository`] - Suppliers
//! - [`sale::SaleRepository`] - Orders, direct sales, billing
//! - [`expense::ExpenseRepository`] - Operating expenses
//! - [`user::UserRepository`] - Staff accounts and password checks
//! - [`report::ReportRepository`] - Sales, inventory and profit aggregates

use chrono::{DateTime, Utc};

pub mod category;
pub mod customer;
pub mod expense;
pub mod product;
pub mod report;
pub mod sale;
pub mod supplier;
pub mod user;

/// Optional inclusive time window used by list and report queries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DateRange {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

impl DateRange {
    pub fn new(start: Option<DateTime<Utc>>, end: Option<DateTime<Utc>>) -> Self {
        DateRange { start, end }
    }

    /// Everything, no bounds.
    pub fn all() -> Self {
        DateRange::default()
    }
}

/// Generates a new entity ID (UUID v4).
pub fn generate_id() -> String {
    uuid::Uuid::new_v4().to_string()
}
