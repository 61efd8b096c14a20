//! # bistro-core: Pure Business Logic for Bistro POS
//!
//! Everything that decides *whether* something may happen lives here:
//! which role may move an order to which state, how totals and change are
//! computed, how invoice numbers look. Persistence and HTTP live elsewhere.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Bistro POS Architecture                           │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │              Front end (POS, kitchen display, reports)          │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ JSON over HTTP                         │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                  bistro-api (axum routes)                       │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ bistro-core (THIS CRATE) ★                      │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐ ┌───────────┐ ┌───────────┐ ┌───────────┐      │   │
//! │  │   │ lifecycle │ │  access   │ │  pricing  │ │  invoice  │      │   │
//! │  │   │ OrderStat │ │ Role      │ │ Totals    │ │INV-000001 │      │   │
//! │  │   │ edges     │ │ Permission│ │ Change    │ │ sequence  │      │   │
//! │  │   └───────────┘ └───────────┘ └───────────┘ └───────────┘      │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                bistro-db (SQLite, transactions)                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain records (Product, Sale, Customer, ...) and enums
//! - [`money`] - Integer minor-unit money type
//! - [`lifecycle`] - Order status transitions and who may trigger them
//! - [`access`] - Role → permission matrix and the authorization gate
//! - [`invoice`] - Invoice number formatting and parsing
//! - [`pricing`] - Line totals, order totals, cash settlement, loyalty
//! - [`validation`] - Input validation
//! - [`error`] - Domain error types
//!
//! ## Example Usage
//!
//! ```rust
//! use bistro_core::lifecycle::ensure_transition;
//! use bistro_core::{OrderStatus, Role};
//!
//! // The kitchen may start a pending order...
//! assert!(ensure_transition(OrderStatus::Pending, OrderStatus::Preparing, Role::Chef).is_ok());
//!
//! // ...but nobody may skip straight to SERVED.
//! assert!(ensure_transition(OrderStatus::Pending, OrderStatus::Served, Role::Admin).is_err());
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod access;
pub mod error;
pub mod invoice;
pub mod lifecycle;
pub mod money;
pub mod pricing;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use access::{authorize, Permission, Session};
pub use error::{AccessError, CoreError, CoreResult, ValidationError};
pub use money::Money;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum distinct line items on a single order.
///
/// Guards against runaway payloads; a busy table rarely exceeds 30 lines.
pub const MAX_ORDER_ITEMS: usize = 100;

/// Maximum quantity of a single line item.
pub const MAX_ITEM_QUANTITY: i64 = 999;

/// Largest single money amount accepted from a client (100,000,000.00).
///
/// Keeps every derived total far inside `i64`.
pub const MAX_AMOUNT_CENTS: i64 = 10_000_000_000;

/// Largest stock level, threshold or single adjustment, in either direction.
pub const MAX_STOCK_LEVEL: i64 = 1_000_000;

/// Low-stock threshold applied when a product is created without one.
pub const DEFAULT_MIN_STOCK: i64 = 10;
