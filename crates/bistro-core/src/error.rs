//! # Error Types
//!
//! Domain-specific error types for bistro-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  bistro-core errors (this file)                                        │
//! │  ├── CoreError        - Business rule violations                       │
//! │  ├── AccessError      - Missing session / role not permitted           │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  bistro-db errors                                                      │
//! │  └── DbError          - Persistence failures (may wrap CoreError)      │
//! │                                                                         │
//! │  bistro-api errors                                                     │
//! │  └── ApiError         - HTTP status + {"error": "..."} body            │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → DbError → ApiError → Client       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

use crate::access::Permission;
use crate::money::Money;
use crate::types::{OrderStatus, Role};

// =============================================================================
// Core Error
// =============================================================================

/// Business rule violations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Product id unknown, or the product was soft-deleted.
    #[error("Product not found: {0}")]
    ProductNotFound(String),

    /// Order (sale) id unknown.
    #[error("Order not found: {0}")]
    OrderNotFound(String),

    /// Customer id unknown.
    #[error("Customer not found: {0}")]
    CustomerNotFound(String),

    /// An order must carry at least one line item.
    #[error("Order must have at least one item")]
    EmptyOrder,

    /// Order exceeds the maximum number of line items.
    #[error("Order cannot have more than {max} items")]
    OrderTooLarge { max: usize },

    /// Not enough stock under the floor-checked stock policy.
    ///
    /// ## When This Occurs
    /// ```text
    /// POST /orders  { Paneer Tikka × 5 }
    ///      │
    ///      ▼
    /// UPDATE products SET stock = stock - 5 WHERE id = ? AND stock >= 5
    ///      │  (0 rows: only 3 left)
    ///      ▼
    /// InsufficientStock { sku: "APP-001", available: 3, requested: 5 }
    ///      │
    ///      ▼
    /// Whole order rolled back, invoice number not consumed
    /// ```
    #[error("Insufficient stock for {sku}: available {available}, requested {requested}")]
    InsufficientStock {
        sku: String,
        available: i64,
        requested: i64,
    },

    /// The requested status change is not an edge of the order lifecycle.
    #[error("Cannot move order from {from} to {to}")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },

    /// Cash tendered does not cover the bill.
    #[error("Insufficient payment: total {total}, received {received}")]
    InsufficientPayment { total: Money, received: Money },

    /// Authorization failure (wraps AccessError).
    #[error(transparent)]
    Access(#[from] AccessError),

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Access Error
// =============================================================================

/// Authorization failures raised by [`crate::access::authorize`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AccessError {
    /// No session was presented.
    #[error("Unauthorized")]
    Unauthenticated,

    /// Session exists but its role does not grant the permission.
    #[error("Forbidden: {role} may not {permission}")]
    Forbidden { role: Role, permission: Permission },
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// Raised before any mutation so a rejected request never leaves partial
/// state behind.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Invalid format (e.g., invalid UUID, invalid email).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Value is not in allowed set.
    #[error("{field} must be one of: {allowed:?}")]
    NotAllowed { field: String, allowed: Vec<String> },

    /// A client-supplied figure disagrees with the server computation.
    #[error("{field} mismatch: expected {expected}, got {actual}")]
    Mismatch {
        field: String,
        expected: i64,
        actual: i64,
    },
}

impl ValidationError {
    /// Shorthand for [`ValidationError::Required`].
    pub fn required(field: impl Into<String>) -> Self {
        ValidationError::Required {
            field: field.into(),
        }
    }
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CoreError::InsufficientStock {
            sku: "APP-001".to_string(),
            available: 3,
            requested: 5,
        };
        assert_eq!(
            err.to_string(),
            "Insufficient stock for APP-001: available 3, requested 5"
        );

        let err = CoreError::InvalidTransition {
            from: OrderStatus::Pending,
            to: OrderStatus::Served,
        };
        assert_eq!(err.to_string(), "Cannot move order from PENDING to SERVED");
    }

    #[test]
    fn test_insufficient_payment_message() {
        let err = CoreError::InsufficientPayment {
            total: Money::from_cents(26250),
            received: Money::from_cents(20000),
        };
        assert_eq!(
            err.to_string(),
            "Insufficient payment: total 262.50, received 200.00"
        );
    }

    #[test]
    fn test_access_converts_to_core_error() {
        let core_err: CoreError = AccessError::Unauthenticated.into();
        assert!(matches!(core_err, CoreError::Access(AccessError::Unauthenticated)));
        assert_eq!(core_err.to_string(), "Unauthorized");
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let core_err: CoreError = ValidationError::required("sku").into();
        assert!(matches!(core_err, CoreError::Validation(_)));
        assert_eq!(core_err.to_string(), "Validation error: sku is required");
    }
}
