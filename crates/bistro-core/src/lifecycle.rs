//! # Order Lifecycle
//!
//! Which status changes are legal and which permission each one needs.
//!
//! ```text
//!            CreateOrder        StartPreparation     FinishPreparation
//!   (new) ──────────────▶ PENDING ─────────────▶ PREPARING ─────────────▶ READY
//!                                                                          │
//!                                                            ServeOrder    │
//!                                                   SERVED ◀───────────────┤
//!                                                      │                   │
//!                                          SettleBill  │       SettleBill  │
//!                                                      ▼                   │
//!   (new) ──────────────────────────────────────▶ COMPLETED ◀──────────────┘
//!            Checkout (direct POS sale)
//! ```
//!
//! Strictly forward. There is no cancellation and no way back.
//! COMPLETED is reached only through billing or a direct sale, never via
//! the status endpoint.

use crate::access::Permission;
use crate::error::{AccessError, CoreError, CoreResult};
use crate::types::{OrderStatus, Role};

/// The permission required for `from → to`, or `None` if the edge does not
/// exist.
pub fn required_permission(from: OrderStatus, to: OrderStatus) -> Option<Permission> {
    use OrderStatus::*;

    match (from, to) {
        (Pending, Preparing) => Some(Permission::StartPreparation),
        (Preparing, Ready) => Some(Permission::FinishPreparation),
        (Ready, Served) => Some(Permission::ServeOrder),
        (Ready, Completed) | (Served, Completed) => Some(Permission::SettleBill),
        _ => None,
    }
}

/// Validates an edge for `role`.
///
/// Illegal edges fail with `InvalidTransition` regardless of role; a legal
/// edge the role may not take fails with `Forbidden`.
pub fn ensure_transition(from: OrderStatus, to: OrderStatus, role: Role) -> CoreResult<()> {
    let permission =
        required_permission(from, to).ok_or(CoreError::InvalidTransition { from, to })?;

    if !role.can(permission) {
        return Err(AccessError::Forbidden { role, permission }.into());
    }

    Ok(())
}

/// Like [`ensure_transition`], for the status endpoint, which never
/// completes an order.
pub fn ensure_status_update(from: OrderStatus, to: OrderStatus, role: Role) -> CoreResult<()> {
    if to == OrderStatus::Completed {
        return Err(CoreError::InvalidTransition { from, to });
    }
    ensure_transition(from, to, role)
}

/// Statuses an order may legally move to next.
pub fn next_statuses(from: OrderStatus) -> Vec<OrderStatus> {
    OrderStatus::ALL
        .into_iter()
        .filter(|to| required_permission(from, *to).is_some())
        .collect()
}

// =============================================================================
// Unit Tests
// =============================================================================
