//! # Pricing
//!
//! Server-side money math: line totals, order totals, bill settlement and
//! loyalty accrual. Client-sent aggregates are never trusted.
//!
//! ## Worked Example
//! ```text
//! ┌──────────────────────────────────────────────────────────────────────┐
//! │  Butter Chicken   2 × 100.00              = 200.00                   │
//! │  Garlic Naan      1 ×  50.00              =  50.00                   │
//! │                                  ─────────────────                   │
//! │                         subtotal             250.00                  │
//! │                         discount          -    0.00                  │
//! │                         tax               +   12.50                  │
//! │                         total                262.50                  │
//! │                                                                      │
//! │  CASH received 300.00  →  change 37.50,  loyalty +262                │
//! └──────────────────────────────────────────────────────────────────────┘
//! ```

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;
use crate::types::{PaymentMethod, PaymentNote};
use crate::MAX_ITEM_QUANTITY;

/// An intermediate total left the representable range.
fn overflow(field: &str) -> CoreError {
    ValidationError::OutOfRange {
        field: field.to_string(),
        min: 0,
        max: i64::MAX,
    }
    .into()
}

// =============================================================================
// Line Totals
// =============================================================================

/// `quantity × unit_price − discount` for one line.
///
/// Quantity must be in `1..=MAX_ITEM_QUANTITY` and the discount may not
/// exceed the line's gross value, so a line total is never negative.
pub fn line_total(unit_price: Money, quantity: i64, discount: Money) -> CoreResult<Money> {
    if !(1..=MAX_ITEM_QUANTITY).contains(&quantity) {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_ITEM_QUANTITY,
        }
        .into());
    }

    let gross = unit_price
        .multiply_quantity(quantity)
        .ok_or_else(|| overflow("line total"))?;
    if discount.is_negative() || discount > gross {
        return Err(ValidationError::OutOfRange {
            field: "item discount".to_string(),
            min: 0,
            max: gross.cents(),
        }
        .into());
    }

    Ok(gross - discount)
}

// =============================================================================
// Order Totals
// =============================================================================

/// The money columns of a sale, computed together so they always agree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderTotals {
    pub subtotal: Money,
    pub discount: Money,
    pub tax: Money,
    pub total: Money,
}

impl OrderTotals {
    /// Builds totals from already-computed line totals.
    ///
    /// `total = subtotal − discount + tax`. Discount must stay within
    /// `0..=subtotal + tax` and tax may not be negative.
    pub fn compute(
        line_totals: impl IntoIterator<Item = Money>,
        discount: Money,
        tax: Money,
    ) -> CoreResult<Self> {
        let subtotal = line_totals
            .into_iter()
            .try_fold(Money::zero(), Money::checked_add)
            .ok_or_else(|| overflow("subtotal"))?;
        Self::from_parts(subtotal, discount, tax)
    }

    /// Recomputes from a stored subtotal, e.g. when a discount is applied
    /// at billing.
    pub fn from_parts(subtotal: Money, discount: Money, tax: Money) -> CoreResult<Self> {
        if tax.is_negative() {
            return Err(ValidationError::MustBePositive {
                field: "tax".to_string(),
            }
            .into());
        }

        let ceiling = subtotal.checked_add(tax).ok_or_else(|| overflow("total"))?;
        if discount.is_negative() || discount > ceiling {
            return Err(ValidationError::OutOfRange {
                field: "discount".to_string(),
                min: 0,
                max: ceiling.cents(),
            }
            .into());
        }

        Ok(OrderTotals {
            subtotal,
            discount,
            tax,
            total: ceiling - discount,
        })
    }
}

/// Rejects a client-supplied total that disagrees with the server's.
pub fn verify_client_total(expected: Money, client_cents: Option<i64>) -> CoreResult<()> {
    match client_cents {
        Some(actual) if actual != expected.cents() => Err(ValidationError::Mismatch {
            field: "finalTotal".to_string(),
            expected: expected.cents(),
            actual,
        }
        .into()),
        _ => Ok(()),
    }
}

// =============================================================================
// Settlement
// =============================================================================

/// `PENDING` marks an unbilled order and can never settle one.
pub fn ensure_settlement_method(method: PaymentMethod) -> CoreResult<()> {
    if method.is_settlement() {
        return Ok(());
    }

    Err(ValidationError::NotAllowed {
        field: "paymentMethod".to_string(),
        allowed: ["CASH", "CARD", "UPI", "MOBILE", "OTHER"]
            .iter()
            .map(|s| s.to_string())
            .collect(),
    }
    .into())
}

/// Works out what was tendered and what goes back.
///
/// ```text
/// CASH, total 262.50, received 300.00  →  { received 300.00, change 37.50 }
/// CASH, total 262.50, received 200.00  →  InsufficientPayment
/// CARD, total 262.50, received —       →  { received 262.50, change 0 }
/// ```
pub fn settle(total: Money, method: PaymentMethod, received: Option<Money>) -> CoreResult<PaymentNote> {
    ensure_settlement_method(method)?;

    let received = match method {
        PaymentMethod::Cash => {
            let received = received.ok_or_else(|| ValidationError::required("receivedCents"))?;
            if received < total {
                return Err(CoreError::InsufficientPayment { total, received });
            }
            received
        }
        _ => total,
    };

    Ok(PaymentNote {
        received_cents: received.cents(),
        change_cents: received.saturating_sub_to_zero(total).cents(),
    })
}

// =============================================================================
// Loyalty
// =============================================================================

/// One point per whole currency unit, rounded down. Never negative.
#[inline]
pub fn loyalty_points(total: Money) -> i64 {
    total.floor_major().max(0)
}

// =============================================================================
// Unit Tests
// =============================================================================
