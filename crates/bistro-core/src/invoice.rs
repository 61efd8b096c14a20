//! # Invoice Numbers
//!
//! ```text
//! sequence value   1  →  INV-000001
//! sequence value  42  →  INV-000042
//! sequence value 1234567 → INV-1234567   (widens, never truncates)
//! ```
//!
//! Allocation happens in the database (a single counter row bumped inside
//! the sale transaction); this module only formats and parses.

use crate::error::ValidationError;

pub const INVOICE_PREFIX: &str = "INV-";

/// Zero-padded digit count of newly issued numbers.
pub const INVOICE_WIDTH: usize = 6;

/// Digit count of numbers issued before the six-digit format.
pub const LEGACY_INVOICE_WIDTH: usize = 4;

/// Formats a sequence value as an invoice number.
pub fn format_invoice_number(seq: i64) -> String {
    format!("{}{:0width$}", INVOICE_PREFIX, seq, width = INVOICE_WIDTH)
}

/// Parses `INV-000042` (or legacy `INV-0042`) back to its sequence value.
pub fn parse_invoice_number(s: &str) -> Result<i64, ValidationError> {
    let invalid = |reason: &str| ValidationError::InvalidFormat {
        field: "invoiceNumber".to_string(),
        reason: reason.to_string(),
    };

    let digits = s
        .strip_prefix(INVOICE_PREFIX)
        .ok_or_else(|| invalid("must start with INV-"))?;

    if digits.len() < LEGACY_INVOICE_WIDTH || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid("expected at least four digits"));
    }

    let seq: i64 = digits
        .parse()
        .map_err(|_| invalid("sequence out of range"))?;

    if seq < 1 {
        return Err(invalid("sequence starts at 1"));
    }

    Ok(seq)
}
