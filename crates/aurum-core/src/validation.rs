//! # Validation Module
//!
//! Input validation utilities for the storefront core.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: HTTP boundary (axum extractors)                              │
//! │  ├── Type validation (JSON deserialization, tagged enums)              │
//! │  └── THIS MODULE: field rules (lengths, ranges, formats)               │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: Domain (cart, pricing, status, refund)                       │
//! │  └── Business rules (stock, transitions, refundable amount)            │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                            │
//! │  ├── CHECK (stock >= 0)                                                │
//! │  ├── UNIQUE (order_number, transaction_id)                             │
//! │  └── Foreign key constraints                                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use crate::error::ValidationError;
use crate::MAX_ITEM_QUANTITY;

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Longest accepted refund reason.
pub const MAX_REASON_LEN: usize = 500;

/// Longest accepted free-text note.
pub const MAX_NOTES_LEN: usize = 1000;

/// Longest accepted gateway reference or transaction id.
pub const MAX_REFERENCE_LEN: usize = 128;

/// Default and maximum page sizes for list endpoints.
pub const DEFAULT_PAGE_SIZE: i64 = 20;
pub const MAX_PAGE_SIZE: i64 = 100;

// =============================================================================
// String Validators
// =============================================================================

/// Trims and checks a required free-text field.
pub fn validate_required(field: &str, value: &str, max: usize) -> ValidationResult<String> {
    let value = value.trim();

    if value.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    if value.chars().count() > max {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max,
        });
    }

    Ok(value.to_string())
}

/// Validates optional notes; blank notes become `None`.
pub fn validate_notes(notes: Option<&str>) -> ValidationResult<Option<String>> {
    match notes.map(str::trim) {
        None | Some("") => Ok(None),
        Some(text) if text.chars().count() > MAX_NOTES_LEN => Err(ValidationError::TooLong {
            field: "notes".to_string(),
            max: MAX_NOTES_LEN,
        }),
        Some(text) => Ok(Some(text.to_string())),
    }
}

/// Validates an opaque gateway token (reference or transaction id).
///
/// ## Rules
/// - Must not be empty
/// - At most 128 characters
/// - Printable ASCII with no whitespace
///
/// ## Example
/// ```rust
/// use aurum_core::validation::validate_reference;
///
/// assert!(validate_reference("transactionId", "txn_8f2a91").is_ok());
/// assert!(validate_reference("transactionId", "").is_err());
/// assert!(validate_reference("transactionId", "has space").is_err());
/// ```
pub fn validate_reference(field: &str, value: &str) -> ValidationResult<()> {
    if value.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    if value.len() > MAX_REFERENCE_LEN {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max: MAX_REFERENCE_LEN,
        });
    }

    if !value.chars().all(|c| c.is_ascii_graphic()) {
        return Err(ValidationError::InvalidFormat {
            field: field.to_string(),
            reason: "must be printable ASCII without spaces".to_string(),
        });
    }

    Ok(())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a quantity value.
///
/// ## Rules
/// - Must be positive (> 0)
/// - Must not exceed MAX_ITEM_QUANTITY
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    if qty > MAX_ITEM_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_ITEM_QUANTITY,
        });
    }

    Ok(())
}

/// Normalizes pagination input.
///
/// Pages start at 1; the limit is clamped to `1..=MAX_PAGE_SIZE`.
/// Returns `(page, limit, offset)`.
pub fn normalize_pagination(page: Option<i64>, limit: Option<i64>) -> (i64, i64, i64) {
    let page = page.unwrap_or(1).max(1);
    let limit = limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);
    (page, limit, (page - 1).saturating_mul(limit))
}

// =============================================================================
// Identifier Validators
// =============================================================================

/// Validates a UUID string format.
pub fn validate_uuid(field: &str, id: &str) -> ValidationResult<()> {
    if id.trim().is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    uuid::Uuid::parse_str(id).map_err(|_| ValidationError::InvalidFormat {
        field: field.to_string(),
        reason: "must be a valid UUID".to_string(),
    })?;

    Ok(())
}

/// Validates a customer-facing order number (`AUR-YYYYMMDD-XXXXXXXX`).
pub fn validate_order_number(value: &str) -> ValidationResult<()> {
    let invalid = || ValidationError::InvalidFormat {
        field: "orderNumber".to_string(),
        reason: "expected AUR-YYYYMMDD-XXXXXXXX".to_string(),
    };

    let mut parts = value.split('-');
    let (Some(prefix), Some(date), Some(suffix), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return Err(invalid());
    };

    let date_ok = date.len() == 8 && date.chars().all(|c| c.is_ascii_digit());
    let suffix_ok = suffix.len() == 8
        && suffix
            .chars()
            .all(|c| c.is_ascii_digit() || ('A'..='F').contains(&c));

    if prefix != "AUR" || !date_ok || !suffix_ok {
        return Err(invalid());
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_quantity() {
        assert!(validate_quantity(1).is_ok());
        assert!(validate_quantity(999).is_ok());

        assert!(validate_quantity(0).is_err());
        assert!(validate_quantity(-1).is_err());
        assert!(validate_quantity(1000).is_err());
    }

    #[test]
    fn test_validate_required() {
        assert_eq!(
            validate_required("reason", "  damaged clasp ", MAX_REASON_LEN).unwrap(),
            "damaged clasp"
        );
        assert!(validate_required("reason", "   ", MAX_REASON_LEN).is_err());
        assert!(validate_required("reason", &"x".repeat(501), MAX_REASON_LEN).is_err());
    }

    #[test]
    fn test_validate_notes() {
        assert_eq!(validate_notes(None).unwrap(), None);
        assert_eq!(validate_notes(Some("  ")).unwrap(), None);
        assert_eq!(
            validate_notes(Some("left with guard")).unwrap().as_deref(),
            Some("left with guard")
        );
        assert!(validate_notes(Some(&"n".repeat(1001))).is_err());
    }

    #[test]
    fn test_normalize_pagination() {
        assert_eq!(normalize_pagination(None, None), (1, 20, 0));
        assert_eq!(normalize_pagination(Some(3), Some(10)), (3, 10, 20));
        assert_eq!(normalize_pagination(Some(0), Some(0)), (1, 1, 0));
        assert_eq!(normalize_pagination(Some(-4), Some(500)), (1, 100, 0));
    }

    #[test]
    fn test_validate_uuid() {
        assert!(validate_uuid("id", "550e8400-e29b-41d4-a716-446655440000").is_ok());
        assert!(validate_uuid("id", "").is_err());
        assert!(validate_uuid("id", "not-a-uuid").is_err());
    }

    #[test]
    fn test_validate_order_number() {
        assert!(validate_order_number("AUR-20240315-9F3A0B1C").is_ok());
        assert!(validate_order_number("AUR-2024031-9F3A0B1C").is_err());
        assert!(validate_order_number("ORD-20240315-9F3A0B1C").is_err());
        assert!(validate_order_number("AUR-20240315-9f3a0b1c").is_err());
        assert!(validate_order_number("AUR-20240315-9F3A0B1C-X").is_err());
    }
}
