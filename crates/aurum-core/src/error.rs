//! # Error Types
//!
//! Domain-specific error types for aurum-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  aurum-core errors (this file)                                         │
//! │  ├── CoreError        - Business rule violations                       │
//! │  ├── ValidationError  - Malformed input                                │
//! │  └── ErrorKind        - Coarse classification for transport layers     │
//! │                                                                         │
//! │  aurum-db errors (separate crate)                                      │
//! │  └── DbError          - Database operation failures                    │
//! │                                                                         │
//! │  storefront-api errors (in app)                                        │
//! │  ├── ServiceError     - Core + Db + gateway failures                   │
//! │  └── ApiError         - What HTTP clients see (serialized)             │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → ServiceError → ApiError → Client  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. Use `thiserror` for derive macros (not manual impl)
//! 2. Include context in error messages (SKU, order id, amounts)
//! 3. Errors are enum variants, never String
//! 4. Every variant maps to exactly one [`ErrorKind`]

use thiserror::Error;

use crate::money::Money;
use crate::status::OrderStatus;

// =============================================================================
// Error Kind
// =============================================================================

/// Coarse error taxonomy shared by every layer.
///
/// Transport layers map this to a status code; they never match on
/// individual variants for that purpose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Malformed input, caught at the boundary.
    Validation,
    /// Address, variant, order or cart item missing.
    NotFound,
    /// Insufficient stock, illegal transition, refund over the paid amount.
    Conflict,
    /// Gateway or notification transport failure.
    Upstream,
    /// Anything unexpected.
    Internal,
}

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
///
/// Every variant here is detected before any mutation happens, so returning
/// one of them always means "nothing changed".
#[derive(Debug, Error)]
pub enum CoreError {
    /// A monetary amount could not be parsed or is out of range.
    ///
    /// ## When This Occurs
    /// - Major-unit text is not a number ("ten", "12,50")
    /// - Amount is negative
    /// - Minor-unit multiplier is zero
    #[error("Invalid amount '{input}': {reason}")]
    InvalidAmount { input: String, reason: String },

    /// Checkout was attempted with no items in the cart.
    #[error("Cart is empty")]
    EmptyCart,

    /// The shipping address could not be resolved for this customer.
    #[error("Address not found: {0}")]
    AddressNotFound(String),

    /// The referenced variant does not exist in the catalog.
    #[error("Variant not found: {0}")]
    VariantNotFound(String),

    /// A cart line can no longer be bought as-is.
    ///
    /// ## When This Occurs
    /// - Variant was deactivated after it was added to the cart
    /// - Price became zero or switched to "price on demand"
    #[error("Variant {sku} is unavailable: {reason}")]
    VariantUnavailable { sku: String, reason: String },

    /// Insufficient stock to complete checkout.
    ///
    /// ## User Workflow
    /// ```text
    /// Checkout (ring: qty 2)
    ///      │
    ///      ▼
    /// Conditional decrement: stock=1, requested=2 → 0 rows
    ///      │
    ///      ▼
    /// InsufficientStock { sku: "RING-GLD-07", available: 1, requested: 2 }
    ///      │
    ///      ▼
    /// Transaction rolled back, cart untouched
    /// ```
    #[error("Insufficient stock for {sku}: available {available}, requested {requested}")]
    InsufficientStock {
        sku: String,
        available: i64,
        requested: i64,
    },

    /// The order status graph has no edge between these states.
    #[error("Cannot move order from {from} to {to}")]
    InvalidStatusTransition { from: OrderStatus, to: OrderStatus },

    /// Refund amount is zero, negative, or does not match a full refund.
    #[error("Invalid refund amount: {reason}")]
    InvalidRefundAmount { reason: String },

    /// Refund would push cumulative refunds past the paid amount.
    #[error("Refund of {requested} exceeds refundable amount {refundable}")]
    RefundExceedsPaid { requested: Money, refundable: Money },

    /// Order is not in a status that allows refunds.
    #[error("Order in status {status} cannot be refunded")]
    OrderNotRefundable { status: OrderStatus },

    /// Order cannot be found.
    #[error("Order not found: {0}")]
    OrderNotFound(String),

    /// Cart line cannot be found.
    #[error("Cart item not found: {0}")]
    CartItemNotFound(String),

    /// Cart has exceeded maximum allowed lines.
    #[error("Cart cannot have more than {max} items")]
    CartTooLarge { max: usize },

    /// Item quantity exceeds maximum allowed.
    #[error("Quantity {requested} exceeds maximum allowed ({max})")]
    QuantityTooLarge { requested: i64, max: i64 },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

impl CoreError {
    /// Classifies the error for transport layers.
    pub fn kind(&self) -> ErrorKind {
        match self {
            CoreError::InvalidAmount { .. }
            | CoreError::EmptyCart
            | CoreError::InvalidRefundAmount { .. }
            | CoreError::CartTooLarge { .. }
            | CoreError::QuantityTooLarge { .. }
            | CoreError::Validation(_) => ErrorKind::Validation,

            CoreError::AddressNotFound(_)
            | CoreError::VariantNotFound(_)
            | CoreError::OrderNotFound(_)
            | CoreError::CartItemNotFound(_) => ErrorKind::NotFound,

            CoreError::VariantUnavailable { .. }
            | CoreError::InsufficientStock { .. }
            | CoreError::InvalidStatusTransition { .. }
            | CoreError::RefundExceedsPaid { .. }
            | CoreError::OrderNotRefundable { .. } => ErrorKind::Conflict,
        }
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These errors occur when user input doesn't meet requirements.
/// Used for early validation before business logic runs.
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

    /// Invalid format (e.g., malformed owner key, bad order number).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Value is not in allowed set.
    #[error("{field} must be one of: {allowed:?}")]
    NotAllowed { field: String, allowed: Vec<String> },
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
            sku: "RING-GLD-07".to_string(),
            available: 0,
            requested: 1,
        };
        assert_eq!(
            err.to_string(),
            "Insufficient stock for RING-GLD-07: available 0, requested 1"
        );

        let err = CoreError::InvalidStatusTransition {
            from: OrderStatus::Delivered,
            to: OrderStatus::Processing,
        };
        assert_eq!(err.to_string(), "Cannot move order from delivered to processing");

        let err = CoreError::RefundExceedsPaid {
            requested: Money::from_minor(50_000),
            refundable: Money::from_minor(41_000),
        };
        assert_eq!(
            err.to_string(),
            "Refund of 500.00 exceeds refundable amount 410.00"
        );
    }

    #[test]
    fn test_error_kinds() {
        assert_eq!(CoreError::EmptyCart.kind(), ErrorKind::Validation);
        assert_eq!(
            CoreError::AddressNotFound("addr-1".into()).kind(),
            ErrorKind::NotFound
        );
        assert_eq!(
            CoreError::OrderNotRefundable {
                status: OrderStatus::Cancelled
            }
            .kind(),
            ErrorKind::Conflict
        );
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let validation_err = ValidationError::Required {
            field: "reason".to_string(),
        };
        let core_err: CoreError = validation_err.into();
        assert!(matches!(core_err, CoreError::Validation(_)));
        assert_eq!(core_err.kind(), ErrorKind::Validation);
    }
}
