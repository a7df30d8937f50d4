//! # aurum-core: Pure Business Logic for the Aurum Storefront
//!
//! This crate holds the money, pricing, cart, order, status and refund
//! rules of the storefront's checkout subsystem as pure functions with
//! zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Aurum Storefront Architecture                      │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                 storefront-api (axum)                           │   │
//! │  │   /cart ──► /checkout ──► /payments/callback ──► /admin/orders  │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ aurum-core (THIS CRATE) ★                       │   │
//! │  │                                                                 │   │
//! │  │   ┌─────────┐ ┌─────────┐ ┌────────┐ ┌────────┐ ┌──────────┐   │   │
//! │  │   │  money  │ │ pricing │ │  cart  │ │ order  │ │  status  │   │   │
//! │  │   │  Money  │ │  quote  │ │  Cart  │ │ Order  │ │ edges    │   │   │
//! │  │   └─────────┘ └─────────┘ └────────┘ └────────┘ └──────────┘   │   │
//! │  │   ┌─────────┐ ┌────────────┐ ┌─────────┐                        │   │
//! │  │   │ refund  │ │ validation │ │  error  │                        │   │
//! │  │   └─────────┘ └────────────┘ └─────────┘                        │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    aurum-db (Database Layer)                    │   │
//! │  │        SQLite, inventory ledger, orders, notification outbox    │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`money`] - Money in minor units, display conversions
//! - [`pricing`] - The pricing engine
//! - [`cart`] - Cart aggregate
//! - [`order`] - Order aggregate, snapshots, payment sub-record
//! - [`status`] - Order status state machine
//! - [`refund`] - Refund validation and planning
//! - [`types`] - Shared value types (Variant, Address, PaymentMethod)
//! - [`validation`] - Field validation
//! - [`error`] - Domain error types
//!
//! ## Example Usage
//!
//! ```rust
//! use aurum_core::pricing::{price, PriceLine, PricingConfig};
//! use aurum_core::{Money, PaymentMethod};
//!
//! let lines = [PriceLine::new(Money::from_minor(20_000), 1)];
//! let quote = price(&lines, PaymentMethod::Gateway, &PricingConfig::default());
//!
//! // ₹200 is under the ₹500 free-delivery threshold.
//! assert_eq!(quote.delivery_charge.minor(), 7_000);
//! assert_eq!(quote.grand_total.minor(), 27_000);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod cart;
pub mod error;
pub mod money;
pub mod order;
pub mod pricing;
pub mod refund;
pub mod status;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use cart::{Cart, CartItem, CartOwner, CartView};
pub use error::{CoreError, CoreResult, ErrorKind, ValidationError};
pub use money::{MinorUnitScale, Money};
pub use order::{
    CodInitialStatus, Order, OrderDetail, OrderItem, PaymentRecord, RefundEntry, RefundType,
    StatusChange,
};
pub use pricing::{AdjustmentRule, FlatTax, NoAdjustments, PriceQuote, PricingConfig};
pub use status::{NotificationKind, OrderStatus, Transition};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Default maximum of distinct lines in a cart.
///
/// ## Business Reason
/// Prevents runaway carts. Deployments can lower it through
/// `checkout.max_cart_items`.
pub const MAX_CART_ITEMS: usize = 100;

/// Maximum quantity of a single line.
///
/// ## Business Reason
/// Prevents accidental over-ordering (typing 1000 instead of 10).
pub const MAX_ITEM_QUANTITY: i64 = 999;
