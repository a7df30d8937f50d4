//! # Domain Types
//!
//! Shared value types used across cart, order and pricing modules.
//!
//! ## Type Overview
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          Domain Types                                   │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Variant      │   │    Address      │   │ PaymentMethod   │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  sku, price     │   │  owner_key      │   │  Gateway        │       │
//! │  │  stock ≥ 0      │   │  line1, city    │   │  Cod            │       │
//! │  │  is_active      │   │  → snapshot()   │   └─────────────────┘       │
//! │  └─────────────────┘   └─────────────────┘                             │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    TaxRate      │   │ PaymentStatus   │   │ PaymentOutcome  │       │
//! │  │  bps (u32)      │   │ Pending, Paid,  │   │ Success         │       │
//! │  │  1800 = 18%     │   │ Failed, Refunded│   │ Failure         │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Ownership
//! `Variant` and `Address` are owned by collaborators outside this
//! subsystem (catalog, address book). Checkout only reads them, except
//! for the stock column which the inventory ledger decrements/restores.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ts_rs::TS;

use crate::error::ValidationError;
use crate::money::Money;

// =============================================================================
// Tax Rate
// =============================================================================

/// Tax rate represented in basis points (bps).
///
/// ## Why Basis Points?
/// 1 basis point = 0.01% = 1/10000
/// 300 bps = 3% (GST on gold jewellery)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TaxRate(u32);

impl TaxRate {
    /// Creates a tax rate from basis points.
    #[inline]
    pub const fn from_bps(bps: u32) -> Self {
        TaxRate(bps)
    }

    /// Returns the rate in basis points.
    #[inline]
    pub const fn bps(&self) -> u32 {
        self.0
    }

    /// Zero tax rate.
    #[inline]
    pub const fn zero() -> Self {
        TaxRate(0)
    }

    /// Checks if tax rate is zero.
    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

impl Default for TaxRate {
    fn default() -> Self {
        TaxRate::zero()
    }
}

// =============================================================================
// Payment Method
// =============================================================================

/// How the customer pays.
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    /// Online payment through the hosted gateway page.
    Gateway,
    /// Cash on delivery.
    Cod,
}

impl PaymentMethod {
    pub const fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Gateway => "gateway",
            PaymentMethod::Cod => "cod",
        }
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentMethod {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "gateway" => Ok(PaymentMethod::Gateway),
            "cod" => Ok(PaymentMethod::Cod),
            _ => Err(ValidationError::NotAllowed {
                field: "paymentMethod".to_string(),
                allowed: vec!["gateway".to_string(), "cod".to_string()],
            }),
        }
    }
}

// =============================================================================
// Payment Status
// =============================================================================

/// Status of the payment sub-record embedded in an order.
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Paid,
    Failed,
    Refunded,
}

impl Default for PaymentStatus {
    fn default() -> Self {
        PaymentStatus::Pending
    }
}

/// Result reported by the gateway callback.
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum PaymentOutcome {
    Success,
    Failure,
}

// =============================================================================
// Variant (catalog read model)
// =============================================================================

/// A purchasable SKU-level configuration of a product.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Variant {
    /// Unique identifier (UUID v4).
    pub id: String,
    pub product_id: String,
    pub sku: String,
    pub product_name: String,
    /// Size or label, e.g. "50ml" or "Ring size 7".
    pub label: String,
    pub color: Option<String>,
    pub image_ref: Option<String>,
    pub price: Money,
    /// Available units; never negative.
    pub stock: i64,
    pub is_active: bool,
    /// Bespoke pieces priced by consultation. Cannot be checked out.
    pub is_price_on_demand: bool,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Variant {
    /// Why this variant cannot be bought right now, if it can't.
    ///
    /// Stock is deliberately not checked here; the inventory ledger's
    /// conditional decrement is the only authority on stock.
    pub fn unavailable_reason(&self) -> Option<&'static str> {
        if !self.is_active {
            Some("no longer available")
        } else if self.is_price_on_demand {
            Some("price on demand")
        } else if !self.price.is_positive() {
            Some("price not set")
        } else {
            None
        }
    }

    /// Checks if the variant can be added to a cart or checked out.
    pub fn is_purchasable(&self) -> bool {
        self.unavailable_reason().is_none()
    }
}

// =============================================================================
// Address
// =============================================================================

/// A live address-book record. Owned by the address collaborator.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    pub id: String,
    /// `user:<id>` or `guest:<token>`.
    pub owner_key: String,
    pub full_name: String,
    pub phone: String,
    pub line1: String,
    pub line2: Option<String>,
    pub city: String,
    pub state: String,
    pub postal_code: String,
    pub country: String,
}

impl Address {
    /// Freezes the address for embedding in an order.
    pub fn snapshot(&self) -> AddressSnapshot {
        AddressSnapshot {
            full_name: self.full_name.clone(),
            phone: self.phone.clone(),
            line1: self.line1.clone(),
            line2: self.line2.clone(),
            city: self.city.clone(),
            state: self.state.clone(),
            postal_code: self.postal_code.clone(),
            country: self.country.clone(),
        }
    }
}

/// Immutable copy of a shipping address embedded in an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct AddressSnapshot {
    pub full_name: String,
    pub phone: String,
    pub line1: String,
    pub line2: Option<String>,
    pub city: String,
    pub state: String,
    pub postal_code: String,
    pub country: String,
}

// =============================================================================
// Unit Tests
// =============================================================================
