//! # Cart Aggregate
//!
//! The shopping cart for a signed-in customer or an anonymous session.
//!
//! ## Cart Operations Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Cart Operations                                      │
//! │                                                                         │
//! │  HTTP Request                 Cart Method            Persisted Change   │
//! │  ────────────                 ───────────            ────────────────   │
//! │                                                                         │
//! │  POST /cart/items ──────────► add_item() ──────────► upsert one line   │
//! │                                                                         │
//! │  PATCH /cart/items/:id ─────► update_quantity() ───► upsert / delete   │
//! │                                                                         │
//! │  DELETE /cart/items/:id ────► remove_item() ───────► delete one line   │
//! │                                                                         │
//! │  login ─────────────────────► merge() ─────────────► upsert merged     │
//! │                                                                         │
//! │  GET /cart ─────────────────► quote() ─────────────► (read only)       │
//! │                                                                         │
//! │  NOTE: Every write touches exactly one line, so concurrent edits to    │
//! │        different lines never clobber each other (last write per line). │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use ts_rs::TS;
use uuid::Uuid;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;
use crate::pricing::{price_with, AdjustmentRule, PriceLine, PriceQuote, PricingConfig};
use crate::types::{PaymentMethod, Variant};
use crate::validation::validate_quantity;
use crate::MAX_ITEM_QUANTITY;

// =============================================================================
// Cart Owner
// =============================================================================

/// Who a cart (or order) belongs to.
///
/// Authenticated and guest carts share invariants and storage; only the
/// key differs.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CartOwner {
    User(String),
    Guest(String),
}

impl CartOwner {
    /// Storage key: `user:<id>` or `guest:<token>`.
    pub fn key(&self) -> String {
        match self {
            CartOwner::User(id) => format!("user:{id}"),
            CartOwner::Guest(token) => format!("guest:{token}"),
        }
    }

    /// Parses a storage key back into an owner.
    pub fn parse(key: &str) -> Result<Self, ValidationError> {
        let invalid = |reason: &str| ValidationError::InvalidFormat {
            field: "owner".to_string(),
            reason: reason.to_string(),
        };

        let (kind, value) = key
            .split_once(':')
            .ok_or_else(|| invalid("expected user:<id> or guest:<token>"))?;

        if value.trim().is_empty() {
            return Err(invalid("identifier is empty"));
        }

        match kind {
            "user" => Ok(CartOwner::User(value.to_string())),
            "guest" => Ok(CartOwner::Guest(value.to_string())),
            _ => Err(invalid("expected user:<id> or guest:<token>")),
        }
    }

    pub fn is_guest(&self) -> bool {
        matches!(self, CartOwner::Guest(_))
    }
}

impl fmt::Display for CartOwner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key())
    }
}

// =============================================================================
// Cart Item
// =============================================================================

/// A line in the cart.
///
/// ## Design Notes
/// - Unique by `(product_id, variant_id)`; adding the same variant again
///   increases the quantity.
/// - `unit_price` is a snapshot taken when the line was created. It is
///   display data only: checkout re-reads the live variant and prices
///   from that.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    pub id: String,
    pub product_id: String,
    pub variant_id: String,
    /// SKU at time of adding (frozen).
    pub sku: String,
    /// Product name at time of adding (frozen).
    pub name: String,
    /// Variant label at time of adding (frozen).
    pub label: String,
    pub unit_price: Money,
    pub quantity: i64,
    #[ts(as = "String")]
    pub added_at: DateTime<Utc>,
}

impl CartItem {
    /// Creates a new line from a variant, freezing its display data.
    pub fn from_variant(variant: &Variant, quantity: i64) -> Self {
        CartItem {
            id: Uuid::new_v4().to_string(),
            product_id: variant.product_id.clone(),
            variant_id: variant.id.clone(),
            sku: variant.sku.clone(),
            name: variant.product_name.clone(),
            label: variant.label.clone(),
            unit_price: variant.price,
            quantity,
            added_at: Utc::now(),
        }
    }

    /// Calculates the line total (unit price × quantity).
    pub fn line_total(&self) -> Money {
        self.unit_price.multiply_quantity(self.quantity)
    }

    fn same_variant(&self, other: &CartItem) -> bool {
        self.product_id == other.product_id && self.variant_id == other.variant_id
    }
}

// =============================================================================
// Cart
// =============================================================================

/// The shopping cart.
///
/// ## Invariants
/// - Items are unique by `(product_id, variant_id)`
/// - Quantity is always in `1..=MAX_ITEM_QUANTITY` (setting 0 removes)
/// - At most `max_items` distinct lines (configured per deployment)
#[derive(Debug, Clone)]
pub struct Cart {
    pub owner: CartOwner,
    pub items: Vec<CartItem>,
    pub updated_at: DateTime<Utc>,
}

impl Cart {
    /// Creates a new empty cart.
    pub fn new(owner: CartOwner) -> Self {
        Cart {
            owner,
            items: Vec::new(),
            updated_at: Utc::now(),
        }
    }

    /// Adds a variant or increases its quantity if already present.
    ///
    /// ## Returns
    /// The line that must be persisted.
    ///
    /// ## Errors
    /// - `Validation` when quantity is not in range
    /// - `VariantUnavailable` when the variant is inactive or unpriced
    /// - `QuantityTooLarge` when the merged quantity would pass the maximum
    /// - `CartTooLarge` when a new line would exceed `max_items`
    pub fn add_item(
        &mut self,
        variant: &Variant,
        quantity: i64,
        max_items: usize,
    ) -> CoreResult<&CartItem> {
        validate_quantity(quantity)?;

        if let Some(reason) = variant.unavailable_reason() {
            return Err(CoreError::VariantUnavailable {
                sku: variant.sku.clone(),
                reason: reason.to_string(),
            });
        }

        self.updated_at = Utc::now();

        let existing = self
            .items
            .iter()
            .position(|i| i.product_id == variant.product_id && i.variant_id == variant.id);

        let index = match existing {
            Some(index) => {
                let item = &mut self.items[index];
                let new_qty = item.quantity + quantity;
                if new_qty > MAX_ITEM_QUANTITY {
                    return Err(CoreError::QuantityTooLarge {
                        requested: new_qty,
                        max: MAX_ITEM_QUANTITY,
                    });
                }
                item.quantity = new_qty;
                index
            }
            None => {
                if self.items.len() >= max_items {
                    return Err(CoreError::CartTooLarge { max: max_items });
                }
                self.items.push(CartItem::from_variant(variant, quantity));
                self.items.len() - 1
            }
        };

        Ok(&self.items[index])
    }

    /// Sets the quantity of a line.
    ///
    /// ## Behavior
    /// - Quantity 0 removes the line and returns `None`
    /// - Unknown line id returns `CartItemNotFound`
    pub fn update_quantity(&mut self, item_id: &str, quantity: i64) -> CoreResult<Option<&CartItem>> {
        if quantity == 0 {
            self.remove_item(item_id)?;
            return Ok(None);
        }

        validate_quantity(quantity)?;

        let item = self
            .items
            .iter_mut()
            .find(|i| i.id == item_id)
            .ok_or_else(|| CoreError::CartItemNotFound(item_id.to_string()))?;
        item.quantity = quantity;
        self.updated_at = Utc::now();

        Ok(Some(&*item))
    }

    /// Removes a line by id.
    pub fn remove_item(&mut self, item_id: &str) -> CoreResult<()> {
        let initial_len = self.items.len();
        self.items.retain(|i| i.id != item_id);

        if self.items.len() == initial_len {
            return Err(CoreError::CartItemNotFound(item_id.to_string()));
        }

        self.updated_at = Utc::now();
        Ok(())
    }

    /// Clears all items from the cart.
    pub fn clear(&mut self) {
        self.items.clear();
        self.updated_at = Utc::now();
    }

    /// Folds a guest cart into this one after sign-in.
    ///
    /// Quantities for the same variant add up, capped at the per-item
    /// maximum. Lines that would push the cart past `max_items` are
    /// dropped. Returns the lines that changed and must be persisted.
    pub fn merge(&mut self, guest: &Cart, max_items: usize) -> Vec<CartItem> {
        let mut changed = Vec::new();

        for incoming in &guest.items {
            if let Some(item) = self.items.iter_mut().find(|i| i.same_variant(incoming)) {
                item.quantity = (item.quantity + incoming.quantity).min(MAX_ITEM_QUANTITY);
                changed.push(item.clone());
            } else if self.items.len() < max_items {
                let mut item = incoming.clone();
                item.quantity = item.quantity.min(MAX_ITEM_QUANTITY);
                self.items.push(item.clone());
                changed.push(item);
            }
        }

        if !changed.is_empty() {
            self.updated_at = Utc::now();
        }
        changed
    }

    /// Returns the number of distinct lines.
    pub fn item_count(&self) -> usize {
        self.items.len()
    }

    /// Returns the total quantity of all items.
    pub fn total_quantity(&self) -> i64 {
        self.items.iter().map(|i| i.quantity).sum()
    }

    /// Sum of snapshot line totals.
    pub fn subtotal(&self) -> Money {
        self.items.iter().map(CartItem::line_total).sum()
    }

    /// Checks if the cart is empty.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Lines in pricing-engine form, using snapshot prices.
    pub fn price_lines(&self) -> Vec<PriceLine> {
        self.items
            .iter()
            .map(|i| PriceLine::new(i.unit_price, i.quantity))
            .collect()
    }

    /// Display-time estimate for the cart page. Uses the same rule as
    /// checkout so the two agree.
    pub fn quote(
        &self,
        method: PaymentMethod,
        config: &PricingConfig,
        rule: &dyn AdjustmentRule,
    ) -> PriceQuote {
        price_with(&self.price_lines(), method, config, rule)
    }
}

/// Cart plus its pricing estimate, as returned to clients.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct CartView {
    pub owner: String,
    pub items: Vec<CartItem>,
    pub item_count: usize,
    pub total_quantity: i64,
    pub payment_method: PaymentMethod,
    pub quote: PriceQuote,
}

impl CartView {
    pub fn build(
        cart: &Cart,
        method: PaymentMethod,
        config: &PricingConfig,
        rule: &dyn AdjustmentRule,
    ) -> Self {
        CartView {
            owner: cart.owner.key(),
            items: cart.items.clone(),
            item_count: cart.item_count(),
            total_quantity: cart.total_quantity(),
            payment_method: method,
            quote: cart.quote(method, config, rule),
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
