//! # Order Aggregate
//!
//! Immutable-at-creation snapshot of items, address and pricing, plus the
//! embedded payment sub-record.
//!
//! ## Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  Order::place(NewOrder)                                                 │
//! │   ├── validate lines against live variants                              │
//! │   ├── freeze item snapshots (name, sku, image, size, colour, price)     │
//! │   ├── freeze address snapshot                                           │
//! │   ├── run the pricing engine                                            │
//! │   └── pick the initial status (gateway → pending_payment,               │
//! │                                COD → configured)                        │
//! │                                                                         │
//! │  After creation only two things change an order:                        │
//! │   • status transitions   (status.rs, PaymentRecord::after_transition)   │
//! │   • refunds              (refund.rs)                                    │
//! │  Items and pricing fields never change.                                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::pricing::{price_with, AdjustmentRule, PriceLine, PriceQuote, PricingConfig};
use crate::status::OrderStatus;
use crate::types::{AddressSnapshot, PaymentMethod, PaymentStatus, Variant};
use crate::validation::validate_quantity;

// =============================================================================
// Snapshots
// =============================================================================

/// Product data frozen at order time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct ProductSnapshot {
    pub name: String,
    pub sku: String,
    pub image_ref: Option<String>,
}

/// Variant data frozen at order time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct VariantSnapshot {
    pub sku: String,
    pub label: String,
    pub color: Option<String>,
}

/// A line in an order. Never edited after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub id: String,
    pub product_id: String,
    pub variant_id: String,
    pub product: ProductSnapshot,
    pub variant: VariantSnapshot,
    pub quantity: i64,
    pub unit_price: Money,
    /// `unit_price × quantity`, fixed at creation.
    pub line_total: Money,
}

impl OrderItem {
    /// Freezes a live variant into an order line at its current price.
    pub fn from_variant(variant: &Variant, quantity: i64) -> Self {
        OrderItem {
            id: Uuid::new_v4().to_string(),
            product_id: variant.product_id.clone(),
            variant_id: variant.id.clone(),
            product: ProductSnapshot {
                name: variant.product_name.clone(),
                sku: variant.sku.clone(),
                image_ref: variant.image_ref.clone(),
            },
            variant: VariantSnapshot {
                sku: variant.sku.clone(),
                label: variant.label.clone(),
                color: variant.color.clone(),
            },
            quantity,
            unit_price: variant.price,
            line_total: variant.price.multiply_quantity(quantity),
        }
    }

    pub fn price_line(&self) -> PriceLine {
        PriceLine::new(self.unit_price, self.quantity)
    }
}

// =============================================================================
// Payment Sub-record
// =============================================================================

/// Payment state embedded in the order row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRecord {
    pub method: PaymentMethod,
    pub status: PaymentStatus,
    /// Processor transaction id, set once payment succeeds.
    pub transaction_id: Option<String>,
    /// Reference of the latest initiation attempt.
    pub gateway_reference: Option<String>,
    /// Captured amount; zero until paid.
    pub paid_amount: Money,
    /// Running total of refunds issued against `paid_amount`.
    pub refunded_amount: Money,
}

impl PaymentRecord {
    /// Money still available for refunds.
    pub fn refundable(&self) -> Money {
        (self.paid_amount - self.refunded_amount).non_negative()
    }

    /// Payment fields after the order moves to `to`.
    ///
    /// | Target     | Payment effect                              |
    /// |------------|---------------------------------------------|
    /// | paid       | status paid, `paid_amount = grand_total`    |
    /// | failed     | status failed                               |
    /// | other      | unchanged                                   |
    ///
    /// Refund bookkeeping lives in `refund.rs`, not here.
    pub fn after_transition(
        &self,
        to: OrderStatus,
        grand_total: Money,
        transaction_id: Option<&str>,
    ) -> PaymentRecord {
        let mut next = self.clone();
        match to {
            OrderStatus::Paid => {
                next.status = PaymentStatus::Paid;
                next.paid_amount = grand_total;
                if let Some(txn) = transaction_id {
                    next.transaction_id = Some(txn.to_string());
                }
            }
            OrderStatus::Failed => {
                next.status = PaymentStatus::Failed;
            }
            _ => {}
        }
        next
    }
}

// =============================================================================
// COD Policy
// =============================================================================

/// Status a cash-on-delivery order starts in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CodInitialStatus {
    /// Treated as paid on placement; goes straight to fulfilment.
    #[default]
    Paid,
    /// Waits for an admin `paid` transition once cash is collected.
    PendingPayment,
}

/// Initial order status for a payment method.
pub fn initial_status(method: PaymentMethod, cod: CodInitialStatus) -> OrderStatus {
    match (method, cod) {
        (PaymentMethod::Gateway, _) => OrderStatus::PendingPayment,
        (PaymentMethod::Cod, CodInitialStatus::Paid) => OrderStatus::Paid,
        (PaymentMethod::Cod, CodInitialStatus::PendingPayment) => OrderStatus::PendingPayment,
    }
}

// =============================================================================
// Order
// =============================================================================

/// A placed order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    /// Internal id (UUID v4).
    pub id: String,
    /// Customer-facing id, `AUR-YYYYMMDD-XXXXXXXX`.
    pub order_number: String,
    /// `user:<id>` or `guest:<token>`.
    pub owner_key: String,
    pub status: OrderStatus,
    pub items: Vec<OrderItem>,
    pub shipping_address: AddressSnapshot,
    pub subtotal: Money,
    pub shipping_total: Money,
    pub cod_charge: Money,
    pub tax_total: Money,
    pub discount_total: Money,
    pub grand_total: Money,
    pub payment: PaymentRecord,
    pub notes: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

/// Everything needed to place an order.
pub struct NewOrder<'a> {
    pub owner_key: String,
    /// Live variants with requested quantities, in cart order.
    pub lines: Vec<(Variant, i64)>,
    pub address: AddressSnapshot,
    pub method: PaymentMethod,
    pub cod_initial_status: CodInitialStatus,
    pub notes: Option<String>,
    pub pricing: &'a PricingConfig,
    pub adjustments: &'a dyn AdjustmentRule,
}

impl Order {
    /// Builds a new order from re-validated lines.
    ///
    /// ## Errors
    /// - `EmptyCart` when there are no lines
    /// - `VariantUnavailable` for inactive, unpriced, or price-on-demand variants
    /// - `Validation` for quantities outside `1..=999`
    ///
    /// Stock is not checked here; the inventory ledger does that atomically.
    pub fn place(input: NewOrder<'_>) -> CoreResult<Order> {
        if input.lines.is_empty() {
            return Err(CoreError::EmptyCart);
        }

        let mut items = Vec::with_capacity(input.lines.len());
        for (variant, quantity) in &input.lines {
            validate_quantity(*quantity)?;
            if let Some(reason) = variant.unavailable_reason() {
                return Err(CoreError::VariantUnavailable {
                    sku: variant.sku.clone(),
                    reason: reason.to_string(),
                });
            }
            items.push(OrderItem::from_variant(variant, *quantity));
        }

        let lines: Vec<PriceLine> = items.iter().map(OrderItem::price_line).collect();
        let quote = price_with(&lines, input.method, input.pricing, input.adjustments);

        let status = initial_status(input.method, input.cod_initial_status);
        let id = Uuid::new_v4();
        let now = Utc::now();

        let pending = PaymentRecord {
            method: input.method,
            status: PaymentStatus::Pending,
            transaction_id: None,
            gateway_reference: None,
            paid_amount: Money::zero(),
            refunded_amount: Money::zero(),
        };
        let payment = if status == OrderStatus::Paid {
            pending.after_transition(OrderStatus::Paid, quote.grand_total, None)
        } else {
            pending
        };

        Ok(Order {
            id: id.to_string(),
            order_number: order_number(now, &id),
            owner_key: input.owner_key,
            status,
            items,
            shipping_address: input.address,
            subtotal: quote.subtotal,
            shipping_total: quote.delivery_charge,
            cod_charge: quote.cod_charge,
            tax_total: quote.tax_total,
            discount_total: quote.discount_total,
            grand_total: quote.grand_total,
            payment,
            notes: input.notes,
            created_at: now,
            updated_at: now,
        })
    }

    /// Line totals sum to the subtotal and the grand total reconciles.
    pub fn reconciles(&self) -> bool {
        let lines_ok = self
            .items
            .iter()
            .all(|i| i.line_total == i.unit_price.multiply_quantity(i.quantity));
        let sum: Money = self.items.iter().map(|i| i.line_total).sum();

        lines_ok
            && sum == self.subtotal
            && self.grand_total
                == self.subtotal + self.shipping_total + self.cod_charge + self.tax_total
                    - self.discount_total
            && !self.grand_total.is_negative()
    }

    /// The pricing fields as a quote.
    pub fn quote(&self) -> PriceQuote {
        PriceQuote {
            subtotal: self.subtotal,
            delivery_charge: self.shipping_total,
            cod_charge: self.cod_charge,
            tax_total: self.tax_total,
            discount_total: self.discount_total,
            grand_total: self.grand_total,
            is_free_delivery: self.shipping_total.is_zero(),
            amount_needed_for_free_delivery: Money::zero(),
        }
    }
}

/// Generates the customer-facing order number.
///
/// ## Example
/// ```rust
/// use aurum_core::order::order_number;
/// use chrono::{TimeZone, Utc};
/// use uuid::Uuid;
///
/// let id = Uuid::parse_str("9f3a0b1c-0000-4000-8000-000000000000").unwrap();
/// let at = Utc.with_ymd_and_hms(2024, 3, 15, 10, 0, 0).unwrap();
/// assert_eq!(order_number(at, &id), "AUR-20240315-9F3A0B1C");
/// ```
pub fn order_number(created_at: DateTime<Utc>, id: &Uuid) -> String {
    let simple = id.simple().to_string().to_uppercase();
    format!("AUR-{}-{}", created_at.format("%Y%m%d"), &simple[..8])
}

// =============================================================================
// Audit Records
// =============================================================================

/// One row of the status audit trail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct StatusChange {
    /// `None` for the initial status at placement.
    pub from_status: Option<OrderStatus>,
    pub to_status: OrderStatus,
    pub notes: Option<String>,
    /// `system`, `gateway`, `customer`, or an admin id.
    pub actor: String,
    #[ts(as = "String")]
    pub changed_at: DateTime<Utc>,
}

/// Whether a refund settles the whole remaining balance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum RefundType {
    Full,
    Partial,
}

/// One row of the refund ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct RefundEntry {
    pub id: String,
    pub order_id: String,
    pub amount: Money,
    pub refund_type: RefundType,
    pub reason: String,
    pub notes: Option<String>,
    pub actor: String,
    /// Processor's id for the refund.
    pub gateway_refund_id: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

/// Order with its audit trails, for admin views.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct OrderDetail {
    pub order: Order,
    pub history: Vec<StatusChange>,
    pub refunds: Vec<RefundEntry>,
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pricing::NoAdjustments;
    use crate::validation::validate_order_number;

    fn variant(id: &str, price: i64) -> Variant {
        Variant {
            id: format!("var-{id}"),
            product_id: format!("prod-{id}"),
            sku: format!("SKU-{id}"),
            product_name: format!("Product {id}"),
            label: "18in".to_string(),
            color: Some("Gold".to_string()),
            image_ref: Some(format!("img/{id}.jpg")),
            price: Money::from_minor(price),
            stock: 5,
            is_active: true,
            is_price_on_demand: false,
            updated_at: Utc::now(),
        }
    }

    fn address() -> AddressSnapshot {
        AddressSnapshot {
            full_name: "Meera Iyer".into(),
            phone: "+919800000000".into(),
            line1: "12 MG Road".into(),
            line2: None,
            city: "Bengaluru".into(),
            state: "KA".into(),
            postal_code: "560001".into(),
            country: "IN".into(),
        }
    }

    fn new_order<'a>(
        lines: Vec<(Variant, i64)>,
        method: PaymentMethod,
        cod: CodInitialStatus,
        pricing: &'a PricingConfig,
    ) -> NewOrder<'a> {
        NewOrder {
            owner_key: "user:1".into(),
            lines,
            address: address(),
            method,
            cod_initial_status: cod,
            notes: None,
            pricing,
            adjustments: &NoAdjustments,
        }
    }

    #[test]
    fn test_place_cod_order() {
        let pricing = PricingConfig::default();
        let order = Order::place(new_order(
            vec![(variant("1", 20_000), 1), (variant("2", 5_000), 2)],
            PaymentMethod::Cod,
            CodInitialStatus::Paid,
            &pricing,
        ))
        .unwrap();

        assert_eq!(order.subtotal.minor(), 30_000);
        assert_eq!(order.shipping_total.minor(), 7_000);
        assert_eq!(order.cod_charge.minor(), 4_000);
        assert_eq!(order.grand_total.minor(), 41_000);
        assert_eq!(order.status, OrderStatus::Paid);
        assert_eq!(order.payment.status, PaymentStatus::Paid);
        assert_eq!(order.payment.paid_amount.minor(), 41_000);
        assert_eq!(order.items[1].line_total.minor(), 10_000);
        assert_eq!(order.items[0].variant.color.as_deref(), Some("Gold"));
        assert!(order.reconciles());
        assert!(validate_order_number(&order.order_number).is_ok());
    }

    #[test]
    fn test_place_gateway_and_pending_cod() {
        let pricing = PricingConfig::default();
        let order = Order::place(new_order(
            vec![(variant("1", 60_000), 1)],
            PaymentMethod::Gateway,
            CodInitialStatus::Paid,
            &pricing,
        ))
        .unwrap();
        assert_eq!(order.status, OrderStatus::PendingPayment);
        assert_eq!(order.payment.status, PaymentStatus::Pending);
        assert_eq!(order.payment.paid_amount, Money::zero());
        assert_eq!(order.shipping_total, Money::zero());

        let order = Order::place(new_order(
            vec![(variant("1", 60_000), 1)],
            PaymentMethod::Cod,
            CodInitialStatus::PendingPayment,
            &pricing,
        ))
        .unwrap();
        assert_eq!(order.status, OrderStatus::PendingPayment);
    }

    #[test]
    fn test_place_rejects_empty_and_unavailable() {
        let pricing = PricingConfig::default();
        assert!(matches!(
            Order::place(new_order(vec![], PaymentMethod::Cod, CodInitialStatus::Paid, &pricing)),
            Err(CoreError::EmptyCart)
        ));

        let mut v = variant("1", 20_000);
        v.is_active = false;
        assert!(matches!(
            Order::place(new_order(
                vec![(v, 1)],
                PaymentMethod::Cod,
                CodInitialStatus::Paid,
                &pricing
            )),
            Err(CoreError::VariantUnavailable { .. })
        ));
    }

    #[test]
    fn test_payment_after_transition() {
        let record = PaymentRecord {
            method: PaymentMethod::Gateway,
            status: PaymentStatus::Pending,
            transaction_id: None,
            gateway_reference: Some("ref-1".into()),
            paid_amount: Money::zero(),
            refunded_amount: Money::zero(),
        };

        let paid = record.after_transition(OrderStatus::Paid, Money::from_minor(41_000), Some("txn-1"));
        assert_eq!(paid.status, PaymentStatus::Paid);
        assert_eq!(paid.paid_amount.minor(), 41_000);
        assert_eq!(paid.transaction_id.as_deref(), Some("txn-1"));
        assert_eq!(paid.refundable().minor(), 41_000);

        let failed = record.after_transition(OrderStatus::Failed, Money::from_minor(41_000), None);
        assert_eq!(failed.status, PaymentStatus::Failed);
        assert_eq!(failed.paid_amount, Money::zero());

        let same = record.after_transition(OrderStatus::Cancelled, Money::from_minor(41_000), None);
        assert_eq!(same, record);
    }
}
