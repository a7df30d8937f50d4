//! # Checkout Orchestrator
//!
//! Turns a cart into an order.
//!
//! ## placeOrder
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  1. load cart ─────────────── empty ──────────────► EmptyCart           │
//! │  2. resolve address ───────── missing/not owner ──► AddressNotFound     │
//! │  3. re-read live variants ─── missing ────────────► VariantNotFound     │
//! │                               inactive/unpriced ──► VariantUnavailable  │
//! │  4. price + build order (pure)                                          │
//! │  5. ONE TRANSACTION:                                                    │
//! │       decrement every line ── any shortfall ──► ROLLBACK,               │
//! │                                                 InsufficientStock       │
//! │       insert order, items, history, OrderPlaced outbox row              │
//! │       clear cart                                                        │
//! │  6. gateway orders: initiate (bounded). Failure leaves the order        │
//! │     pending_payment and is reported next to it, not instead of it.      │
//! │                                                                         │
//! │  Steps 1-5 change nothing unless all of them succeed.                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::Deserialize;
use serde_json::json;
use tracing::{info, warn};

use aurum_core::order::NewOrder;
use aurum_core::validation::{validate_notes, validate_reference};
use aurum_core::{CartOwner, CoreError, NotificationKind, Order, OrderStatus, PaymentMethod};
use aurum_db::PlaceOutcome;

use crate::error::{ServiceError, ServiceResult};
use crate::gateway::Initiation;
use crate::services::{notification, payments};
use crate::state::AppState;

/// Body of `POST /checkout`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutRequest {
    pub address_id: String,
    pub payment_method: PaymentMethod,
    #[serde(default)]
    pub notes: Option<String>,
}

/// A placed order and, for gateway orders, the payment session.
#[derive(Debug)]
pub struct CheckoutOutcome {
    pub order: Order,
    pub payment: Option<Initiation>,
    /// Initiation failed after the order was committed; retry through
    /// `POST /orders/{orderNumber}/payment`.
    pub payment_error: Option<ServiceError>,
}

pub async fn place_order(
    state: &AppState,
    owner: &CartOwner,
    request: CheckoutRequest,
) -> ServiceResult<CheckoutOutcome> {
    validate_reference("addressId", &request.address_id)?;
    let notes = validate_notes(request.notes.as_deref())?;
    let owner_key = owner.key();

    let cart = state.db.carts().load(owner).await?;
    if cart.is_empty() {
        return Err(CoreError::EmptyCart.into());
    }

    let address = state
        .db
        .addresses()
        .get_for_owner(&request.address_id, &owner_key)
        .await?
        .ok_or_else(|| CoreError::AddressNotFound(request.address_id.clone()))?;

    let mut lines = Vec::with_capacity(cart.items.len());
    for item in &cart.items {
        let variant = state
            .db
            .variants()
            .get(&item.variant_id)
            .await?
            .ok_or_else(|| CoreError::VariantNotFound(item.sku.clone()))?;
        lines.push((variant, item.quantity));
    }

    let order = Order::place(NewOrder {
        owner_key: owner_key.clone(),
        lines,
        address: address.snapshot(),
        method: request.payment_method,
        cod_initial_status: state.config.checkout.cod_initial_status,
        notes,
        pricing: &state.pricing,
        adjustments: state.adjustments.as_ref(),
    })?;

    let placed = notification(
        &order,
        NotificationKind::OrderPlaced,
        json!({ "paymentMethod": order.payment.method, "status": order.status }),
    );

    match state.db.orders().place(&order, Some(&owner_key), &placed).await? {
        PlaceOutcome::Placed => {}
        PlaceOutcome::InsufficientStock {
            sku,
            available,
            requested,
        } => {
            info!(owner = %owner, sku = %sku, available, requested, "Checkout rejected: insufficient stock");
            return Err(CoreError::InsufficientStock {
                sku,
                available,
                requested,
            }
            .into());
        }
    }
    state.notify_relay();

    info!(
        order_number = %order.order_number,
        owner = %owner,
        method = %order.payment.method,
        status = %order.status,
        grand_total = %order.grand_total,
        "Order placed"
    );

    let needs_initiation =
        order.payment.method == PaymentMethod::Gateway && order.status == OrderStatus::PendingPayment;
    if !needs_initiation {
        return Ok(CheckoutOutcome {
            order,
            payment: None,
            payment_error: None,
        });
    }

    match payments::initiate_payment(state, &order).await {
        Ok(initiation) => {
            let order = state.db.orders().get(&order.id).await?.unwrap_or(order);
            Ok(CheckoutOutcome {
                order,
                payment: Some(initiation),
                payment_error: None,
            })
        }
        Err(e) => {
            warn!(order_number = %order.order_number, error = %e, "Payment initiation failed, order left pending");
            Ok(CheckoutOutcome {
                order,
                payment: None,
                payment_error: Some(e),
            })
        }
    }
}
