//! # Payment Service
//!
//! Initiation (and its retry) plus idempotent application of processor
//! callbacks.
//!
//! ## applyResult
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  callback(reference, outcome, transactionId)                            │
//! │     │                                                                   │
//! │     ├── reference unknown ─────────────────────► OrderNotFound          │
//! │     ├── transactionId seen before ─────────────► Duplicate (200)        │
//! │     │                                                                   │
//! │     ▼  read order, plan:                                                │
//! │     outcome   current status          effect                            │
//! │     ───────   ───────────────────     ────────────────────────────────  │
//! │     success   pending_payment         → paid, txn recorded, OrderPaid   │
//! │     success   paid … refunded         event recorded, no change         │
//! │     success   cancelled / failed      InvalidStatusTransition (409)     │
//! │     failure   pending_payment         → failed, stock restored          │
//! │               (current reference)                                       │
//! │     failure   pending_payment         event recorded, no change         │
//! │               (superseded reference)                                    │
//! │     failure   anything else           event recorded, no change         │
//! │     │                                                                   │
//! │     ▼  event row + guarded update in one transaction                    │
//! │     Stale (order moved) → re-read and re-plan                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{error, info, warn};

use aurum_core::validation::{validate_order_number, validate_reference};
use aurum_core::{
    CartOwner, CoreError, Order, OrderStatus, PaymentMethod, PaymentOutcome, Transition,
    ValidationError,
};
use aurum_db::{CallbackWrite, PaymentEvent, StatusWrite};

use crate::error::{ServiceError, ServiceResult};
use crate::gateway::{with_timeout, InitiateRequest, Initiation};
use crate::services::{notification, MAX_CAS_ATTEMPTS};
use crate::state::AppState;

/// Actor recorded in the status history for callback-driven changes.
pub const GATEWAY_ACTOR: &str = "gateway";

/// Body of `POST /payments/callback`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentResult {
    pub gateway_reference: String,
    pub outcome: PaymentOutcome,
    pub transaction_id: String,
}

/// What a callback did. Every variant is a success for the processor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum CallbackOutcome {
    /// The order moved to `status`.
    Applied { status: OrderStatus },
    /// Recorded; the order was already past this point.
    Recorded,
    /// This transaction id was handled before.
    Duplicate,
}

// =============================================================================
// Initiation
// =============================================================================

/// Opens a payment session for a `pending_payment` order and records it
/// as the order's current reference.
pub async fn initiate_payment(state: &AppState, order: &Order) -> ServiceResult<Initiation> {
    let attempt = state.db.payments().attempt_count(&order.id).await? + 1;
    let request = InitiateRequest {
        order_id: order.id.clone(),
        order_number: order.order_number.clone(),
        amount: order.grand_total,
        attempt,
    };

    let initiation = with_timeout(
        "gateway.initiate",
        state.config.gateway_timeout(),
        state.gateway.initiate(&request),
    )
    .await?;

    let recorded = state
        .db
        .payments()
        .record_attempt(
            &order.id,
            &initiation.gateway_reference,
            order.grand_total,
            initiation.redirect_url.as_deref(),
        )
        .await?;

    if !recorded {
        // Paid or cancelled while the processor was answering.
        let current = current_status(state, &order.id).await?;
        return Err(CoreError::InvalidStatusTransition {
            from: current,
            to: OrderStatus::Paid,
        }
        .into());
    }

    info!(
        order_number = %order.order_number,
        attempt,
        reference = %initiation.gateway_reference,
        "Payment session opened"
    );
    Ok(initiation)
}

/// Re-runs initiation for the owner's unpaid gateway order.
pub async fn retry_payment(
    state: &AppState,
    owner: &CartOwner,
    order_number: &str,
) -> ServiceResult<(Order, Initiation)> {
    validate_order_number(order_number)?;

    let order = state
        .db
        .orders()
        .get_by_number(order_number)
        .await?
        .filter(|o| o.owner_key == owner.key())
        .ok_or_else(|| CoreError::OrderNotFound(order_number.to_string()))?;

    if order.payment.method != PaymentMethod::Gateway {
        return Err(ValidationError::NotAllowed {
            field: "paymentMethod".to_string(),
            allowed: vec![PaymentMethod::Gateway.as_str().to_string()],
        }
        .into());
    }
    if order.status != OrderStatus::PendingPayment {
        return Err(CoreError::InvalidStatusTransition {
            from: order.status,
            to: OrderStatus::Paid,
        }
        .into());
    }

    let initiation = initiate_payment(state, &order).await?;
    let order = state.db.orders().get(&order.id).await?.unwrap_or(order);
    Ok((order, initiation))
}

// =============================================================================
// Callback
// =============================================================================

/// Applies a processor result. Safe to call any number of times with the
/// same transaction id.
pub async fn apply_result(state: &AppState, result: PaymentResult) -> ServiceResult<CallbackOutcome> {
    validate_reference("gatewayReference", &result.gateway_reference)?;
    validate_reference("transactionId", &result.transaction_id)?;

    let order_id = state
        .db
        .payments()
        .order_id_for_reference(&result.gateway_reference)
        .await?
        .ok_or_else(|| CoreError::OrderNotFound(result.gateway_reference.clone()))?;

    if state.db.payments().event_exists(&result.transaction_id).await? {
        warn!(transaction_id = %result.transaction_id, "Duplicate payment callback ignored");
        return Ok(CallbackOutcome::Duplicate);
    }

    let event = PaymentEvent {
        transaction_id: result.transaction_id.clone(),
        gateway_reference: result.gateway_reference.clone(),
        order_id: order_id.clone(),
        outcome: result.outcome,
    };

    for _ in 0..MAX_CAS_ATTEMPTS {
        let order = state
            .db
            .orders()
            .get(&order_id)
            .await?
            .ok_or_else(|| CoreError::OrderNotFound(order_id.clone()))?;

        let Some(transition) = plan_callback(&order, &result)? else {
            return match state.db.payments().apply_callback(&event, &order, None).await? {
                CallbackWrite::Duplicate => Ok(CallbackOutcome::Duplicate),
                _ => {
                    info!(
                        order_number = %order.order_number,
                        status = %order.status,
                        outcome = ?result.outcome,
                        "Payment callback recorded without status change"
                    );
                    Ok(CallbackOutcome::Recorded)
                }
            };
        };

        let payment =
            order
                .payment
                .after_transition(transition.to, order.grand_total, Some(&result.transaction_id));
        let notes = format!("gateway reference {}", result.gateway_reference);
        let write = StatusWrite {
            transition,
            payment: &payment,
            notes: Some(&notes),
            actor: GATEWAY_ACTOR,
            notification: transition.notify.map(|kind| {
                notification(&order, kind, json!({ "transactionId": result.transaction_id }))
            }),
        };

        match state.db.payments().apply_callback(&event, &order, Some(&write)).await? {
            CallbackWrite::Applied => {
                info!(
                    order_number = %order.order_number,
                    from = %transition.from,
                    to = %transition.to,
                    transaction_id = %result.transaction_id,
                    "Payment result applied"
                );
                if write.notification.is_some() {
                    state.notify_relay();
                }
                return Ok(CallbackOutcome::Applied {
                    status: transition.to,
                });
            }
            CallbackWrite::Recorded => return Ok(CallbackOutcome::Recorded),
            CallbackWrite::Duplicate => return Ok(CallbackOutcome::Duplicate),
            CallbackWrite::Stale => {
                warn!(order_id = %order_id, "Order moved during callback, re-planning");
            }
        }
    }

    Err(ServiceError::ConcurrentModification { order_id })
}

/// Decides the status change a callback requires, if any.
///
/// A success on any attempt pays the order. A failure only fails it when it
/// reports on the order's current session; an earlier attempt failing late
/// must not undo the retry the customer is working through.
fn plan_callback(order: &Order, result: &PaymentResult) -> ServiceResult<Option<Transition>> {
    use OrderStatus::*;

    let planned = match (result.outcome, order.status) {
        (PaymentOutcome::Success, PendingPayment) => Some(Transition::plan(PendingPayment, Paid)?),
        (PaymentOutcome::Success, Cancelled | Failed) => {
            error!(
                order_number = %order.order_number,
                status = %order.status,
                "Payment captured for an order that is no longer payable"
            );
            return Err(CoreError::InvalidStatusTransition {
                from: order.status,
                to: Paid,
            }
            .into());
        }
        (PaymentOutcome::Failure, PendingPayment)
            if order.payment.gateway_reference.as_deref() != Some(result.gateway_reference.as_str()) =>
        {
            warn!(
                order_number = %order.order_number,
                reference = %result.gateway_reference,
                "Failure reported for a superseded payment attempt"
            );
            None
        }
        (PaymentOutcome::Failure, PendingPayment) => Some(Transition::plan(PendingPayment, Failed)?),
        _ => None,
    };

    Ok(planned)
}

async fn current_status(state: &AppState, order_id: &str) -> ServiceResult<OrderStatus> {
    state
        .db
        .orders()
        .get(order_id)
        .await?
        .map(|o| o.status)
        .ok_or_else(|| CoreError::OrderNotFound(order_id.to_string()).into())
}
