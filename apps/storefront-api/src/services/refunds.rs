//! # Refund Processor
//!
//! ## Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  lock(order) ── one refund per order at a time in this process          │
//! │     │                                                                   │
//! │  read order ──► plan_refund ── invalid ──► typed error, nothing changed │
//! │     │                                                                   │
//! │  gateway orders: refund(txn, amount) under timeout                      │
//! │  COD orders:     settled offline, no gateway call                       │
//! │     │                                                                   │
//! │  ONE TRANSACTION, guarded on status AND refunded_amount:                │
//! │     refunded_amount += amount · payment status · order status           │
//! │     refund ledger row · history (full) · RefundIssued outbox row        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use tracing::{error, info};
use uuid::Uuid;

use aurum_core::refund::{plan_refund, RefundRequest};
use aurum_core::validation::validate_uuid;
use aurum_core::{CoreError, Money, NotificationKind, Order, PaymentMethod, RefundEntry, RefundType};

use crate::error::{ServiceError, ServiceResult};
use crate::gateway::{with_timeout, RefundCall};
use crate::services::notification;
use crate::state::AppState;

/// Body of `POST /admin/orders/{id}/refund`. `amount` is in minor units.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefundBody {
    pub amount: Money,
    pub reason: String,
    #[serde(default)]
    pub notes: Option<String>,
    pub refund_type: RefundType,
}

pub async fn refund_order(
    state: &AppState,
    order_id: &str,
    body: RefundBody,
    actor: &str,
) -> ServiceResult<Order> {
    validate_uuid("orderId", order_id)?;

    let _guard = state.order_locks.acquire(order_id).await;

    let order = state
        .db
        .orders()
        .get(order_id)
        .await?
        .ok_or_else(|| CoreError::OrderNotFound(order_id.to_string()))?;

    let request = RefundRequest {
        amount: body.amount,
        reason: body.reason,
        notes: body.notes,
        refund_type: body.refund_type,
        actor: actor.to_string(),
    };
    let plan = plan_refund(&order, &request)?;

    let gateway_refund_id = match order.payment.method {
        PaymentMethod::Gateway => {
            let call = RefundCall {
                order_id: order.id.clone(),
                transaction_id: order.payment.transaction_id.clone(),
                amount: plan.amount,
                reason: plan.reason.clone(),
            };
            let refund = with_timeout(
                "gateway.refund",
                state.config.gateway_timeout(),
                state.gateway.refund(&call),
            )
            .await?;
            Some(refund.refund_id)
        }
        PaymentMethod::Cod => None,
    };

    let entry = RefundEntry {
        id: Uuid::new_v4().to_string(),
        order_id: order.id.clone(),
        amount: plan.amount,
        refund_type: plan.refund_type,
        reason: plan.reason.clone(),
        notes: plan.notes.clone(),
        actor: actor.to_string(),
        gateway_refund_id,
        created_at: Utc::now(),
    };
    let issued = notification(
        &order,
        NotificationKind::RefundIssued,
        json!({
            "amount": plan.amount,
            "refundType": plan.refund_type,
            "refundedTotal": plan.refunded_after,
        }),
    );

    if !state
        .db
        .orders()
        .record_refund(&order, &plan, &entry, Some(&issued))
        .await?
    {
        error!(
            order_number = %order.order_number,
            amount = %plan.amount,
            gateway_refund_id = ?entry.gateway_refund_id,
            "Order changed while refunding; refund issued upstream but not recorded"
        );
        return Err(ServiceError::ConcurrentModification {
            order_id: order.id.clone(),
        });
    }
    state.notify_relay();

    info!(
        order_number = %order.order_number,
        amount = %plan.amount.format(&state.config.pricing.currency_symbol, state.config.scale()),
        refund_type = ?plan.refund_type,
        refunded_total = %plan.refunded_after,
        status_after = %plan.status_after(order.status),
        actor = %actor,
        "Refund recorded"
    );

    state
        .db
        .orders()
        .get(order_id)
        .await?
        .ok_or_else(|| CoreError::OrderNotFound(order_id.to_string()).into())
}
