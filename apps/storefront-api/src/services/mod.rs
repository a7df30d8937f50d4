//! # Services
//!
//! One module per use case. Handlers stay thin: they extract and validate
//! transport input, call one service function, and render the result.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  carts     get / add / update / remove / clear / merge guest cart       │
//! │  checkout  placeOrder: re-validate, reserve, persist, initiate          │
//! │  payments  initiate, retry, applyResult (idempotent callback)           │
//! │  orders    owner reads, admin query layer, status machine executor      │
//! │  refunds   refund processor                                             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every mutation of an order is a guarded write. When the guard loses,
//! the service re-reads the order and re-plans, up to [`MAX_CAS_ATTEMPTS`].

pub mod carts;
pub mod checkout;
pub mod orders;
pub mod payments;
pub mod refunds;

use serde::Serialize;
use serde_json::{json, Value};

use aurum_core::{NotificationKind, Order};
use aurum_db::NewNotification;

/// Re-plan budget for guarded writes that lose to a concurrent writer.
pub const MAX_CAS_ATTEMPTS: usize = 3;

/// Builds an outbox row for `order`, merging `extra` into the payload.
pub(crate) fn notification(order: &Order, kind: NotificationKind, extra: Value) -> NewNotification {
    let mut payload = json!({
        "orderNumber": order.order_number,
        "grandTotal": order.grand_total,
    });
    if let (Some(base), Value::Object(extra)) = (payload.as_object_mut(), extra) {
        base.extend(extra);
    }

    NewNotification {
        order_id: order.id.clone(),
        kind,
        recipient: order.owner_key.clone(),
        payload,
    }
}

/// One page of a list query.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub page: i64,
    pub limit: i64,
}
