//! # Order Service
//!
//! Owner reads, the admin query layer, and the status machine executor.
//!
//! ## change_status
//! ```text
//! read order ──► Transition::plan(current, requested)
//!                   │ illegal edge ──► InvalidStatusTransition (nothing written)
//!                   ▼
//!              UPDATE orders ... WHERE id = ? AND status = current
//!                   │ 0 rows (someone else moved it) ──► re-read, re-plan
//!                   ▼
//!              restore stock (pre-shipment cancel) · history · outbox
//! ```

use std::str::FromStr;

use serde::Deserialize;
use serde_json::json;
use tracing::{info, warn};

use aurum_core::validation::{normalize_pagination, validate_notes, validate_order_number, validate_uuid};
use aurum_core::{CartOwner, CoreError, Order, OrderDetail, OrderStatus, Transition, ValidationError};
use aurum_db::{OrderFilter, StatusWrite};

use crate::error::{ServiceError, ServiceResult};
use crate::services::{notification, Page, MAX_CAS_ATTEMPTS};
use crate::state::AppState;

/// A requested status change.
#[derive(Debug, Clone)]
pub struct StatusUpdate {
    pub status: OrderStatus,
    pub notes: Option<String>,
    pub actor: String,
}

/// Query string of `GET /admin/orders`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AdminOrderQuery {
    pub status: Option<String>,
    /// A user id, or a full owner key (`user:<id>` / `guest:<token>`).
    pub user: Option<String>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

/// Query string of `GET /orders`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

// =============================================================================
// Status Machine Executor
// =============================================================================

/// Moves an order along the status graph.
///
/// ## Errors
/// - `InvalidStatusTransition` for an edge not in the graph; nothing changes
/// - `Validation` for `refunded`, which only the refund processor may set
/// - `ConcurrentModification` when the guarded write keeps losing
pub async fn change_status(state: &AppState, order_id: &str, update: StatusUpdate) -> ServiceResult<Order> {
    validate_uuid("orderId", order_id)?;
    let notes = validate_notes(update.notes.as_deref())?;

    if update.status == OrderStatus::Refunded {
        return Err(ValidationError::InvalidFormat {
            field: "status".to_string(),
            reason: "refunds go through POST /admin/orders/{id}/refund".to_string(),
        }
        .into());
    }

    for _ in 0..MAX_CAS_ATTEMPTS {
        let order = state
            .db
            .orders()
            .get(order_id)
            .await?
            .ok_or_else(|| CoreError::OrderNotFound(order_id.to_string()))?;

        let transition = Transition::plan(order.status, update.status)?;
        let payment = order
            .payment
            .after_transition(transition.to, order.grand_total, None);
        let write = StatusWrite {
            transition,
            payment: &payment,
            notes: notes.as_deref(),
            actor: &update.actor,
            notification: transition
                .notify
                .map(|kind| notification(&order, kind, json!({ "status": transition.to }))),
        };

        if state.db.orders().transition(&order, &write).await? {
            info!(
                order_number = %order.order_number,
                from = %transition.from,
                to = %transition.to,
                restore_stock = transition.restore_stock,
                actor = %update.actor,
                "Order status changed"
            );
            if write.notification.is_some() {
                state.notify_relay();
            }

            return state
                .db
                .orders()
                .get(order_id)
                .await?
                .ok_or_else(|| CoreError::OrderNotFound(order_id.to_string()).into());
        }

        warn!(order_id = %order_id, expected = %order.status, "Status guard lost, re-planning");
    }

    Err(ServiceError::ConcurrentModification {
        order_id: order_id.to_string(),
    })
}

// =============================================================================
// Owner Reads
// =============================================================================

/// An order by number, only if it belongs to `owner`.
pub async fn get_for_owner(state: &AppState, owner: &CartOwner, order_number: &str) -> ServiceResult<Order> {
    validate_order_number(order_number)?;

    state
        .db
        .orders()
        .get_by_number(order_number)
        .await?
        .filter(|o| o.owner_key == owner.key())
        .ok_or_else(|| CoreError::OrderNotFound(order_number.to_string()).into())
}

/// The owner's orders, newest first.
pub async fn list_for_owner(state: &AppState, owner: &CartOwner, query: PageQuery) -> ServiceResult<Page<Order>> {
    let (page, limit, offset) = normalize_pagination(query.page, query.limit);
    let filter = OrderFilter {
        status: None,
        owner_key: Some(owner.key()),
        limit,
        offset,
    };

    let (items, total) = state.db.orders().list(&filter).await?;
    Ok(Page {
        items,
        total,
        page,
        limit,
    })
}

// =============================================================================
// Admin Query Layer
// =============================================================================

pub async fn admin_list(state: &AppState, query: AdminOrderQuery) -> ServiceResult<Page<Order>> {
    let status = query
        .status
        .as_deref()
        .filter(|s| !s.is_empty())
        .map(OrderStatus::from_str)
        .transpose()?;

    let owner_key = match query.user.as_deref().filter(|u| !u.is_empty()) {
        Some(user) if user.contains(':') => Some(CartOwner::parse(user)?.key()),
        Some(user) => Some(CartOwner::User(user.to_string()).key()),
        None => None,
    };

    let (page, limit, offset) = normalize_pagination(query.page, query.limit);
    let filter = OrderFilter {
        status,
        owner_key,
        limit,
        offset,
    };

    let (items, total) = state.db.orders().list(&filter).await?;
    Ok(Page {
        items,
        total,
        page,
        limit,
    })
}

/// Order with status history and refund ledger.
pub async fn admin_detail(state: &AppState, order_id: &str) -> ServiceResult<OrderDetail> {
    validate_uuid("orderId", order_id)?;

    state
        .db
        .orders()
        .detail(order_id)
        .await?
        .ok_or_else(|| CoreError::OrderNotFound(order_id.to_string()).into())
}
