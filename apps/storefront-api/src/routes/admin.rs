//! Back-office handlers. Errors keep their structured reason.

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Deserialize;

use aurum_core::{Order, OrderDetail, OrderStatus};

use crate::error::ApiError;
use crate::routes::{AdminActor, ApiJson};
use crate::services::orders::{self, AdminOrderQuery, StatusUpdate};
use crate::services::refunds::{self, RefundBody};
use crate::services::Page;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct StatusBody {
    pub status: OrderStatus,
    #[serde(default)]
    pub notes: Option<String>,
}

pub async fn list_orders(
    State(state): State<AppState>,
    AdminActor(_): AdminActor,
    Query(query): Query<AdminOrderQuery>,
) -> Result<Json<Page<Order>>, ApiError> {
    orders::admin_list(&state, query)
        .await
        .map(Json)
        .map_err(ApiError::admin)
}

pub async fn get_order(
    State(state): State<AppState>,
    AdminActor(_): AdminActor,
    Path(id): Path<String>,
) -> Result<Json<OrderDetail>, ApiError> {
    orders::admin_detail(&state, &id)
        .await
        .map(Json)
        .map_err(ApiError::admin)
}

pub async fn change_status(
    State(state): State<AppState>,
    AdminActor(actor): AdminActor,
    Path(id): Path<String>,
    ApiJson(body): ApiJson<StatusBody>,
) -> Result<Json<Order>, ApiError> {
    let update = StatusUpdate {
        status: body.status,
        notes: body.notes,
        actor,
    };

    orders::change_status(&state, &id, update)
        .await
        .map(Json)
        .map_err(ApiError::admin)
}

pub async fn refund(
    State(state): State<AppState>,
    AdminActor(actor): AdminActor,
    Path(id): Path<String>,
    ApiJson(body): ApiJson<RefundBody>,
) -> Result<Json<Order>, ApiError> {
    refunds::refund_order(&state, &id, body, &actor)
        .await
        .map(Json)
        .map_err(ApiError::admin)
}
