//! Customer-facing handlers and the processor callback.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};

use aurum_core::{CartView, Order, PaymentMethod};

use crate::error::ApiError;
use crate::routes::{ApiJson, Owner};
use crate::services::carts::{self, AddItemRequest};
use crate::services::checkout::{self, CheckoutRequest};
use crate::services::orders::{self, PageQuery};
use crate::services::payments::{self, CallbackOutcome, PaymentResult};
use crate::services::Page;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartQuery {
    pub payment_method: Option<PaymentMethod>,
}

#[derive(Debug, Deserialize)]
pub struct QuantityBody {
    pub quantity: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MergeBody {
    pub guest_token: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutResponse {
    pub order: Order,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirect_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gateway_reference: Option<String>,
    /// Set when the order was placed but the payment session could not
    /// be opened.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_error: Option<ApiError>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentSessionResponse {
    pub order: Order,
    pub gateway_reference: String,
    pub redirect_url: Option<String>,
}

// =============================================================================
// Cart
// =============================================================================

pub async fn get_cart(
    State(state): State<AppState>,
    Owner(owner): Owner,
    Query(query): Query<CartQuery>,
) -> Result<Json<CartView>, ApiError> {
    let method = query.payment_method.unwrap_or(PaymentMethod::Gateway);
    Ok(Json(carts::get_cart(&state, &owner, method).await?))
}

pub async fn add_item(
    State(state): State<AppState>,
    Owner(owner): Owner,
    ApiJson(body): ApiJson<AddItemRequest>,
) -> Result<Json<CartView>, ApiError> {
    Ok(Json(carts::add_item(&state, &owner, body).await?))
}

pub async fn update_item(
    State(state): State<AppState>,
    Owner(owner): Owner,
    Path(item_id): Path<String>,
    ApiJson(body): ApiJson<QuantityBody>,
) -> Result<Json<CartView>, ApiError> {
    Ok(Json(carts::update_item(&state, &owner, &item_id, body.quantity).await?))
}

pub async fn remove_item(
    State(state): State<AppState>,
    Owner(owner): Owner,
    Path(item_id): Path<String>,
) -> Result<Json<CartView>, ApiError> {
    Ok(Json(carts::remove_item(&state, &owner, &item_id).await?))
}

pub async fn clear_cart(
    State(state): State<AppState>,
    Owner(owner): Owner,
) -> Result<Json<CartView>, ApiError> {
    Ok(Json(carts::clear_cart(&state, &owner).await?))
}

pub async fn merge_cart(
    State(state): State<AppState>,
    Owner(owner): Owner,
    ApiJson(body): ApiJson<MergeBody>,
) -> Result<Json<CartView>, ApiError> {
    Ok(Json(carts::merge_guest_cart(&state, &owner, &body.guest_token).await?))
}

// =============================================================================
// Checkout and Orders
// =============================================================================

pub async fn checkout(
    State(state): State<AppState>,
    Owner(owner): Owner,
    ApiJson(body): ApiJson<CheckoutRequest>,
) -> Result<(StatusCode, Json<CheckoutResponse>), ApiError> {
    let outcome = checkout::place_order(&state, &owner, body).await?;

    let (redirect_url, gateway_reference) = match outcome.payment {
        Some(session) => (session.redirect_url, Some(session.gateway_reference)),
        None => (None, None),
    };

    Ok((
        StatusCode::CREATED,
        Json(CheckoutResponse {
            order: outcome.order,
            redirect_url,
            gateway_reference,
            payment_error: outcome.payment_error.map(ApiError::storefront),
        }),
    ))
}

pub async fn list_orders(
    State(state): State<AppState>,
    Owner(owner): Owner,
    Query(query): Query<PageQuery>,
) -> Result<Json<Page<Order>>, ApiError> {
    Ok(Json(orders::list_for_owner(&state, &owner, query).await?))
}

pub async fn get_order(
    State(state): State<AppState>,
    Owner(owner): Owner,
    Path(order_number): Path<String>,
) -> Result<Json<Order>, ApiError> {
    Ok(Json(orders::get_for_owner(&state, &owner, &order_number).await?))
}

pub async fn retry_payment(
    State(state): State<AppState>,
    Owner(owner): Owner,
    Path(order_number): Path<String>,
) -> Result<Json<PaymentSessionResponse>, ApiError> {
    let (order, session) = payments::retry_payment(&state, &owner, &order_number).await?;
    Ok(Json(PaymentSessionResponse {
        order,
        gateway_reference: session.gateway_reference,
        redirect_url: session.redirect_url,
    }))
}

// =============================================================================
// Processor Callback
// =============================================================================

/// Always 200 for anything already handled, so processor retries are safe.
pub async fn payment_callback(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<PaymentResult>,
) -> Result<Json<CallbackOutcome>, ApiError> {
    payments::apply_result(&state, body)
        .await
        .map(Json)
        .map_err(ApiError::admin)
}
