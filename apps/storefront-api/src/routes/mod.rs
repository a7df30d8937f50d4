//! # HTTP Routes
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Storefront (X-User-Id or X-Guest-Token)                                │
//! │    GET    /cart?paymentMethod=           cart + pricing estimate        │
//! │    POST   /cart/items                    add by variantId / variantSku  │
//! │    PATCH  /cart/items/{item_id}          set quantity (0 removes)       │
//! │    DELETE /cart/items/{item_id}                                         │
//! │    DELETE /cart                                                         │
//! │    POST   /cart/merge                    fold guest cart after login    │
//! │    POST   /checkout                      201 { order, redirectUrl? }    │
//! │    GET    /orders                        own orders, newest first       │
//! │    GET    /orders/{order_number}                                        │
//! │    POST   /orders/{order_number}/payment retry initiation               │
//! │                                                                         │
//! │  Processor                                                              │
//! │    POST   /payments/callback             idempotent, 200 on replay      │
//! │                                                                         │
//! │  Admin (X-Admin-Id)                                                     │
//! │    GET    /admin/orders?status=&user=&page=&limit=                      │
//! │    GET    /admin/orders/{id}             with history and refunds       │
//! │    PATCH  /admin/orders/{id}/status                                     │
//! │    POST   /admin/orders/{id}/refund                                     │
//! │                                                                         │
//! │    GET    /health                                                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Storefront errors carry one message per kind; admin errors keep the
//! structured reason.

mod admin;
mod storefront;

use axum::extract::{FromRequest, FromRequestParts, State};
use axum::http::request::Parts;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, patch, post};
use axum::{Json, Router};
use serde_json::json;

use aurum_core::validation::validate_reference;
use aurum_core::CartOwner;

use crate::error::ApiError;
use crate::state::AppState;

pub const USER_HEADER: &str = "x-user-id";
pub const GUEST_HEADER: &str = "x-guest-token";
pub const ADMIN_HEADER: &str = "x-admin-id";

/// Builds the application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/cart", get(storefront::get_cart).delete(storefront::clear_cart))
        .route("/cart/items", post(storefront::add_item))
        .route(
            "/cart/items/{item_id}",
            patch(storefront::update_item).delete(storefront::remove_item),
        )
        .route("/cart/merge", post(storefront::merge_cart))
        .route("/checkout", post(storefront::checkout))
        .route("/orders", get(storefront::list_orders))
        .route("/orders/{order_number}", get(storefront::get_order))
        .route("/orders/{order_number}/payment", post(storefront::retry_payment))
        .route("/payments/callback", post(storefront::payment_callback))
        .route("/admin/orders", get(admin::list_orders))
        .route("/admin/orders/{id}", get(admin::get_order))
        .route("/admin/orders/{id}/status", patch(admin::change_status))
        .route("/admin/orders/{id}/refund", post(admin::refund))
        .with_state(state)
}

async fn health(State(state): State<AppState>) -> impl IntoResponse {
    if state.db.health_check().await {
        (StatusCode::OK, Json(json!({ "status": "ok" })))
    } else {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "status": "degraded", "database": "unreachable" })),
        )
    }
}

// =============================================================================
// Extractors
// =============================================================================

/// JSON body whose rejections render as [`ApiError`].
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

/// The cart/order owner, from `X-User-Id` or else `X-Guest-Token`.
pub struct Owner(pub CartOwner);

impl<S: Send + Sync> FromRequestParts<S> for Owner {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        if let Some(user) = header(parts, USER_HEADER)? {
            return Ok(Owner(CartOwner::User(user)));
        }
        if let Some(token) = header(parts, GUEST_HEADER)? {
            return Ok(Owner(CartOwner::Guest(token)));
        }
        Err(ApiError::validation("X-User-Id or X-Guest-Token header is required"))
    }
}

/// The operator acting on an admin route, from `X-Admin-Id`.
pub struct AdminActor(pub String);

impl<S: Send + Sync> FromRequestParts<S> for AdminActor {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        header(parts, ADMIN_HEADER)?
            .map(AdminActor)
            .ok_or_else(|| ApiError::validation("X-Admin-Id header is required"))
    }
}

fn header(parts: &Parts, name: &str) -> Result<Option<String>, ApiError> {
    let Some(value) = parts.headers.get(name) else {
        return Ok(None);
    };

    let value = value
        .to_str()
        .map_err(|_| ApiError::validation(format!("{name} must be ASCII")))?
        .trim();
    validate_reference(name, value).map_err(|e| ApiError::validation(e.to_string()))?;
    Ok(Some(value.to_string()))
}

#[cfg(test)]
mod tests;
