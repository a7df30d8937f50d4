use axum::body::{to_bytes, Body};
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use super::*;
use crate::test_support::{seed_address, seed_cod_order, seed_gateway_order, seed_variant, test_state};

async fn send(app: &Router, method: Method, uri: &str, headers: &[(&str, &str)], body: Option<Value>) -> (StatusCode, Value) {
    let mut request = Request::builder().method(method).uri(uri);
    for (name, value) in headers {
        request = request.header(*name, *value);
    }
    let request = match body {
        Some(body) => request
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => request.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

const USER_1: (&str, &str) = (USER_HEADER, "1");
const ADMIN: (&str, &str) = (ADMIN_HEADER, "admin-1");

#[tokio::test]
async fn test_health() {
    let app = router(test_state().await);
    let (status, body) = send(&app, Method::GET, "/health", &[], None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_cart_to_checkout_over_http() {
    let state = test_state().await;
    seed_variant(&state, "RING-A", 20_000, 5).await;
    seed_variant(&state, "CHARM-B", 5_000, 5).await;
    let address = seed_address(&state, "user:1").await;
    let app = router(state);

    let (status, _) = send(
        &app,
        Method::POST,
        "/cart/items",
        &[USER_1],
        Some(json!({ "variantSku": "RING-A", "quantity": 1 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (_, cart) = send(
        &app,
        Method::POST,
        "/cart/items",
        &[USER_1],
        Some(json!({ "variantSku": "CHARM-B", "quantity": 2 })),
    )
    .await;
    assert_eq!(cart["itemCount"], 2);

    let (status, cart) = send(&app, Method::GET, "/cart?paymentMethod=cod", &[USER_1], None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(cart["quote"]["grandTotal"], 41_000);

    let (status, placed) = send(
        &app,
        Method::POST,
        "/checkout",
        &[USER_1],
        Some(json!({ "addressId": address.id, "paymentMethod": "cod" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(placed["order"]["grandTotal"], 41_000);
    assert_eq!(placed["order"]["status"], "paid");
    assert!(placed.get("redirectUrl").is_none());

    let number = placed["order"]["orderNumber"].as_str().unwrap().to_string();
    let (status, order) = send(&app, Method::GET, &format!("/orders/{number}"), &[USER_1], None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(order["orderNumber"], number.as_str());

    let (status, _) = send(
        &app,
        Method::GET,
        &format!("/orders/{number}"),
        &[(USER_HEADER, "2")],
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, cart) = send(&app, Method::GET, "/cart", &[USER_1], None).await;
    assert_eq!(cart["itemCount"], 0);
}

#[tokio::test]
async fn test_storefront_errors_hide_detail() {
    let state = test_state().await;
    seed_variant(&state, "GONE-1", 9_000, 0).await;
    let address = seed_address(&state, "user:1").await;
    let app = router(state);

    send(
        &app,
        Method::POST,
        "/cart/items",
        &[USER_1],
        Some(json!({ "variantSku": "GONE-1", "quantity": 1 })),
    )
    .await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/checkout",
        &[USER_1],
        Some(json!({ "addressId": address.id, "paymentMethod": "cod" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "CONFLICT");
    assert!(body.get("detail").is_none());

    let (status, body) = send(&app, Method::GET, "/cart", &[], None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");

    let (status, body) = send(
        &app,
        Method::POST,
        "/checkout",
        &[USER_1],
        Some(json!({ "addressId": address.id, "paymentMethod": "cheque" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_admin_status_and_refund_show_structured_reason() {
    let state = test_state().await;
    let order = seed_cod_order(&state).await;
    let app = router(state);
    let base = format!("/admin/orders/{}", order.id);

    for status in ["processing", "shipped", "delivered"] {
        let (code, body) = send(
            &app,
            Method::PATCH,
            &format!("{base}/status"),
            &[ADMIN],
            Some(json!({ "status": status, "notes": "courier update" })),
        )
        .await;
        assert_eq!(code, StatusCode::OK);
        assert_eq!(body["status"], status);
    }

    let (code, body) = send(
        &app,
        Method::PATCH,
        &format!("{base}/status"),
        &[ADMIN],
        Some(json!({ "status": "processing" })),
    )
    .await;
    assert_eq!(code, StatusCode::CONFLICT);
    assert_eq!(body["detail"]["reason"], "invalid_status_transition");
    assert_eq!(body["detail"]["from"], "delivered");

    let paid = order.payment.paid_amount.minor();
    let (code, body) = send(
        &app,
        Method::POST,
        &format!("{base}/refund"),
        &[ADMIN],
        Some(json!({ "amount": paid + 1, "reason": "damaged", "refundType": "partial" })),
    )
    .await;
    assert_eq!(code, StatusCode::CONFLICT);
    assert_eq!(body["detail"]["reason"], "refund_exceeds_paid");
    assert_eq!(body["detail"]["refundable"], paid);

    let (code, body) = send(
        &app,
        Method::POST,
        &format!("{base}/refund"),
        &[ADMIN],
        Some(json!({ "amount": paid, "reason": "damaged", "refundType": "full" })),
    )
    .await;
    assert_eq!(code, StatusCode::OK);
    assert_eq!(body["status"], "refunded");

    let (code, detail) = send(&app, Method::GET, &base, &[ADMIN], None).await;
    assert_eq!(code, StatusCode::OK);
    assert_eq!(detail["refunds"].as_array().unwrap().len(), 1);

    let (code, _) = send(&app, Method::GET, &base, &[], None).await;
    assert_eq!(code, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_callback_replay_returns_ok() {
    let state = test_state().await;
    let (order, reference) = seed_gateway_order(&state).await;
    let app = router(state.clone());

    let callback = json!({
        "gatewayReference": reference,
        "outcome": "success",
        "transactionId": "txn_http_1",
    });

    let (code, body) = send(&app, Method::POST, "/payments/callback", &[], Some(callback.clone())).await;
    assert_eq!(code, StatusCode::OK);
    assert_eq!(body["result"], "applied");
    assert_eq!(body["status"], "paid");

    let (code, body) = send(&app, Method::POST, "/payments/callback", &[], Some(callback)).await;
    assert_eq!(code, StatusCode::OK);
    assert_eq!(body["result"], "duplicate");

    let (code, page) = send(&app, Method::GET, "/admin/orders?status=paid", &[ADMIN], None).await;
    assert_eq!(code, StatusCode::OK);
    assert_eq!(page["total"], 1);
    assert_eq!(page["items"][0]["id"], order.id.as_str());
}
