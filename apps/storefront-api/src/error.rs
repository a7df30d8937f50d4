//! # API Error Type
//!
//! Service-level error union and its HTTP rendering.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  CoreError ──┐                                                          │
//! │  DbError ────┼──► ServiceError ──► kind() ──► ApiError ──► HTTP status  │
//! │  Gateway ────┘                                                          │
//! │                                                                         │
//! │  ErrorKind    Status   Storefront message            Admin detail       │
//! │  ──────────   ──────   ───────────────────────────   ─────────────────  │
//! │  Validation    400     one message per kind          full reason + data │
//! │  NotFound      404              "                            "          │
//! │  Conflict      409              "                            "          │
//! │  Upstream      502              "                            "          │
//! │  Internal      500              "                    message only       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Storefront responses carry no `detail`. Admin responses carry the
//! structured reason (SKU, shortfall, statuses) for triage.

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use serde_json::{json, Value};
use thiserror::Error;

use aurum_core::{CoreError, ErrorKind, ValidationError};
use aurum_db::DbError;

// =============================================================================
// Service Error
// =============================================================================

/// Everything a service operation can fail with.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("Storage error: {0}")]
    Db(#[from] DbError),

    /// The processor could not be reached or answered with a transport error.
    #[error("Payment gateway unavailable: {0}")]
    GatewayUnavailable(String),

    /// The processor answered and refused the request.
    #[error("Payment gateway rejected the request: {0}")]
    GatewayRejected(String),

    #[error("Notification delivery failed: {0}")]
    Notification(String),

    /// A bounded external call ran out of time.
    #[error("{operation} timed out after {after_ms}ms")]
    Timeout {
        operation: &'static str,
        after_ms: u64,
    },

    /// Guarded write kept losing to concurrent writers.
    ///
    /// ## When This Occurs
    /// - A cancellation and a payment callback race on the same order
    ///   more times than the retry budget allows
    #[error("Order {order_id} was modified concurrently, please retry")]
    ConcurrentModification { order_id: String },
}

impl ServiceError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ServiceError::Core(e) => e.kind(),
            ServiceError::Db(DbError::NotFound { .. }) => ErrorKind::NotFound,
            ServiceError::Db(_) => ErrorKind::Internal,
            ServiceError::GatewayUnavailable(_)
            | ServiceError::GatewayRejected(_)
            | ServiceError::Notification(_)
            | ServiceError::Timeout { .. } => ErrorKind::Upstream,
            ServiceError::ConcurrentModification { .. } => ErrorKind::Conflict,
        }
    }

    /// Structured reason for operators.
    fn detail(&self) -> Value {
        match self {
            ServiceError::Core(CoreError::InsufficientStock {
                sku,
                available,
                requested,
            }) => json!({
                "reason": "insufficient_stock",
                "sku": sku,
                "available": available,
                "requested": requested,
            }),
            ServiceError::Core(CoreError::InvalidStatusTransition { from, to }) => json!({
                "reason": "invalid_status_transition",
                "from": from,
                "to": to,
                "allowed": from.allowed_transitions(),
            }),
            ServiceError::Core(CoreError::RefundExceedsPaid {
                requested,
                refundable,
            }) => json!({
                "reason": "refund_exceeds_paid",
                "requested": requested,
                "refundable": refundable,
            }),
            ServiceError::Core(CoreError::OrderNotRefundable { status }) => json!({
                "reason": "order_not_refundable",
                "status": status,
            }),
            ServiceError::Core(CoreError::VariantUnavailable { sku, reason }) => json!({
                "reason": "variant_unavailable",
                "sku": sku,
                "why": reason,
            }),
            ServiceError::Timeout {
                operation,
                after_ms,
            } => json!({
                "reason": "timeout",
                "operation": operation,
                "afterMs": after_ms,
            }),
            ServiceError::ConcurrentModification { order_id } => json!({
                "reason": "concurrent_modification",
                "orderId": order_id,
            }),
            other => json!({ "reason": other.to_string() }),
        }
    }
}

impl From<ValidationError> for ServiceError {
    fn from(err: ValidationError) -> Self {
        ServiceError::Core(CoreError::Validation(err))
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;

// =============================================================================
// API Error
// =============================================================================

/// Error body returned by every route.
///
/// ## Serialization
/// ```json
/// {
///   "code": "CONFLICT",
///   "message": "Insufficient stock for RING-GLD-07: available 0, requested 1",
///   "detail": { "reason": "insufficient_stock", "sku": "RING-GLD-07", ... }
/// }
/// ```
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiError {
    /// Machine-readable error code for programmatic handling
    pub code: ErrorCode,

    /// Human-readable error message for display
    pub message: String,

    /// Structured reason; admin routes only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<Value>,
}

/// Error codes, one per [`ErrorKind`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Input validation failed (400)
    ValidationError,

    /// Resource not found (404)
    NotFound,

    /// State conflict: stock, status, refund balance (409)
    Conflict,

    /// Gateway or other collaborator failed (502)
    UpstreamError,

    /// Internal server error (500)
    Internal,
}

impl From<ErrorKind> for ErrorCode {
    fn from(kind: ErrorKind) -> Self {
        match kind {
            ErrorKind::Validation => ErrorCode::ValidationError,
            ErrorKind::NotFound => ErrorCode::NotFound,
            ErrorKind::Conflict => ErrorCode::Conflict,
            ErrorKind::Upstream => ErrorCode::UpstreamError,
            ErrorKind::Internal => ErrorCode::Internal,
        }
    }
}

impl ErrorCode {
    pub fn status(&self) -> StatusCode {
        match self {
            ErrorCode::ValidationError => StatusCode::BAD_REQUEST,
            ErrorCode::NotFound => StatusCode::NOT_FOUND,
            ErrorCode::Conflict => StatusCode::CONFLICT,
            ErrorCode::UpstreamError => StatusCode::BAD_GATEWAY,
            ErrorCode::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// The single customer-facing message for this kind.
    fn storefront_message(&self) -> &'static str {
        match self {
            ErrorCode::ValidationError => "Please check the details you entered and try again.",
            ErrorCode::NotFound => "We couldn't find what you were looking for.",
            ErrorCode::Conflict => {
                "Something in your cart or order changed. Please review it and try again."
            }
            ErrorCode::UpstreamError => {
                "Our payment partner is not responding right now. Please try again shortly."
            }
            ErrorCode::Internal => "Something went wrong on our side. Please try again.",
        }
    }
}

impl ApiError {
    /// Creates a new API error.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        ApiError {
            code,
            message: message.into(),
            detail: None,
        }
    }

    /// Creates a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::ValidationError, message)
    }

    /// Customer-facing rendering: one message per kind, no detail.
    pub fn storefront(err: ServiceError) -> Self {
        let code = ErrorCode::from(err.kind());
        log_error(&err, code);
        ApiError::new(code, code.storefront_message())
    }

    /// Back-office rendering: full message plus structured detail.
    pub fn admin(err: ServiceError) -> Self {
        let code = ErrorCode::from(err.kind());
        log_error(&err, code);

        if code == ErrorCode::Internal {
            return ApiError::new(code, code.storefront_message());
        }

        ApiError {
            code,
            message: err.to_string(),
            detail: Some(err.detail()),
        }
    }
}

fn log_error(err: &ServiceError, code: ErrorCode) {
    match code {
        ErrorCode::Internal => tracing::error!(error = %err, "Internal error"),
        ErrorCode::UpstreamError => tracing::warn!(error = %err, "Upstream failure"),
        _ => tracing::debug!(error = %err, "Request rejected"),
    }
}

/// Storefront is the default rendering for `?`.
impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        ApiError::storefront(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::validation(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.code.status(), Json(self)).into_response()
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{:?}] {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}
