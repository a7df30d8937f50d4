//! # Payment Gateway Adapter
//!
//! The external card/UPI processor, seen through a narrow trait.
//!
//! ## Call Shape
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  checkout / retry ──► initiate(order) ──► { reference, redirect_url }   │
//! │                                                                         │
//! │  processor ──► POST /payments/callback ──► applyResult (services)       │
//! │                                                                         │
//! │  refund processor ──► refund(txn, amount) ──► { refund_id }             │
//! │                                                                         │
//! │  Every call runs under `with_timeout`; a timeout is an Upstream error   │
//! │  and never leaves the order half-changed.                               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! No funds move at initiation, so a failed or timed-out `initiate` can be
//! retried against the same order with a fresh reference.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

use aurum_core::Money;

use crate::error::{ServiceError, ServiceResult};

// =============================================================================
// Types
// =============================================================================

/// Failure reported by a gateway implementation.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("transport failure: {0}")]
    Unavailable(String),

    #[error("{0}")]
    Rejected(String),
}

impl From<GatewayError> for ServiceError {
    fn from(err: GatewayError) -> Self {
        match err {
            GatewayError::Unavailable(msg) => ServiceError::GatewayUnavailable(msg),
            GatewayError::Rejected(msg) => ServiceError::GatewayRejected(msg),
        }
    }
}

/// What the processor needs to open a payment session.
#[derive(Debug, Clone)]
pub struct InitiateRequest {
    pub order_id: String,
    pub order_number: String,
    pub amount: Money,
    /// Attempt number, 1-based.
    pub attempt: i64,
}

/// An opened payment session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Initiation {
    pub gateway_reference: String,
    pub redirect_url: Option<String>,
}

#[derive(Debug, Clone)]
pub struct RefundCall {
    pub order_id: String,
    pub transaction_id: Option<String>,
    pub amount: Money,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayRefund {
    pub refund_id: String,
}

// =============================================================================
// Trait
// =============================================================================

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Opens a payment session for a pending order.
    async fn initiate(&self, request: &InitiateRequest) -> Result<Initiation, GatewayError>;

    /// Returns money for a captured payment.
    async fn refund(&self, call: &RefundCall) -> Result<GatewayRefund, GatewayError>;
}

/// Runs an external call with a deadline.
///
/// ## Errors
/// - `ServiceError::Timeout` when `limit` elapses first
/// - The call's own error, converted
pub async fn with_timeout<T, E, F>(operation: &'static str, limit: Duration, call: F) -> ServiceResult<T>
where
    F: Future<Output = Result<T, E>>,
    E: Into<ServiceError>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result.map_err(Into::into),
        Err(_) => Err(ServiceError::Timeout {
            operation,
            after_ms: limit.as_millis() as u64,
        }),
    }
}

// =============================================================================
// Sandbox Gateway
// =============================================================================

/// Local processor stand-in: hands out references and always accepts.
///
/// The processor's callback is simulated by posting to
/// `/payments/callback` with the returned reference.
#[derive(Debug, Clone)]
pub struct SandboxGateway {
    redirect_base_url: String,
}

impl SandboxGateway {
    pub fn new(redirect_base_url: impl Into<String>) -> Self {
        SandboxGateway {
            redirect_base_url: redirect_base_url.into().trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl PaymentGateway for SandboxGateway {
    async fn initiate(&self, request: &InitiateRequest) -> Result<Initiation, GatewayError> {
        let reference = format!("pay_{}", Uuid::new_v4().simple());
        debug!(
            order_number = %request.order_number,
            amount = %request.amount,
            attempt = request.attempt,
            reference = %reference,
            "Sandbox payment session opened"
        );

        Ok(Initiation {
            redirect_url: Some(format!("{}/{}", self.redirect_base_url, reference)),
            gateway_reference: reference,
        })
    }

    async fn refund(&self, call: &RefundCall) -> Result<GatewayRefund, GatewayError> {
        if call.transaction_id.is_none() {
            return Err(GatewayError::Rejected(format!(
                "order {} has no captured transaction",
                call.order_id
            )));
        }

        Ok(GatewayRefund {
            refund_id: format!("rfnd_{}", Uuid::new_v4().simple()),
        })
    }
}
