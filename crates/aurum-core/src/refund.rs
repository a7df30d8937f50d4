//! # Refund Rules
//!
//! Pure validation and planning for refunds. The service layer executes a
//! [`RefundPlan`] with a single guarded write.
//!
//! ## Checks, in order
//! ```text
//! amount ≤ 0                             → InvalidRefundAmount
//! amount > paid − refunded               → RefundExceedsPaid
//! status ∉ {paid … delivered}            → OrderNotRefundable
//! Full, but amount ≠ remaining           → InvalidRefundAmount
//! ```
//!
//! A partial refund that happens to settle the remaining balance counts as
//! full: the payment becomes `refunded`. The order moves to `refunded` only
//! where the status graph has that edge (`paid`, `delivered`); an order in
//! fulfilment (`processing` … `shipped`) keeps its status so the parcel can
//! still be tracked to the end.

use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::order::{Order, RefundType};
use crate::status::{OrderStatus, Transition};
use crate::types::PaymentStatus;
use crate::validation::{validate_notes, validate_required, MAX_REASON_LEN};

/// A validated refund request.
#[derive(Debug, Clone)]
pub struct RefundRequest {
    pub amount: Money,
    pub reason: String,
    pub notes: Option<String>,
    pub refund_type: RefundType,
    pub actor: String,
}

/// What a refund will do to the order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefundPlan {
    pub amount: Money,
    /// Recorded refund type; partial requests that settle the balance
    /// are recorded as full.
    pub refund_type: RefundType,
    pub reason: String,
    pub notes: Option<String>,
    /// Guard value for the conditional write.
    pub refunded_before: Money,
    pub refunded_after: Money,
    pub payment_status_after: PaymentStatus,
    /// `Some` only when the order moves (or loops) to `refunded`.
    pub transition: Option<Transition>,
}

impl RefundPlan {
    pub fn is_full(&self) -> bool {
        self.refund_type == RefundType::Full
    }

    pub fn status_after(&self, current: OrderStatus) -> OrderStatus {
        self.transition.map(|t| t.to).unwrap_or(current)
    }
}

/// Validates a refund against the order's current state.
///
/// ## Example
/// ```rust,ignore
/// let plan = plan_refund(&order, &request)?;
/// assert_eq!(plan.refunded_after, order.payment.refunded_amount + request.amount);
/// ```
pub fn plan_refund(order: &Order, request: &RefundRequest) -> CoreResult<RefundPlan> {
    if !request.amount.is_positive() {
        return Err(CoreError::InvalidRefundAmount {
            reason: "amount must be greater than zero".to_string(),
        });
    }

    let refundable = order.payment.refundable();
    if request.amount > refundable {
        return Err(CoreError::RefundExceedsPaid {
            requested: request.amount,
            refundable,
        });
    }

    if !order.status.is_refundable() {
        return Err(CoreError::OrderNotRefundable {
            status: order.status,
        });
    }

    let reason = validate_required("reason", &request.reason, MAX_REASON_LEN)?;
    let notes = validate_notes(request.notes.as_deref())?;

    let settles_balance = request.amount == refundable;
    if request.refund_type == RefundType::Full && !settles_balance {
        return Err(CoreError::InvalidRefundAmount {
            reason: format!("a full refund must equal the remaining {refundable}"),
        });
    }

    let transition = if settles_balance && order.status.can_transition_to(OrderStatus::Refunded) {
        Some(Transition::plan(order.status, OrderStatus::Refunded)?)
    } else {
        None
    };

    Ok(RefundPlan {
        amount: request.amount,
        refund_type: if settles_balance {
            RefundType::Full
        } else {
            RefundType::Partial
        },
        reason,
        notes,
        refunded_before: order.payment.refunded_amount,
        refunded_after: order.payment.refunded_amount + request.amount,
        payment_status_after: if settles_balance {
            PaymentStatus::Refunded
        } else {
            order.payment.status
        },
        transition,
    })
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::order::PaymentRecord;
    use crate::types::{AddressSnapshot, PaymentMethod};
    use chrono::Utc;

    fn paid_order(status: OrderStatus, paid: i64, refunded: i64) -> Order {
        Order {
            id: "ord-1".into(),
            order_number: "AUR-20240315-9F3A0B1C".into(),
            owner_key: "user:1".into(),
            status,
            items: vec![],
            shipping_address: AddressSnapshot {
                full_name: "A".into(),
                phone: "1".into(),
                line1: "L".into(),
                line2: None,
                city: "C".into(),
                state: "S".into(),
                postal_code: "P".into(),
                country: "IN".into(),
            },
            subtotal: Money::from_minor(30_000),
            shipping_total: Money::from_minor(7_000),
            cod_charge: Money::from_minor(4_000),
            tax_total: Money::zero(),
            discount_total: Money::zero(),
            grand_total: Money::from_minor(41_000),
            payment: PaymentRecord {
                method: PaymentMethod::Cod,
                status: PaymentStatus::Paid,
                transaction_id: None,
                gateway_reference: None,
                paid_amount: Money::from_minor(paid),
                refunded_amount: Money::from_minor(refunded),
            },
            notes: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn request(amount: i64, refund_type: RefundType) -> RefundRequest {
        RefundRequest {
            amount: Money::from_minor(amount),
            reason: "Customer returned item".into(),
            notes: None,
            refund_type,
            actor: "admin-1".into(),
        }
    }

    #[test]
    fn test_refund_exceeding_paid_is_rejected() {
        let order = paid_order(OrderStatus::Paid, 41_000, 0);
        let err = plan_refund(&order, &request(50_000, RefundType::Full)).unwrap_err();
        assert!(matches!(
            err,
            CoreError::RefundExceedsPaid { requested, refundable }
                if requested.minor() == 50_000 && refundable.minor() == 41_000
        ));
    }

    #[test]
    fn test_full_refund_moves_to_refunded() {
        let order = paid_order(OrderStatus::Paid, 41_000, 0);
        let plan = plan_refund(&order, &request(41_000, RefundType::Full)).unwrap();

        assert!(plan.is_full());
        assert_eq!(plan.payment_status_after, PaymentStatus::Refunded);
        assert_eq!(plan.status_after(order.status), OrderStatus::Refunded);
        assert_eq!(plan.refunded_after.minor(), 41_000);
    }

    #[test]
    fn test_partial_refunds_accumulate() {
        let order = paid_order(OrderStatus::Delivered, 41_000, 0);
        let plan = plan_refund(&order, &request(10_000, RefundType::Partial)).unwrap();
        assert!(!plan.is_full());
        assert!(plan.transition.is_none());
        assert_eq!(plan.payment_status_after, PaymentStatus::Paid);
        assert_eq!(plan.status_after(order.status), OrderStatus::Delivered);

        // Second partial refund over the remaining balance fails.
        let order = paid_order(OrderStatus::Delivered, 41_000, 35_000);
        assert!(matches!(
            plan_refund(&order, &request(7_000, RefundType::Partial)),
            Err(CoreError::RefundExceedsPaid { .. })
        ));

        // Settling the balance with a partial request counts as full.
        let plan = plan_refund(&order, &request(6_000, RefundType::Partial)).unwrap();
        assert!(plan.is_full());
        assert_eq!(plan.status_after(order.status), OrderStatus::Refunded);
    }

    #[test]
    fn test_invalid_amounts() {
        let order = paid_order(OrderStatus::Paid, 41_000, 0);
        for amount in [0, -1] {
            assert!(matches!(
                plan_refund(&order, &request(amount, RefundType::Partial)),
                Err(CoreError::InvalidRefundAmount { .. })
            ));
        }
        assert!(matches!(
            plan_refund(&order, &request(1_000, RefundType::Full)),
            Err(CoreError::InvalidRefundAmount { .. })
        ));
    }

    #[test]
    fn test_status_rules() {
        for status in [OrderStatus::PendingPayment, OrderStatus::Cancelled, OrderStatus::Failed] {
            let order = paid_order(status, 41_000, 0);
            assert!(matches!(
                plan_refund(&order, &request(1_000, RefundType::Partial)),
                Err(CoreError::OrderNotRefundable { .. })
            ));
        }

        let order = paid_order(OrderStatus::Shipped, 41_000, 0);
        assert!(plan_refund(&order, &request(1_000, RefundType::Partial)).is_ok());
    }

    #[test]
    fn test_full_refund_in_fulfilment_keeps_status() {
        for status in [
            OrderStatus::Processing,
            OrderStatus::PartiallyShipped,
            OrderStatus::Shipped,
        ] {
            let order = paid_order(status, 41_000, 0);
            for refund_type in [RefundType::Full, RefundType::Partial] {
                let plan = plan_refund(&order, &request(41_000, refund_type)).unwrap();
                assert!(plan.is_full());
                assert!(plan.transition.is_none());
                assert_eq!(plan.payment_status_after, PaymentStatus::Refunded);
                assert_eq!(plan.refunded_after.minor(), 41_000);
                assert_eq!(plan.status_after(status), status);
            }
        }
    }

    #[test]
    fn test_reason_required() {
        let order = paid_order(OrderStatus::Paid, 41_000, 0);
        let mut req = request(1_000, RefundType::Partial);
        req.reason = "  ".into();
        assert!(matches!(plan_refund(&order, &req), Err(CoreError::Validation(_))));
    }
}
