//! # Order Status State Machine
//!
//! The legal-edge table for orders and the side effects each edge implies.
//!
//! ## Transition Graph
//! ```text
//!                    ┌──────────────────┐
//!                    │ pending_payment  │──────────────┐
//!                    └───┬──────────┬───┘              │
//!                        │          │                  ▼
//!                        ▼          └────────────► failed
//!                    ┌────────┐
//!          ┌─────────│  paid  │──────────────────────────────┐
//!          │         └───┬────┘                              │
//!          │             ▼                                   │
//!          │      ┌────────────┐                             │
//!          │      │ processing │──────────┐                  │
//!          │      └─────┬──────┘          ▼                  │
//!          │            │       ┌───────────────────┐        │
//!          │            │       │ partially_shipped │        │
//!          │            ▼       └─────────┬─────────┘        │
//!          │      ┌──────────┐            │                  │
//!          │      │ shipped  │◄───────────┘                  │
//!          │      └────┬─────┘                               │
//!          │           ▼                                     ▼
//!          │     ┌───────────┐                        ┌────────────┐
//!          │     │ delivered │───────────────────────►│  refunded  │⟲
//!          │     └───────────┘                        └────────────┘
//!          ▼
//!     cancelled  ◄── from pending_payment, paid, processing,
//!                    partially_shipped, shipped
//! ```
//!
//! This module only answers "is this edge legal and what does it imply".
//! Executing the edge (guarded write, stock restore, outbox row) is the
//! service layer's job.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ts_rs::TS;

use crate::error::{CoreError, CoreResult, ValidationError};

// =============================================================================
// Order Status
// =============================================================================

/// Lifecycle status of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    PendingPayment,
    Paid,
    Processing,
    PartiallyShipped,
    Shipped,
    Delivered,
    Cancelled,
    Refunded,
    Failed,
}

impl OrderStatus {
    /// Every status, in lifecycle order.
    pub const ALL: [OrderStatus; 9] = [
        OrderStatus::PendingPayment,
        OrderStatus::Paid,
        OrderStatus::Processing,
        OrderStatus::PartiallyShipped,
        OrderStatus::Shipped,
        OrderStatus::Delivered,
        OrderStatus::Cancelled,
        OrderStatus::Refunded,
        OrderStatus::Failed,
    ];

    /// Wire and storage name.
    pub const fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::PendingPayment => "pending_payment",
            OrderStatus::Paid => "paid",
            OrderStatus::Processing => "processing",
            OrderStatus::PartiallyShipped => "partially_shipped",
            OrderStatus::Shipped => "shipped",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Cancelled => "cancelled",
            OrderStatus::Refunded => "refunded",
            OrderStatus::Failed => "failed",
        }
    }

    /// Outgoing edges of the status graph.
    pub const fn allowed_transitions(&self) -> &'static [OrderStatus] {
        use OrderStatus::*;
        match self {
            PendingPayment => &[Paid, Failed, Cancelled],
            Paid => &[Processing, Cancelled, Refunded],
            Processing => &[PartiallyShipped, Shipped, Cancelled],
            PartiallyShipped => &[Shipped, Cancelled],
            Shipped => &[Delivered, Cancelled],
            Delivered => &[Refunded],
            // Repeated partial refunds keep the order in place.
            Refunded => &[Refunded],
            Cancelled | Failed => &[],
        }
    }

    /// Checks whether `self → next` is an edge of the graph.
    pub fn can_transition_to(&self, next: OrderStatus) -> bool {
        self.allowed_transitions().contains(&next)
    }

    /// Terminal states. `refunded` is terminal even though it loops on itself.
    pub const fn is_terminal(&self) -> bool {
        matches!(
            self,
            OrderStatus::Delivered
                | OrderStatus::Cancelled
                | OrderStatus::Refunded
                | OrderStatus::Failed
        )
    }

    /// Goods have not left the warehouse yet.
    ///
    /// Cancelling from one of these puts the reserved stock back.
    pub const fn is_pre_shipment(&self) -> bool {
        matches!(
            self,
            OrderStatus::PendingPayment | OrderStatus::Paid | OrderStatus::Processing
        )
    }

    /// Money has been captured and not yet fully returned.
    pub const fn is_refundable(&self) -> bool {
        matches!(
            self,
            OrderStatus::Paid
                | OrderStatus::Processing
                | OrderStatus::PartiallyShipped
                | OrderStatus::Shipped
                | OrderStatus::Delivered
        )
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OrderStatus::ALL
            .iter()
            .copied()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| ValidationError::NotAllowed {
                field: "status".to_string(),
                allowed: OrderStatus::ALL.iter().map(|s| s.as_str().to_string()).collect(),
            })
    }
}

// =============================================================================
// Notifications
// =============================================================================

/// Customer notifications emitted by order state changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    /// Order accepted (sent once at placement).
    OrderPlaced,
    /// Payment captured.
    OrderPaid,
    /// Money returned, partial or full.
    RefundIssued,
}

impl NotificationKind {
    pub const fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::OrderPlaced => "order_placed",
            NotificationKind::OrderPaid => "order_paid",
            NotificationKind::RefundIssued => "refund_issued",
        }
    }
}

impl FromStr for NotificationKind {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "order_placed" => Ok(NotificationKind::OrderPlaced),
            "order_paid" => Ok(NotificationKind::OrderPaid),
            "refund_issued" => Ok(NotificationKind::RefundIssued),
            other => Err(ValidationError::InvalidFormat {
                field: "notification_kind".to_string(),
                reason: format!("unknown kind '{other}'"),
            }),
        }
    }
}

// =============================================================================
// Transition Plan
// =============================================================================

/// A validated edge together with the side effects it requires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub from: OrderStatus,
    pub to: OrderStatus,
    /// Put every order-item quantity back into the inventory ledger.
    pub restore_stock: bool,
    /// Queue this notification in the same unit of work.
    pub notify: Option<NotificationKind>,
}

impl Transition {
    /// Validates `from → to` and derives side effects.
    ///
    /// ## Side Effects
    /// | Edge                               | Effect            |
    /// |------------------------------------|-------------------|
    /// | pre-shipment → cancelled           | restore stock     |
    /// | pending_payment → failed           | restore stock     |
    /// | * → paid                           | notify OrderPaid  |
    /// | * → refunded                       | notify RefundIssued |
    ///
    /// ## Example
    /// ```rust
    /// use aurum_core::status::{OrderStatus, Transition};
    ///
    /// let t = Transition::plan(OrderStatus::Paid, OrderStatus::Cancelled).unwrap();
    /// assert!(t.restore_stock);
    ///
    /// assert!(Transition::plan(OrderStatus::Delivered, OrderStatus::Processing).is_err());
    /// ```
    pub fn plan(from: OrderStatus, to: OrderStatus) -> CoreResult<Transition> {
        if !from.can_transition_to(to) {
            return Err(CoreError::InvalidStatusTransition { from, to });
        }

        let restore_stock = match to {
            OrderStatus::Cancelled => from.is_pre_shipment(),
            OrderStatus::Failed => true,
            _ => false,
        };

        let notify = match to {
            OrderStatus::Paid => Some(NotificationKind::OrderPaid),
            OrderStatus::Refunded => Some(NotificationKind::RefundIssued),
            _ => None,
        };

        Ok(Transition {
            from,
            to,
            restore_stock,
            notify,
        })
    }

    /// True when the status value actually changes.
    pub fn changes_status(&self) -> bool {
        self.from != self.to
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use OrderStatus::*;

    const LEGAL: &[(OrderStatus, OrderStatus)] = &[
        (PendingPayment, Paid),
        (PendingPayment, Failed),
        (PendingPayment, Cancelled),
        (Paid, Processing),
        (Paid, Cancelled),
        (Paid, Refunded),
        (Processing, PartiallyShipped),
        (Processing, Shipped),
        (Processing, Cancelled),
        (PartiallyShipped, Shipped),
        (PartiallyShipped, Cancelled),
        (Shipped, Delivered),
        (Shipped, Cancelled),
        (Delivered, Refunded),
        (Refunded, Refunded),
    ];

    #[test]
    fn test_every_pair_matches_edge_table() {
        for from in OrderStatus::ALL {
            for to in OrderStatus::ALL {
                let expected = LEGAL.contains(&(from, to));
                assert_eq!(
                    from.can_transition_to(to),
                    expected,
                    "{from} -> {to} should be {}",
                    if expected { "legal" } else { "illegal" }
                );

                match Transition::plan(from, to) {
                    Ok(t) => assert!(expected, "{from} -> {to} planned but illegal: {t:?}"),
                    Err(CoreError::InvalidStatusTransition { from: f, to: t }) => {
                        assert!(!expected);
                        assert_eq!((f, t), (from, to));
                    }
                    Err(other) => panic!("unexpected error {other:?}"),
                }
            }
        }
    }

    #[test]
    fn test_terminal_states_have_no_exit() {
        for status in [Cancelled, Failed] {
            assert!(status.allowed_transitions().is_empty());
        }
        assert_eq!(Refunded.allowed_transitions(), &[Refunded]);
        assert!(Delivered.is_terminal());
    }

    #[test]
    fn test_stock_restore_only_before_shipment() {
        assert!(Transition::plan(PendingPayment, Cancelled).unwrap().restore_stock);
        assert!(Transition::plan(Paid, Cancelled).unwrap().restore_stock);
        assert!(Transition::plan(Processing, Cancelled).unwrap().restore_stock);
        assert!(!Transition::plan(PartiallyShipped, Cancelled).unwrap().restore_stock);
        assert!(!Transition::plan(Shipped, Cancelled).unwrap().restore_stock);
        assert!(Transition::plan(PendingPayment, Failed).unwrap().restore_stock);
        assert!(!Transition::plan(Paid, Processing).unwrap().restore_stock);
    }

    #[test]
    fn test_notifications() {
        assert_eq!(
            Transition::plan(PendingPayment, Paid).unwrap().notify,
            Some(NotificationKind::OrderPaid)
        );
        assert_eq!(
            Transition::plan(Delivered, Refunded).unwrap().notify,
            Some(NotificationKind::RefundIssued)
        );
        assert_eq!(Transition::plan(Shipped, Delivered).unwrap().notify, None);
        assert!(!Transition::plan(Refunded, Refunded).unwrap().changes_status());
    }

    #[test]
    fn test_status_parsing() {
        assert_eq!("partially_shipped".parse::<OrderStatus>().unwrap(), PartiallyShipped);
        assert!("shipping".parse::<OrderStatus>().is_err());
        for status in OrderStatus::ALL {
            assert_eq!(status.as_str().parse::<OrderStatus>().unwrap(), status);
            assert_eq!(
                serde_json::to_string(&status).unwrap(),
                format!("\"{}\"", status.as_str())
            );
        }
    }
}
