//! # Payment Repository
//!
//! Initiation attempts and the callback dedupe ledger.
//!
//! ## Callback Write
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  BEGIN                                                                  │
//! │   ├── INSERT payment_events ... ON CONFLICT (transaction_id) DO NOTHING │
//! │   │      └── 0 rows → ROLLBACK, Duplicate (already handled)             │
//! │   ├── [status change planned]                                           │
//! │   │      guarded UPDATE orders ... WHERE status = :expected             │
//! │   │      └── 0 rows → ROLLBACK, Stale (caller re-reads and re-plans)    │
//! │   │      restore stock / history / outbox                               │
//! │  COMMIT → Applied, or Recorded when no status change was planned        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The event row and the status change commit together, so a replayed
//! callback can neither double-apply nor be lost halfway.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::DbResult;
use crate::repository::order::{apply_transition, StatusWrite};
use aurum_core::{Money, Order, PaymentOutcome};

/// One verified callback from the processor.
#[derive(Debug, Clone)]
pub struct PaymentEvent {
    pub transaction_id: String,
    pub gateway_reference: String,
    pub order_id: String,
    pub outcome: PaymentOutcome,
}

/// What [`PaymentRepository::apply_callback`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackWrite {
    /// Event recorded and the status change committed.
    Applied,
    /// Event recorded; no status change was needed.
    Recorded,
    /// The transaction id was seen before; nothing written.
    Duplicate,
    /// The order moved since it was read; nothing written.
    Stale,
}

/// Repository for payment attempts and callback events.
#[derive(Debug, Clone)]
pub struct PaymentRepository {
    pool: SqlitePool,
}

impl PaymentRepository {
    /// Creates a new PaymentRepository.
    pub fn new(pool: SqlitePool) -> Self {
        PaymentRepository { pool }
    }

    /// Records an initiation attempt and makes it the order's current
    /// reference.
    ///
    /// Returns `false` if the order is no longer awaiting payment.
    pub async fn record_attempt(
        &self,
        order_id: &str,
        gateway_reference: &str,
        amount: Money,
        redirect_url: Option<&str>,
    ) -> DbResult<bool> {
        debug!(order_id = %order_id, reference = %gateway_reference, "Recording payment attempt");

        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            r#"
            UPDATE orders SET gateway_reference = ?2, updated_at = ?3
            WHERE id = ?1 AND status = 'pending_payment'
            "#,
        )
        .bind(order_id)
        .bind(gateway_reference)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(false);
        }

        sqlx::query(
            r#"
            INSERT INTO payment_attempts (gateway_reference, order_id, amount, redirect_url, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
        )
        .bind(gateway_reference)
        .bind(order_id)
        .bind(amount)
        .bind(redirect_url)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(true)
    }

    /// Resolves any attempt's reference to its order.
    pub async fn order_id_for_reference(&self, gateway_reference: &str) -> DbResult<Option<String>> {
        let order_id: Option<String> =
            sqlx::query_scalar("SELECT order_id FROM payment_attempts WHERE gateway_reference = ?1")
                .bind(gateway_reference)
                .fetch_optional(&self.pool)
                .await?;

        Ok(order_id)
    }

    /// Whether a callback with this transaction id was already handled.
    pub async fn event_exists(&self, transaction_id: &str) -> DbResult<bool> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM payment_events WHERE transaction_id = ?1")
                .bind(transaction_id)
                .fetch_one(&self.pool)
                .await?;

        Ok(count > 0)
    }

    /// Number of attempts made for an order.
    pub async fn attempt_count(&self, order_id: &str) -> DbResult<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM payment_attempts WHERE order_id = ?1")
                .bind(order_id)
                .fetch_one(&self.pool)
                .await?;

        Ok(count)
    }

    /// Records a callback and applies its planned status change atomically.
    pub async fn apply_callback(
        &self,
        event: &PaymentEvent,
        order: &Order,
        write: Option<&StatusWrite<'_>>,
    ) -> DbResult<CallbackWrite> {
        debug!(
            order_id = %event.order_id,
            transaction_id = %event.transaction_id,
            outcome = ?event.outcome,
            "Applying payment callback"
        );

        let mut tx = self.pool.begin().await?;

        let inserted = sqlx::query(
            r#"
            INSERT INTO payment_events (transaction_id, gateway_reference, order_id, outcome, received_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT (transaction_id) DO NOTHING
            "#,
        )
        .bind(&event.transaction_id)
        .bind(&event.gateway_reference)
        .bind(&event.order_id)
        .bind(event.outcome)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;

        if inserted.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(CallbackWrite::Duplicate);
        }

        let Some(write) = write else {
            tx.commit().await?;
            return Ok(CallbackWrite::Recorded);
        };

        if !apply_transition(&mut tx, order, write).await? {
            tx.rollback().await?;
            return Ok(CallbackWrite::Stale);
        }

        tx.commit().await?;
        Ok(CallbackWrite::Applied)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{insert_gateway_order, test_db};
    use aurum_core::{OrderStatus, PaymentStatus, Transition};

    fn event(order: &Order, txn: &str, outcome: PaymentOutcome) -> PaymentEvent {
        PaymentEvent {
            transaction_id: txn.into(),
            gateway_reference: "ref-1".into(),
            order_id: order.id.clone(),
            outcome,
        }
    }

    #[tokio::test]
    async fn test_attempts_resolve_to_order() {
        let db = test_db().await;
        let order = insert_gateway_order(&db).await;
        let repo = db.payments();

        assert!(repo
            .record_attempt(&order.id, "ref-1", order.grand_total, Some("https://pay/ref-1"))
            .await
            .unwrap());
        assert!(repo
            .record_attempt(&order.id, "ref-2", order.grand_total, None)
            .await
            .unwrap());

        assert_eq!(repo.order_id_for_reference("ref-1").await.unwrap(), Some(order.id.clone()));
        assert_eq!(repo.order_id_for_reference("nope").await.unwrap(), None);
        assert_eq!(repo.attempt_count(&order.id).await.unwrap(), 2);

        let loaded = db.orders().get(&order.id).await.unwrap().unwrap();
        assert_eq!(loaded.payment.gateway_reference.as_deref(), Some("ref-2"));
    }

    #[tokio::test]
    async fn test_callback_applies_once() {
        let db = test_db().await;
        let order = insert_gateway_order(&db).await;
        let repo = db.payments();
        repo.record_attempt(&order.id, "ref-1", order.grand_total, None)
            .await
            .unwrap();

        let payment = order
            .payment
            .after_transition(OrderStatus::Paid, order.grand_total, Some("txn-1"));
        let write = StatusWrite {
            transition: Transition::plan(OrderStatus::PendingPayment, OrderStatus::Paid).unwrap(),
            payment: &payment,
            notes: None,
            actor: "gateway",
            notification: None,
        };
        let evt = event(&order, "txn-1", PaymentOutcome::Success);

        assert_eq!(
            repo.apply_callback(&evt, &order, Some(&write)).await.unwrap(),
            CallbackWrite::Applied
        );
        assert!(repo.event_exists("txn-1").await.unwrap());
        assert_eq!(
            repo.apply_callback(&evt, &order, Some(&write)).await.unwrap(),
            CallbackWrite::Duplicate
        );

        let loaded = db.orders().get(&order.id).await.unwrap().unwrap();
        assert_eq!(loaded.status, OrderStatus::Paid);
        assert_eq!(loaded.payment.status, PaymentStatus::Paid);
        assert_eq!(loaded.payment.transaction_id.as_deref(), Some("txn-1"));
        assert_eq!(loaded.payment.paid_amount, order.grand_total);

        // A fresh event against the stale snapshot loses the guard and is
        // not recorded.
        let late = event(&order, "txn-2", PaymentOutcome::Success);
        assert_eq!(
            repo.apply_callback(&late, &order, Some(&write)).await.unwrap(),
            CallbackWrite::Stale
        );
        assert!(!repo.event_exists("txn-2").await.unwrap());

        assert_eq!(
            repo.apply_callback(&late, &loaded, None).await.unwrap(),
            CallbackWrite::Recorded
        );
    }
}
