//! # Notification Outbox Repository
//!
//! Reliable, at-least-once customer notifications.
//!
//! ## Outbox Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  state change transaction                 notification relay            │
//! │  ┌──────────────────────────┐             ┌──────────────────────────┐  │
//! │  │ UPDATE orders ...        │             │ SELECT pending rows      │  │
//! │  │ INSERT history ...       │   commit    │ notifier.send(row)       │  │
//! │  │ INSERT notification_     │ ──────────► │   ok  → mark_sent        │  │
//! │  │        outbox ...        │             │   err → mark_failed      │  │
//! │  └──────────────────────────┘             └──────────────────────────┘  │
//! │                                                                         │
//! │  The row commits or rolls back with the state change, so a crash can    │
//! │  never send an email for a change that didn't happen, nor lose one for  │
//! │  a change that did. Delivery failures never touch the order.            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{FromRow, SqliteConnection, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::error::DbResult;
use aurum_core::NotificationKind;

/// A queued notification.
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct NotificationEntry {
    pub id: String,
    pub order_id: String,
    pub kind: NotificationKind,
    /// Owner key of the order (`user:<id>` / `guest:<token>`).
    pub recipient: String,
    /// JSON body for the template.
    pub payload: String,
    pub attempts: i64,
    pub last_error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub attempted_at: Option<DateTime<Utc>>,
    pub sent_at: Option<DateTime<Utc>>,
}

/// A notification to enqueue.
#[derive(Debug, Clone)]
pub struct NewNotification {
    pub order_id: String,
    pub kind: NotificationKind,
    pub recipient: String,
    pub payload: serde_json::Value,
}

/// Repository for the notification outbox.
#[derive(Debug, Clone)]
pub struct NotificationOutboxRepository {
    pool: SqlitePool,
}

impl NotificationOutboxRepository {
    /// Creates a new NotificationOutboxRepository.
    pub fn new(pool: SqlitePool) -> Self {
        NotificationOutboxRepository { pool }
    }

    /// Unsent entries that still have attempts left, oldest first.
    pub async fn pending(&self, limit: u32, max_attempts: u32) -> DbResult<Vec<NotificationEntry>> {
        let entries = sqlx::query_as::<_, NotificationEntry>(
            r#"
            SELECT id, order_id, kind, recipient, payload, attempts,
                   last_error, created_at, attempted_at, sent_at
            FROM notification_outbox
            WHERE sent_at IS NULL AND attempts < ?2
            ORDER BY created_at ASC, rowid ASC
            LIMIT ?1
            "#,
        )
        .bind(limit)
        .bind(max_attempts)
        .fetch_all(&self.pool)
        .await?;

        Ok(entries)
    }

    /// Marks an entry as delivered.
    pub async fn mark_sent(&self, id: &str) -> DbResult<()> {
        let now = Utc::now();

        sqlx::query(
            r#"
            UPDATE notification_outbox SET
                sent_at = ?2,
                attempted_at = ?2,
                attempts = attempts + 1
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Records a delivery failure. Returns the new attempt count.
    pub async fn mark_failed(&self, id: &str, error: &str) -> DbResult<i64> {
        let attempts: i64 = sqlx::query_scalar(
            r#"
            UPDATE notification_outbox SET
                attempts = attempts + 1,
                last_error = ?2,
                attempted_at = ?3
            WHERE id = ?1
            RETURNING attempts
            "#,
        )
        .bind(id)
        .bind(error)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;

        Ok(attempts)
    }

    /// Counts unsent entries.
    pub async fn count_pending(&self) -> DbResult<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM notification_outbox WHERE sent_at IS NULL")
                .fetch_one(&self.pool)
                .await?;

        Ok(count)
    }

    /// All entries for one order, oldest first.
    pub async fn for_order(&self, order_id: &str) -> DbResult<Vec<NotificationEntry>> {
        let entries = sqlx::query_as::<_, NotificationEntry>(
            r#"
            SELECT id, order_id, kind, recipient, payload, attempts,
                   last_error, created_at, attempted_at, sent_at
            FROM notification_outbox
            WHERE order_id = ?1
            ORDER BY created_at ASC, rowid ASC
            "#,
        )
        .bind(order_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(entries)
    }
}

/// Enqueues a notification inside the caller's transaction.
pub async fn enqueue(conn: &mut SqliteConnection, notification: &NewNotification) -> DbResult<()> {
    debug!(
        order_id = %notification.order_id,
        kind = notification.kind.as_str(),
        "Queuing notification"
    );

    sqlx::query(
        r#"
        INSERT INTO notification_outbox (
            id, order_id, kind, recipient, payload, attempts, created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, 0, ?6)
        "#,
    )
    .bind(Uuid::new_v4().to_string())
    .bind(&notification.order_id)
    .bind(notification.kind)
    .bind(&notification.recipient)
    .bind(notification.payload.to_string())
    .bind(Utc::now())
    .execute(&mut *conn)
    .await?;

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{insert_order, test_db};

    #[tokio::test]
    async fn test_enqueue_and_deliver() {
        let db = test_db().await;
        let order = insert_order(&db).await;
        let repo = db.outbox();

        let mut conn = db.pool().acquire().await.unwrap();
        enqueue(
            &mut conn,
            &NewNotification {
                order_id: order.id.clone(),
                kind: NotificationKind::OrderPaid,
                recipient: order.owner_key.clone(),
                payload: serde_json::json!({ "orderNumber": order.order_number }),
            },
        )
        .await
        .unwrap();
        drop(conn);

        // insert_order queues the placement notification too.
        let pending = repo.pending(10, 5).await.unwrap();
        assert_eq!(pending.len(), 2);
        let paid = pending
            .iter()
            .find(|e| e.kind == NotificationKind::OrderPaid)
            .unwrap();

        assert_eq!(repo.mark_failed(&paid.id, "smtp down").await.unwrap(), 1);
        repo.mark_sent(&paid.id).await.unwrap();

        let entries = repo.for_order(&order.id).await.unwrap();
        let paid = entries.iter().find(|e| e.id == paid.id).unwrap();
        assert!(paid.sent_at.is_some());
        assert_eq!(paid.last_error.as_deref(), Some("smtp down"));
        assert_eq!(repo.count_pending().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_exhausted_entries_are_skipped() {
        let db = test_db().await;
        let order = insert_order(&db).await;
        let repo = db.outbox();

        let entry = repo.pending(10, 3).await.unwrap().remove(0);
        for _ in 0..3 {
            repo.mark_failed(&entry.id, "bounce").await.unwrap();
        }

        assert!(repo.pending(10, 3).await.unwrap().is_empty());
        assert_eq!(repo.pending(10, 4).await.unwrap().len(), 1);
        assert_eq!(repo.for_order(&order.id).await.unwrap().len(), 1);
    }
}
