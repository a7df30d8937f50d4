//! # Notification Relay
//!
//! Delivers queued outbox rows to the email collaborator.
//!
//! ## Relay Loop
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │   interval tick ──┐                                                     │
//! │   wake()        ──┼──► pending(batch_size, max_attempts)                │
//! │                   │          │                                          │
//! │   shutdown ──► stop          ▼                                          │
//! │                       for each row:                                     │
//! │                         timeout(notifier.send(row))                     │
//! │                           ok  ──► mark_sent                             │
//! │                           err ──► mark_failed (attempts + 1)            │
//! │                                     └── attempts ≥ max → warn, skipped  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The relay only ever touches outbox rows. A failed delivery is logged
//! and retried on the next pass; it never reaches back into the order.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{mpsc, Notify};
use tracing::{debug, error, info, warn};

use aurum_db::{Database, NotificationEntry};

use crate::config::NotificationConfig;
use crate::error::ServiceError;
use crate::gateway::with_timeout;

// =============================================================================
// Notifier
// =============================================================================

/// Delivery failure reported by a notifier.
#[derive(Debug, thiserror::Error)]
#[error("{0}")]
pub struct NotifyError(pub String);

impl From<NotifyError> for ServiceError {
    fn from(err: NotifyError) -> Self {
        ServiceError::Notification(err.0)
    }
}

/// The email (or SMS) collaborator.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, entry: &NotificationEntry) -> Result<(), NotifyError>;
}

/// Writes notifications to the log instead of sending them.
#[derive(Debug, Clone, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, entry: &NotificationEntry) -> Result<(), NotifyError> {
        info!(
            order_id = %entry.order_id,
            kind = entry.kind.as_str(),
            recipient = %entry.recipient,
            payload = %entry.payload,
            "Notification"
        );
        Ok(())
    }
}

// =============================================================================
// Relay
// =============================================================================

/// Counts from one relay pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RelayStats {
    pub sent: usize,
    pub failed: usize,
    /// Rows that just used their last attempt.
    pub exhausted: usize,
}

/// Handle for nudging or stopping a running relay.
#[derive(Clone)]
pub struct RelayHandle {
    wake: Arc<Notify>,
    shutdown_tx: mpsc::Sender<()>,
}

impl RelayHandle {
    /// Asks the relay to run a pass now instead of waiting for the tick.
    pub fn wake(&self) {
        self.wake.notify_one();
    }

    /// Triggers graceful shutdown.
    pub async fn shutdown(&self) {
        if self.shutdown_tx.send(()).await.is_err() {
            debug!("Notification relay already stopped");
        }
    }
}

/// Polls the outbox and hands rows to the notifier.
pub struct NotificationRelay {
    db: Database,
    notifier: Arc<dyn Notifier>,
    config: NotificationConfig,
    wake: Arc<Notify>,
    shutdown_rx: mpsc::Receiver<()>,
}

impl NotificationRelay {
    /// Creates a relay and its handle.
    pub fn new(
        db: Database,
        notifier: Arc<dyn Notifier>,
        config: NotificationConfig,
    ) -> (Self, RelayHandle) {
        let wake = Arc::new(Notify::new());
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);

        let relay = NotificationRelay {
            db,
            notifier,
            config,
            wake: wake.clone(),
            shutdown_rx,
        };

        (relay, RelayHandle { wake, shutdown_tx })
    }

    /// Runs the relay loop.
    ///
    /// This should be spawned as a background task.
    pub async fn run(mut self) {
        info!("Notification relay starting");

        let mut interval =
            tokio::time::interval(Duration::from_secs(self.config.relay_interval_secs));
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = interval.tick() => {}
                _ = self.wake.notified() => {}
                _ = self.shutdown_rx.recv() => {
                    info!("Notification relay shutting down");
                    break;
                }
            }

            self.run_once().await;
        }

        info!("Notification relay stopped");
    }

    /// Delivers one batch of pending rows.
    pub async fn run_once(&self) -> RelayStats {
        let mut stats = RelayStats::default();

        let entries = match self
            .db
            .outbox()
            .pending(self.config.batch_size, self.config.max_attempts)
            .await
        {
            Ok(entries) => entries,
            Err(e) => {
                error!(error = %e, "Failed to read notification outbox");
                return stats;
            }
        };

        if entries.is_empty() {
            return stats;
        }

        debug!(count = entries.len(), "Relaying notifications");
        let limit = Duration::from_millis(self.config.timeout_ms);

        for entry in &entries {
            let delivered = with_timeout("notifier.send", limit, self.notifier.send(entry)).await;

            match delivered {
                Ok(()) => {
                    if let Err(e) = self.db.outbox().mark_sent(&entry.id).await {
                        error!(id = %entry.id, error = %e, "Failed to mark notification sent");
                    }
                    stats.sent += 1;
                }
                Err(send_err) => {
                    stats.failed += 1;
                    match self.db.outbox().mark_failed(&entry.id, &send_err.to_string()).await {
                        Ok(attempts) if attempts >= i64::from(self.config.max_attempts) => {
                            warn!(
                                id = %entry.id,
                                order_id = %entry.order_id,
                                kind = entry.kind.as_str(),
                                attempts = attempts,
                                error = %send_err,
                                "Notification exceeded max attempts, skipping"
                            );
                            stats.exhausted += 1;
                        }
                        Ok(attempts) => {
                            warn!(
                                id = %entry.id,
                                kind = entry.kind.as_str(),
                                attempts = attempts,
                                error = %send_err,
                                "Notification delivery failed, will retry"
                            );
                        }
                        Err(e) => {
                            error!(id = %entry.id, error = %e, "Failed to record notification failure");
                        }
                    }
                }
            }
        }

        stats
    }
}
