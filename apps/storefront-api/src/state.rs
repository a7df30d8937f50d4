//! # Application State
//!
//! Everything a handler or service needs, cloned per request.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                           AppState                                      │
//! │                                                                         │
//! │  db           Database (SQLite pool, internally shared)                 │
//! │  config       Arc<AppConfig>, read-only after startup                   │
//! │  pricing      PricingConfig (Copy), resolved once from config           │
//! │  gateway      Arc<dyn PaymentGateway>                                   │
//! │  adjustments  Arc<dyn AdjustmentRule> (from [pricing] tax_rate_bps)      │
//! │  order_locks  per-order async mutexes for refunds                       │
//! │  relay        optional handle to wake the notification relay            │
//! │                                                                         │
//! │  THREAD SAFETY:                                                         │
//! │  • Database: pool is thread-safe                                        │
//! │  • Collaborators: Send + Sync trait objects                             │
//! │  • OrderLocks: map behind a Mutex, held only to clone an entry          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, OwnedMutexGuard};

use aurum_core::pricing::AdjustmentRule;
use aurum_core::PricingConfig;
use aurum_db::Database;

use crate::config::AppConfig;
use crate::gateway::PaymentGateway;
use crate::notify::RelayHandle;

#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub config: Arc<AppConfig>,
    pub pricing: PricingConfig,
    pub gateway: Arc<dyn PaymentGateway>,
    pub adjustments: Arc<dyn AdjustmentRule>,
    pub order_locks: OrderLocks,
    pub relay: Option<RelayHandle>,
}

impl AppState {
    pub fn new(db: Database, config: AppConfig, gateway: Arc<dyn PaymentGateway>) -> Self {
        AppState {
            pricing: config.pricing_config(),
            adjustments: config.adjustment_rule(),
            db,
            config: Arc::new(config),
            gateway,
            order_locks: OrderLocks::default(),
            relay: None,
        }
    }

    pub fn with_relay(mut self, relay: RelayHandle) -> Self {
        self.relay = Some(relay);
        self
    }

    /// Nudges the relay after a commit that queued a notification.
    pub fn notify_relay(&self) {
        if let Some(relay) = &self.relay {
            relay.wake();
        }
    }
}

/// Serializes operations on one order that span an external call.
///
/// Guarded writes already prevent contradictory states; this lock keeps
/// two refunds for the same order from both reaching the gateway.
#[derive(Clone, Default)]
pub struct OrderLocks {
    inner: Arc<Mutex<HashMap<String, Arc<Mutex<()>>>>>,
}

impl OrderLocks {
    /// Waits for exclusive access to `order_id`.
    pub async fn acquire(&self, order_id: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut map = self.inner.lock().await;
            // Drop entries nobody is waiting on.
            map.retain(|_, lock| Arc::strong_count(lock) > 1);
            map.entry(order_id.to_string()).or_default().clone()
        };
        lock.lock_owned().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_order_locks_serialize_same_order() {
        let locks = OrderLocks::default();
        let guard = locks.acquire("o-1").await;

        let contender = {
            let locks = locks.clone();
            tokio::spawn(async move {
                let _g = locks.acquire("o-1").await;
            })
        };

        // A different order is not blocked.
        let other = tokio::time::timeout(Duration::from_millis(200), locks.acquire("o-2")).await;
        assert!(other.is_ok());

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!contender.is_finished());

        drop(guard);
        tokio::time::timeout(Duration::from_secs(1), contender)
            .await
            .unwrap()
            .unwrap();
    }
}
