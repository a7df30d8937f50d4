//! # Aurum Storefront API
//!
//! HTTP service for carts, checkout, payment callbacks and order admin.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Storefront API Server                            │
//! │                                                                         │
//! │  Browser / Admin ──► axum (8080) ──► services ──► aurum-db (SQLite)     │
//! │  Processor ────────► /payments/callback   │           │                 │
//! │                                           ▼           ▼                 │
//! │                                  PaymentGateway   notification_outbox   │
//! │                                  (timeout-bound)        │               │
//! │                                                         ▼               │
//! │                                              NotificationRelay ──►      │
//! │                                              Notifier (timeout-bound)   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Startup
//! 1. Load [`AppConfig`] (defaults, file, then `AURUM_*` env)
//! 2. Open the database and run migrations
//! 3. Spawn the notification relay
//! 4. Serve until Ctrl+C / SIGTERM, then stop the relay and close the pool

pub mod config;
pub mod error;
pub mod gateway;
pub mod notify;
pub mod routes;
pub mod services;
pub mod state;

#[cfg(test)]
mod test_support;

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use aurum_db::{Database, DbConfig};

pub use config::{AppConfig, ConfigError};
pub use error::{ApiError, ServiceError, ServiceResult};
pub use gateway::{PaymentGateway, SandboxGateway};
pub use notify::{LogNotifier, NotificationRelay, Notifier};
pub use routes::router;
pub use state::AppState;

const DEFAULT_LOG_FILTER: &str = "info,storefront_api=debug,aurum_db=debug,sqlx=warn";

/// Installs the global tracing subscriber. `RUST_LOG` overrides the default
/// filter.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .init();
}

/// Runs the server until a shutdown signal arrives.
pub async fn run(config: AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let db_path = config.database_path()?;
    info!(path = %db_path.display(), "Opening database");

    let db = Database::new(DbConfig::new(db_path).max_connections(config.database.max_connections)).await?;

    let gateway = Arc::new(SandboxGateway::new(config.gateway.redirect_base_url.clone()));
    let (relay, relay_handle) = NotificationRelay::new(
        db.clone(),
        Arc::new(LogNotifier),
        config.notifications.clone(),
    );
    let relay_task = tokio::spawn(relay.run());

    let addr: SocketAddr = format!("{}:{}", config.server.bind_addr, config.server.port).parse()?;
    let state = AppState::new(db.clone(), config, gateway).with_relay(relay_handle.clone());

    let listener = TcpListener::bind(addr).await?;
    info!(%addr, "Storefront API listening");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    relay_handle.shutdown().await;
    if let Err(e) = relay_task.await {
        error!(error = %e, "Notification relay task failed");
    }
    db.close().await;

    info!("Server shutdown complete");
    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, shutting down"),
        _ = terminate => info!("Received SIGTERM, shutting down"),
    }
}
