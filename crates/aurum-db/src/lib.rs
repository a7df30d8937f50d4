//! # aurum-db: Database Layer for the Aurum Storefront
//!
//! This crate provides database access for the checkout subsystem.
//! It uses SQLite with sqlx for async operations.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Aurum Checkout Data Flow                         │
//! │                                                                         │
//! │  HTTP handler (POST /checkout)                                          │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     aurum-db (THIS CRATE)                       │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐   │   │
//! │  │   │   Database    │    │  Repositories │    │  Migrations  │   │   │
//! │  │   │   (pool.rs)   │    │               │    │  (embedded)  │   │   │
//! │  │   │               │    │ VariantRepo   │    │              │   │   │
//! │  │   │ SqlitePool    │◄───│ CartRepo      │    │ 001_initial  │   │   │
//! │  │   │ Connection    │    │ OrderRepo     │    │ _schema.sql  │   │   │
//! │  │   │ Management    │    │ PaymentRepo   │    │              │   │   │
//! │  │   └───────────────┘    │ OutboxRepo    │    └──────────────┘   │   │
//! │  │                        └───────────────┘                        │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     SQLite Database                             │   │
//! │  │   <data dir>/aurum/aurum.db  (or in-memory for tests)           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - Repository implementations (inventory, cart, order, ...)
//!
//! ## Usage
//!
//! ```rust,ignore
//! use aurum_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("path/to/aurum.db")).await?;
//!
//! let cart = db.carts().load(&owner).await?;
//! let order = db.orders().get_by_number("AUR-20240315-9F3A0B1C").await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

#[cfg(test)]
mod test_support;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};

// Repository re-exports for convenience
pub use repository::address::AddressRepository;
pub use repository::cart::CartRepository;
pub use repository::inventory::VariantRepository;
pub use repository::order::{OrderFilter, OrderRepository, PlaceOutcome, StatusWrite};
pub use repository::outbox::{NewNotification, NotificationEntry, NotificationOutboxRepository};
pub use repository::payment::{CallbackWrite, PaymentEvent, PaymentRepository};
