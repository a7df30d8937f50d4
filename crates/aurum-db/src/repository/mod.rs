//! # Repository Module
//!
//! Database repository implementations for the Aurum storefront.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  Service (storefront-api)                                               │
//! │       │                                                                 │
//! │       │  db.orders().transition(&order, &write)                         │
//! │       ▼                                                                 │
//! │  OrderRepository                                                        │
//! │  ├── place(&self, order, cart_owner, notification)                      │
//! │  ├── get / get_by_number / detail / list                                │
//! │  ├── transition(&self, order, write)       guarded on status            │
//! │  └── record_refund(&self, order, plan, ..) guarded on status + amount   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite Database                                                        │
//! │                                                                         │
//! │  Multi-table units of work run inside one transaction. The shared       │
//! │  pieces (stock decrement, cart clear, outbox enqueue) are free          │
//! │  functions taking `&mut SqliteConnection` so any repository can         │
//! │  compose them into its own transaction.                                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`VariantRepository`](inventory::VariantRepository) - Catalog variants and the stock ledger
//! - [`AddressRepository`](address::AddressRepository) - Owner-scoped address lookup
//! - [`CartRepository`](cart::CartRepository) - Guest and user carts
//! - [`OrderRepository`](order::OrderRepository) - Orders, history, refunds
//! - [`PaymentRepository`](payment::PaymentRepository) - Attempts and callback dedupe
//! - [`NotificationOutboxRepository`](outbox::NotificationOutboxRepository) - Notification queue

pub mod address;
pub mod cart;
pub mod inventory;
pub mod order;
pub mod outbox;
pub mod payment;
