//! Fixtures shared by the repository tests.

use chrono::Utc;
use uuid::Uuid;

use crate::pool::{Database, DbConfig};
use crate::repository::order::PlaceOutcome;
use crate::repository::outbox::NewNotification;
use aurum_core::order::NewOrder;
use aurum_core::pricing::NoAdjustments;
use aurum_core::{
    Address, CodInitialStatus, Money, NotificationKind, Order, PaymentMethod, PricingConfig,
    Variant,
};

pub(crate) async fn test_db() -> Database {
    Database::new(DbConfig::in_memory())
        .await
        .expect("in-memory database")
}

pub(crate) async fn seed_variant(db: &Database, sku: &str, price: i64, stock: i64) -> Variant {
    let variant = Variant {
        id: Uuid::new_v4().to_string(),
        product_id: format!("prod-{sku}"),
        sku: sku.to_string(),
        product_name: format!("Product {sku}"),
        label: "Standard".to_string(),
        color: Some("Rose Gold".to_string()),
        image_ref: Some(format!("products/{sku}.jpg")),
        price: Money::from_minor(price),
        stock,
        is_active: true,
        is_price_on_demand: false,
        updated_at: Utc::now(),
    };
    db.variants().upsert(&variant).await.expect("seed variant");
    variant
}

pub(crate) async fn seed_address(db: &Database, owner_key: &str) -> Address {
    let address = Address {
        id: Uuid::new_v4().to_string(),
        owner_key: owner_key.to_string(),
        full_name: "Meera Iyer".to_string(),
        phone: "+919800000000".to_string(),
        line1: "12 MG Road".to_string(),
        line2: None,
        city: "Bengaluru".to_string(),
        state: "KA".to_string(),
        postal_code: "560001".to_string(),
        country: "IN".to_string(),
    };
    db.addresses().insert(&address).await.expect("seed address");
    address
}

/// Builds (does not persist) an order for the address owner.
pub(crate) fn build_order_with(
    lines: Vec<(Variant, i64)>,
    address: &Address,
    method: PaymentMethod,
) -> Order {
    let pricing = PricingConfig::default();
    Order::place(NewOrder {
        owner_key: address.owner_key.clone(),
        lines,
        address: address.snapshot(),
        method,
        cod_initial_status: CodInitialStatus::Paid,
        notes: None,
        pricing: &pricing,
        adjustments: &NoAdjustments,
    })
    .expect("valid order")
}

/// COD order, created directly in `paid`.
pub(crate) fn build_order(lines: Vec<(Variant, i64)>, address: &Address) -> Order {
    build_order_with(lines, address, PaymentMethod::Cod)
}

pub(crate) fn placed_notification(order: &Order) -> NewNotification {
    NewNotification {
        order_id: order.id.clone(),
        kind: NotificationKind::OrderPlaced,
        recipient: order.owner_key.clone(),
        payload: serde_json::json!({ "orderNumber": order.order_number }),
    }
}

async fn persist(db: &Database, order: Order) -> Order {
    let outcome = db
        .orders()
        .place(&order, Some(&order.owner_key), &placed_notification(&order))
        .await
        .expect("place order");
    assert_eq!(outcome, PlaceOutcome::Placed);
    order
}

/// A paid COD order for `user:1` with one line; queues one OrderPlaced.
pub(crate) async fn insert_order(db: &Database) -> Order {
    let sku = format!("RING-{}", &Uuid::new_v4().simple().to_string()[..8]);
    let variant = seed_variant(db, &sku, 20_000, 10).await;
    let address = seed_address(db, "user:1").await;
    persist(db, build_order(vec![(variant, 2)], &address)).await
}

/// A gateway order for `user:1` awaiting payment.
pub(crate) async fn insert_gateway_order(db: &Database) -> Order {
    let sku = format!("PERF-{}", &Uuid::new_v4().simple().to_string()[..8]);
    let variant = seed_variant(db, &sku, 60_000, 10).await;
    let address = seed_address(db, "user:1").await;
    persist(
        db,
        build_order_with(vec![(variant, 1)], &address, PaymentMethod::Gateway),
    )
    .await
}
