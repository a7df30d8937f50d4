//! Fixtures and collaborator fakes shared by the service and route tests.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use aurum_core::{Address, CartOwner, Money, Order, PaymentMethod, Variant};
use aurum_db::{Database, DbConfig, NotificationEntry};

use crate::config::AppConfig;
use crate::gateway::{
    GatewayError, GatewayRefund, InitiateRequest, Initiation, PaymentGateway, RefundCall,
};
use crate::notify::{Notifier, NotifyError};
use crate::services::carts::{add_item, AddItemRequest};
use crate::services::checkout::{place_order, CheckoutRequest};
use crate::state::AppState;

// =============================================================================
// Fakes
// =============================================================================

/// In-memory processor that counts calls and can be switched off.
#[derive(Debug, Default)]
pub(crate) struct FakeGateway {
    failing: AtomicBool,
    initiations: AtomicUsize,
    refunds: AtomicUsize,
}

impl FakeGateway {
    pub(crate) fn failing() -> Self {
        let gateway = FakeGateway::default();
        gateway.set_failing(true);
        gateway
    }

    pub(crate) fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub(crate) fn initiations(&self) -> usize {
        self.initiations.load(Ordering::SeqCst)
    }

    pub(crate) fn refunds(&self) -> usize {
        self.refunds.load(Ordering::SeqCst)
    }

    fn check(&self) -> Result<(), GatewayError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(GatewayError::Unavailable("connection refused".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl PaymentGateway for FakeGateway {
    async fn initiate(&self, request: &InitiateRequest) -> Result<Initiation, GatewayError> {
        self.check()?;
        self.initiations.fetch_add(1, Ordering::SeqCst);

        let reference = format!("fake_{}_{}", request.attempt, Uuid::new_v4().simple());
        Ok(Initiation {
            redirect_url: Some(format!("https://pay.test/{reference}")),
            gateway_reference: reference,
        })
    }

    async fn refund(&self, _call: &RefundCall) -> Result<GatewayRefund, GatewayError> {
        self.check()?;
        let n = self.refunds.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(GatewayRefund {
            refund_id: format!("rfnd_fake_{n}"),
        })
    }
}

#[derive(Debug, Clone, Copy, Default)]
enum Delivery {
    #[default]
    Ok,
    Fail,
    Hang,
}

/// Notifier that remembers what it was asked to send.
#[derive(Debug, Default)]
pub(crate) struct RecordingNotifier {
    delivery: Delivery,
    sent: Mutex<Vec<(String, String)>>,
}

impl RecordingNotifier {
    pub(crate) fn failing() -> Self {
        RecordingNotifier {
            delivery: Delivery::Fail,
            ..Default::default()
        }
    }

    pub(crate) fn hanging() -> Self {
        RecordingNotifier {
            delivery: Delivery::Hang,
            ..Default::default()
        }
    }

    pub(crate) fn kinds_for(&self, order_id: &str) -> Vec<String> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .filter(|(id, _)| id == order_id)
            .map(|(_, kind)| kind.clone())
            .collect()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, entry: &NotificationEntry) -> Result<(), NotifyError> {
        match self.delivery {
            Delivery::Ok => {}
            Delivery::Fail => return Err(NotifyError("smtp 421".into())),
            Delivery::Hang => tokio::time::sleep(Duration::from_secs(30)).await,
        }

        self.sent
            .lock()
            .unwrap()
            .push((entry.order_id.clone(), entry.kind.as_str().to_string()));
        Ok(())
    }
}

// =============================================================================
// State and Seeds
// =============================================================================

pub(crate) async fn test_state() -> AppState {
    test_state_with(Arc::new(FakeGateway::default())).await
}

pub(crate) async fn test_state_with(gateway: Arc<FakeGateway>) -> AppState {
    let db = Database::new(DbConfig::in_memory())
        .await
        .expect("in-memory database");
    AppState::new(db, AppConfig::default(), gateway)
}

pub(crate) async fn seed_variant(state: &AppState, sku: &str, price: i64, stock: i64) -> Variant {
    let variant = Variant {
        id: Uuid::new_v4().to_string(),
        product_id: format!("prod-{sku}"),
        sku: sku.to_string(),
        product_name: format!("Product {sku}"),
        label: "M".to_string(),
        color: Some("Yellow Gold".to_string()),
        image_ref: None,
        price: Money::from_minor(price),
        stock,
        is_active: true,
        is_price_on_demand: false,
        updated_at: Utc::now(),
    };
    state.db.variants().upsert(&variant).await.expect("seed variant");
    variant
}

pub(crate) async fn seed_address(state: &AppState, owner_key: &str) -> Address {
    let address = Address {
        id: Uuid::new_v4().to_string(),
        owner_key: owner_key.to_string(),
        full_name: "Anika Rao".to_string(),
        phone: "+919811111111".to_string(),
        line1: "4 Park Street".to_string(),
        line2: None,
        city: "Kolkata".to_string(),
        state: "WB".to_string(),
        postal_code: "700016".to_string(),
        country: "IN".to_string(),
    };
    state.db.addresses().insert(&address).await.expect("seed address");
    address
}

fn unique(prefix: &str) -> String {
    format!("{prefix}-{}", &Uuid::new_v4().simple().to_string()[..8])
}

/// Fills `owner`'s cart with fresh variants and checks out.
async fn checkout(
    state: &AppState,
    owner: &CartOwner,
    lines: &[(&str, i64, i64)],
    method: PaymentMethod,
) -> crate::services::checkout::CheckoutOutcome {
    for (prefix, price, quantity) in lines {
        let variant = seed_variant(state, &unique(prefix), *price, 10).await;
        add_item(
            state,
            owner,
            AddItemRequest {
                product_id: None,
                variant_id: Some(variant.id),
                variant_sku: None,
                quantity: *quantity,
            },
        )
        .await
        .expect("add to cart");
    }

    let address = seed_address(state, &owner.key()).await;
    place_order(
        state,
        owner,
        CheckoutRequest {
            address_id: address.id,
            payment_method: method,
            notes: None,
        },
    )
    .await
    .expect("checkout")
}

/// A paid COD order for `user:1`: two rings at 200.00.
pub(crate) async fn seed_cod_order(state: &AppState) -> Order {
    let owner = CartOwner::User("1".into());
    checkout(state, &owner, &[("RING", 20_000, 2)], PaymentMethod::Cod)
        .await
        .order
}

/// A paid COD order for `user:1` with a grand total of 410.00.
pub(crate) async fn seed_cod_order_totalling(state: &AppState) -> Order {
    let owner = CartOwner::User("1".into());
    checkout(
        state,
        &owner,
        &[("RING", 20_000, 1), ("CHARM", 5_000, 2)],
        PaymentMethod::Cod,
    )
    .await
    .order
}

/// A `pending_payment` gateway order for `guest:g-1` and its payment
/// reference.
pub(crate) async fn seed_gateway_order(state: &AppState) -> (Order, String) {
    let owner = CartOwner::Guest("g-1".into());
    let outcome = checkout(state, &owner, &[("PERF", 60_000, 1)], PaymentMethod::Gateway).await;
    let reference = outcome
        .payment
        .expect("payment session")
        .gateway_reference;
    (outcome.order, reference)
}
