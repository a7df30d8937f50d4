//! # Cart Service
//!
//! Guest and signed-in carts. Every write touches one line; checkout
//! re-validates everything, so nothing here is on the money path.

use serde::Deserialize;
use tracing::{debug, info};

use aurum_core::validation::validate_reference;
use aurum_core::{Cart, CartOwner, CartView, CoreError, PaymentMethod, ValidationError, Variant};

use crate::error::ServiceResult;
use crate::state::AppState;

/// Body of `POST /cart/items`.
///
/// The variant is identified by id or by SKU; `productId`, when given,
/// must match the variant's product.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddItemRequest {
    pub product_id: Option<String>,
    pub variant_id: Option<String>,
    pub variant_sku: Option<String>,
    pub quantity: i64,
}

/// Returns the cart with a display estimate for `method`.
pub async fn get_cart(state: &AppState, owner: &CartOwner, method: PaymentMethod) -> ServiceResult<CartView> {
    let cart = state.db.carts().load(owner).await?;
    Ok(CartView::build(&cart, method, &state.pricing, state.adjustments.as_ref()))
}

pub async fn add_item(state: &AppState, owner: &CartOwner, request: AddItemRequest) -> ServiceResult<CartView> {
    let variant = resolve_variant(state, &request).await?;

    let mut cart = state.db.carts().load(owner).await?;
    let item = cart
        .add_item(&variant, request.quantity, state.config.checkout.max_cart_items)?
        .clone();
    state.db.carts().upsert_item(owner, &item).await?;

    debug!(owner = %owner, sku = %item.sku, quantity = item.quantity, "Cart line added");
    Ok(view(state, &cart))
}

/// Sets a line's quantity; 0 removes it.
pub async fn update_item(
    state: &AppState,
    owner: &CartOwner,
    item_id: &str,
    quantity: i64,
) -> ServiceResult<CartView> {
    let mut cart = state.db.carts().load(owner).await?;

    match cart.update_quantity(item_id, quantity)?.cloned() {
        Some(item) => state.db.carts().upsert_item(owner, &item).await?,
        None => {
            state.db.carts().delete_item(owner, item_id).await?;
        }
    }

    Ok(view(state, &cart))
}

pub async fn remove_item(state: &AppState, owner: &CartOwner, item_id: &str) -> ServiceResult<CartView> {
    if !state.db.carts().delete_item(owner, item_id).await? {
        return Err(CoreError::CartItemNotFound(item_id.to_string()).into());
    }

    let cart = state.db.carts().load(owner).await?;
    Ok(view(state, &cart))
}

pub async fn clear_cart(state: &AppState, owner: &CartOwner) -> ServiceResult<CartView> {
    state.db.carts().clear(owner).await?;
    Ok(view(state, &Cart::new(owner.clone())))
}

/// Folds a guest cart into a signed-in customer's cart after login.
pub async fn merge_guest_cart(
    state: &AppState,
    user: &CartOwner,
    guest_token: &str,
) -> ServiceResult<CartView> {
    if user.is_guest() {
        return Err(ValidationError::InvalidFormat {
            field: "owner".to_string(),
            reason: "merging requires a signed-in customer".to_string(),
        }
        .into());
    }
    validate_reference("guestToken", guest_token)?;
    let guest = CartOwner::Guest(guest_token.to_string());

    let guest_cart = state.db.carts().load(&guest).await?;
    let mut cart = state.db.carts().load(user).await?;

    let merged = cart.merge(&guest_cart, state.config.checkout.max_cart_items);
    state.db.carts().merge(&guest, user, &merged).await?;

    info!(
        user = %user,
        guest_lines = guest_cart.items.len(),
        merged = merged.len(),
        "Guest cart merged"
    );
    Ok(view(state, &cart))
}

// =============================================================================
// Helpers
// =============================================================================

fn view(state: &AppState, cart: &Cart) -> CartView {
    CartView::build(cart, PaymentMethod::Gateway, &state.pricing, state.adjustments.as_ref())
}

async fn resolve_variant(state: &AppState, request: &AddItemRequest) -> ServiceResult<Variant> {
    let (variant, key) = match (&request.variant_id, &request.variant_sku) {
        (Some(id), _) => {
            validate_reference("variantId", id)?;
            (state.db.variants().get(id).await?, id)
        }
        (None, Some(sku)) => {
            validate_reference("variantSku", sku)?;
            (state.db.variants().get_by_sku(sku).await?, sku)
        }
        (None, None) => {
            return Err(ValidationError::Required {
                field: "variantId".to_string(),
            }
            .into())
        }
    };

    let variant = variant.ok_or_else(|| CoreError::VariantNotFound(key.clone()))?;

    if let Some(product_id) = &request.product_id {
        if product_id != &variant.product_id {
            return Err(CoreError::VariantNotFound(format!("{key} in product {product_id}")).into());
        }
    }

    Ok(variant)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ServiceError;
    use crate::test_support::{seed_variant, test_state};

    fn by_sku(sku: &str, quantity: i64) -> AddItemRequest {
        AddItemRequest {
            product_id: None,
            variant_id: None,
            variant_sku: Some(sku.to_string()),
            quantity,
        }
    }

    #[tokio::test]
    async fn test_add_by_sku_and_by_id_share_a_line() {
        let state = test_state().await;
        let variant = seed_variant(&state, "RING-GLD-07", 20_000, 5).await;
        let owner = CartOwner::User("1".into());

        add_item(&state, &owner, by_sku("RING-GLD-07", 1)).await.unwrap();
        let view = add_item(
            &state,
            &owner,
            AddItemRequest {
                product_id: Some(variant.product_id.clone()),
                variant_id: Some(variant.id.clone()),
                variant_sku: None,
                quantity: 2,
            },
        )
        .await
        .unwrap();

        assert_eq!(view.item_count, 1);
        assert_eq!(view.total_quantity, 3);
        assert_eq!(view.quote.subtotal.minor(), 60_000);

        let stored = state.db.carts().load(&owner).await.unwrap();
        assert_eq!(stored.items[0].quantity, 3);
    }

    #[tokio::test]
    async fn test_add_rejects_unknown_or_mismatched_variant() {
        let state = test_state().await;
        seed_variant(&state, "EAR-HUG-S", 4_200, 5).await;
        let owner = CartOwner::Guest("tok".into());

        let err = add_item(&state, &owner, by_sku("NOPE", 1)).await.unwrap_err();
        assert!(matches!(err, ServiceError::Core(CoreError::VariantNotFound(_))));

        let mut request = by_sku("EAR-HUG-S", 1);
        request.product_id = Some("prod-other".into());
        let err = add_item(&state, &owner, request).await.unwrap_err();
        assert!(matches!(err, ServiceError::Core(CoreError::VariantNotFound(_))));

        let request = AddItemRequest {
            product_id: None,
            variant_id: None,
            variant_sku: None,
            quantity: 1,
        };
        let err = add_item(&state, &owner, request).await.unwrap_err();
        assert!(matches!(err, ServiceError::Core(CoreError::Validation(_))));
    }

    #[tokio::test]
    async fn test_update_to_zero_removes_line() {
        let state = test_state().await;
        seed_variant(&state, "OUD-NOI-M", 12_500, 5).await;
        let owner = CartOwner::User("1".into());

        let view = add_item(&state, &owner, by_sku("OUD-NOI-M", 1)).await.unwrap();
        let item_id = view.items[0].id.clone();

        let view = update_item(&state, &owner, &item_id, 4).await.unwrap();
        assert_eq!(view.total_quantity, 4);

        let view = update_item(&state, &owner, &item_id, 0).await.unwrap();
        assert!(view.items.is_empty());
        assert!(state.db.carts().load(&owner).await.unwrap().is_empty());

        let err = remove_item(&state, &owner, &item_id).await.unwrap_err();
        assert!(matches!(err, ServiceError::Core(CoreError::CartItemNotFound(_))));
    }

    #[tokio::test]
    async fn test_merge_guest_cart_adds_quantities() {
        let state = test_state().await;
        seed_variant(&state, "ROS-ATT-S", 4_800, 10).await;
        seed_variant(&state, "VET-EDT-S", 3_200, 10).await;

        let user = CartOwner::User("7".into());
        let guest = CartOwner::Guest("g-7".into());

        add_item(&state, &user, by_sku("ROS-ATT-S", 1)).await.unwrap();
        add_item(&state, &guest, by_sku("ROS-ATT-S", 2)).await.unwrap();
        add_item(&state, &guest, by_sku("VET-EDT-S", 1)).await.unwrap();

        let view = merge_guest_cart(&state, &user, "g-7").await.unwrap();
        assert_eq!(view.item_count, 2);
        assert_eq!(view.total_quantity, 4);

        assert!(state.db.carts().load(&guest).await.unwrap().is_empty());
        assert_eq!(state.db.carts().load(&user).await.unwrap().total_quantity(), 4);

        let err = merge_guest_cart(&state, &guest, "g-7").await.unwrap_err();
        assert!(matches!(err, ServiceError::Core(CoreError::Validation(_))));
    }

    #[tokio::test]
    async fn test_cart_quote_follows_payment_method() {
        let state = test_state().await;
        seed_variant(&state, "RING-A", 20_000, 5).await;
        seed_variant(&state, "CHARM-B", 5_000, 5).await;
        let owner = CartOwner::User("1".into());

        add_item(&state, &owner, by_sku("RING-A", 1)).await.unwrap();
        add_item(&state, &owner, by_sku("CHARM-B", 2)).await.unwrap();

        let view = get_cart(&state, &owner, PaymentMethod::Cod).await.unwrap();
        assert_eq!(view.quote.subtotal.minor(), 30_000);
        assert_eq!(view.quote.delivery_charge.minor(), 7_000);
        assert_eq!(view.quote.cod_charge.minor(), 4_000);
        assert_eq!(view.quote.grand_total.minor(), 41_000);
        assert_eq!(view.quote.amount_needed_for_free_delivery.minor(), 20_000);
    }
}
