//! # Cart Repository
//!
//! Persistence for guest and signed-in carts.
//!
//! Writes are per line (upsert or delete one `cart_items` row), so two
//! requests editing different lines of the same cart never overwrite each
//! other. Two requests editing the same line: last write wins.

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::DbResult;
use aurum_core::{Cart, CartItem, CartOwner};

/// Repository for cart persistence.
#[derive(Debug, Clone)]
pub struct CartRepository {
    pool: SqlitePool,
}

impl CartRepository {
    /// Creates a new CartRepository.
    pub fn new(pool: SqlitePool) -> Self {
        CartRepository { pool }
    }

    /// Loads a cart; a missing cart is an empty one.
    pub async fn load(&self, owner: &CartOwner) -> DbResult<Cart> {
        let key = owner.key();

        let updated_at: Option<chrono::DateTime<Utc>> =
            sqlx::query_scalar("SELECT updated_at FROM carts WHERE owner_key = ?1")
                .bind(&key)
                .fetch_optional(&self.pool)
                .await?;

        let items = sqlx::query_as::<_, CartItem>(
            r#"
            SELECT id, product_id, variant_id, sku, name, label,
                   unit_price, quantity, added_at
            FROM cart_items
            WHERE owner_key = ?1
            ORDER BY added_at, rowid
            "#,
        )
        .bind(&key)
        .fetch_all(&self.pool)
        .await?;

        let mut cart = Cart::new(owner.clone());
        cart.items = items;
        if let Some(updated_at) = updated_at {
            cart.updated_at = updated_at;
        }
        Ok(cart)
    }

    /// Inserts or updates one line.
    pub async fn upsert_item(&self, owner: &CartOwner, item: &CartItem) -> DbResult<()> {
        debug!(owner = %owner, item_id = %item.id, quantity = item.quantity, "Upserting cart item");

        let mut tx = self.pool.begin().await?;
        upsert_item_in(&mut tx, &owner.key(), item).await?;
        tx.commit().await?;
        Ok(())
    }

    /// Deletes one line. Returns whether it existed.
    pub async fn delete_item(&self, owner: &CartOwner, item_id: &str) -> DbResult<bool> {
        debug!(owner = %owner, item_id = %item_id, "Deleting cart item");

        let result = sqlx::query("DELETE FROM cart_items WHERE owner_key = ?1 AND id = ?2")
            .bind(owner.key())
            .bind(item_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Removes every line.
    pub async fn clear(&self, owner: &CartOwner) -> DbResult<()> {
        let mut conn = self.pool.acquire().await?;
        clear_in(&mut conn, &owner.key()).await
    }

    /// Moves merged lines into the user's cart and drops the guest cart.
    ///
    /// `merged` are the lines `Cart::merge` reported as changed.
    pub async fn merge(
        &self,
        guest: &CartOwner,
        user: &CartOwner,
        merged: &[CartItem],
    ) -> DbResult<()> {
        debug!(guest = %guest, user = %user, lines = merged.len(), "Merging carts");

        let mut tx = self.pool.begin().await?;

        // Guest rows go first so their ids can be reused under the user key.
        sqlx::query("DELETE FROM carts WHERE owner_key = ?1")
            .bind(guest.key())
            .execute(&mut *tx)
            .await?;

        let user_key = user.key();
        for item in merged {
            upsert_item_in(&mut tx, &user_key, item).await?;
        }

        tx.commit().await?;
        Ok(())
    }
}

// =============================================================================
// Connection-level helpers
// =============================================================================

async fn upsert_item_in(conn: &mut SqliteConnection, owner_key: &str, item: &CartItem) -> DbResult<()> {
    let now = Utc::now();

    sqlx::query(
        r#"
        INSERT INTO carts (owner_key, updated_at) VALUES (?1, ?2)
        ON CONFLICT (owner_key) DO UPDATE SET updated_at = excluded.updated_at
        "#,
    )
    .bind(owner_key)
    .bind(now)
    .execute(&mut *conn)
    .await?;

    sqlx::query(
        r#"
        INSERT INTO cart_items (
            id, owner_key, product_id, variant_id, sku, name, label,
            unit_price, quantity, added_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
        ON CONFLICT (owner_key, product_id, variant_id) DO UPDATE SET
            quantity = excluded.quantity
        "#,
    )
    .bind(&item.id)
    .bind(owner_key)
    .bind(&item.product_id)
    .bind(&item.variant_id)
    .bind(&item.sku)
    .bind(&item.name)
    .bind(&item.label)
    .bind(item.unit_price)
    .bind(item.quantity)
    .bind(item.added_at)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Clears a cart inside the caller's transaction (checkout).
pub async fn clear_in(conn: &mut SqliteConnection, owner_key: &str) -> DbResult<()> {
    debug!(owner = %owner_key, "Clearing cart");

    sqlx::query("DELETE FROM cart_items WHERE owner_key = ?1")
        .bind(owner_key)
        .execute(&mut *conn)
        .await?;

    sqlx::query("UPDATE carts SET updated_at = ?2 WHERE owner_key = ?1")
        .bind(owner_key)
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
    use crate::test_support::{seed_variant, test_db};
    use aurum_core::MAX_CART_ITEMS;

    #[tokio::test]
    async fn test_missing_cart_is_empty() {
        let db = test_db().await;
        let cart = db.carts().load(&CartOwner::Guest("nobody".into())).await.unwrap();
        assert!(cart.is_empty());
    }

    #[tokio::test]
    async fn test_upsert_update_delete() {
        let db = test_db().await;
        let variant = seed_variant(&db, "PEND-1", 15_000, 5).await;
        let owner = CartOwner::User("1".into());

        let mut cart = db.carts().load(&owner).await.unwrap();
        let item = cart.add_item(&variant, 2, MAX_CART_ITEMS).unwrap().clone();
        db.carts().upsert_item(&owner, &item).await.unwrap();

        let item = cart.update_quantity(&item.id, 5).unwrap().unwrap().clone();
        db.carts().upsert_item(&owner, &item).await.unwrap();

        let loaded = db.carts().load(&owner).await.unwrap();
        assert_eq!(loaded.items.len(), 1);
        assert_eq!(loaded.items[0].quantity, 5);
        assert_eq!(loaded.items[0].unit_price.minor(), 15_000);

        assert!(db.carts().delete_item(&owner, &item.id).await.unwrap());
        assert!(!db.carts().delete_item(&owner, &item.id).await.unwrap());
        assert!(db.carts().load(&owner).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_merge_moves_guest_lines() {
        let db = test_db().await;
        let a = seed_variant(&db, "A-1", 1_000, 5).await;
        let b = seed_variant(&db, "B-1", 2_000, 5).await;
        let guest = CartOwner::Guest("tok".into());
        let user = CartOwner::User("9".into());

        let mut guest_cart = Cart::new(guest.clone());
        for (variant, qty) in [(&a, 1), (&b, 2)] {
            let item = guest_cart.add_item(variant, qty, MAX_CART_ITEMS).unwrap().clone();
            db.carts().upsert_item(&guest, &item).await.unwrap();
        }

        let mut user_cart = db.carts().load(&user).await.unwrap();
        let item = user_cart.add_item(&a, 3, MAX_CART_ITEMS).unwrap().clone();
        db.carts().upsert_item(&user, &item).await.unwrap();

        let guest_cart = db.carts().load(&guest).await.unwrap();
        let changed = user_cart.merge(&guest_cart, MAX_CART_ITEMS);
        db.carts().merge(&guest, &user, &changed).await.unwrap();

        let merged = db.carts().load(&user).await.unwrap();
        assert_eq!(merged.items.len(), 2);
        assert_eq!(merged.total_quantity(), 6);
        assert!(db.carts().load(&guest).await.unwrap().is_empty());
    }
}
