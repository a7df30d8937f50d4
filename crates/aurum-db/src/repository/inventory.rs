//! # Inventory Ledger
//!
//! Variant reads and the two stock mutations the checkout subsystem is
//! allowed to perform.
//!
//! ## Stock Mutations
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  decrement(variant, qty)                                                │
//! │    UPDATE variants SET stock = stock - qty                              │
//! │    WHERE id = variant AND stock >= qty                                  │
//! │      │                                                                  │
//! │      ├── 1 row  → reserved                                             │
//! │      └── 0 rows → not enough stock (or unknown variant); nothing moved │
//! │                                                                         │
//! │  restore(variant, qty)                                                  │
//! │    UPDATE variants SET stock = stock + qty WHERE id = variant           │
//! │                                                                         │
//! │  There is no read-modify-write anywhere: the condition and the write    │
//! │  are one statement, so two buyers can never both take the last unit.   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The connection-level functions run inside the caller's transaction so a
//! failed checkout rolls every decrement back together.

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use aurum_core::Variant;

const VARIANT_COLUMNS: &str = r#"
    id, product_id, sku, product_name, label, color, image_ref,
    price, stock, is_active, is_price_on_demand, updated_at
"#;

/// Repository for catalog variants and their stock.
#[derive(Debug, Clone)]
pub struct VariantRepository {
    pool: SqlitePool,
}

impl VariantRepository {
    /// Creates a new VariantRepository.
    pub fn new(pool: SqlitePool) -> Self {
        VariantRepository { pool }
    }

    /// Gets a variant by ID.
    pub async fn get(&self, id: &str) -> DbResult<Option<Variant>> {
        let sql = format!("SELECT {VARIANT_COLUMNS} FROM variants WHERE id = ?1");
        let variant = sqlx::query_as::<_, Variant>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(variant)
    }

    /// Gets a variant by SKU.
    pub async fn get_by_sku(&self, sku: &str) -> DbResult<Option<Variant>> {
        let sql = format!("SELECT {VARIANT_COLUMNS} FROM variants WHERE sku = ?1");
        let variant = sqlx::query_as::<_, Variant>(&sql)
            .bind(sku)
            .fetch_optional(&self.pool)
            .await?;

        Ok(variant)
    }

    /// Inserts or replaces a variant (catalog sync and seeding).
    pub async fn upsert(&self, variant: &Variant) -> DbResult<()> {
        debug!(id = %variant.id, sku = %variant.sku, "Upserting variant");

        sqlx::query(
            r#"
            INSERT INTO variants (
                id, product_id, sku, product_name, label, color, image_ref,
                price, stock, is_active, is_price_on_demand, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
            ON CONFLICT (id) DO UPDATE SET
                product_id = excluded.product_id,
                sku = excluded.sku,
                product_name = excluded.product_name,
                label = excluded.label,
                color = excluded.color,
                image_ref = excluded.image_ref,
                price = excluded.price,
                stock = excluded.stock,
                is_active = excluded.is_active,
                is_price_on_demand = excluded.is_price_on_demand,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(&variant.id)
        .bind(&variant.product_id)
        .bind(&variant.sku)
        .bind(&variant.product_name)
        .bind(&variant.label)
        .bind(&variant.color)
        .bind(&variant.image_ref)
        .bind(variant.price)
        .bind(variant.stock)
        .bind(variant.is_active)
        .bind(variant.is_price_on_demand)
        .bind(variant.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Current stock for a variant.
    pub async fn stock(&self, id: &str) -> DbResult<Option<i64>> {
        let mut conn = self.pool.acquire().await?;
        current_stock(&mut conn, id).await
    }

    /// Counts variants (for the seed binary).
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM variants")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// Decrements stock outside any wider transaction.
    ///
    /// Returns `false` when stock was insufficient; nothing changed.
    pub async fn decrement(&self, id: &str, quantity: i64) -> DbResult<bool> {
        let mut conn = self.pool.acquire().await?;
        decrement_stock(&mut conn, id, quantity).await
    }

    /// Restores stock outside any wider transaction.
    pub async fn restore(&self, id: &str, quantity: i64) -> DbResult<()> {
        let mut conn = self.pool.acquire().await?;
        restore_stock(&mut conn, id, quantity).await
    }
}

// =============================================================================
// Connection-level ledger operations
// =============================================================================

/// Conditionally takes `quantity` units. Returns whether the row changed.
pub async fn decrement_stock(
    conn: &mut SqliteConnection,
    variant_id: &str,
    quantity: i64,
) -> DbResult<bool> {
    debug!(variant_id = %variant_id, quantity = quantity, "Decrementing stock");

    let result = sqlx::query(
        r#"
        UPDATE variants
        SET stock = stock - ?2, updated_at = ?3
        WHERE id = ?1 AND stock >= ?2
        "#,
    )
    .bind(variant_id)
    .bind(quantity)
    .bind(Utc::now())
    .execute(&mut *conn)
    .await?;

    Ok(result.rows_affected() == 1)
}

/// Puts `quantity` units back.
pub async fn restore_stock(
    conn: &mut SqliteConnection,
    variant_id: &str,
    quantity: i64,
) -> DbResult<()> {
    debug!(variant_id = %variant_id, quantity = quantity, "Restoring stock");

    let result = sqlx::query(
        r#"
        UPDATE variants
        SET stock = stock + ?2, updated_at = ?3
        WHERE id = ?1
        "#,
    )
    .bind(variant_id)
    .bind(quantity)
    .bind(Utc::now())
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::not_found("Variant", variant_id));
    }

    Ok(())
}

/// Reads current stock on the given connection.
pub async fn current_stock(conn: &mut SqliteConnection, variant_id: &str) -> DbResult<Option<i64>> {
    let stock: Option<i64> = sqlx::query_scalar("SELECT stock FROM variants WHERE id = ?1")
        .bind(variant_id)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(stock)
}

// =============================================================================
// Unit Tests
// =============================================================================
