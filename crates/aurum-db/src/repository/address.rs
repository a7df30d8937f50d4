//! # Address Repository
//!
//! Read access to the address book. Address CRUD belongs to another
//! service; checkout only resolves an address id to a snapshot.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::DbResult;
use aurum_core::Address;

/// Repository for address lookups.
#[derive(Debug, Clone)]
pub struct AddressRepository {
    pool: SqlitePool,
}

impl AddressRepository {
    /// Creates a new AddressRepository.
    pub fn new(pool: SqlitePool) -> Self {
        AddressRepository { pool }
    }

    /// Gets an address only if it belongs to `owner_key`.
    ///
    /// Someone else's address id resolves to `None`, same as a missing one.
    pub async fn get_for_owner(&self, id: &str, owner_key: &str) -> DbResult<Option<Address>> {
        debug!(id = %id, owner = %owner_key, "Resolving address");

        let address = sqlx::query_as::<_, Address>(
            r#"
            SELECT id, owner_key, full_name, phone, line1, line2,
                   city, state, postal_code, country
            FROM addresses
            WHERE id = ?1 AND owner_key = ?2
            "#,
        )
        .bind(id)
        .bind(owner_key)
        .fetch_optional(&self.pool)
        .await?;

        Ok(address)
    }

    /// Inserts an address (seeding and tests).
    pub async fn insert(&self, address: &Address) -> DbResult<()> {
        debug!(id = %address.id, owner = %address.owner_key, "Inserting address");

        sqlx::query(
            r#"
            INSERT INTO addresses (
                id, owner_key, full_name, phone, line1, line2,
                city, state, postal_code, country, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            "#,
        )
        .bind(&address.id)
        .bind(&address.owner_key)
        .bind(&address.full_name)
        .bind(&address.phone)
        .bind(&address.line1)
        .bind(&address.line2)
        .bind(&address.city)
        .bind(&address.state)
        .bind(&address.postal_code)
        .bind(&address.country)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::test_support::{seed_address, test_db};

    #[tokio::test]
    async fn test_address_is_scoped_to_owner() {
        let db = test_db().await;
        let address = seed_address(&db, "user:1").await;

        let found = db
            .addresses()
            .get_for_owner(&address.id, "user:1")
            .await
            .unwrap();
        assert_eq!(found.unwrap().city, "Bengaluru");

        let other = db
            .addresses()
            .get_for_owner(&address.id, "user:2")
            .await
            .unwrap();
        assert!(other.is_none());
    }
}
