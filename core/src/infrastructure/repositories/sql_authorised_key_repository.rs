// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! `AuthorisedKeyRepository` over `authorised_key`. Rows are
//! append-only except for `revoked_at`, which `revoke` sets once.

use async_trait::async_trait;
use sqlx::{AnyPool, Row};
use std::str::FromStr;

use blockchain_core_domain::entities::AuthorisedKey;
use blockchain_core_domain::repositories::AuthorisedKeyRepository;
use blockchain_core_domain::value_objects::{Hash32, KeyType, PublicKeyBytes, Timestamp};
use blockchain_core_domain::BlockchainError;

fn db_err(e: sqlx::Error) -> BlockchainError {
    BlockchainError::db(e.to_string())
}

pub struct SqlAuthorisedKeyRepository {
    pool: AnyPool,
}

impl SqlAuthorisedKeyRepository {
    pub fn new(pool: AnyPool) -> Self {
        Self { pool }
    }
}

const SELECT_COLUMNS: &str =
    "fingerprint, owner, public_key, key_type, parent_fingerprint, created_at, expires_at, revoked_at";

fn row_to_key(row: sqlx::any::AnyRow) -> Result<AuthorisedKey, BlockchainError> {
    let parent: Option<String> = row.try_get("parent_fingerprint").map_err(db_err)?;
    let expires_at: Option<i64> = row.try_get("expires_at").map_err(db_err)?;
    let revoked_at: Option<i64> = row.try_get("revoked_at").map_err(db_err)?;
    Ok(AuthorisedKey {
        fingerprint: Hash32::from_hex(&row.try_get::<String, _>("fingerprint").map_err(db_err)?)?,
        owner: row.try_get("owner").map_err(db_err)?,
        public_key: PublicKeyBytes::from_base64(&row.try_get::<String, _>("public_key").map_err(db_err)?)?,
        key_type: KeyType::from_str(&row.try_get::<String, _>("key_type").map_err(db_err)?)?,
        parent_fingerprint: parent.map(|p| Hash32::from_hex(&p)).transpose()?,
        created_at: Timestamp::from_millis(row.try_get("created_at").map_err(db_err)?),
        expires_at: expires_at.map(Timestamp::from_millis),
        revoked_at: revoked_at.map(Timestamp::from_millis),
    })
}

#[async_trait]
impl AuthorisedKeyRepository for SqlAuthorisedKeyRepository {
    async fn save(&self, key: &AuthorisedKey) -> Result<(), BlockchainError> {
        sqlx::query(
            "INSERT INTO authorised_key
                (fingerprint, owner, public_key, key_type, parent_fingerprint, created_at, expires_at, revoked_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(key.fingerprint.to_hex())
        .bind(&key.owner)
        .bind(key.public_key.to_base64())
        .bind(key.key_type.to_string())
        .bind(key.parent_fingerprint.map(|h| h.to_hex()))
        .bind(key.created_at.millis())
        .bind(key.expires_at.map(|t| t.millis()))
        .bind(key.revoked_at.map(|t| t.millis()))
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(())
    }

    async fn find_by_fingerprint(&self, fingerprint: Hash32) -> Result<Option<AuthorisedKey>, BlockchainError> {
        let row = sqlx::query(&format!("SELECT {SELECT_COLUMNS} FROM authorised_key WHERE fingerprint = ?"))
            .bind(fingerprint.to_hex())
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;
        row.map(row_to_key).transpose()
    }

    async fn list_all(&self) -> Result<Vec<AuthorisedKey>, BlockchainError> {
        let rows = sqlx::query(&format!("SELECT {SELECT_COLUMNS} FROM authorised_key ORDER BY created_at"))
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;
        rows.into_iter().map(row_to_key).collect()
    }

    async fn revoke(&self, fingerprint: Hash32, revoked_at: Timestamp) -> Result<(), BlockchainError> {
        sqlx::query("UPDATE authorised_key SET revoked_at = ? WHERE fingerprint = ? AND revoked_at IS NULL")
            .bind(revoked_at.millis())
            .bind(fingerprint.to_hex())
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(())
    }

    async fn delete_all(&self) -> Result<(), BlockchainError> {
        sqlx::query("DELETE FROM authorised_key").execute(&self.pool).await.map_err(db_err)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn memory_pool() -> AnyPool {
        sqlx::any::install_default_drivers();
        let pool = AnyPool::connect("sqlite::memory:").await.unwrap();
        crate::infrastructure::repositories::migration::MigrationEngine::new(&pool).run().await.unwrap();
        pool
    }

    fn sample_key(owner: &str) -> AuthorisedKey {
        AuthorisedKey {
            fingerprint: Hash32::from_bytes([3u8; 32]),
            owner: owner.to_string(),
            public_key: PublicKeyBytes::new(vec![4, 1, 2, 3]),
            key_type: KeyType::Root,
            parent_fingerprint: None,
            created_at: Timestamp::from_millis(1000),
            expires_at: None,
            revoked_at: None,
        }
    }

    #[tokio::test]
    async fn save_and_find_round_trips() {
        let pool = memory_pool().await;
        let repo = SqlAuthorisedKeyRepository::new(pool);
        let key = sample_key("alice");
        repo.save(&key).await.unwrap();

        let found = repo.find_by_fingerprint(key.fingerprint).await.unwrap().unwrap();
        assert_eq!(found, key);
    }

    #[tokio::test]
    async fn revoke_is_idempotent() {
        let pool = memory_pool().await;
        let repo = SqlAuthorisedKeyRepository::new(pool);
        let key = sample_key("bob");
        repo.save(&key).await.unwrap();

        repo.revoke(key.fingerprint, Timestamp::from_millis(2000)).await.unwrap();
        repo.revoke(key.fingerprint, Timestamp::from_millis(3000)).await.unwrap();

        let found = repo.find_by_fingerprint(key.fingerprint).await.unwrap().unwrap();
        assert_eq!(found.revoked_at, Some(Timestamp::from_millis(2000)));
    }
}
