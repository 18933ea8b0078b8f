// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! `VaultRepository` over `stored_private_key`. Every byte
//! field (`encrypted_private_key`, `kdf_salt`, `nonce`) is stored
//! base64-encoded text, matching the schema's uniform hash/binary-as-TEXT
//! rule; the vault never decrypts anything itself, it only moves opaque
//! bytes in and out.

use async_trait::async_trait;
use base64::Engine;
use sqlx::{AnyPool, Row};

use blockchain_core_domain::entities::StoredPrivateKey;
use blockchain_core_domain::repositories::VaultRepository;
use blockchain_core_domain::BlockchainError;

fn db_err(e: sqlx::Error) -> BlockchainError {
    BlockchainError::db(e.to_string())
}

fn encode(bytes: &[u8]) -> String {
    base64::engine::general_purpose::STANDARD.encode(bytes)
}

fn decode(s: &str) -> Result<Vec<u8>, BlockchainError> {
    base64::engine::general_purpose::STANDARD
        .decode(s.trim())
        .map_err(|e| BlockchainError::integrity(format!("invalid base64 vault field: {e}")))
}

fn decode_nonce(s: &str) -> Result<[u8; 12], BlockchainError> {
    decode(s)?.try_into().map_err(|_| BlockchainError::integrity("nonce must be exactly 12 bytes"))
}

pub struct SqlVaultRepository {
    pool: AnyPool,
}

impl SqlVaultRepository {
    pub fn new(pool: AnyPool) -> Self {
        Self { pool }
    }
}

const SELECT_COLUMNS: &str = "owner, encrypted_private_key, kdf_salt, kdf_iterations, algorithm_tag, nonce";

fn row_to_key(row: sqlx::any::AnyRow) -> Result<StoredPrivateKey, BlockchainError> {
    Ok(StoredPrivateKey {
        owner: row.try_get("owner").map_err(db_err)?,
        encrypted_private_key: decode(&row.try_get::<String, _>("encrypted_private_key").map_err(db_err)?)?,
        kdf_salt: decode(&row.try_get::<String, _>("kdf_salt").map_err(db_err)?)?,
        kdf_iterations: row.try_get::<i64, _>("kdf_iterations").map_err(db_err)? as u32,
        algorithm_tag: row.try_get("algorithm_tag").map_err(db_err)?,
        nonce: decode_nonce(&row.try_get::<String, _>("nonce").map_err(db_err)?)?,
    })
}

#[async_trait]
impl VaultRepository for SqlVaultRepository {
    async fn store(&self, key: &StoredPrivateKey) -> Result<(), BlockchainError> {
        sqlx::query(
            "INSERT INTO stored_private_key
                (owner, encrypted_private_key, kdf_salt, kdf_iterations, algorithm_tag, nonce)
             VALUES (?, ?, ?, ?, ?, ?)
             ON CONFLICT (owner) DO UPDATE SET
                encrypted_private_key = excluded.encrypted_private_key,
                kdf_salt = excluded.kdf_salt,
                kdf_iterations = excluded.kdf_iterations,
                algorithm_tag = excluded.algorithm_tag,
                nonce = excluded.nonce",
        )
        .bind(&key.owner)
        .bind(encode(&key.encrypted_private_key))
        .bind(encode(&key.kdf_salt))
        .bind(key.kdf_iterations as i64)
        .bind(&key.algorithm_tag)
        .bind(encode(&key.nonce))
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(())
    }

    async fn load(&self, owner: &str) -> Result<Option<StoredPrivateKey>, BlockchainError> {
        let row = sqlx::query(&format!("SELECT {SELECT_COLUMNS} FROM stored_private_key WHERE owner = ?"))
            .bind(owner)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;
        row.map(row_to_key).transpose()
    }

    async fn exists(&self, owner: &str) -> Result<bool, BlockchainError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM stored_private_key WHERE owner = ?")
            .bind(owner)
            .fetch_one(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(count > 0)
    }

    async fn delete(&self, owner: &str) -> Result<(), BlockchainError> {
        sqlx::query("DELETE FROM stored_private_key WHERE owner = ?")
            .bind(owner)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(())
    }

    async fn list_owners(&self) -> Result<Vec<String>, BlockchainError> {
        let rows = sqlx::query_scalar("SELECT owner FROM stored_private_key ORDER BY owner")
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(rows)
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

    fn sample_key(owner: &str) -> StoredPrivateKey {
        StoredPrivateKey {
            owner: owner.to_string(),
            encrypted_private_key: vec![1, 2, 3, 4, 5],
            kdf_salt: vec![9, 9, 9, 9],
            kdf_iterations: 210_000,
            algorithm_tag: "aes256gcm-pbkdf2-hmac-sha3-256".to_string(),
            nonce: [5u8; 12],
        }
    }

    #[tokio::test]
    async fn store_and_load_round_trips() {
        let pool = memory_pool().await;
        let repo = SqlVaultRepository::new(pool);
        let key = sample_key("alice");
        repo.store(&key).await.unwrap();

        assert!(repo.exists("alice").await.unwrap());
        let found = repo.load("alice").await.unwrap().unwrap();
        assert_eq!(found, key);
    }

    #[tokio::test]
    async fn store_overwrites_existing_owner() {
        let pool = memory_pool().await;
        let repo = SqlVaultRepository::new(pool);
        repo.store(&sample_key("bob")).await.unwrap();

        let mut updated = sample_key("bob");
        updated.kdf_iterations = 300_000;
        repo.store(&updated).await.unwrap();

        let found = repo.load("bob").await.unwrap().unwrap();
        assert_eq!(found.kdf_iterations, 300_000);
    }

    #[tokio::test]
    async fn delete_and_list_owners() {
        let pool = memory_pool().await;
        let repo = SqlVaultRepository::new(pool);
        repo.store(&sample_key("alice")).await.unwrap();
        repo.store(&sample_key("carol")).await.unwrap();

        assert_eq!(repo.list_owners().await.unwrap(), vec!["alice".to_string(), "carol".to_string()]);

        repo.delete("alice").await.unwrap();
        assert!(!repo.exists("alice").await.unwrap());
        assert_eq!(repo.list_owners().await.unwrap(), vec!["carol".to_string()]);
    }
}
