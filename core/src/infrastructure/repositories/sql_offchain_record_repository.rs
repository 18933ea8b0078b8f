// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! `OffChainRecordRepository` over `offchain_record`. `nonce`
//! is stored base64-encoded text, matching the uniform hash/binary-as-TEXT
//! rule used across the schema.

use async_trait::async_trait;
use base64::Engine;
use sqlx::{AnyPool, Row};

use blockchain_core_domain::entities::OffChainRecord;
use blockchain_core_domain::repositories::OffChainRecordRepository;
use blockchain_core_domain::value_objects::{Hash32, Timestamp};
use blockchain_core_domain::BlockchainError;

fn db_err(e: sqlx::Error) -> BlockchainError {
    BlockchainError::db(e.to_string())
}

fn encode_nonce(nonce: &[u8; 12]) -> String {
    base64::engine::general_purpose::STANDARD.encode(nonce)
}

fn decode_nonce(s: &str) -> Result<[u8; 12], BlockchainError> {
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(s.trim())
        .map_err(|e| BlockchainError::integrity(format!("invalid base64 nonce: {e}")))?;
    bytes.try_into().map_err(|_| BlockchainError::integrity("nonce must be exactly 12 bytes"))
}

pub struct SqlOffChainRecordRepository {
    pool: AnyPool,
}

impl SqlOffChainRecordRepository {
    pub fn new(pool: AnyPool) -> Self {
        Self { pool }
    }
}

const SELECT_COLUMNS: &str = "content_id, cipher_path, nonce, cleartext_size, cipher_size, encryption_key_ref, created_at";

fn row_to_record(row: sqlx::any::AnyRow) -> Result<OffChainRecord, BlockchainError> {
    Ok(OffChainRecord {
        content_id: Hash32::from_hex(&row.try_get::<String, _>("content_id").map_err(db_err)?)?,
        cipher_path: row.try_get("cipher_path").map_err(db_err)?,
        nonce: decode_nonce(&row.try_get::<String, _>("nonce").map_err(db_err)?)?,
        cleartext_size: row.try_get::<i64, _>("cleartext_size").map_err(db_err)? as u64,
        cipher_size: row.try_get::<i64, _>("cipher_size").map_err(db_err)? as u64,
        encryption_key_ref: row.try_get("encryption_key_ref").map_err(db_err)?,
        created_at: Timestamp::from_millis(row.try_get("created_at").map_err(db_err)?),
    })
}

#[async_trait]
impl OffChainRecordRepository for SqlOffChainRecordRepository {
    async fn save(&self, record: &OffChainRecord) -> Result<(), BlockchainError> {
        sqlx::query(
            "INSERT INTO offchain_record
                (content_id, cipher_path, nonce, cleartext_size, cipher_size, encryption_key_ref, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(record.content_id.to_hex())
        .bind(&record.cipher_path)
        .bind(encode_nonce(&record.nonce))
        .bind(record.cleartext_size as i64)
        .bind(record.cipher_size as i64)
        .bind(&record.encryption_key_ref)
        .bind(record.created_at.millis())
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(())
    }

    async fn find_by_content_id(&self, content_id: Hash32) -> Result<Option<OffChainRecord>, BlockchainError> {
        let row = sqlx::query(&format!("SELECT {SELECT_COLUMNS} FROM offchain_record WHERE content_id = ?"))
            .bind(content_id.to_hex())
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;
        row.map(row_to_record).transpose()
    }

    /// Fetches every row and filters against `referenced` in Rust rather
    /// than building a dynamic `IN (...)` clause: `sqlx::Any`'s bind-array
    /// support is inconsistent across the four backing engines, and CLI-
    /// scale ledgers make the full scan cheap.
    async fn list_unreferenced(&self, referenced: &[Hash32]) -> Result<Vec<OffChainRecord>, BlockchainError> {
        let rows = sqlx::query(&format!("SELECT {SELECT_COLUMNS} FROM offchain_record"))
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;
        rows.into_iter()
            .map(row_to_record)
            .collect::<Result<Vec<_>, _>>()
            .map(|records| records.into_iter().filter(|r| !referenced.contains(&r.content_id)).collect())
    }

    async fn delete(&self, content_id: Hash32) -> Result<(), BlockchainError> {
        sqlx::query("DELETE FROM offchain_record WHERE content_id = ?")
            .bind(content_id.to_hex())
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(())
    }

    async fn delete_all(&self) -> Result<(), BlockchainError> {
        sqlx::query("DELETE FROM offchain_record").execute(&self.pool).await.map_err(db_err)?;
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

    fn sample_record(tag: u8) -> OffChainRecord {
        OffChainRecord {
            content_id: Hash32::from_bytes([tag; 32]),
            cipher_path: format!("/var/blockchain/offchain/{tag}.bin"),
            nonce: [tag; 12],
            cleartext_size: 100,
            cipher_size: 116,
            encryption_key_ref: "vault:alice".to_string(),
            created_at: Timestamp::from_millis(5000),
        }
    }

    #[tokio::test]
    async fn save_and_find_round_trips() {
        let pool = memory_pool().await;
        let repo = SqlOffChainRecordRepository::new(pool);
        let record = sample_record(1);
        repo.save(&record).await.unwrap();

        let found = repo.find_by_content_id(record.content_id).await.unwrap().unwrap();
        assert_eq!(found, record);
    }

    #[tokio::test]
    async fn list_unreferenced_excludes_referenced_ids() {
        let pool = memory_pool().await;
        let repo = SqlOffChainRecordRepository::new(pool);
        let a = sample_record(1);
        let b = sample_record(2);
        repo.save(&a).await.unwrap();
        repo.save(&b).await.unwrap();

        let unreferenced = repo.list_unreferenced(&[a.content_id]).await.unwrap();
        assert_eq!(unreferenced, vec![b]);
    }

    #[tokio::test]
    async fn delete_removes_row() {
        let pool = memory_pool().await;
        let repo = SqlOffChainRecordRepository::new(pool);
        let record = sample_record(9);
        repo.save(&record).await.unwrap();
        repo.delete(record.content_id).await.unwrap();
        assert!(repo.find_by_content_id(record.content_id).await.unwrap().is_none());
    }
}
