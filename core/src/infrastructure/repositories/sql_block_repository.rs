// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! `BlockRepository` over `block` + `block_keyword`. `data` is
//! split across two nullable columns (`data_inline`, `data_content_id`)
//! rather than one tagged-string column, so range/time/signer/category
//! queries never have to parse `BlockData` just to filter on unrelated
//! columns.

use async_trait::async_trait;
use sqlx::{AnyPool, Row};
use std::collections::BTreeSet;

use blockchain_core_domain::entities::{Block, BlockData};
use blockchain_core_domain::repositories::BlockRepository;
use blockchain_core_domain::value_objects::{BlockNumber, Category, Hash32, Keyword, SignatureBytes, Timestamp};
use blockchain_core_domain::BlockchainError;

fn db_err(e: sqlx::Error) -> BlockchainError {
    BlockchainError::db(e.to_string())
}

pub struct SqlBlockRepository {
    pool: AnyPool,
}

impl SqlBlockRepository {
    pub fn new(pool: AnyPool) -> Self {
        Self { pool }
    }

    async fn keywords_for(&self, block_number: BlockNumber, is_auto: bool) -> Result<BTreeSet<Keyword>, BlockchainError> {
        let rows = sqlx::query("SELECT keyword FROM block_keyword WHERE block_number = ? AND is_auto = ?")
            .bind(block_number.value() as i64)
            .bind(is_auto)
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;
        rows.into_iter()
            .map(|row| {
                let raw: String = row.try_get("keyword").map_err(db_err)?;
                Keyword::new(&raw)
            })
            .collect()
    }

    async fn hydrate(&self, row: sqlx::any::AnyRow) -> Result<Block, BlockchainError> {
        let block_number = BlockNumber::new(row.try_get::<i64, _>("block_number").map_err(db_err)? as u64);
        let previous_hash = Hash32::from_hex(&row.try_get::<String, _>("previous_hash").map_err(db_err)?)?;
        let hash = Hash32::from_hex(&row.try_get::<String, _>("hash").map_err(db_err)?)?;
        let timestamp = Timestamp::from_millis(row.try_get("timestamp").map_err(db_err)?);
        let data_inline: Option<String> = row.try_get("data_inline").map_err(db_err)?;
        let data_content_id: Option<String> = row.try_get("data_content_id").map_err(db_err)?;
        let data = match (data_inline, data_content_id) {
            (Some(inline), None) => BlockData::from_tagged_string(&inline)?,
            (None, Some(content_id)) => BlockData::OffChainRef(Hash32::from_hex(&content_id)?),
            other => {
                return Err(BlockchainError::integrity(format!(
                    "block {} has malformed data columns: {other:?}",
                    block_number.value()
                )))
            }
        };
        let data_digest = Hash32::from_hex(&row.try_get::<String, _>("data_digest").map_err(db_err)?)?;
        let signer_fingerprint = Hash32::from_hex(&row.try_get::<String, _>("signer_fingerprint").map_err(db_err)?)?;
        let signature = SignatureBytes::from_base64(&row.try_get::<String, _>("signature").map_err(db_err)?)?;
        let category: Option<String> = row.try_get("category").map_err(db_err)?;
        let original_size = row.try_get::<i64, _>("original_size").map_err(db_err)? as u64;

        let manual_keywords = self.keywords_for(block_number, false).await?;
        let auto_keywords = self.keywords_for(block_number, true).await?;

        Ok(Block {
            block_number,
            previous_hash,
            hash,
            timestamp,
            data,
            data_digest,
            signer_fingerprint,
            signature,
            manual_keywords,
            auto_keywords,
            category: category.map(|c| Category::normalise(&c)).transpose()?.flatten(),
            original_size,
        })
    }

    async fn hydrate_all(&self, rows: Vec<sqlx::any::AnyRow>) -> Result<Vec<Block>, BlockchainError> {
        let mut blocks = Vec::with_capacity(rows.len());
        for row in rows {
            blocks.push(self.hydrate(row).await?);
        }
        Ok(blocks)
    }
}

const SELECT_COLUMNS: &str = "block_number, previous_hash, hash, timestamp, data_inline, data_content_id, \
     data_digest, signer_fingerprint, signature, category, original_size";

#[async_trait]
impl BlockRepository for SqlBlockRepository {
    async fn save(&self, block: &Block) -> Result<(), BlockchainError> {
        let (data_inline, data_content_id) = match &block.data {
            BlockData::Inline(_) => (Some(block.data.to_tagged_string()), None),
            BlockData::OffChainRef(id) => (None, Some(id.to_hex())),
        };

        let mut tx = self.pool.begin().await.map_err(db_err)?;
        sqlx::query(
            "INSERT INTO block
                (block_number, previous_hash, hash, timestamp, data_inline, data_content_id,
                 data_digest, signer_fingerprint, signature, category, original_size)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(block.block_number.value() as i64)
        .bind(block.previous_hash.to_hex())
        .bind(block.hash.to_hex())
        .bind(block.timestamp.millis())
        .bind(data_inline)
        .bind(data_content_id)
        .bind(block.data_digest.to_hex())
        .bind(block.signer_fingerprint.to_hex())
        .bind(block.signature.to_base64())
        .bind(block.category.as_ref().map(|c| c.as_str().to_string()))
        .bind(block.original_size as i64)
        .execute(&mut *tx)
        .await
        .map_err(db_err)?;

        for keyword in &block.manual_keywords {
            insert_keyword(&mut tx, block.block_number, keyword, false).await?;
        }
        for keyword in &block.auto_keywords {
            insert_keyword(&mut tx, block.block_number, keyword, true).await?;
        }

        tx.commit().await.map_err(db_err)
    }

    async fn find_by_number(&self, number: BlockNumber) -> Result<Option<Block>, BlockchainError> {
        let row = sqlx::query(&format!("SELECT {SELECT_COLUMNS} FROM block WHERE block_number = ?"))
            .bind(number.value() as i64)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;
        match row {
            Some(row) => Ok(Some(self.hydrate(row).await?)),
            None => Ok(None),
        }
    }

    async fn find_latest(&self) -> Result<Option<Block>, BlockchainError> {
        let row = sqlx::query(&format!("SELECT {SELECT_COLUMNS} FROM block ORDER BY block_number DESC LIMIT 1"))
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;
        match row {
            Some(row) => Ok(Some(self.hydrate(row).await?)),
            None => Ok(None),
        }
    }

    async fn count(&self) -> Result<u64, BlockchainError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM block").fetch_one(&self.pool).await.map_err(db_err)?;
        Ok(count as u64)
    }

    async fn list_range(&self, from: BlockNumber, to: BlockNumber) -> Result<Vec<Block>, BlockchainError> {
        let rows = sqlx::query(&format!(
            "SELECT {SELECT_COLUMNS} FROM block WHERE block_number BETWEEN ? AND ? ORDER BY block_number"
        ))
        .bind(from.value() as i64)
        .bind(to.value() as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;
        self.hydrate_all(rows).await
    }

    async fn list_by_time_range(&self, from: Timestamp, to: Timestamp) -> Result<Vec<Block>, BlockchainError> {
        let rows = sqlx::query(&format!(
            "SELECT {SELECT_COLUMNS} FROM block WHERE timestamp BETWEEN ? AND ? ORDER BY block_number"
        ))
        .bind(from.millis())
        .bind(to.millis())
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;
        self.hydrate_all(rows).await
    }

    async fn list_by_signer(&self, fingerprint: Hash32) -> Result<Vec<Block>, BlockchainError> {
        let rows = sqlx::query(&format!("SELECT {SELECT_COLUMNS} FROM block WHERE signer_fingerprint = ? ORDER BY block_number"))
            .bind(fingerprint.to_hex())
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;
        self.hydrate_all(rows).await
    }

    async fn list_by_category(&self, category: &Category) -> Result<Vec<Block>, BlockchainError> {
        let rows = sqlx::query(&format!("SELECT {SELECT_COLUMNS} FROM block WHERE category = ? ORDER BY block_number"))
            .bind(category.as_str().to_string())
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;
        self.hydrate_all(rows).await
    }

    async fn list_by_keyword(&self, keyword: &Keyword) -> Result<Vec<Block>, BlockchainError> {
        let rows = sqlx::query(&format!(
            "SELECT {SELECT_COLUMNS} FROM block WHERE block_number IN
                (SELECT block_number FROM block_keyword WHERE keyword = ?)
             ORDER BY block_number"
        ))
        .bind(keyword.as_str().to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;
        self.hydrate_all(rows).await
    }

    async fn delete_after(&self, keep_through: BlockNumber) -> Result<u64, BlockchainError> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;
        sqlx::query("DELETE FROM block_keyword WHERE block_number > ?")
            .bind(keep_through.value() as i64)
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;
        let result = sqlx::query("DELETE FROM block WHERE block_number > ?")
            .bind(keep_through.value() as i64)
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;
        tx.commit().await.map_err(db_err)?;
        Ok(result.rows_affected())
    }

    async fn delete_all(&self) -> Result<(), BlockchainError> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;
        sqlx::query("DELETE FROM block_keyword").execute(&mut *tx).await.map_err(db_err)?;
        sqlx::query("DELETE FROM block").execute(&mut *tx).await.map_err(db_err)?;
        tx.commit().await.map_err(db_err)
    }
}

async fn insert_keyword(
    tx: &mut sqlx::Transaction<'_, sqlx::Any>,
    block_number: BlockNumber,
    keyword: &Keyword,
    is_auto: bool,
) -> Result<(), BlockchainError> {
    sqlx::query("INSERT INTO block_keyword (block_number, keyword, is_auto) VALUES (?, ?, ?)")
        .bind(block_number.value() as i64)
        .bind(keyword.as_str().to_string())
        .bind(is_auto)
        .execute(&mut **tx)
        .await
        .map_err(db_err)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use blockchain_core_domain::value_objects::SignatureBytes as Sig;

    async fn memory_pool() -> AnyPool {
        sqlx::any::install_default_drivers();
        let pool = AnyPool::connect("sqlite::memory:").await.unwrap();
        crate::infrastructure::repositories::migration::MigrationEngine::new(&pool).run().await.unwrap();
        pool
    }

    fn sample_block(number: u64) -> Block {
        Block {
            block_number: BlockNumber::new(number),
            previous_hash: Hash32::ZERO,
            hash: Hash32::from_bytes([number as u8; 32]),
            timestamp: Timestamp::from_millis(1_000 + number as i64),
            data: BlockData::Inline(b"payload".to_vec()),
            data_digest: Hash32::ZERO,
            signer_fingerprint: Hash32::from_bytes([7u8; 32]),
            signature: Sig::new(vec![1, 2, 3, 4]),
            manual_keywords: BTreeSet::from([Keyword::new("alpha").unwrap()]),
            auto_keywords: BTreeSet::from([Keyword::new("auto-tag").unwrap()]),
            category: Category::normalise("finance").unwrap(),
            original_size: 7,
        }
    }

    #[tokio::test]
    async fn save_and_find_round_trips_keywords_and_category() {
        let pool = memory_pool().await;
        let repo = SqlBlockRepository::new(pool);
        let block = sample_block(1);
        repo.save(&block).await.unwrap();

        let found = repo.find_by_number(BlockNumber::new(1)).await.unwrap().unwrap();
        assert_eq!(found.data, block.data);
        assert_eq!(found.manual_keywords, block.manual_keywords);
        assert_eq!(found.auto_keywords, block.auto_keywords);
        assert_eq!(found.category, block.category);
    }

    #[tokio::test]
    async fn list_by_keyword_and_delete_after_work() {
        let pool = memory_pool().await;
        let repo = SqlBlockRepository::new(pool);
        repo.save(&sample_block(1)).await.unwrap();
        repo.save(&sample_block(2)).await.unwrap();

        let matches = repo.list_by_keyword(&Keyword::new("alpha").unwrap()).await.unwrap();
        assert_eq!(matches.len(), 2);

        let removed = repo.delete_after(BlockNumber::new(1)).await.unwrap();
        assert_eq!(removed, 1);
        assert_eq!(repo.count().await.unwrap(), 1);
    }
}
