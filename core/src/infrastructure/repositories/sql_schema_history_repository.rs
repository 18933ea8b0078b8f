// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! `SchemaHistoryRepository` over `schema_history`, backed by the same SQL
//! the migration engine uses to apply and track scripts. This is the
//! read/status-facing port (`database status`, `database history`
//! presentation commands); [`MigrationEngine`](super::migration::MigrationEngine)
//! is the write/apply-facing mechanism. Both share `ensure_table`,
//! `fetch_history`, `next_installed_rank` and `insert_history_row` so the
//! table shape and queries never drift apart.

use async_trait::async_trait;
use sqlx::AnyPool;

use blockchain_core_domain::entities::SchemaHistoryRow;
use blockchain_core_domain::repositories::SchemaHistoryRepository;
use blockchain_core_domain::BlockchainError;

use super::migration::{ensure_table, fetch_history, insert_history_row, next_installed_rank};

pub struct SqlSchemaHistoryRepository {
    pool: AnyPool,
}

impl SqlSchemaHistoryRepository {
    pub fn new(pool: AnyPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SchemaHistoryRepository for SqlSchemaHistoryRepository {
    async fn record(&self, row: &SchemaHistoryRow) -> Result<(), BlockchainError> {
        ensure_table(&self.pool).await?;
        let mut row = row.clone();
        row.installed_rank = next_installed_rank(&self.pool).await?;
        insert_history_row(&self.pool, &row).await
    }

    async fn history(&self) -> Result<Vec<SchemaHistoryRow>, BlockchainError> {
        ensure_table(&self.pool).await?;
        fetch_history(&self.pool).await
    }

    async fn current_version(&self) -> Result<Option<u64>, BlockchainError> {
        Ok(self
            .history()
            .await?
            .into_iter()
            .filter(|row| row.success)
            .filter_map(|row| row.version_number())
            .max())
    }

    async fn ensure_initialised(&self) -> Result<(), BlockchainError> {
        ensure_table(&self.pool).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn memory_pool() -> AnyPool {
        sqlx::any::install_default_drivers();
        AnyPool::connect("sqlite::memory:").await.unwrap()
    }

    fn sample_row(description: &str) -> SchemaHistoryRow {
        SchemaHistoryRow {
            installed_rank: 0,
            version: "V1".to_string(),
            description: description.to_string(),
            migration_type: "SQL".to_string(),
            script: "SELECT 1".to_string(),
            checksum: Some(42),
            installed_by: "blockchain-cli".to_string(),
            installed_on: blockchain_core_domain::value_objects::Timestamp::from(chrono::Utc::now()),
            execution_time_ms: 1,
            success: true,
        }
    }

    #[tokio::test]
    async fn record_assigns_contiguous_ranks() {
        let pool = memory_pool().await;
        let repo = SqlSchemaHistoryRepository::new(pool);

        repo.record(&sample_row("first")).await.unwrap();
        repo.record(&sample_row("second")).await.unwrap();

        let history = repo.history().await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].installed_rank, 1);
        assert_eq!(history[1].installed_rank, 2);
    }

    #[tokio::test]
    async fn current_version_ignores_failed_rows() {
        let pool = memory_pool().await;
        let repo = SqlSchemaHistoryRepository::new(pool);

        let mut failed = sample_row("bad");
        failed.success = false;
        failed.version = "V2".to_string();
        repo.record(&failed).await.unwrap();

        assert_eq!(repo.current_version().await.unwrap(), None);

        repo.record(&sample_row("good")).await.unwrap();
        assert_eq!(repo.current_version().await.unwrap(), Some(1));
    }
}
