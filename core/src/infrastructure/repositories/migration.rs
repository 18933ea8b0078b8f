// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Custom migration engine: plain SQL scripts embedded at compile
//! time, tracked in `schema_history` with a CRC32 checksum per script
//! and strict rank contiguity. Unlike `sqlx::migrate!`, checksum and
//! history are queryable domain data (`SchemaHistoryRow`), not hidden
//! inside sqlx's own tracking table.

use std::time::Instant;

use sqlx::{AnyPool, Row};
use tracing::{debug, error, info};

use blockchain_core_domain::entities::SchemaHistoryRow;
use blockchain_core_domain::value_objects::Timestamp;
use blockchain_core_domain::BlockchainError;

/// One embedded migration script, named `V<version>__<description>.sql`
/// by convention; `description` here is the human-readable form used in
/// `schema_history.description`.
pub struct MigrationScript {
    pub version: u64,
    pub description: &'static str,
    pub script: &'static str,
}

/// All migrations this binary knows about, ascending by version. There
/// is no classpath-style resource directory to scan at runtime for a
/// compiled binary, so scripts are embedded via `include_str!` instead.
pub static MIGRATIONS: &[MigrationScript] = &[MigrationScript {
    version: 1,
    description: "create initial blockchain schema",
    script: include_str!("../../../migrations/V1__create_initial_blockchain_schema.sql"),
}];

const DEFAULT_INSTALLED_BY: &str = "blockchain-cli";

fn db_err(e: sqlx::Error) -> BlockchainError {
    BlockchainError::db(e.to_string())
}

/// CRC32 of the script's normalised body: trailing whitespace trimmed
/// per line, then the whole joined body trimmed, so editor whitespace
/// churn doesn't invalidate an already-applied migration's checksum.
pub fn checksum(script: &str) -> i64 {
    let normalised = script.lines().map(str::trim_end).collect::<Vec<_>>().join("\n");
    crc32fast::hash(normalised.trim().as_bytes()) as i64
}

pub struct MigrationEngine<'a> {
    pool: &'a AnyPool,
}

impl<'a> MigrationEngine<'a> {
    pub fn new(pool: &'a AnyPool) -> Self {
        Self { pool }
    }

    /// Creates `schema_history` if absent; a no-op otherwise.
    pub async fn ensure_initialised(&self) -> Result<(), BlockchainError> {
        ensure_table(self.pool).await
    }

    /// All rows in `installed_rank` order.
    pub async fn history(&self) -> Result<Vec<SchemaHistoryRow>, BlockchainError> {
        self.ensure_initialised().await?;
        fetch_history(self.pool).await
    }

    /// The highest successfully applied version number, if any.
    pub async fn current_version(&self) -> Result<Option<u64>, BlockchainError> {
        Ok(self
            .history()
            .await?
            .into_iter()
            .filter(|row| row.success)
            .filter_map(|row| row.version_number())
            .max())
    }

    /// Checks checksum match against the embedded scripts, rank
    /// contiguity starting at 1, and that every applied version still
    /// has a corresponding embedded script.
    pub async fn validate(&self) -> Result<(), BlockchainError> {
        let rows = self.history().await?;
        for (index, row) in rows.iter().enumerate() {
            let expected_rank = index as i64 + 1;
            if row.installed_rank != expected_rank {
                return Err(BlockchainError::integrity(format!(
                    "schema_history rank gap: expected {expected_rank}, found {}",
                    row.installed_rank
                )));
            }
            if !row.success {
                continue;
            }
            let version_number = row
                .version_number()
                .ok_or_else(|| BlockchainError::integrity(format!("malformed migration version '{}'", row.version)))?;
            let script = MIGRATIONS.iter().find(|m| m.version == version_number).ok_or_else(|| {
                BlockchainError::integrity(format!("applied migration V{version_number} has no embedded script"))
            })?;
            let expected = checksum(script.script);
            if row.checksum != Some(expected) {
                return Err(BlockchainError::integrity(format!(
                    "checksum mismatch for V{version_number}: recorded {:?}, expected {expected}",
                    row.checksum
                )));
            }
        }
        Ok(())
    }

    /// Applies every migration newer than the current version, ascending,
    /// each in its own transaction. Stops at the first failure, having
    /// already recorded it as a failed `schema_history` row.
    pub async fn run(&self) -> Result<Vec<SchemaHistoryRow>, BlockchainError> {
        self.ensure_initialised().await?;
        self.validate().await?;

        let applied = self.current_version().await?.unwrap_or(0);
        let mut pending: Vec<&MigrationScript> = MIGRATIONS.iter().filter(|m| m.version > applied).collect();
        pending.sort_by_key(|m| m.version);

        let mut applied_rows = Vec::new();
        for migration in pending {
            let row = self.apply(migration).await?;
            let succeeded = row.success;
            info!(version = migration.version, success = succeeded, "migration applied");
            applied_rows.push(row);
            if !succeeded {
                break;
            }
        }
        Ok(applied_rows)
    }

    async fn apply(&self, migration: &MigrationScript) -> Result<SchemaHistoryRow, BlockchainError> {
        let started = Instant::now();
        let mut tx = self.pool.begin().await.map_err(db_err)?;
        let mut success = true;

        for statement in migration.script.split(';').map(str::trim).filter(|s| !s.is_empty()) {
            if let Err(e) = sqlx::query(statement).execute(&mut *tx).await {
                error!(version = migration.version, error = %e, "migration statement failed");
                success = false;
                break;
            }
        }

        if success {
            tx.commit().await.map_err(db_err)?;
        } else {
            tx.rollback().await.map_err(db_err)?;
        }

        let execution_time_ms = started.elapsed().as_millis() as i64;
        let installed_rank = self.next_installed_rank().await?;
        let row = SchemaHistoryRow {
            installed_rank,
            version: format!("V{}", migration.version),
            description: migration.description.to_string(),
            migration_type: "SQL".to_string(),
            script: migration.script.to_string(),
            checksum: Some(checksum(migration.script)),
            installed_by: DEFAULT_INSTALLED_BY.to_string(),
            installed_on: Timestamp::from(chrono::Utc::now()),
            execution_time_ms,
            success,
        };
        insert_history_row(self.pool, &row).await?;
        Ok(row)
    }

    async fn next_installed_rank(&self) -> Result<i64, BlockchainError> {
        next_installed_rank(self.pool).await
    }
}

/// Creates `schema_history` if absent. Shared with [`SqlSchemaHistoryRepository`](
/// super::sql_schema_history_repository::SqlSchemaHistoryRepository), which exposes
/// the same table through the domain's repository port.
pub(crate) async fn ensure_table(pool: &AnyPool) -> Result<(), BlockchainError> {
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS schema_history (
            installed_rank    BIGINT  NOT NULL PRIMARY KEY,
            version           TEXT    NOT NULL,
            description       TEXT    NOT NULL,
            migration_type    TEXT    NOT NULL,
            script            TEXT    NOT NULL,
            checksum          BIGINT,
            installed_by      TEXT    NOT NULL,
            installed_on      BIGINT  NOT NULL,
            execution_time_ms BIGINT  NOT NULL,
            success           BOOLEAN NOT NULL
        )",
    )
    .execute(pool)
    .await
    .map_err(db_err)?;
    Ok(())
}

pub(crate) async fn fetch_history(pool: &AnyPool) -> Result<Vec<SchemaHistoryRow>, BlockchainError> {
    let rows = sqlx::query(
        "SELECT installed_rank, version, description, migration_type, script, checksum,
                installed_by, installed_on, execution_time_ms, success
         FROM schema_history ORDER BY installed_rank",
    )
    .fetch_all(pool)
    .await
    .map_err(db_err)?;
    rows.into_iter().map(row_to_history).collect()
}

pub(crate) async fn next_installed_rank(pool: &AnyPool) -> Result<i64, BlockchainError> {
    let max_rank: Option<i64> = sqlx::query_scalar("SELECT MAX(installed_rank) FROM schema_history")
        .fetch_one(pool)
        .await
        .map_err(db_err)?;
    Ok(max_rank.unwrap_or(0) + 1)
}

pub(crate) async fn insert_history_row(pool: &AnyPool, row: &SchemaHistoryRow) -> Result<(), BlockchainError> {
    sqlx::query(
        "INSERT INTO schema_history
            (installed_rank, version, description, migration_type, script, checksum,
             installed_by, installed_on, execution_time_ms, success)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(row.installed_rank)
    .bind(&row.version)
    .bind(&row.description)
    .bind(&row.migration_type)
    .bind(&row.script)
    .bind(row.checksum)
    .bind(&row.installed_by)
    .bind(row.installed_on.millis())
    .bind(row.execution_time_ms)
    .bind(row.success)
    .execute(pool)
    .await
    .map_err(db_err)?;
    debug!(rank = row.installed_rank, version = %row.version, "recorded schema_history row");
    Ok(())
}

fn row_to_history(row: sqlx::any::AnyRow) -> Result<SchemaHistoryRow, BlockchainError> {
    Ok(SchemaHistoryRow {
        installed_rank: row.try_get("installed_rank").map_err(db_err)?,
        version: row.try_get("version").map_err(db_err)?,
        description: row.try_get("description").map_err(db_err)?,
        migration_type: row.try_get("migration_type").map_err(db_err)?,
        script: row.try_get("script").map_err(db_err)?,
        checksum: row.try_get("checksum").map_err(db_err)?,
        installed_by: row.try_get("installed_by").map_err(db_err)?,
        installed_on: Timestamp::from_millis(row.try_get("installed_on").map_err(db_err)?),
        execution_time_ms: row.try_get("execution_time_ms").map_err(db_err)?,
        success: row.try_get("success").map_err(db_err)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn memory_pool() -> AnyPool {
        sqlx::any::install_default_drivers();
        AnyPool::connect("sqlite::memory:").await.unwrap()
    }

    #[test]
    fn checksum_ignores_trailing_whitespace_churn() {
        let a = "CREATE TABLE t (x INT);\n";
        let b = "CREATE TABLE t (x INT);   \n\n";
        assert_eq!(checksum(a), checksum(b));
    }

    #[tokio::test]
    async fn run_applies_baseline_and_is_idempotent() {
        let pool = memory_pool().await;
        let engine = MigrationEngine::new(&pool);

        let applied = engine.run().await.unwrap();
        assert_eq!(applied.len(), 1);
        assert!(applied[0].success);
        assert_eq!(engine.current_version().await.unwrap(), Some(1));

        let applied_again = engine.run().await.unwrap();
        assert!(applied_again.is_empty());
    }

    #[tokio::test]
    async fn validate_detects_checksum_tampering() {
        let pool = memory_pool().await;
        let engine = MigrationEngine::new(&pool);
        engine.run().await.unwrap();

        sqlx::query("UPDATE schema_history SET checksum = ? WHERE installed_rank = 1")
            .bind(999_i64)
            .execute(&pool)
            .await
            .unwrap();

        assert!(engine.validate().await.is_err());
    }

    #[tokio::test]
    async fn validate_detects_rank_gap() {
        let pool = memory_pool().await;
        let engine = MigrationEngine::new(&pool);
        engine.run().await.unwrap();

        sqlx::query("UPDATE schema_history SET installed_rank = 5 WHERE installed_rank = 1")
            .execute(&pool)
            .await
            .unwrap();

        assert!(engine.validate().await.is_err());
    }
}
