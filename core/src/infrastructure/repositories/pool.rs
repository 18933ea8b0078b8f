// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Connection pool initialization against a resolved [`DatabaseConfig`].
//! One code path across all four engines via `sqlx::Any`; the config's
//! pool profile and timeouts come from `DatabaseKind::default_pool_range`
//! unless overridden.

use std::time::Duration;

use sqlx::any::{AnyConnectOptions, AnyPoolOptions};
use sqlx::AnyPool;
use tracing::{debug, info};

use blockchain_core_domain::value_objects::DatabaseKind;
use blockchain_core_domain::BlockchainError;

use crate::infrastructure::config::{DatabaseConfig, Hbm2ddlMode};

/// Connects a pool for `config`, creating the underlying file for
/// H2/SQLite if it doesn't exist, then running the `hbm2ddl == update`
/// baseline bootstrap before returning.
pub async fn connect(config: &DatabaseConfig) -> Result<AnyPool, BlockchainError> {
    sqlx::any::install_default_drivers();

    let url = config.connect_url()?;
    ensure_file_database_exists(config.kind, &url).await?;

    let options = AnyConnectOptions::from_url(&url.parse().map_err(|e| BlockchainError::config(format!("invalid database url: {e}")))?)
        .map_err(|e| BlockchainError::db(e.to_string()))?;

    let pool = AnyPoolOptions::new()
        .min_connections(config.pool.min_size)
        .max_connections(config.pool.max_size)
        .acquire_timeout(Duration::from_millis(config.pool.acquisition_timeout_ms))
        .idle_timeout(Duration::from_millis(config.pool.idle_timeout_ms))
        .max_lifetime(Duration::from_millis(config.pool.max_lifetime_ms))
        .connect_with(options)
        .await
        .map_err(|e| BlockchainError::db(e.to_string()))?;

    if config.hbm2ddl == Hbm2ddlMode::Update {
        bootstrap_baseline_schema(&pool).await?;
    }

    info!(kind = %config.kind, min = config.pool.min_size, max = config.pool.max_size, "connected database pool");
    Ok(pool)
}

/// Creates the H2/SQLite file if it's missing. PostgreSQL/MySQL are
/// expected to already exist (the CLI doesn't provision server databases).
async fn ensure_file_database_exists(kind: DatabaseKind, url: &str) -> Result<(), BlockchainError> {
    match kind {
        DatabaseKind::H2 | DatabaseKind::Sqlite => {
            if !sqlx::Sqlite::database_exists(url).await.unwrap_or(false) {
                debug!(url, "database file does not exist, creating");
                sqlx::Sqlite::create_database(url).await.map_err(|e| BlockchainError::db(e.to_string()))?;
            }
            Ok(())
        }
        DatabaseKind::Postgresql | DatabaseKind::Mysql => Ok(()),
    }
}

/// Non-ORM stand-in for the original system's `hbm2ddl=update` behaviour
///: creates the baseline tables if absent,
/// idempotently, on first connect. The migration engine takes over
/// from there; this never records a `schema_history` row itself.
async fn bootstrap_baseline_schema(pool: &AnyPool) -> Result<(), BlockchainError> {
    const BASELINE: &str = include_str!("../../../migrations/V1__create_initial_blockchain_schema.sql");
    for statement in BASELINE.split(';').map(str::trim).filter(|s| !s.is_empty()) {
        sqlx::query(statement).execute(pool).await.map_err(|e| BlockchainError::db(e.to_string()))?;
    }
    debug!("baseline schema bootstrap complete");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::config::DatabaseConfig;

    #[tokio::test]
    async fn connects_and_bootstraps_embedded_sqlite() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("blockchain.db");
        let mut config = DatabaseConfig::hard_default();
        config.kind = DatabaseKind::Sqlite;
        config.url = Some(db_path.to_str().unwrap().to_string());

        let pool = connect(&config).await.unwrap();
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name='block'")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn bootstrap_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("blockchain.db");
        let mut config = DatabaseConfig::hard_default();
        config.kind = DatabaseKind::Sqlite;
        config.url = Some(db_path.to_str().unwrap().to_string());

        let pool = connect(&config).await.unwrap();
        bootstrap_baseline_schema(&pool).await.unwrap();
    }
}
