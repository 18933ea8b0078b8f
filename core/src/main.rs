// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! `blockchain-cli` binary entry point: wires bootstrap CLI parsing,
//! database config resolution, pool connection, migrations, and every
//! repository/service the block engine needs, then hands the validated
//! command to [`presentation::dispatch`].

use std::path::{Path, PathBuf};
use std::sync::Arc;

use rand::RngCore;
use tracing_subscriber::EnvFilter;

use blockchain_core_bootstrap::{bootstrap_cli, result_to_exit_code};
use blockchain_core_domain::services::{CryptoService, Sha3P256CryptoService};
use blockchain_core_domain::BlockchainError;

use blockchain_core::application::block_engine::BlockEngine;
use blockchain_core::infrastructure::config::{database_config, CliOverrides};
use blockchain_core::infrastructure::logging::TracingEventSink;
use blockchain_core::infrastructure::repositories::{
    connect, migration::MigrationEngine, SqlAuthorisedKeyRepository, SqlBlockRepository, SqlOffChainRecordRepository,
    SqlVaultRepository,
};
use blockchain_core::infrastructure::services::offchain_store::DEFAULT_OFF_CHAIN_THRESHOLD;
use blockchain_core::infrastructure::services::{OffChainStore, SearchEngine, ValidationEngine, Vault};
use blockchain_core::presentation;

const MASTER_KEY_FILE: &str = ".master.key";

fn home_dir() -> Option<PathBuf> {
    std::env::var_os("HOME").map(PathBuf::from)
}

/// Directory the off-chain store and master key live under: the parent
/// of the database file for H2/SQLite, or `<home>/.blockchain-cli` for
/// networked engines with no file path of their own. Overridable with
/// `BLOCKCHAIN_OFFCHAIN_DIR`; the off-chain size threshold is
/// overridable with `BLOCKCHAIN_OFFCHAIN_THRESHOLD` (bytes).
fn state_dir(db_url: Option<&str>) -> PathBuf {
    if let Some(url) = db_url {
        let path = Path::new(url);
        match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => return parent.to_path_buf(),
            Some(_) => return PathBuf::from("."),
            None => {}
        }
    }
    home_dir().unwrap_or_else(|| PathBuf::from(".")).join(".blockchain-cli")
}

/// Loads the 32-byte off-chain master key from `<state_dir>/.master.key`,
/// generating and persisting one with 0600 permissions on first run.
fn load_or_create_master_key(dir: &Path) -> Result<[u8; 32], BlockchainError> {
    let path = dir.join(MASTER_KEY_FILE);
    if let Ok(bytes) = std::fs::read(&path) {
        if let Ok(key) = <[u8; 32]>::try_from(bytes.as_slice()) {
            return Ok(key);
        }
    }

    std::fs::create_dir_all(dir)?;
    let mut key = [0u8; 32];
    rand::rng().fill_bytes(&mut key);
    write_0600(&path, &key)?;
    Ok(key)
}

#[cfg(unix)]
fn write_0600(path: &Path, contents: &[u8]) -> Result<(), BlockchainError> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::write(path, contents)?;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600)).map_err(BlockchainError::from)
}

#[cfg(not(unix))]
fn write_0600(path: &Path, contents: &[u8]) -> Result<(), BlockchainError> {
    std::fs::write(path, contents).map_err(BlockchainError::from)
}

fn init_tracing(verbose: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(if verbose { "debug" } else { "info" }));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

async fn run() -> Result<(), BlockchainError> {
    let validated_cli = bootstrap_cli().map_err(|e| BlockchainError::usage(e.to_string()))?;
    init_tracing(validated_cli.verbose);

    let cli_overrides = CliOverrides {
        db_type: validated_cli.db_type.clone(),
        db_url: validated_cli.db_url.clone(),
        db_host: validated_cli.db_host.clone(),
        db_port: validated_cli.db_port,
        db_name: validated_cli.db_name.clone(),
        db_user: validated_cli.db_user.clone(),
        db_password: validated_cli.db_password.clone(),
    };
    let db_config = database_config::resolve(&cli_overrides, home_dir().as_deref())?;

    let pool = connect(&db_config).await?;
    MigrationEngine::new(&pool).run().await?;

    let dir = state_dir(db_config.url.as_deref());
    let offchain_dir = std::env::var("BLOCKCHAIN_OFFCHAIN_DIR").map(PathBuf::from).unwrap_or_else(|_| dir.join("offchain"));
    let offchain_threshold = std::env::var("BLOCKCHAIN_OFFCHAIN_THRESHOLD")
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .unwrap_or(DEFAULT_OFF_CHAIN_THRESHOLD);
    let master_key = load_or_create_master_key(&dir)?;

    let crypto: Arc<dyn CryptoService> = Arc::new(Sha3P256CryptoService::new());
    let blocks = Arc::new(SqlBlockRepository::new(pool.clone()));
    let keys = Arc::new(SqlAuthorisedKeyRepository::new(pool.clone()));
    let offchain_records = Arc::new(SqlOffChainRecordRepository::new(pool.clone()));
    let vault_repository = Arc::new(SqlVaultRepository::new(pool.clone()));

    let vault = Arc::new(Vault::new(vault_repository, crypto.clone()));
    let offchain = Arc::new(OffChainStore::new(
        offchain_dir.clone(),
        offchain_threshold,
        master_key,
        crypto.clone(),
        offchain_records.clone(),
    ));
    let validation = Arc::new(ValidationEngine::new(blocks.clone(), keys.clone(), offchain.clone(), crypto.clone()));
    let search = Arc::new(SearchEngine::new(blocks.clone(), offchain.clone()));
    let events = Arc::new(TracingEventSink::new());

    let engine = BlockEngine::new(blocks, keys, offchain_records, vault, offchain, offchain_dir, validation, search, crypto, events);

    presentation::dispatch(validated_cli.command, validated_cli.json, &engine, &pool, &db_config).await
}

#[tokio::main]
async fn main() -> std::process::ExitCode {
    let result = run().await;
    if let Err(ref e) = result {
        eprintln!("error: {e}");
    }
    result_to_exit_code(result, |e: &BlockchainError| e.code())
}
