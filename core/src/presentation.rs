// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Presentation Layer
//!
//! Translates a validated CLI command into calls against the
//! [`BlockEngine`](crate::application::block_engine::BlockEngine), prompts
//! for vault passwords at this boundary rather than accepting them as CLI
//! arguments, and renders the result as either human-readable text or a
//! JSON document (`--json`).

use std::path::PathBuf;
use std::str::FromStr;

use serde_json::json;
use sqlx::AnyPool;

use blockchain_core_bootstrap::cli::ValidatedCommand;
use blockchain_core_domain::entities::{AuthorisedKey, Block};
use blockchain_core_domain::value_objects::{BlockNumber, Category, Hash32, KeyType, Keyword, SearchLevel, Timestamp};
use blockchain_core_domain::BlockchainError;

use crate::application::block_engine::{BlockEngine, ManageKeysOutcome, StatusReport};
use crate::application::commands::{
    AddKeyCommand, AppendBlockCommand, BlockPayload, ExportCommand, ImportCommand, ImportMode, ManageKeysAction,
    RollbackCommand, RollbackTarget, SearchQuery, SignerSpec,
};
use crate::infrastructure::config::DatabaseConfig;
use crate::infrastructure::repositories::migration::MigrationEngine;
use crate::infrastructure::services::{SearchOutcome, ValidationMode, ValidationReport};

fn prompt_password(prompt: &str) -> Result<String, BlockchainError> {
    rpassword::prompt_password(prompt).map_err(BlockchainError::from)
}

fn parse_timestamp(s: &str) -> Result<Timestamp, BlockchainError> {
    chrono::DateTime::parse_from_rfc3339(s)
        .map(|dt| Timestamp::from(dt.with_timezone(&chrono::Utc)))
        .map_err(|e| BlockchainError::usage(format!("invalid RFC3339 timestamp '{s}': {e}")))
}

fn print_json(value: serde_json::Value) {
    println!("{}", serde_json::to_string_pretty(&value).unwrap_or_else(|_| value.to_string()));
}

fn block_summary(block: &Block) -> serde_json::Value {
    json!({
        "block_number": block.block_number.value(),
        "hash": block.hash.to_hex(),
        "previous_hash": block.previous_hash.to_hex(),
        "timestamp": block.timestamp.to_string(),
        "signer_fingerprint": block.signer_fingerprint.to_hex(),
        "category": block.category.as_ref().map(Category::as_str),
        "keywords": block.all_keywords().map(Keyword::as_str).collect::<Vec<_>>(),
        "off_chain": block.data.is_off_chain(),
        "original_size": block.original_size,
    })
}

fn key_summary(key: &AuthorisedKey) -> serde_json::Value {
    json!({
        "fingerprint": key.fingerprint.to_hex(),
        "owner": key.owner,
        "key_type": key.key_type.to_string(),
        "created_at": key.created_at.to_string(),
        "expires_at": key.expires_at.map(|t| t.to_string()),
        "revoked_at": key.revoked_at.map(|t| t.to_string()),
    })
}

fn print_block_line(block: &Block) {
    println!(
        "#{} {} signer={} category={} keywords=[{}]{}",
        block.block_number,
        block.hash,
        block.signer_fingerprint,
        block.category.as_ref().map(Category::as_str).unwrap_or("-"),
        block.all_keywords().map(Keyword::as_str).collect::<Vec<_>>().join(","),
        if block.data.is_off_chain() { " (off-chain)" } else { "" },
    );
}

fn print_key_line(key: &AuthorisedKey) {
    println!(
        "{} owner={} type={}{}",
        key.fingerprint,
        key.owner,
        key.key_type,
        if key.is_revoked() { " REVOKED" } else { "" },
    );
}

/// Dispatches one validated command against the block engine, the raw
/// connection pool (for `database`/`migrate`), and the resolved database
/// configuration (for `database show`).
pub async fn dispatch(
    command: ValidatedCommand,
    json_output: bool,
    engine: &BlockEngine,
    pool: &AnyPool,
    db_config: &DatabaseConfig,
) -> Result<(), BlockchainError> {
    match command {
        ValidatedCommand::Status { detailed } => {
            let status = engine.status().await?;
            render_status(&status, detailed, json_output);
        }

        ValidatedCommand::AddKey {
            owner,
            generate,
            public_key,
            key_file,
            store_private,
            key_type,
            parent_key,
            validity_days,
        } => {
            let store_password = if store_private { Some(prompt_password("Vault password for new key: ")?) } else { None };
            let key_type = key_type.map(|s| KeyType::from_str(&s)).transpose()?.unwrap_or(KeyType::Operational);
            let parent_key = parent_key.map(|s| Hash32::from_hex(&s)).transpose()?;

            let result = engine
                .add_key(AddKeyCommand {
                    owner,
                    generate,
                    public_key,
                    key_file,
                    store_private,
                    store_password,
                    key_type,
                    parent_key,
                    validity_days,
                })
                .await?;

            if json_output {
                print_json(json!({
                    "fingerprint": result.fingerprint.to_hex(),
                    "owner": result.owner,
                    "stored_private_key": result.private_key_der.is_some() && store_private,
                }));
            } else {
                println!("key authorised: {} (owner={})", result.fingerprint, result.owner);
            }
        }

        ValidatedCommand::ListKeys { active_only, detailed } => {
            let keys = engine.list_keys(active_only).await?;
            if json_output {
                print_json(json!(keys.iter().map(key_summary).collect::<Vec<_>>()));
            } else {
                for key in &keys {
                    print_key_line(key);
                    if detailed {
                        println!("  created_at={} public_key={}", key.created_at, key.public_key.to_base64());
                    }
                }
            }
        }

        ValidatedCommand::ManageKeys { list, check, test, delete, rotate, validity_days } => {
            if list {
                let keys = engine.list_keys(false).await?;
                for key in &keys {
                    print_key_line(key);
                }
                return Ok(());
            }
            let action = if let Some(owner) = check {
                ManageKeysAction::Check { owner }
            } else if let Some(owner) = test {
                let password = prompt_password("Vault password: ")?;
                ManageKeysAction::Test { owner, password }
            } else if let Some(owner) = delete {
                ManageKeysAction::Delete { owner }
            } else if let Some(owner) = rotate {
                let password = prompt_password("Current vault password: ")?;
                ManageKeysAction::Rotate { owner, password, validity_days }
            } else {
                return Err(BlockchainError::usage("manage-keys requires one of --list, --check, --test, --delete, --rotate"));
            };

            let outcome = engine.manage_keys(action).await?;
            render_manage_keys_outcome(&outcome, json_output);
        }

        ValidatedCommand::AddBlock { data, file, signer, key_file, generate_key, keywords, category } => {
            let payload = match (data, file) {
                (Some(inline), _) => BlockPayload::Inline(inline.into_bytes()),
                (None, Some(path)) => BlockPayload::File(path),
                (None, None) => return Err(BlockchainError::usage("add-block requires inline data or --file")),
            };

            let signer_spec = if let Some(owner) = signer {
                let password = prompt_password("Vault password: ")?;
                SignerSpec::Vault { owner, password }
            } else if let Some(path) = key_file {
                SignerSpec::KeyFile(path)
            } else if generate_key {
                SignerSpec::Generate
            } else {
                return Err(BlockchainError::usage("add-block requires --signer, --key-file, or --generate-key"));
            };

            let result = engine
                .append(AppendBlockCommand {
                    payload,
                    signer: signer_spec,
                    manual_keywords: keywords.unwrap_or_default(),
                    category,
                })
                .await?;

            if json_output {
                print_json(json!({
                    "block_number": result.block_number.value(),
                    "hash": result.hash.to_hex(),
                    "timestamp": result.timestamp.to_string(),
                    "signer_fingerprint": result.signer_fingerprint.to_hex(),
                    "stored_off_chain": result.stored_off_chain,
                }));
            } else {
                println!(
                    "block {} appended: hash={} signer={}{}",
                    result.block_number,
                    result.hash,
                    result.signer_fingerprint,
                    if result.stored_off_chain { " (off-chain)" } else { "" },
                );
            }
        }

        ValidatedCommand::Validate { detailed, quick } => {
            let mode = if quick {
                ValidationMode::Quick
            } else if detailed {
                ValidationMode::Detailed
            } else {
                ValidationMode::Default
            };
            let report = engine.validate(mode).await?;
            render_validation_report(&report, json_output);
        }

        ValidatedCommand::Search { query, category, block_number, date_from, date_to, fast, level, complete, limit, detailed } => {
            if query.is_none() && category.is_none() && block_number.is_none() && date_from.is_none() {
                return Err(BlockchainError::usage(
                    "search requires a query, or one of --category, --block-number, --date-from",
                ));
            }
            let query = query.map(|q| Keyword::new(&q)).transpose()?;

            let level = if fast {
                SearchLevel::FastOnly
            } else if complete {
                SearchLevel::ExhaustiveOffchain
            } else if let Some(level) = level {
                SearchLevel::from_str(&level)?
            } else {
                SearchLevel::IncludeData
            };

            let category = category.as_deref().map(Category::normalise).transpose()?.flatten();
            let block_number = block_number.map(BlockNumber::new);
            let time_range = match (date_from, date_to) {
                (Some(from), Some(to)) => Some((parse_timestamp(&from)?, parse_timestamp(&to)?)),
                (None, None) => None,
                _ => return Err(BlockchainError::usage("search requires both --date-from and --date-to, or neither")),
            };

            let outcome = engine
                .search(SearchQuery { query, level, category, block_number, time_range, limit: limit.map(|n| n as usize) })
                .await?;
            render_search_outcome(&outcome, detailed, json_output);
        }

        ValidatedCommand::Export { path } => {
            let result = engine.export(ExportCommand { path }).await?;
            if json_output {
                print_json(json!({
                    "path": result.path.to_string_lossy(),
                    "block_count": result.block_count,
                    "key_count": result.key_count,
                }));
            } else {
                println!("exported {} block(s), {} key(s) to {}", result.block_count, result.key_count, result.path.display());
            }
        }

        ValidatedCommand::Import { path, force, validate_after, backup, dry_run } => {
            let mode = if force { ImportMode::Replace } else { ImportMode::Merge };

            if backup && mode == ImportMode::Replace && !dry_run {
                let backup_path = backup_path_for(&path);
                engine.export(ExportCommand { path: backup_path.clone() }).await?;
                println!("backed up current chain to {}", backup_path.display());
            }

            let result = engine.import(ImportCommand { path, mode, force, validate_after, dry_run }).await?;
            if json_output {
                print_json(json!({ "block_count": result.block_count, "dry_run": result.dry_run }));
            } else if result.dry_run {
                println!("dry run: would import {} block(s)", result.block_count);
            } else {
                println!("imported {} block(s)", result.block_count);
            }
        }

        ValidatedCommand::Rollback { blocks, to_block, dry_run, confirm } => {
            if !dry_run && !confirm {
                return Err(BlockchainError::usage("rollback requires --confirm unless --dry-run is given"));
            }
            let target = if let Some(n) = blocks {
                RollbackTarget::LastNBlocks(n)
            } else if let Some(b) = to_block {
                RollbackTarget::ToBlock(BlockNumber::new(b))
            } else {
                return Err(BlockchainError::usage("rollback requires --blocks or --to-block"));
            };
            let result = engine.rollback(RollbackCommand { target, dry_run }).await?;
            if json_output {
                print_json(json!({
                    "new_head": result.new_head.value(),
                    "blocks_removed": result.blocks_removed,
                    "off_chain_records_removed": result.off_chain_records_removed,
                    "dry_run": result.dry_run,
                }));
            } else if result.dry_run {
                println!("dry run: would remove {} block(s), new head would be #{}", result.blocks_removed, result.new_head);
            } else {
                println!(
                    "rolled back {} block(s) ({} off-chain record(s) collected), new head is #{}",
                    result.blocks_removed, result.off_chain_records_removed, result.new_head
                );
            }
        }

        ValidatedCommand::Database { action, file: _, format: _, no_mask } => match action.as_str() {
            "show" => {
                let props = db_config.masked_properties();
                if json_output {
                    print_json(json!(props.into_iter().collect::<std::collections::BTreeMap<_, _>>()));
                } else {
                    for (key, value) in props {
                        println!("{key} = {value}");
                    }
                    if no_mask {
                        println!("(--no-mask has no effect; secrets are never unmasked)");
                    }
                }
            }
            other => return Err(BlockchainError::usage(format!("unknown database action '{other}'"))),
        },

        ValidatedCommand::Migrate { action } => {
            let migration_engine = MigrationEngine::new(pool);
            match action.as_str() {
                "status" => {
                    let history = migration_engine.history().await?;
                    if json_output {
                        print_json(json!(history
                            .iter()
                            .map(|r| json!({
                                "installed_rank": r.installed_rank,
                                "version": r.version,
                                "description": r.description,
                                "success": r.success,
                            }))
                            .collect::<Vec<_>>()));
                    } else {
                        for row in &history {
                            println!("{} {} - {} ({})", row.installed_rank, row.version, row.description, if row.success { "ok" } else { "FAILED" });
                        }
                    }
                }
                "run" => {
                    let applied = migration_engine.run().await?;
                    println!("applied {} migration(s)", applied.len());
                }
                "validate" => {
                    migration_engine.validate().await?;
                    println!("schema history is consistent");
                }
                other => return Err(BlockchainError::usage(format!("unknown migrate action '{other}'"))),
            }
        }
    }

    Ok(())
}

fn backup_path_for(import_path: &std::path::Path) -> PathBuf {
    let stem = import_path.file_stem().and_then(|s| s.to_str()).unwrap_or("chain");
    import_path.with_file_name(format!("{stem}.pre-import-backup.json"))
}

fn render_status(status: &StatusReport, _detailed: bool, json_output: bool) {
    if json_output {
        print_json(json!({
            "head_block_number": status.head_block_number.map(|n| n.value()),
            "head_hash": status.head_hash.map(|h| h.to_hex()),
            "total_blocks": status.total_blocks,
            "total_keys": status.total_keys,
            "active_keys": status.active_keys,
            "revoked_keys": status.revoked_keys,
        }));
    } else {
        match status.head_block_number {
            Some(head) => println!("head: #{head} ({})", status.head_hash.unwrap()),
            None => println!("head: (empty chain)"),
        }
        println!("blocks: {}", status.total_blocks);
        println!("keys: {} total, {} active, {} revoked", status.total_keys, status.active_keys, status.revoked_keys);
    }
}

fn render_manage_keys_outcome(outcome: &ManageKeysOutcome, json_output: bool) {
    match outcome {
        ManageKeysOutcome::Exists(exists) => {
            if json_output {
                print_json(json!({ "exists": exists }));
            } else {
                println!("{}", if *exists { "present" } else { "absent" });
            }
        }
        ManageKeysOutcome::PasswordValid(valid) => {
            if json_output {
                print_json(json!({ "password_valid": valid }));
            } else {
                println!("{}", if *valid { "password valid" } else { "password invalid" });
            }
        }
        ManageKeysOutcome::Deleted => {
            if json_output {
                print_json(json!({ "deleted": true }));
            } else {
                println!("vault entry deleted");
            }
        }
        ManageKeysOutcome::Rotated { old_fingerprint, new_fingerprint } => {
            if json_output {
                print_json(json!({
                    "old_fingerprint": old_fingerprint.to_hex(),
                    "new_fingerprint": new_fingerprint.to_hex(),
                }));
            } else {
                println!("rotated {old_fingerprint} -> {new_fingerprint}");
            }
        }
    }
}

fn render_validation_report(report: &ValidationReport, json_output: bool) {
    if json_output {
        print_json(json!({
            "structurally_intact": report.structurally_intact,
            "fully_compliant": report.fully_compliant,
            "total_blocks": report.total_blocks,
            "revoked_blocks": report.revoked_blocks,
            "invalid_blocks": report.invalid_blocks,
            "issues": report.issues.iter().map(|i| json!({
                "block_number": i.block_number,
                "kind": i.kind,
                "message": i.message,
            })).collect::<Vec<_>>(),
        }));
    } else {
        println!(
            "structurally_intact={} fully_compliant={} blocks={} revoked={} invalid={}",
            report.structurally_intact, report.fully_compliant, report.total_blocks, report.revoked_blocks, report.invalid_blocks
        );
        for issue in &report.issues {
            println!("  #{} {}: {}", issue.block_number, issue.kind, issue.message);
        }
    }
}

fn render_search_outcome(outcome: &SearchOutcome, _detailed: bool, json_output: bool) {
    if json_output {
        print_json(json!({
            "matches": outcome.matches.iter().map(block_summary).collect::<Vec<_>>(),
            "undecidable": outcome.undecidable.iter().map(|n| n.value()).collect::<Vec<_>>(),
        }));
    } else {
        for block in &outcome.matches {
            print_block_line(block);
        }
        if !outcome.undecidable.is_empty() {
            println!(
                "undecidable (off-chain decrypt failed): {}",
                outcome.undecidable.iter().map(|n| n.to_string()).collect::<Vec<_>>().join(",")
            );
        }
    }
}
