// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Block Engine
//!
//! The single orchestrator for every mutating and query operation the CLI
//! exposes. It is the only component that calls `BlockRepository::save`,
//! `AuthorisedKeyRepository::save`, and `OffChainRecordRepository::save`
//!: the domain's `ChainLink` aggregate decides whether a block may
//! legally extend the chain, `CryptoService` signs and verifies, and
//! `BlockEngine` sequences those decisions against the repositories under
//! a single process-wide writer lock. Signer resolution and payload reads
//! happen before the lock is taken; the off-chain write and the
//! head-load/build/persist/release sequence all run inside it, so an
//! off-chain write that commits but whose block never saves is rolled
//! back before the lock is released.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use base64::Engine;
use p256::ecdsa::{SigningKey, VerifyingKey};
use p256::pkcs8::{DecodePrivateKey, EncodePrivateKey};
use serde::{Deserialize, Serialize};

use blockchain_core_domain::aggregates::{ChainLink, PendingBlock};
use blockchain_core_domain::entities::{AuthorisedKey, Block, OffChainRecord};
use blockchain_core_domain::events::{BlockchainEvent, BlockchainEventPayload, EventSink};
use blockchain_core_domain::repositories::{AuthorisedKeyRepository, BlockRepository, OffChainRecordRepository};
use blockchain_core_domain::services::{keyword_service, CryptoService};
use blockchain_core_domain::value_objects::{BlockNumber, Category, Hash32, KeyType, PublicKeyBytes, Timestamp};
use blockchain_core_domain::BlockchainError;

use crate::infrastructure::services::{
    load_private_key_der, OffChainStore, SearchEngine, SearchFilters, SearchOutcome, ValidationEngine, ValidationMode,
    ValidationReport, Vault,
};

use super::commands::{
    AddKeyCommand, AddKeyResult, AppendBlockCommand, AppendBlockResult, BlockPayload, ExportCommand, ExportResult,
    ImportCommand, ImportMode, ManageKeysAction, RollbackCommand, RollbackResult, RollbackTarget, SearchQuery,
    SignerSpec,
};

/// Document schema version written to an export file's metadata block.
const EXPORT_SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportMetadata {
    pub exported_at: Timestamp,
    pub schema_version: u32,
    pub block_count: u64,
    pub key_count: u64,
}

/// An off-chain blob embedded in an export document: the ciphertext as
/// read directly from disk, never decrypted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportedOffChainBlob {
    pub content_id: Hash32,
    pub ciphertext: String,
    pub nonce: String,
    pub cleartext_size: u64,
    pub encryption_key_ref: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportDocument {
    pub metadata: ExportMetadata,
    pub authorised_keys: Vec<AuthorisedKey>,
    pub blocks: Vec<Block>,
    pub off_chain: Vec<ExportedOffChainBlob>,
}

/// Outcome of a `manage-keys` imperative action.
#[derive(Debug, Clone)]
pub enum ManageKeysOutcome {
    Exists(bool),
    PasswordValid(bool),
    Deleted,
    Rotated { old_fingerprint: Hash32, new_fingerprint: Hash32 },
}

#[derive(Debug, Clone)]
pub struct StatusReport {
    pub head_block_number: Option<BlockNumber>,
    pub head_hash: Option<Hash32>,
    pub total_blocks: u64,
    pub total_keys: u64,
    pub active_keys: u64,
    pub revoked_keys: u64,
}

/// Generates a fresh P-256 key pair, returning its PKCS#8 DER private key,
/// SEC1 public key, and fingerprint.
fn generate_keypair(crypto: &dyn CryptoService) -> Result<(Vec<u8>, PublicKeyBytes, Hash32), BlockchainError> {
    let signing_key = SigningKey::random(&mut rand::rng());
    let private_der = signing_key
        .to_pkcs8_der()
        .map_err(|e| BlockchainError::integrity(format!("key generation failed: {e}")))?
        .as_bytes()
        .to_vec();
    let verifying_key = VerifyingKey::from(&signing_key);
    let public_key = PublicKeyBytes::new(verifying_key.to_sec1_bytes().to_vec());
    let fingerprint = crypto.fingerprint(&public_key);
    Ok((private_der, public_key, fingerprint))
}

/// Derives the SEC1 public key from a PKCS#8 DER private key.
fn derive_public_from_private(private_der: &[u8]) -> Result<PublicKeyBytes, BlockchainError> {
    let signing_key = SigningKey::from_pkcs8_der(private_der)
        .map_err(|e| BlockchainError::usage(format!("invalid private key: {e}")))?;
    let verifying_key = VerifyingKey::from(&signing_key);
    Ok(PublicKeyBytes::new(verifying_key.to_sec1_bytes().to_vec()))
}

#[cfg(unix)]
fn write_0600(path: &Path, contents: &[u8]) -> Result<(), BlockchainError> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::write(path, contents).map_err(BlockchainError::from)?;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600)).map_err(BlockchainError::from)
}

#[cfg(not(unix))]
fn write_0600(path: &Path, contents: &[u8]) -> Result<(), BlockchainError> {
    std::fs::write(path, contents).map_err(BlockchainError::from)
}

/// Offline structural and signature validation of an imported chain. Rebuilds the
/// chain from genesis using [`ChainLink::validate_extends`] and verifies
/// each block's signature against the signer key carried in the same
/// document.
fn validate_import_chain(
    blocks: &[Block],
    keys: &[AuthorisedKey],
    crypto: &dyn CryptoService,
) -> Result<(), BlockchainError> {
    let by_fingerprint: HashMap<Hash32, &AuthorisedKey> = keys.iter().map(|k| (k.fingerprint, k)).collect();
    let mut previous: Option<Block> = None;
    for block in blocks {
        let chain = ChainLink::at_head(previous.as_ref());
        chain.validate_extends(block, crypto)?;
        let signer = by_fingerprint.get(&block.signer_fingerprint).ok_or_else(|| {
            BlockchainError::integrity(format!(
                "block {} signed by unknown key {}",
                block.block_number, block.signer_fingerprint
            ))
        })?;
        crypto.verify(&signer.public_key, &block.signing_tuple(), &block.signature)?;
        previous = Some(block.clone());
    }
    Ok(())
}

/// The orchestrator behind every `blockchain-cli` subcommand.
pub struct BlockEngine {
    blocks: Arc<dyn BlockRepository>,
    keys: Arc<dyn AuthorisedKeyRepository>,
    offchain_records: Arc<dyn OffChainRecordRepository>,
    vault: Arc<Vault>,
    offchain: Arc<OffChainStore>,
    offchain_dir: PathBuf,
    validation: Arc<ValidationEngine>,
    search: Arc<SearchEngine>,
    crypto: Arc<dyn CryptoService>,
    events: Arc<dyn EventSink>,
    write_lock: tokio::sync::RwLock<()>,
}

impl BlockEngine {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        blocks: Arc<dyn BlockRepository>,
        keys: Arc<dyn AuthorisedKeyRepository>,
        offchain_records: Arc<dyn OffChainRecordRepository>,
        vault: Arc<Vault>,
        offchain: Arc<OffChainStore>,
        offchain_dir: PathBuf,
        validation: Arc<ValidationEngine>,
        search: Arc<SearchEngine>,
        crypto: Arc<dyn CryptoService>,
        events: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            blocks,
            keys,
            offchain_records,
            vault,
            offchain,
            offchain_dir,
            validation,
            search,
            crypto,
            events,
            write_lock: tokio::sync::RwLock::new(()),
        }
    }

    async fn auto_authorise(
        &self,
        owner: String,
        public_key: PublicKeyBytes,
        fingerprint: Hash32,
        now: Timestamp,
    ) -> Result<(), BlockchainError> {
        let key = AuthorisedKey {
            fingerprint,
            owner: owner.clone(),
            public_key,
            key_type: KeyType::Operational,
            parent_fingerprint: None,
            created_at: now,
            expires_at: None,
            revoked_at: None,
        };
        self.keys.save(&key).await?;
        self.events
            .emit(BlockchainEvent::new(BlockchainEventPayload::KeyAuthorised { fingerprint, owner }))
            .await
    }

    /// Resolves the signing key for an append across its three branches:
    /// vault/key-file/generated keys all run before the writer
    /// lock is taken; vault password prompting happens at the presentation
    /// boundary, not here.
    async fn resolve_signer(
        &self,
        spec: &SignerSpec,
        now: Timestamp,
    ) -> Result<(Vec<u8>, PublicKeyBytes, Hash32), BlockchainError> {
        match spec {
            SignerSpec::Vault { owner, password } => {
                if self.vault.check(owner).await? {
                    let private_der = self.vault.load(owner, password).await?;
                    let public_key = derive_public_from_private(&private_der)?;
                    let fingerprint = self.crypto.fingerprint(&public_key);
                    Ok((private_der, public_key, fingerprint))
                } else {
                    tracing::warn!(owner, "no vault entry for signer, generating a temporary demo key");
                    let (private_der, public_key, fingerprint) = generate_keypair(self.crypto.as_ref())?;
                    self.auto_authorise(owner.clone(), public_key.clone(), fingerprint, now).await?;
                    Ok((private_der, public_key, fingerprint))
                }
            }
            SignerSpec::KeyFile(path) => {
                let private_der = load_private_key_der(path)?;
                let public_key = derive_public_from_private(&private_der)?;
                let fingerprint = self.crypto.fingerprint(&public_key);
                if self.keys.find_by_fingerprint(fingerprint).await?.is_none() {
                    let basename = path.file_stem().and_then(|s| s.to_str()).unwrap_or("key");
                    let nanos = now_nanos();
                    let owner = format!("KeyFile-{basename}-{nanos}");
                    self.auto_authorise(owner, public_key.clone(), fingerprint, now).await?;
                }
                Ok((private_der, public_key, fingerprint))
            }
            SignerSpec::Generate => {
                let (private_der, public_key, fingerprint) = generate_keypair(self.crypto.as_ref())?;
                let owner = format!("Generated-{}", now_nanos());
                self.auto_authorise(owner, public_key.clone(), fingerprint, now).await?;
                Ok((private_der, public_key, fingerprint))
            }
        }
    }

    /// Appends one block to the chain. Payload reads and signer resolution
    /// run before the writer lock; the off-chain write, the head-load, the
    /// build, and the persist all run inside it, so that a block-save
    /// failure can still roll back the off-chain record+file written in
    /// the same append.
    pub async fn append(&self, cmd: AppendBlockCommand) -> Result<AppendBlockResult, BlockchainError> {
        let payload_bytes = match &cmd.payload {
            BlockPayload::Inline(bytes) => bytes.clone(),
            BlockPayload::File(path) => std::fs::read(path)?,
        };
        let now = Timestamp::from(chrono::Utc::now());
        let (private_key_der, public_key, signer_fingerprint) = self.resolve_signer(&cmd.signer, now).await?;

        let manual_keywords = keyword_service::split_manual_keywords(&cmd.manual_keywords)?;
        let auto_keywords = keyword_service::extract_auto_keywords(&String::from_utf8_lossy(&payload_bytes));
        let category = cmd.category.as_deref().map(Category::normalise).transpose()?.flatten();
        let original_size = payload_bytes.len() as u64;

        let guard = self.write_lock.write().await;

        let (data, stored_off_chain, off_chain_written) = if self.offchain.should_store_off_chain(original_size) {
            let (content_id, record) = self.offchain.write(&payload_bytes).await?;
            if let Some(record) = &record {
                self.offchain_records.save(record).await?;
            }
            (blockchain_core_domain::entities::BlockData::OffChainRef(content_id), true, record.map(|_| content_id))
        } else {
            (blockchain_core_domain::entities::BlockData::Inline(payload_bytes), false, None)
        };

        let pending = PendingBlock { data, manual_keywords, auto_keywords, category, original_size };

        let head = self.blocks.find_latest().await?;
        let timestamp = match &head {
            Some(h) => now.max(h.timestamp),
            None => now,
        };
        let link = ChainLink::at_head(head.as_ref());
        let block = link.append(pending, timestamp, signer_fingerprint, &public_key, &private_key_der, self.crypto.as_ref())?;

        if let Err(err) = self.blocks.save(&block).await {
            if let Some(content_id) = off_chain_written {
                self.rollback_off_chain_write(content_id).await;
            }
            drop(guard);
            return Err(err);
        }
        drop(guard);

        self.events
            .emit(BlockchainEvent::new(BlockchainEventPayload::BlockAppended {
                block_number: block.block_number,
                hash: block.hash,
            }))
            .await?;

        Ok(AppendBlockResult {
            block_number: block.block_number,
            hash: block.hash,
            timestamp: block.timestamp,
            signer_fingerprint,
            stored_off_chain,
        })
    }

    /// Compensating action for a block save that failed after an off-chain
    /// write already committed in the same append: deletes the orphaned
    /// record and file so the two stores don't drift out of sync.
    async fn rollback_off_chain_write(&self, content_id: Hash32) {
        if let Err(e) = self.offchain.delete(content_id).await {
            tracing::warn!(content_id = %content_id, error = %e, "failed to roll back off-chain write after block save failure");
        }
    }

    /// Registers a new signing identity.
    pub async fn add_key(&self, cmd: AddKeyCommand) -> Result<AddKeyResult, BlockchainError> {
        let now = Timestamp::from(chrono::Utc::now());

        let (public_key, private_key_der): (PublicKeyBytes, Option<Vec<u8>>) = if cmd.generate {
            let (private_der, public, _) = generate_keypair(self.crypto.as_ref())?;
            (public, Some(private_der))
        } else if let Some(path) = &cmd.key_file {
            let private_der = load_private_key_der(path)?;
            let public = derive_public_from_private(&private_der)?;
            (public, Some(private_der))
        } else if let Some(b64) = &cmd.public_key {
            (PublicKeyBytes::from_base64(b64)?, None)
        } else {
            return Err(BlockchainError::usage("add-key requires --generate, --key-file, or --public-key"));
        };

        let fingerprint = self.crypto.fingerprint(&public_key);
        if self.keys.find_by_fingerprint(fingerprint).await?.is_some() {
            return Err(BlockchainError::conflict(format!("key {fingerprint} is already authorised")));
        }
        if let Some(parent) = cmd.parent_key {
            self.keys
                .find_by_fingerprint(parent)
                .await?
                .ok_or_else(|| BlockchainError::not_found(format!("parent key {parent} not found")))?;
        }

        let expires_at = cmd.validity_days.map(|days| Timestamp::from_millis(now.millis() + days as i64 * 86_400_000));

        let key = AuthorisedKey {
            fingerprint,
            owner: cmd.owner.clone(),
            public_key,
            key_type: cmd.key_type,
            parent_fingerprint: cmd.parent_key,
            created_at: now,
            expires_at,
            revoked_at: None,
        };
        self.keys.save(&key).await?;
        self.events
            .emit(BlockchainEvent::new(BlockchainEventPayload::KeyAuthorised { fingerprint, owner: cmd.owner.clone() }))
            .await?;

        if cmd.store_private {
            let private_der = private_key_der
                .clone()
                .ok_or_else(|| BlockchainError::usage("--store-private requires a private key (--generate or --key-file)"))?;
            let password = cmd
                .store_password
                .as_deref()
                .ok_or_else(|| BlockchainError::usage("--store-private requires a vault password"))?;
            self.vault.store(&cmd.owner, &private_der, password).await?;
        }

        Ok(AddKeyResult { fingerprint, owner: cmd.owner, private_key_der })
    }

    /// Lists authorised keys, optionally filtered to those active right now.
    pub async fn list_keys(&self, active_only: bool) -> Result<Vec<AuthorisedKey>, BlockchainError> {
        let now = Timestamp::from(chrono::Utc::now());
        let keys = self.keys.list_all().await?;
        Ok(if active_only { keys.into_iter().filter(|k| k.is_active_at(now)).collect() } else { keys })
    }

    /// Runs one `manage-keys` imperative action against the vault.
    pub async fn manage_keys(&self, action: ManageKeysAction) -> Result<ManageKeysOutcome, BlockchainError> {
        match action {
            ManageKeysAction::Check { owner } => Ok(ManageKeysOutcome::Exists(self.vault.check(&owner).await?)),
            ManageKeysAction::Test { owner, password } => {
                Ok(ManageKeysOutcome::PasswordValid(self.vault.test(&owner, &password).await?))
            }
            ManageKeysAction::Delete { owner } => {
                self.vault.delete(&owner).await?;
                Ok(ManageKeysOutcome::Deleted)
            }
            ManageKeysAction::Rotate { owner, password, validity_days } => {
                let private_der = self.vault.load(&owner, &password).await?;
                let old_public = derive_public_from_private(&private_der)?;
                let old_fingerprint = self.crypto.fingerprint(&old_public);

                let (new_private, new_public, new_fingerprint) = generate_keypair(self.crypto.as_ref())?;
                let now = Timestamp::from(chrono::Utc::now());
                let expires_at = validity_days.map(|d| Timestamp::from_millis(now.millis() + d as i64 * 86_400_000));

                let key = AuthorisedKey {
                    fingerprint: new_fingerprint,
                    owner: owner.clone(),
                    public_key: new_public,
                    key_type: KeyType::Operational,
                    parent_fingerprint: Some(old_fingerprint),
                    created_at: now,
                    expires_at,
                    revoked_at: None,
                };
                self.keys.save(&key).await?;
                self.keys.revoke(old_fingerprint, now).await?;
                self.vault.store(&owner, &new_private, &password).await?;

                self.events
                    .emit(BlockchainEvent::new(BlockchainEventPayload::KeyRevoked { fingerprint: old_fingerprint }))
                    .await?;
                self.events
                    .emit(BlockchainEvent::new(BlockchainEventPayload::KeyAuthorised {
                        fingerprint: new_fingerprint,
                        owner,
                    }))
                    .await?;

                Ok(ManageKeysOutcome::Rotated { old_fingerprint, new_fingerprint })
            }
        }
    }

    /// Rolls the chain back by `cmd.target`. A dry run
    /// reports the affected set without mutating anything; genesis is
    /// never removable.
    pub async fn rollback(&self, cmd: RollbackCommand) -> Result<RollbackResult, BlockchainError> {
        let head = self
            .blocks
            .find_latest()
            .await?
            .ok_or_else(|| BlockchainError::conflict("cannot roll back an empty chain"))?;

        let target = match cmd.target {
            RollbackTarget::LastNBlocks(n) => {
                if n == 0 {
                    return Err(BlockchainError::usage("rollback requires at least 1 block"));
                }
                let keep = head
                    .block_number
                    .value()
                    .checked_sub(n)
                    .ok_or_else(|| BlockchainError::conflict("rollback would remove the genesis block"))?;
                BlockNumber::new(keep)
            }
            RollbackTarget::ToBlock(to_block) => {
                if to_block.value() >= head.block_number.value() {
                    return Err(BlockchainError::usage("--to-block must be earlier than the current head"));
                }
                to_block
            }
        };

        let kept = self.blocks.list_range(BlockNumber::GENESIS, target).await?;
        let referenced: Vec<Hash32> = kept.iter().filter_map(|b| b.data.off_chain_content_id()).collect();

        if cmd.dry_run {
            let removed = head.block_number.value() - target.value();
            let to_remove = self.blocks.list_range(target.next(), head.block_number).await?;
            let kept_refs: std::collections::HashSet<Hash32> = referenced.iter().copied().collect();
            let would_orphan = to_remove
                .iter()
                .filter_map(|b| b.data.off_chain_content_id())
                .filter(|id| !kept_refs.contains(id))
                .collect::<std::collections::HashSet<_>>()
                .len() as u64;
            return Ok(RollbackResult {
                new_head: target,
                blocks_removed: removed,
                off_chain_records_removed: would_orphan,
                dry_run: true,
            });
        }

        let guard = self.write_lock.write().await;
        let blocks_removed = self.blocks.delete_after(target).await?;
        let off_chain_records_removed = self.offchain.collect_garbage(&referenced).await?;
        drop(guard);

        self.events
            .emit(BlockchainEvent::new(BlockchainEventPayload::RollbackPerformed { new_head: target, blocks_removed }))
            .await?;

        Ok(RollbackResult { new_head: target, blocks_removed, off_chain_records_removed, dry_run: false })
    }

    /// Writes a read-only export document. Off-chain blobs
    /// are embedded as raw ciphertext read directly from disk, never
    /// decrypted.
    pub async fn export(&self, cmd: ExportCommand) -> Result<ExportResult, BlockchainError> {
        let head = self.blocks.find_latest().await?;
        let blocks = match &head {
            Some(h) => self.blocks.list_range(BlockNumber::GENESIS, h.block_number).await?,
            None => Vec::new(),
        };
        let keys = self.keys.list_all().await?;

        let mut off_chain = Vec::new();
        for block in &blocks {
            if let Some(content_id) = block.data.off_chain_content_id() {
                let record = self.offchain_records.find_by_content_id(content_id).await?.ok_or_else(|| {
                    BlockchainError::integrity(format!(
                        "block {} references missing off-chain record {content_id}",
                        block.block_number
                    ))
                })?;
                let ciphertext = std::fs::read(&record.cipher_path)?;
                off_chain.push(ExportedOffChainBlob {
                    content_id,
                    ciphertext: base64::engine::general_purpose::STANDARD.encode(ciphertext),
                    nonce: base64::engine::general_purpose::STANDARD.encode(record.nonce),
                    cleartext_size: record.cleartext_size,
                    encryption_key_ref: record.encryption_key_ref,
                });
            }
        }

        let document = ExportDocument {
            metadata: ExportMetadata {
                exported_at: Timestamp::from(chrono::Utc::now()),
                schema_version: EXPORT_SCHEMA_VERSION,
                block_count: blocks.len() as u64,
                key_count: keys.len() as u64,
            },
            authorised_keys: keys,
            blocks,
            off_chain,
        };

        let json = serde_json::to_vec_pretty(&document)?;
        write_0600(&cmd.path, &json)?;

        self.events
            .emit(BlockchainEvent::new(BlockchainEventPayload::ExportCompleted { block_count: document.metadata.block_count }))
            .await?;

        Ok(ExportResult {
            path: cmd.path,
            block_count: document.metadata.block_count,
            key_count: document.metadata.key_count,
        })
    }

    /// Imports a previously exported document. Structural
    /// linkage and signatures are validated entirely offline before any
    /// repository is touched; a `validateAfter` failure rolls the mutation
    /// back unless `force` was given.
    pub async fn import(&self, cmd: ImportCommand) -> Result<ImportResult, BlockchainError> {
        let bytes = std::fs::read(&cmd.path)?;
        let document: ExportDocument = serde_json::from_slice(&bytes)?;

        validate_import_chain(&document.blocks, &document.authorised_keys, self.crypto.as_ref())?;

        let current_head = self.blocks.find_latest().await?;
        let existing_blocks = match &current_head {
            Some(h) => self.blocks.list_range(BlockNumber::GENESIS, h.block_number).await?,
            None => Vec::new(),
        };

        if cmd.mode == ImportMode::Merge {
            if existing_blocks.len() > document.blocks.len() {
                return Err(BlockchainError::conflict("current chain is longer than the imported chain"));
            }
            for (existing, imported) in existing_blocks.iter().zip(document.blocks.iter()) {
                if existing.hash != imported.hash {
                    return Err(BlockchainError::conflict("current chain is not a prefix of the imported chain"));
                }
            }
        }

        if cmd.dry_run {
            return Ok(ImportResult { block_count: document.blocks.len() as u64, dry_run: true });
        }

        let guard = self.write_lock.write().await;

        let original_keys = self.keys.list_all().await?;
        let mut original_offchain = Vec::new();
        for block in &existing_blocks {
            if let Some(content_id) = block.data.off_chain_content_id() {
                if let Some(record) = self.offchain_records.find_by_content_id(content_id).await? {
                    original_offchain.push(record);
                }
            }
        }

        let new_blocks: Vec<&Block> = match cmd.mode {
            ImportMode::Replace => {
                self.blocks.delete_all().await?;
                self.keys.delete_all().await?;
                self.offchain_records.delete_all().await?;
                document.blocks.iter().collect()
            }
            ImportMode::Merge => document.blocks[existing_blocks.len()..].iter().collect(),
        };

        for key in &document.authorised_keys {
            if self.keys.find_by_fingerprint(key.fingerprint).await?.is_none() {
                self.keys.save(key).await?;
            }
        }

        for blob in &document.off_chain {
            if self.offchain_records.find_by_content_id(blob.content_id).await?.is_some() {
                continue;
            }
            let ciphertext = base64::engine::general_purpose::STANDARD
                .decode(blob.ciphertext.trim())
                .map_err(|e| BlockchainError::integrity(format!("invalid base64 off-chain ciphertext: {e}")))?;
            let nonce: [u8; 12] = base64::engine::general_purpose::STANDARD
                .decode(blob.nonce.trim())
                .map_err(|e| BlockchainError::integrity(format!("invalid base64 off-chain nonce: {e}")))?
                .try_into()
                .map_err(|_| BlockchainError::integrity("off-chain nonce must be exactly 12 bytes"))?;

            let path = self.offchain_dir.join(format!("offchain_{}_{}.dat", now_nanos(), &blob.content_id.to_hex()[..16]));
            std::fs::create_dir_all(&self.offchain_dir)?;
            write_0600(&path, &ciphertext)?;

            self.offchain_records
                .save(&OffChainRecord {
                    content_id: blob.content_id,
                    cipher_path: path.to_string_lossy().into_owned(),
                    nonce,
                    cleartext_size: blob.cleartext_size,
                    cipher_size: ciphertext.len() as u64,
                    encryption_key_ref: blob.encryption_key_ref.clone(),
                    created_at: Timestamp::from(chrono::Utc::now()),
                })
                .await?;
        }

        for block in new_blocks {
            self.blocks.save(block).await?;
        }

        drop(guard);

        if cmd.validate_after {
            let report = self.validation.validate(ValidationMode::Detailed).await?;
            if !report.structurally_intact && !cmd.force {
                self.rollback_failed_import(cmd.mode, &existing_blocks, &original_keys, &original_offchain).await?;
                return Err(BlockchainError::integrity("imported chain failed post-import validation, import rolled back"));
            }
        }

        self.events
            .emit(BlockchainEvent::new(BlockchainEventPayload::ImportCompleted { block_count: document.blocks.len() as u64 }))
            .await?;

        Ok(ImportResult { block_count: document.blocks.len() as u64, dry_run: false })
    }

    /// Undoes a failed import's mutation. Replace mode restores the exact
    /// snapshot taken before truncation; merge mode only ever appended
    /// blocks past the original head, so trimming back to it suffices
    /// (newly authorised keys from the failed import are left in place,
    /// matching the append-only key model).
    async fn rollback_failed_import(
        &self,
        mode: ImportMode,
        original_blocks: &[Block],
        original_keys: &[AuthorisedKey],
        original_offchain: &[OffChainRecord],
    ) -> Result<(), BlockchainError> {
        let guard = self.write_lock.write().await;
        match mode {
            ImportMode::Replace => {
                self.blocks.delete_all().await?;
                self.keys.delete_all().await?;
                self.offchain_records.delete_all().await?;
                for key in original_keys {
                    self.keys.save(key).await?;
                }
                for record in original_offchain {
                    self.offchain_records.save(record).await?;
                }
                for block in original_blocks {
                    self.blocks.save(block).await?;
                }
            }
            ImportMode::Merge => match original_blocks.last() {
                Some(last) => {
                    self.blocks.delete_after(last.block_number).await?;
                }
                None => {
                    self.blocks.delete_all().await?;
                }
            },
        }
        Ok(())
    }

    /// Runs a chain validation pass and emits its outcome.
    pub async fn validate(&self, mode: ValidationMode) -> Result<ValidationReport, BlockchainError> {
        let report = self.validation.validate(mode).await?;
        self.events
            .emit(BlockchainEvent::new(BlockchainEventPayload::ValidationCompleted {
                blocks_checked: report.total_blocks,
                passed: report.fully_compliant,
            }))
            .await?;
        Ok(report)
    }

    /// Runs a keyword search at the requested tier.
    pub async fn search(&self, query: SearchQuery) -> Result<SearchOutcome, BlockchainError> {
        let filters = SearchFilters {
            category: query.category,
            block_number: query.block_number,
            time_range: query.time_range,
            limit: query.limit,
        };
        self.search.search(query.query.as_ref(), query.level, &filters).await
    }

    /// A snapshot of the chain's current head and key population, for the
    /// `status` command.
    pub async fn status(&self) -> Result<StatusReport, BlockchainError> {
        let head = self.blocks.find_latest().await?;
        let total_blocks = self.blocks.count().await?;
        let keys = self.keys.list_all().await?;
        let now = Timestamp::from(chrono::Utc::now());
        let active_keys = keys.iter().filter(|k| k.is_active_at(now)).count() as u64;
        let revoked_keys = keys.iter().filter(|k| k.is_revoked()).count() as u64;

        Ok(StatusReport {
            head_block_number: head.as_ref().map(|b| b.block_number),
            head_hash: head.as_ref().map(|b| b.hash),
            total_blocks,
            total_keys: keys.len() as u64,
            active_keys,
            revoked_keys,
        })
    }
}

fn now_nanos() -> u128 {
    SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_nanos()).unwrap_or(0)
}

// Re-exported here so `ImportResult` can be named without reaching into
// `commands` from call sites that only import `block_engine::*`.
pub use super::commands::ImportResult;
