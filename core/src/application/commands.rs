// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Application Commands
//!
//! CQRS command and result types for the block engine's mutating
//! operations. Each command is immutable and self-contained; a single
//! `BlockEngine` handles all of them.

use std::collections::BTreeSet;
use std::path::PathBuf;

use blockchain_core_domain::value_objects::{BlockNumber, Category, Hash32, KeyType, Keyword, SearchLevel, Timestamp};

/// Where the private key used to sign a new block comes from.
#[derive(Debug, Clone)]
pub enum SignerSpec {
    /// `--signer <owner>`: loaded from the vault, with a password
    /// prompted at the external boundary. If the vault has no entry
    /// for `owner`, a temporary key is generated and used instead
    /// (demo mode).
    Vault { owner: String, password: String },
    /// `--key-file <path>`: loaded from disk.
    KeyFile(PathBuf),
    /// `--generate-key`: a fresh key pair, used once and never persisted.
    Generate,
}

/// The payload of a new block: either inline bytes or a path to read
/// them from.
#[derive(Debug, Clone)]
pub enum BlockPayload {
    Inline(Vec<u8>),
    File(PathBuf),
}

/// Command to append one block to the chain.
#[derive(Debug, Clone)]
pub struct AppendBlockCommand {
    pub payload: BlockPayload,
    pub signer: SignerSpec,
    pub manual_keywords: String,
    pub category: Option<String>,
}

#[derive(Debug, Clone)]
pub struct AppendBlockResult {
    pub block_number: BlockNumber,
    pub hash: Hash32,
    pub timestamp: Timestamp,
    pub signer_fingerprint: Hash32,
    pub stored_off_chain: bool,
}

/// Command to register a signing identity.
#[derive(Debug, Clone)]
pub struct AddKeyCommand {
    pub owner: String,
    pub generate: bool,
    pub public_key: Option<String>,
    pub key_file: Option<PathBuf>,
    pub store_private: bool,
    pub store_password: Option<String>,
    pub key_type: KeyType,
    pub parent_key: Option<Hash32>,
    pub validity_days: Option<u32>,
}

#[derive(Debug, Clone)]
pub struct AddKeyResult {
    pub fingerprint: Hash32,
    pub owner: String,
    pub private_key_der: Option<Vec<u8>>,
}

/// Target of a rollback, in the two mutually-exclusive forms the CLI
/// accepts.
#[derive(Debug, Clone, Copy)]
pub enum RollbackTarget {
    LastNBlocks(u64),
    ToBlock(BlockNumber),
}

#[derive(Debug, Clone)]
pub struct RollbackCommand {
    pub target: RollbackTarget,
    pub dry_run: bool,
}

#[derive(Debug, Clone)]
pub struct RollbackResult {
    pub new_head: BlockNumber,
    pub blocks_removed: u64,
    pub off_chain_records_removed: u64,
    pub dry_run: bool,
}

#[derive(Debug, Clone)]
pub struct ExportCommand {
    pub path: PathBuf,
}

#[derive(Debug, Clone)]
pub struct ExportResult {
    pub path: PathBuf,
    pub block_count: u64,
    pub key_count: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportMode {
    Replace,
    Merge,
}

#[derive(Debug, Clone)]
pub struct ImportCommand {
    pub path: PathBuf,
    pub mode: ImportMode,
    pub force: bool,
    pub validate_after: bool,
    pub dry_run: bool,
}

#[derive(Debug, Clone)]
pub struct ImportResult {
    pub block_count: u64,
    pub dry_run: bool,
}

/// One imperative action of `manage-keys` (revocation, deletion, vault
/// probing, rotation). The presentation layer picks the variant
/// matching which `ValidatedCommand::ManageKeys` field was set.
#[derive(Debug, Clone)]
pub enum ManageKeysAction {
    Check { owner: String },
    Test { owner: String, password: String },
    Delete { owner: String },
    Rotate { owner: String, password: String, validity_days: Option<u32> },
}

#[derive(Debug, Clone)]
pub struct SearchQuery {
    pub query: Option<Keyword>,
    pub level: SearchLevel,
    pub category: Option<Category>,
    pub block_number: Option<BlockNumber>,
    pub time_range: Option<(Timestamp, Timestamp)>,
    pub limit: Option<usize>,
}

/// Extracted, normalised keywords for a pending block.
#[derive(Debug, Clone, Default)]
pub struct ExtractedKeywords {
    pub manual: BTreeSet<Keyword>,
    pub auto: BTreeSet<Keyword>,
}
