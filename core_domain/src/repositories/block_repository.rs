// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Persistence port for [`Block`]. Implementations must preserve
//! block-number ordering and must not allow two blocks to share a
//! `block_number`.

use async_trait::async_trait;

use crate::entities::Block;
use crate::error::BlockchainError;
use crate::value_objects::{BlockNumber, Category, Hash32, Keyword, Timestamp};

#[async_trait]
pub trait BlockRepository: Send + Sync {
    /// Persists a new block. Callers hold the writer lock; the
    /// repository itself does not serialise writers.
    async fn save(&self, block: &Block) -> Result<(), BlockchainError>;

    async fn find_by_number(
        &self,
        number: BlockNumber,
    ) -> Result<Option<Block>, BlockchainError>;

    async fn find_latest(&self) -> Result<Option<Block>, BlockchainError>;

    /// Total number of blocks currently stored, genesis included.
    async fn count(&self) -> Result<u64, BlockchainError>;

    /// Blocks with `block_number` in `[from, to]`, ascending.
    async fn list_range(
        &self,
        from: BlockNumber,
        to: BlockNumber,
    ) -> Result<Vec<Block>, BlockchainError>;

    /// Blocks whose `timestamp` falls in `[from, to]`, ascending by
    /// block number.
    async fn list_by_time_range(
        &self,
        from: Timestamp,
        to: Timestamp,
    ) -> Result<Vec<Block>, BlockchainError>;

    /// Blocks signed by `fingerprint`.
    async fn list_by_signer(
        &self,
        fingerprint: Hash32,
    ) -> Result<Vec<Block>, BlockchainError>;

    /// Blocks whose `category` equals `category`.
    async fn list_by_category(
        &self,
        category: &Category,
    ) -> Result<Vec<Block>, BlockchainError>;

    /// Blocks carrying `keyword` in either `manual_keywords` or
    /// `auto_keywords`.
    async fn list_by_keyword(
        &self,
        keyword: &Keyword,
    ) -> Result<Vec<Block>, BlockchainError>;

    /// Deletes every block with `block_number > keep_through`, used by
    /// rollback. Returns the number of blocks removed.
    async fn delete_after(
        &self,
        keep_through: BlockNumber,
    ) -> Result<u64, BlockchainError>;

    /// Removes every block, including genesis. Used by import's replace
    /// mode before the imported chain is inserted.
    async fn delete_all(&self) -> Result<(), BlockchainError>;
}
