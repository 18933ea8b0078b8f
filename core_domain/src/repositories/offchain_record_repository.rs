// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Persistence port for [`OffChainRecord`] metadata. The blob
//! ciphertext itself is managed by the off-chain store service, not by
//! this repository; this port only covers the database-side manifest.

use async_trait::async_trait;

use crate::entities::OffChainRecord;
use crate::error::BlockchainError;
use crate::value_objects::Hash32;

#[async_trait]
pub trait OffChainRecordRepository: Send + Sync {
    async fn save(&self, record: &OffChainRecord) -> Result<(), BlockchainError>;

    async fn find_by_content_id(
        &self,
        content_id: Hash32,
    ) -> Result<Option<OffChainRecord>, BlockchainError>;

    /// Content ids no longer referenced by any surviving block, used by
    /// garbage collection after rollback.
    async fn list_unreferenced(
        &self,
        referenced: &[Hash32],
    ) -> Result<Vec<OffChainRecord>, BlockchainError>;

    async fn delete(&self, content_id: Hash32) -> Result<(), BlockchainError>;

    /// Removes every record. Used by import's replace mode; the
    /// blob files themselves are removed separately by the caller.
    async fn delete_all(&self) -> Result<(), BlockchainError>;
}
