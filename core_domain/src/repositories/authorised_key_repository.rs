// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Persistence port for [`AuthorisedKey`]. A fingerprint is a stable identifier: once saved, a
//! row is never deleted, only revoked.

use async_trait::async_trait;

use crate::entities::AuthorisedKey;
use crate::error::BlockchainError;
use crate::value_objects::Hash32;

#[async_trait]
pub trait AuthorisedKeyRepository: Send + Sync {
    async fn save(&self, key: &AuthorisedKey) -> Result<(), BlockchainError>;

    async fn find_by_fingerprint(
        &self,
        fingerprint: Hash32,
    ) -> Result<Option<AuthorisedKey>, BlockchainError>;

    async fn list_all(&self) -> Result<Vec<AuthorisedKey>, BlockchainError>;

    /// Marks the key revoked as of `revoked_at`; idempotent if already
    /// revoked at an earlier or equal instant.
    async fn revoke(
        &self,
        fingerprint: Hash32,
        revoked_at: crate::value_objects::Timestamp,
    ) -> Result<(), BlockchainError>;

    /// Removes every key. Used by import's replace mode before
    /// the imported chain is inserted.
    async fn delete_all(&self) -> Result<(), BlockchainError>;
}
