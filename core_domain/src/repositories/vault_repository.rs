// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Persistence port for the secure key vault. Distinct from
//! [`crate::repositories::AuthorisedKeyRepository`]: the vault stores
//! password-encrypted private key material, keyed by owner name, not
//! public key metadata keyed by fingerprint.

use async_trait::async_trait;

use crate::entities::StoredPrivateKey;
use crate::error::BlockchainError;

#[async_trait]
pub trait VaultRepository: Send + Sync {
    async fn store(&self, key: &StoredPrivateKey) -> Result<(), BlockchainError>;

    async fn load(&self, owner: &str) -> Result<Option<StoredPrivateKey>, BlockchainError>;

    async fn exists(&self, owner: &str) -> Result<bool, BlockchainError>;

    async fn delete(&self, owner: &str) -> Result<(), BlockchainError>;

    async fn list_owners(&self) -> Result<Vec<String>, BlockchainError>;
}
