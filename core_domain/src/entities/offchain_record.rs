// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Metadata for an encrypted off-chain blob file. Only this
//! metadata is persisted in the database; the ciphertext lives on disk.

use serde::{Deserialize, Serialize};

use crate::value_objects::Hash32;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OffChainRecord {
    /// SHA3-256 of the cleartext payload; the content address.
    pub content_id: Hash32,
    /// Filesystem path of the encrypted blob.
    pub cipher_path: String,
    /// AES-GCM nonce, 12 bytes.
    pub nonce: [u8; 12],
    pub cleartext_size: u64,
    pub cipher_size: u64,
    /// Identifier of the symmetric key used: either a per-content derived
    /// key reference or a vault reference.
    pub encryption_key_ref: String,
    pub created_at: crate::value_objects::Timestamp,
}

impl OffChainRecord {
    pub fn file_name(&self) -> Option<&str> {
        self.cipher_path.rsplit('/').next()
    }
}
