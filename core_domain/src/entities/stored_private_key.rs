// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! A password-encrypted private key held by the secure key vault. `encryptedPrivateKey` is AES-256-GCM over the PKCS#8 DER
//! private key, keyed by PBKDF2(password, salt, iterations), AAD = owner.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredPrivateKey {
    pub owner: String,
    pub encrypted_private_key: Vec<u8>,
    pub kdf_salt: Vec<u8>,
    pub kdf_iterations: u32,
    /// Identifies the AEAD/KDF combination in case it needs to evolve;
    /// fixed to `"aes256gcm-pbkdf2-hmac-sha3-256"` by this implementation.
    pub algorithm_tag: String,
    pub nonce: [u8; 12],
}
