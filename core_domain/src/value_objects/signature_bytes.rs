// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! DER-encoded ECDSA-SHA3-256 signature bytes, and the raw octet form of an
//! ECDSA public key.

use serde::{Deserialize, Serialize};

use crate::error::BlockchainError;

/// A DER-encoded ECDSA signature over secp256r1. Variable length, so when
/// it participates in a hashed byte layout (the block hash input) it is
/// length-prefixed with a big-endian `u16` (see `services::crypto`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignatureBytes(Vec<u8>);

impl SignatureBytes {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.0
    }

    pub fn into_vec(self) -> Vec<u8> {
        self.0
    }

    pub fn to_base64(&self) -> String {
        use base64::Engine;
        base64::engine::general_purpose::STANDARD.encode(&self.0)
    }

    pub fn from_base64(s: &str) -> Result<Self, BlockchainError> {
        use base64::Engine;
        base64::engine::general_purpose::STANDARD
            .decode(s.trim())
            .map(Self)
            .map_err(|e| BlockchainError::integrity(format!("invalid base64 signature: {e}")))
    }
}
