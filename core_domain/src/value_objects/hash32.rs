// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! 32-byte hash value object shared by block hashes, content IDs, data
//! digests, and signer fingerprints. Hex is the canonical text form so
//! database round-trips and export documents are deterministic regardless
//! of the underlying SQL engine.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::BlockchainError;

pub const HASH32_LEN: usize = 32;

/// A 32-byte SHA3-256 digest. Used for block hashes, `previousHash`,
/// `dataDigest`, `signerFingerprint`, and off-chain `contentId`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Hash32([u8; HASH32_LEN]);

impl Hash32 {
    /// The all-zero hash used as `previousHash` for the genesis block.
    pub const ZERO: Hash32 = Hash32([0u8; HASH32_LEN]);

    pub fn from_bytes(bytes: [u8; HASH32_LEN]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; HASH32_LEN] {
        &self.0
    }

    pub fn into_bytes(self) -> [u8; HASH32_LEN] {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; HASH32_LEN]
    }

    /// Lowercase hex, the stored/exported text form.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    pub fn from_hex(s: &str) -> Result<Self, BlockchainError> {
        let bytes = hex::decode(s.trim()).map_err(|e| BlockchainError::integrity(format!("invalid hex hash: {e}")))?;
        let arr: [u8; HASH32_LEN] = bytes
            .try_into()
            .map_err(|_| BlockchainError::integrity("hash must be exactly 32 bytes"))?;
        Ok(Self(arr))
    }
}

impl fmt::Display for Hash32 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl FromStr for Hash32 {
    type Err = BlockchainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl TryFrom<String> for Hash32 {
    type Error = BlockchainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::from_hex(&value)
    }
}

impl From<Hash32> for String {
    fn from(value: Hash32) -> Self {
        value.to_hex()
    }
}

impl From<[u8; HASH32_LEN]> for Hash32 {
    fn from(bytes: [u8; HASH32_LEN]) -> Self {
        Self(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_hash_round_trips_through_hex() {
        let z = Hash32::ZERO;
        assert!(z.is_zero());
        assert_eq!(z.to_hex().len(), 64);
        assert_eq!(Hash32::from_hex(&z.to_hex()).unwrap(), z);
    }

    #[test]
    fn rejects_wrong_length() {
        assert!(Hash32::from_hex("ab12").is_err());
    }

    #[test]
    fn display_matches_to_hex() {
        let h = Hash32::from_bytes([7u8; 32]);
        assert_eq!(h.to_string(), h.to_hex());
    }
}
