// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! The ledger's unit of record. Blocks are immutable once committed;
//! the block engine is the sole writer.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::error::BlockchainError;
use crate::value_objects::{BlockNumber, Category, Hash32, Keyword, SignatureBytes, Timestamp};

/// The prefix that marks `Block::data` as an off-chain reference rather
/// than an inline payload.
pub const OFF_CHAIN_REF_PREFIX: &str = "OFF_CHAIN_REF:";

/// A block's payload: either inline bytes or a reference to an
/// off-chain-stored content ID.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BlockData {
    Inline(Vec<u8>),
    OffChainRef(Hash32),
}

impl BlockData {
    pub fn is_off_chain(&self) -> bool {
        matches!(self, BlockData::OffChainRef(_))
    }

    pub fn off_chain_content_id(&self) -> Option<Hash32> {
        match self {
            BlockData::OffChainRef(id) => Some(*id),
            BlockData::Inline(_) => None,
        }
    }

    /// Renders the tagged-string form used in export documents and any
    /// column that stores `data` as text.
    pub fn to_tagged_string(&self) -> String {
        match self {
            BlockData::Inline(bytes) => {
                use base64::Engine;
                base64::engine::general_purpose::STANDARD.encode(bytes)
            }
            BlockData::OffChainRef(id) => format!("{OFF_CHAIN_REF_PREFIX}{id}"),
        }
    }

    pub fn from_tagged_string(s: &str) -> Result<Self, BlockchainError> {
        if let Some(hex) = s.strip_prefix(OFF_CHAIN_REF_PREFIX) {
            return Ok(BlockData::OffChainRef(Hash32::from_hex(hex)?));
        }
        use base64::Engine;
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(s)
            .map_err(|e| BlockchainError::integrity(format!("invalid inline block data encoding: {e}")))?;
        Ok(BlockData::Inline(bytes))
    }
}

/// The unit of the ledger: metadata, a payload (inline or off-chain
/// reference), a cleartext digest, and a signature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub block_number: BlockNumber,
    pub previous_hash: Hash32,
    pub hash: Hash32,
    pub timestamp: Timestamp,
    pub data: BlockData,
    pub data_digest: Hash32,
    pub signer_fingerprint: Hash32,
    pub signature: SignatureBytes,
    pub manual_keywords: BTreeSet<Keyword>,
    pub auto_keywords: BTreeSet<Keyword>,
    pub category: Option<Category>,
    pub original_size: u64,
}

impl Block {
    /// Genesis-block check (blockNumber == 0).
    pub fn is_genesis(&self) -> bool {
        self.block_number.is_genesis()
    }

    /// The bytes over which the signature and block hash are computed,
    /// fixed big-endian and length-prefixed where a field is variable
    /// length (signing-tuple byte layout, see design records).
    pub fn signing_tuple(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(8 + 32 + 8 + 32);
        buf.extend_from_slice(&self.block_number.to_be_bytes());
        buf.extend_from_slice(self.previous_hash.as_bytes());
        buf.extend_from_slice(&self.timestamp.to_be_bytes());
        buf.extend_from_slice(self.data_digest.as_bytes());
        buf
    }

    /// The bytes hashed to produce `Block::hash`: the signing tuple plus
    /// signer fingerprint and a length-prefixed signature.
    pub fn hash_input(&self) -> Vec<u8> {
        let mut buf = self.signing_tuple();
        buf.extend_from_slice(self.signer_fingerprint.as_bytes());
        let sig = self.signature.as_slice();
        buf.extend_from_slice(&(sig.len() as u16).to_be_bytes());
        buf.extend_from_slice(sig);
        buf
    }

    /// All keywords (manual ∪ automatic), used by the FAST_ONLY search
    /// tier's exact-match index lookup.
    pub fn all_keywords(&self) -> impl Iterator<Item = &Keyword> {
        self.manual_keywords.iter().chain(self.auto_keywords.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tagged_string_round_trips_off_chain_ref() {
        let id = Hash32::from_bytes([9u8; 32]);
        let data = BlockData::OffChainRef(id);
        let s = data.to_tagged_string();
        assert!(s.starts_with(OFF_CHAIN_REF_PREFIX));
        assert_eq!(BlockData::from_tagged_string(&s).unwrap(), data);
    }

    #[test]
    fn tagged_string_round_trips_inline_data() {
        let data = BlockData::Inline(b"hello chain".to_vec());
        let s = data.to_tagged_string();
        assert_eq!(BlockData::from_tagged_string(&s).unwrap(), data);
    }

    #[test]
    fn signing_tuple_is_fixed_width() {
        let block = Block {
            block_number: BlockNumber::new(1),
            previous_hash: Hash32::ZERO,
            hash: Hash32::ZERO,
            timestamp: Timestamp::from_millis(0),
            data: BlockData::Inline(vec![]),
            data_digest: Hash32::ZERO,
            signer_fingerprint: Hash32::ZERO,
            signature: SignatureBytes::new(vec![1, 2, 3]),
            manual_keywords: BTreeSet::new(),
            auto_keywords: BTreeSet::new(),
            category: None,
            original_size: 0,
        };
        assert_eq!(block.signing_tuple().len(), 8 + 32 + 8 + 32);
        assert_eq!(block.hash_input().len(), 8 + 32 + 8 + 32 + 32 + 2 + 3);
    }
}
