// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Chain Link Aggregate
//!
//! Enforces the structural invariants that make a sequence of [`Block`]s a
//! chain: block-number contiguity starting at
//! genesis zero, previous-hash linkage, non-decreasing timestamps, and a
//! correctly composed block hash. The aggregate does not touch the
//! repository or the signer; it is the pure "can this block legally
//! follow that block" decision, called by the application-layer block
//! engine after it has obtained a signature.

use std::collections::BTreeSet;

use crate::entities::{Block, BlockData};
use crate::error::BlockchainError;
use crate::services::crypto_service::CryptoService;
use crate::value_objects::{BlockNumber, Category, Hash32, Keyword, PublicKeyBytes, SignatureBytes, Timestamp};

/// Everything needed to extend the chain by one block, gathered by the
/// application layer before the signature exists.
pub struct PendingBlock {
    pub data: BlockData,
    pub manual_keywords: BTreeSet<Keyword>,
    pub auto_keywords: BTreeSet<Keyword>,
    pub category: Option<Category>,
    pub original_size: u64,
}

/// The chain as seen from its current head, used to validate and build
/// the next block.
pub struct ChainLink<'a> {
    head: Option<&'a Block>,
}

impl<'a> ChainLink<'a> {
    /// `head` is `None` only when the chain is empty and the block being
    /// built will be the genesis block.
    pub fn at_head(head: Option<&'a Block>) -> Self {
        Self { head }
    }

    pub fn next_block_number(&self) -> BlockNumber {
        self.head.map(|b| b.block_number.next()).unwrap_or(BlockNumber::GENESIS)
    }

    fn previous_hash(&self) -> Hash32 {
        self.head.map(|b| b.hash).unwrap_or(Hash32::ZERO)
    }

    /// Builds and signs the next block, checking timestamp monotonicity
    /// against the current head before handing the
    /// signing tuple to `crypto`.
    #[allow(clippy::too_many_arguments)]
    pub fn append(
        &self,
        pending: PendingBlock,
        timestamp: Timestamp,
        signer_fingerprint: Hash32,
        signer_public_key: &PublicKeyBytes,
        private_key_der: &[u8],
        crypto: &dyn CryptoService,
    ) -> Result<Block, BlockchainError> {
        if let Some(head) = self.head {
            if timestamp < head.timestamp {
                return Err(BlockchainError::conflict(format!(
                    "block timestamp {timestamp} precedes chain head timestamp {}",
                    head.timestamp
                )));
            }
        }

        let block_number = self.next_block_number();
        let previous_hash = self.previous_hash();
        let data_bytes = match &pending.data {
            BlockData::Inline(bytes) => bytes.as_slice(),
            BlockData::OffChainRef(_) => &[][..],
        };
        let data_digest = match &pending.data {
            BlockData::OffChainRef(content_id) => *content_id,
            BlockData::Inline(_) => crypto.hash(data_bytes),
        };

        let mut block = Block {
            block_number,
            previous_hash,
            hash: Hash32::ZERO,
            timestamp,
            data: pending.data,
            data_digest,
            signer_fingerprint,
            signature: SignatureBytes::new(Vec::new()),
            manual_keywords: pending.manual_keywords,
            auto_keywords: pending.auto_keywords,
            category: pending.category,
            original_size: pending.original_size,
        };

        let signing_tuple = block.signing_tuple();
        let signature = crypto.sign(private_key_der, &signing_tuple)?;
        crypto.verify(signer_public_key, &signing_tuple, &signature)?;
        block.signature = signature;
        block.hash = crypto.hash(&block.hash_input());
        Ok(block)
    }

    /// Validates that `candidate` correctly extends `self`. Does not re-verify the
    /// signature; callers that need a signature check must call
    /// `CryptoService::verify` themselves with the signer's public key.
    pub fn validate_extends(&self, candidate: &Block, crypto: &dyn CryptoService) -> Result<(), BlockchainError> {
        if candidate.block_number != self.next_block_number() {
            return Err(BlockchainError::integrity(format!(
                "block number {} is not the expected successor {}",
                candidate.block_number,
                self.next_block_number()
            )));
        }
        if candidate.previous_hash != self.previous_hash() {
            return Err(BlockchainError::integrity(
                "previous_hash does not match the chain head's hash",
            ));
        }
        if let Some(head) = self.head {
            if candidate.timestamp < head.timestamp {
                return Err(BlockchainError::integrity("block timestamp precedes predecessor"));
            }
        }
        let expected_hash = crypto.hash(&candidate.hash_input());
        if expected_hash != candidate.hash {
            return Err(BlockchainError::integrity("stored hash does not match recomputed hash"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::crypto_service::Sha3P256CryptoService;
    use p256::ecdsa::{SigningKey, VerifyingKey};
    use p256::pkcs8::EncodePrivateKey;

    fn keypair() -> (Vec<u8>, PublicKeyBytes, Hash32) {
        let signing_key = SigningKey::random(&mut rand::rng());
        let private_der = signing_key.to_pkcs8_der().unwrap().as_bytes().to_vec();
        let verifying_key = VerifyingKey::from(&signing_key);
        let public = PublicKeyBytes::new(verifying_key.to_sec1_bytes().to_vec());
        let crypto = Sha3P256CryptoService::new();
        let fingerprint = crypto.fingerprint(&public);
        (private_der, public, fingerprint)
    }

    #[test]
    fn genesis_block_has_zero_number_and_zero_previous_hash() {
        let crypto = Sha3P256CryptoService::new();
        let (private_der, public, fingerprint) = keypair();
        let link = ChainLink::at_head(None);
        let pending = PendingBlock {
            data: BlockData::Inline(b"genesis".to_vec()),
            manual_keywords: BTreeSet::new(),
            auto_keywords: BTreeSet::new(),
            category: None,
            original_size: 7,
        };
        let block = link
            .append(pending, Timestamp::from_millis(1000), fingerprint, &public, &private_der, &crypto)
            .unwrap();
        assert!(block.is_genesis());
        assert_eq!(block.previous_hash, Hash32::ZERO);
    }

    #[test]
    fn append_rejects_timestamp_earlier_than_head() {
        let crypto = Sha3P256CryptoService::new();
        let (private_der, public, fingerprint) = keypair();
        let genesis = ChainLink::at_head(None)
            .append(
                PendingBlock {
                    data: BlockData::Inline(b"g".to_vec()),
                    manual_keywords: BTreeSet::new(),
                    auto_keywords: BTreeSet::new(),
                    category: None,
                    original_size: 1,
                },
                Timestamp::from_millis(1000),
                fingerprint,
                &public,
                &private_der,
                &crypto,
            )
            .unwrap();

        let link = ChainLink::at_head(Some(&genesis));
        let result = link.append(
            PendingBlock {
                data: BlockData::Inline(b"next".to_vec()),
                manual_keywords: BTreeSet::new(),
                auto_keywords: BTreeSet::new(),
                category: None,
                original_size: 4,
            },
            Timestamp::from_millis(999),
            fingerprint,
            &public,
            &private_der,
            &crypto,
        );
        assert!(result.is_err());
    }

    #[test]
    fn validate_extends_accepts_correctly_built_chain() {
        let crypto = Sha3P256CryptoService::new();
        let (private_der, public, fingerprint) = keypair();
        let genesis = ChainLink::at_head(None)
            .append(
                PendingBlock {
                    data: BlockData::Inline(b"g".to_vec()),
                    manual_keywords: BTreeSet::new(),
                    auto_keywords: BTreeSet::new(),
                    category: None,
                    original_size: 1,
                },
                Timestamp::from_millis(1000),
                fingerprint,
                &public,
                &private_der,
                &crypto,
            )
            .unwrap();
        let link = ChainLink::at_head(None);
        link.validate_extends(&genesis, &crypto).unwrap();
    }

    #[test]
    fn validate_extends_rejects_tampered_hash() {
        let crypto = Sha3P256CryptoService::new();
        let (private_der, public, fingerprint) = keypair();
        let mut genesis = ChainLink::at_head(None)
            .append(
                PendingBlock {
                    data: BlockData::Inline(b"g".to_vec()),
                    manual_keywords: BTreeSet::new(),
                    auto_keywords: BTreeSet::new(),
                    category: None,
                    original_size: 1,
                },
                Timestamp::from_millis(1000),
                fingerprint,
                &public,
                &private_der,
                &crypto,
            )
            .unwrap();
        genesis.hash = Hash32::from_bytes([9u8; 32]);
        let link = ChainLink::at_head(None);
        assert!(link.validate_extends(&genesis, &crypto).is_err());
    }
}
