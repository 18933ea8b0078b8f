// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Chain validation: structural integrity (hash linkage, signature),
//! off-chain integrity, and AuthorisedKey compliance, assembled into a
//! [`ValidationReport`].

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use blockchain_core_domain::entities::BlockData;
use blockchain_core_domain::repositories::{AuthorisedKeyRepository, BlockRepository};
use blockchain_core_domain::services::CryptoService;
use blockchain_core_domain::value_objects::{BlockNumber, Hash32};
use blockchain_core_domain::BlockchainError;

use crate::infrastructure::services::offchain_store::OffChainStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValidationMode {
    /// Hash + previousHash linkage only.
    Quick,
    /// Structural + compliance, no off-chain decryption.
    Default,
    /// Structural + compliance + off-chain integrity, full issues list.
    Detailed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationIssue {
    pub block_number: u64,
    pub kind: String,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationReport {
    pub structurally_intact: bool,
    pub fully_compliant: bool,
    pub total_blocks: u64,
    pub revoked_blocks: u64,
    pub invalid_blocks: u64,
    pub issues: Vec<ValidationIssue>,
}

pub struct ValidationEngine {
    blocks: Arc<dyn BlockRepository>,
    keys: Arc<dyn AuthorisedKeyRepository>,
    offchain: Arc<OffChainStore>,
    crypto: Arc<dyn CryptoService>,
}

impl ValidationEngine {
    pub fn new(
        blocks: Arc<dyn BlockRepository>,
        keys: Arc<dyn AuthorisedKeyRepository>,
        offchain: Arc<OffChainStore>,
        crypto: Arc<dyn CryptoService>,
    ) -> Self {
        Self { blocks, keys, offchain, crypto }
    }

    pub async fn validate(&self, mode: ValidationMode) -> Result<ValidationReport, BlockchainError> {
        let latest = self.blocks.find_latest().await?.map(|b| b.block_number).unwrap_or(BlockNumber::GENESIS);
        let chain = self.blocks.list_range(BlockNumber::GENESIS, latest).await?;

        let mut issues = Vec::new();
        let mut invalid_blocks: u64 = 0;
        let mut revoked_blocks: u64 = 0;
        let mut structurally_intact = true;
        let mut previous_hash = Hash32::ZERO;

        for block in &chain {
            let mut block_valid = true;

            let recomputed = self.crypto.hash(&block.hash_input());
            if recomputed != block.hash {
                issues.push(issue(block.block_number, "HASH_MISMATCH", "recomputed hash does not match stored hash"));
                block_valid = false;
            }

            if block.previous_hash != previous_hash {
                issues.push(issue(block.block_number, "CHAIN_BREAK", "previousHash does not match prior block's hash"));
                block_valid = false;
            }
            previous_hash = block.hash;

            if mode != ValidationMode::Quick {
                match self.keys.find_by_fingerprint(block.signer_fingerprint).await? {
                    Some(key) => {
                        let verify_result =
                            self.crypto.verify(&key.public_key, &block.signing_tuple(), &block.signature);
                        if verify_result.is_err() {
                            issues.push(issue(block.block_number, "INVALID_SIGNATURE", "signature does not verify"));
                            block_valid = false;
                        }
                        if !key.is_active_at(block.timestamp) {
                            issues.push(issue(block.block_number, "KEY_NOT_ACTIVE", "signer key was not active at block timestamp"));
                            revoked_blocks += 1;
                        }
                    }
                    None => {
                        issues.push(issue(block.block_number, "UNKNOWN_SIGNER", "signer fingerprint has no AuthorisedKey"));
                        block_valid = false;
                    }
                }
            }

            if mode == ValidationMode::Detailed {
                if let BlockData::OffChainRef(content_id) = &block.data {
                    match self.offchain.read(*content_id).await {
                        Ok(plaintext) => {
                            let digest = self.crypto.hash(&plaintext);
                            if digest != block.data_digest {
                                issues.push(issue(block.block_number, "OFFCHAIN_DIGEST_MISMATCH", "off-chain cleartext does not hash to dataDigest"));
                                block_valid = false;
                            }
                        }
                        Err(e) => {
                            issues.push(issue(block.block_number, "OFFCHAIN_UNREADABLE", &e.to_string()));
                            block_valid = false;
                        }
                    }
                }
            }

            if !block_valid {
                invalid_blocks += 1;
                structurally_intact = false;
            }
        }

        let fully_compliant = structurally_intact && revoked_blocks == 0;

        Ok(ValidationReport {
            structurally_intact,
            fully_compliant,
            total_blocks: chain.len() as u64,
            revoked_blocks,
            invalid_blocks,
            issues,
        })
    }
}

fn issue(block_number: BlockNumber, kind: &str, message: &str) -> ValidationIssue {
    ValidationIssue { block_number: block_number.value(), kind: kind.to_string(), message: message.to_string() }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fully_compliant_requires_zero_revoked_and_structural_intact() {
        let report = ValidationReport {
            structurally_intact: true,
            fully_compliant: true,
            total_blocks: 3,
            revoked_blocks: 0,
            invalid_blocks: 0,
            issues: Vec::new(),
        };
        assert!(report.fully_compliant);
    }
}
