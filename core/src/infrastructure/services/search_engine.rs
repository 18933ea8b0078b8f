// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Three-tier keyword search over blocks. Each tier's result set is
//! a superset of the tier below it (`SearchLevel::contains`); filters
//! (category, block number, time range) apply uniformly across tiers.

use std::sync::Arc;

use tracing::warn;

use blockchain_core_domain::entities::{Block, BlockData};
use blockchain_core_domain::repositories::BlockRepository;
use blockchain_core_domain::value_objects::{BlockNumber, Category, Keyword, SearchLevel, Timestamp};
use blockchain_core_domain::BlockchainError;

use crate::infrastructure::services::offchain_store::OffChainStore;

#[derive(Default)]
pub struct SearchFilters {
    pub category: Option<Category>,
    pub block_number: Option<BlockNumber>,
    pub time_range: Option<(Timestamp, Timestamp)>,
    pub limit: Option<usize>,
}

/// Search results plus the set of blocks an `EXHAUSTIVE_OFFCHAIN` search
/// could not decide on (off-chain decryption failure): these are excluded
/// from `matches` rather than aborting the search.
pub struct SearchOutcome {
    pub matches: Vec<Block>,
    pub undecidable: Vec<BlockNumber>,
}

pub struct SearchEngine {
    blocks: Arc<dyn BlockRepository>,
    offchain: Arc<OffChainStore>,
}

impl SearchEngine {
    pub fn new(blocks: Arc<dyn BlockRepository>, offchain: Arc<OffChainStore>) -> Self {
        Self { blocks, offchain }
    }

    /// `query` is `None` for a filter-only search (`--category`,
    /// `--block-number`, or `--date-from`): the candidate pool is
    /// returned as-is, filtered, with no keyword or content matching.
    pub async fn search(
        &self,
        query: Option<&Keyword>,
        level: SearchLevel,
        filters: &SearchFilters,
    ) -> Result<SearchOutcome, BlockchainError> {
        let Some(query) = query else {
            let mut matches = apply_filters(self.candidate_pool(filters).await?, filters);
            matches.sort_by_key(|b| b.block_number);
            if let Some(limit) = filters.limit {
                matches.truncate(limit);
            }
            return Ok(SearchOutcome { matches, undecidable: Vec::new() });
        };

        let mut matches = self.blocks.list_by_keyword(query).await?;
        let mut undecidable = Vec::new();

        if level.contains(SearchLevel::IncludeData) {
            let needle = query.as_str();
            let already: std::collections::BTreeSet<BlockNumber> = matches.iter().map(|b| b.block_number).collect();
            for block in self.candidate_pool(filters).await? {
                if already.contains(&block.block_number) {
                    continue;
                }
                if let BlockData::Inline(bytes) = &block.data {
                    if String::from_utf8_lossy(bytes).to_lowercase().contains(&needle.to_lowercase()) {
                        matches.push(block);
                    }
                }
            }
        }

        if level.contains(SearchLevel::ExhaustiveOffchain) {
            let needle = query.as_str();
            let already: std::collections::BTreeSet<BlockNumber> = matches.iter().map(|b| b.block_number).collect();
            for block in self.candidate_pool(filters).await? {
                if already.contains(&block.block_number) {
                    continue;
                }
                let BlockData::OffChainRef(content_id) = &block.data else { continue };
                match self.offchain.read(*content_id).await {
                    Ok(plaintext) => {
                        if String::from_utf8_lossy(&plaintext).to_lowercase().contains(&needle.to_lowercase()) {
                            matches.push(block);
                        }
                    }
                    Err(e) => {
                        warn!(block_number = block.block_number.value(), error = %e, "off-chain content undecidable during search");
                        undecidable.push(block.block_number);
                    }
                }
            }
        }

        matches.sort_by_key(|b| b.block_number);
        matches = apply_filters(matches, filters);
        if let Some(limit) = filters.limit {
            matches.truncate(limit);
        }

        Ok(SearchOutcome { matches, undecidable })
    }

    async fn candidate_pool(&self, filters: &SearchFilters) -> Result<Vec<Block>, BlockchainError> {
        if let Some((from, to)) = filters.time_range {
            return self.blocks.list_by_time_range(from, to).await;
        }
        if let Some(number) = filters.block_number {
            return Ok(self.blocks.find_by_number(number).await?.into_iter().collect());
        }
        if let Some(category) = &filters.category {
            return self.blocks.list_by_category(category).await;
        }
        let latest = self.blocks.find_latest().await?.map(|b| b.block_number).unwrap_or(BlockNumber::GENESIS);
        self.blocks.list_range(BlockNumber::GENESIS, latest).await
    }
}

fn apply_filters(blocks: Vec<Block>, filters: &SearchFilters) -> Vec<Block> {
    blocks
        .into_iter()
        .filter(|b| filters.category.as_ref().map(|c| b.category.as_ref() == Some(c)).unwrap_or(true))
        .filter(|b| filters.block_number.map(|n| b.block_number == n).unwrap_or(true))
        .filter(|b| filters.time_range.map(|(from, to)| b.timestamp >= from && b.timestamp <= to).unwrap_or(true))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn search_level_containment_drives_tier_fallthrough() {
        assert!(SearchLevel::ExhaustiveOffchain.contains(SearchLevel::FastOnly));
        assert!(!SearchLevel::FastOnly.contains(SearchLevel::IncludeData));
    }
}
