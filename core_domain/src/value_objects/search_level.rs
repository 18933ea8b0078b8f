// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! The three search performance tiers. Each level's result set is a
//! superset of the previous one.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::BlockchainError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum SearchLevel {
    /// Keyword-index equality match only.
    FastOnly,
    /// `FastOnly` plus a substring scan of inline `data`.
    IncludeData,
    /// `IncludeData` plus on-demand off-chain decryption.
    ExhaustiveOffchain,
}

impl SearchLevel {
    pub fn contains(&self, other: SearchLevel) -> bool {
        self.rank() >= other.rank()
    }

    fn rank(&self) -> u8 {
        match self {
            SearchLevel::FastOnly => 0,
            SearchLevel::IncludeData => 1,
            SearchLevel::ExhaustiveOffchain => 2,
        }
    }
}

impl fmt::Display for SearchLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SearchLevel::FastOnly => "FAST_ONLY",
            SearchLevel::IncludeData => "INCLUDE_DATA",
            SearchLevel::ExhaustiveOffchain => "EXHAUSTIVE_OFFCHAIN",
        };
        write!(f, "{s}")
    }
}

impl FromStr for SearchLevel {
    type Err = BlockchainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "FAST_ONLY" => Ok(SearchLevel::FastOnly),
            "INCLUDE_DATA" => Ok(SearchLevel::IncludeData),
            "EXHAUSTIVE_OFFCHAIN" => Ok(SearchLevel::ExhaustiveOffchain),
            other => Err(BlockchainError::usage(format!("unknown search level: {other}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn levels_are_nested() {
        assert!(SearchLevel::ExhaustiveOffchain.contains(SearchLevel::IncludeData));
        assert!(SearchLevel::IncludeData.contains(SearchLevel::FastOnly));
        assert!(!SearchLevel::FastOnly.contains(SearchLevel::IncludeData));
    }

    #[test]
    fn parses_case_insensitively() {
        assert_eq!("fast_only".parse::<SearchLevel>().unwrap(), SearchLevel::FastOnly);
    }
}
