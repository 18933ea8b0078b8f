// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! A single normalised search keyword: lowercase, trimmed, at most 64 chars
//!. Normalisation itself (splitting a raw comma list, automatic
//! extraction) lives in `services::keyword_service`; this type only
//! enforces the per-token invariant.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::BlockchainError;

pub const MAX_KEYWORD_LEN: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Keyword(String);

impl Keyword {
    /// Lowercases and trims `raw`; rejects empty or over-length tokens.
    pub fn new(raw: &str) -> Result<Self, BlockchainError> {
        let normalised = raw.trim().to_lowercase();
        if normalised.is_empty() {
            return Err(BlockchainError::usage("keyword must not be empty"));
        }
        if normalised.chars().count() > MAX_KEYWORD_LEN {
            return Err(BlockchainError::usage(format!(
                "keyword exceeds {MAX_KEYWORD_LEN} characters: {normalised}"
            )));
        }
        Ok(Self(normalised))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Keyword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for Keyword {
    type Error = BlockchainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(&value)
    }
}

impl From<Keyword> for String {
    fn from(value: Keyword) -> Self {
        value.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lowercases_and_trims() {
        let k = Keyword::new("  Invoice  ").unwrap();
        assert_eq!(k.as_str(), "invoice");
    }

    #[test]
    fn rejects_empty_and_overlong() {
        assert!(Keyword::new("   ").is_err());
        assert!(Keyword::new(&"a".repeat(MAX_KEYWORD_LEN + 1)).is_err());
        assert!(Keyword::new(&"a".repeat(MAX_KEYWORD_LEN)).is_ok());
    }
}
