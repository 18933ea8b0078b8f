// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Optional block category: uppercase, trimmed, control characters
//! rejected; empty normalises to absent rather than an empty string.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::BlockchainError;

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Category(String);

impl Category {
    /// Normalises `raw`. Returns `Ok(None)` for an empty result rather
    /// than an error, since category is optional on a block.
    pub fn normalise(raw: &str) -> Result<Option<Self>, BlockchainError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Ok(None);
        }
        if trimmed.chars().any(|c| c.is_control()) {
            return Err(BlockchainError::usage("category must not contain control characters"));
        }
        Ok(Some(Self(trimmed.to_uppercase())))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for Category {
    type Error = BlockchainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Category::normalise(&value)?.ok_or_else(|| BlockchainError::usage("category must not be empty"))
    }
}

impl From<Category> for String {
    fn from(value: Category) -> Self {
        value.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_normalises_to_none() {
        assert_eq!(Category::normalise("   ").unwrap(), None);
    }

    #[test]
    fn uppercases_and_trims() {
        let c = Category::normalise("  invoice ").unwrap().unwrap();
        assert_eq!(c.as_str(), "INVOICE");
    }

    #[test]
    fn rejects_control_characters() {
        assert!(Category::normalise("inv\u{0007}oice").is_err());
    }
}
