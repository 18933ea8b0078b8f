// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! `AuthorisedKey.keyType`: the position of a signing key in the issuing
//! forest. ROOT keys have no parent; INTERMEDIATE and OPERATIONAL keys
//! reference the fingerprint of the key that issued them.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::BlockchainError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KeyType {
    Root,
    Intermediate,
    Operational,
}

impl fmt::Display for KeyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            KeyType::Root => "ROOT",
            KeyType::Intermediate => "INTERMEDIATE",
            KeyType::Operational => "OPERATIONAL",
        };
        write!(f, "{s}")
    }
}

impl FromStr for KeyType {
    type Err = BlockchainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "ROOT" => Ok(KeyType::Root),
            "INTERMEDIATE" => Ok(KeyType::Intermediate),
            "OPERATIONAL" => Ok(KeyType::Operational),
            other => Err(BlockchainError::usage(format!("unknown key type: {other}"))),
        }
    }
}
