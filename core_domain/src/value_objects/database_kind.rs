// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! The four SQL engines the persistence layer is portable across. There is no Rust crate for the embedded H2 engine; `H2` is kept
//! as a first-class external value (CLI flag, config value, masked status
//! output) and implemented underneath as an embedded SQLite file — see
//! the "Database-agnostic persistence" note in the project's design
//! records for the rationale.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::BlockchainError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DatabaseKind {
    H2,
    Sqlite,
    Postgresql,
    Mysql,
}

impl DatabaseKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DatabaseKind::H2 => "h2",
            DatabaseKind::Sqlite => "sqlite",
            DatabaseKind::Postgresql => "postgresql",
            DatabaseKind::Mysql => "mysql",
        }
    }

    /// Default connection-pool profile (minSize, maxSize).
    pub fn default_pool_range(&self) -> (u32, u32) {
        match self {
            DatabaseKind::H2 => (5, 20),
            DatabaseKind::Sqlite => (1, 5),
            DatabaseKind::Postgresql => (10, 60),
            DatabaseKind::Mysql => (10, 50),
        }
    }
}

impl fmt::Display for DatabaseKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for DatabaseKind {
    type Err = BlockchainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "h2" => Ok(DatabaseKind::H2),
            "sqlite" => Ok(DatabaseKind::Sqlite),
            "postgresql" | "postgres" => Ok(DatabaseKind::Postgresql),
            "mysql" => Ok(DatabaseKind::Mysql),
            other => Err(BlockchainError::usage(format!(
                "invalid db type '{other}', expected one of h2, sqlite, postgresql, mysql"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pool_ranges_match_spec_profiles() {
        assert_eq!(DatabaseKind::Sqlite.default_pool_range(), (1, 5));
        assert_eq!(DatabaseKind::Postgresql.default_pool_range(), (10, 60));
    }

    #[test]
    fn parses_all_four_kinds() {
        for s in ["h2", "sqlite", "postgresql", "mysql"] {
            assert!(s.parse::<DatabaseKind>().is_ok());
        }
        assert!("oracle".parse::<DatabaseKind>().is_err());
    }
}
