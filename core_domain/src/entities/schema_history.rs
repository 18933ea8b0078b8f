// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! A row of the `schema_history` table: one per migration
//! attempt, successful or failed.

use serde::{Deserialize, Serialize};

use crate::value_objects::Timestamp;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaHistoryRow {
    pub installed_rank: i64,
    /// `"V<number>"`, e.g. `"V1"`.
    pub version: String,
    pub description: String,
    #[serde(rename = "type")]
    pub migration_type: String,
    pub script: String,
    /// CRC32 of the normalised script body; `None` only for pre-checksum
    /// rows, which this implementation never produces.
    pub checksum: Option<i64>,
    pub installed_by: String,
    pub installed_on: Timestamp,
    pub execution_time_ms: i64,
    pub success: bool,
}

impl SchemaHistoryRow {
    /// Numeric ordinal parsed from `version` (`"V12"` -> `12`), used to
    /// validate contiguity.
    pub fn version_number(&self) -> Option<u64> {
        self.version.strip_prefix('V').and_then(|n| n.parse().ok())
    }
}
