// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Persistence port for the `schema_history` table. Rows are
//! append-only; `installed_rank` is assigned by the repository and must
//! be contiguous starting at 1.

use async_trait::async_trait;

use crate::entities::SchemaHistoryRow;
use crate::error::BlockchainError;

#[async_trait]
pub trait SchemaHistoryRepository: Send + Sync {
    /// Appends a row, assigning the next `installed_rank`.
    async fn record(&self, row: &SchemaHistoryRow) -> Result<(), BlockchainError>;

    /// All rows in `installed_rank` order.
    async fn history(&self) -> Result<Vec<SchemaHistoryRow>, BlockchainError>;

    /// The highest successfully applied version number, if any.
    async fn current_version(&self) -> Result<Option<u64>, BlockchainError>;

    /// Ensures the `schema_history` table itself exists; a no-op if it
    /// is already present.
    async fn ensure_initialised(&self) -> Result<(), BlockchainError>;
}
