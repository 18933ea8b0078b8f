// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! `sqlx::Any`-backed connection pooling, the migration engine, and one
//! repository implementation per domain port.

pub mod migration;
pub mod pool;
pub mod sql_authorised_key_repository;
pub mod sql_block_repository;
pub mod sql_offchain_record_repository;
pub mod sql_schema_history_repository;
pub mod sql_vault_repository;

pub use pool::connect;
pub use sql_authorised_key_repository::SqlAuthorisedKeyRepository;
pub use sql_block_repository::SqlBlockRepository;
pub use sql_offchain_record_repository::SqlOffChainRecordRepository;
pub use sql_schema_history_repository::SqlSchemaHistoryRepository;
pub use sql_vault_repository::SqlVaultRepository;
