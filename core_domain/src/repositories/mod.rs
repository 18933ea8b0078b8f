// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Domain Repositories
//!
//! Ports for the persistence layer. Each trait is technology
//! agnostic; `core::infrastructure::repositories` provides the concrete
//! `sqlx::Any`-backed implementations. Keeping these as traits here, not
//! concrete structs, is what lets tests construct isolated in-memory or
//! per-test-database instances.

pub mod authorised_key_repository;
pub mod block_repository;
pub mod offchain_record_repository;
pub mod schema_history_repository;
pub mod vault_repository;

pub use authorised_key_repository::AuthorisedKeyRepository;
pub use block_repository::BlockRepository;
pub use offchain_record_repository::OffChainRecordRepository;
pub use schema_history_repository::SchemaHistoryRepository;
pub use vault_repository::VaultRepository;
