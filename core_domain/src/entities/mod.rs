// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Domain Entities
//!
//! Objects with identity that persists across state changes, mapped 1:1 to
//! the ledger's primary and auxiliary tables. The block engine
//! (`core::application::block_engine`) is the only writer of `Block`,
//! `AuthorisedKey`, and `OffChainRecord`; these types themselves carry no
//! persistence logic, only invariants checkable in memory.

pub mod authorised_key;
pub mod block;
pub mod offchain_record;
pub mod schema_history;
pub mod stored_private_key;

pub use authorised_key::AuthorisedKey;
pub use block::{Block, BlockData};
pub use offchain_record::OffChainRecord;
pub use schema_history::SchemaHistoryRow;
pub use stored_private_key::StoredPrivateKey;
