// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Infrastructure services: the ones that wrap a domain port with real
//! I/O (files, password-derived encryption) instead of pure computation.

pub mod key_loader;
pub mod offchain_store;
pub mod search_engine;
pub mod validation_engine;
pub mod vault;

pub use key_loader::load_private_key_der;
pub use offchain_store::OffChainStore;
pub use search_engine::{SearchEngine, SearchFilters, SearchOutcome};
pub use validation_engine::{ValidationEngine, ValidationMode, ValidationReport};
pub use vault::Vault;
