// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Blockchain Core Domain
//!
//! The pure domain layer of a private, permissioned, single-writer
//! blockchain core: entities, value objects, repository ports, domain
//! events, and the crypto/keyword services that don't need I/O.
//!
//! This crate has no knowledge of SQL, the filesystem, or the CLI. It
//! depends only on cryptography (`p256`, `sha3`, `aes-gcm`, `pbkdf2`),
//! serialization (`serde`), and `async-trait` for the repository and
//! event-sink ports, which are implemented against real infrastructure
//! one layer up.
//!
//! ## Layout
//!
//! - [`value_objects`] - immutable, self-validating wrapper types
//!   (`Hash32`, `BlockNumber`, `Timestamp`, ...).
//! - [`entities`] - `Block`, `AuthorisedKey`, `OffChainRecord`, and the
//!   auxiliary rows (`SchemaHistoryRow`, `StoredPrivateKey`).
//! - [`aggregates`] - [`aggregates::ChainLink`], which enforces the
//!   hash-chain invariants when extending or validating the ledger.
//! - [`repositories`] - persistence ports implemented by `core`'s
//!   infrastructure layer.
//! - [`services`] - pure, synchronous domain services: cryptography and
//!   keyword extraction.
//! - [`events`] - the domain event envelope and the `EventSink` port.
//! - [`error`] - [`error::BlockchainError`], the one error type returned
//!   by every fallible operation in this system.

pub mod aggregates;
pub mod entities;
pub mod error;
pub mod events;
pub mod repositories;
pub mod services;
pub mod value_objects;

pub use error::{BlockchainError, ErrorKind};
