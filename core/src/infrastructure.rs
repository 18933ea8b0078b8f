// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Infrastructure Layer
//!
//! Everything that touches the outside world: the database pool and
//! migration engine, the `sqlx::Any`-backed repositories, the off-chain
//! blob store, the key loader, the search/validation engines, the
//! secure key vault service, and config/logging plumbing.

pub mod config;
pub mod logging;
pub mod repositories;
pub mod services;
