// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Database Configuration Resolution
//!
//! Resolves a [`database_config::DatabaseConfig`] from four layered
//! sources: CLI overrides, environment variables, the properties file
//! at `<home>/.blockchain-cli/database.properties`, and hard defaults.
//! [`masking::SensitiveDataMasker`] redacts secrets from any value this
//! layer emits or exports.

pub mod database_config;
pub mod masking;

pub use database_config::{CliOverrides, DatabaseConfig, Hbm2ddlMode, PoolConfig};
pub use masking::SensitiveDataMasker;
