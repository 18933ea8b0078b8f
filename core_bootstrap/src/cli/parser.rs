// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # CLI Structure
//!
//! `clap`-derived command surface. The CLI is a thin adapter: every
//! subcommand here maps to one core operation, and the heavy validation
//! (path safety, numeric ranges) happens in [`super::validator`], not in
//! the `clap` annotations themselves.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "blockchain-cli", about = "Private, permissioned, single-node blockchain core")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true)]
    pub json: bool,

    #[arg(long, global = true, value_name = "ENGINE")]
    pub db_type: Option<String>,

    #[arg(long, global = true)]
    pub db_url: Option<String>,

    #[arg(long, global = true)]
    pub db_host: Option<String>,

    #[arg(long, global = true)]
    pub db_port: Option<u16>,

    #[arg(long, global = true)]
    pub db_name: Option<String>,

    #[arg(long, global = true)]
    pub db_user: Option<String>,

    /// Documented as insecure; prefer `DB_PASSWORD`.
    #[arg(long, global = true)]
    pub db_password: Option<String>,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    Status {
        #[arg(long)]
        detailed: bool,
    },
    AddKey {
        owner: String,
        #[arg(long)]
        generate: bool,
        #[arg(long, value_name = "BASE64")]
        public_key: Option<String>,
        #[arg(long)]
        key_file: Option<PathBuf>,
        #[arg(long)]
        store_private: bool,
        #[arg(long, value_name = "root|intermediate|operational")]
        key_type: Option<String>,
        #[arg(long)]
        parent_key: Option<String>,
        #[arg(long)]
        validity_days: Option<u32>,
    },
    ListKeys {
        #[arg(long)]
        active_only: bool,
        #[arg(long)]
        detailed: bool,
    },
    ManageKeys {
        #[arg(long)]
        list: bool,
        #[arg(long)]
        check: Option<String>,
        #[arg(long)]
        test: Option<String>,
        #[arg(long)]
        delete: Option<String>,
        #[arg(long)]
        rotate: Option<String>,
        #[arg(long)]
        validity_days: Option<u32>,
    },
    AddBlock {
        data: Option<String>,
        #[arg(long)]
        file: Option<PathBuf>,
        #[arg(long)]
        signer: Option<String>,
        #[arg(long)]
        key_file: Option<PathBuf>,
        #[arg(long)]
        generate_key: bool,
        #[arg(long, value_name = "K1,K2,...")]
        keywords: Option<String>,
        #[arg(long)]
        category: Option<String>,
    },
    Validate {
        #[arg(long, conflicts_with = "quick")]
        detailed: bool,
        #[arg(long)]
        quick: bool,
    },
    Search {
        query: Option<String>,
        #[arg(long)]
        category: Option<String>,
        #[arg(long)]
        block_number: Option<u64>,
        #[arg(long)]
        date_from: Option<String>,
        #[arg(long)]
        date_to: Option<String>,
        #[arg(long)]
        fast: bool,
        #[arg(long, value_name = "FAST_ONLY|INCLUDE_DATA|EXHAUSTIVE_OFFCHAIN")]
        level: Option<String>,
        #[arg(long)]
        complete: bool,
        #[arg(long)]
        limit: Option<u64>,
        #[arg(long)]
        detailed: bool,
    },
    Export {
        path: PathBuf,
    },
    Import {
        path: PathBuf,
        #[arg(long)]
        force: bool,
        #[arg(long)]
        validate_after: bool,
        #[arg(long)]
        backup: bool,
        #[arg(long)]
        dry_run: bool,
    },
    Rollback {
        #[arg(long)]
        blocks: Option<u64>,
        #[arg(long)]
        to_block: Option<u64>,
        #[arg(long)]
        dry_run: bool,
        #[arg(long, alias = "yes")]
        confirm: bool,
    },
    Database {
        #[arg(value_name = "show|test|export")]
        action: String,
        #[arg(long)]
        file: Option<PathBuf>,
        #[arg(long, value_name = "properties|json|env")]
        format: Option<String>,
        #[arg(long)]
        no_mask: bool,
    },
    Migrate {
        #[arg(value_name = "run|show-history|validate|current-version")]
        action: String,
    },
}

pub fn parse_cli() -> Cli {
    Cli::parse()
}
