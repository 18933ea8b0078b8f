// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Command-Line Interface Module
//!
//! Bootstrap-layer CLI handling with security-first design.
//!
//! ```text
//! 1. parser::parse_cli()      -- parse with clap
//! 2. validator::validate_cli() -- security + range validation
//! 3. ValidatedCli              -- safe, validated config handed to `core`
//! ```

pub mod parser;
pub mod validator;

pub use parser::{parse_cli, Cli, Commands};
pub use validator::{ParseError, SecureArgParser};

use std::path::PathBuf;

/// Validated CLI configuration: global options plus the validated
/// subcommand, handed to `core`'s application layer untouched.
#[derive(Debug, Clone)]
pub struct ValidatedCli {
    pub command: ValidatedCommand,
    pub verbose: bool,
    pub json: bool,
    pub db_type: Option<String>,
    pub db_url: Option<String>,
    pub db_host: Option<String>,
    pub db_port: Option<u16>,
    pub db_name: Option<String>,
    pub db_user: Option<String>,
    pub db_password: Option<String>,
}

/// One validated variant per subcommand.
#[derive(Debug, Clone)]
pub enum ValidatedCommand {
    Status {
        detailed: bool,
    },
    AddKey {
        owner: String,
        generate: bool,
        public_key: Option<String>,
        key_file: Option<PathBuf>,
        store_private: bool,
        key_type: Option<String>,
        parent_key: Option<String>,
        validity_days: Option<u32>,
    },
    ListKeys {
        active_only: bool,
        detailed: bool,
    },
    ManageKeys {
        list: bool,
        check: Option<String>,
        test: Option<String>,
        delete: Option<String>,
        rotate: Option<String>,
        validity_days: Option<u32>,
    },
    AddBlock {
        data: Option<String>,
        file: Option<PathBuf>,
        signer: Option<String>,
        key_file: Option<PathBuf>,
        generate_key: bool,
        keywords: Option<String>,
        category: Option<String>,
    },
    Validate {
        detailed: bool,
        quick: bool,
    },
    Search {
        query: Option<String>,
        category: Option<String>,
        block_number: Option<u64>,
        date_from: Option<String>,
        date_to: Option<String>,
        fast: bool,
        level: Option<String>,
        complete: bool,
        limit: Option<u64>,
        detailed: bool,
    },
    Export {
        path: PathBuf,
    },
    Import {
        path: PathBuf,
        force: bool,
        validate_after: bool,
        backup: bool,
        dry_run: bool,
    },
    Rollback {
        blocks: Option<u64>,
        to_block: Option<u64>,
        dry_run: bool,
        confirm: bool,
    },
    Database {
        action: String,
        file: Option<PathBuf>,
        format: Option<String>,
        no_mask: bool,
    },
    Migrate {
        action: String,
    },
}

/// Parses and validates CLI arguments in one step.
pub fn parse_and_validate() -> Result<ValidatedCli, ParseError> {
    let cli = parse_cli();
    validate_cli(cli)
}

fn validate_cli(cli: Cli) -> Result<ValidatedCli, ParseError> {
    if let Some(ref url) = cli.db_url {
        SecureArgParser::validate_argument(url)?;
    }
    if let Some(ref host) = cli.db_host {
        SecureArgParser::validate_argument(host)?;
    }

    let command = match cli.command {
        Commands::Status { detailed } => ValidatedCommand::Status { detailed },
        Commands::AddKey {
            owner,
            generate,
            public_key,
            key_file,
            store_private,
            key_type,
            parent_key,
            validity_days,
        } => {
            SecureArgParser::validate_argument(&owner)?;
            if !generate && public_key.is_none() && key_file.is_none() {
                return Err(ParseError::InvalidValue {
                    arg: "add-key".to_string(),
                    reason: "one of --generate, --public-key, or --key-file is required".to_string(),
                });
            }
            let key_file = key_file.map(|p| SecureArgParser::validate_path(&p.to_string_lossy())).transpose()?;
            if let Some(days) = validity_days {
                SecureArgParser::validate_number("validity-days", days, Some(1), Some(36_500))?;
            }
            ValidatedCommand::AddKey {
                owner,
                generate,
                public_key,
                key_file,
                store_private,
                key_type,
                parent_key,
                validity_days,
            }
        }
        Commands::ListKeys { active_only, detailed } => ValidatedCommand::ListKeys { active_only, detailed },
        Commands::ManageKeys {
            list,
            check,
            test,
            delete,
            rotate,
            validity_days,
        } => ValidatedCommand::ManageKeys {
            list,
            check,
            test,
            delete,
            rotate,
            validity_days,
        },
        Commands::AddBlock {
            data,
            file,
            signer,
            key_file,
            generate_key,
            keywords,
            category,
        } => {
            if data.is_none() && file.is_none() {
                return Err(ParseError::InvalidValue {
                    arg: "add-block".to_string(),
                    reason: "either inline data or --file is required".to_string(),
                });
            }
            let file = file.map(|p| SecureArgParser::validate_path(&p.to_string_lossy())).transpose()?;
            let key_file = key_file.map(|p| SecureArgParser::validate_path(&p.to_string_lossy())).transpose()?;
            ValidatedCommand::AddBlock {
                data,
                file,
                signer,
                key_file,
                generate_key,
                keywords,
                category,
            }
        }
        Commands::Validate { detailed, quick } => ValidatedCommand::Validate { detailed, quick },
        Commands::Search {
            query,
            category,
            block_number,
            date_from,
            date_to,
            fast,
            level,
            complete,
            limit,
            detailed,
        } => ValidatedCommand::Search {
            query,
            category,
            block_number,
            date_from,
            date_to,
            fast,
            level,
            complete,
            limit,
            detailed,
        },
        Commands::Export { path } => {
            let path = SecureArgParser::validate_output_path(&path.to_string_lossy())?;
            ValidatedCommand::Export { path }
        }
        Commands::Import {
            path,
            force,
            validate_after,
            backup,
            dry_run,
        } => {
            let validated_path = SecureArgParser::validate_path(&path.to_string_lossy())?;
            ValidatedCommand::Import {
                path: validated_path,
                force,
                validate_after,
                backup,
                dry_run,
            }
        }
        Commands::Rollback {
            blocks,
            to_block,
            dry_run,
            confirm,
        } => {
            if blocks.is_none() && to_block.is_none() {
                return Err(ParseError::InvalidValue {
                    arg: "rollback".to_string(),
                    reason: "one of --blocks or --to-block is required".to_string(),
                });
            }
            ValidatedCommand::Rollback {
                blocks,
                to_block,
                dry_run,
                confirm,
            }
        }
        Commands::Database {
            action,
            file,
            format,
            no_mask,
        } => {
            SecureArgParser::validate_argument(&action)?;
            let file = file.map(|p| SecureArgParser::validate_output_path(&p.to_string_lossy())).transpose()?;
            ValidatedCommand::Database {
                action,
                file,
                format,
                no_mask,
            }
        }
        Commands::Migrate { action } => {
            SecureArgParser::validate_argument(&action)?;
            ValidatedCommand::Migrate { action }
        }
    };

    Ok(ValidatedCli {
        command,
        verbose: cli.verbose,
        json: cli.json,
        db_type: cli.db_type,
        db_url: cli.db_url,
        db_host: cli.db_host,
        db_port: cli.db_port,
        db_name: cli.db_name,
        db_user: cli.db_user,
        db_password: cli.db_password,
    })
}
