// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Domain Error System
//!
//! A single hierarchical error type for the ledger core. Every fallible
//! domain, infrastructure, and application operation returns
//! `Result<T, BlockchainError>`; the presentation layer maps variants to
//! exit codes and JSON error envelopes.
//!
//! ## Error Kinds
//!
//! - **Usage** - malformed inputs, conflicting options, out-of-range
//!   parameters.
//! - **Config** - invalid `DatabaseConfig`, unreachable database, bad file
//!   permissions.
//! - **Auth** - signer not found, signer not authorised at a timestamp,
//!   wrong vault password.
//! - **Integrity** - hash mismatch, signature failure, off-chain decryption
//!   failure, migration checksum mismatch.
//! - **NotFound** - block number, owner, fingerprint, export file,
//!   off-chain record.
//! - **Conflict** - removing genesis, duplicate owner, lock not acquired
//!   within timeout.
//! - **Io** - file-system errors on the off-chain store or export/import.
//! - **Db** - persistence errors not otherwise classified.

use thiserror::Error;

/// Domain-specific errors for the ledger core.
///
/// Each variant carries a short machine-readable `code` alongside its
/// human message, matching the JSON error envelope the CLI adapter emits.
#[derive(Error, Debug, Clone)]
pub enum BlockchainError {
    #[error("usage error: {0}")]
    Usage(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("authorisation error: {0}")]
    Auth(String),

    #[error("integrity violation: {0}")]
    Integrity(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("i/o error: {0}")]
    Io(String),

    #[error("database error: {0}")]
    Db(String),
}

/// The coarse-grained kind of a [`BlockchainError`], used for JSON error
/// envelopes and exit-code mapping rather than pattern matching on the
/// error itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Usage,
    Config,
    Auth,
    Integrity,
    NotFound,
    Conflict,
    Io,
    Db,
}

impl ErrorKind {
    /// Short machine-readable code, e.g. for `--json` error envelopes.
    pub fn code(&self) -> &'static str {
        match self {
            ErrorKind::Usage => "USAGE",
            ErrorKind::Config => "CONFIG",
            ErrorKind::Auth => "AUTH",
            ErrorKind::Integrity => "INTEGRITY",
            ErrorKind::NotFound => "NOT_FOUND",
            ErrorKind::Conflict => "CONFLICT",
            ErrorKind::Io => "IO",
            ErrorKind::Db => "DB",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code())
    }
}

impl BlockchainError {
    pub fn usage(msg: impl Into<String>) -> Self {
        Self::Usage(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn auth(msg: impl Into<String>) -> Self {
        Self::Auth(msg.into())
    }

    pub fn integrity(msg: impl Into<String>) -> Self {
        Self::Integrity(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn io(msg: impl Into<String>) -> Self {
        Self::Io(msg.into())
    }

    pub fn db(msg: impl Into<String>) -> Self {
        Self::Db(msg.into())
    }

    /// Coarse-grained kind for exit-code mapping and JSON envelopes.
    pub fn kind(&self) -> ErrorKind {
        match self {
            BlockchainError::Usage(_) => ErrorKind::Usage,
            BlockchainError::Config(_) => ErrorKind::Config,
            BlockchainError::Auth(_) => ErrorKind::Auth,
            BlockchainError::Integrity(_) => ErrorKind::Integrity,
            BlockchainError::NotFound(_) => ErrorKind::NotFound,
            BlockchainError::Conflict(_) => ErrorKind::Conflict,
            BlockchainError::Io(_) => ErrorKind::Io,
            BlockchainError::Db(_) => ErrorKind::Db,
        }
    }

    /// Short machine-readable code for the JSON error envelope.
    pub fn code(&self) -> &'static str {
        self.kind().code()
    }

    /// Usage/Config errors stem from caller input and are never transient;
    /// Io and Db failures may succeed on retry.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, BlockchainError::Io(_) | BlockchainError::Db(_))
    }
}

impl From<std::io::Error> for BlockchainError {
    fn from(err: std::io::Error) -> Self {
        BlockchainError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for BlockchainError {
    fn from(err: serde_json::Error) -> Self {
        BlockchainError::Io(format!("json: {err}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_code_round_trip() {
        assert_eq!(BlockchainError::usage("bad arg").kind().code(), "USAGE");
        assert_eq!(BlockchainError::integrity("hash mismatch").code(), "INTEGRITY");
    }

    #[test]
    fn only_io_and_db_are_recoverable() {
        assert!(BlockchainError::io("disk full").is_recoverable());
        assert!(BlockchainError::db("pool exhausted").is_recoverable());
        assert!(!BlockchainError::usage("bad arg").is_recoverable());
        assert!(!BlockchainError::auth("wrong password").is_recoverable());
    }
}
