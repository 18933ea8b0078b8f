// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Domain events emitted by block-engine and vault operations.
//! Wrapped in [`generic_event::DomainEvent`] for event id, timestamp, and
//! correlation tracking; the payload itself carries only what each
//! operation produced.

use serde::{Deserialize, Serialize};

use super::generic_event::{DomainEvent, EventCategory, EventPayload};
use crate::value_objects::{BlockNumber, Hash32};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum BlockchainEventPayload {
    BlockAppended {
        block_number: BlockNumber,
        hash: Hash32,
    },
    KeyAuthorised {
        fingerprint: Hash32,
        owner: String,
    },
    KeyRevoked {
        fingerprint: Hash32,
    },
    RollbackPerformed {
        new_head: BlockNumber,
        blocks_removed: u64,
    },
    MigrationApplied {
        version: String,
    },
    ValidationCompleted {
        blocks_checked: u64,
        passed: bool,
    },
    ExportCompleted {
        block_count: u64,
    },
    ImportCompleted {
        block_count: u64,
    },
}

impl EventPayload for BlockchainEventPayload {
    fn event_name(&self) -> &'static str {
        match self {
            BlockchainEventPayload::BlockAppended { .. } => "BlockAppended",
            BlockchainEventPayload::KeyAuthorised { .. } => "KeyAuthorised",
            BlockchainEventPayload::KeyRevoked { .. } => "KeyRevoked",
            BlockchainEventPayload::RollbackPerformed { .. } => "RollbackPerformed",
            BlockchainEventPayload::MigrationApplied { .. } => "MigrationApplied",
            BlockchainEventPayload::ValidationCompleted { .. } => "ValidationCompleted",
            BlockchainEventPayload::ExportCompleted { .. } => "ExportCompleted",
            BlockchainEventPayload::ImportCompleted { .. } => "ImportCompleted",
        }
    }

    fn event_category(&self) -> EventCategory {
        match self {
            BlockchainEventPayload::BlockAppended { .. }
            | BlockchainEventPayload::RollbackPerformed { .. }
            | BlockchainEventPayload::ExportCompleted { .. }
            | BlockchainEventPayload::ImportCompleted { .. } => EventCategory::Processing,
            BlockchainEventPayload::KeyAuthorised { .. } | BlockchainEventPayload::KeyRevoked { .. } => {
                EventCategory::Security
            }
            BlockchainEventPayload::MigrationApplied { .. } => EventCategory::System,
            BlockchainEventPayload::ValidationCompleted { .. } => EventCategory::Custom("Validation".to_string()),
        }
    }
}

pub type BlockchainEvent = DomainEvent<BlockchainEventPayload>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_name_matches_variant() {
        let payload = BlockchainEventPayload::BlockAppended {
            block_number: BlockNumber::GENESIS,
            hash: Hash32::ZERO,
        };
        assert_eq!(payload.event_name(), "BlockAppended");
        let event = BlockchainEvent::new(payload);
        assert_eq!(event.payload.event_name(), "BlockAppended");
    }
}
