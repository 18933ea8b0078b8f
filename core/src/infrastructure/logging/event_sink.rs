// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! `tracing`-backed [`EventSink`]. Each [`BlockchainEvent`] becomes one
//! structured `info` span with the event id and payload fields attached,
//! so log aggregators can query them the same way as the ambient
//! per-call-site tracing already emitted by the repositories and
//! services.

use async_trait::async_trait;
use blockchain_core_domain::error::BlockchainError;
use blockchain_core_domain::events::{BlockchainEvent, BlockchainEventPayload, EventSink};

/// Delivers domain events to the process's `tracing` subscriber.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingEventSink;

impl TracingEventSink {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl EventSink for TracingEventSink {
    async fn emit(&self, event: BlockchainEvent) -> Result<(), BlockchainError> {
        let event_id = event.event_id;
        let occurred_at = event.occurred_at;
        match event.payload {
            BlockchainEventPayload::BlockAppended { block_number, hash } => {
                tracing::info!(%event_id, %occurred_at, %block_number, %hash, "block appended");
            }
            BlockchainEventPayload::KeyAuthorised { fingerprint, owner } => {
                tracing::info!(%event_id, %occurred_at, %fingerprint, %owner, "key authorised");
            }
            BlockchainEventPayload::KeyRevoked { fingerprint } => {
                tracing::info!(%event_id, %occurred_at, %fingerprint, "key revoked");
            }
            BlockchainEventPayload::RollbackPerformed { new_head, blocks_removed } => {
                tracing::info!(%event_id, %occurred_at, %new_head, blocks_removed, "rollback performed");
            }
            BlockchainEventPayload::MigrationApplied { version } => {
                tracing::info!(%event_id, %occurred_at, %version, "migration applied");
            }
            BlockchainEventPayload::ValidationCompleted { blocks_checked, passed } => {
                tracing::info!(%event_id, %occurred_at, blocks_checked, passed, "validation completed");
            }
            BlockchainEventPayload::ExportCompleted { block_count } => {
                tracing::info!(%event_id, %occurred_at, block_count, "export completed");
            }
            BlockchainEventPayload::ImportCompleted { block_count } => {
                tracing::info!(%event_id, %occurred_at, block_count, "import completed");
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use blockchain_core_domain::value_objects::{BlockNumber, Hash32};

    use super::*;

    #[tokio::test]
    async fn emit_never_fails() {
        let sink = TracingEventSink::new();
        let event = BlockchainEvent::new(BlockchainEventPayload::BlockAppended {
            block_number: BlockNumber::GENESIS,
            hash: Hash32::ZERO,
        });
        assert!(sink.emit(event).await.is_ok());
    }
}
