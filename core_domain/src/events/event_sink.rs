// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Port for delivering [`BlockchainEvent`]s out of the domain. The CLI's default implementation logs events
//! via `tracing`; nothing in the domain depends on that choice.

use async_trait::async_trait;

use super::blockchain_event::BlockchainEvent;
use crate::error::BlockchainError;

#[async_trait]
pub trait EventSink: Send + Sync {
    async fn emit(&self, event: BlockchainEvent) -> Result<(), BlockchainError>;
}

/// An [`EventSink`] that discards every event; useful in tests that
/// don't care about observability output.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullEventSink;

#[async_trait]
impl EventSink for NullEventSink {
    async fn emit(&self, _event: BlockchainEvent) -> Result<(), BlockchainError> {
        Ok(())
    }
}
