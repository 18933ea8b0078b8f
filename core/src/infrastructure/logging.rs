// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Infrastructure Logging
//!
//! Structured logging via `tracing`. [`event_sink::TracingEventSink`] turns
//! domain events into one `tracing::info!` call per event kind, keyed so
//! fields stay queryable by a log aggregator rather than serialised as a
//! single opaque `Debug` blob.

pub mod event_sink;

pub use event_sink::TracingEventSink;
