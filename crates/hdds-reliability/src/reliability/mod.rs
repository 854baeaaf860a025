// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! # Writer-side Reliability State
//!
//! Per-reader bookkeeping of a reliable RTPS StatefulWriter (RTPS v2.5
//! Sec.8.4.7 and Sec.8.4.9.2).
//!
//! ## Protocol Flow
//!
//! ```text
//! Writer (ReaderProxy for R)                  Reader R
//!   |                                            |
//!   |--- DATA (seq=1) -------------------------->|   1: UNSENT -> UNACKNOWLEDGED
//!   |--- DATA (seq=2) ----------X (lost)         |   2: UNSENT -> UNACKNOWLEDGED
//!   |--- HEARTBEAT (first=1, last=2) ----------->|
//!   |<-- ACKNACK (base=2, missing: [2]) ---------|   1: acknowledged, low water mark = 1
//!   |                                            |   2: REQUESTED, nack_response_delay armed
//!   |   ... nack_response_delay expires ...      |   2: REQUESTED -> UNSENT, writer woken
//!   |--- DATA (seq=2) [repair] ----------------->|   2: UNSENT -> UNDERWAY
//!   |   ... nack_suppression_duration ...        |   2: UNDERWAY -> UNACKNOWLEDGED
//!   |<-- ACKNACK (base=3) -----------------------|   low water mark = 2
//! ```
//!
//! ## Components
//!
//! | Component | Role |
//! |-----------|------|
//! | `ReaderProxy` | Change table, low-water mark and NACK timers for one reader |
//! | `ChangeForReader` | Delivery record of one change for one reader |
//! | `SequenceNumberSet` / `FragmentNumberSet` | Decoded ACKNACK / NACK_FRAG bitmaps |
//! | `HistoryCache` | Writer sample store, looked up on acknowledgment regression |
//! | `ReaderProxyMetrics` | Observability counters (NACKs, stale messages, resurrections) |

// Core types
mod change;
mod metrics;
mod seq;

// History cache
mod history_cache;

// Per-reader state
mod reader_proxy;

// ============================================================================
// Public re-exports
// ============================================================================

pub use change::{ChangeForReader, ChangeForReaderStatus};
pub use history_cache::{CacheChange, History, HistoryCache, WriterHistory};
pub use metrics::{ReaderProxyMetrics, ReaderProxyMetricsSnapshot};
pub use reader_proxy::{
    AckNackOutcome, NackFragOutcome, ReaderAttributes, ReaderProxy, ReaderProxyGuard,
    ReliabilityKind,
};
pub use seq::{
    FragmentNumber, FragmentNumberSet, SequenceNumber, SequenceNumberSet, MAX_BITMAP_BITS,
    SEQUENCE_NUMBER_UNKNOWN,
};
