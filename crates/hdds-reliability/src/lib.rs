// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! # HDDS Reliability - Per-reader delivery tracking
//!
//! The writer half of the RTPS reliability protocol: for every remote reader
//! matched to a reliable (or best-effort) writer, a [`ReaderProxy`] tracks
//! which changes the reader has acknowledged, which are outstanding, which it
//! asked to be resent and, for fragmented samples, which fragments are left.
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use hdds_reliability::{
//!     History, HistoryCache, MatchedReadersRegistry, ReaderAttributes, ReliabilityKind,
//!     SequenceNumberSet, WakeNotifier, WriterTimes, GUID,
//! };
//!
//! fn main() -> hdds_reliability::Result<()> {
//!     let history = Arc::new(HistoryCache::new(History::KeepLast(64), 64, 0));
//!     let wake = WakeNotifier::shared();
//!     let readers = MatchedReadersRegistry::new(WriterTimes::default(), history.clone(), wake.clone())?;
//!
//!     let reader = GUID::new([1; 12], [0, 0, 1, 7]);
//!     readers.match_reader(ReaderAttributes::new(reader, ReliabilityKind::Reliable))?;
//!
//!     let (change, _evicted) = history.add(b"hello")?;
//!     readers.add_change_for_all(&change);
//!     assert!(wake.check_and_clear());
//!
//!     // ACKNACK: everything below 2 received, nothing missing.
//!     readers.on_acknack(&reader, 1, &SequenceNumberSet::empty(2))?;
//!     assert!(readers.is_acked_by_all(change.sequence_number));
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! +---------------------------------------------------------------------+
//! |                      Writer (send loop, history)                    |
//! +---------------------------------------------------------------------+
//! |  MatchedReadersRegistry  --  one ReaderProxy per matched reader     |
//! +---------------------------------------------------------------------+
//! |  ReaderProxy: change table | low-water mark | NACK timers           |
//! +---------------------------------------------------------------------+
//! |  Timer threads | WriterWakeup | WriterHistory lookup                |
//! +---------------------------------------------------------------------+
//! ```
//!
//! ## Modules Overview
//!
//! - [`reliability`] - ReaderProxy, change records, sequence sets, history cache
//! - [`writer`] - Matched readers registry
//! - [`engine`] - Delay timers and writer wake-up
//! - [`config`] - Writer timing parameters (optional YAML loader)
//!
//! ## See Also
//!
//! - [RTPS Specification](https://www.omg.org/spec/DDSI-RTPS/2.5/) Sec.8.4.7 / Sec.8.4.9

/// Writer timing configuration (NACK response delay, suppression, heartbeat).
pub mod config;
/// Core identifiers (GUID).
pub mod core;
/// Delay timers and writer wake-up notification.
pub mod engine;
/// Error type.
pub mod error;
/// Per-reader reliability state (ReaderProxy, ChangeForReader, history cache).
pub mod reliability;
/// Writer-side registry of matched readers.
pub mod writer;

pub use config::WriterTimes;
#[cfg(feature = "qos-loaders")]
pub use config::WriterTimesLoader;
pub use crate::core::guid::GUID;
pub use engine::{Timer, WakeNotifier, WriterWakeup};
pub use error::{Error, Result};
pub use reliability::{
    AckNackOutcome, CacheChange, ChangeForReader, ChangeForReaderStatus, FragmentNumber,
    FragmentNumberSet, History, HistoryCache, NackFragOutcome, ReaderAttributes, ReaderProxy,
    ReaderProxyGuard, ReaderProxyMetricsSnapshot, ReliabilityKind, SequenceNumber,
    SequenceNumberSet, WriterHistory, SEQUENCE_NUMBER_UNKNOWN,
};
pub use writer::MatchedReadersRegistry;
