// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Reliable Writer side -- RTPS Sec.8.4.7
//!
//! The writer keeps one [`ReaderProxy`](crate::ReaderProxy) per matched reader
//! and routes control traffic to it.
//!
//! # Architecture
//!
//! ```text
//! +-------------------------------------------------------------+
//! |  MatchedReadersRegistry (thread-safe, shared)               |
//! |  +---------------------------------------------------------+|
//! |  |  DashMap<GUID, Arc<ReaderProxy>>   + idle proxy pool    ||
//! |  +---------------------------------------------------------+|
//! |                                                             |
//! |  Used by:                                                   |
//! |  - Write path: add_change_for_all() -> every proxy          |
//! |  - Control thread: on_acknack() / on_nack_frag()            |
//! |  - History: change_removed(), min_low_water_mark()          |
//! +-------------------------------------------------------------+
//! ```
//!
//! # Thread Safety
//!
//! Uses DashMap for lock-free concurrent access from multiple threads.

mod matched_readers;

pub use matched_readers::MatchedReadersRegistry;
