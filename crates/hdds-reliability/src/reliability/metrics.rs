// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Metrics for per-reader reliability tracking
//!
//! Counts NACK traffic, stale control messages, acknowledgment regressions
//! and timer-driven transitions for one reader proxy.

use std::sync::atomic::{AtomicU64, Ordering};

/// Reader proxy metrics collector
///
/// # Thread Safety
///
/// All methods use atomic operations (Relaxed ordering) for lock-free updates.
#[derive(Debug, Default)]
pub struct ReaderProxyMetrics {
    /// Changes moved UNACKNOWLEDGED -> REQUESTED by ACKNACK
    changes_requested: AtomicU64,
    /// NACK_FRAG requests applied
    fragments_requested: AtomicU64,
    /// ACKNACKs dropped by the count check
    stale_acknacks: AtomicU64,
    /// NACK_FRAGs dropped by the count check
    stale_nack_frags: AtomicU64,
    /// Changes re-inserted by an acknowledgment regression
    changes_resurrected: AtomicU64,
    /// Changes removed because the reader acknowledged them
    changes_acknowledged: AtomicU64,
    /// NACK response timer firings that released REQUESTED changes
    nack_responses: AtomicU64,
    /// NACK suppression timer firings that released UNDERWAY changes
    nack_suppressions: AtomicU64,
}

/// Point-in-time copy of [`ReaderProxyMetrics`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReaderProxyMetricsSnapshot {
    pub changes_requested: u64,
    pub fragments_requested: u64,
    pub stale_acknacks: u64,
    pub stale_nack_frags: u64,
    pub changes_resurrected: u64,
    pub changes_acknowledged: u64,
    pub nack_responses: u64,
    pub nack_suppressions: u64,
}

impl ReaderProxyMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment_changes_requested(&self, count: u64) {
        self.changes_requested.fetch_add(count, Ordering::Relaxed);
    }

    pub fn increment_fragments_requested(&self) {
        self.fragments_requested.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_stale_acknack(&self) {
        self.stale_acknacks.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_stale_nack_frag(&self) {
        self.stale_nack_frags.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_changes_resurrected(&self, count: u64) {
        self.changes_resurrected.fetch_add(count, Ordering::Relaxed);
    }

    pub fn increment_changes_acknowledged(&self, count: u64) {
        self.changes_acknowledged.fetch_add(count, Ordering::Relaxed);
    }

    pub fn increment_nack_responses(&self) {
        self.nack_responses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_nack_suppressions(&self) {
        self.nack_suppressions.fetch_add(1, Ordering::Relaxed);
    }

    /// Load all counters.
    pub fn snapshot(&self) -> ReaderProxyMetricsSnapshot {
        ReaderProxyMetricsSnapshot {
            changes_requested: self.changes_requested.load(Ordering::Relaxed),
            fragments_requested: self.fragments_requested.load(Ordering::Relaxed),
            stale_acknacks: self.stale_acknacks.load(Ordering::Relaxed),
            stale_nack_frags: self.stale_nack_frags.load(Ordering::Relaxed),
            changes_resurrected: self.changes_resurrected.load(Ordering::Relaxed),
            changes_acknowledged: self.changes_acknowledged.load(Ordering::Relaxed),
            nack_responses: self.nack_responses.load(Ordering::Relaxed),
            nack_suppressions: self.nack_suppressions.load(Ordering::Relaxed),
        }
    }

    /// Reset all counters (proxy reused for a new match).
    pub fn reset(&self) {
        for counter in [
            &self.changes_requested,
            &self.fragments_requested,
            &self.stale_acknacks,
            &self.stale_nack_frags,
            &self.changes_resurrected,
            &self.changes_acknowledged,
            &self.nack_responses,
            &self.nack_suppressions,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
    }
}
