// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Writer history: the sample store reader proxies look changes up in.
//!
//! Reader proxies only consume the read-only [`WriterHistory`] interface. The
//! [`HistoryCache`] here is a bounded ring enforcing KEEP_LAST depth eviction or
//! KEEP_ALL insert rejection, usable as the writer's history.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use super::seq::{SequenceNumber, SEQUENCE_NUMBER_UNKNOWN};
use crate::error::{Error, Result};

/// Read-only view of a writer's sample history.
///
/// Shared by every reader proxy of one writer; implementations must support
/// concurrent lookups.
pub trait WriterHistory: Send + Sync {
    /// Cached sample for `seq`, or `None` if it was evicted or never existed.
    fn lookup(&self, seq: SequenceNumber) -> Option<CacheChange>;

    /// Lowest sequence number still held, or `SEQUENCE_NUMBER_UNKNOWN` if empty.
    fn minimum_sequence_number(&self) -> SequenceNumber;

    /// Highest sequence number still held, or `SEQUENCE_NUMBER_UNKNOWN` if empty.
    fn maximum_sequence_number(&self) -> SequenceNumber;
}

/// One cached sample.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheChange {
    pub sequence_number: SequenceNumber,
    pub payload: Arc<[u8]>,
    /// Fragment size used when sending; 0 means the sample is never fragmented.
    pub fragment_size: usize,
}

impl CacheChange {
    /// Build a cache change for an explicit sequence number.
    pub fn new(sequence_number: SequenceNumber, payload: &[u8], fragment_size: usize) -> Self {
        Self {
            sequence_number,
            payload: Arc::from(payload),
            fragment_size,
        }
    }

    /// Number of DATA_FRAG fragments needed (1 for an unfragmented sample).
    pub fn fragment_count(&self) -> u32 {
        if self.fragment_size == 0 || self.payload.len() <= self.fragment_size {
            return 1;
        }
        let count = self.payload.len().div_ceil(self.fragment_size);
        u32::try_from(count).unwrap_or(u32::MAX)
    }
}

/// History policy
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum History {
    /// Keep last N samples (bounded queue, drops oldest)
    KeepLast(u32),
    /// Keep all samples within `max_samples`; inserts fail once full.
    KeepAll,
}

impl Default for History {
    fn default() -> Self {
        Self::KeepLast(10)
    }
}

/// Bounded writer history cache.
pub struct HistoryCache {
    ring: Mutex<VecDeque<CacheChange>>,
    next_seq: Mutex<SequenceNumber>,
    quota_bytes: AtomicUsize,
    max_samples: usize,
    history_kind: History,
    fragment_size: usize,
}

impl HistoryCache {
    /// Create a cache with the given history policy.
    ///
    /// For KEEP_LAST the depth bounds the ring; for KEEP_ALL `max_samples` does.
    /// `fragment_size` of 0 disables fragmentation.
    pub fn new(history_kind: History, max_samples: usize, fragment_size: usize) -> Self {
        let capacity = match history_kind {
            History::KeepLast(depth) => (depth as usize).min(max_samples),
            History::KeepAll => max_samples,
        };
        Self {
            ring: Mutex::new(VecDeque::with_capacity(capacity.min(4096))),
            next_seq: Mutex::new(1),
            quota_bytes: AtomicUsize::new(0),
            max_samples: capacity,
            history_kind,
            fragment_size,
        }
    }

    fn ring(&self) -> std::sync::MutexGuard<'_, VecDeque<CacheChange>> {
        match self.ring.lock() {
            Ok(lock) => lock,
            Err(e) => {
                log::debug!("[history] Lock poisoned, recovering");
                e.into_inner()
            }
        }
    }

    /// Store a new sample under the next sequence number.
    ///
    /// Returns the stored change and the sequence numbers evicted to make room
    /// (KEEP_LAST only). The writer forwards evictions to its reader proxies via
    /// `change_has_been_removed`.
    pub fn add(&self, payload: &[u8]) -> Result<(CacheChange, Vec<SequenceNumber>)> {
        let mut ring = self.ring();

        if matches!(self.history_kind, History::KeepAll) && ring.len() >= self.max_samples {
            return Err(Error::ResourceLimitExceeded(format!(
                "history full ({} samples)",
                self.max_samples
            )));
        }

        let seq = {
            let mut next = match self.next_seq.lock() {
                Ok(lock) => lock,
                Err(e) => e.into_inner(),
            };
            let seq = *next;
            *next += 1;
            seq
        };

        let change = CacheChange::new(seq, payload, self.fragment_size);
        ring.push_back(change.clone());
        self.quota_bytes.fetch_add(payload.len(), Ordering::Relaxed);

        let mut evicted = Vec::new();
        while ring.len() > self.max_samples {
            if let Some(old) = ring.pop_front() {
                self.quota_bytes.fetch_sub(old.payload.len(), Ordering::Relaxed);
                evicted.push(old.sequence_number);
            }
        }
        if !evicted.is_empty() {
            log::debug!("[history] Evicted {:?} (KEEP_LAST)", evicted);
        }

        Ok((change, evicted))
    }

    /// Get a sample by sequence number.
    pub fn get(&self, seq: SequenceNumber) -> Option<CacheChange> {
        let ring = self.ring();
        let front = ring.front()?.sequence_number;
        // Sequence numbers are contiguous apart from explicit removals.
        let guess = usize::try_from(seq.checked_sub(front)?).ok()?;
        if let Some(entry) = ring.get(guess) {
            if entry.sequence_number == seq {
                return Some(entry.clone());
            }
        }
        ring.binary_search_by_key(&seq, |c| c.sequence_number)
            .ok()
            .map(|idx| ring[idx].clone())
    }

    /// Remove every sample with `sequence_number <= acked_seq`.
    ///
    /// Returns the removed sequence numbers.
    pub fn remove_acknowledged(&self, acked_seq: SequenceNumber) -> Vec<SequenceNumber> {
        let mut ring = self.ring();
        let mut removed = Vec::new();
        while ring
            .front()
            .is_some_and(|c| c.sequence_number <= acked_seq)
        {
            if let Some(old) = ring.pop_front() {
                self.quota_bytes.fetch_sub(old.payload.len(), Ordering::Relaxed);
                removed.push(old.sequence_number);
            }
        }
        removed
    }

    /// Remove one sample. Returns true if it was present.
    pub fn remove(&self, seq: SequenceNumber) -> bool {
        let mut ring = self.ring();
        match ring.binary_search_by_key(&seq, |c| c.sequence_number) {
            Ok(idx) => {
                if let Some(old) = ring.remove(idx) {
                    self.quota_bytes.fetch_sub(old.payload.len(), Ordering::Relaxed);
                }
                true
            }
            Err(_) => false,
        }
    }

    /// Oldest cached sequence number.
    pub fn oldest_seq(&self) -> Option<SequenceNumber> {
        self.ring().front().map(|c| c.sequence_number)
    }

    /// Newest cached sequence number.
    pub fn newest_seq(&self) -> Option<SequenceNumber> {
        self.ring().back().map(|c| c.sequence_number)
    }

    /// Get number of cached samples.
    pub fn len(&self) -> usize {
        self.ring().len()
    }

    /// Check if cache is empty.
    pub fn is_empty(&self) -> bool {
        self.ring().is_empty()
    }

    /// Get current quota usage in bytes.
    pub fn quota_bytes(&self) -> usize {
        self.quota_bytes.load(Ordering::Relaxed)
    }

    /// Expose configured history policy.
    #[must_use]
    pub fn history_kind(&self) -> History {
        self.history_kind
    }
}

impl WriterHistory for HistoryCache {
    fn lookup(&self, seq: SequenceNumber) -> Option<CacheChange> {
        self.get(seq)
    }

    fn minimum_sequence_number(&self) -> SequenceNumber {
        self.oldest_seq().unwrap_or(SEQUENCE_NUMBER_UNKNOWN)
    }

    fn maximum_sequence_number(&self) -> SequenceNumber {
        self.newest_seq().unwrap_or(SEQUENCE_NUMBER_UNKNOWN)
    }
}
