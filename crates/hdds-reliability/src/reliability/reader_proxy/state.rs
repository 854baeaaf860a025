// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Lock-free core of the reader proxy: the ordered change table and its
//! low-water mark. Everything here runs under the proxy lock.
//!
//! # Invariants
//!
//! - `changes` is strictly ascending by sequence number.
//! - every stored sequence number is `> low_water_mark`.
//! - `low_water_mark` only decreases through an acknowledgment regression.

use std::collections::VecDeque;
use std::net::SocketAddr;

use super::attributes::{ReaderAttributes, ReliabilityKind};
use crate::reliability::change::{ChangeForReader, ChangeForReaderStatus};
use crate::reliability::history_cache::WriterHistory;
use crate::reliability::seq::{
    FragmentNumber, FragmentNumberSet, SequenceNumber, SequenceNumberSet, SEQUENCE_NUMBER_UNKNOWN,
};

/// Effect of one `acked_changes_set` call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct AckEffect {
    pub removed: usize,
    pub resurrected: usize,
}

#[derive(Debug, Default)]
pub(crate) struct ProxyState {
    pub is_active: bool,
    pub attributes: ReaderAttributes,
    pub remote_locators: Vec<SocketAddr>,
    pub timers_enabled: bool,
    pub changes: VecDeque<ChangeForReader>,
    pub low_water_mark: SequenceNumber,
    pub last_acknack_count: u32,
    pub last_nackfrag_count: u32,
}

impl ProxyState {
    pub fn is_reliable(&self) -> bool {
        self.attributes.reliability == ReliabilityKind::Reliable
    }

    /// Back to the freshly constructed, inactive state.
    pub fn reset(&mut self) {
        self.is_active = false;
        self.attributes = ReaderAttributes::default();
        self.remote_locators.clear();
        self.timers_enabled = false;
        self.changes.clear();
        self.low_water_mark = SEQUENCE_NUMBER_UNKNOWN;
        self.last_acknack_count = 0;
        self.last_nackfrag_count = 0;
    }

    /// Returns true when an active reliable reader was rematched as best-effort.
    ///
    /// Repair state is folded back in that case: REQUESTED becomes UNSENT and
    /// UNDERWAY becomes UNACKNOWLEDGED.
    pub fn activate(&mut self, attributes: ReaderAttributes) -> bool {
        let downgraded = self.is_active
            && self.is_reliable()
            && attributes.reliability == ReliabilityKind::BestEffort;
        self.is_active = true;
        self.remote_locators = attributes.remote_locators();
        self.timers_enabled = attributes.reliability == ReliabilityKind::Reliable;
        self.attributes = attributes;
        if downgraded {
            self.convert_status_on_all_changes(
                ChangeForReaderStatus::Requested,
                ChangeForReaderStatus::Unsent,
            );
            self.convert_status_on_all_changes(
                ChangeForReaderStatus::Underway,
                ChangeForReaderStatus::Unacknowledged,
            );
        }
        downgraded
    }

    pub fn find_index(&self, seq: SequenceNumber) -> Option<usize> {
        self.changes
            .binary_search_by_key(&seq, ChangeForReader::sequence_number)
            .ok()
    }

    pub fn find_change(&self, seq: SequenceNumber) -> Option<&ChangeForReader> {
        self.find_index(seq).map(|idx| &self.changes[idx])
    }

    /// Highest sequence number this proxy has ever been told about.
    pub fn highest_known(&self) -> SequenceNumber {
        self.changes
            .back()
            .map_or(self.low_water_mark, |c| c.sequence_number().max(self.low_water_mark))
    }

    /// Append a change. Returns true if it was stored (false when absorbed
    /// into the low-water mark).
    ///
    /// # Panics
    ///
    /// If the sequence number does not strictly follow both the low-water mark
    /// and the last stored change.
    pub fn add_change(&mut self, change: ChangeForReader) -> bool {
        let seq = change.sequence_number();
        assert!(
            seq > self.low_water_mark,
            "add_change: seq {} <= low water mark {}",
            seq,
            self.low_water_mark
        );
        if let Some(last) = self.changes.back() {
            assert!(
                seq > last.sequence_number(),
                "add_change: seq {} not after last change {}",
                seq,
                last.sequence_number()
            );
        }

        // Best-effort sends are settled immediately.
        if self.changes.is_empty() && change.status() == ChangeForReaderStatus::Acknowledged {
            self.low_water_mark = seq;
            return false;
        }

        self.changes.push_back(change);
        true
    }

    /// UNACKNOWLEDGED -> REQUESTED for every tracked sequence in the set.
    /// Returns the number of changes moved.
    pub fn requested_changes_set(&mut self, set: &SequenceNumberSet) -> usize {
        let mut moved = 0;
        for seq in set.iter() {
            if let Some(idx) = self.find_index(seq) {
                let change = &mut self.changes[idx];
                if change.status() == ChangeForReaderStatus::Unacknowledged {
                    change.set_status(ChangeForReaderStatus::Requested);
                    change.mark_all_fragments_as_unsent();
                    moved += 1;
                }
            }
        }
        moved
    }

    /// Mark fragments unsent and demote to REQUESTED unless still UNSENT.
    /// Returns false if the change is not tracked.
    pub fn requested_fragment_set(
        &mut self,
        seq: SequenceNumber,
        fragments: &FragmentNumberSet,
    ) -> bool {
        let Some(idx) = self.find_index(seq) else {
            return false;
        };
        let change = &mut self.changes[idx];
        if change.status() != ChangeForReaderStatus::Unsent {
            change.set_status(ChangeForReaderStatus::Requested);
        }
        change.mark_fragments_as_unsent(fragments.iter());
        true
    }

    /// Returns true if the table or the low-water mark changed.
    pub fn set_change_to_status(
        &mut self,
        seq: SequenceNumber,
        status: ChangeForReaderStatus,
    ) -> bool {
        if seq <= self.low_water_mark {
            return false;
        }

        if status == ChangeForReaderStatus::Acknowledged && seq == self.low_water_mark + 1 {
            // The front change, or a hole left by a removed irrelevant change.
            if self.changes.front().map(ChangeForReader::sequence_number) == Some(seq) {
                self.changes.pop_front();
            }
            self.low_water_mark = seq;
            self.absorb_acknowledged_front();
            return true;
        }

        match self.find_index(seq) {
            Some(idx) if self.changes[idx].status() != status => {
                self.changes[idx].set_status(status);
                true
            }
            _ => false,
        }
    }

    /// Drop contiguous ACKNOWLEDGED changes sitting right above the low-water mark.
    fn absorb_acknowledged_front(&mut self) {
        while let Some(front) = self.changes.front() {
            if front.sequence_number() != self.low_water_mark + 1
                || front.status() != ChangeForReaderStatus::Acknowledged
            {
                break;
            }
            self.low_water_mark = front.sequence_number();
            self.changes.pop_front();
        }
    }

    /// `Some(was_last_fragment)` if the change is tracked.
    pub fn mark_fragment_as_sent(
        &mut self,
        seq: SequenceNumber,
        fragment: FragmentNumber,
    ) -> Option<bool> {
        if seq <= self.low_water_mark {
            return None;
        }
        let idx = self.find_index(seq)?;
        Some(self.changes[idx].mark_fragment_as_sent(fragment))
    }

    /// Apply an ACKNACK base: everything below `seq` is acknowledged.
    pub fn acked_changes_set(
        &mut self,
        seq: SequenceNumber,
        history: &dyn WriterHistory,
    ) -> AckEffect {
        if seq > self.low_water_mark {
            let end = self.changes.partition_point(|c| c.sequence_number() < seq);
            self.changes.drain(..end);
            self.low_water_mark = seq - 1;
            return AckEffect {
                removed: end,
                resurrected: 0,
            };
        }

        // Regression: the reader lost state we considered acknowledged.
        let start = seq.max(history.minimum_sequence_number()).max(1);
        // Nothing above the newest cached sample can come back.
        let end = self.low_water_mark.min(history.maximum_sequence_number());
        let mut resurrected = 0;
        let mut current = start;
        while current <= end {
            if self.find_index(current).is_none() {
                if let Some(cache_change) = history.lookup(current) {
                    self.changes.push_back(
                        ChangeForReader::from_cache_change(&cache_change)
                            .with_status(ChangeForReaderStatus::Unacknowledged),
                    );
                    resurrected += 1;
                }
            }
            current += 1;
        }

        if resurrected > 0 {
            self.changes
                .make_contiguous()
                .sort_by_key(ChangeForReader::sequence_number);
        }

        self.low_water_mark = start.saturating_sub(1).min(self.low_water_mark);
        AckEffect {
            removed: 0,
            resurrected,
        }
    }

    /// Move every change in `previous` to `next`. Returns true if any moved.
    pub fn convert_status_on_all_changes(
        &mut self,
        previous: ChangeForReaderStatus,
        next: ChangeForReaderStatus,
    ) -> bool {
        debug_assert_ne!(previous, next);
        let mut modified = false;
        for change in self.changes.iter_mut().filter(|c| c.status() == previous) {
            change.set_status(next);
            modified = true;
        }
        modified
    }

    /// Forget a change evicted from the writer history.
    pub fn change_has_been_removed(&mut self, seq: SequenceNumber) -> bool {
        match self.changes.front() {
            Some(front) if seq >= front.sequence_number() => {}
            _ => return false,
        }
        match self.find_index(seq) {
            Some(idx) => {
                self.changes.remove(idx);
                true
            }
            None => false,
        }
    }

    pub fn has_unacknowledged(&self) -> bool {
        self.changes
            .iter()
            .any(|c| c.is_relevant() && c.status() == ChangeForReaderStatus::Unacknowledged)
    }

    pub fn change_is_acked(&self, seq: SequenceNumber) -> bool {
        if seq <= self.low_water_mark {
            return true;
        }
        let Some(last) = self.changes.back() else {
            return true;
        };
        if seq > last.sequence_number() {
            // Not yet handed to this proxy.
            return false;
        }
        // A hole means the change was removed, which only happens once settled.
        self.find_change(seq).map_or(true, ChangeForReader::is_settled)
    }

    pub fn first_with_status(&self, status: ChangeForReaderStatus) -> Option<SequenceNumber> {
        self.changes
            .iter()
            .find(|c| c.is_relevant() && c.status() == status)
            .map(ChangeForReader::sequence_number)
    }
}
