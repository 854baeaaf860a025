// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Per-(sample, reader) delivery record.
//!
//! ## Status Machine (RTPS v2.5 Sec.8.4.7.4)
//!
//! ```text
//!            send                 NACK               nack_response_delay
//!  UNSENT ----------> UNACKNOWLEDGED ------> REQUESTED ------------------> UNSENT
//!                         ^                                                  |
//!                         |   nack_suppression_duration        resend        |
//!                         +----------------------------- UNDERWAY <----------+
//!
//!  any --(ACKNACK base > seq)--> ACKNOWLEDGED (record removed)
//! ```

use std::collections::BTreeSet;

use super::history_cache::CacheChange;
use super::seq::{FragmentNumber, SequenceNumber};

/// Delivery status of one change for one reader.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum ChangeForReaderStatus {
    /// Queued, never transmitted to this reader.
    #[default]
    Unsent,
    /// Transmitted, no ACKNACK about it yet.
    Unacknowledged,
    /// Reader asked for a retransmission.
    Requested,
    /// Being retransmitted, inside the NACK suppression window.
    Underway,
    /// Confirmed received.
    Acknowledged,
}

impl ChangeForReaderStatus {
    /// Statuses for which unsent fragments are tracked.
    pub fn tracks_fragments(self) -> bool {
        matches!(self, Self::Unsent | Self::Requested)
    }
}

/// One outstanding change for a given reader.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChangeForReader {
    sequence_number: SequenceNumber,
    status: ChangeForReaderStatus,
    is_relevant: bool,
    fragment_count: u32,
    unsent_fragments: BTreeSet<FragmentNumber>,
}

impl ChangeForReader {
    /// New relevant, unsent change with `fragment_count` fragments.
    ///
    /// A `fragment_count` of 0 or 1 describes an unfragmented sample, which is
    /// tracked as a single implicit fragment.
    pub fn new(sequence_number: SequenceNumber, fragment_count: u32) -> Self {
        let fragment_count = fragment_count.max(1);
        Self {
            sequence_number,
            status: ChangeForReaderStatus::Unsent,
            is_relevant: true,
            fragment_count,
            unsent_fragments: (1..=fragment_count).collect(),
        }
    }

    /// New unsent change describing a cached sample.
    pub fn from_cache_change(change: &CacheChange) -> Self {
        Self::new(change.sequence_number, change.fragment_count())
    }

    /// Set the initial status (fluent builder style).
    #[must_use]
    pub fn with_status(mut self, status: ChangeForReaderStatus) -> Self {
        self.set_status(status);
        self
    }

    /// Mark as filtered out for this reader (fluent builder style).
    #[must_use]
    pub fn irrelevant(mut self) -> Self {
        self.is_relevant = false;
        self
    }

    pub fn sequence_number(&self) -> SequenceNumber {
        self.sequence_number
    }

    pub fn status(&self) -> ChangeForReaderStatus {
        self.status
    }

    /// False if content filtering excluded this change for the reader.
    pub fn is_relevant(&self) -> bool {
        self.is_relevant
    }

    /// Number of fragments of the underlying sample (1 if unfragmented).
    pub fn fragment_count(&self) -> u32 {
        self.fragment_count
    }

    /// Fragments still to be transmitted, ascending.
    pub fn unsent_fragments(&self) -> &BTreeSet<FragmentNumber> {
        &self.unsent_fragments
    }

    /// Update the status.
    ///
    /// Leaving the UNSENT/REQUESTED states means the change has been fully
    /// handed to the transport, so the unsent fragment set is emptied.
    pub fn set_status(&mut self, status: ChangeForReaderStatus) {
        self.status = status;
        if !status.tracks_fragments() {
            self.unsent_fragments.clear();
        }
    }

    /// Every fragment is to be sent again (whole-sample NACK).
    pub fn mark_all_fragments_as_unsent(&mut self) {
        self.unsent_fragments = (1..=self.fragment_count).collect();
    }

    /// Mark the given fragments as to be sent again. Out-of-range numbers are ignored.
    pub fn mark_fragments_as_unsent<I>(&mut self, fragments: I)
    where
        I: IntoIterator<Item = FragmentNumber>,
    {
        let count = self.fragment_count;
        self.unsent_fragments
            .extend(fragments.into_iter().filter(|&f| f >= 1 && f <= count));
    }

    /// Mark one fragment as transmitted. Returns true if no unsent fragment remains.
    pub fn mark_fragment_as_sent(&mut self, fragment: FragmentNumber) -> bool {
        self.unsent_fragments.remove(&fragment);
        self.unsent_fragments.is_empty()
    }

    /// Delivery is complete for this reader (filtered out or acknowledged).
    pub fn is_settled(&self) -> bool {
        !self.is_relevant || self.status == ChangeForReaderStatus::Acknowledged
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_change_has_all_fragments_unsent() {
        let change = ChangeForReader::new(7, 3);
        assert_eq!(change.status(), ChangeForReaderStatus::Unsent);
        assert!(change.is_relevant());
        assert_eq!(
            change.unsent_fragments().iter().copied().collect::<Vec<_>>(),
            vec![1, 2, 3]
        );
    }

    #[test]
    fn test_unfragmented_has_single_implicit_fragment() {
        let mut change = ChangeForReader::new(1, 0);
        assert_eq!(change.fragment_count(), 1);
        assert!(change.mark_fragment_as_sent(1));
    }

    #[test]
    fn test_leaving_send_states_clears_fragments() {
        let mut change = ChangeForReader::new(2, 4);
        change.set_status(ChangeForReaderStatus::Requested);
        assert_eq!(change.unsent_fragments().len(), 4);
        change.set_status(ChangeForReaderStatus::Underway);
        assert!(change.unsent_fragments().is_empty());
    }

    #[test]
    fn test_mark_fragments_as_unsent_ignores_out_of_range() {
        let mut change = ChangeForReader::new(3, 2).with_status(ChangeForReaderStatus::Unacknowledged);
        change.mark_fragments_as_unsent([0, 2, 9]);
        assert_eq!(
            change.unsent_fragments().iter().copied().collect::<Vec<_>>(),
            vec![2]
        );
        change.mark_all_fragments_as_unsent();
        assert_eq!(change.unsent_fragments().len(), 2);
    }

    #[test]
    fn test_settled() {
        assert!(ChangeForReader::new(1, 1).irrelevant().is_settled());
        assert!(ChangeForReader::new(1, 1)
            .with_status(ChangeForReaderStatus::Acknowledged)
            .is_settled());
        assert!(!ChangeForReader::new(1, 1).is_settled());
    }
}
