// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

#![allow(clippy::uninlined_format_args)] // Test/bench code readability over pedantic
#![allow(clippy::cast_possible_truncation)] // Test parameters
#![allow(clippy::missing_panics_doc)] // Tests/examples panic on failure
#![allow(clippy::redundant_closure_for_method_calls)] // Test code clarity

use std::sync::Arc;
use std::time::Duration;

use hdds_reliability::{
    ChangeForReader, ChangeForReaderStatus, FragmentNumberSet, History, HistoryCache,
    NackFragOutcome, ReaderAttributes, ReaderProxy, ReliabilityKind, SequenceNumber,
    SequenceNumberSet, WakeNotifier, WriterHistory, WriterTimes, GUID,
};

use hdds_reliability::ChangeForReaderStatus::*;

fn reader_guid() -> GUID {
    GUID::new([0x01, 0x0f, 0xac, 0x10, 0, 0, 0, 0, 0, 0, 0, 0x01], [0, 0, 0x01, 0x07])
}

/// Timings long enough that no timer fires during a test.
fn quiet_times() -> WriterTimes {
    WriterTimes::default()
        .with_nack_response_delay(Duration::from_secs(2))
        .with_nack_suppression_duration(Duration::from_secs(2))
}

fn proxy_with_history(history: Arc<HistoryCache>) -> ReaderProxy {
    let proxy = ReaderProxy::new(
        &quiet_times(),
        history as Arc<dyn WriterHistory>,
        WakeNotifier::shared(),
    )
    .expect("proxy");
    proxy.start(ReaderAttributes::new(reader_guid(), ReliabilityKind::Reliable));
    proxy
}

fn reliable_proxy() -> ReaderProxy {
    proxy_with_history(Arc::new(HistoryCache::new(History::KeepAll, 1024, 0)))
}

fn seqs(proxy: &ReaderProxy) -> Vec<SequenceNumber> {
    proxy
        .changes_snapshot()
        .iter()
        .map(|c| c.sequence_number())
        .collect()
}

fn statuses(proxy: &ReaderProxy) -> Vec<(SequenceNumber, ChangeForReaderStatus)> {
    proxy
        .changes_snapshot()
        .iter()
        .map(|c| (c.sequence_number(), c.status()))
        .collect()
}

fn assert_table_invariants(proxy: &ReaderProxy) {
    let lwm = proxy.low_water_mark();
    let seqs = seqs(proxy);
    assert!(
        seqs.windows(2).all(|w| w[0] < w[1]),
        "table not strictly ascending: {:?}",
        seqs
    );
    assert!(
        seqs.iter().all(|&s| s > lwm),
        "entry at or below low water mark {}: {:?}",
        lwm,
        seqs
    );
}

// ============================================================================
// Scenarios
// ============================================================================

#[test]
fn scenario_a_ack_prefix() {
    let proxy = reliable_proxy();
    proxy.add_change(ChangeForReader::new(1, 1), false);
    proxy.add_change(ChangeForReader::new(2, 1), false);
    assert!(proxy.has_changes());
    assert!(!proxy.change_is_acked(1));

    proxy.acked_changes_set(2);
    assert_eq!(seqs(&proxy), vec![2]);
    assert_eq!(proxy.low_water_mark(), 1);
    assert!(proxy.change_is_acked(1));
    assert!(!proxy.change_is_acked(2));
}

#[test]
fn scenario_b_nack_then_response() {
    let proxy = reliable_proxy();
    proxy.add_change(ChangeForReader::new(3, 1).with_status(Unacknowledged), false);

    let nack = SequenceNumberSet::from_sequences(3, &[3]).expect("set");
    assert!(proxy.requested_changes_set(&nack));
    assert_eq!(proxy.change_status(3), Some(Requested));

    assert!(proxy.perform_acknack_response());
    assert_eq!(proxy.change_status(3), Some(Unsent));
}

#[test]
fn scenario_c_suppression_expiry() {
    let proxy = reliable_proxy();
    proxy.add_change(ChangeForReader::new(4, 1).with_status(Underway), false);

    assert!(proxy.perform_nack_suppression());
    assert_eq!(proxy.change_status(4), Some(Unacknowledged));
    assert!(!proxy.perform_nack_suppression());
    assert_eq!(proxy.change_status(4), Some(Unacknowledged));
}

#[test]
fn scenario_d_fragment_completion() {
    let proxy = reliable_proxy();
    proxy.add_change(ChangeForReader::new(7, 3), false);

    assert_eq!(proxy.mark_fragment_as_sent_for_change(7, 1), Some(false));
    assert_eq!(proxy.mark_fragment_as_sent_for_change(7, 2), Some(false));
    assert_eq!(proxy.mark_fragment_as_sent_for_change(7, 3), Some(true));
}

#[test]
fn scenario_e_regression_resurrects_from_history() {
    let history = Arc::new(HistoryCache::new(History::KeepAll, 1024, 0));
    for _ in 0..10 {
        history.add(b"sample").expect("history add");
    }
    let proxy = proxy_with_history(Arc::clone(&history));

    // Everything up to 10 acknowledged, table empty.
    for seq in 1..=10 {
        proxy.add_change(ChangeForReader::new(seq, 1), false);
    }
    proxy.acked_changes_set(11);
    assert_eq!(proxy.low_water_mark(), 10);
    assert!(!proxy.has_changes());

    proxy.acked_changes_set(6);
    assert_eq!(
        statuses(&proxy),
        (6..=10).map(|s| (s, Unacknowledged)).collect::<Vec<_>>()
    );
    assert_eq!(proxy.low_water_mark(), 5);
    assert_table_invariants(&proxy);
}

#[test]
fn regression_skips_evicted_samples() {
    let history = Arc::new(HistoryCache::new(History::KeepAll, 1024, 0));
    for _ in 0..10 {
        history.add(b"sample").expect("history add");
    }
    assert!(history.remove(8));
    let proxy = proxy_with_history(Arc::clone(&history));
    for seq in 1..=10 {
        proxy.add_change(ChangeForReader::new(seq, 1), false);
    }
    proxy.acked_changes_set(11);

    proxy.acked_changes_set(6);
    assert_eq!(seqs(&proxy), vec![6, 7, 9, 10]);
    assert_eq!(proxy.low_water_mark(), 5);
}

#[test]
fn unfiltered_hole_counts_as_acked() {
    let proxy = reliable_proxy();
    proxy.add_change(ChangeForReader::new(1, 1).with_status(Unacknowledged), false);
    proxy.add_change(ChangeForReader::new(2, 1).irrelevant(), false);
    proxy.add_change(ChangeForReader::new(3, 1).with_status(Unacknowledged), false);

    assert!(proxy.change_is_acked(2));
    proxy.change_has_been_removed(2);
    assert!(proxy.change_is_acked(2));
    assert!(!proxy.change_is_acked(3));
    assert!(!proxy.change_is_acked(4));

    // Acknowledging 1 then the hole at 2 walks the mark up to 2.
    assert!(proxy.set_change_to_status(1, Acknowledged, false));
    assert!(proxy.set_change_to_status(2, Acknowledged, false));
    assert_eq!(proxy.low_water_mark(), 2);
    assert_eq!(seqs(&proxy), vec![3]);
}

// ============================================================================
// Properties
// ============================================================================

#[test]
fn property_ordering_under_random_operations() {
    let mut rng = fastrand::Rng::with_seed(0x5eed_0001);
    let history = Arc::new(HistoryCache::new(History::KeepAll, 4096, 0));
    let proxy = proxy_with_history(Arc::clone(&history));
    let mut next: SequenceNumber = 1;

    for _ in 0..2000 {
        match rng.u8(0..6) {
            0 | 1 => {
                let floor = proxy.low_water_mark() + 1;
                next = next.max(floor) + rng.u64(0..3);
                proxy.add_change(ChangeForReader::new(next, rng.u32(1..4)), rng.bool());
                next += 1;
            }
            2 => {
                let hi = next + 2;
                proxy.acked_changes_set(rng.u64(1..hi));
            }
            3 => {
                let base = rng.u64(1..next + 1);
                let mut set = SequenceNumberSet::empty(base);
                for _ in 0..rng.usize(0..5) {
                    set.insert(base + rng.u64(0..16));
                }
                proxy.requested_changes_set(&set);
            }
            4 => {
                let status = match rng.u8(0..4) {
                    0 => Unacknowledged,
                    1 => Underway,
                    2 => Acknowledged,
                    _ => Unsent,
                };
                proxy.set_change_to_status(rng.u64(1..next + 1), status, false);
            }
            _ => proxy.change_has_been_removed(rng.u64(1..next + 1)),
        }
        assert_table_invariants(&proxy);
    }
}

#[test]
fn property_ack_monotonic_on_normal_path() {
    let mut rng = fastrand::Rng::with_seed(0x5eed_0002);
    let proxy = reliable_proxy();
    for seq in 1..=500 {
        proxy.add_change(ChangeForReader::new(seq, 1).with_status(Unacknowledged), false);
    }

    let mut ack = 1;
    while ack <= 500 {
        ack += rng.u64(1..20);
        let before = proxy.low_water_mark();
        proxy.acked_changes_set(ack);
        assert!(proxy.low_water_mark() >= before);
        assert_eq!(proxy.low_water_mark(), ack - 1);
        for k in 1..ack {
            assert!(proxy.change_is_acked(k), "{} not acked after ack {}", k, ack);
        }
    }
}

#[test]
fn property_nack_idempotent() {
    let proxy = reliable_proxy();
    for seq in 1..=8 {
        let status = if seq % 2 == 0 { Unacknowledged } else { Underway };
        proxy.add_change(ChangeForReader::new(seq, 2).with_status(status), false);
    }
    let set = SequenceNumberSet::from_sequences(1, &[2, 3, 4, 8, 40]).expect("set");

    assert!(proxy.requested_changes_set(&set));
    let once = proxy.changes_snapshot();
    assert!(!proxy.requested_changes_set(&set));
    assert_eq!(proxy.changes_snapshot(), once);
}

#[test]
fn property_last_fragment_reported_once() {
    let mut rng = fastrand::Rng::with_seed(0x5eed_0004);
    let proxy = reliable_proxy();
    for seq in 1..=20u64 {
        let count = rng.u32(1..40);
        proxy.add_change(ChangeForReader::new(seq, count), false);

        let mut order: Vec<u32> = (1..=count).collect();
        rng.shuffle(&mut order);
        let reports: Vec<bool> = order
            .iter()
            .map(|&f| {
                proxy
                    .mark_fragment_as_sent_for_change(seq, f)
                    .expect("tracked")
            })
            .collect();
        assert_eq!(reports.iter().filter(|&&last| last).count(), 1);
        assert_eq!(reports.last(), Some(&true));
    }
}

#[test]
fn property_bulk_transitions_are_scoped() {
    let mut rng = fastrand::Rng::with_seed(0x5eed_0005);
    let all = [Unsent, Unacknowledged, Requested, Underway];
    let proxy = reliable_proxy();
    for seq in 1..=200 {
        let status = all[rng.usize(..all.len())];
        proxy.add_change(ChangeForReader::new(seq, 1).with_status(status), false);
    }

    let before = statuses(&proxy);
    proxy.perform_nack_suppression();
    for ((seq, old), (_, new)) in before.iter().zip(statuses(&proxy)) {
        match old {
            Underway => assert_eq!(new, Unacknowledged, "seq {}", seq),
            other => assert_eq!(new, *other, "seq {}", seq),
        }
    }

    let before = statuses(&proxy);
    proxy.perform_acknack_response();
    for ((seq, old), (_, new)) in before.iter().zip(statuses(&proxy)) {
        match old {
            Requested => assert_eq!(new, Unsent, "seq {}", seq),
            other => assert_eq!(new, *other, "seq {}", seq),
        }
    }
}

#[test]
fn property_stale_nack_frag_rejected() {
    let proxy = reliable_proxy();
    proxy.add_change(ChangeForReader::new(1, 8).with_status(Unacknowledged), false);
    proxy.add_change(ChangeForReader::new(2, 8).with_status(Underway), false);

    let frags = FragmentNumberSet::from_fragments(1, &[1, 2]).expect("frags");
    assert_eq!(
        proxy.process_nack_frag(reader_guid(), 5, 1, &frags),
        NackFragOutcome::Applied
    );

    let before = proxy.changes_snapshot();
    let other = FragmentNumberSet::from_fragments(5, &[5, 6, 7]).expect("frags");
    for count in [5, 3] {
        let outcome = proxy.process_nack_frag(reader_guid(), count, 2, &other);
        assert!(!outcome.is_newly_processed());
    }
    assert_eq!(proxy.changes_snapshot(), before);
    assert_eq!(proxy.change_status(2), Some(Underway));
}
