// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! ReaderProxy Hot Path Benchmark
//!
//! Measures the per-sample bookkeeping cost a reliable writer pays for each
//! matched reader:
//! - add_change + send + cumulative ACKNACK (steady state)
//! - whole-sample NACK handling over a deep change table
//! - fan-out through the matched readers registry

#![allow(clippy::uninlined_format_args)]

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use hdds_reliability::{
    ChangeForReader, ChangeForReaderStatus, History, HistoryCache, MatchedReadersRegistry,
    ReaderAttributes, ReaderProxy, ReliabilityKind, SequenceNumberSet, WakeNotifier,
    WriterHistory, WriterTimes, GUID,
};
use std::sync::Arc;
use std::time::Duration;

fn bench_times() -> WriterTimes {
    WriterTimes::default()
        .with_nack_response_delay(Duration::from_secs(1))
        .with_nack_suppression_duration(Duration::from_secs(1))
}

fn make_proxy() -> ReaderProxy {
    let history: Arc<dyn WriterHistory> = Arc::new(HistoryCache::new(History::KeepAll, 1, 0));
    let proxy = ReaderProxy::new(&bench_times(), history, WakeNotifier::shared())
        .expect("proxy creation");
    proxy.start(ReaderAttributes::new(
        GUID::new([1; 12], [0, 0, 1, 7]),
        ReliabilityKind::Reliable,
    ));
    proxy
}

/// Benchmark: add, send and acknowledge one change at a time
fn bench_add_send_ack(c: &mut Criterion) {
    let proxy = make_proxy();
    let mut seq = 0u64;
    c.bench_function("reader_proxy_add_send_ack", |b| {
        b.iter(|| {
            seq += 1;
            proxy.add_change(ChangeForReader::new(seq, 1), false);
            proxy.set_change_to_status(seq, ChangeForReaderStatus::Unacknowledged, false);
            proxy.acked_changes_set(black_box(seq + 1));
        });
    });
}

/// Benchmark: NACK of 32 sequence numbers against a table of N changes
fn bench_nack_deep_table(c: &mut Criterion) {
    let mut group = c.benchmark_group("reader_proxy_nack");
    for depth in [64u64, 1024, 16384] {
        let proxy = make_proxy();
        for seq in 1..=depth {
            proxy.add_change(
                ChangeForReader::new(seq, 1).with_status(ChangeForReaderStatus::Unacknowledged),
                false,
            );
        }
        let base = depth / 2;
        let mut set = SequenceNumberSet::empty(base);
        for offset in 0..32 {
            set.insert(base + offset * 2);
        }

        group.bench_with_input(BenchmarkId::from_parameter(depth), &set, |b, set| {
            b.iter(|| {
                proxy.requested_changes_set(black_box(set));
                proxy.perform_acknack_response();
                proxy.perform_nack_suppression();
                for seq in set.iter() {
                    proxy.set_change_to_status(seq, ChangeForReaderStatus::Unacknowledged, false);
                }
            });
        });
    }
    group.finish();
}

/// Benchmark: fan-out of one change to 16 readers, then acknowledgment by all
fn bench_registry_fan_out(c: &mut Criterion) {
    let history = Arc::new(HistoryCache::new(History::KeepLast(1), 1, 0));
    let registry = MatchedReadersRegistry::new(
        bench_times(),
        Arc::clone(&history) as Arc<dyn WriterHistory>,
        WakeNotifier::shared(),
    )
    .expect("registry creation");
    let readers: Vec<GUID> = (0..16u8).map(|i| GUID::new([i; 12], [0, 0, 1, 7])).collect();
    for guid in &readers {
        registry
            .match_reader(ReaderAttributes::new(*guid, ReliabilityKind::Reliable))
            .expect("match");
    }

    let mut count = 0u32;
    c.bench_function("registry_fan_out_16", |b| {
        b.iter(|| {
            let (change, _) = history.add(b"bench").expect("history add");
            registry.add_change_for_all(&change);
            count += 1;
            let ack = SequenceNumberSet::empty(change.sequence_number + 1);
            for guid in &readers {
                let _ = registry.on_acknack(guid, count, &ack);
            }
            black_box(registry.is_acked_by_all(change.sequence_number));
        });
    });
}

criterion_group!(
    benches,
    bench_add_send_ack,
    bench_nack_deep_table,
    bench_registry_fan_out
);
criterion_main!(benches);
