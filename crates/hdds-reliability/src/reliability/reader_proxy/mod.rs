// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! ReaderProxy - Per-reader delivery state for a StatefulWriter
//!
//! Implements RTPS Sec.8.4.7.5 (ReaderProxy) and Sec.8.4.9.2 (reliable
//! StatefulWriter behavior):
//! - Ordered table of [`ChangeForReader`] records above a low-water mark
//! - ACKNACK / NACK_FRAG processing with monotonic count checks
//! - NACK response delay (batches repair requests before resending)
//! - NACK suppression window (ignores NACKs for in-flight repairs)
//! - Acknowledgment regression with resurrection from the writer history
//!
//! # Locking
//!
//! All state sits behind one `parking_lot::ReentrantMutex`. Public methods
//! lock it for their whole duration and may nest; [`ReaderProxy::lock`] lets
//! the writer hold it across several calls. The two timers run their callbacks
//! on their own threads and take the same lock.
//!
//! Writer wake-ups are fire-and-forget and issued after the method's own state
//! borrow has been released.

mod attributes;
mod state;


pub use attributes::{ReaderAttributes, ReliabilityKind};

use std::cell::RefCell;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::{ReentrantMutex, ReentrantMutexGuard};

use self::state::ProxyState;
use crate::config::WriterTimes;
use crate::core::guid::GUID;
use crate::engine::timer::Timer;
use crate::engine::wake::WriterWakeup;
use crate::error::Result;
use crate::reliability::change::{ChangeForReader, ChangeForReaderStatus};
use crate::reliability::history_cache::WriterHistory;
use crate::reliability::metrics::{ReaderProxyMetrics, ReaderProxyMetricsSnapshot};
use crate::reliability::seq::{
    FragmentNumber, FragmentNumberSet, SequenceNumber, SequenceNumberSet, SEQUENCE_NUMBER_UNKNOWN,
};

/// Result of [`ReaderProxy::process_nack_frag`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NackFragOutcome {
    /// Proxy inactive or matched to another reader; nothing touched.
    WrongReader,
    /// `count` not above the last processed NACK_FRAG count; nothing touched.
    Stale,
    /// Fragments marked for resend.
    Applied,
    /// Count accepted but the sequence number is no longer tracked.
    UnknownChange,
}

impl NackFragOutcome {
    /// True if the message passed the reader and count checks.
    pub fn is_newly_processed(self) -> bool {
        matches!(self, Self::Applied | Self::UnknownChange)
    }
}

/// Result of [`ReaderProxy::process_acknack`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AckNackOutcome {
    /// Proxy inactive or matched to another reader; nothing touched.
    WrongReader,
    /// `count` not above the last processed ACKNACK count; nothing touched.
    Stale,
    /// Acknowledgment applied; `repairs_requested` if any change moved to REQUESTED.
    Applied { repairs_requested: bool },
}

impl AckNackOutcome {
    /// True if the message passed the reader and count checks.
    pub fn is_newly_processed(self) -> bool {
        matches!(self, Self::Applied { .. })
    }
}

/// State reachable from the timer threads.
struct ProxyShared {
    state: ReentrantMutex<RefCell<ProxyState>>,
    history: Arc<dyn WriterHistory>,
    wakeup: Arc<dyn WriterWakeup>,
    metrics: ReaderProxyMetrics,
}

impl ProxyShared {
    fn with_state<R>(&self, f: impl FnOnce(&mut ProxyState) -> R) -> R {
        let guard = self.state.lock();
        let mut state = guard.borrow_mut();
        f(&mut state)
    }

    fn perform_nack_suppression(&self) -> bool {
        let converted = self.with_state(|state| {
            state.is_active
                && state.convert_status_on_all_changes(
                    ChangeForReaderStatus::Underway,
                    ChangeForReaderStatus::Unacknowledged,
                )
        });
        if converted {
            self.metrics.increment_nack_suppressions();
        }
        converted
    }

    fn perform_acknack_response(&self) -> bool {
        let converted = self.with_state(|state| {
            state.is_active
                && state.convert_status_on_all_changes(
                    ChangeForReaderStatus::Requested,
                    ChangeForReaderStatus::Unsent,
                )
        });
        if converted {
            self.metrics.increment_nack_responses();
            self.wakeup.wake_up();
        }
        converted
    }
}

/// Reentrant hold on a proxy's lock, see [`ReaderProxy::lock`].
pub struct ReaderProxyGuard<'a> {
    _guard: ReentrantMutexGuard<'a, RefCell<ProxyState>>,
}

/// Writer-side delivery state for one matched remote reader.
///
/// Created once (timers spawned inactive), then reused across matches with
/// [`start`](Self::start) / [`stop`](Self::stop).
///
/// # Example
/// ```
/// use std::sync::Arc;
/// use hdds_reliability::{
///     ChangeForReader, History, HistoryCache, ReaderAttributes, ReaderProxy,
///     ReliabilityKind, WakeNotifier, WriterTimes, GUID,
/// };
///
/// let history = Arc::new(HistoryCache::new(History::KeepLast(16), 16, 0));
/// let proxy = ReaderProxy::new(&WriterTimes::default(), history, WakeNotifier::shared())?;
/// let reader = GUID::new([1; 12], [0, 0, 1, 7]);
/// proxy.start(ReaderAttributes::new(reader, ReliabilityKind::Reliable));
///
/// proxy.add_change(ChangeForReader::new(1, 1), false);
/// proxy.add_change(ChangeForReader::new(2, 1), false);
/// proxy.acked_changes_set(2);
/// assert!(proxy.change_is_acked(1));
/// assert!(!proxy.change_is_acked(2));
/// # Ok::<(), hdds_reliability::Error>(())
/// ```
pub struct ReaderProxy {
    nack_response_timer: Timer,
    nack_suppression_timer: Timer,
    shared: Arc<ProxyShared>,
}

impl ReaderProxy {
    /// Create an inactive proxy and spawn its two timers.
    ///
    /// Timer callbacks only hold a weak reference to the proxy state; once the
    /// proxy is dropped they do nothing, and dropping joins both timer threads.
    pub fn new(
        times: &WriterTimes,
        history: Arc<dyn WriterHistory>,
        wakeup: Arc<dyn WriterWakeup>,
    ) -> Result<Self> {
        times.validate()?;

        let shared = Arc::new(ProxyShared {
            state: ReentrantMutex::new(RefCell::new(ProxyState::default())),
            history,
            wakeup,
            metrics: ReaderProxyMetrics::new(),
        });

        let weak = Arc::downgrade(&shared);
        let nack_response_timer = Timer::new(
            "nack-response",
            times.nack_response_delay,
            Box::new(move || {
                if let Some(shared) = weak.upgrade() {
                    shared.perform_acknack_response();
                }
            }),
        )?;

        let weak = Arc::downgrade(&shared);
        let nack_suppression_timer = Timer::new(
            "nack-suppression",
            times.nack_suppression_duration,
            Box::new(move || {
                if let Some(shared) = weak.upgrade() {
                    shared.perform_nack_suppression();
                }
            }),
        )?;

        Ok(Self {
            nack_response_timer,
            nack_suppression_timer,
            shared,
        })
    }

    fn with_state<R>(&self, f: impl FnOnce(&mut ProxyState) -> R) -> R {
        self.shared.with_state(f)
    }

    /// Hold the proxy lock across several calls.
    ///
    /// Every method may be called while the guard is alive, except
    /// [`stop`](Self::stop) and [`disable_timers`](Self::disable_timers): they
    /// wait for in-flight timer callbacks, which need this lock.
    pub fn lock(&self) -> ReaderProxyGuard<'_> {
        ReaderProxyGuard {
            _guard: self.shared.state.lock(),
        }
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Activate the proxy for a newly matched reader.
    ///
    /// May be called again on an active proxy to update the reader. If that
    /// turns a reliable reader best-effort, pending repairs are folded back
    /// (REQUESTED to UNSENT, UNDERWAY to UNACKNOWLEDGED) and both timers are
    /// cancelled, so like [`stop`](Self::stop) it must not run under
    /// [`lock`](Self::lock) in that case.
    pub fn start(&self, attributes: ReaderAttributes) {
        let downgraded = self.with_state(|state| {
            log::info!(
                "[reader-proxy] Started for reader {} ({:?}, {} locators)",
                attributes.guid,
                attributes.reliability,
                attributes.unicast_locators.len() + attributes.multicast_locators.len()
            );
            state.activate(attributes)
        });
        if downgraded {
            log::debug!("[reader-proxy] Reader downgraded to best-effort, repairs dropped");
            self.nack_response_timer.cancel();
            self.nack_suppression_timer.cancel();
            self.shared.wakeup.wake_up();
        }
        self.shared.metrics.reset();
    }

    /// Deactivate the proxy, cancel both timers and clear all records.
    ///
    /// Returns once no timer callback is running. Idempotent.
    pub fn stop(&self) {
        self.with_state(|state| {
            if state.is_active {
                log::info!(
                    "[reader-proxy] Stopped for reader {} ({} changes pending)",
                    state.attributes.guid,
                    state.changes.len()
                );
            }
            state.reset();
        });
        self.nack_response_timer.cancel();
        self.nack_suppression_timer.cancel();
    }

    /// Cancel both timers and stop re-arming them until the next `start`.
    pub fn disable_timers(&self) {
        self.with_state(|state| state.timers_enabled = false);
        self.nack_response_timer.cancel();
        self.nack_suppression_timer.cancel();
    }

    /// New NACK response delay. A pending deadline is kept.
    pub fn update_nack_response_interval(&self, interval: Duration) {
        self.nack_response_timer.update_interval(interval);
    }

    /// New NACK suppression duration. A pending deadline is kept.
    pub fn update_nack_suppression_interval(&self, interval: Duration) {
        self.nack_suppression_timer.update_interval(interval);
    }

    // ========================================================================
    // Change table mutation
    // ========================================================================

    /// Append a change for this reader.
    ///
    /// An ACKNOWLEDGED change arriving while the table is empty only advances
    /// the low-water mark. The writer is woken when an UNSENT change is stored.
    ///
    /// # Panics
    ///
    /// If `change` does not follow both the low-water mark and the last stored
    /// change: the writer must append in strictly increasing order.
    pub fn add_change(&self, change: ChangeForReader, restart_nack_suppression: bool) {
        let wake = self.with_state(|state| {
            if restart_nack_suppression && state.timers_enabled {
                self.nack_suppression_timer.restart();
            }
            let unsent = change.status() == ChangeForReaderStatus::Unsent;
            state.add_change(change) && unsent
        });
        if wake {
            self.shared.wakeup.wake_up();
        }
    }

    /// Whole-sample NACK: UNACKNOWLEDGED changes in `set` become REQUESTED.
    ///
    /// Restarts the NACK response timer when anything changed. Always false for
    /// a best-effort reader.
    pub fn requested_changes_set(&self, set: &SequenceNumberSet) -> bool {
        self.with_state(|state| {
            if !state.is_reliable() {
                return false;
            }
            let moved = state.requested_changes_set(set);
            if moved == 0 {
                log::debug!(
                    "[reader-proxy] NACK {} from {} names no unacknowledged change",
                    set,
                    state.attributes.guid
                );
                return false;
            }
            log::debug!(
                "[reader-proxy] {} changes requested by {} ({})",
                moved,
                state.attributes.guid,
                set
            );
            self.shared.metrics.increment_changes_requested(moved as u64);
            if state.timers_enabled {
                self.nack_response_timer.restart();
            }
            true
        })
    }

    /// Fragment NACK for one change: the fragments are marked unsent and the
    /// change demoted to REQUESTED unless it is still UNSENT.
    ///
    /// Returns false if the change is not tracked (or the reader is best-effort).
    pub fn requested_fragment_set(
        &self,
        sequence_number: SequenceNumber,
        fragments: &FragmentNumberSet,
    ) -> bool {
        self.with_state(|state| {
            if !state.is_reliable() || !state.requested_fragment_set(sequence_number, fragments) {
                return false;
            }
            self.shared.metrics.increment_fragments_requested();
            if state.timers_enabled {
                self.nack_response_timer.restart();
            }
            true
        })
    }

    /// Set the status of one change. Returns true if the table or the
    /// low-water mark changed.
    ///
    /// Acknowledging `low_water_mark + 1` advances the mark and removes the
    /// record, together with any acknowledged records directly behind it.
    pub fn set_change_to_status(
        &self,
        sequence_number: SequenceNumber,
        status: ChangeForReaderStatus,
        restart_nack_suppression: bool,
    ) -> bool {
        self.with_state(|state| {
            if restart_nack_suppression && state.timers_enabled {
                self.nack_suppression_timer.restart();
            }
            if !state.is_reliable()
                && matches!(
                    status,
                    ChangeForReaderStatus::Requested | ChangeForReaderStatus::Underway
                )
            {
                return false;
            }
            state.set_change_to_status(sequence_number, status)
        })
    }

    /// Record that one fragment of a change went out.
    ///
    /// Returns `Some(true)` when that was the last unsent fragment, `None` if
    /// the change is not tracked.
    pub fn mark_fragment_as_sent_for_change(
        &self,
        sequence_number: SequenceNumber,
        fragment: FragmentNumber,
    ) -> Option<bool> {
        self.with_state(|state| state.mark_fragment_as_sent(sequence_number, fragment))
    }

    /// The reader acknowledges everything below `sequence_number`.
    ///
    /// A value at or below the low-water mark is a regression: changes between
    /// it and the mark are reloaded from the writer history as UNACKNOWLEDGED
    /// (evicted ones are skipped) and the mark moves back.
    pub fn acked_changes_set(&self, sequence_number: SequenceNumber) {
        self.with_state(|state| {
            let effect = state.acked_changes_set(sequence_number, self.shared.history.as_ref());
            if effect.removed > 0 {
                self.shared
                    .metrics
                    .increment_changes_acknowledged(effect.removed as u64);
            }
            if effect.resurrected > 0 {
                log::debug!(
                    "[reader-proxy] Acknowledgment regression for {}: {} changes resurrected, low water mark now {}",
                    state.attributes.guid,
                    effect.resurrected,
                    state.low_water_mark
                );
                self.shared
                    .metrics
                    .increment_changes_resurrected(effect.resurrected as u64);
            }
        });
    }

    /// Forget a change evicted from the writer history. No low-water mark effect.
    pub fn change_has_been_removed(&self, sequence_number: SequenceNumber) {
        self.with_state(|state| state.change_has_been_removed(sequence_number));
    }

    // ========================================================================
    // Timer-driven transitions
    // ========================================================================

    /// UNDERWAY -> UNACKNOWLEDGED for every change (suppression window over).
    pub fn perform_nack_suppression(&self) -> bool {
        self.shared.perform_nack_suppression()
    }

    /// REQUESTED -> UNSENT for every change, waking the writer if any moved.
    pub fn perform_acknack_response(&self) -> bool {
        self.shared.perform_acknack_response()
    }

    // ========================================================================
    // Control messages
    // ========================================================================

    /// Entry point for a decoded NACK_FRAG.
    ///
    /// Duplicate or reordered messages (`count <= last processed`) are ignored
    /// without touching state.
    pub fn process_nack_frag(
        &self,
        reader_guid: GUID,
        count: u32,
        sequence_number: SequenceNumber,
        fragments: &FragmentNumberSet,
    ) -> NackFragOutcome {
        let guard = self.shared.state.lock();
        {
            let mut state = guard.borrow_mut();
            if !state.is_active || state.attributes.guid != reader_guid {
                return NackFragOutcome::WrongReader;
            }
            if count <= state.last_nackfrag_count {
                log::debug!(
                    "[reader-proxy] Stale NACK_FRAG #{} from {} (last #{})",
                    count,
                    reader_guid,
                    state.last_nackfrag_count
                );
                self.shared.metrics.increment_stale_nack_frag();
                return NackFragOutcome::Stale;
            }
            state.last_nackfrag_count = count;
        }

        // Still under `guard`: the count update and the repair are one step.
        if self.requested_fragment_set(sequence_number, fragments) {
            NackFragOutcome::Applied
        } else {
            NackFragOutcome::UnknownChange
        }
    }

    /// Entry point for a decoded ACKNACK: count check, then
    /// `acked_changes_set(base)` and `requested_changes_set(sn_state)`.
    ///
    /// A base beyond anything handed to this proxy is clamped.
    pub fn process_acknack(
        &self,
        reader_guid: GUID,
        count: u32,
        sn_state: &SequenceNumberSet,
    ) -> AckNackOutcome {
        let guard = self.shared.state.lock();
        let base = {
            let mut state = guard.borrow_mut();
            if !state.is_active || state.attributes.guid != reader_guid {
                return AckNackOutcome::WrongReader;
            }
            if count <= state.last_acknack_count {
                log::debug!(
                    "[reader-proxy] Stale ACKNACK #{} from {} (last #{})",
                    count,
                    reader_guid,
                    state.last_acknack_count
                );
                self.shared.metrics.increment_stale_acknack();
                return AckNackOutcome::Stale;
            }
            state.last_acknack_count = count;

            let limit = state.highest_known() + 1;
            if sn_state.base() > limit {
                log::warn!(
                    "[reader-proxy] ACKNACK base {} from {} beyond highest known {}",
                    sn_state.base(),
                    reader_guid,
                    limit - 1
                );
            }
            sn_state.base().min(limit)
        };

        if base != SEQUENCE_NUMBER_UNKNOWN {
            self.acked_changes_set(base);
        }
        let repairs_requested = !sn_state.is_empty() && self.requested_changes_set(sn_state);
        AckNackOutcome::Applied { repairs_requested }
    }

    // ========================================================================
    // Queries
    // ========================================================================

    pub fn has_changes(&self) -> bool {
        self.with_state(|state| !state.changes.is_empty())
    }

    /// Any relevant change still waiting for an acknowledgment.
    pub fn has_unacknowledged(&self) -> bool {
        self.with_state(|state| state.has_unacknowledged())
    }

    /// True if `sequence_number` needs nothing more from this reader.
    ///
    /// A change not yet handed to the proxy is not acked; a hole in the table
    /// (a removed change) is.
    pub fn change_is_acked(&self, sequence_number: SequenceNumber) -> bool {
        self.with_state(|state| state.change_is_acked(sequence_number))
    }

    pub fn is_reliable(&self) -> bool {
        self.with_state(|state| state.is_reliable())
    }

    pub fn is_active(&self) -> bool {
        self.with_state(|state| state.is_active)
    }

    /// GUID of the matched reader (`GUID::unknown()` while inactive).
    pub fn guid(&self) -> GUID {
        self.with_state(|state| state.attributes.guid)
    }

    /// Unicast locators followed by multicast locators.
    pub fn remote_locators(&self) -> Vec<SocketAddr> {
        self.with_state(|state| state.remote_locators.clone())
    }

    pub fn expects_inline_qos(&self) -> bool {
        self.with_state(|state| state.attributes.expects_inline_qos)
    }

    pub fn low_water_mark(&self) -> SequenceNumber {
        self.with_state(|state| state.low_water_mark)
    }

    /// Number of records in the table.
    pub fn count_changes_for_reader(&self) -> usize {
        self.with_state(|state| state.changes.len())
    }

    pub fn change_status(&self, sequence_number: SequenceNumber) -> Option<ChangeForReaderStatus> {
        self.with_state(|state| {
            state
                .find_change(sequence_number)
                .map(ChangeForReader::status)
        })
    }

    /// Copy of the change table, ascending.
    pub fn changes_snapshot(&self) -> Vec<ChangeForReader> {
        self.with_state(|state| state.changes.iter().cloned().collect())
    }

    /// Lowest relevant UNSENT change (send loop).
    pub fn next_unsent_change(&self) -> Option<SequenceNumber> {
        self.with_state(|state| state.first_with_status(ChangeForReaderStatus::Unsent))
    }

    /// Lowest relevant REQUESTED change.
    pub fn next_requested_change(&self) -> Option<SequenceNumber> {
        self.with_state(|state| state.first_with_status(ChangeForReaderStatus::Requested))
    }

    /// Fragments of a change still to be sent, ascending.
    pub fn unsent_fragments(&self, sequence_number: SequenceNumber) -> Option<Vec<FragmentNumber>> {
        self.with_state(|state| {
            state
                .find_change(sequence_number)
                .map(|c| c.unsent_fragments().iter().copied().collect())
        })
    }

    pub fn metrics(&self) -> ReaderProxyMetricsSnapshot {
        self.shared.metrics.snapshot()
    }

    #[cfg(test)]
    pub(crate) fn nack_response_timer_armed(&self) -> bool {
        self.nack_response_timer.is_armed()
    }

    #[cfg(test)]
    pub(crate) fn nack_suppression_timer_armed(&self) -> bool {
        self.nack_suppression_timer.is_armed()
    }
}

impl std::fmt::Debug for ReaderProxy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.with_state(|state| {
            f.debug_struct("ReaderProxy")
                .field("guid", &state.attributes.guid)
                .field("active", &state.is_active)
                .field("reliability", &state.attributes.reliability)
                .field("low_water_mark", &state.low_water_mark)
                .field("changes", &state.changes.len())
                .finish()
        })
    }
}
