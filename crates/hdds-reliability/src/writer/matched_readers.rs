// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! MatchedReadersRegistry - Thread-safe registry of ReaderProxies for a Writer
//!
//! Provides concurrent access to the writer's [`ReaderProxy`] instances:
//! - Control thread: ACKNACK / NACK_FRAG routing by reader GUID
//! - Data thread: fan-out of new changes, "acked by all" checks
//!
//! Uses DashMap for lock-free lookups. Unmatched proxies are stopped and kept
//! in an idle pool so a later match reuses them (and their timer threads)
//! instead of spawning new ones.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parking_lot::Mutex;
use std::sync::Arc;

use crate::config::WriterTimes;
use crate::core::guid::GUID;
use crate::engine::wake::WriterWakeup;
use crate::error::{Error, Result};
use crate::reliability::{
    AckNackOutcome, CacheChange, ChangeForReader, FragmentNumberSet, NackFragOutcome,
    ReaderAttributes, ReaderProxy, SequenceNumber, SequenceNumberSet, WriterHistory,
};

/// Thread-safe registry of ReaderProxy instances for a Writer endpoint.
pub struct MatchedReadersRegistry {
    /// Active proxies, keyed by reader GUID
    proxies: DashMap<GUID, Arc<ReaderProxy>>,
    /// Stopped proxies ready for reuse
    idle: Mutex<Vec<Arc<ReaderProxy>>>,
    times: WriterTimes,
    history: Arc<dyn WriterHistory>,
    wakeup: Arc<dyn WriterWakeup>,
}

impl MatchedReadersRegistry {
    /// Create an empty registry. Proxies are created lazily on first match.
    pub fn new(
        times: WriterTimes,
        history: Arc<dyn WriterHistory>,
        wakeup: Arc<dyn WriterWakeup>,
    ) -> Result<Self> {
        times.validate()?;
        Ok(Self {
            proxies: DashMap::new(),
            idle: Mutex::new(Vec::new()),
            times,
            history,
            wakeup,
        })
    }

    /// Timings every proxy of this writer runs with. The writer drives its
    /// heartbeat loop from `heartbeat_period`.
    pub fn writer_times(&self) -> &WriterTimes {
        &self.times
    }

    fn acquire(&self) -> Result<Arc<ReaderProxy>> {
        if let Some(proxy) = self.idle.lock().pop() {
            return Ok(proxy);
        }
        let proxy = ReaderProxy::new(
            &self.times,
            Arc::clone(&self.history),
            Arc::clone(&self.wakeup),
        )?;
        Ok(Arc::new(proxy))
    }

    /// Add or update a matched reader.
    ///
    /// Called when SEDP discovers a new reader or updates an existing one. An
    /// update refreshes the attributes and keeps the change table.
    pub fn match_reader(&self, attributes: ReaderAttributes) -> Result<Arc<ReaderProxy>> {
        let guid = attributes.guid;
        match self.proxies.entry(guid) {
            Entry::Occupied(entry) => {
                let proxy = Arc::clone(entry.get());
                drop(entry);
                log::debug!("[matched-readers] Updated reader {}", guid);
                proxy.start(attributes);
                Ok(proxy)
            }
            Entry::Vacant(entry) => {
                let proxy = self.acquire()?;
                proxy.start(attributes);
                entry.insert(Arc::clone(&proxy));
                log::debug!("[matched-readers] Matched reader {}", guid);
                Ok(proxy)
            }
        }
    }

    /// Remove a reader (e.g., when SEDP reports it gone).
    ///
    /// The proxy is stopped and pooled. Returns false if it was not matched.
    pub fn unmatch_reader(&self, reader_guid: &GUID) -> bool {
        let Some((_, proxy)) = self.proxies.remove(reader_guid) else {
            return false;
        };
        proxy.stop();
        self.idle.lock().push(proxy);
        log::debug!("[matched-readers] Unmatched reader {}", reader_guid);
        true
    }

    /// Hand a newly written change to every matched reader.
    pub fn add_change_for_all(&self, change: &CacheChange) {
        for proxy in self.proxies() {
            proxy.add_change(ChangeForReader::from_cache_change(change), false);
        }
    }

    /// Route a decoded ACKNACK to its reader's proxy.
    pub fn on_acknack(
        &self,
        reader_guid: &GUID,
        count: u32,
        sn_state: &SequenceNumberSet,
    ) -> Result<AckNackOutcome> {
        let proxy = self.get(reader_guid).ok_or(Error::UnknownReader(*reader_guid))?;
        Ok(proxy.process_acknack(*reader_guid, count, sn_state))
    }

    /// Route a decoded NACK_FRAG to its reader's proxy.
    pub fn on_nack_frag(
        &self,
        reader_guid: &GUID,
        count: u32,
        sequence_number: SequenceNumber,
        fragments: &FragmentNumberSet,
    ) -> Result<NackFragOutcome> {
        let proxy = self.get(reader_guid).ok_or(Error::UnknownReader(*reader_guid))?;
        Ok(proxy.process_nack_frag(*reader_guid, count, sequence_number, fragments))
    }

    /// Forward a history eviction to every proxy.
    pub fn change_removed(&self, sequence_number: SequenceNumber) {
        for proxy in self.proxies() {
            proxy.change_has_been_removed(sequence_number);
        }
    }

    /// True if every matched reader has acknowledged `sequence_number`
    /// (vacuously true with no readers).
    pub fn is_acked_by_all(&self, sequence_number: SequenceNumber) -> bool {
        self.proxies
            .iter()
            .all(|p| p.value().change_is_acked(sequence_number))
    }

    /// Lowest low-water mark across readers (the slowest reader).
    ///
    /// Everything at or below it can be discarded from the history.
    pub fn min_low_water_mark(&self) -> Option<SequenceNumber> {
        self.proxies
            .iter()
            .map(|p| p.value().low_water_mark())
            .min()
    }

    /// Proxy for a reader.
    pub fn get(&self, reader_guid: &GUID) -> Option<Arc<ReaderProxy>> {
        self.proxies.get(reader_guid).map(|p| Arc::clone(p.value()))
    }

    /// Snapshot of all active proxies (the map is not locked while the caller
    /// works with them).
    pub fn proxies(&self) -> Vec<Arc<ReaderProxy>> {
        self.proxies.iter().map(|p| Arc::clone(p.value())).collect()
    }

    /// Number of matched readers
    pub fn len(&self) -> usize {
        self.proxies.len()
    }

    /// Check if registry is empty
    pub fn is_empty(&self) -> bool {
        self.proxies.is_empty()
    }

    /// Number of stopped proxies waiting for reuse
    pub fn idle_count(&self) -> usize {
        self.idle.lock().len()
    }

    /// Unmatch every reader.
    pub fn clear(&self) {
        let guids: Vec<GUID> = self.proxies.iter().map(|p| *p.key()).collect();
        for guid in guids {
            self.unmatch_reader(&guid);
        }
    }
}

impl std::fmt::Debug for MatchedReadersRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MatchedReadersRegistry")
            .field("matched", &self.len())
            .field("idle", &self.idle_count())
            .field("times", &self.times)
            .finish()
    }
}
