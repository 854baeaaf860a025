// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Writer reliability timing configuration.
//!
//! Holds the RTPS writer timing parameters (RTPS v2.5 Sec.8.4.7.1) that drive
//! the per-reader timers:
//!
//! - `nack_response_delay`: batching window between receiving a NACK and
//!   handing the requested changes to the send loop.
//! - `nack_suppression_duration`: grace window after a retransmission during
//!   which further NACKs for the same change are ignored.
//!
//! # Example
//!
//! ```rust
//! use hdds_reliability::WriterTimes;
//! use std::time::Duration;
//!
//! let times = WriterTimes::default()
//!     .with_nack_response_delay(Duration::from_millis(20));
//! assert!(times.validate().is_ok());
//! ```

use std::time::Duration;

use crate::error::{Error, Result};

#[cfg(feature = "qos-loaders")]
mod loader;

#[cfg(feature = "qos-loaders")]
pub use loader::{WriterTimesLoader, YamlWriterTimes, YamlWriterTimesDocument};

/// Default heartbeat period (RTPS v2.5 Sec.8.4.7.1 recommends 3 s).
pub const DEFAULT_HEARTBEAT_PERIOD: Duration = Duration::from_secs(3);

/// Default NACK response delay (5 ms batching window).
pub const DEFAULT_NACK_RESPONSE_DELAY: Duration = Duration::from_millis(5);

/// Default NACK suppression duration (no grace window).
pub const DEFAULT_NACK_SUPPRESSION_DURATION: Duration = Duration::ZERO;

/// Timing parameters shared by every reader proxy of one writer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WriterTimes {
    /// Period of writer HEARTBEATs.
    ///
    /// Proxies never schedule heartbeats themselves. The writer reads this
    /// through [`MatchedReadersRegistry::writer_times`] to drive its heartbeat
    /// loop, and [`validate`](Self::validate) uses it to bound the NACK
    /// response delay.
    ///
    /// [`MatchedReadersRegistry::writer_times`]: crate::MatchedReadersRegistry::writer_times
    pub heartbeat_period: Duration,
    /// Delay before acting on a received NACK.
    pub nack_response_delay: Duration,
    /// Window during which NACKs for in-flight retransmissions are ignored.
    pub nack_suppression_duration: Duration,
}

impl Default for WriterTimes {
    fn default() -> Self {
        Self {
            heartbeat_period: DEFAULT_HEARTBEAT_PERIOD,
            nack_response_delay: DEFAULT_NACK_RESPONSE_DELAY,
            nack_suppression_duration: DEFAULT_NACK_SUPPRESSION_DURATION,
        }
    }
}

impl WriterTimes {
    /// Set the NACK response delay (fluent builder style).
    #[must_use]
    pub fn with_nack_response_delay(mut self, delay: Duration) -> Self {
        self.nack_response_delay = delay;
        self
    }

    /// Set the NACK suppression duration (fluent builder style).
    #[must_use]
    pub fn with_nack_suppression_duration(mut self, duration: Duration) -> Self {
        self.nack_suppression_duration = duration;
        self
    }

    /// Set the heartbeat period (fluent builder style).
    #[must_use]
    pub fn with_heartbeat_period(mut self, period: Duration) -> Self {
        self.heartbeat_period = period;
        self
    }

    /// Check the configuration is usable.
    ///
    /// A zero heartbeat period would spin the writer; both NACK timings may be zero.
    pub fn validate(&self) -> Result<()> {
        if self.heartbeat_period.is_zero() {
            return Err(Error::InvalidConfig(
                "heartbeat_period must be > 0".to_string(),
            ));
        }
        if self.nack_response_delay >= self.heartbeat_period {
            return Err(Error::InvalidConfig(format!(
                "nack_response_delay ({:?}) must be shorter than heartbeat_period ({:?})",
                self.nack_response_delay, self.heartbeat_period
            )));
        }
        Ok(())
    }
}
