// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Writer send-loop wake notification.
//!
//! Reader proxies call [`WriterWakeup::wake_up`] whenever they produce new
//! UNSENT work (a new change, or REQUESTED changes released by the NACK
//! response timer). The call is fire-and-forget and is never made while a
//! proxy lock is held.
//!
//! [`WakeNotifier`] is the stock implementation:
//! - Atomic flag for lock-free notification (checked by a spinning send loop)
//! - Condvar for blocking wait (used when the send loop is idle)

use parking_lot::{Condvar, Mutex};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Wake-up hook into the writer's send loop.
pub trait WriterWakeup: Send + Sync {
    /// Signal that sendable work is available. Must not block.
    fn wake_up(&self);
}

/// Wake notification with atomic fast-path.
///
/// # Example
/// ```
/// use hdds_reliability::{WakeNotifier, WriterWakeup};
/// use std::time::Duration;
///
/// let notifier = WakeNotifier::new();
/// notifier.wake_up();
/// assert!(notifier.wait_timeout(Duration::from_millis(10)));
/// ```
#[derive(Debug)]
pub struct WakeNotifier {
    /// Atomic flag for lock-free fast-path
    data_ready: AtomicBool,
    /// Mutex for condvar (only used when sleeping)
    sleeping: Mutex<bool>,
    /// Condvar for efficient waiting when idle
    condvar: Condvar,
    /// Total notifications received
    wakeups: AtomicU64,
}

impl WakeNotifier {
    /// Create a new wake notifier.
    #[inline]
    pub fn new() -> Self {
        Self {
            data_ready: AtomicBool::new(false),
            sleeping: Mutex::new(false),
            condvar: Condvar::new(),
            wakeups: AtomicU64::new(0),
        }
    }

    /// Create a shared notifier wrapped in Arc.
    #[inline]
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Check if work is pending and clear the flag (lock-free).
    #[inline]
    pub fn check_and_clear(&self) -> bool {
        self.data_ready.swap(false, Ordering::Acquire)
    }

    /// Check if work is pending without clearing (lock-free peek).
    #[inline]
    pub fn is_ready(&self) -> bool {
        self.data_ready.load(Ordering::Acquire)
    }

    /// Number of wake-ups received so far.
    pub fn wakeup_count(&self) -> u64 {
        self.wakeups.load(Ordering::Relaxed)
    }

    /// Wait for notification with timeout (blocking).
    ///
    /// Returns immediately if a notification is already pending.
    ///
    /// # Returns
    /// * `true` if notified
    /// * `false` if timed out
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        if self.data_ready.swap(false, Ordering::Acquire) {
            return true;
        }

        let mut sleeping = self.sleeping.lock();

        // Double-check after acquiring lock
        if self.data_ready.swap(false, Ordering::Acquire) {
            return true;
        }

        *sleeping = true;
        let _ = self.condvar.wait_for(&mut sleeping, timeout);
        *sleeping = false;

        // A notification racing with the timeout still counts.
        self.data_ready.swap(false, Ordering::Acquire)
    }
}

impl WriterWakeup for WakeNotifier {
    #[inline]
    fn wake_up(&self) {
        self.wakeups.fetch_add(1, Ordering::Relaxed);
        self.data_ready.store(true, Ordering::Release);

        // Racy but safe: worst case is an extra signal
        if *self.sleeping.lock() {
            self.condvar.notify_one();
        }
    }
}

impl Default for WakeNotifier {
    fn default() -> Self {
        Self::new()
    }
}
