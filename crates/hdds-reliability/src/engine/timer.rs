// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Restartable one-shot delay timer.
//!
//! Each `Timer` owns a dedicated thread that sleeps on a condvar until the
//! armed deadline, then invokes its callback once. Re-arming before the
//! deadline pushes the deadline back (the NACK batching behaviour).
//!
//! # Cancellation Contract
//!
//! `cancel()` disarms the timer and waits until a callback that has already
//! started has returned, so after `cancel()` no callback is running and none
//! will start until the next `restart()`. Called from inside the callback
//! itself, `cancel()` only disarms (waiting would deadlock).
//!
//! Dropping the timer stops and joins the thread.

use parking_lot::{Condvar, Mutex, MutexGuard};
use std::sync::Arc;
use std::thread::{self, JoinHandle, ThreadId};
use std::time::{Duration, Instant};

use crate::error::{Error, Result};

/// Timer callback. Runs on the timer thread with no timer lock held.
pub type TimerCallback = Box<dyn Fn() + Send + 'static>;

#[derive(Debug)]
struct TimerState {
    deadline: Option<Instant>,
    interval: Duration,
    running: bool,
    shutdown: bool,
    fired: u64,
}

#[derive(Debug)]
struct TimerShared {
    state: Mutex<TimerState>,
    condvar: Condvar,
}

/// Restartable, cancelable one-shot timer.
pub struct Timer {
    name: String,
    shared: Arc<TimerShared>,
    thread_id: ThreadId,
    thread: Option<JoinHandle<()>>,
}

impl Timer {
    /// Spawn a disarmed timer with the given interval.
    ///
    /// `name` is used for the thread name and log messages.
    pub fn new(name: &str, interval: Duration, callback: TimerCallback) -> Result<Self> {
        let shared = Arc::new(TimerShared {
            state: Mutex::new(TimerState {
                deadline: None,
                interval,
                running: false,
                shutdown: false,
                fired: 0,
            }),
            condvar: Condvar::new(),
        });

        let shared_clone = Arc::clone(&shared);
        let thread_name = name.to_string();
        let thread = thread::Builder::new()
            .name(format!("hdds-{}", name))
            .spawn(move || timer_loop(&thread_name, &shared_clone, &callback))
            .map_err(Error::TimerSpawn)?;

        Ok(Self {
            name: name.to_string(),
            shared,
            thread_id: thread.thread().id(),
            thread: Some(thread),
        })
    }

    /// Arm (or re-arm) the timer to fire one interval from now.
    pub fn restart(&self) {
        let mut state = self.shared.state.lock();
        state.deadline = Some(Instant::now() + state.interval);
        self.shared.condvar.notify_all();
    }

    /// Disarm the timer, waiting for an in-flight callback to finish.
    pub fn cancel(&self) {
        let mut state = self.shared.state.lock();
        state.deadline = None;
        self.shared.condvar.notify_all();

        if thread::current().id() == self.thread_id {
            return;
        }
        while state.running {
            self.shared.condvar.wait(&mut state);
        }
    }

    /// Change the interval. An armed deadline is kept; the new interval
    /// applies from the next `restart()`.
    pub fn update_interval(&self, interval: Duration) {
        self.shared.state.lock().interval = interval;
    }

    /// Current interval.
    pub fn interval(&self) -> Duration {
        self.shared.state.lock().interval
    }

    /// True while a deadline is pending.
    pub fn is_armed(&self) -> bool {
        self.shared.state.lock().deadline.is_some()
    }

    /// Number of times the callback has been invoked.
    pub fn fired_count(&self) -> u64 {
        self.shared.state.lock().fired
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl Drop for Timer {
    fn drop(&mut self) {
        {
            let mut state = self.shared.state.lock();
            state.shutdown = true;
            state.deadline = None;
            self.shared.condvar.notify_all();
        }
        if let Some(handle) = self.thread.take() {
            if handle.thread().id() == thread::current().id() {
                // Last owner dropped from inside the callback; the loop exits on its own.
                return;
            }
            let _ = handle.join();
        }
    }
}

impl std::fmt::Debug for Timer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Timer")
            .field("name", &self.name)
            .field("interval", &self.interval())
            .field("armed", &self.is_armed())
            .finish()
    }
}

fn timer_loop(name: &str, shared: &TimerShared, callback: &TimerCallback) {
    log::trace!("[timer] {} thread started", name);
    let mut state = shared.state.lock();

    loop {
        if state.shutdown {
            break;
        }

        match state.deadline {
            None => shared.condvar.wait(&mut state),
            Some(deadline) if Instant::now() >= deadline => {
                state.deadline = None;
                state.running = true;
                state.fired += 1;
                MutexGuard::unlocked(&mut state, || {
                    log::trace!("[timer] {} fired", name);
                    callback();
                });
                state.running = false;
                shared.condvar.notify_all();
            }
            Some(deadline) => {
                let _ = shared.condvar.wait_until(&mut state, deadline);
            }
        }
    }

    log::trace!("[timer] {} thread stopped", name);
}
