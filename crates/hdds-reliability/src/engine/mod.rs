// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Threading primitives: per-proxy delay timers and writer wake-up.

pub mod timer;
pub mod wake;

pub use timer::{Timer, TimerCallback};
pub use wake::{WakeNotifier, WriterWakeup};
