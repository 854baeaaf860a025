// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Error type for the reliability layer.
//!
//! Protocol-level conditions (stale ACKNACK/NACK_FRAG, unknown sequence numbers,
//! evicted samples) are not errors: they are reported through boolean or outcome
//! return values. This enum only covers the ambient failures around them.

use crate::core::guid::GUID;

/// Errors returned by reliability operations.
///
/// # Example
///
/// ```rust
/// use hdds_reliability::{Error, WriterTimes};
/// use std::time::Duration;
///
/// let times = WriterTimes {
///     heartbeat_period: Duration::ZERO,
///     ..WriterTimes::default()
/// };
///
/// match times.validate() {
///     Err(Error::InvalidConfig(msg)) => println!("rejected: {}", msg),
///     other => panic!("unexpected: {:?}", other),
/// }
/// ```
#[derive(Debug)]
pub enum Error {
    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Writer timing configuration is invalid.
    InvalidConfig(String),
    /// Configuration file not found or unreadable at the given path.
    ConfigFileNotFound(String),
    /// Configuration document could not be parsed.
    ConfigParse(String),

    // ========================================================================
    // Runtime Errors
    // ========================================================================
    /// The OS refused to spawn a timer thread.
    TimerSpawn(std::io::Error),
    /// History cache limit reached (KEEP_ALL history is full).
    ResourceLimitExceeded(String),
    /// No matched reader with this GUID.
    UnknownReader(GUID),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::InvalidConfig(msg) => write!(f, "Invalid writer times: {}", msg),
            Error::ConfigFileNotFound(path) => write!(f, "Config file not found: {}", path),
            Error::ConfigParse(msg) => write!(f, "Config parse error: {}", msg),
            Error::TimerSpawn(e) => write!(f, "Failed to spawn timer thread: {}", e),
            Error::ResourceLimitExceeded(msg) => write!(f, "Resource limit exceeded: {}", msg),
            Error::UnknownReader(guid) => write!(f, "Unknown reader: {}", guid),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::TimerSpawn(e) => Some(e),
            _ => None,
        }
    }
}

/// Result alias for reliability operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_display_messages() {
        let err = Error::InvalidConfig("heartbeat_period must be > 0".into());
        assert_eq!(
            err.to_string(),
            "Invalid writer times: heartbeat_period must be > 0"
        );

        let err = Error::UnknownReader(GUID::new([1; 12], [0, 0, 1, 7]));
        assert!(err.to_string().starts_with("Unknown reader: 01.01"));
    }

    #[test]
    fn test_timer_spawn_exposes_source() {
        let io = std::io::Error::new(std::io::ErrorKind::Other, "no threads left");
        let err = Error::TimerSpawn(io);
        assert!(err.source().is_some());
        assert!(Error::ConfigParse("bad".into()).source().is_none());
    }
}
