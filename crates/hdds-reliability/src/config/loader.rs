// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! YAML loader for writer timing parameters.
//!
//! # Example YAML
//!
//! ```yaml
//! writer_times:
//!   heartbeat_period_ms: 100
//!   nack_response_delay_ms: 5
//!   nack_suppression_duration_ms: 0
//! ```
//!
//! Missing fields keep their default value.

use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;

use super::WriterTimes;
use crate::error::{Error, Result};

/// YAML writer times loader.
pub struct WriterTimesLoader;

/// Root YAML document structure.
#[derive(Debug, Deserialize, Default)]
pub struct YamlWriterTimesDocument {
    /// Writer timing section (optional, defaults apply when absent).
    #[serde(default)]
    pub writer_times: Option<YamlWriterTimes>,
}

/// Writer timing section in YAML format.
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct YamlWriterTimes {
    pub heartbeat_period_ms: Option<u64>,
    pub nack_response_delay_ms: Option<u64>,
    pub nack_suppression_duration_ms: Option<u64>,
}

impl WriterTimesLoader {
    /// Load writer times from a YAML file.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<WriterTimes> {
        let path = path.as_ref();
        let yaml_content = fs::read_to_string(path)
            .map_err(|e| Error::ConfigFileNotFound(format!("{}: {}", path.display(), e)))?;
        Self::parse_yaml(&yaml_content)
    }

    /// Parse YAML content into validated writer times.
    pub fn parse_yaml(yaml_content: &str) -> Result<WriterTimes> {
        let doc: YamlWriterTimesDocument = serde_yaml::from_str(yaml_content)
            .map_err(|e| Error::ConfigParse(format!("Failed to parse YAML: {}", e)))?;
        let times = Self::document_to_times(&doc);
        times.validate()?;
        log::debug!("[config] Loaded writer times {:?}", times);
        Ok(times)
    }

    /// Convert a parsed document to writer times, keeping defaults for absent fields.
    pub fn document_to_times(doc: &YamlWriterTimesDocument) -> WriterTimes {
        let mut times = WriterTimes::default();
        if let Some(ref section) = doc.writer_times {
            if let Some(ms) = section.heartbeat_period_ms {
                times.heartbeat_period = Duration::from_millis(ms);
            }
            if let Some(ms) = section.nack_response_delay_ms {
                times.nack_response_delay = Duration::from_millis(ms);
            }
            if let Some(ms) = section.nack_suppression_duration_ms {
                times.nack_suppression_duration = Duration::from_millis(ms);
            }
        }
        times
    }
}
