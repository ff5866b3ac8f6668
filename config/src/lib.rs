// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

#![deny(missing_docs, clippy::all, clippy::pedantic)]
#![deny(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![forbid(unsafe_code)]

//! On-disk/CLI configuration for the datapath process: EMC sizing,
//! recirculation depth, flow table ceiling, classifier batch size, and an
//! optional worker core mask.

use derive_builder::Builder;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// `log2` of the EMC's slot count (spec §4.2's default sizing).
pub const DEFAULT_EMC_SHIFT: u8 = 13;
/// Number of probe segments the EMC searches before giving up.
pub const DEFAULT_EMC_SEGS: u8 = 2;
/// Maximum recirculation depth before a packet is dropped.
pub const DEFAULT_MAX_RECIRC_DEPTH: u8 = 5;
/// Per-worker flow table capacity.
pub const DEFAULT_FLOW_TABLE_CAPACITY: usize = 65_536;
/// Packets drained per classifier lookup batch.
pub const DEFAULT_CLASSIFIER_BATCH_SIZE: usize = 16;

/// Errors loading or validating a [`DatapathConfig`].
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("failed to read {path}: {source}")]
    Read {
        /// The path that could not be read.
        path: String,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// The file's contents could not be parsed as YAML.
    #[error("failed to parse {path} as YAML: {source}")]
    Parse {
        /// The path whose contents failed to parse.
        path: String,
        /// The underlying parse error.
        #[source]
        source: serde_yaml_ng::Error,
    },
    /// `requested_core_mask` was not a valid `"0x..."` hex string.
    #[error("invalid core mask {0:?}: expected a \"0x...\" hex string")]
    InvalidCoreMask(String),
}

/// The datapath process's tunable parameters: EMC sizing, recirculation
/// depth, flow table ceiling, classifier batching, and the worker core
/// mask (spec §6). Loaded from a YAML file and layered with CLI overrides.
#[derive(Builder, Clone, Debug, Serialize, Deserialize)]
#[builder(default)]
pub struct DatapathConfig {
    /// `log2` of the EMC's slot count.
    #[builder(default = "DEFAULT_EMC_SHIFT")]
    #[serde(default = "default_emc_shift")]
    pub emc_shift: u8,
    /// Number of probe segments the EMC searches before giving up.
    #[builder(default = "DEFAULT_EMC_SEGS")]
    #[serde(default = "default_emc_segs")]
    pub emc_segs: u8,
    /// Maximum recirculation depth before a packet is dropped.
    #[builder(default = "DEFAULT_MAX_RECIRC_DEPTH")]
    #[serde(default = "default_max_recirc_depth")]
    pub max_recirc_depth: u8,
    /// Per-worker flow table capacity.
    #[builder(default = "DEFAULT_FLOW_TABLE_CAPACITY")]
    #[serde(default = "default_flow_table_capacity")]
    pub flow_table_capacity: usize,
    /// Packets drained per classifier lookup batch.
    #[builder(default = "DEFAULT_CLASSIFIER_BATCH_SIZE")]
    #[serde(default = "default_classifier_batch_size")]
    pub classifier_batch_size: usize,
    /// An explicit worker core mask as a `"0x..."` hex string, or `None` to
    /// place one worker per unpinned core per NUMA node (spec §4.7).
    #[builder(default)]
    #[serde(default)]
    pub requested_core_mask: Option<String>,
}

fn default_emc_shift() -> u8 {
    DEFAULT_EMC_SHIFT
}
fn default_emc_segs() -> u8 {
    DEFAULT_EMC_SEGS
}
fn default_max_recirc_depth() -> u8 {
    DEFAULT_MAX_RECIRC_DEPTH
}
fn default_flow_table_capacity() -> usize {
    DEFAULT_FLOW_TABLE_CAPACITY
}
fn default_classifier_batch_size() -> usize {
    DEFAULT_CLASSIFIER_BATCH_SIZE
}

impl Default for DatapathConfig {
    fn default() -> Self {
        DatapathConfig {
            emc_shift: DEFAULT_EMC_SHIFT,
            emc_segs: DEFAULT_EMC_SEGS,
            max_recirc_depth: DEFAULT_MAX_RECIRC_DEPTH,
            flow_table_capacity: DEFAULT_FLOW_TABLE_CAPACITY,
            classifier_batch_size: DEFAULT_CLASSIFIER_BATCH_SIZE,
            requested_core_mask: None,
        }
    }
}

impl DatapathConfig {
    /// Load a config from a YAML file, falling back to defaults for any
    /// field the file omits.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Read`] if the file cannot be read, or
    /// [`ConfigError::Parse`] if it is not valid YAML.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        serde_yaml_ng::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })
    }

    /// Parse `requested_core_mask` into a `u64` bitmask, bit `i` selecting
    /// `CoreId(i)`, as [`hardware::Topology::workers_for_node`] expects.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidCoreMask`] if the string is not a
    /// well-formed `"0x..."` hex literal.
    pub fn core_mask(&self) -> Result<Option<u64>, ConfigError> {
        let Some(raw) = &self.requested_core_mask else {
            return Ok(None);
        };
        let digits = raw
            .strip_prefix("0x")
            .or_else(|| raw.strip_prefix("0X"))
            .ok_or_else(|| ConfigError::InvalidCoreMask(raw.clone()))?;
        u64::from_str_radix(digits, 16)
            .map(Some)
            .map_err(|_| ConfigError::InvalidCoreMask(raw.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec() {
        let cfg = DatapathConfig::default();
        assert_eq!(cfg.emc_shift, 13);
        assert_eq!(cfg.emc_segs, 2);
        assert_eq!(cfg.max_recirc_depth, 5);
        assert_eq!(cfg.flow_table_capacity, 65_536);
        assert_eq!(cfg.classifier_batch_size, 16);
        assert_eq!(cfg.requested_core_mask, None);
    }

    #[test]
    fn builder_overrides_one_field_and_defaults_the_rest() {
        let cfg = DatapathConfigBuilder::default()
            .emc_shift(10)
            .build()
            .unwrap_or_else(|_| unreachable!());
        assert_eq!(cfg.emc_shift, 10);
        assert_eq!(cfg.emc_segs, 2);
    }

    #[test]
    fn partial_yaml_fills_in_missing_fields_with_defaults() {
        let cfg: DatapathConfig = serde_yaml_ng::from_str("emc_shift: 11\n").unwrap_or_else(|_| unreachable!());
        assert_eq!(cfg.emc_shift, 11);
        assert_eq!(cfg.flow_table_capacity, 65_536);
    }

    #[test]
    fn core_mask_parses_hex_string() {
        let cfg = DatapathConfig {
            requested_core_mask: Some("0x0f".to_string()),
            ..DatapathConfig::default()
        };
        assert_eq!(cfg.core_mask().unwrap_or_else(|_| unreachable!()), Some(0x0f));
    }

    #[test]
    fn core_mask_rejects_non_hex_strings() {
        let cfg = DatapathConfig {
            requested_core_mask: Some("15".to_string()),
            ..DatapathConfig::default()
        };
        assert!(cfg.core_mask().is_err());
    }

    #[test]
    fn no_core_mask_is_none() {
        let cfg = DatapathConfig::default();
        assert_eq!(cfg.core_mask().unwrap_or_else(|_| unreachable!()), None);
    }
}
