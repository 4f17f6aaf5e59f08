pub mod settings;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// What `delete` does when its range starts at a tear-off entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TearoffDeletePolicy {
    /// Start the range after the tear-off entry.
    #[default]
    Skip,
    /// Refuse the whole deletion with an invalid-index error.
    Reject,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EngineConfig {
    /// `tearoff` value for menus created without one.
    pub tearoff_by_default: bool,
    pub tearoff_delete_policy: TearoffDeletePolicy,
    /// Upper bound on simultaneously live native handles, for the headless
    /// platform. `None` is unbounded.
    pub max_native_handles: Option<usize>,
    /// How many recent platform calls the headless journal keeps. `None`
    /// keeps them all.
    pub journal_limit: Option<usize>,
    /// Default `tracing` filter when `RUST_LOG` is unset.
    pub log_filter: String,
}

impl EngineConfig {
    pub fn load(path: Option<&Path>) -> Result<Self> {
        settings::load_config(path)
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            tearoff_by_default: true,
            tearoff_delete_policy: TearoffDeletePolicy::Skip,
            max_native_handles: None,
            journal_limit: Some(4096),
            log_filter: "info".to_string(),
        }
    }
}
