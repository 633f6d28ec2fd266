// Service policy configuration

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Bridge policy configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BridgeConfig {
    /// Clear the started flag when a start attempt fails, so the next start
    /// command retries instead of replying "already started"
    #[serde(rename = "retryOnError", alias = "retry_on_error", default)]
    pub retry_on_error: bool,
    /// Cap on the persisted dedup list; oldest message ids are dropped first
    #[serde(
        rename = "maxPersistentIds",
        alias = "max_persistent_ids",
        default = "default_max_persistent_ids"
    )]
    pub max_persistent_ids: usize,
}

fn default_max_persistent_ids() -> usize {
    256
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            retry_on_error: false,
            max_persistent_ids: default_max_persistent_ids(),
        }
    }
}

/// Load configuration from a TOML file, falling back to defaults when the
/// path is absent or the file does not exist
pub fn load_config(path: Option<&Path>) -> Result<BridgeConfig> {
    let Some(path) = path else {
        return Ok(BridgeConfig::default());
    };
    if !path.exists() {
        return Ok(BridgeConfig::default());
    }

    let content = fs::read_to_string(path)
        .map_err(|e| anyhow!("Failed to read config file {:?}: {}", path, e))?;
    toml::from_str(&content).map_err(|e| anyhow!("Failed to parse config {:?}: {}", path, e))
}
