use std::fs;
use std::path::Path;

use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::model::{
    DEFAULT_CLAIM_TTL_SECS, DEFAULT_HEARTBEAT_INTERVAL_SECS, DEFAULT_HINT_TTL_SECS,
    DEFAULT_INACTIVITY_THRESHOLD_SECS, DEFAULT_STALE_THRESHOLD_SECS, secs,
};

pub const CONFIG_VERSION: u32 = 1;

/// Contents of `.hive/config.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default)]
    pub coordination: CoordinationConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoordinationConfig {
    #[serde(default = "default_claim_ttl")]
    pub claim_ttl_secs: u64,
    #[serde(default = "default_hint_ttl")]
    pub hint_ttl_secs: u64,
    #[serde(default = "default_heartbeat_interval")]
    pub heartbeat_interval_secs: u64,
    #[serde(default = "default_inactivity_threshold")]
    pub inactivity_threshold_secs: u64,
    #[serde(default = "default_stale_threshold")]
    pub stale_threshold_secs: u64,
}

fn default_version() -> u32 {
    CONFIG_VERSION
}

fn default_claim_ttl() -> u64 {
    DEFAULT_CLAIM_TTL_SECS
}

fn default_hint_ttl() -> u64 {
    DEFAULT_HINT_TTL_SECS
}

fn default_heartbeat_interval() -> u64 {
    DEFAULT_HEARTBEAT_INTERVAL_SECS
}

fn default_inactivity_threshold() -> u64 {
    DEFAULT_INACTIVITY_THRESHOLD_SECS
}

fn default_stale_threshold() -> u64 {
    DEFAULT_STALE_THRESHOLD_SECS
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            coordination: CoordinationConfig::default(),
        }
    }
}

impl Default for CoordinationConfig {
    fn default() -> Self {
        Self {
            claim_ttl_secs: default_claim_ttl(),
            hint_ttl_secs: default_hint_ttl(),
            heartbeat_interval_secs: default_heartbeat_interval(),
            inactivity_threshold_secs: default_inactivity_threshold(),
            stale_threshold_secs: default_stale_threshold(),
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }
}

/// Time windows that drive lease lengths and agent liveness.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LeasePolicy {
    pub claim_ttl: Duration,
    pub hint_ttl: Duration,
    pub heartbeat_interval: Duration,
    /// Agents idle longer than this are Inactive and drop out of conflict detection.
    pub inactivity_threshold: Duration,
    /// Agents idle longer than this are Gone.
    pub stale_threshold: Duration,
}

impl Default for LeasePolicy {
    fn default() -> Self {
        CoordinationConfig::default().policy()
    }
}

impl CoordinationConfig {
    pub fn policy(&self) -> LeasePolicy {
        LeasePolicy {
            claim_ttl: secs(self.claim_ttl_secs),
            hint_ttl: secs(self.hint_ttl_secs),
            heartbeat_interval: secs(self.heartbeat_interval_secs),
            inactivity_threshold: secs(self.inactivity_threshold_secs),
            stale_threshold: secs(self.stale_threshold_secs),
        }
    }
}
