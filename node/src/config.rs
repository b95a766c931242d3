//! Node configuration with TOML file support.

use serde::{Deserialize, Serialize};
use std::path::Path;

use accord_types::{ChainId, ConsensusParams};

use crate::NodeError;

/// Configuration for an Accord agreement-layer node.
///
/// Can be loaded from a TOML file via [`NodeConfig::from_toml_file`] or
/// built programmatically (e.g. for tests). The consensus parameters are
/// network constants handed to this node, not something it owns.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NodeConfig {
    /// Chains this node participates in.
    #[serde(default = "default_chains")]
    pub chains: Vec<u16>,

    /// Consensus parameters (intervals, thresholds, bucket lifetime).
    #[serde(default)]
    pub consensus: ConsensusParams,

    /// Log format: "human" or "json".
    #[serde(default = "default_log_format")]
    pub log_format: String,

    /// Log level filter: "trace", "debug", "info", "warn", "error".
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Whether to enable the Prometheus metrics endpoint.
    #[serde(default)]
    pub enable_metrics: bool,
}

fn default_chains() -> Vec<u16> {
    vec![ChainId::MAIN.as_u16()]
}

fn default_log_format() -> String {
    "human".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            chains: default_chains(),
            consensus: ConsensusParams::default(),
            log_format: default_log_format(),
            log_level: default_log_level(),
            enable_metrics: false,
        }
    }
}

impl NodeConfig {
    /// Load configuration from a TOML file.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, NodeError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_toml_str(&raw)
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml_str(raw: &str) -> Result<Self, NodeError> {
        let config: Self =
            toml::from_str(raw).map_err(|e| NodeError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject configurations the node must not start with.
    pub fn validate(&self) -> Result<(), NodeError> {
        if self.chains.is_empty() {
            return Err(NodeError::Config("no chains configured".into()));
        }
        self.consensus
            .validate()
            .map_err(|e| NodeError::Config(e.to_string()))
    }

    /// The configured chains as typed identifiers.
    pub fn chain_ids(&self) -> Vec<ChainId> {
        self.chains.iter().copied().map(ChainId::new).collect()
    }
}
