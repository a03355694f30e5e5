//! # Federation Configuration
//!
//! Shard set and execution policy for one federation.

use serde::{Deserialize, Serialize};

use crate::domain::{invariant_unique_shard_ids, FederationError, ShardId, MAX_SHARD_COUNT};

/// How a federated operation fans out across shards.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionMode {
    /// One shard at a time, in target order.
    Sequential,
    /// All target shards concurrently; results merged after every shard joins.
    #[default]
    Parallel,
}

/// Federation configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FederationConfig {
    /// Configured shards, in iteration order.
    pub shard_ids: Vec<ShardId>,

    /// Fan-out mode.
    pub execution_mode: ExecutionMode,

    /// Per-shard operation budget in milliseconds; `None` waits indefinitely.
    pub shard_timeout_ms: Option<u64>,

    /// Timeout applied to every transaction participant, in seconds.
    pub transaction_timeout_secs: Option<u32>,

    /// Ask each shard for at most `offset + limit` rows when that is exact.
    pub push_down_limit: bool,
}

impl Default for FederationConfig {
    fn default() -> Self {
        Self {
            shard_ids: (0..4).map(ShardId).collect(),
            execution_mode: ExecutionMode::Parallel,
            shard_timeout_ms: Some(30_000),
            transaction_timeout_secs: None,
            push_down_limit: true,
        }
    }
}

impl FederationConfig {
    /// Create a config for testing (three shards, sequential, short timeout).
    pub fn for_testing() -> Self {
        Self {
            shard_ids: (0..3).map(ShardId).collect(),
            execution_mode: ExecutionMode::Sequential,
            shard_timeout_ms: Some(1_000),
            transaction_timeout_secs: None,
            push_down_limit: true,
        }
    }

    /// Parse from JSON; missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, FederationError> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| FederationError::ConfigError(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Check the shard set and timeouts.
    pub fn validate(&self) -> Result<(), FederationError> {
        invariant_unique_shard_ids(&self.shard_ids)?;
        if self.shard_ids.len() > MAX_SHARD_COUNT {
            return Err(FederationError::ConfigError(format!(
                "{} shards exceeds the maximum of {}",
                self.shard_ids.len(),
                MAX_SHARD_COUNT
            )));
        }
        if self.shard_timeout_ms == Some(0) {
            return Err(FederationError::ConfigError(
                "shard_timeout_ms must be positive".to_string(),
            ));
        }
        Ok(())
    }
}
