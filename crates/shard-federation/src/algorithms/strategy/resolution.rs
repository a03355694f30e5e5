//! # Shard Resolution
//!
//! Maps an (entity, identifier) pair to the shards that might hold it.

use uuid::Uuid;

use crate::algorithms::shard_assignment::shard_of_id;
use crate::domain::{ShardId, Value};

/// Candidate shards for an identifier lookup.
pub trait ShardResolutionStrategy: Send + Sync {
    /// Shards that may contain `entity` with identifier `id`.
    fn select_shards_for_id(&self, entity: &str, id: &Value) -> Vec<ShardId>;
}

/// Every shard is a candidate.
#[derive(Debug, Clone)]
pub struct AllShardsResolutionStrategy {
    shard_ids: Vec<ShardId>,
}

impl AllShardsResolutionStrategy {
    /// Resolve to `shard_ids`.
    pub fn new(shard_ids: Vec<ShardId>) -> Self {
        Self { shard_ids }
    }
}

impl ShardResolutionStrategy for AllShardsResolutionStrategy {
    fn select_shards_for_id(&self, _entity: &str, _id: &Value) -> Vec<ShardId> {
        self.shard_ids.clone()
    }
}

/// Decodes the shard from ids made by `generate_sharded_id`.
///
/// Ids that are not UUID text, or that name an unknown shard, resolve to
/// every shard.
#[derive(Debug, Clone)]
pub struct ShardEncodedIdResolutionStrategy {
    shard_ids: Vec<ShardId>,
}

impl ShardEncodedIdResolutionStrategy {
    /// Resolve against `shard_ids`.
    pub fn new(shard_ids: Vec<ShardId>) -> Self {
        Self { shard_ids }
    }
}

impl ShardResolutionStrategy for ShardEncodedIdResolutionStrategy {
    fn select_shards_for_id(&self, _entity: &str, id: &Value) -> Vec<ShardId> {
        let decoded = id
            .as_str()
            .and_then(|text| Uuid::parse_str(text).ok())
            .map(|uuid| shard_of_id(&uuid))
            .filter(|shard| self.shard_ids.contains(shard));

        match decoded {
            Some(shard) => vec![shard],
            None => self.shard_ids.clone(),
        }
    }
}
