//! # Shard Strategy
//!
//! Pluggable selection, resolution and access policies, bundled so that
//! every routing decision fails closed: when a policy cannot narrow the
//! target set it gets the full shard set, never a guess.

pub mod access;
pub mod resolution;
pub mod selection;

pub use access::{AllShardsAccessStrategy, ShardAccessStrategy, ShardKeyAccessStrategy};
pub use resolution::{
    AllShardsResolutionStrategy, ShardEncodedIdResolutionStrategy, ShardResolutionStrategy,
};
pub use selection::{RoundRobinSelectionStrategy, ShardKeySelectionStrategy, ShardSelectionStrategy};

use std::sync::Arc;

use tracing::debug;

use crate::domain::{
    invariant_fail_closed, FederatedQuery, PropertyPath, Record, ShardId, Value,
};

/// Selection, resolution and access policies for one federation.
#[derive(Clone)]
pub struct ShardStrategy {
    shard_ids: Vec<ShardId>,
    selection: Arc<dyn ShardSelectionStrategy>,
    resolution: Arc<dyn ShardResolutionStrategy>,
    access: Arc<dyn ShardAccessStrategy>,
}

impl ShardStrategy {
    /// Bundle custom policies over `shard_ids`.
    pub fn new(
        shard_ids: Vec<ShardId>,
        selection: Arc<dyn ShardSelectionStrategy>,
        resolution: Arc<dyn ShardResolutionStrategy>,
        access: Arc<dyn ShardAccessStrategy>,
    ) -> Self {
        Self {
            shard_ids,
            selection,
            resolution,
            access,
        }
    }

    /// Round-robin selection, shard-encoded id resolution, all-shard access.
    pub fn round_robin(shard_ids: Vec<ShardId>) -> Self {
        Self::new(
            shard_ids.clone(),
            Arc::new(RoundRobinSelectionStrategy::new(shard_ids.clone())),
            Arc::new(ShardEncodedIdResolutionStrategy::new(shard_ids.clone())),
            Arc::new(AllShardsAccessStrategy::new(shard_ids)),
        )
    }

    /// Hash `key` for selection and prune queries that pin it.
    pub fn shard_key(key: PropertyPath, shard_ids: Vec<ShardId>) -> Self {
        let selection = Arc::new(ShardKeySelectionStrategy::new(key, shard_ids.clone()));
        Self::new(
            shard_ids.clone(),
            selection.clone(),
            Arc::new(ShardEncodedIdResolutionStrategy::new(shard_ids.clone())),
            Arc::new(ShardKeyAccessStrategy::new(selection, shard_ids)),
        )
    }

    /// Every configured shard.
    pub fn shard_ids(&self) -> &[ShardId] {
        &self.shard_ids
    }

    /// Owner of a new record. Falls back to the first shard if the policy
    /// names an unknown one.
    pub fn select(&self, entity: &str, record: &Record) -> ShardId {
        let picked = self.selection.select_shard_for_new_object(entity, record);
        let owner = invariant_fail_closed(vec![picked], &self.shard_ids)
            .first()
            .copied()
            .unwrap_or(picked);
        debug!("[shard-fed] Selected {} for new {}", owner, entity);
        owner
    }

    /// Candidate shards for an identifier lookup.
    pub fn resolve(&self, entity: &str, id: &Value) -> Vec<ShardId> {
        invariant_fail_closed(
            self.resolution.select_shards_for_id(entity, id),
            &self.shard_ids,
        )
    }

    /// Candidate shards for a query.
    pub fn access(&self, query: &FederatedQuery) -> Vec<ShardId> {
        let targets = invariant_fail_closed(
            self.access.select_shards_for_query(query),
            &self.shard_ids,
        );
        debug!(
            "[shard-fed] {} on {} targets {}/{} shards",
            query.id,
            query.entity,
            targets.len(),
            self.shard_ids.len()
        );
        targets
    }
}

impl std::fmt::Debug for ShardStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShardStrategy")
            .field("shard_ids", &self.shard_ids)
            .finish_non_exhaustive()
    }
}
