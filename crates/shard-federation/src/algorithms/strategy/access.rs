//! # Shard Access
//!
//! Decides which shards a federated query must visit.

use std::sync::Arc;

use crate::domain::{FederatedQuery, Filter, ShardId};

use super::selection::ShardKeySelectionStrategy;

/// Candidate shards for a query.
pub trait ShardAccessStrategy: Send + Sync {
    /// Shards that may hold rows matching `query`.
    fn select_shards_for_query(&self, query: &FederatedQuery) -> Vec<ShardId>;
}

/// Every query visits every shard.
#[derive(Debug, Clone)]
pub struct AllShardsAccessStrategy {
    shard_ids: Vec<ShardId>,
}

impl AllShardsAccessStrategy {
    /// Visit `shard_ids`.
    pub fn new(shard_ids: Vec<ShardId>) -> Self {
        Self { shard_ids }
    }
}

impl ShardAccessStrategy for AllShardsAccessStrategy {
    fn select_shards_for_query(&self, _query: &FederatedQuery) -> Vec<ShardId> {
        self.shard_ids.clone()
    }
}

/// Prunes to the owning shards when the query pins the shard key.
///
/// Uses the same hash as the paired selection strategy, so a record saved
/// with key `k` is always found by a query filtering `key == k`.
#[derive(Debug, Clone)]
pub struct ShardKeyAccessStrategy {
    selection: Arc<ShardKeySelectionStrategy>,
    shard_ids: Vec<ShardId>,
}

impl ShardKeyAccessStrategy {
    /// Prune with `selection`'s key and hash.
    pub fn new(selection: Arc<ShardKeySelectionStrategy>, shard_ids: Vec<ShardId>) -> Self {
        Self {
            selection,
            shard_ids,
        }
    }
}

impl ShardAccessStrategy for ShardKeyAccessStrategy {
    fn select_shards_for_query(&self, query: &FederatedQuery) -> Vec<ShardId> {
        let key = self.selection.key();
        let pinned = query.filters.iter().find_map(|filter| match filter {
            Filter::Eq(path, value) if path == key => Some(vec![value.clone()]),
            Filter::In(path, values) if path == key => Some(values.clone()),
            _ => None,
        });

        let Some(keys) = pinned else {
            return self.shard_ids.clone();
        };

        let mut shards = Vec::new();
        for value in &keys {
            match self.selection.shard_for_key(value) {
                Some(shard) if !shards.contains(&shard) => shards.push(shard),
                Some(_) => {}
                // A null key cannot be hashed; no narrowing is possible.
                None => return self.shard_ids.clone(),
            }
        }
        shards
    }
}
