//! # Shard Selection
//!
//! Picks the single shard that will own a newly persisted record.

use std::sync::atomic::{AtomicUsize, Ordering};

use crate::algorithms::shard_assignment::rendezvous_assign;
use crate::domain::{PropertyPath, Record, ShardId, Value};

/// Chooses the owning shard for a new record.
pub trait ShardSelectionStrategy: Send + Sync {
    /// Shard that will own `record` of `entity`.
    fn select_shard_for_new_object(&self, entity: &str, record: &Record) -> ShardId;
}

/// Cycles through shards in configured order.
#[derive(Debug)]
pub struct RoundRobinSelectionStrategy {
    shard_ids: Vec<ShardId>,
    next: AtomicUsize,
}

impl RoundRobinSelectionStrategy {
    /// Cycle over `shard_ids`, which must not be empty.
    pub fn new(shard_ids: Vec<ShardId>) -> Self {
        Self {
            shard_ids,
            next: AtomicUsize::new(0),
        }
    }

    fn next_shard(&self) -> ShardId {
        let i = self.next.fetch_add(1, Ordering::Relaxed);
        self.shard_ids
            .get(i % self.shard_ids.len().max(1))
            .copied()
            .unwrap_or(ShardId(0))
    }
}

impl ShardSelectionStrategy for RoundRobinSelectionStrategy {
    fn select_shard_for_new_object(&self, _entity: &str, _record: &Record) -> ShardId {
        self.next_shard()
    }
}

/// Hashes a shard-key property; deterministic for a given key.
///
/// Records without the key fall back to round-robin.
#[derive(Debug)]
pub struct ShardKeySelectionStrategy {
    key: PropertyPath,
    shard_ids: Vec<ShardId>,
    fallback: RoundRobinSelectionStrategy,
}

impl ShardKeySelectionStrategy {
    /// Hash `key` over `shard_ids`.
    pub fn new(key: PropertyPath, shard_ids: Vec<ShardId>) -> Self {
        Self {
            key,
            fallback: RoundRobinSelectionStrategy::new(shard_ids.clone()),
            shard_ids,
        }
    }

    /// Shard key property.
    pub fn key(&self) -> &PropertyPath {
        &self.key
    }

    /// Shard owning records whose key equals `value`.
    pub fn shard_for_key(&self, value: &Value) -> Option<ShardId> {
        if value.is_null() {
            return None;
        }
        rendezvous_assign(value, &self.shard_ids)
    }
}

impl ShardSelectionStrategy for ShardKeySelectionStrategy {
    fn select_shard_for_new_object(&self, entity: &str, record: &Record) -> ShardId {
        let key = self.key.resolve(record);
        self.shard_for_key(&key)
            .unwrap_or_else(|| self.fallback.select_shard_for_new_object(entity, record))
    }
}
