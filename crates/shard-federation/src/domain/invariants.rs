//! # Domain Invariants
//!
//! Rules that must always hold for shard federation.

use std::collections::HashSet;

use super::errors::FederationError;
use super::value_objects::{ShardId, TransactionState};

/// Maximum number of shards in one federation.
pub const MAX_SHARD_COUNT: usize = u16::MAX as usize + 1;

/// Invariant: shard ids in a federation are unique and the set is non-empty.
pub fn invariant_unique_shard_ids(shard_ids: &[ShardId]) -> Result<(), FederationError> {
    if shard_ids.is_empty() {
        return Err(FederationError::ConfigError(
            "at least one shard is required".to_string(),
        ));
    }

    let mut seen = HashSet::with_capacity(shard_ids.len());
    for id in shard_ids {
        if !seen.insert(id) {
            return Err(FederationError::ConfigError(format!(
                "duplicate shard id {}",
                id
            )));
        }
    }
    Ok(())
}

/// Invariant: routing never misses a shard.
///
/// Narrowed candidate sets are restricted to known shards and de-duplicated;
/// if nothing usable remains, every shard is returned.
pub fn invariant_fail_closed(candidates: Vec<ShardId>, all_shards: &[ShardId]) -> Vec<ShardId> {
    let mut seen = HashSet::with_capacity(candidates.len());
    let narrowed: Vec<ShardId> = candidates
        .into_iter()
        .filter(|id| all_shards.contains(id) && seen.insert(*id))
        .collect();

    if narrowed.is_empty() {
        all_shards.to_vec()
    } else {
        narrowed
    }
}

/// Invariant: an aggregate transaction status holds only if every
/// participant reports it. An empty participant set trivially holds.
pub fn invariant_all_participants(
    outcomes: &[(ShardId, TransactionState)],
    status: TransactionState,
) -> bool {
    outcomes.iter().all(|(_, s)| *s == status)
}
