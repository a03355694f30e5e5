//! # Shard Assignment Algorithm
//!
//! Deterministic key-to-shard assignment and shard-encoded identifiers.

use sha3::{Digest, Keccak256};
use uuid::Uuid;

use crate::domain::{ShardId, Value};

/// Rendezvous hashing for minimal reassignment.
///
/// When a shard is added, only about 1/N keys move to it.
/// Also known as "highest random weight" hashing.
///
/// Returns `None` only when `shards` is empty.
pub fn rendezvous_assign(key: &Value, shards: &[ShardId]) -> Option<ShardId> {
    match shards {
        [] => None,
        [only] => Some(*only),
        _ => {
            let mut input = key.key_bytes();
            let key_len = input.len();
            input.extend_from_slice(&[0, 0]);

            let mut best: Option<(ShardId, [u8; 32])> = None;
            for shard in shards {
                input[key_len..].copy_from_slice(&shard.get().to_be_bytes());
                let weight = keccak256(&input);
                if best.map_or(true, |(_, w)| weight > w) {
                    best = Some((*shard, weight));
                }
            }
            best.map(|(shard, _)| shard)
        }
    }
}

/// Generate a random identifier that records the shard it was created on.
///
/// The shard id occupies the first two bytes; the UUID keeps its v4
/// version and variant bits.
pub fn generate_sharded_id(shard_id: ShardId) -> Uuid {
    let mut bytes = *Uuid::new_v4().as_bytes();
    bytes[..2].copy_from_slice(&shard_id.get().to_be_bytes());
    Uuid::from_bytes(bytes)
}

/// Recover the shard encoded by [`generate_sharded_id`].
pub fn shard_of_id(id: &Uuid) -> ShardId {
    let bytes = id.as_bytes();
    ShardId(u16::from_be_bytes([bytes[0], bytes[1]]))
}

/// Helper: keccak256 hash.
fn keccak256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Keccak256::new();
    hasher.update(data);
    let result = hasher.finalize();
    let mut output = [0u8; 32];
    output.copy_from_slice(&result);
    output
}
