//! Shared fixtures for integration tests and benchmarks.

use std::sync::Arc;

use shard_federation::{
    ExecutionMode, FederationConfig, InMemoryShardStore, Record, ShardId, ShardStrategy,
    ShardedSession, Value,
};

/// Shards used by every fixture.
pub fn shard_ids() -> Vec<ShardId> {
    (0..3).map(ShardId).collect()
}

/// Test config in the given mode.
pub fn config(mode: ExecutionMode) -> FederationConfig {
    FederationConfig {
        shard_ids: shard_ids(),
        execution_mode: mode,
        ..FederationConfig::for_testing()
    }
}

/// Empty in-memory store over [`shard_ids`].
pub fn store() -> InMemoryShardStore {
    federation_telemetry::init_test_telemetry();
    InMemoryShardStore::with_shards(&shard_ids())
}

/// Round-robin session over `store`.
pub fn session(store: &InMemoryShardStore, mode: ExecutionMode) -> ShardedSession<InMemoryShardStore> {
    let config = config(mode);
    let strategy = ShardStrategy::round_robin(config.shard_ids.clone());
    match ShardedSession::new(config, Arc::new(store.clone()), strategy) {
        Ok(session) => session,
        Err(e) => panic!("fixture session: {e}"),
    }
}

/// A person row.
pub fn person(name: &str, age: i64, city: &str) -> Record {
    Record::new()
        .with("name", name)
        .with("age", age)
        .with("address", Record::new().with("city", city))
}

/// Seed people across shards as `(shard, name, age, city)`.
pub fn seed_people(store: &InMemoryShardStore, rows: &[(u16, &str, i64, &str)]) {
    for (shard, name, age, city) in rows {
        store.insert(ShardId(*shard), "Person", person(name, *age, city));
    }
}

/// Default people: two or three per shard.
pub fn seed_default_people(store: &InMemoryShardStore) {
    seed_people(
        store,
        &[
            (0, "tomislav", 2, "zagreb"),
            (0, "gut", 5, "berlin"),
            (1, "bomb", 1, "paris"),
            (1, "max", 27, "berlin"),
            (2, "maulik", 2, "mumbai"),
        ],
    );
}

/// A field of a row, as text.
pub fn text(row: &Value, field: &str) -> Option<String> {
    row.as_record()?.get(field)?.as_str().map(str::to_string)
}

/// A field of a row, as an integer.
pub fn int(row: &Value, field: &str) -> Option<i64> {
    row.as_record()?.get(field)?.as_i64()
}
