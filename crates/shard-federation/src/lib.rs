//! # Shard Federation
//!
//! Presents several independent data stores ("shards") as one logical
//! store.
//!
//! **Architecture:** Hexagonal (DDD + Ports/Adapters)
//!
//! ## Purpose
//!
//! - Route new records to one shard and identifier lookups to candidate shards
//! - Fan queries out to every relevant shard and merge the results in memory
//!   (ordering, aggregation, projection, distinct, row limits)
//! - Defer session and query configuration until a shard is first used
//! - Coordinate one local transaction per touched shard, best effort
//!
//! ## Transaction Semantics
//!
//! | Operation | Behavior |
//! |-----------|----------|
//! | commit | Every participant attempted; partial failure leaves some shards committed |
//! | rollback | Every non-committed participant attempted; failures collected |
//! | atomicity | None; no prepare phase, no compensation |
//!
//! ## Module Structure
//!
//! ```text
//! shard-federation/
//! ├── domain/          # Values, property paths, queries, deferred events, errors
//! ├── algorithms/      # Shard assignment, shard strategies, exit operations
//! ├── application/     # Shard handle, executor, transaction, sharded session
//! ├── ports/           # API trait + store traits
//! ├── adapters/        # In-memory store
//! └── config.rs        # Federation configuration
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod adapters;
pub mod algorithms;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;

// Re-exports
pub use adapters::{FailurePoint, InMemorySession, InMemoryShardStore, InMemoryTransaction};
pub use algorithms::{
    generate_sharded_id, rendezvous_assign, shard_of_id, AggregateExitOperation,
    AllShardsAccessStrategy, AllShardsResolutionStrategy, DistinctExitOperation, ExitOperation,
    ExitOperationPipeline, OrderExitOperation, ProjectionExitOperation,
    RoundRobinSelectionStrategy, RowLimitExitOperation, ShardAccessStrategy,
    ShardEncodedIdResolutionStrategy, ShardKeyAccessStrategy, ShardKeySelectionStrategy,
    ShardResolutionStrategy, ShardSelectionStrategy, ShardStrategy,
};
pub use application::{
    CrossShardExecutor, Shard, ShardResults, ShardedSession, ShardedTransaction, SharedShard,
};
pub use config::{ExecutionMode, FederationConfig};
pub use domain::{
    invariant_all_participants, invariant_fail_closed, invariant_unique_shard_ids,
    AggregateFunction, AggregateSpec, CacheMode, CriteriaEvent, FederatedQuery,
    FederatedQueryBuilder, FederatedResult, FederationError, Filter, FlushMode, InMemoryOrderBy,
    OpenSessionEvent, ProjectionSpec, Property, PropertyPath, PropertySource, QueryId,
    QueryOptions, Record, ShardFailure, ShardId, ShardQuery, SortDirection, TransactionState,
    Value, ID_PROPERTY, MAX_SHARD_COUNT,
};
pub use ports::{
    FederatedSessionApi, ShardSession, ShardStore, ShardTransaction, TransactionSynchronization,
};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
