//! # Algorithms Module
//!
//! Routing and result-merging algorithms for shard federation.

pub mod exit_operations;
pub mod shard_assignment;
pub mod strategy;

pub use exit_operations::{
    AggregateExitOperation, DistinctExitOperation, ExitOperation, ExitOperationPipeline,
    OrderExitOperation, ProjectionExitOperation, RowLimitExitOperation,
};
pub use shard_assignment::{generate_sharded_id, rendezvous_assign, shard_of_id};
pub use strategy::{
    AllShardsAccessStrategy, AllShardsResolutionStrategy, RoundRobinSelectionStrategy,
    ShardAccessStrategy, ShardEncodedIdResolutionStrategy, ShardKeyAccessStrategy,
    ShardKeySelectionStrategy, ShardResolutionStrategy, ShardSelectionStrategy, ShardStrategy,
};
