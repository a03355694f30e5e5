//! # Application Module
//!
//! Services orchestrating the domain, algorithms and outbound ports.

pub mod executor;
pub mod service;
pub mod shard;
pub mod transaction;

pub use executor::{CrossShardExecutor, ShardResults};
pub use service::ShardedSession;
pub use shard::{Shard, SharedShard};
pub use transaction::ShardedTransaction;
