//! # Domain Errors
//!
//! Error types for the shard federation engine.
//!
//! Per-shard failures are values (`ShardFailure`), collected while sibling
//! shards keep running. Only validation errors fail fast.

use std::fmt;

use thiserror::Error;

use super::value_objects::{ShardId, TransactionState};

/// One shard's failure inside a federated operation.
#[derive(Clone, Debug, PartialEq)]
pub struct ShardFailure {
    /// Shard that failed.
    pub shard_id: ShardId,
    /// What went wrong on that shard.
    pub error: FederationError,
}

impl ShardFailure {
    /// Create a new shard failure.
    pub fn new(shard_id: ShardId, error: FederationError) -> Self {
        Self { shard_id, error }
    }
}

impl fmt::Display for ShardFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.shard_id, self.error)
    }
}

/// Federation error types.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum FederationError {
    /// A queued deferred event failed to apply against its materialized target.
    #[error("Configuration replay failed on {shard_id} for {event}: {reason}")]
    ConfigurationReplay {
        /// Shard whose replay failed
        shard_id: ShardId,
        /// Description of the offending event
        event: String,
        /// Underlying failure
        reason: String,
    },

    /// A shard's query or operation raised an error.
    #[error("Execution failed on {shard_id}: {reason}")]
    ShardExecution {
        /// Shard that failed
        shard_id: ShardId,
        /// Underlying failure
        reason: String,
    },

    /// Transaction operation invoked outside its valid state.
    #[error("Cannot {operation} transaction in state {state:?}")]
    TransactionState {
        /// Attempted operation
        operation: &'static str,
        /// State at the time of the call
        state: TransactionState,
    },

    /// One or more participants failed to commit. No compensation is attempted.
    #[error("Partial commit failure: {} committed, {} failed ({})", committed.len(), failures.len(), join_failures(failures))]
    PartialCommitFailure {
        /// Shards that committed
        committed: Vec<ShardId>,
        /// Shards that failed to commit
        failures: Vec<ShardFailure>,
    },

    /// One or more participants failed to roll back.
    #[error("Partial rollback failure: {} rolled back, {} failed ({})", rolled_back.len(), failures.len(), join_failures(failures))]
    PartialRollbackFailure {
        /// Shards that rolled back
        rolled_back: Vec<ShardId>,
        /// Shards that failed to roll back
        failures: Vec<ShardFailure>,
    },

    /// A federated operation completed on some shards only.
    #[error("Federated operation failed on {} shard(s): {}", failures.len(), join_failures(failures))]
    PartialFailure {
        /// Failed shards
        failures: Vec<ShardFailure>,
    },

    /// Unknown shard ID.
    #[error("Unknown shard: {0}")]
    UnknownShard(ShardId),

    /// Named fetch profile does not exist on the shard's schema.
    #[error("Unknown fetch profile: {0}")]
    UnknownFetchProfile(String),

    /// Shard operation exceeded its time budget.
    #[error("{shard_id} timed out after {millis}ms")]
    Timeout {
        /// Shard that timed out
        shard_id: ShardId,
        /// Budget in milliseconds
        millis: u64,
    },

    /// Malformed dotted property path.
    #[error("Invalid property path: {0:?}")]
    InvalidPropertyPath(String),

    /// Query could not be built.
    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    /// A unique result was requested but several rows matched.
    #[error("Expected a unique result, got {0} rows")]
    NonUniqueResult(usize),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Error reported by the underlying store.
    #[error("Store error: {0}")]
    Store(String),
}

impl FederationError {
    /// Wrap an arbitrary store error as a shard execution failure.
    pub fn shard_execution(shard_id: ShardId, err: impl fmt::Display) -> Self {
        Self::ShardExecution {
            shard_id,
            reason: err.to_string(),
        }
    }

    /// Shard failures carried by this error, if any.
    pub fn shard_failures(&self) -> &[ShardFailure] {
        match self {
            Self::PartialCommitFailure { failures, .. }
            | Self::PartialRollbackFailure { failures, .. }
            | Self::PartialFailure { failures } => failures,
            _ => &[],
        }
    }
}

fn join_failures(failures: &[ShardFailure]) -> String {
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
