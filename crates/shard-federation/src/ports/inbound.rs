//! # Inbound Ports
//!
//! API trait defining what a federated session can do.

use async_trait::async_trait;

use crate::domain::{FederatedQuery, FederatedResult, FederationError, Record, ShardId, Value};

/// Federated session API - inbound port.
#[async_trait]
pub trait FederatedSessionApi: Send + Sync {
    /// Configured shards.
    fn shard_ids(&self) -> &[ShardId];

    /// Persist a new record; returns the owning shard.
    async fn save(&self, entity: &str, record: Record) -> Result<ShardId, FederationError>;

    /// Look up a record by identifier.
    async fn get(&self, entity: &str, id: &Value) -> Result<Option<Value>, FederationError>;

    /// Run a federated query.
    async fn list(&self, query: &FederatedQuery) -> Result<FederatedResult, FederationError>;

    /// Run a federated query expected to match at most one row.
    async fn unique_result(&self, query: &FederatedQuery)
        -> Result<Option<Value>, FederationError>;

    /// Start a sharded transaction.
    async fn begin_transaction(&self) -> Result<(), FederationError>;

    /// Commit the sharded transaction.
    async fn commit(&self) -> Result<(), FederationError>;

    /// Roll back the sharded transaction.
    async fn rollback(&self) -> Result<(), FederationError>;

    /// Close every opened shard session.
    async fn close(&self) -> Result<(), FederationError>;
}
