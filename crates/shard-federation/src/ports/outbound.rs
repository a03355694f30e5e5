//! # Outbound Ports
//!
//! Capabilities the federation engine needs from each underlying store.
//! The engine never sees a concrete store API, only these traits.

use async_trait::async_trait;

use crate::domain::{
    CacheMode, FederationError, FlushMode, Record, ShardId, ShardQuery, TransactionState, Value,
};

/// Opens per-shard sessions.
#[async_trait]
pub trait ShardStore: Send + Sync {
    /// Session type produced by this store.
    type Session: ShardSession;

    /// Open a new session against `shard_id`.
    async fn open_session(&self, shard_id: ShardId) -> Result<Self::Session, FederationError>;
}

/// One shard's session. Not safe for concurrent use; the engine serializes
/// access per shard.
#[async_trait]
pub trait ShardSession: Send {
    /// Shard this session is bound to.
    fn shard_id(&self) -> ShardId;

    /// Enable a named fetch profile.
    fn enable_fetch_profile(&mut self, name: &str) -> Result<(), FederationError>;

    /// Disable a named fetch profile.
    fn disable_fetch_profile(&mut self, name: &str) -> Result<(), FederationError>;

    /// Default read-only flag for entities loaded by this session.
    fn set_default_read_only(&mut self, read_only: bool);

    /// Cache interaction mode.
    fn set_cache_mode(&mut self, mode: CacheMode);

    /// Flush policy.
    fn set_flush_mode(&mut self, mode: FlushMode);

    /// Run the shard-local form of a query.
    async fn execute(&mut self, query: &ShardQuery) -> Result<Vec<Value>, FederationError>;

    /// Persist a new record.
    async fn save(&mut self, entity: &str, record: Record) -> Result<(), FederationError>;

    /// Load a record by identifier.
    async fn get(&mut self, entity: &str, id: &Value) -> Result<Option<Value>, FederationError>;

    /// Create (but do not begin) a transaction on this session.
    fn transaction(&mut self) -> Box<dyn ShardTransaction>;

    /// Release the session.
    async fn close(&mut self) -> Result<(), FederationError>;
}

/// One shard's transaction handle.
#[async_trait]
pub trait ShardTransaction: Send + Sync {
    /// Shard this transaction runs on.
    fn shard_id(&self) -> ShardId;

    /// Transaction timeout in seconds.
    fn set_timeout(&mut self, seconds: u32);

    /// Begin.
    async fn begin(&mut self) -> Result<(), FederationError>;

    /// Commit.
    async fn commit(&mut self) -> Result<(), FederationError>;

    /// Roll back.
    async fn rollback(&mut self) -> Result<(), FederationError>;
}

/// Completion callbacks fired per participant by the sharded transaction.
pub trait TransactionSynchronization: Send + Sync {
    /// Called for each participant right before it commits.
    fn before_completion(&self, shard_id: ShardId);

    /// Called for each participant after it committed, failed, or rolled back.
    /// `status` is the participant's own outcome.
    fn after_completion(&self, shard_id: ShardId, status: TransactionState);
}
