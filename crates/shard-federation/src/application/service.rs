//! # Sharded Session
//!
//! Caller-facing service: routes saves and lookups through the shard
//! strategy, federates queries through the executor and exit pipeline, and
//! coordinates the best-effort sharded transaction.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use super::executor::{attribute, CrossShardExecutor};
use super::shard::{Shard, SharedShard};
use super::transaction::ShardedTransaction;
use crate::algorithms::{generate_sharded_id, ExitOperationPipeline, ShardStrategy};
use crate::config::FederationConfig;
use crate::domain::{
    CacheMode, CriteriaEvent, FederatedQuery, FederatedResult, FederationError, FlushMode,
    OpenSessionEvent, QueryId, Record, ShardFailure, ShardId, TransactionState, Value,
    ID_PROPERTY,
};
use crate::ports::inbound::FederatedSessionApi;
use crate::ports::outbound::{ShardSession, ShardStore};

/// A session spanning every configured shard.
pub struct ShardedSession<S: ShardStore> {
    config: FederationConfig,
    store: Arc<S>,
    strategy: ShardStrategy,
    shards: Vec<(ShardId, SharedShard<S::Session>)>,
    transaction: Arc<tokio::sync::Mutex<ShardedTransaction>>,
    executor: CrossShardExecutor,
}

impl<S: ShardStore> ShardedSession<S> {
    /// Create a session. No shard is contacted until first use.
    pub fn new(
        config: FederationConfig,
        store: Arc<S>,
        strategy: ShardStrategy,
    ) -> Result<Self, FederationError> {
        config.validate()?;
        if strategy.shard_ids() != config.shard_ids.as_slice() {
            return Err(FederationError::ConfigError(
                "strategy and configuration disagree on the shard set".to_string(),
            ));
        }

        let shards = config
            .shard_ids
            .iter()
            .map(|id| (*id, Shard::shared(*id)))
            .collect();

        info!(
            "[shard-fed] Sharded session over {} shards ({:?})",
            config.shard_ids.len(),
            config.execution_mode
        );

        Ok(Self {
            executor: CrossShardExecutor::from_config(&config),
            transaction: Arc::new(tokio::sync::Mutex::new(ShardedTransaction::new(
                config.transaction_timeout_secs,
            ))),
            config,
            store,
            strategy,
            shards,
        })
    }

    /// Configured shards.
    pub fn shard_ids(&self) -> &[ShardId] {
        &self.config.shard_ids
    }

    /// Configuration in effect.
    pub fn config(&self) -> &FederationConfig {
        &self.config
    }

    /// Shared transaction handle.
    pub fn transaction(&self) -> Arc<tokio::sync::Mutex<ShardedTransaction>> {
        self.transaction.clone()
    }

    fn shard(&self, shard_id: ShardId) -> Result<&SharedShard<S::Session>, FederationError> {
        self.shards
            .iter()
            .find(|(id, _)| *id == shard_id)
            .map(|(_, shard)| shard)
            .ok_or(FederationError::UnknownShard(shard_id))
    }

    fn targets(&self, shard_ids: &[ShardId]) -> Vec<(ShardId, SharedShard<S::Session>)> {
        shard_ids
            .iter()
            .filter_map(|id| self.shard(*id).ok().map(|shard| (*id, shard.clone())))
            .collect()
    }

    async fn broadcast(&self, event: OpenSessionEvent) -> Result<(), FederationError> {
        let mut failures = Vec::new();
        for (shard_id, shard) in &self.shards {
            if let Err(e) = shard.lock().await.add_open_session_event(event.clone()) {
                failures.push(ShardFailure::new(*shard_id, e));
            }
        }
        if failures.is_empty() {
            Ok(())
        } else {
            Err(FederationError::PartialFailure { failures })
        }
    }

    /// Enable a fetch profile on every shard.
    pub async fn enable_fetch_profile(&self, name: &str) -> Result<(), FederationError> {
        self.broadcast(OpenSessionEvent::EnableFetchProfile(name.to_string()))
            .await
    }

    /// Disable a fetch profile on every shard.
    pub async fn disable_fetch_profile(&self, name: &str) -> Result<(), FederationError> {
        self.broadcast(OpenSessionEvent::DisableFetchProfile(name.to_string()))
            .await
    }

    /// Default read-only flag on every shard.
    pub async fn set_default_read_only(&self, read_only: bool) -> Result<(), FederationError> {
        self.broadcast(OpenSessionEvent::SetDefaultReadOnly(read_only))
            .await
    }

    /// Cache mode on every shard.
    pub async fn set_cache_mode(&self, mode: CacheMode) -> Result<(), FederationError> {
        self.broadcast(OpenSessionEvent::SetCacheMode(mode)).await
    }

    /// Flush mode on every shard.
    pub async fn set_flush_mode(&self, mode: FlushMode) -> Result<(), FederationError> {
        self.broadcast(OpenSessionEvent::SetFlushMode(mode)).await
    }

    /// Set an option on `query_id` for every shard.
    pub async fn set_query_option(&self, query_id: QueryId, event: CriteriaEvent) {
        for (_, shard) in &self.shards {
            shard.lock().await.add_criteria_event(query_id, event.clone());
        }
    }

    /// Forget `query_id`'s per-shard state.
    pub async fn release_query(&self, query_id: QueryId) {
        for (_, shard) in &self.shards {
            shard.lock().await.release_query(query_id);
        }
    }

    /// Persist `record` on the shard chosen by the selection strategy.
    ///
    /// A record without an `id` field gets a shard-encoded UUID.
    pub async fn save(&self, entity: &str, mut record: Record) -> Result<ShardId, FederationError> {
        let shard_id = self.strategy.select(entity, &record);
        if record.get(ID_PROPERTY).map_or(true, Value::is_null) {
            record.set(ID_PROPERTY, generate_sharded_id(shard_id).to_string());
        }

        let shard = self.shard(shard_id)?;
        let mut guard = shard.lock().await;
        let session = self
            .executor
            .prepare(self.store.as_ref(), &mut guard, &self.transaction)
            .await?;
        session
            .save(entity, record)
            .await
            .map_err(|e| attribute(shard_id, e))?;

        debug!("[shard-fed] Saved {} on {}", entity, shard_id);
        Ok(shard_id)
    }

    /// Look up `id`, trying candidate shards in order until found.
    ///
    /// A failing candidate does not stop the search. When no shard has the
    /// record and some failed, the failures are returned.
    pub async fn get(&self, entity: &str, id: &Value) -> Result<Option<Value>, FederationError> {
        let mut failures = Vec::new();
        for shard_id in self.strategy.resolve(entity, id) {
            match self.get_on_shard(shard_id, entity, id).await {
                Ok(Some(found)) => return Ok(Some(found)),
                Ok(None) => {}
                Err(e) => {
                    warn!("[shard-fed] Lookup of {} on {} failed: {}", entity, shard_id, e);
                    failures.push(ShardFailure::new(shard_id, e));
                }
            }
        }
        if failures.is_empty() {
            Ok(None)
        } else {
            Err(FederationError::PartialFailure { failures })
        }
    }

    async fn get_on_shard(
        &self,
        shard_id: ShardId,
        entity: &str,
        id: &Value,
    ) -> Result<Option<Value>, FederationError> {
        let shard = self.shard(shard_id)?;
        let mut guard = shard.lock().await;
        let session = self
            .executor
            .prepare(self.store.as_ref(), &mut guard, &self.transaction)
            .await
            .map_err(|e| attribute(shard_id, e))?;
        session
            .get(entity, id)
            .await
            .map_err(|e| attribute(shard_id, e))
    }

    /// Run `query` on its target shards and merge the results.
    pub async fn list(&self, query: &FederatedQuery) -> Result<FederatedResult, FederationError> {
        let targets = self.targets(&self.strategy.access(query));
        let results = self
            .executor
            .execute(self.store.as_ref(), &targets, &self.transaction, query)
            .await;

        let (rows, failures) = results.into_parts();
        let rows = ExitOperationPipeline::for_query(query).apply(rows);
        debug!(
            "[shard-fed] {} merged {} rows ({} shard failures)",
            query.id,
            rows.len(),
            failures.len()
        );
        Ok(FederatedResult { rows, failures })
    }

    /// The single row matching `query`, if any.
    pub async fn unique_result(&self, query: &FederatedQuery) -> Result<Option<Value>, FederationError> {
        let mut rows = self.list(query).await?.require_complete()?;
        match rows.len() {
            0 => Ok(None),
            1 => Ok(rows.pop()),
            n => Err(FederationError::NonUniqueResult(n)),
        }
    }

    /// Start a sharded transaction. A finished one is replaced.
    pub async fn begin_transaction(&self) -> Result<(), FederationError> {
        let mut txn = self.transaction.lock().await;
        if txn.state().is_terminal() {
            txn.reset()?;
        }
        txn.begin()
    }

    /// Commit the sharded transaction.
    pub async fn commit(&self) -> Result<(), FederationError> {
        self.transaction.lock().await.commit().await
    }

    /// Roll back the sharded transaction.
    pub async fn rollback(&self) -> Result<(), FederationError> {
        self.transaction.lock().await.rollback().await
    }

    /// State of the sharded transaction.
    pub async fn transaction_state(&self) -> TransactionState {
        self.transaction.lock().await.state()
    }

    /// Close every opened session.
    pub async fn close(&self) -> Result<(), FederationError> {
        let mut failures = Vec::new();
        for (shard_id, shard) in &self.shards {
            if let Err(e) = shard.lock().await.close().await {
                failures.push(ShardFailure::new(*shard_id, attribute(*shard_id, e)));
            }
        }
        info!("[shard-fed] Sharded session closed");
        if failures.is_empty() {
            Ok(())
        } else {
            Err(FederationError::PartialFailure { failures })
        }
    }
}

#[async_trait]
impl<S: ShardStore> FederatedSessionApi for ShardedSession<S> {
    fn shard_ids(&self) -> &[ShardId] {
        ShardedSession::shard_ids(self)
    }

    async fn save(&self, entity: &str, record: Record) -> Result<ShardId, FederationError> {
        ShardedSession::save(self, entity, record).await
    }

    async fn get(&self, entity: &str, id: &Value) -> Result<Option<Value>, FederationError> {
        ShardedSession::get(self, entity, id).await
    }

    async fn list(&self, query: &FederatedQuery) -> Result<FederatedResult, FederationError> {
        ShardedSession::list(self, query).await
    }

    async fn unique_result(&self, query: &FederatedQuery) -> Result<Option<Value>, FederationError> {
        ShardedSession::unique_result(self, query).await
    }

    async fn begin_transaction(&self) -> Result<(), FederationError> {
        ShardedSession::begin_transaction(self).await
    }

    async fn commit(&self) -> Result<(), FederationError> {
        ShardedSession::commit(self).await
    }

    async fn rollback(&self) -> Result<(), FederationError> {
        ShardedSession::rollback(self).await
    }

    async fn close(&self) -> Result<(), FederationError> {
        ShardedSession::close(self).await
    }
}
