//! # Cross-Shard Executor
//!
//! Fans a federated query out to its target shards and joins the per-shard
//! outcomes. One shard's failure never prevents the others; failures are
//! reported alongside the rows of the shards that succeeded.

use std::time::Duration;

use futures::future::join_all;
use tracing::{debug, warn};

use super::shard::{Shard, SharedShard};
use super::transaction::ShardedTransaction;
use crate::config::{ExecutionMode, FederationConfig};
use crate::domain::{FederatedQuery, FederationError, ShardFailure, ShardId, Value};
use crate::ports::outbound::{ShardSession, ShardStore};

/// Outcome of one fan-out, per shard, in target order.
#[derive(Debug)]
pub struct ShardResults {
    per_shard: Vec<(ShardId, Result<Vec<Value>, FederationError>)>,
}

impl ShardResults {
    /// Per-shard outcomes.
    pub fn per_shard(&self) -> &[(ShardId, Result<Vec<Value>, FederationError>)] {
        &self.per_shard
    }

    /// Failed shards.
    pub fn failures(&self) -> Vec<ShardFailure> {
        self.per_shard
            .iter()
            .filter_map(|(id, r)| r.as_ref().err().map(|e| ShardFailure::new(*id, e.clone())))
            .collect()
    }

    /// Concatenated rows of the successful shards plus the failures.
    pub fn into_parts(self) -> (Vec<Value>, Vec<ShardFailure>) {
        let mut rows = Vec::new();
        let mut failures = Vec::new();
        for (shard_id, outcome) in self.per_shard {
            match outcome {
                Ok(values) => rows.extend(values),
                Err(error) => failures.push(ShardFailure::new(shard_id, error)),
            }
        }
        (rows, failures)
    }
}

/// Runs shard-local work for a sharded session.
#[derive(Clone, Debug)]
pub struct CrossShardExecutor {
    mode: ExecutionMode,
    shard_timeout: Option<Duration>,
    push_down_limit: bool,
}

impl CrossShardExecutor {
    /// Executor with explicit settings.
    pub fn new(mode: ExecutionMode, shard_timeout: Option<Duration>, push_down_limit: bool) -> Self {
        Self {
            mode,
            shard_timeout,
            push_down_limit,
        }
    }

    /// Executor configured from `config`.
    pub fn from_config(config: &FederationConfig) -> Self {
        Self::new(
            config.execution_mode,
            config.shard_timeout_ms.map(Duration::from_millis),
            config.push_down_limit,
        )
    }

    /// Fan-out mode.
    pub fn mode(&self) -> ExecutionMode {
        self.mode
    }

    /// Materialize `shard` and enlist it in `transaction` if one is active.
    pub async fn prepare<'a, St>(
        &self,
        store: &St,
        shard: &'a mut Shard<St::Session>,
        transaction: &tokio::sync::Mutex<ShardedTransaction>,
    ) -> Result<&'a mut St::Session, FederationError>
    where
        St: ShardStore + ?Sized,
    {
        let session = shard.materialize(store).await?;

        let mut txn = transaction.lock().await;
        if txn.is_active() && !txn.is_participant(session.shard_id()) {
            txn.enlist(session.transaction()).await?;
        }
        Ok(session)
    }

    /// Run `query` on every target shard.
    pub async fn execute<St>(
        &self,
        store: &St,
        targets: &[(ShardId, SharedShard<St::Session>)],
        transaction: &tokio::sync::Mutex<ShardedTransaction>,
        query: &FederatedQuery,
    ) -> ShardResults
    where
        St: ShardStore + ?Sized,
    {
        debug!(
            "[shard-fed] Executing {} on {} shards ({:?})",
            query.id,
            targets.len(),
            self.mode
        );

        let per_shard = match self.mode {
            ExecutionMode::Sequential => {
                let mut outcomes = Vec::with_capacity(targets.len());
                for (shard_id, shard) in targets {
                    let outcome = self
                        .run_on_shard(store, *shard_id, shard, transaction, query)
                        .await;
                    outcomes.push((*shard_id, outcome));
                }
                outcomes
            }
            ExecutionMode::Parallel => {
                let tasks = targets.iter().map(|(shard_id, shard)| async move {
                    let outcome = self
                        .run_on_shard(store, *shard_id, shard, transaction, query)
                        .await;
                    (*shard_id, outcome)
                });
                join_all(tasks).await
            }
        };

        ShardResults { per_shard }
    }

    async fn run_on_shard<St>(
        &self,
        store: &St,
        shard_id: ShardId,
        shard: &SharedShard<St::Session>,
        transaction: &tokio::sync::Mutex<ShardedTransaction>,
        query: &FederatedQuery,
    ) -> Result<Vec<Value>, FederationError>
    where
        St: ShardStore + ?Sized,
    {
        let work = async {
            let mut guard = shard.lock().await;
            self.prepare(store, &mut guard, transaction).await?;
            guard
                .execute_query(store, query, self.push_down_limit)
                .await
        };

        let outcome = match self.shard_timeout {
            Some(budget) => match tokio::time::timeout(budget, work).await {
                Ok(outcome) => outcome,
                Err(_) => Err(FederationError::Timeout {
                    shard_id,
                    millis: budget.as_millis() as u64,
                }),
            },
            None => work.await,
        };

        outcome.map_err(|e| {
            warn!("[shard-fed] {} failed on {}: {}", query.id, shard_id, e);
            attribute(shard_id, e)
        })
    }
}

/// Tag store-level errors with the shard that raised them.
pub(crate) fn attribute(shard_id: ShardId, error: FederationError) -> FederationError {
    match error {
        FederationError::Store(reason) => FederationError::ShardExecution { shard_id, reason },
        other => other,
    }
}
