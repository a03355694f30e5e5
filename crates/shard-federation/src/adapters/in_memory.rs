//! In-Memory Shard Store Adapter
//!
//! Implements the outbound store ports over per-shard in-memory tables.
//! Used by tests and local development; failures and latency can be
//! injected per shard.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use tracing::debug;

use crate::algorithms::OrderExitOperation;
use crate::domain::{
    CacheMode, FederationError, FlushMode, PropertySource, Record, ShardId, ShardQuery, Value,
    ID_PROPERTY,
};
use crate::ports::outbound::{ShardSession, ShardStore, ShardTransaction};

/// Operation kinds that can be made to fail on a shard.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FailurePoint {
    /// Opening a session.
    Open,
    /// Running a query, save or get.
    Execute,
    /// Beginning a transaction.
    Begin,
    /// Committing a transaction.
    Commit,
    /// Rolling back a transaction.
    Rollback,
    /// Closing a session.
    Close,
}

#[derive(Default)]
struct StoreState {
    shards: HashSet<ShardId>,
    tables: RwLock<HashMap<(ShardId, String), Vec<Record>>>,
    fetch_profiles: RwLock<HashMap<ShardId, HashSet<String>>>,
    failures: RwLock<HashSet<(ShardId, FailurePoint)>>,
    delays: RwLock<HashMap<ShardId, Duration>>,
    sessions_opened: RwLock<HashMap<ShardId, usize>>,
    journal: Mutex<Vec<(ShardId, String)>>,
    queries: Mutex<Vec<(ShardId, ShardQuery)>>,
}

impl StoreState {
    fn fail_if(&self, shard_id: ShardId, point: FailurePoint) -> Result<(), FederationError> {
        if self.failures.read().contains(&(shard_id, point)) {
            return Err(FederationError::Store(format!(
                "injected {:?} failure on {}",
                point, shard_id
            )));
        }
        Ok(())
    }

    fn record(&self, shard_id: ShardId, entry: String) {
        self.journal.lock().push((shard_id, entry));
    }

    fn rows(&self, shard_id: ShardId, entity: &str) -> Vec<Record> {
        self.tables
            .read()
            .get(&(shard_id, entity.to_string()))
            .cloned()
            .unwrap_or_default()
    }
}

/// In-memory store with one table set per shard.
#[derive(Clone)]
pub struct InMemoryShardStore {
    state: Arc<StoreState>,
}

impl InMemoryShardStore {
    /// Store with the given shards.
    pub fn with_shards(shard_ids: &[ShardId]) -> Self {
        Self {
            state: Arc::new(StoreState {
                shards: shard_ids.iter().copied().collect(),
                ..StoreState::default()
            }),
        }
    }

    /// Seed a committed row directly.
    pub fn insert(&self, shard_id: ShardId, entity: &str, record: Record) {
        self.state
            .tables
            .write()
            .entry((shard_id, entity.to_string()))
            .or_default()
            .push(record);
    }

    /// Committed rows of `entity` on `shard_id`.
    pub fn rows(&self, shard_id: ShardId, entity: &str) -> Vec<Record> {
        self.state.rows(shard_id, entity)
    }

    /// Declare a fetch profile known to `shard_id`'s schema.
    pub fn define_fetch_profile(&self, shard_id: ShardId, name: &str) {
        self.state
            .fetch_profiles
            .write()
            .entry(shard_id)
            .or_default()
            .insert(name.to_string());
    }

    /// Make `point` fail on `shard_id` until cleared.
    pub fn fail(&self, shard_id: ShardId, point: FailurePoint) {
        self.state.failures.write().insert((shard_id, point));
    }

    /// Remove an injected failure.
    pub fn clear_failure(&self, shard_id: ShardId, point: FailurePoint) {
        self.state.failures.write().remove(&(shard_id, point));
    }

    /// Delay every query on `shard_id`.
    pub fn set_delay(&self, shard_id: ShardId, delay: Duration) {
        self.state.delays.write().insert(shard_id, delay);
    }

    /// Sessions opened against `shard_id` so far.
    pub fn sessions_opened(&self, shard_id: ShardId) -> usize {
        self.state
            .sessions_opened
            .read()
            .get(&shard_id)
            .copied()
            .unwrap_or(0)
    }

    /// Configuration and transaction calls seen by `shard_id`, in order.
    pub fn journal(&self, shard_id: ShardId) -> Vec<String> {
        self.state
            .journal
            .lock()
            .iter()
            .filter(|(id, _)| *id == shard_id)
            .map(|(_, entry)| entry.clone())
            .collect()
    }

    /// Shard-local queries executed so far.
    pub fn executed_queries(&self) -> Vec<(ShardId, ShardQuery)> {
        self.state.queries.lock().clone()
    }
}

#[async_trait]
impl ShardStore for InMemoryShardStore {
    type Session = InMemorySession;

    async fn open_session(&self, shard_id: ShardId) -> Result<InMemorySession, FederationError> {
        if !self.state.shards.contains(&shard_id) {
            return Err(FederationError::UnknownShard(shard_id));
        }
        self.state.fail_if(shard_id, FailurePoint::Open)?;

        *self
            .state
            .sessions_opened
            .write()
            .entry(shard_id)
            .or_default() += 1;
        debug!("[shard-fed] In-memory session opened on {}", shard_id);

        Ok(InMemorySession {
            shard_id,
            state: self.state.clone(),
            staged: Arc::new(Mutex::new(None)),
            enabled_profiles: HashSet::new(),
            default_read_only: false,
            cache_mode: CacheMode::default(),
            flush_mode: FlushMode::default(),
        })
    }
}

/// Writes buffered by an open transaction, keyed by entity.
type Staged = Arc<Mutex<Option<Vec<(String, Record)>>>>;

/// Session on one in-memory shard.
pub struct InMemorySession {
    shard_id: ShardId,
    state: Arc<StoreState>,
    staged: Staged,
    enabled_profiles: HashSet<String>,
    default_read_only: bool,
    cache_mode: CacheMode,
    flush_mode: FlushMode,
}

impl InMemorySession {
    /// Fetch profiles currently enabled.
    pub fn enabled_profiles(&self) -> &HashSet<String> {
        &self.enabled_profiles
    }

    /// Committed rows plus this session's uncommitted writes.
    fn visible_rows(&self, entity: &str) -> Vec<Record> {
        let mut rows = self.state.rows(self.shard_id, entity);
        if let Some(staged) = self.staged.lock().as_ref() {
            rows.extend(
                staged
                    .iter()
                    .filter(|(e, _)| e == entity)
                    .map(|(_, r)| r.clone()),
            );
        }
        rows
    }
}

#[async_trait]
impl ShardSession for InMemorySession {
    fn shard_id(&self) -> ShardId {
        self.shard_id
    }

    fn enable_fetch_profile(&mut self, name: &str) -> Result<(), FederationError> {
        let known = self
            .state
            .fetch_profiles
            .read()
            .get(&self.shard_id)
            .is_some_and(|profiles| profiles.contains(name));
        if !known {
            return Err(FederationError::UnknownFetchProfile(name.to_string()));
        }
        self.enabled_profiles.insert(name.to_string());
        self.state
            .record(self.shard_id, format!("enable_fetch_profile:{}", name));
        Ok(())
    }

    fn disable_fetch_profile(&mut self, name: &str) -> Result<(), FederationError> {
        let known = self
            .state
            .fetch_profiles
            .read()
            .get(&self.shard_id)
            .is_some_and(|profiles| profiles.contains(name));
        if !known {
            return Err(FederationError::UnknownFetchProfile(name.to_string()));
        }
        self.enabled_profiles.remove(name);
        self.state
            .record(self.shard_id, format!("disable_fetch_profile:{}", name));
        Ok(())
    }

    fn set_default_read_only(&mut self, read_only: bool) {
        self.default_read_only = read_only;
        self.state
            .record(self.shard_id, format!("set_default_read_only:{}", read_only));
    }

    fn set_cache_mode(&mut self, mode: CacheMode) {
        self.cache_mode = mode;
        self.state
            .record(self.shard_id, format!("set_cache_mode:{:?}", mode));
    }

    fn set_flush_mode(&mut self, mode: FlushMode) {
        self.flush_mode = mode;
        self.state
            .record(self.shard_id, format!("set_flush_mode:{:?}", mode));
    }

    async fn execute(&mut self, query: &ShardQuery) -> Result<Vec<Value>, FederationError> {
        let delay = self.state.delays.read().get(&self.shard_id).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.state.fail_if(self.shard_id, FailurePoint::Execute)?;
        self.state.queries.lock().push((self.shard_id, query.clone()));

        let matching: Vec<Record> = self
            .visible_rows(&query.entity)
            .into_iter()
            .filter(|row| query.filters.iter().all(|f| f.matches(row)))
            .collect();

        let mut sorted = OrderExitOperation::new(query.order_by.clone()).apply(matching);
        if let Some(max) = query.max_results {
            sorted.truncate(max);
        }
        Ok(sorted.into_iter().map(Value::Record).collect())
    }

    async fn save(&mut self, entity: &str, record: Record) -> Result<(), FederationError> {
        self.state.fail_if(self.shard_id, FailurePoint::Execute)?;
        let mut staged = self.staged.lock();
        if let Some(buffer) = staged.as_mut() {
            buffer.push((entity.to_string(), record));
            return Ok(());
        }
        drop(staged);

        self.state
            .tables
            .write()
            .entry((self.shard_id, entity.to_string()))
            .or_default()
            .push(record);
        Ok(())
    }

    async fn get(&mut self, entity: &str, id: &Value) -> Result<Option<Value>, FederationError> {
        self.state.fail_if(self.shard_id, FailurePoint::Execute)?;
        Ok(self
            .visible_rows(entity)
            .into_iter()
            .find(|row| row.get(ID_PROPERTY) == Some(id))
            .map(|row| row.to_value()))
    }

    fn transaction(&mut self) -> Box<dyn ShardTransaction> {
        Box::new(InMemoryTransaction {
            shard_id: self.shard_id,
            state: self.state.clone(),
            staged: self.staged.clone(),
            timeout_secs: None,
        })
    }

    async fn close(&mut self) -> Result<(), FederationError> {
        self.state.fail_if(self.shard_id, FailurePoint::Close)?;
        self.state.record(self.shard_id, "close".to_string());
        Ok(())
    }
}

/// Transaction on one in-memory shard; buffers writes until commit.
pub struct InMemoryTransaction {
    shard_id: ShardId,
    state: Arc<StoreState>,
    staged: Staged,
    timeout_secs: Option<u32>,
}

#[async_trait]
impl ShardTransaction for InMemoryTransaction {
    fn shard_id(&self) -> ShardId {
        self.shard_id
    }

    fn set_timeout(&mut self, seconds: u32) {
        self.timeout_secs = Some(seconds);
        self.state
            .record(self.shard_id, format!("set_timeout:{}", seconds));
    }

    async fn begin(&mut self) -> Result<(), FederationError> {
        self.state.fail_if(self.shard_id, FailurePoint::Begin)?;
        *self.staged.lock() = Some(Vec::new());
        self.state.record(self.shard_id, "begin".to_string());
        Ok(())
    }

    async fn commit(&mut self) -> Result<(), FederationError> {
        self.state.fail_if(self.shard_id, FailurePoint::Commit)?;
        let writes = self.staged.lock().take().unwrap_or_default();
        let mut tables = self.state.tables.write();
        for (entity, record) in writes {
            tables.entry((self.shard_id, entity)).or_default().push(record);
        }
        drop(tables);
        self.state.record(self.shard_id, "commit".to_string());
        Ok(())
    }

    async fn rollback(&mut self) -> Result<(), FederationError> {
        self.state.fail_if(self.shard_id, FailurePoint::Rollback)?;
        self.staged.lock().take();
        self.state.record(self.shard_id, "rollback".to_string());
        Ok(())
    }
}
