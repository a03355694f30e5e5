//! # Shard Handle
//!
//! One shard plus its lazily opened session. Configuration issued before
//! the session exists is queued here and replayed, in insertion order, when
//! the session is opened. Per-query options follow the same pattern against
//! the shard-local query object.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::domain::{
    CriteriaEvent, FederatedQuery, FederationError, OpenSessionEvent, QueryId, ShardId,
    ShardQuery, Value,
};
use crate::ports::outbound::{ShardSession, ShardStore};

/// A shard handle shared between the session and in-flight executor tasks.
pub type SharedShard<S> = Arc<tokio::sync::Mutex<Shard<S>>>;

/// One shard's session and deferred configuration.
pub struct Shard<S: ShardSession> {
    id: ShardId,
    session: Option<S>,
    session_events: Vec<OpenSessionEvent>,
    criteria_events: HashMap<QueryId, Vec<CriteriaEvent>>,
    queries: HashMap<QueryId, ShardQuery>,
}

impl<S: ShardSession> Shard<S> {
    /// Unmaterialized handle for `id`.
    pub fn new(id: ShardId) -> Self {
        Self {
            id,
            session: None,
            session_events: Vec::new(),
            criteria_events: HashMap::new(),
            queries: HashMap::new(),
        }
    }

    /// Wrap in a shared handle.
    pub fn shared(id: ShardId) -> SharedShard<S> {
        Arc::new(tokio::sync::Mutex::new(Self::new(id)))
    }

    /// Shard ID.
    pub fn id(&self) -> ShardId {
        self.id
    }

    /// True once a session has been opened.
    pub fn is_materialized(&self) -> bool {
        self.session.is_some()
    }

    /// Session events waiting for materialization.
    pub fn pending_session_events(&self) -> &[OpenSessionEvent] {
        &self.session_events
    }

    /// Criteria events waiting for `query_id`'s query object.
    pub fn pending_criteria_events(&self, query_id: QueryId) -> &[CriteriaEvent] {
        self.criteria_events
            .get(&query_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Open session, if any.
    pub fn session_mut(&mut self) -> Option<&mut S> {
        self.session.as_mut()
    }

    /// Apply `event` now if the session is open, otherwise queue it.
    pub fn add_open_session_event(&mut self, event: OpenSessionEvent) -> Result<(), FederationError> {
        match self.session.as_mut() {
            Some(session) => event.apply(session),
            None => {
                self.session_events.push(event);
                Ok(())
            }
        }
    }

    /// Open the session if needed and replay queued events.
    ///
    /// If any event fails the new session is discarded and the queue is kept
    /// intact, so a later call retries from scratch.
    pub async fn materialize<St>(&mut self, store: &St) -> Result<&mut S, FederationError>
    where
        St: ShardStore<Session = S> + ?Sized,
    {
        if self.session.is_none() {
            let mut session = store.open_session(self.id).await?;

            for event in &self.session_events {
                if let Err(e) = event.apply(&mut session) {
                    warn!(
                        "[shard-fed] Replay of '{}' failed on {}: {}",
                        event, self.id, e
                    );
                    if let Err(close_err) = session.close().await {
                        debug!(
                            "[shard-fed] Discarded session on {} failed to close: {}",
                            self.id, close_err
                        );
                    }
                    return Err(FederationError::ConfigurationReplay {
                        shard_id: self.id,
                        event: event.to_string(),
                        reason: e.to_string(),
                    });
                }
            }

            debug!(
                "[shard-fed] Materialized {} ({} deferred events)",
                self.id,
                self.session_events.len()
            );
            self.session_events.clear();
            self.session = Some(session);
        }

        self.session
            .as_mut()
            .ok_or(FederationError::UnknownShard(self.id))
    }

    /// Apply `event` to `query_id`'s query object, or queue it until the
    /// object is established.
    pub fn add_criteria_event(&mut self, query_id: QueryId, event: CriteriaEvent) {
        match self.queries.get_mut(&query_id) {
            Some(query) => event.apply(query),
            None => self.criteria_events.entry(query_id).or_default().push(event),
        }
    }

    /// Shard-local query for `query`.
    ///
    /// Filters, ordering and the row cap are derived from `query` as it is
    /// now. Options come from the query id's criteria events, replayed once
    /// in order. Only ids that registered options keep a query object here,
    /// until [`Shard::release_query`] or [`Shard::close`].
    pub fn establish_query(&mut self, query: &FederatedQuery, push_down_limit: bool) -> ShardQuery {
        let mut shard_query = ShardQuery::from_federated(query, push_down_limit);
        let established = self.queries.get(&query.id);
        let pending = self.criteria_events.remove(&query.id);
        if established.is_none() && pending.is_none() {
            return shard_query;
        }

        if let Some(established) = established {
            shard_query.options = established.options.clone();
        }
        for event in pending.unwrap_or_default() {
            event.apply(&mut shard_query);
        }
        self.queries.insert(query.id, shard_query.clone());
        shard_query
    }

    /// Number of query objects held for registered options.
    pub fn established_queries(&self) -> usize {
        self.queries.len()
    }

    /// Run `query` on this shard's session.
    pub async fn execute_query<St>(
        &mut self,
        store: &St,
        query: &FederatedQuery,
        push_down_limit: bool,
    ) -> Result<Vec<Value>, FederationError>
    where
        St: ShardStore<Session = S> + ?Sized,
    {
        self.materialize(store).await?;
        let shard_query = self.establish_query(query, push_down_limit);
        let session = self
            .session
            .as_mut()
            .ok_or(FederationError::UnknownShard(self.id))?;
        session.execute(&shard_query).await
    }

    /// Drop `query_id`'s query object and pending events.
    pub fn release_query(&mut self, query_id: QueryId) {
        self.queries.remove(&query_id);
        self.criteria_events.remove(&query_id);
    }

    /// Close the session if one was opened.
    pub async fn close(&mut self) -> Result<(), FederationError> {
        self.queries.clear();
        match self.session.take() {
            Some(mut session) => session.close().await,
            None => Ok(()),
        }
    }
}
