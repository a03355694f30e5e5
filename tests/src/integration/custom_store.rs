//! # Custom Store Flows
//!
//! The sharded session over a store implemented outside the federation
//! crate, plus exit operations over a caller-defined row type.

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use async_trait::async_trait;
    use parking_lot::Mutex;
    use shard_federation::{
        CacheMode, ExecutionMode, FederatedQuery, FederatedSessionApi, FederationConfig,
        FederationError, FlushMode, InMemoryOrderBy, OrderExitOperation, Property, PropertySource,
        Record, ShardId, ShardQuery, ShardSession, ShardStore, ShardStrategy, ShardTransaction,
        ShardedSession, SortDirection, Value,
    };

    // =============================================================================
    // READ-ONLY FIXED STORE
    // =============================================================================

    /// Each shard serves a fixed list of scores; writes are rejected.
    struct FixedStore {
        scores: HashMap<ShardId, Vec<i64>>,
        opened: AtomicUsize,
    }

    struct FixedSession {
        shard_id: ShardId,
        scores: Vec<i64>,
    }

    struct NoopTransaction(ShardId, Arc<Mutex<Vec<String>>>);

    #[async_trait]
    impl ShardStore for FixedStore {
        type Session = FixedSession;

        async fn open_session(&self, shard_id: ShardId) -> Result<FixedSession, FederationError> {
            self.opened.fetch_add(1, Ordering::SeqCst);
            let scores = self
                .scores
                .get(&shard_id)
                .cloned()
                .ok_or(FederationError::UnknownShard(shard_id))?;
            Ok(FixedSession { shard_id, scores })
        }
    }

    #[async_trait]
    impl ShardSession for FixedSession {
        fn shard_id(&self) -> ShardId {
            self.shard_id
        }

        fn enable_fetch_profile(&mut self, name: &str) -> Result<(), FederationError> {
            Err(FederationError::UnknownFetchProfile(name.to_string()))
        }

        fn disable_fetch_profile(&mut self, name: &str) -> Result<(), FederationError> {
            Err(FederationError::UnknownFetchProfile(name.to_string()))
        }

        fn set_default_read_only(&mut self, _read_only: bool) {}

        fn set_cache_mode(&mut self, _mode: CacheMode) {}

        fn set_flush_mode(&mut self, _mode: FlushMode) {}

        async fn execute(&mut self, query: &ShardQuery) -> Result<Vec<Value>, FederationError> {
            let rows: Vec<Record> = self
                .scores
                .iter()
                .map(|s| Record::new().with("score", *s).with("shard", self.shard_id.get() as i64))
                .filter(|r| query.filters.iter().all(|f| f.matches(r)))
                .collect();
            let mut rows = OrderExitOperation::new(query.order_by.clone()).apply(rows);
            if let Some(max) = query.max_results {
                rows.truncate(max);
            }
            Ok(rows.into_iter().map(Value::Record).collect())
        }

        async fn save(&mut self, _entity: &str, _record: Record) -> Result<(), FederationError> {
            Err(FederationError::Store("read-only shard".to_string()))
        }

        async fn get(&mut self, _entity: &str, _id: &Value) -> Result<Option<Value>, FederationError> {
            Ok(None)
        }

        fn transaction(&mut self) -> Box<dyn ShardTransaction> {
            Box::new(NoopTransaction(self.shard_id, Arc::default()))
        }

        async fn close(&mut self) -> Result<(), FederationError> {
            Ok(())
        }
    }

    #[async_trait]
    impl ShardTransaction for NoopTransaction {
        fn shard_id(&self) -> ShardId {
            self.0
        }

        fn set_timeout(&mut self, _seconds: u32) {}

        async fn begin(&mut self) -> Result<(), FederationError> {
            self.1.lock().push("begin".into());
            Ok(())
        }

        async fn commit(&mut self) -> Result<(), FederationError> {
            Ok(())
        }

        async fn rollback(&mut self) -> Result<(), FederationError> {
            Ok(())
        }
    }

    fn fixed_session() -> (Arc<FixedStore>, ShardedSession<FixedStore>) {
        let store = Arc::new(FixedStore {
            scores: HashMap::from([
                (ShardId(7), vec![3, 27]),
                (ShardId(8), vec![1, 5]),
                (ShardId(9), vec![2]),
            ]),
            opened: AtomicUsize::new(0),
        });
        let ids = vec![ShardId(7), ShardId(8), ShardId(9)];
        let config = FederationConfig {
            shard_ids: ids.clone(),
            execution_mode: ExecutionMode::Parallel,
            ..FederationConfig::default()
        };
        let session =
            ShardedSession::new(config, store.clone(), ShardStrategy::round_robin(ids)).unwrap();
        (store, session)
    }

    fn scores(rows: &[Value]) -> Vec<i64> {
        rows.iter()
            .filter_map(|r| r.as_record()?.get("score")?.as_i64())
            .collect()
    }

    #[tokio::test]
    async fn test_custom_store_through_inbound_port() {
        let (store, session) = fixed_session();
        let api: &dyn FederatedSessionApi = &session;

        let asc = FederatedQuery::builder("Score")
            .order_by("score", SortDirection::Ascending)
            .build()
            .unwrap();
        let desc = FederatedQuery::builder("Score")
            .order_by("score", SortDirection::Descending)
            .build()
            .unwrap();

        assert_eq!(scores(&api.list(&asc).await.unwrap().rows), vec![1, 2, 3, 5, 27]);
        assert_eq!(scores(&api.list(&desc).await.unwrap().rows), vec![27, 5, 3, 2, 1]);
        assert_eq!(store.opened.load(Ordering::SeqCst), 3);
        assert_eq!(api.shard_ids().len(), 3);
    }

    #[tokio::test]
    async fn test_custom_store_write_failure_is_attributed() {
        let (_, session) = fixed_session();
        let err = session.save("Score", Record::new()).await.unwrap_err();
        assert!(matches!(
            err,
            FederationError::ShardExecution { shard_id: ShardId(7), .. }
        ));
    }

    #[tokio::test]
    async fn test_get_misses_on_every_candidate() {
        let (store, session) = fixed_session();
        assert_eq!(session.get("Score", &Value::Int(1)).await.unwrap(), None);
        assert_eq!(store.opened.load(Ordering::SeqCst), 3);
    }

    // =============================================================================
    // CALLER-DEFINED ROW TYPE
    // =============================================================================

    struct Employee {
        name: &'static str,
        grade: i64,
        team: Team,
    }

    struct Team {
        name: &'static str,
    }

    impl PropertySource for Team {
        fn property(&self, name: &str) -> Option<Property<'_>> {
            match name {
                "name" => Some(Property::Value(Value::from(self.name))),
                _ => None,
            }
        }
    }

    impl PropertySource for Employee {
        fn property(&self, name: &str) -> Option<Property<'_>> {
            match name {
                "name" => Some(Property::Value(Value::from(self.name))),
                "grade" => Some(Property::Value(Value::Int(self.grade))),
                "team" => Some(Property::Nested(&self.team)),
                _ => None,
            }
        }
    }

    #[test]
    fn test_order_caller_type_by_nested_path() {
        let staff = vec![
            Employee { name: "ana", grade: 3, team: Team { name: "ops" } },
            Employee { name: "ben", grade: 5, team: Team { name: "dev" } },
            Employee { name: "cai", grade: 4, team: Team { name: "ops" } },
            Employee { name: "dee", grade: 5, team: Team { name: "dev" } },
        ];
        let order = OrderExitOperation::new(vec![
            InMemoryOrderBy::asc("team.name").unwrap(),
            InMemoryOrderBy::desc("grade").unwrap(),
        ]);

        let sorted: Vec<_> = order.apply(staff).into_iter().map(|e| e.name).collect();
        // Equal keys keep input order.
        assert_eq!(sorted, vec!["ben", "dee", "cai", "ana"]);
    }
}
