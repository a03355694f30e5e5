//! # Deferred Configuration Flows
//!
//! Session and query configuration issued before shards are touched, then
//! replayed as each shard is first used.

#[cfg(test)]
mod tests {
    use shard_federation::{
        CacheMode, CriteriaEvent, ExecutionMode, FederatedQuery, FederationError, FlushMode,
        Record, ShardId,
    };

    use crate::fixtures;

    #[tokio::test]
    async fn test_configuration_replayed_lazily_per_shard() {
        let store = fixtures::store();
        for id in fixtures::shard_ids() {
            store.define_fetch_profile(id, "with-orders");
        }
        let session = fixtures::session(&store, ExecutionMode::Sequential);

        session.enable_fetch_profile("with-orders").await.unwrap();
        session.set_default_read_only(true).await.unwrap();
        session.set_cache_mode(CacheMode::Refresh).await.unwrap();

        for id in fixtures::shard_ids() {
            assert_eq!(store.sessions_opened(id), 0);
        }

        // Round-robin: the first save touches shard 0 only.
        session.save("Person", Record::new()).await.unwrap();
        let expected = vec![
            "enable_fetch_profile:with-orders",
            "set_default_read_only:true",
            "set_cache_mode:Refresh",
        ];
        assert_eq!(store.journal(ShardId(0)), expected);
        assert!(store.journal(ShardId(1)).is_empty());

        // A later setting reaches the open shard at once and the others on first use.
        session.set_flush_mode(FlushMode::Commit).await.unwrap();
        assert_eq!(store.journal(ShardId(0)).last().unwrap(), "set_flush_mode:Commit");
        assert!(store.journal(ShardId(2)).is_empty());

        session
            .list(&FederatedQuery::builder("Person").build().unwrap())
            .await
            .unwrap();
        let mut full = expected.clone();
        full.push("set_flush_mode:Commit");
        assert_eq!(store.journal(ShardId(2)), full);

        // Nothing is applied twice.
        assert_eq!(store.sessions_opened(ShardId(0)), 1);
        assert_eq!(store.journal(ShardId(0)).len(), 4);
    }

    #[tokio::test]
    async fn test_replay_failure_isolated_to_one_shard() {
        let store = fixtures::store();
        fixtures::seed_default_people(&store);
        store.define_fetch_profile(ShardId(0), "eager");
        store.define_fetch_profile(ShardId(2), "eager");
        let session = fixtures::session(&store, ExecutionMode::Parallel);

        session.enable_fetch_profile("eager").await.unwrap();
        let query = FederatedQuery::builder("Person").build().unwrap();
        let result = session.list(&query).await.unwrap();

        assert_eq!(result.rows.len(), 3);
        assert_eq!(result.failures.len(), 1);
        assert!(matches!(
            &result.failures[0].error,
            FederationError::ConfigurationReplay { shard_id: ShardId(1), event, .. }
                if event.contains("eager")
        ));

        // The queue survived: once the profile exists, shard 1 materializes.
        store.define_fetch_profile(ShardId(1), "eager");
        let result = session.list(&query).await.unwrap();
        assert!(result.is_complete());
        assert_eq!(result.rows.len(), 5);
        assert_eq!(store.sessions_opened(ShardId(1)), 2);
    }

    #[tokio::test]
    async fn test_unknown_profile_on_open_shard_fails_immediately() {
        let store = fixtures::store();
        let session = fixtures::session(&store, ExecutionMode::Sequential);
        session
            .list(&FederatedQuery::builder("Person").build().unwrap())
            .await
            .unwrap();

        let err = session.enable_fetch_profile("missing").await.unwrap_err();
        assert_eq!(err.shard_failures().len(), 3);
        assert!(err
            .shard_failures()
            .iter()
            .all(|f| matches!(f.error, FederationError::UnknownFetchProfile(_))));
    }

    #[tokio::test]
    async fn test_query_options_replayed_in_order() {
        let store = fixtures::store();
        let session = fixtures::session(&store, ExecutionMode::Parallel);
        let query = FederatedQuery::builder("Person").build().unwrap();

        for event in [
            CriteriaEvent::SetFetchSize(100),
            CriteriaEvent::SetTimeout(5),
            CriteriaEvent::SetFetchSize(25),
            CriteriaEvent::SetCacheable(true),
        ] {
            session.set_query_option(query.id, event).await;
        }
        session.list(&query).await.unwrap();

        let executed = store.executed_queries();
        assert_eq!(executed.len(), 3);
        for (_, shard_query) in executed {
            assert_eq!(shard_query.options.fetch_size, Some(25));
            assert_eq!(shard_query.options.timeout_secs, Some(5));
            assert!(shard_query.options.cacheable);
        }
    }

    #[tokio::test]
    async fn test_option_after_execution_applies_to_cached_query() {
        let store = fixtures::store();
        let session = fixtures::session(&store, ExecutionMode::Sequential);
        let query = FederatedQuery::builder("Person").build().unwrap();

        session.list(&query).await.unwrap();
        session
            .set_query_option(query.id, CriteriaEvent::SetComment("second run".into()))
            .await;
        session.list(&query).await.unwrap();

        let executed = store.executed_queries();
        assert_eq!(executed.len(), 6);
        assert!(executed[..3].iter().all(|(_, q)| q.options.comment.is_none()));
        assert!(executed[3..]
            .iter()
            .all(|(_, q)| q.options.comment.as_deref() == Some("second run")));
    }

    #[tokio::test]
    async fn test_released_query_starts_fresh() {
        let store = fixtures::store();
        let session = fixtures::session(&store, ExecutionMode::Sequential);
        let query = FederatedQuery::builder("Person").build().unwrap();

        session
            .set_query_option(query.id, CriteriaEvent::SetReadOnly(true))
            .await;
        session.release_query(query.id).await;
        session.list(&query).await.unwrap();

        assert!(store
            .executed_queries()
            .iter()
            .all(|(_, q)| !q.options.read_only));
    }
}
