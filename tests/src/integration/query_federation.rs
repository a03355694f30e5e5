//! # Query Federation Flows
//!
//! Queries fanned out over three in-memory shards and merged through the
//! exit operation pipeline.

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use shard_federation::{
        AggregateFunction, AggregateSpec, ExecutionMode, FailurePoint, FederatedQuery,
        FederationError, Filter, PropertyPath, ShardId, ShardStrategy, ShardedSession,
        SortDirection, Value,
    };

    use crate::fixtures::{self, int, text};

    const MODES: [ExecutionMode; 2] = [ExecutionMode::Sequential, ExecutionMode::Parallel];

    fn names(rows: &[Value]) -> Vec<String> {
        rows.iter().filter_map(|r| text(r, "name")).collect()
    }

    // =============================================================================
    // ORDERING
    // =============================================================================

    #[tokio::test]
    async fn test_two_key_order_across_shards() {
        for mode in MODES {
            let store = fixtures::store();
            fixtures::seed_default_people(&store);
            let session = fixtures::session(&store, mode);

            let query = FederatedQuery::builder("Person")
                .order_by("age", SortDirection::Ascending)
                .order_by("name", SortDirection::Descending)
                .build()
                .unwrap();
            let result = session.list(&query).await.unwrap();

            assert!(result.is_complete());
            assert_eq!(
                names(&result.rows),
                vec!["bomb", "tomislav", "maulik", "gut", "max"]
            );
        }
    }

    #[tokio::test]
    async fn test_nested_path_order() {
        let store = fixtures::store();
        fixtures::seed_default_people(&store);
        let session = fixtures::session(&store, ExecutionMode::Parallel);

        let query = FederatedQuery::builder("Person")
            .order_by("address.city", SortDirection::Ascending)
            .order_by("age", SortDirection::Descending)
            .build()
            .unwrap();
        let rows = session.list(&query).await.unwrap().rows;
        assert_eq!(names(&rows), vec!["max", "gut", "maulik", "bomb", "tomislav"]);
    }

    #[tokio::test]
    async fn test_global_top_n_with_push_down() {
        let store = fixtures::store();
        fixtures::seed_people(
            &store,
            &[
                (0, "a", 90, "x"),
                (0, "b", 80, "x"),
                (0, "c", 70, "x"),
                (1, "d", 10, "x"),
                (2, "e", 85, "x"),
            ],
        );
        let session = fixtures::session(&store, ExecutionMode::Parallel);

        let query = FederatedQuery::builder("Person")
            .order_by("age", SortDirection::Descending)
            .offset(1)
            .limit(2)
            .build()
            .unwrap();
        let rows = session.list(&query).await.unwrap().rows;

        assert_eq!(names(&rows), vec!["e", "b"]);
        assert!(store
            .executed_queries()
            .iter()
            .all(|(_, q)| q.max_results == Some(3)));
    }

    // =============================================================================
    // FILTERS, PROJECTION, DISTINCT
    // =============================================================================

    #[tokio::test]
    async fn test_filter_applied_on_every_shard() {
        let store = fixtures::store();
        fixtures::seed_default_people(&store);
        let session = fixtures::session(&store, ExecutionMode::Sequential);

        let query = FederatedQuery::builder("Person")
            .filter("age", |p| Filter::Ge(p, Value::Int(5)))
            .order_by("age", SortDirection::Ascending)
            .build()
            .unwrap();
        let rows = session.list(&query).await.unwrap().rows;
        assert_eq!(names(&rows), vec!["gut", "max"]);
    }

    #[tokio::test]
    async fn test_distinct_projection() {
        let store = fixtures::store();
        fixtures::seed_default_people(&store);
        let session = fixtures::session(&store, ExecutionMode::Parallel);

        let query = FederatedQuery::builder("Person")
            .order_by("address.city", SortDirection::Ascending)
            .project(&["address.city"], true)
            .build()
            .unwrap();
        let rows = session.list(&query).await.unwrap().rows;
        assert_eq!(
            rows,
            vec![
                Value::from("berlin"),
                Value::from("mumbai"),
                Value::from("paris"),
                Value::from("zagreb"),
            ]
        );
        // Distinct disables per-shard caps.
        assert!(store
            .executed_queries()
            .iter()
            .all(|(_, q)| q.max_results.is_none()));
    }

    // =============================================================================
    // AGGREGATES
    // =============================================================================

    #[tokio::test]
    async fn test_aggregates_reduce_merged_rows() {
        let store = fixtures::store();
        fixtures::seed_default_people(&store);
        let session = fixtures::session(&store, ExecutionMode::Parallel);

        let cases = [
            (AggregateFunction::Count, None, Value::Int(5)),
            (AggregateFunction::Sum, Some("age"), Value::Int(37)),
            (AggregateFunction::Max, Some("age"), Value::Int(27)),
            (AggregateFunction::Min, Some("age"), Value::Int(1)),
            (AggregateFunction::Avg, Some("age"), Value::Float(7.4)),
        ];
        for (function, path, expected) in cases {
            let query = FederatedQuery::builder("Person")
                .aggregate(AggregateSpec::new(function, path).unwrap())
                .build()
                .unwrap();
            assert_eq!(
                session.unique_result(&query).await.unwrap(),
                Some(expected),
                "{function:?}"
            );
        }
    }

    #[tokio::test]
    async fn test_grouped_count() {
        let store = fixtures::store();
        fixtures::seed_default_people(&store);
        let session = fixtures::session(&store, ExecutionMode::Sequential);

        let spec = AggregateSpec::new(AggregateFunction::Count, None)
            .unwrap()
            .group_by("address.city")
            .unwrap()
            .alias("people");
        let query = FederatedQuery::builder("Person")
            .order_by("address.city", SortDirection::Ascending)
            .aggregate(spec)
            .build()
            .unwrap();
        let rows = session.list(&query).await.unwrap().rows;

        let berlin = rows
            .iter()
            .find(|r| text(r, "address.city").as_deref() == Some("berlin"))
            .unwrap();
        assert_eq!(int(berlin, "people"), Some(2));
        assert_eq!(rows.len(), 4);
    }

    // =============================================================================
    // FAILURES AND PRUNING
    // =============================================================================

    #[tokio::test]
    async fn test_failed_shard_reported_not_fatal() {
        for mode in MODES {
            let store = fixtures::store();
            fixtures::seed_default_people(&store);
            store.fail(ShardId(1), FailurePoint::Execute);
            let session = fixtures::session(&store, mode);

            let query = FederatedQuery::builder("Person")
                .order_by("age", SortDirection::Ascending)
                .build()
                .unwrap();
            let result = session.list(&query).await.unwrap();

            assert_eq!(names(&result.rows), vec!["tomislav", "maulik", "gut"]);
            assert_eq!(result.failures.len(), 1);
            assert_eq!(result.failures[0].shard_id, ShardId(1));

            let err = session.unique_result(&query).await.unwrap_err();
            assert!(matches!(err, FederationError::PartialFailure { .. }));
        }
    }

    #[tokio::test]
    async fn test_slow_shard_times_out_others_return() {
        let store = fixtures::store();
        fixtures::seed_default_people(&store);
        store.set_delay(ShardId(2), Duration::from_millis(2_000));
        let mut config = fixtures::config(ExecutionMode::Parallel);
        config.shard_timeout_ms = Some(50);
        let session = ShardedSession::new(
            config,
            std::sync::Arc::new(store.clone()),
            ShardStrategy::round_robin(fixtures::shard_ids()),
        )
        .unwrap();

        let query = FederatedQuery::builder("Person").build().unwrap();
        let result = session.list(&query).await.unwrap();
        assert_eq!(result.rows.len(), 4);
        assert!(matches!(
            result.failures[0].error,
            FederationError::Timeout { shard_id: ShardId(2), millis: 50 }
        ));
    }

    #[tokio::test]
    async fn test_shard_key_pruning_contacts_owner_only() {
        let store = fixtures::store();
        let config = fixtures::config(ExecutionMode::Parallel);
        let strategy =
            ShardStrategy::shard_key(PropertyPath::parse("tenant").unwrap(), config.shard_ids.clone());
        let session =
            ShardedSession::new(config, std::sync::Arc::new(store.clone()), strategy).unwrap();

        let mut owners = Vec::new();
        for tenant in ["acme", "globex", "initech", "umbrella"] {
            let record = fixtures::person("x", 1, "y").with("tenant", tenant);
            owners.push(session.save("Person", record).await.unwrap());
        }

        let query = FederatedQuery::builder("Person")
            .eq("tenant", "globex")
            .build()
            .unwrap();
        let result = session.list(&query).await.unwrap();

        assert_eq!(result.rows.len(), 1);
        let contacted: Vec<_> = store.executed_queries().iter().map(|(id, _)| *id).collect();
        assert_eq!(contacted, vec![owners[1]]);

        // No pinned key: every shard.
        let all = FederatedQuery::builder("Person").build().unwrap();
        assert_eq!(session.list(&all).await.unwrap().rows.len(), 4);
    }

    #[tokio::test]
    async fn test_invalid_query_fails_before_io() {
        let store = fixtures::store();
        let result = FederatedQuery::builder("Person")
            .order_by("address..city", SortDirection::Ascending)
            .build();
        assert!(matches!(result, Err(FederationError::InvalidPropertyPath(_))));
        assert_eq!(store.sessions_opened(ShardId(0)), 0);
    }
}
