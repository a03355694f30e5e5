//! # Sharded Transaction Flows
//!
//! Best-effort commit and rollback across the shards a session touched.

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use parking_lot::Mutex;
    use shard_federation::{
        ExecutionMode, FailurePoint, FederatedQuery, FederationError, InMemoryShardStore, Record,
        ShardId, ShardStrategy, ShardedSession, TransactionState, TransactionSynchronization,
    };

    use crate::fixtures;

    #[derive(Default)]
    struct CompletionLog(Mutex<Vec<(ShardId, TransactionState)>>);

    impl TransactionSynchronization for CompletionLog {
        fn before_completion(&self, _shard_id: ShardId) {}

        fn after_completion(&self, shard_id: ShardId, status: TransactionState) {
            self.0.lock().push((shard_id, status));
        }
    }

    async fn save_on_every_shard(session: &ShardedSession<InMemoryShardStore>) {
        for i in 0..3 {
            session
                .save("Person", fixtures::person("p", i, "c"))
                .await
                .unwrap();
        }
    }

    #[tokio::test]
    async fn test_commit_makes_writes_visible_on_every_shard() {
        let store = fixtures::store();
        let session = fixtures::session(&store, ExecutionMode::Parallel);

        session.begin_transaction().await.unwrap();
        save_on_every_shard(&session).await;
        for id in fixtures::shard_ids() {
            assert!(store.rows(id, "Person").is_empty());
        }

        session.commit().await.unwrap();
        for id in fixtures::shard_ids() {
            assert_eq!(store.rows(id, "Person").len(), 1);
            assert_eq!(store.journal(id), vec!["begin", "commit"]);
        }
        assert!(session.transaction().lock().await.was_committed());
    }

    #[tokio::test]
    async fn test_one_of_three_commits_fails() {
        let store = fixtures::store();
        store.fail(ShardId(1), FailurePoint::Commit);
        let session = fixtures::session(&store, ExecutionMode::Sequential);

        session.begin_transaction().await.unwrap();
        save_on_every_shard(&session).await;

        let err = session.commit().await.unwrap_err();
        match &err {
            FederationError::PartialCommitFailure { committed, failures } => {
                assert_eq!(committed, &vec![ShardId(0), ShardId(2)]);
                assert_eq!(failures.len(), 1);
                assert_eq!(failures[0].shard_id, ShardId(1));
            }
            other => panic!("expected partial commit failure, got {other}"),
        }
        assert!(err.to_string().contains("shard-1"));

        let txn = session.transaction();
        let txn = txn.lock().await;
        assert_eq!(txn.state(), TransactionState::CommitFailed);
        assert!(!txn.was_committed());
        drop(txn);

        // No compensation: committed shards keep their writes.
        assert_eq!(store.rows(ShardId(0), "Person").len(), 1);
        assert!(store.rows(ShardId(1), "Person").is_empty());
        assert_eq!(store.rows(ShardId(2), "Person").len(), 1);

        // Only rollback is accepted now.
        assert!(matches!(
            session.commit().await,
            Err(FederationError::TransactionState { operation: "commit", .. })
        ));
        session.rollback().await.unwrap();
        assert_eq!(store.journal(ShardId(1)), vec!["begin", "rollback"]);
        assert!(!session.transaction().lock().await.was_rolled_back());
    }

    #[tokio::test]
    async fn test_rollback_discards_uncommitted_writes() {
        let store = fixtures::store();
        let session = fixtures::session(&store, ExecutionMode::Parallel);

        session.begin_transaction().await.unwrap();
        save_on_every_shard(&session).await;
        session.rollback().await.unwrap();

        for id in fixtures::shard_ids() {
            assert!(store.rows(id, "Person").is_empty());
        }
        assert!(session.transaction().lock().await.was_rolled_back());
    }

    #[tokio::test]
    async fn test_only_touched_shards_participate() {
        let store = fixtures::store();
        let session = fixtures::session(&store, ExecutionMode::Sequential);
        let log = Arc::new(CompletionLog::default());
        session
            .transaction()
            .lock()
            .await
            .register_synchronization(log.clone());

        session.begin_transaction().await.unwrap();
        session.save("Person", Record::new()).await.unwrap();
        session.commit().await.unwrap();

        assert_eq!(
            *log.0.lock(),
            vec![(ShardId(0), TransactionState::Committed)]
        );
        assert!(store.journal(ShardId(1)).is_empty());
    }

    #[tokio::test]
    async fn test_queries_enlist_shards() {
        let store = fixtures::store();
        fixtures::seed_default_people(&store);
        let session = fixtures::session(&store, ExecutionMode::Parallel);

        session.begin_transaction().await.unwrap();
        session
            .list(&FederatedQuery::builder("Person").build().unwrap())
            .await
            .unwrap();

        let outcomes = session.transaction().lock().await.participant_outcomes();
        assert_eq!(outcomes.len(), 3);
        assert!(outcomes
            .iter()
            .all(|(_, status)| *status == TransactionState::Active));
    }

    #[tokio::test]
    async fn test_invalid_transitions_leave_state_unchanged() {
        let store = fixtures::store();
        let session = fixtures::session(&store, ExecutionMode::Sequential);

        assert!(matches!(
            session.commit().await,
            Err(FederationError::TransactionState {
                operation: "commit",
                state: TransactionState::NotStarted
            })
        ));
        assert!(session.rollback().await.is_err());
        assert_eq!(session.transaction_state().await, TransactionState::NotStarted);

        session.begin_transaction().await.unwrap();
        assert!(session.begin_transaction().await.is_err());
        assert_eq!(session.transaction_state().await, TransactionState::Active);
    }

    #[tokio::test]
    async fn test_transaction_timeout_applied_to_participants() {
        let store = fixtures::store();
        let mut config = fixtures::config(ExecutionMode::Sequential);
        config.transaction_timeout_secs = Some(30);
        let session = ShardedSession::new(
            config,
            Arc::new(store.clone()),
            ShardStrategy::round_robin(fixtures::shard_ids()),
        )
        .unwrap();

        session.begin_transaction().await.unwrap();
        session.save("Person", Record::new()).await.unwrap();
        assert_eq!(store.journal(ShardId(0)), vec!["set_timeout:30", "begin"]);
    }

    #[tokio::test]
    async fn test_failed_begin_surfaces_as_shard_failure() {
        let store = fixtures::store();
        fixtures::seed_default_people(&store);
        store.fail(ShardId(2), FailurePoint::Begin);
        let session = fixtures::session(&store, ExecutionMode::Parallel);

        session.begin_transaction().await.unwrap();
        let result = session
            .list(&FederatedQuery::builder("Person").build().unwrap())
            .await
            .unwrap();

        assert_eq!(result.failures.len(), 1);
        assert_eq!(result.failures[0].shard_id, ShardId(2));
        assert!(!session.transaction().lock().await.is_participant(ShardId(2)));
        session.commit().await.unwrap();
    }
}
