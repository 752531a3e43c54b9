//! Transaction lifecycle tests for the MongoDB query runner.
//!
//! These tests drive the runner against a recording store and verify:
//! - No-op behaviour when transactions are disabled
//! - Session and flag bookkeeping across start, commit and rollback
//! - Subscriber notification order and failure unwinding
//! - Error codes for commit/rollback without a transaction

mod common;

use bson::doc;
use common::{RecordingStore, RecordingSubscriber};
use pretty_assertions::assert_eq;
use strand_query::{
    Broadcaster, ErrorCode, IsolationLevel, QueryRunner, TransactionPhase, TransactionState,
};

#[tokio::test]
async fn test_start_is_noop_when_disabled() {
    let store = RecordingStore::disabled();
    let mut runner = store.runner();

    runner.start_transaction(None).await.unwrap();

    assert!(!runner.is_transaction_active());
    assert!(!runner.has_session());
    assert!(store.calls().is_empty());
}

#[tokio::test]
async fn test_disabled_scenario_runs_without_session() {
    let store = RecordingStore::disabled();
    let subscriber = RecordingSubscriber::new();
    let mut runner = store.runner_with(Broadcaster::new().with(subscriber.clone()));

    runner.start_transaction(None).await.unwrap();
    runner
        .insert_one("orders", doc! { "sku": "A-1" }, None)
        .await
        .unwrap();
    runner.commit_transaction().await.unwrap();
    runner.rollback_transaction().await.unwrap();

    let calls = store.calls();
    assert_eq!(store.ops(), vec!["insert_one"]);
    assert_eq!(calls[0].session, None);
    assert!(subscriber.phases().is_empty());
    assert_eq!(runner.transaction_state(), TransactionState::Idle);
}

#[tokio::test]
async fn test_commit_without_start_is_noop_when_disabled() {
    let store = RecordingStore::disabled();
    let mut runner = store.runner();

    assert!(runner.commit_transaction().await.is_ok());
    assert!(runner.rollback_transaction().await.is_ok());
}

#[tokio::test]
async fn test_commit_without_start_fails_when_enabled() {
    let store = RecordingStore::enabled();
    let mut runner = store.runner();

    let err = runner.commit_transaction().await.unwrap_err();
    assert_eq!(err.code, ErrorCode::TransactionNotStarted);
    assert_eq!(err.context.operation.as_deref(), Some("commit_transaction"));

    let err = runner.rollback_transaction().await.unwrap_err();
    assert_eq!(err.code, ErrorCode::TransactionNotStarted);
    assert!(err.is_transaction_error());

    assert!(store.calls().is_empty());
}

#[tokio::test]
async fn test_start_opens_session_and_sets_flag() {
    let store = RecordingStore::enabled();
    let mut runner = store.runner();

    runner
        .start_transaction(Some(IsolationLevel::Serializable))
        .await
        .unwrap();

    assert!(runner.is_transaction_active());
    assert!(runner.has_session());
    assert_eq!(runner.transaction_state(), TransactionState::Active);
    assert_eq!(store.ops(), vec!["start_session", "begin"]);
}

#[tokio::test]
async fn test_start_insert_commit_scenario() {
    let store = RecordingStore::enabled();
    let subscriber = RecordingSubscriber::new();
    let mut runner = store.runner_with(Broadcaster::new().with(subscriber.clone()));

    runner.start_transaction(None).await.unwrap();
    runner
        .insert_one("orders", doc! { "_id": 7, "sku": "A-1" }, None)
        .await
        .unwrap();
    runner.commit_transaction().await.unwrap();

    assert_eq!(
        store.ops(),
        vec!["start_session", "begin", "insert_one", "commit", "end"]
    );

    let calls = store.calls();
    assert_eq!(calls[2].session, Some(1));
    assert_eq!(calls[3].session, Some(1));

    assert_eq!(
        subscriber.phases(),
        vec![
            TransactionPhase::BeforeStart,
            TransactionPhase::AfterStart,
            TransactionPhase::BeforeCommit,
            TransactionPhase::AfterCommit,
        ]
    );

    assert!(!runner.is_transaction_active());
    assert!(!runner.has_session());
}

#[tokio::test]
async fn test_rollback_aborts_and_clears_session() {
    let store = RecordingStore::enabled();
    let subscriber = RecordingSubscriber::new();
    let mut runner = store.runner_with(Broadcaster::new().with(subscriber.clone()));

    runner.start_transaction(None).await.unwrap();
    runner.rollback_transaction().await.unwrap();

    assert_eq!(store.ops(), vec!["start_session", "begin", "abort", "end"]);
    assert_eq!(
        subscriber.phases(),
        vec![
            TransactionPhase::BeforeStart,
            TransactionPhase::AfterStart,
            TransactionPhase::BeforeRollback,
            TransactionPhase::AfterRollback,
        ]
    );
    assert!(!runner.is_transaction_active());
    assert!(!runner.has_session());
}

#[tokio::test]
async fn test_session_only_forwarded_while_active() {
    let store = RecordingStore::enabled();
    let mut runner = store.runner();

    runner.count("orders", doc! {}, None).await.unwrap();
    runner.start_transaction(None).await.unwrap();
    runner.count("orders", doc! {}, None).await.unwrap();
    runner.commit_transaction().await.unwrap();
    runner.count("orders", doc! {}, None).await.unwrap();

    let sessions: Vec<_> = store
        .calls()
        .into_iter()
        .filter(|c| c.op == "count_documents")
        .map(|c| c.session)
        .collect();
    assert_eq!(sessions, vec![None, Some(1), None]);
}

#[tokio::test]
async fn test_before_start_failure_reverts_flag() {
    let store = RecordingStore::enabled();
    let subscriber = RecordingSubscriber::failing_at(TransactionPhase::BeforeStart);
    let mut runner = store.runner_with(Broadcaster::new().with(subscriber.clone()));

    let err = runner.start_transaction(None).await.unwrap_err();
    assert!(err.message.contains("BeforeTransactionStart"));

    assert!(!runner.is_transaction_active());
    assert!(!runner.has_session());
    assert!(store.calls().is_empty());
    assert_eq!(subscriber.phases(), vec![TransactionPhase::BeforeStart]);
}

#[tokio::test]
async fn test_session_failure_reverts_flag() {
    let store = RecordingStore::enabled();
    store.fail_on("begin");
    let subscriber = RecordingSubscriber::new();
    let mut runner = store.runner_with(Broadcaster::new().with(subscriber.clone()));

    let err = runner.start_transaction(None).await.unwrap_err();
    assert_eq!(err.code, ErrorCode::DatabaseError);

    assert!(!runner.is_transaction_active());
    assert!(!runner.has_session());
    assert_eq!(subscriber.phases(), vec![TransactionPhase::BeforeStart]);
}

#[tokio::test]
async fn test_commit_failure_keeps_transaction_active() {
    let store = RecordingStore::enabled();
    let subscriber = RecordingSubscriber::new();
    let mut runner = store.runner_with(Broadcaster::new().with(subscriber.clone()));

    runner.start_transaction(None).await.unwrap();
    store.fail_on("commit");

    assert!(runner.commit_transaction().await.is_err());
    assert!(runner.is_transaction_active());
    assert!(runner.has_session());
    assert!(!subscriber.phases().contains(&TransactionPhase::AfterCommit));

    runner.rollback_transaction().await.unwrap();
    assert!(!runner.is_transaction_active());
    assert_eq!(
        store.ops(),
        vec!["start_session", "begin", "commit", "abort", "end"]
    );
}

#[tokio::test]
async fn test_before_commit_failure_leaves_transaction_untouched() {
    let store = RecordingStore::enabled();
    let subscriber = RecordingSubscriber::failing_at(TransactionPhase::BeforeCommit);
    let mut runner = store.runner_with(Broadcaster::new().with(subscriber));

    runner.start_transaction(None).await.unwrap();
    assert!(runner.commit_transaction().await.is_err());

    assert!(runner.is_transaction_active());
    assert!(!store.ops().contains(&"commit"));
}

#[tokio::test]
async fn test_restart_replaces_session() {
    let store = RecordingStore::enabled();
    let mut runner = store.runner();

    runner.start_transaction(None).await.unwrap();
    runner.start_transaction(None).await.unwrap();

    assert!(runner.is_transaction_active());
    assert_eq!(store.sessions_started(), 2);
    assert_eq!(
        store.ops(),
        vec!["start_session", "begin", "start_session", "begin", "end"]
    );

    runner.insert_one("orders", doc! {}, None).await.unwrap();
    assert_eq!(store.last().unwrap().session, Some(2));
}

#[tokio::test]
async fn test_subscribers_share_runner_data() {
    let store = RecordingStore::enabled();
    let mut runner = store.runner_with(Broadcaster::new().with(RecordingSubscriber::new()));

    runner.data_mut().insert("request_id", "req-1");
    runner.start_transaction(None).await.unwrap();

    assert_eq!(
        runner.data().get("last_phase").and_then(|v| v.as_str()),
        Some("AfterTransactionStart")
    );
    assert!(runner.data().contains("request_id"));

    runner.release().await.unwrap();
    assert!(runner.is_released());
    assert!(runner.data().is_empty());
}

#[tokio::test]
async fn test_lifecycle_runs_on_spawned_task() {
    // The recording session is Send but not Sync, like a driver session.
    let store = RecordingStore::enabled();
    let mut runner: Box<dyn QueryRunner> = Box::new(store.runner());

    let handle = tokio::spawn(async move {
        runner.start_transaction(None).await?;
        runner.clear_table("orders").await?;
        runner.commit_transaction().await?;
        runner.release().await?;
        Ok::<_, strand_query::QueryError>(runner.is_transaction_active())
    });

    assert!(!handle.await.unwrap().unwrap());
    assert_eq!(
        store.ops(),
        vec!["start_session", "begin", "drop_collection", "commit", "end"]
    );
}
