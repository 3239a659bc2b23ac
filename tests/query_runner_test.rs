//! Integration tests for query execution and transaction lifecycle,
//! exercised against the scriptable stub pool.

mod common;

use common::{LogEvent, RecordingLogger, StubPool, make_row};
use pg_datasource::{DatabaseError, QueryRunner, RunnerError, sqlstate};
use serde_json::json;
use std::sync::Arc;

fn make_runner() -> (QueryRunner, StubPool, RecordingLogger) {
    let pool = StubPool::new();
    let logger = RecordingLogger::new();
    let runner = QueryRunner::new(Arc::new(pool.clone()), Arc::new(logger.clone()));
    (runner, pool, logger)
}

#[tokio::test]
async fn query_outside_transaction_releases_connection_exactly_once() {
    let (mut runner, pool, logger) = make_runner();
    pool.respond_with("SELECT 1", vec![make_row(&[("one", json!(1))])]);

    let result = runner.query("SELECT 1").await.unwrap();

    assert_eq!(result.row_count(), 1);
    assert_eq!(pool.acquire_count(), 1);
    assert_eq!(pool.release_count(), 1);
    assert!(matches!(
        logger.events().as_slice(),
        [LogEvent::QueryExecuted { .. }]
    ));
}

#[tokio::test]
async fn failed_query_outside_transaction_still_releases_exactly_once() {
    let (mut runner, pool, logger) = make_runner();
    pool.fail_query(
        "SELECT boom",
        DatabaseError::new(sqlstate::UNDEFINED_TABLE, "relation missing"),
    );

    let err = runner.query("SELECT boom").await.unwrap_err();

    assert!(err.is_database());
    assert_eq!(pool.release_count(), 1);
    assert!(matches!(
        logger.events().as_slice(),
        [LogEvent::QueryFailed { .. }]
    ));
}

#[tokio::test]
async fn acquire_failure_is_logged_and_surfaced_as_fault() {
    let (mut runner, pool, logger) = make_runner();
    pool.fail_acquire(pg_datasource::Fault::connection("refused"));

    let err = runner.query("SELECT 1").await.unwrap_err();

    assert!(matches!(err, RunnerError::Fault(_)));
    assert_eq!(pool.release_count(), 0);
    assert!(matches!(
        logger.events().as_slice(),
        [LogEvent::QueryFailed { .. }]
    ));
}

#[tokio::test]
async fn transaction_reuses_one_connection_until_commit() {
    let (mut runner, pool, logger) = make_runner();

    runner.start_transaction().await.unwrap();
    assert!(runner.is_in_transaction());
    let tx_id = runner.transaction_id().unwrap().to_string();
    assert!(tx_id.starts_with("tx_"));

    runner.query("SELECT 1").await.unwrap();
    runner.query("SELECT 2").await.unwrap();

    // One acquire for the whole transaction, held until commit.
    assert_eq!(pool.acquire_count(), 1);
    assert_eq!(pool.release_count(), 0);
    assert_eq!(runner.transaction_stats().unwrap().query_count, 2);

    runner.commit_transaction().await.unwrap();

    assert!(!runner.is_in_transaction());
    assert_eq!(pool.release_count(), 1);
    assert_eq!(
        pool.executed(),
        vec!["BEGIN", "SELECT 1", "SELECT 2", "COMMIT"]
    );

    let commit = logger
        .events()
        .into_iter()
        .find(|e| matches!(e, LogEvent::TransactionCommit { .. }))
        .unwrap();
    assert_eq!(
        commit,
        LogEvent::TransactionCommit {
            id: tx_id,
            query_count: 2
        }
    );
}

#[tokio::test]
async fn explicit_rollback_releases_connection_and_logs() {
    let (mut runner, pool, logger) = make_runner();

    runner.start_transaction().await.unwrap();
    runner.query("UPDATE t SET x = 1").await.unwrap();
    runner.rollback_transaction().await.unwrap();

    assert!(!runner.is_in_transaction());
    assert_eq!(pool.release_count(), 1);
    assert_eq!(pool.executed(), vec!["BEGIN", "UPDATE t SET x = 1", "ROLLBACK"]);
    assert!(logger
        .events()
        .iter()
        .any(|e| matches!(e, LogEvent::TransactionRollback { query_count: 1, .. })));
}

#[tokio::test]
async fn failing_query_rolls_back_the_whole_transaction() {
    let (mut runner, pool, _logger) = make_runner();
    pool.fail_query(
        "INSERT INTO t VALUES (1)",
        DatabaseError::new(sqlstate::UNIQUE_VIOLATION, "duplicate key"),
    );

    runner.start_transaction().await.unwrap();
    let err = runner.query("INSERT INTO t VALUES (1)").await.unwrap_err();

    assert!(err.is_database());
    assert!(!runner.is_in_transaction());
    assert_eq!(pool.release_count(), 1);
    assert_eq!(
        pool.executed(),
        vec!["BEGIN", "INSERT INTO t VALUES (1)", "ROLLBACK"]
    );
}

#[tokio::test]
async fn starting_a_second_transaction_is_rejected() {
    let (mut runner, _pool, _logger) = make_runner();

    runner.start_transaction().await.unwrap();
    let err = runner.start_transaction().await.unwrap_err();

    assert_eq!(
        err.to_string(),
        "Cannot start new SQL transaction. The query runner is already in a transaction."
    );
    // The original transaction is untouched.
    assert!(runner.is_in_transaction());
}

#[tokio::test]
async fn commit_and_rollback_require_an_active_transaction() {
    let (mut runner, _pool, _logger) = make_runner();

    let commit_err = runner.commit_transaction().await.unwrap_err();
    assert_eq!(
        commit_err.to_string(),
        "Cannot commit transaction. This query runner is not in a transaction."
    );

    let rollback_err = runner.rollback_transaction().await.unwrap_err();
    assert_eq!(
        rollback_err.to_string(),
        "Cannot rollback transaction. This query runner is not in a transaction."
    );
}

#[tokio::test]
async fn transaction_query_count_includes_failed_attempts() {
    let (mut runner, pool, logger) = make_runner();
    pool.fail_query(
        "SELECT broken",
        DatabaseError::new("42601", "syntax error"),
    );

    runner.start_transaction().await.unwrap();
    runner.query("SELECT 1").await.unwrap();
    let _ = runner.query("SELECT broken").await.unwrap_err();

    // The runner rolled back; the rollback event carries both attempts.
    assert!(logger
        .events()
        .iter()
        .any(|e| matches!(e, LogEvent::TransactionRollback { query_count: 2, .. })));
}

#[tokio::test]
async fn result_carries_descriptor_and_timing() {
    let (mut runner, pool, _logger) = make_runner();
    pool.respond_with(
        "SELECT name FROM users",
        vec![
            make_row(&[("name", json!("alice"))]),
            make_row(&[("name", json!("bob"))]),
        ],
    );

    let result = runner.query("SELECT name FROM users").await.unwrap();

    assert_eq!(result.config.text(), "SELECT name FROM users");
    assert_eq!(result.stats.row_count, 2);
    assert!(result.stats.connection_duration_ms >= 0);
    assert!(result.stats.execution_duration_ms >= 0);
    assert_eq!(result.first_row_value("name"), Some(&json!("alice")));
}
