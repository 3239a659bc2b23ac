//! Test doubles shared by the integration tests: a scriptable pool and a
//! logger that records every event for assertion.

#![allow(dead_code)]

use async_trait::async_trait;
use pg_datasource::{
    Connection, ConnectionPool, DatabaseError, DatasourceLogger, Fault, QueryConfig, QueryResult,
    RawQueryResult, Row, RunnerError, RunnerResult, TransactionStats,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

#[derive(Default)]
struct StubState {
    acquires: AtomicUsize,
    releases: AtomicUsize,
    executed: Mutex<Vec<String>>,
    failures: Mutex<HashMap<String, DatabaseError>>,
    responses: Mutex<HashMap<String, Vec<Row>>>,
    acquire_failure: Mutex<Option<Fault>>,
}

/// A scriptable in-memory pool. Clone it to keep a handle for assertions
/// while the runner owns the original.
#[derive(Clone, Default)]
pub struct StubPool {
    state: Arc<StubState>,
}

impl StubPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every execution of the given SQL text fail with this error.
    pub fn fail_query(&self, sql: &str, error: DatabaseError) {
        self.state
            .failures
            .lock()
            .unwrap()
            .insert(sql.to_string(), error);
    }

    /// Make the given SQL text return these rows.
    pub fn respond_with(&self, sql: &str, rows: Vec<Row>) {
        self.state
            .responses
            .lock()
            .unwrap()
            .insert(sql.to_string(), rows);
    }

    /// Make the next and all further acquires fail.
    pub fn fail_acquire(&self, fault: Fault) {
        *self.state.acquire_failure.lock().unwrap() = Some(fault);
    }

    /// Every SQL text executed on any connection, in order.
    pub fn executed(&self) -> Vec<String> {
        self.state.executed.lock().unwrap().clone()
    }

    pub fn acquire_count(&self) -> usize {
        self.state.acquires.load(Ordering::SeqCst)
    }

    pub fn release_count(&self) -> usize {
        self.state.releases.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ConnectionPool for StubPool {
    async fn acquire(&self) -> RunnerResult<Box<dyn Connection>> {
        if let Some(fault) = self.state.acquire_failure.lock().unwrap().clone() {
            return Err(fault.into());
        }
        self.state.acquires.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(StubConnection {
            state: Arc::clone(&self.state),
        }))
    }

    async fn close(&self) {}
}

struct StubConnection {
    state: Arc<StubState>,
}

#[async_trait]
impl Connection for StubConnection {
    async fn execute(&mut self, config: &QueryConfig) -> RunnerResult<RawQueryResult> {
        self.state
            .executed
            .lock()
            .unwrap()
            .push(config.text().to_string());

        if let Some(error) = self.state.failures.lock().unwrap().get(config.text()) {
            return Err(error.clone().into());
        }

        let rows = self
            .state
            .responses
            .lock()
            .unwrap()
            .get(config.text())
            .cloned()
            .unwrap_or_default();
        Ok(RawQueryResult {
            rows,
            rows_affected: None,
        })
    }

    fn release(self: Box<Self>) {
        self.state.releases.fetch_add(1, Ordering::SeqCst);
    }
}

/// One recorded logger event.
#[derive(Debug, Clone, PartialEq)]
pub enum LogEvent {
    QueryExecuted { text: String, row_count: u64 },
    QueryFailed { text: String, message: String },
    TransactionStart { id: String },
    TransactionCommit { id: String, query_count: u32 },
    TransactionRollback { id: String, query_count: u32 },
    AdvisoryLock { lock_id: i64 },
    AdvisoryUnlock { lock_id: i64 },
}

/// Logger that records every event instead of emitting it.
#[derive(Clone, Default)]
pub struct RecordingLogger {
    events: Arc<Mutex<Vec<LogEvent>>>,
}

impl RecordingLogger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<LogEvent> {
        self.events.lock().unwrap().clone()
    }

    fn record(&self, event: LogEvent) {
        self.events.lock().unwrap().push(event);
    }
}

impl DatasourceLogger for RecordingLogger {
    fn log_query_executed(&self, result: &QueryResult) {
        self.record(LogEvent::QueryExecuted {
            text: result.config.text().to_string(),
            row_count: result.stats.row_count,
        });
    }

    fn log_query_failed(&self, error: &RunnerError, config: &QueryConfig) {
        self.record(LogEvent::QueryFailed {
            text: config.text().to_string(),
            message: error.to_string(),
        });
    }

    fn log_transaction_start(&self, transaction_id: &str) {
        self.record(LogEvent::TransactionStart {
            id: transaction_id.to_string(),
        });
    }

    fn log_transaction_commit(&self, transaction_id: &str, stats: &TransactionStats) {
        self.record(LogEvent::TransactionCommit {
            id: transaction_id.to_string(),
            query_count: stats.query_count,
        });
    }

    fn log_transaction_rollback(&self, transaction_id: &str, stats: &TransactionStats) {
        self.record(LogEvent::TransactionRollback {
            id: transaction_id.to_string(),
            query_count: stats.query_count,
        });
    }

    fn log_advisory_lock(&self, lock_id: i64) {
        self.record(LogEvent::AdvisoryLock { lock_id });
    }

    fn log_advisory_unlock(&self, lock_id: i64) {
        self.record(LogEvent::AdvisoryUnlock { lock_id });
    }
}

/// Build a row from column/value pairs.
pub fn make_row(pairs: &[(&str, serde_json::Value)]) -> Row {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect()
}
