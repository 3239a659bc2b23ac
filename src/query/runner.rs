//! Query execution engine.
//!
//! The [`QueryRunner`] is the central orchestrator: it decides whether a
//! query runs on the active transaction's connection or on a freshly
//! acquired one, measures acquisition and execution timing, classifies
//! failures, and guarantees that every pooled connection is released exactly
//! once across all exit paths.

use crate::error::{Fault, RunnerResult};
use crate::logger::DatasourceLogger;
use crate::pool::{Connection, ConnectionPool};
use crate::query::config::QueryConfig;
use crate::query::result::QueryResult;
use crate::query::stats::{QueryStats, TransactionStats};
use crate::query::transaction::TransactionRunner;
use std::sync::Arc;
use std::time::Instant;

/// The runner's transaction mode. Holding a live [`TransactionRunner`] *is*
/// the "in a transaction" state; there is no separate flag to drift out of
/// sync.
enum TransactionState {
    Idle,
    InTransaction(TransactionRunner),
}

pub struct QueryRunner {
    pool: Arc<dyn ConnectionPool>,
    logger: Arc<dyn DatasourceLogger>,
    state: TransactionState,
}

impl QueryRunner {
    pub fn new(pool: Arc<dyn ConnectionPool>, logger: Arc<dyn DatasourceLogger>) -> Self {
        Self {
            pool,
            logger,
            state: TransactionState::Idle,
        }
    }

    pub fn is_in_transaction(&self) -> bool {
        matches!(self.state, TransactionState::InTransaction(_))
    }

    /// Snapshot of the active transaction's statistics, if any.
    pub fn transaction_stats(&self) -> Option<TransactionStats> {
        match &self.state {
            TransactionState::InTransaction(tx) => Some(*tx.stats()),
            TransactionState::Idle => None,
        }
    }

    /// Identifier of the active transaction, if any.
    pub fn transaction_id(&self) -> Option<&str> {
        match &self.state {
            TransactionState::InTransaction(tx) => Some(tx.transaction_id()),
            TransactionState::Idle => None,
        }
    }

    /// Begin a transaction on a dedicated connection.
    pub async fn start_transaction(&mut self) -> RunnerResult<()> {
        if self.is_in_transaction() {
            return Err(Fault::transaction(
                "Cannot start new SQL transaction. \
                 The query runner is already in a transaction.",
            )
            .into());
        }

        let mut tx = TransactionRunner::new(Arc::clone(&self.pool), Arc::clone(&self.logger));
        tx.start().await?;
        self.state = TransactionState::InTransaction(tx);
        Ok(())
    }

    /// Commit the active transaction. The runner leaves transaction mode
    /// whether or not the COMMIT round-trip succeeds: the transaction
    /// instance is single-use either way.
    pub async fn commit_transaction(&mut self) -> RunnerResult<()> {
        match std::mem::replace(&mut self.state, TransactionState::Idle) {
            TransactionState::Idle => Err(Fault::transaction(
                "Cannot commit transaction. This query runner is not in a transaction.",
            )
            .into()),
            TransactionState::InTransaction(mut tx) => tx.commit().await,
        }
    }

    /// Roll back the active transaction, symmetric to
    /// [`commit_transaction`](QueryRunner::commit_transaction).
    pub async fn rollback_transaction(&mut self) -> RunnerResult<()> {
        match std::mem::replace(&mut self.state, TransactionState::Idle) {
            TransactionState::Idle => Err(Fault::transaction(
                "Cannot rollback transaction. This query runner is not in a transaction.",
            )
            .into()),
            TransactionState::InTransaction(mut tx) => tx.rollback().await,
        }
    }

    /// Execute one query.
    ///
    /// Inside a transaction the held connection is reused and the
    /// transaction's query count is bumped for every attempt; a failing
    /// query rolls the whole transaction back before the error is returned.
    /// Outside a transaction a connection is acquired for the duration of
    /// the call and released exactly once on every exit path.
    pub async fn query(&mut self, config: impl Into<QueryConfig>) -> RunnerResult<QueryResult> {
        let config = config.into();
        let mut stats = QueryStats::new();

        // None while in a transaction: the transaction's connection is used.
        let mut pooled: Option<Box<dyn Connection>> = match &self.state {
            TransactionState::InTransaction(_) => {
                stats.connection_duration_ms = 0;
                None
            }
            TransactionState::Idle => {
                let acquire_started = Instant::now();
                match self.pool.acquire().await {
                    Ok(conn) => {
                        stats.connection_duration_ms =
                            acquire_started.elapsed().as_millis() as i64;
                        Some(conn)
                    }
                    Err(err) => {
                        self.logger.log_query_failed(&err, &config);
                        return Err(err);
                    }
                }
            }
        };

        let execute_started = Instant::now();
        let executed = match pooled.as_mut() {
            Some(conn) => conn.execute(&config).await,
            None => match &mut self.state {
                TransactionState::InTransaction(tx) => tx.execute(&config).await,
                TransactionState::Idle => {
                    Err(Fault::internal("No connection available for query").into())
                }
            },
        };

        match executed {
            Ok(raw) => {
                stats.execution_duration_ms = execute_started.elapsed().as_millis() as i64;
                stats.row_count = if raw.rows.is_empty() {
                    raw.rows_affected.unwrap_or(0)
                } else {
                    raw.rows.len() as u64
                };

                if let TransactionState::InTransaction(tx) = &mut self.state {
                    tx.stats_mut().query_count += 1;
                }

                let result = QueryResult {
                    rows: raw.rows,
                    rows_affected: raw.rows_affected,
                    stats,
                    config,
                };
                self.logger.log_query_executed(&result);

                if let Some(conn) = pooled.take() {
                    conn.release();
                }

                Ok(result)
            }
            Err(err) => {
                self.logger.log_query_failed(&err, &config);

                match pooled.take() {
                    Some(conn) => conn.release(),
                    None => {
                        // Any failure inside a transaction invalidates it
                        // entirely; the rollback path releases the
                        // transaction's connection.
                        if let TransactionState::InTransaction(tx) = &mut self.state {
                            tx.stats_mut().query_count += 1;
                        }
                        self.rollback_transaction().await?;
                    }
                }

                Err(err)
            }
        }
    }
}
