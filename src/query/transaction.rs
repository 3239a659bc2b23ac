//! Transaction lifecycle management.
//!
//! A [`TransactionRunner`] owns one transaction from BEGIN to COMMIT or
//! ROLLBACK: it holds a dedicated pooled connection while active, accumulates
//! per-transaction statistics, and emits one lifecycle event per operation.
//! Instances are single-use; the runner creates a fresh one per transaction.

use crate::error::{Fault, RunnerResult};
use crate::logger::DatasourceLogger;
use crate::pool::{Connection, ConnectionPool, RawQueryResult};
use crate::query::config::QueryConfig;
use crate::query::stats::TransactionStats;
use std::sync::Arc;

pub struct TransactionRunner {
    pool: Arc<dyn ConnectionPool>,
    logger: Arc<dyn DatasourceLogger>,
    /// Present only while the transaction is active.
    connection: Option<Box<dyn Connection>>,
    /// Set once committed or rolled back; an ended instance cannot restart.
    ended: bool,
    stats: TransactionStats,
    /// Short random identifier, stable for the instance's life. Used purely
    /// for log correlation.
    transaction_id: String,
}

impl TransactionRunner {
    pub fn new(pool: Arc<dyn ConnectionPool>, logger: Arc<dyn DatasourceLogger>) -> Self {
        Self {
            pool,
            logger,
            connection: None,
            ended: false,
            stats: TransactionStats::new(),
            transaction_id: generate_transaction_id(),
        }
    }

    pub fn transaction_id(&self) -> &str {
        &self.transaction_id
    }

    pub fn stats(&self) -> &TransactionStats {
        &self.stats
    }

    pub(crate) fn stats_mut(&mut self) -> &mut TransactionStats {
        &mut self.stats
    }

    /// Whether the transaction holds a connection, i.e. is active.
    pub fn is_active(&self) -> bool {
        self.connection.is_some()
    }

    /// Acquire a dedicated connection and issue BEGIN.
    ///
    /// Acquisition and BEGIN failures propagate to the caller; a connection
    /// acquired before a failing BEGIN is released first.
    pub async fn start(&mut self) -> RunnerResult<()> {
        if self.connection.is_some() {
            return Err(Fault::transaction("Transaction already started").into());
        }
        if self.ended {
            return Err(Fault::transaction("Transaction already ended").into());
        }

        let mut conn = self.pool.acquire().await?;
        if let Err(err) = conn.execute(&QueryConfig::new("BEGIN")).await {
            conn.release();
            return Err(err);
        }

        self.connection = Some(conn);
        self.logger.log_transaction_start(&self.transaction_id);
        Ok(())
    }

    /// Issue COMMIT and release the connection. The connection is released
    /// exactly once even when the COMMIT round-trip fails.
    pub async fn commit(&mut self) -> RunnerResult<()> {
        let mut conn = self.connection.take().ok_or_else(|| {
            Fault::transaction("Transaction not started or already committed")
        })?;
        self.ended = true;

        let outcome = conn.execute(&QueryConfig::new("COMMIT")).await;
        conn.release();
        outcome?;

        self.logger
            .log_transaction_commit(&self.transaction_id, &self.stats);
        Ok(())
    }

    /// Issue ROLLBACK and release the connection, symmetric to [`commit`].
    ///
    /// [`commit`]: TransactionRunner::commit
    pub async fn rollback(&mut self) -> RunnerResult<()> {
        let mut conn = self.connection.take().ok_or_else(|| {
            Fault::transaction("Transaction not started or already rolled back")
        })?;
        self.ended = true;

        let outcome = conn.execute(&QueryConfig::new("ROLLBACK")).await;
        conn.release();
        outcome?;

        self.logger
            .log_transaction_rollback(&self.transaction_id, &self.stats);
        Ok(())
    }

    /// Execute a descriptor on the transaction's connection.
    pub(crate) async fn execute(&mut self, config: &QueryConfig) -> RunnerResult<RawQueryResult> {
        match self.connection.as_mut() {
            Some(conn) => conn.execute(config).await,
            None => Err(Fault::transaction("Transaction is no longer active").into()),
        }
    }
}

/// Generate a short random transaction identifier.
fn generate_transaction_id() -> String {
    let id = uuid::Uuid::new_v4().simple().to_string();
    format!("tx_{}", &id[..8])
}
