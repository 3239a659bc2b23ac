//! Session-scoped Postgres advisory locks.

use crate::error::{Fault, RunnerResult};
use crate::logger::DatasourceLogger;
use crate::query::{QueryConfig, QueryParam, QueryRunner};
use std::sync::Arc;

/// Where the lock currently stands. The pending states cover the window
/// where the server round-trip is in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockStatus {
    Idle,
    LockPending,
    Locked,
    UnlockPending,
}

/// A session-level advisory lock identified by a 64-bit key.
///
/// The lock owns a dedicated [`QueryRunner`]; `pg_advisory_lock` blocks on
/// the server until the lock is granted, so the runner must not be shared
/// with other work. A failed round-trip reverts the status to what it was
/// before the call.
pub struct AdvisoryLock {
    runner: QueryRunner,
    logger: Arc<dyn DatasourceLogger>,
    lock_id: i64,
    status: LockStatus,
}

impl AdvisoryLock {
    pub fn new(runner: QueryRunner, logger: Arc<dyn DatasourceLogger>, lock_id: i64) -> Self {
        Self {
            runner,
            logger,
            lock_id,
            status: LockStatus::Idle,
        }
    }

    pub fn lock_id(&self) -> i64 {
        self.lock_id
    }

    pub fn status(&self) -> LockStatus {
        self.status
    }

    /// Acquire the lock, waiting on the server until it is granted.
    pub async fn lock(&mut self) -> RunnerResult<()> {
        if self.status != LockStatus::Idle {
            return Err(Fault::internal(format!(
                "Cannot acquire advisory lock {}: lock is not idle",
                self.lock_id
            ))
            .into());
        }

        self.status = LockStatus::LockPending;
        let config = QueryConfig::with_params(
            "SELECT pg_advisory_lock($1)",
            vec![QueryParam::Int(self.lock_id)],
        );
        match self.runner.query(config).await {
            Ok(_) => {
                self.status = LockStatus::Locked;
                self.logger.log_advisory_lock(self.lock_id);
                Ok(())
            }
            Err(err) => {
                self.status = LockStatus::Idle;
                Err(err)
            }
        }
    }

    /// Release the lock.
    pub async fn unlock(&mut self) -> RunnerResult<()> {
        if self.status != LockStatus::Locked {
            return Err(Fault::internal(format!(
                "Cannot release advisory lock {}: lock is not held",
                self.lock_id
            ))
            .into());
        }

        self.status = LockStatus::UnlockPending;
        let config = QueryConfig::with_params(
            "SELECT pg_advisory_unlock($1)",
            vec![QueryParam::Int(self.lock_id)],
        );
        match self.runner.query(config).await {
            Ok(_) => {
                self.status = LockStatus::Idle;
                self.logger.log_advisory_unlock(self.lock_id);
                Ok(())
            }
            Err(err) => {
                self.status = LockStatus::Locked;
                Err(err)
            }
        }
    }
}
