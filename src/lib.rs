//! Transactional query execution for PostgreSQL.
//!
//! This library layers a typed execution pipeline over a pooled Postgres
//! connection: a [`QueryRunner`] that manages connections and transactions,
//! reusable [`Statement`]s that build, validate, process and error-classify
//! queries, matchers for common Postgres failure shapes, and a session
//! advisory-lock helper.

pub mod advisory_lock;
pub mod config;
pub mod datasource;
pub mod error;
pub mod logger;
pub mod matchers;
pub mod pool;
pub mod queries;
pub mod query;
pub mod statement;

pub use advisory_lock::{AdvisoryLock, LockStatus};
pub use config::{DatasourceConfig, PoolOptions};
pub use datasource::{Datasource, DatasourceRegistry};
pub use error::{
    ArgsError, DatabaseError, Fault, RunnerError, RunnerResult, StatementError, sqlstate,
};
pub use logger::{DatasourceLogger, TracingLogger};
pub use pool::{Connection, ConnectionPool, PgConnectionPool, RawQueryResult};
pub use query::{
    QueryConfig, QueryParam, QueryResult, QueryRunner, QueryStats, Row, TransactionStats,
};
pub use statement::{ErrorContext, PreparedQuery, ProcessContext, Statement};
