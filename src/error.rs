//! Error types for the datasource layer.
//!
//! Failures fall into four groups, matched by distinct types so callers can
//! pattern-match instead of string-inspecting:
//!
//! - [`ArgsError`]: malformed statement arguments, caught before any I/O.
//! - [`DatabaseError`]: a failure the database itself reported, carrying a
//!   SQLSTATE code and optionally a constraint name and detail text.
//! - [`Fault`]: infrastructure or programming defects (driver failures,
//!   transaction lifecycle misuse). These are never produced by statement
//!   error handlers.
//! - [`StatementError`]: the failure union of a prepared statement, adding
//!   the domain error produced by its handler chain.

use serde::Serialize;
use thiserror::Error;

/// PostgreSQL SQLSTATE codes recognized by the error matchers.
pub mod sqlstate {
    pub const UNIQUE_VIOLATION: &str = "23505";
    pub const FOREIGN_KEY_VIOLATION: &str = "23503";
    pub const UNDEFINED_TABLE: &str = "42P01";
    pub const DUPLICATE_TABLE: &str = "42P07";
}

/// A failure reported by the database itself, classified by SQLSTATE.
#[derive(Debug, Clone, Error, Serialize)]
#[error("{message}")]
pub struct DatabaseError {
    /// SQLSTATE code, e.g. "23505" for a unique violation.
    pub code: String,
    pub message: String,
    /// Violated constraint name, when the database reports one.
    pub constraint: Option<String>,
    /// Human-readable detail line, e.g. `Key (id)=(abc) already exists.`
    pub detail: Option<String>,
    /// Table involved, when the database reports one.
    pub table: Option<String>,
}

impl DatabaseError {
    /// Create a database error with a SQLSTATE code and message.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            constraint: None,
            detail: None,
            table: None,
        }
    }

    pub fn with_constraint(mut self, constraint: impl Into<String>) -> Self {
        self.constraint = Some(constraint.into());
        self
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    pub fn with_table(mut self, table: impl Into<String>) -> Self {
        self.table = Some(table.into());
        self
    }
}

/// An infrastructure or programming defect, as opposed to an expected
/// business condition. Faults are propagated to the caller unchanged and are
/// never fed through statement error handlers.
#[derive(Debug, Clone, Error)]
pub enum Fault {
    #[error("Connection failed: {message}")]
    Connection { message: String },

    #[error("Timeout: {operation} exceeded {elapsed_secs}s")]
    Timeout {
        operation: String,
        elapsed_secs: u32,
    },

    #[error("{message}")]
    Transaction { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl Fault {
    /// Create a connection fault.
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    /// Create a timeout fault.
    pub fn timeout(operation: impl Into<String>, elapsed_secs: u32) -> Self {
        Self::Timeout {
            operation: operation.into(),
            elapsed_secs,
        }
    }

    /// Create a transaction lifecycle fault.
    pub fn transaction(message: impl Into<String>) -> Self {
        Self::Transaction {
            message: message.into(),
        }
    }

    /// Create an internal fault.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }
}

/// The failure type of [`QueryRunner::query`](crate::QueryRunner::query).
#[derive(Debug, Clone, Error)]
pub enum RunnerError {
    #[error(transparent)]
    Database(#[from] DatabaseError),

    #[error(transparent)]
    Fault(#[from] Fault),
}

impl RunnerError {
    /// The classified database error, if this is one.
    pub fn as_database(&self) -> Option<&DatabaseError> {
        match self {
            Self::Database(err) => Some(err),
            Self::Fault(_) => None,
        }
    }

    pub fn is_database(&self) -> bool {
        matches!(self, Self::Database(_))
    }
}

/// Convert sqlx errors into the classified/fault split.
impl From<sqlx::Error> for RunnerError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Database(db_err) => {
                let code = db_err
                    .code()
                    .map(|c| c.to_string())
                    .unwrap_or_else(|| "XX000".to_string());
                let mut classified = DatabaseError::new(code, db_err.message());
                if let Some(constraint) = db_err.constraint() {
                    classified = classified.with_constraint(constraint);
                }
                if let Some(table) = db_err.table() {
                    classified = classified.with_table(table);
                }
                // Postgres carries the detail line on the concrete error type.
                if let Some(pg_err) = db_err.try_downcast_ref::<sqlx::postgres::PgDatabaseError>()
                {
                    if let Some(detail) = pg_err.detail() {
                        classified = classified.with_detail(detail);
                    }
                }
                RunnerError::Database(classified)
            }
            sqlx::Error::PoolTimedOut => {
                RunnerError::Fault(Fault::timeout("connection pool acquire", 30))
            }
            sqlx::Error::PoolClosed => {
                RunnerError::Fault(Fault::connection("Connection pool is closed"))
            }
            sqlx::Error::Io(io_err) => {
                RunnerError::Fault(Fault::connection(format!("I/O error: {}", io_err)))
            }
            sqlx::Error::Tls(tls_err) => {
                RunnerError::Fault(Fault::connection(format!("TLS error: {}", tls_err)))
            }
            sqlx::Error::Protocol(msg) => {
                RunnerError::Fault(Fault::connection(format!("Protocol error: {}", msg)))
            }
            sqlx::Error::Configuration(msg) => {
                RunnerError::Fault(Fault::connection(format!("Configuration error: {}", msg)))
            }
            sqlx::Error::ColumnDecode { index, source } => RunnerError::Fault(Fault::internal(
                format!("Failed to decode column {}: {}", index, source),
            )),
            sqlx::Error::Decode(source) => {
                RunnerError::Fault(Fault::internal(format!("Decode error: {}", source)))
            }
            sqlx::Error::WorkerCrashed => {
                RunnerError::Fault(Fault::internal("Database worker crashed"))
            }
            other => RunnerError::Fault(Fault::internal(format!(
                "Unknown database error: {}",
                other
            ))),
        }
    }
}

/// Invalid statement arguments, rejected before the query is built.
#[derive(Debug, Clone, Error, Serialize)]
#[error("{code}: {message}")]
pub struct ArgsError {
    /// Stable machine-readable code, e.g. `ERR_MISSING_TABLE_NAME`.
    pub code: String,
    pub message: String,
}

impl ArgsError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }

    /// Shorthand for a "required argument missing" validation failure.
    pub fn required(code: impl Into<String>, arg: &str) -> Self {
        Self::new(code, format!("Argument '{}' is required", arg))
    }
}

/// Failure union of [`PreparedQuery::execute`](crate::PreparedQuery::execute).
///
/// `E` is the domain error produced by the statement's handler chain; it can
/// be any type, so this enum derives only `Debug` and is meant to be
/// pattern-matched rather than propagated with `?`.
#[derive(Debug)]
pub enum StatementError<E> {
    /// Argument validation failed; the query was never built.
    Args(ArgsError),
    /// A classified database error no handler claimed.
    Database(DatabaseError),
    /// The typed failure produced by the first matching error handler.
    Domain(E),
    /// An unclassified infrastructure fault, passed through unchanged.
    Fault(Fault),
}

impl<E> StatementError<E> {
    pub fn as_domain(&self) -> Option<&E> {
        match self {
            Self::Domain(err) => Some(err),
            _ => None,
        }
    }

    pub fn as_database(&self) -> Option<&DatabaseError> {
        match self {
            Self::Database(err) => Some(err),
            _ => None,
        }
    }

    pub fn is_args(&self) -> bool {
        matches!(self, Self::Args(_))
    }
}

/// Result type alias for runner-level operations.
pub type RunnerResult<T> = Result<T, RunnerError>;
