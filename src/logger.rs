//! Structured logging for datasource events.
//!
//! All engine components emit events through the [`DatasourceLogger`] trait
//! so tests can capture them; [`TracingLogger`] is the production
//! implementation and forwards everything to `tracing`.

use crate::error::RunnerError;
use crate::query::{QueryConfig, QueryResult, TransactionStats};
use tracing::{error, info};

/// Maximum query length rendered in human-readable log messages. The full
/// text is always carried in the structured payload.
const TRUNCATE_QUERY_LENGTH: usize = 40;

/// Sink for the engine's lifecycle events. All methods are fire-and-forget.
pub trait DatasourceLogger: Send + Sync {
    fn log_query_executed(&self, result: &QueryResult);
    fn log_query_failed(&self, error: &RunnerError, config: &QueryConfig);
    fn log_transaction_start(&self, transaction_id: &str);
    fn log_transaction_commit(&self, transaction_id: &str, stats: &TransactionStats);
    fn log_transaction_rollback(&self, transaction_id: &str, stats: &TransactionStats);
    fn log_advisory_lock(&self, lock_id: i64);
    fn log_advisory_unlock(&self, lock_id: i64);
}

/// Truncate a query for display in a log message.
pub fn truncate_query(query: &str) -> String {
    truncate_query_to(query, TRUNCATE_QUERY_LENGTH)
}

fn truncate_query_to(query: &str, length: usize) -> String {
    if query.chars().count() > length {
        let truncated: String = query.chars().take(length).collect();
        format!("{}...", truncated)
    } else {
        query.to_string()
    }
}

/// Render an error with every cause in its source chain, comma-joined and
/// prefixed by the error's own message.
pub fn error_chain_message(error: &(dyn std::error::Error + 'static)) -> String {
    let mut fragments = vec![error.to_string()];
    let mut source = error.source();
    while let Some(cause) = source {
        fragments.push(cause.to_string());
        source = cause.source();
    }
    fragments.join(", ")
}

/// Production logger backed by `tracing`.
#[derive(Debug, Default, Clone)]
pub struct TracingLogger;

impl TracingLogger {
    pub fn new() -> Self {
        Self
    }
}

impl DatasourceLogger for TracingLogger {
    fn log_query_executed(&self, result: &QueryResult) {
        let truncated = truncate_query(result.config.text());
        info!(
            query = %result.config.text(),
            query_id = %result.config.id(),
            connection_ms = result.stats.connection_duration_ms,
            execution_ms = result.stats.execution_duration_ms,
            row_count = result.stats.row_count,
            "Executed postgres query: \"{}\" in {}ms",
            truncated,
            result.stats.total_duration_ms(),
        );
    }

    fn log_query_failed(&self, err: &RunnerError, config: &QueryConfig) {
        let truncated = truncate_query(config.text());
        let message = error_chain_message(err);
        error!(
            query = %config.text(),
            query_id = %config.id(),
            error = %message,
            "Error \"{}\": postgres query: \"{}\"",
            message,
            truncated,
        );
    }

    fn log_transaction_start(&self, transaction_id: &str) {
        info!(
            transaction_id = %transaction_id,
            "Started postgres transaction: {}",
            transaction_id,
        );
    }

    fn log_transaction_commit(&self, transaction_id: &str, stats: &TransactionStats) {
        info!(
            transaction_id = %transaction_id,
            query_count = stats.query_count,
            "Committed postgres transaction: {}",
            transaction_id,
        );
    }

    fn log_transaction_rollback(&self, transaction_id: &str, stats: &TransactionStats) {
        info!(
            transaction_id = %transaction_id,
            query_count = stats.query_count,
            "Rolled back postgres transaction: {}",
            transaction_id,
        );
    }

    fn log_advisory_lock(&self, lock_id: i64) {
        info!(lock_id = lock_id, "Acquired advisory lock: {}", lock_id);
    }

    fn log_advisory_unlock(&self, lock_id: i64) {
        info!(lock_id = lock_id, "Released advisory lock: {}", lock_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fmt;

    #[test]
    fn test_short_query_is_not_truncated() {
        assert_eq!(truncate_query("SELECT 1"), "SELECT 1");
    }

    #[test]
    fn test_long_query_is_truncated_with_ellipsis() {
        let query = "SELECT some_very_long_column_list FROM a_table WHERE condition = true";
        let rendered = truncate_query(query);
        assert_eq!(rendered.chars().count(), TRUNCATE_QUERY_LENGTH + 3);
        assert!(rendered.ends_with("..."));
        assert!(query.starts_with(rendered.trim_end_matches("...")));
    }

    #[test]
    fn test_query_at_limit_is_kept() {
        let query = "x".repeat(TRUNCATE_QUERY_LENGTH);
        assert_eq!(truncate_query(&query), query);
    }

    #[derive(Debug)]
    struct Outer(Inner);

    #[derive(Debug)]
    struct Inner;

    impl fmt::Display for Outer {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "outer failed")
        }
    }

    impl fmt::Display for Inner {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "inner cause")
        }
    }

    impl std::error::Error for Inner {}

    impl std::error::Error for Outer {
        fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
            Some(&self.0)
        }
    }

    #[test]
    fn test_error_chain_message_joins_causes() {
        let err = Outer(Inner);
        assert_eq!(error_chain_message(&err), "outer failed, inner cause");
    }

    #[test]
    fn test_error_chain_message_without_causes() {
        let err = Inner;
        assert_eq!(error_chain_message(&err), "inner cause");
    }
}
