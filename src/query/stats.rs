//! Timing statistics for queries and transactions.

use serde::Serialize;

/// Sentinel for a duration that was never measured because the operation
/// failed before timing completed.
pub const UNMEASURED_MS: i64 = -1;

/// Timing statistics for one query execution. Mutable while the runner
/// executes, frozen once attached to the result.
#[derive(Debug, Clone, Serialize)]
pub struct QueryStats {
    /// Time it took to obtain a connection, in milliseconds. Zero when the
    /// query reused a transaction's connection; [`UNMEASURED_MS`] when
    /// acquisition failed before timing completed.
    pub connection_duration_ms: i64,
    /// Time it took to execute the query, in milliseconds. [`UNMEASURED_MS`]
    /// when the query failed to execute.
    pub execution_duration_ms: i64,
    /// Number of rows returned (or affected, for write statements).
    pub row_count: u64,
}

impl QueryStats {
    pub fn new() -> Self {
        Self {
            connection_duration_ms: UNMEASURED_MS,
            execution_duration_ms: UNMEASURED_MS,
            row_count: 0,
        }
    }

    /// Total measured time in milliseconds; unmeasured phases count as zero.
    pub fn total_duration_ms(&self) -> i64 {
        self.connection_duration_ms.max(0) + self.execution_duration_ms.max(0)
    }
}

impl Default for QueryStats {
    fn default() -> Self {
        Self::new()
    }
}

/// Aggregate statistics for one transaction. A transaction runner is
/// single-use, so these are never reset.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct TransactionStats {
    /// Number of queries attempted (successfully or not) while the
    /// transaction was active.
    pub query_count: u32,
    /// Aggregate connection time placeholder, in milliseconds.
    pub connection_time_ms: Option<i64>,
    /// Aggregate execution time placeholder, in milliseconds.
    pub execution_time_ms: Option<i64>,
}

impl TransactionStats {
    pub fn new() -> Self {
        Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_stats_are_unmeasured() {
        let stats = QueryStats::new();
        assert_eq!(stats.connection_duration_ms, UNMEASURED_MS);
        assert_eq!(stats.execution_duration_ms, UNMEASURED_MS);
        assert_eq!(stats.total_duration_ms(), 0);
    }

    #[test]
    fn test_total_duration_sums_measured_phases() {
        let stats = QueryStats {
            connection_duration_ms: 3,
            execution_duration_ms: 12,
            row_count: 1,
        };
        assert_eq!(stats.total_duration_ms(), 15);
    }

    #[test]
    fn test_total_duration_ignores_unmeasured_execution() {
        let stats = QueryStats {
            connection_duration_ms: 5,
            execution_duration_ms: UNMEASURED_MS,
            row_count: 0,
        };
        assert_eq!(stats.total_duration_ms(), 5);
    }

    #[test]
    fn test_transaction_stats_start_empty() {
        let stats = TransactionStats::new();
        assert_eq!(stats.query_count, 0);
        assert!(stats.connection_time_ms.is_none());
    }
}
