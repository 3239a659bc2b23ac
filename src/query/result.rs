//! Typed query results.

use crate::query::config::QueryConfig;
use crate::query::stats::QueryStats;
use serde_json::Value as JsonValue;

/// A single result row, keyed by column name.
pub type Row = serde_json::Map<String, JsonValue>;

/// The result of one successful query execution: the raw rows plus the
/// statistics and descriptor of the execution that produced them.
#[derive(Debug, Clone)]
pub struct QueryResult {
    pub rows: Vec<Row>,
    /// Rows affected as reported by the database for write statements.
    pub rows_affected: Option<u64>,
    pub stats: QueryStats,
    /// The descriptor used to execute the query.
    pub config: QueryConfig,
}

impl QueryResult {
    /// Get the number of rows in the result.
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty() && self.rows_affected.is_none()
    }

    /// Look up a column value on the first row.
    pub fn first_row_value(&self, column: &str) -> Option<&JsonValue> {
        self.rows.first().and_then(|row| row.get(column))
    }
}
