//! Connection pool seam and its PostgreSQL implementation.
//!
//! The runner talks to the database exclusively through the
//! [`ConnectionPool`] / [`Connection`] traits, so the execution logic can be
//! exercised against test doubles while production code runs over
//! [`PgConnectionPool`], a thin wrapper around `sqlx::PgPool`.

use crate::error::{RunnerError, RunnerResult};
use crate::query::{QueryConfig, QueryParam, Row};
use async_trait::async_trait;
use futures_util::TryStreamExt;
use serde_json::Value as JsonValue;
use sqlx::postgres::{PgArguments, PgRow};
use sqlx::{Column, Either, PgPool, Postgres, Row as SqlxRow, TypeInfo};

/// Raw outcome of executing one descriptor on a connection, before any
/// statistics or typed processing are attached.
#[derive(Debug, Clone, Default)]
pub struct RawQueryResult {
    pub rows: Vec<Row>,
    /// Rows affected as reported by the database, when the statement
    /// produced a command tag (INSERT/UPDATE/DELETE).
    pub rows_affected: Option<u64>,
}

/// A single pooled connection, exclusively owned by its holder.
#[async_trait]
pub trait Connection: Send {
    /// Execute one descriptor and collect its full result set.
    async fn execute(&mut self, config: &QueryConfig) -> RunnerResult<RawQueryResult>;

    /// Return the connection to its pool. Consumes the connection, so a
    /// release can only ever happen once.
    fn release(self: Box<Self>);
}

/// A pool that hands out exclusively-owned connections.
#[async_trait]
pub trait ConnectionPool: Send + Sync {
    async fn acquire(&self) -> RunnerResult<Box<dyn Connection>>;

    /// Close the pool and all idle connections.
    async fn close(&self);
}

/// Production pool over `sqlx::PgPool`.
#[derive(Debug, Clone)]
pub struct PgConnectionPool {
    pool: PgPool,
}

impl PgConnectionPool {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn inner(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl ConnectionPool for PgConnectionPool {
    async fn acquire(&self) -> RunnerResult<Box<dyn Connection>> {
        let conn = self.pool.acquire().await.map_err(RunnerError::from)?;
        Ok(Box::new(PgPooledConnection { inner: conn }))
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}

struct PgPooledConnection {
    inner: sqlx::pool::PoolConnection<Postgres>,
}

#[async_trait]
impl Connection for PgPooledConnection {
    async fn execute(&mut self, config: &QueryConfig) -> RunnerResult<RawQueryResult> {
        // When params is empty, use the simple query protocol to avoid
        // prepared statement issues (BEGIN/COMMIT, DDL, multi-statement).
        let mut stream = if config.params().is_empty() {
            use sqlx::Executor;
            self.inner.fetch_many(config.text())
        } else {
            let mut query = sqlx::query(config.text());
            for param in config.params() {
                query = bind_param(query, param);
            }
            query.fetch_many(&mut *self.inner)
        };

        let mut rows = Vec::new();
        let mut rows_affected: Option<u64> = None;
        while let Some(item) = stream.try_next().await.map_err(RunnerError::from)? {
            match item {
                Either::Left(done) => {
                    *rows_affected.get_or_insert(0) += done.rows_affected();
                }
                Either::Right(row) => rows.push(row_to_json_map(&row)),
            }
        }

        Ok(RawQueryResult {
            rows,
            rows_affected,
        })
    }

    fn release(self: Box<Self>) {
        // Dropping a PoolConnection returns it to the pool.
    }
}

/// Bind a parameter to a PostgreSQL query.
fn bind_param<'q>(
    query: sqlx::query::Query<'q, Postgres, PgArguments>,
    param: &'q QueryParam,
) -> sqlx::query::Query<'q, Postgres, PgArguments> {
    match param {
        QueryParam::Null => query.bind(None::<String>),
        QueryParam::Bool(v) => query.bind(*v),
        QueryParam::Int(v) => query.bind(*v),
        QueryParam::Float(v) => query.bind(*v),
        QueryParam::String(v) => query.bind(v.as_str()),
        QueryParam::Bytes(v) => query.bind(v.as_slice()),
        QueryParam::Json(v) => query.bind(sqlx::types::Json(v)),
    }
}

/// Logical category for Postgres column types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TypeCategory {
    Integer,
    Float,
    Decimal,
    Boolean,
    Json,
    Binary,
    Text,
}

fn categorize_type(type_name: &str) -> TypeCategory {
    let lower = type_name.to_lowercase();

    if lower.contains("numeric") || lower.contains("decimal") {
        return TypeCategory::Decimal;
    }
    if lower.contains("int") || lower.contains("serial") {
        return TypeCategory::Integer;
    }
    if lower == "bool" || lower == "boolean" {
        return TypeCategory::Boolean;
    }
    if lower.contains("float") || lower == "real" || lower == "float4" || lower == "float8" {
        return TypeCategory::Float;
    }
    if lower == "json" || lower == "jsonb" {
        return TypeCategory::Json;
    }
    if lower == "bytea" {
        return TypeCategory::Binary;
    }
    // varchar, text, uuid, date, time, etc. all render as text.
    TypeCategory::Text
}

/// Convert a Postgres row into a JSON object keyed by column name.
fn row_to_json_map(row: &PgRow) -> Row {
    row.columns()
        .iter()
        .enumerate()
        .map(|(idx, col)| {
            let category = categorize_type(col.type_info().name());
            (col.name().to_string(), decode_column(row, idx, category))
        })
        .collect()
}

fn decode_column(row: &PgRow, idx: usize, category: TypeCategory) -> JsonValue {
    match category {
        TypeCategory::Integer => decode_integer(row, idx),
        TypeCategory::Float => decode_float(row, idx),
        TypeCategory::Decimal | TypeCategory::Text => decode_text(row, idx),
        TypeCategory::Boolean => row
            .try_get::<Option<bool>, _>(idx)
            .ok()
            .flatten()
            .map(JsonValue::Bool)
            .unwrap_or(JsonValue::Null),
        TypeCategory::Json => row
            .try_get::<Option<JsonValue>, _>(idx)
            .ok()
            .flatten()
            .unwrap_or(JsonValue::Null),
        TypeCategory::Binary => row
            .try_get::<Option<Vec<u8>>, _>(idx)
            .ok()
            .flatten()
            .map(|v| {
                use base64::{Engine as _, engine::general_purpose::STANDARD};
                JsonValue::String(STANDARD.encode(v))
            })
            .unwrap_or(JsonValue::Null),
    }
}

fn decode_integer(row: &PgRow, idx: usize) -> JsonValue {
    if let Ok(None) = row.try_get::<Option<i64>, _>(idx) {
        return JsonValue::Null;
    }
    if let Ok(Some(v)) = row.try_get::<Option<i16>, _>(idx) {
        return JsonValue::Number(v.into());
    }
    if let Ok(Some(v)) = row.try_get::<Option<i32>, _>(idx) {
        return JsonValue::Number(v.into());
    }
    if let Ok(Some(v)) = row.try_get::<Option<i64>, _>(idx) {
        return JsonValue::Number(v.into());
    }
    JsonValue::Null
}

fn decode_float(row: &PgRow, idx: usize) -> JsonValue {
    if let Ok(Some(v)) = row.try_get::<Option<f64>, _>(idx) {
        return serde_json::Number::from_f64(v)
            .map(JsonValue::Number)
            .unwrap_or_else(|| JsonValue::String(v.to_string()));
    }
    if let Ok(Some(v)) = row.try_get::<Option<f32>, _>(idx) {
        return serde_json::Number::from_f64(v as f64)
            .map(JsonValue::Number)
            .unwrap_or_else(|| JsonValue::String(v.to_string()));
    }
    JsonValue::Null
}

fn decode_text(row: &PgRow, idx: usize) -> JsonValue {
    row.try_get::<Option<String>, _>(idx)
        .ok()
        .flatten()
        .map(JsonValue::String)
        .unwrap_or(JsonValue::Null)
}
