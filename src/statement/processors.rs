//! Ready-made processing steps for common result shapes.

use crate::query::{QueryResult, Row};
use crate::statement::statement::ProcessContext;
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;

/// Extract one column from the first row and deserialize it, yielding `None`
/// when the result has no rows or the column is absent or fails to decode.
pub fn first_row_field<A, T>(
    column: &str,
) -> impl for<'a> Fn(QueryResult, &ProcessContext<'a, A>) -> Option<T> + Send + Sync + 'static
where
    A: 'static,
    T: DeserializeOwned + 'static,
{
    let column = column.to_string();
    move |result, _ctx| {
        result
            .rows
            .first()
            .and_then(|row| row.get(&column))
            .and_then(|value| serde_json::from_value(value.clone()).ok())
    }
}

/// Keep only the row set, discarding stats and the descriptor.
pub fn rows<A: 'static>(
) -> impl for<'a> Fn(QueryResult, &ProcessContext<'a, A>) -> Vec<Row> + Send + Sync + 'static {
    |result, _ctx| result.rows
}

/// Rename every column of every row from `snake_case` to `camelCase`.
/// Chain after [`rows`].
pub fn camel_case_keys<A: 'static>(
) -> impl for<'a> Fn(Vec<Row>, &ProcessContext<'a, A>) -> Vec<Row> + Send + Sync + 'static {
    |rows, _ctx| {
        rows.into_iter()
            .map(|row| {
                row.into_iter()
                    .map(|(key, value)| (to_camel_case(&key), value))
                    .collect()
            })
            .collect()
    }
}

/// Deserialize every row into `T`. Chain after [`rows`].
pub fn to_instances<A, T>(
) -> impl for<'a> Fn(Vec<Row>, &ProcessContext<'a, A>) -> Result<Vec<T>, serde_json::Error>
       + Send
       + Sync
       + 'static
where
    A: 'static,
    T: DeserializeOwned + 'static,
{
    |rows, _ctx| {
        rows.into_iter()
            .map(|row| serde_json::from_value(JsonValue::Object(row)))
            .collect()
    }
}

fn to_camel_case(key: &str) -> String {
    let mut out = String::with_capacity(key.len());
    let mut upper_next = false;
    for ch in key.chars() {
        if ch == '_' {
            upper_next = true;
        } else if upper_next {
            out.extend(ch.to_uppercase());
            upper_next = false;
        } else {
            out.push(ch);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::{QueryConfig, QueryStats};
    use serde::Deserialize;
    use serde_json::json;

    fn result_with_rows(rows: Vec<Row>) -> QueryResult {
        QueryResult {
            rows,
            rows_affected: None,
            stats: QueryStats::new(),
            config: QueryConfig::new("SELECT 1"),
        }
    }

    fn ctx_config() -> QueryConfig {
        QueryConfig::new("SELECT 1")
    }

    fn row(pairs: &[(&str, JsonValue)]) -> Row {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_first_row_field_extracts_and_decodes() {
        let config = ctx_config();
        let ctx = ProcessContext {
            config: &config,
            args: &(),
        };
        let step = first_row_field::<(), bool>("exists");
        let result = result_with_rows(vec![row(&[("exists", json!(true))])]);
        assert_eq!(step(result, &ctx), Some(true));
    }

    #[test]
    fn test_first_row_field_handles_empty_and_missing() {
        let config = ctx_config();
        let ctx = ProcessContext {
            config: &config,
            args: &(),
        };
        let step = first_row_field::<(), bool>("exists");
        assert_eq!(step(result_with_rows(vec![]), &ctx), None);
        let missing = result_with_rows(vec![row(&[("other", json!(1))])]);
        assert_eq!(step(missing, &ctx), None);
    }

    #[test]
    fn test_camel_case_keys_renames_columns() {
        let config = ctx_config();
        let ctx = ProcessContext {
            config: &config,
            args: &(),
        };
        let step = camel_case_keys::<()>();
        let rows = vec![row(&[("user_id", json!(7)), ("created_at", json!("now"))])];
        let out = step(rows, &ctx);
        assert!(out[0].contains_key("userId"));
        assert!(out[0].contains_key("createdAt"));
        assert!(!out[0].contains_key("user_id"));
    }

    #[test]
    fn test_to_instances_deserializes_rows() {
        #[derive(Deserialize, Debug, PartialEq)]
        struct User {
            id: i64,
            name: String,
        }

        let config = ctx_config();
        let ctx = ProcessContext {
            config: &config,
            args: &(),
        };
        let step = to_instances::<(), User>();
        let rows = vec![row(&[("id", json!(1)), ("name", json!("alice"))])];
        let users = step(rows, &ctx).unwrap();
        assert_eq!(
            users,
            vec![User {
                id: 1,
                name: "alice".to_string()
            }]
        );
    }

    #[test]
    fn test_to_camel_case() {
        assert_eq!(to_camel_case("user_id"), "userId");
        assert_eq!(to_camel_case("already"), "already");
        assert_eq!(to_camel_case("a_b_c"), "aBC");
    }
}
