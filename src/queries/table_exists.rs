//! Catalog probe: does a table exist?

use crate::error::ArgsError;
use crate::query::{QueryConfig, QueryParam};
use crate::statement::{Statement, processors};

/// Arguments for [`table_exists`].
#[derive(Debug, Clone, Default)]
pub struct TableExistsArgs {
    pub schema: String,
    pub table: String,
}

impl TableExistsArgs {
    pub fn new(schema: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            schema: schema.into(),
            table: table.into(),
        }
    }
}

/// A statement that checks `information_schema.tables` for the given
/// schema-qualified table and yields a plain `bool`.
pub fn table_exists() -> Statement<TableExistsArgs, bool> {
    Statement::new(|args: &TableExistsArgs| {
        QueryConfig::with_params(
            r#"SELECT EXISTS (
                 SELECT FROM information_schema.tables
                 WHERE table_schema = $1 AND table_name = $2
               ) AS "exists""#,
            vec![
                QueryParam::from(args.schema.clone()),
                QueryParam::from(args.table.clone()),
            ],
        )
    })
    .validate(|args| {
        if args.schema.is_empty() {
            return Err(ArgsError::required("ERR_MISSING_TABLE_SCHEMA", "schema"));
        }
        if args.table.is_empty() {
            return Err(ArgsError::required("ERR_MISSING_TABLE_NAME", "table"));
        }
        Ok(())
    })
    .process_data(processors::first_row_field::<TableExistsArgs, bool>("exists"))
    .process_data(|exists, _ctx| exists.unwrap_or(false))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builds_parameterized_catalog_probe() {
        let statement = table_exists();
        let args = TableExistsArgs::new("public", "users");
        let config = (statement.build)(&args);
        assert!(config.text().contains("information_schema.tables"));
        assert_eq!(
            config.params(),
            &[QueryParam::from("public"), QueryParam::from("users")]
        );
    }
}
