//! Catalog probe: does a schema exist?

use crate::error::ArgsError;
use crate::query::{QueryConfig, QueryParam};
use crate::statement::{Statement, processors};

/// Arguments for [`schema_exists`].
#[derive(Debug, Clone, Default)]
pub struct SchemaExistsArgs {
    pub schema: String,
}

impl SchemaExistsArgs {
    pub fn new(schema: impl Into<String>) -> Self {
        Self {
            schema: schema.into(),
        }
    }
}

/// A statement that checks `information_schema.schemata` for the given
/// schema and yields a plain `bool`.
pub fn schema_exists() -> Statement<SchemaExistsArgs, bool> {
    Statement::new(|args: &SchemaExistsArgs| {
        QueryConfig::with_params(
            r#"SELECT EXISTS (
                 SELECT FROM information_schema.schemata
                 WHERE schema_name = $1
               ) AS "exists""#,
            vec![QueryParam::from(args.schema.clone())],
        )
    })
    .validate(|args| {
        if args.schema.is_empty() {
            return Err(ArgsError::required("ERR_MISSING_SCHEMA_NAME", "schema"));
        }
        Ok(())
    })
    .process_data(processors::first_row_field::<SchemaExistsArgs, bool>("exists"))
    .process_data(|exists, _ctx| exists.unwrap_or(false))
}
