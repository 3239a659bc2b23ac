//! Canned catalog statements built on the statement pipeline.

pub mod schema_exists;
pub mod table_exists;

pub use schema_exists::{SchemaExistsArgs, schema_exists};
pub use table_exists::{TableExistsArgs, table_exists};
