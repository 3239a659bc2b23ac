//! Declarative statement pipeline: build, validate, execute, process,
//! classify.

pub mod prepared;
pub mod processors;
#[allow(clippy::module_inception)]
pub mod statement;

pub use prepared::PreparedQuery;
pub use statement::{ErrorContext, ProcessContext, Statement};
